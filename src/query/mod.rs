use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter key the list endpoints use for free-text search.
pub const SEARCH_FILTER: &str = "search";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable pagination, sort and filter snapshot for one resource table.
///
/// Every `with_*` method returns a new snapshot and leaves the receiver
/// untouched, so a fetch can be tagged with the exact state that produced it.
/// Anything that changes the result set (filter, sort, page size) resets the
/// page to 1. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryState {
    page: u32,
    page_size: u32,
    sort_field: Option<String>,
    sort_direction: SortDirection,
    filters: BTreeMap<String, String>,
}

impl QueryState {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            sort_field: None,
            sort_direction: SortDirection::Asc,
            filters: BTreeMap::new(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort_field(&self) -> Option<&str> {
        self.sort_field.as_deref()
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    pub fn has_sort(&self) -> bool {
        self.sort_field.is_some()
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Page 0 is clamped to 1.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    pub fn with_page_size(&self, page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            ..self.clone()
        }
    }

    pub fn with_sort(&self, field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            page: 1,
            sort_field: Some(field.into()),
            sort_direction: direction,
            ..self.clone()
        }
    }

    pub fn without_sort(&self) -> Self {
        Self {
            page: 1,
            sort_field: None,
            sort_direction: SortDirection::Asc,
            ..self.clone()
        }
    }

    /// Set a filter. An empty string or JSON null removes the key instead.
    pub fn with_filter(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let mut filters = self.filters.clone();
        match filter_value(value.into()) {
            Some(value) => filters.insert(key, value),
            None => filters.remove(&key),
        };
        Self {
            page: 1,
            filters,
            ..self.clone()
        }
    }

    pub fn without_filter(&self, key: &str) -> Self {
        let mut filters = self.filters.clone();
        filters.remove(key);
        Self {
            page: 1,
            filters,
            ..self.clone()
        }
    }

    pub fn with_search(&self, term: &str) -> Self {
        self.with_filter(SEARCH_FILTER, term.trim())
    }

    pub fn clear_filters(&self) -> Self {
        Self {
            page: 1,
            filters: BTreeMap::new(),
            ..self.clone()
        }
    }

    /// Clamp the page size to `max`, resetting the page if it changed.
    pub fn with_max_page_size(&self, max: u32) -> Self {
        if self.page_size > max.max(1) {
            self.with_page_size(max)
        } else {
            self.clone()
        }
    }

    /// Zero-based offset of the first record on this page.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(10)
    }
}

fn filter_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Array(items) => {
            let joined = items
                .into_iter()
                .filter_map(filter_value)
                .collect::<Vec<_>>()
                .join(",");
            (!joined.is_empty()).then_some(joined)
        }
        other => Some(other.to_string()),
    }
}
