use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::query::SortDirection;

/// Defaults shared by every resource table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    #[serde(default = "TableConfig::default_page_size")]
    pub page_size: u32,
    #[serde(default = "TableConfig::default_max_page_size")]
    pub max_page_size: u32,
}

impl TableConfig {
    fn default_page_size() -> u32 {
        10
    }

    fn default_max_page_size() -> u32 {
        100
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: Self::default_page_size(),
            max_page_size: Self::default_max_page_size(),
        }
    }
}

/// Per-resource overrides. `path` is relative to the remote base URL and
/// defaults to the resource name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_direction: SortDirection,
}

pub type ResourcesConfig = HashMap<String, ResourceConfig>;
