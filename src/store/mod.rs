mod page;
mod record;

pub use page::{PageResult, total_pages};
pub use record::{Fields, Record, RecordId};

use ahash::RandomState;
use indexmap::IndexMap;
use log::warn;

use crate::query::QueryState;

/// The current page of one resource, keyed by record id and kept in server
/// order. Ids are unique: updates replace by id, never append.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: IndexMap<RecordId, Record, RandomState>,
    total: u64,
    page: u32,
    page_size: u32,
    /// Whether the rows came from a sorted query.
    sorted: bool,
}

impl RecordStore {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            records: IndexMap::with_hasher(RandomState::new()),
            total: 0,
            page,
            page_size,
            sorted: false,
        }
    }

    /// An empty store for the page `query` will fetch.
    pub fn for_query(query: &QueryState) -> Self {
        Self {
            sorted: query.has_sort(),
            ..Self::new(query.page(), query.page_size())
        }
    }

    /// [`replace`](Self::replace) with the result of `query`, remembering
    /// whether that query was sorted.
    pub fn reload(&mut self, query: &QueryState, result: PageResult) {
        self.replace(result);
        self.sorted = query.has_sort();
    }

    /// Replace contents and page metadata wholesale with a fetch result.
    pub fn replace(&mut self, result: PageResult) {
        let mut records =
            IndexMap::with_capacity_and_hasher(result.records.len(), RandomState::new());
        for record in result.records {
            if records.contains_key(&record.id) {
                warn!("duplicate record id {} in page {}, keeping first", record.id, result.page);
                continue;
            }
            records.insert(record.id, record);
        }
        self.records = records;
        self.total = result.total;
        self.page = result.page;
        self.page_size = result.page_size;
    }

    /// Insert at the top of the page, dropping rows pushed past `page_size`.
    /// An already present id is replaced in place instead.
    pub fn insert_front(&mut self, record: Record) {
        if let Some(existing) = self.records.get_mut(&record.id) {
            *existing = record;
            return;
        }
        self.records.shift_insert(0, record.id, record);
        self.records.truncate(self.page_size as usize);
    }

    /// Replace the record with the same id, keeping its position. Returns
    /// false when the id is not on this page.
    pub fn replace_record(&mut self, record: Record) -> bool {
        match self.records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: RecordId) -> bool {
        self.records.shift_remove(&id).is_some()
    }

    pub fn increment_total(&mut self) {
        self.total += 1;
    }

    pub fn decrement_total(&mut self) {
        self.total = self.total.saturating_sub(1);
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// True when the rows shown are the head of the unsorted collection, the
    /// only place a freshly created record can be placed without a fetch.
    pub fn is_unsorted_first_page(&self) -> bool {
        self.page == 1 && !self.sorted
    }

    pub fn snapshot(&self) -> PageResult {
        PageResult {
            records: self.records.values().cloned().collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}
