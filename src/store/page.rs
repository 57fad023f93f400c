use serde::Serialize;

use super::record::Record;

/// One page of records plus the size of the whole filtered collection.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageResult {
    pub records: Vec<Record>,
    /// Count of all records matching the filters, not just this page.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl PageResult {
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            records: Vec::new(),
            total: 0,
            page,
            page_size,
        }
    }

    pub fn total_pages(&self) -> u32 {
        total_pages(self.total, self.page_size)
    }
}

pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size as u64).min(u32::MAX as u64) as u32
}
