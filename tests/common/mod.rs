#![allow(dead_code)]

use std::sync::Arc;

use restable::controller::ResourceTableController;
use restable::query::QueryState;
use restable::store::{Fields, RecordId};
use restable::testutil::{MemoryCollection, MemoryRemote};
use serde_json::json;

pub const RESOURCE: &str = "clients";

/// A remote holding `rows` clients and a controller on it, not yet loaded.
pub fn setup_table(
    rows: usize,
    page_size: u32,
) -> (Arc<MemoryRemote>, ResourceTableController<MemoryRemote>) {
    let remote = Arc::new(
        MemoryRemote::new().with_collection(RESOURCE, MemoryCollection::named(rows)),
    );
    let controller =
        ResourceTableController::new(remote.clone(), RESOURCE, QueryState::new(page_size));
    (remote, controller)
}

pub fn name_fields(name: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("name".to_string(), json!(name));
    fields
}

pub fn page_ids(controller: &ResourceTableController<MemoryRemote>) -> Vec<RecordId> {
    controller
        .page()
        .map(|p| p.records.iter().map(|r| r.id).collect())
        .unwrap_or_default()
}
