//! Test and benchmark utilities.
//!
//! This module is only available when the `testutil` feature is enabled.

mod server;

pub use server::{router, serve};

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::oneshot;

use crate::core::{FieldErrors, SyncError};
use crate::query::{QueryState, SEARCH_FILTER, SortDirection};
use crate::remote::Remote;
use crate::store::{Fields, PageResult, Record, RecordId};

/// An in-memory resource collection with the filtering, sorting and paging
/// semantics of the real list endpoints.
///
/// - `search` matches any string field, case-insensitively.
/// - Any other filter matches a field whose value renders to the same string.
/// - Without a sort, records come back in id order.
pub struct MemoryCollection {
    records: Mutex<Vec<Record>>,
    next_id: AtomicUsize,
    unique: Option<String>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            unique: None,
        }
    }

    /// `count` records with ids 1..=count named "Client 1", "Client 2", ...
    pub fn named(count: usize) -> Self {
        let collection = Self::new();
        for i in 1..=count {
            collection.insert(fields(&[("name", json!(format!("Client {i}")))]));
        }
        collection
    }

    /// Reject creates and updates that repeat an existing value of `field`.
    pub fn with_unique_field(mut self, field: &str) -> Self {
        self.unique = Some(field.to_string());
        self
    }

    pub fn insert(&self, fields: Fields) -> Record {
        let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst) as RecordId;
        let record = Record::new(id, fields);
        self.records.lock().unwrap().push(record.clone());
        record
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.records.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    pub fn list(&self, query: &QueryState) -> PageResult {
        let records = self.records.lock().unwrap();
        let mut matching: Vec<&Record> = records
            .iter()
            .filter(|r| matches_filters(r, query))
            .collect();

        match query.sort_field() {
            Some(field) => {
                matching.sort_by(|a, b| {
                    let ord = compare_values(a.get(field), b.get(field)).then(a.id.cmp(&b.id));
                    match query.sort_direction() {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                });
            }
            None => matching.sort_by_key(|r| r.id),
        }

        let total = matching.len() as u64;
        let records = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size() as usize)
            .cloned()
            .collect();
        PageResult {
            records,
            total,
            page: query.page(),
            page_size: query.page_size(),
        }
    }

    pub fn create(&self, fields: &Fields) -> Result<Record, SyncError> {
        self.validate(None, fields)?;
        Ok(self.insert(fields.clone()))
    }

    pub fn update(&self, id: RecordId, fields: &Fields) -> Result<Record, SyncError> {
        self.validate(Some(id), fields)?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SyncError::NotFound(format!("Record {id} not found")))?;
        for (key, value) in fields {
            record.fields.insert(key.clone(), value.clone());
        }
        Ok(record.clone())
    }

    pub fn delete(&self, id: RecordId) -> Result<(), SyncError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(SyncError::NotFound(format!("Record {id} not found")));
        }
        Ok(())
    }

    fn validate(&self, id: Option<RecordId>, fields: &Fields) -> Result<(), SyncError> {
        if fields.contains_key("id") {
            return Err(SyncError::Validation {
                message: "Validation failed".into(),
                fields: FieldErrors::from([(
                    "id".to_string(),
                    vec!["is assigned by the server".to_string()],
                )]),
            });
        }
        let Some(unique) = &self.unique else {
            return Ok(());
        };
        let Some(value) = fields.get(unique) else {
            return Ok(());
        };
        let taken = self
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|r| Some(r.id) != id && r.fields.get(unique) == Some(value));
        if taken {
            return Err(SyncError::Conflict(format!("{unique} already exists")));
        }
        Ok(())
    }
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

pub fn fields(pairs: &[(&str, Value)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_filters(record: &Record, query: &QueryState) -> bool {
    query.filters().iter().all(|(key, expected)| {
        if key == SEARCH_FILTER {
            let needle = expected.to_lowercase();
            record
                .fields
                .values()
                .filter_map(Value::as_str)
                .any(|s| s.to_lowercase().contains(&needle))
        } else {
            record.get(key).is_some_and(|v| render(v) == *expected)
        }
    })
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => render(x).cmp(&render(y)),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Default)]
struct Faults {
    held: VecDeque<oneshot::Receiver<()>>,
    failures: VecDeque<SyncError>,
}

/// [`Remote`] over named [`MemoryCollection`]s, with hooks to delay or fail
/// individual calls.
///
/// A held call computes its answer immediately but only returns it once the
/// matching sender fires, which lets tests deliver responses out of order.
/// A sender dropped without firing turns the call into a network error.
#[derive(Default)]
pub struct MemoryRemote {
    collections: HashMap<String, MemoryCollection>,
    faults: Mutex<Faults>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, resource: &str, collection: MemoryCollection) -> Self {
        self.collections.insert(resource.to_string(), collection);
        self
    }

    pub fn collection(&self, resource: &str) -> Option<&MemoryCollection> {
        self.collections.get(resource)
    }

    /// Hold the next call of any kind until the returned sender fires.
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.faults.lock().unwrap().held.push_back(rx);
        tx
    }

    /// Alias of [`hold_next`](Self::hold_next) that reads better at list call sites.
    pub fn hold_next_list(&self) -> oneshot::Sender<()> {
        self.hold_next()
    }

    /// Fail the next call of any kind with `err`.
    pub fn fail_next(&self, err: SyncError) {
        self.faults.lock().unwrap().failures.push_back(err);
    }

    /// Number of calls made so far for an operation: list, create, update or delete.
    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    async fn call<T>(
        &self,
        op: &'static str,
        resource: &str,
        run: impl FnOnce(&MemoryCollection) -> Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        let (held, failure) = {
            let mut faults = self.faults.lock().unwrap();
            (faults.held.pop_front(), faults.failures.pop_front())
        };
        let result = match failure {
            Some(err) => Err(err),
            None => self
                .collections
                .get(resource)
                .ok_or_else(|| SyncError::NotFound(format!("unknown resource '{resource}'")))
                .and_then(run),
        };
        if let Some(held) = held {
            if held.await.is_err() {
                return Err(SyncError::Network("connection dropped".into()));
            }
        }
        result
    }
}

#[async_trait]
impl Remote for MemoryRemote {
    async fn list(&self, resource: &str, query: &QueryState) -> Result<PageResult, SyncError> {
        self.call("list", resource, |c| Ok(c.list(query))).await
    }

    async fn create(&self, resource: &str, fields: &Fields) -> Result<Record, SyncError> {
        self.call("create", resource, |c| c.create(fields)).await
    }

    async fn update(
        &self,
        resource: &str,
        id: RecordId,
        fields: &Fields,
    ) -> Result<Record, SyncError> {
        self.call("update", resource, |c| c.update(id, fields)).await
    }

    async fn delete(&self, resource: &str, id: RecordId) -> Result<(), SyncError> {
        self.call("delete", resource, |c| c.delete(id)).await
    }
}
