use std::sync::Arc;

use log::info;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::core::SyncError;
use crate::remote::Remote;
use crate::store::{Fields, Record, RecordId, RecordStore};

/// A create, update or delete with the input it was called with, kept so a
/// failed attempt can be corrected and resubmitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Mutation {
    Create { fields: Fields },
    Update { id: RecordId, fields: Fields },
    Delete { id: RecordId },
}

/// Proof that no other mutation is in flight for this table.
pub struct MutationPermit<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// What a successful delete did to the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteEffect {
    pub removed: bool,
    /// Set when the delete emptied a page after the first; the table moves
    /// to this page and fetches it unless it is already navigating away.
    pub step_back_to: Option<u32>,
}

/// Runs mutations against the remote one at a time and patches the store
/// with their results. Failures never touch the store.
pub struct MutationCoordinator<R: Remote> {
    remote: Arc<R>,
    resource: String,
    gate: Mutex<()>,
}

impl<R: Remote> MutationCoordinator<R> {
    pub fn new(remote: Arc<R>, resource: impl Into<String>) -> Self {
        Self {
            remote,
            resource: resource.into(),
            gate: Mutex::new(()),
        }
    }

    /// Claim the mutation slot, or fail with [`SyncError::Busy`] if another
    /// mutation still holds it.
    pub fn begin(&self) -> Result<MutationPermit<'_>, SyncError> {
        self.gate
            .try_lock()
            .map(|guard| MutationPermit { _guard: guard })
            .map_err(|_| SyncError::Busy)
    }

    pub async fn create(
        &self,
        _permit: &MutationPermit<'_>,
        fields: &Fields,
    ) -> Result<Record, SyncError> {
        let record = self.remote.create(&self.resource, fields).await?;
        info!("{}: created record {}", self.resource, record.id);
        Ok(record)
    }

    pub async fn update(
        &self,
        _permit: &MutationPermit<'_>,
        id: RecordId,
        fields: &Fields,
    ) -> Result<Record, SyncError> {
        let record = self.remote.update(&self.resource, id, fields).await?;
        info!("{}: updated record {}", self.resource, id);
        Ok(record)
    }

    pub async fn delete(&self, _permit: &MutationPermit<'_>, id: RecordId) -> Result<(), SyncError> {
        self.remote.delete(&self.resource, id).await?;
        info!("{}: deleted record {}", self.resource, id);
        Ok(())
    }
}

/// Patch a created record into the page the store is showing.
///
/// The record is placed only on an unsorted first page; anywhere else it
/// would break the server's ordering, so it stays invisible until the next
/// fetch. `refetched` says whether a list response landed while the create
/// was in flight: that response already counted the record, so the total is
/// left alone. Returns whether the record is now on the page.
pub fn apply_created(store: &mut RecordStore, record: Record, refetched: bool) -> bool {
    if store.contains(record.id) {
        return store.replace_record(record);
    }
    if !refetched {
        store.increment_total();
    }
    if store.is_unsorted_first_page() {
        store.insert_front(record);
        true
    } else {
        false
    }
}

/// Replace the record in place if it is on the current page.
pub fn apply_updated(store: &mut RecordStore, record: Record) -> bool {
    store.replace_record(record)
}

/// Remove a deleted record from the page the store is showing.
///
/// A record still on the page was counted by the store's total. One that is
/// absent was either on another page or already dropped by a list response
/// that landed while the delete was in flight (`refetched`); only the first
/// case still needs the total lowered.
pub fn apply_deleted(store: &mut RecordStore, id: RecordId, refetched: bool) -> DeleteEffect {
    let removed = store.remove(id);
    if removed || !refetched {
        store.decrement_total();
    }
    let page = store.page();
    let step_back_to = (removed && store.is_empty() && page > 1).then(|| page - 1);
    DeleteEffect {
        removed,
        step_back_to,
    }
}
