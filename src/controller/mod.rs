mod state;

pub use state::{SnapshotSummary, TableSnapshot, ViewEvent, ViewState};

use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::{RwLock, watch};

use crate::conf::Config;
use crate::core::SyncError;
use crate::fetch::{FetchCoordinator, FetchOutcome, FetchTicket};
use crate::mutation::{
    Mutation, MutationCoordinator, apply_created, apply_deleted, apply_updated,
};
use crate::query::{QueryState, SortDirection};
use crate::remote::Remote;
use crate::store::{Fields, PageResult, Record, RecordId, RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LatestFetch {
    NotIssued,
    InFlight,
    Applied,
    Failed,
}

struct TableInner {
    query: QueryState,
    store: RecordStore,
    view: ViewState,
    latest: LatestFetch,
    /// Count of fetches applied to the store so far.
    applied: u64,
}

impl TableInner {
    fn transition(&mut self, event: ViewEvent) {
        let view = std::mem::replace(&mut self.view, ViewState::Idle);
        self.view = view.next(event);
    }
}

/// The contract a resource table UI binds to.
///
/// Owns the query snapshot and the record store of one resource and mediates
/// every change to them. Query changes issue a fetch; only the newest issued
/// fetch may land. Mutations run one at a time and patch the store in place.
/// Every transition is published to receivers from
/// [`subscribe`](Self::subscribe).
pub struct ResourceTableController<R: Remote> {
    fetcher: FetchCoordinator<R>,
    mutator: MutationCoordinator<R>,
    inner: RwLock<TableInner>,
    snapshots: watch::Sender<TableSnapshot>,
}

impl<R: Remote> ResourceTableController<R> {
    pub fn new(remote: Arc<R>, resource: impl Into<String>, query: QueryState) -> Self {
        let resource = resource.into();
        let store = RecordStore::for_query(&query);
        let (snapshots, _) = watch::channel(TableSnapshot {
            view: ViewState::Idle,
            query: query.clone(),
        });
        Self {
            fetcher: FetchCoordinator::new(remote.clone(), resource.clone()),
            mutator: MutationCoordinator::new(remote, resource),
            inner: RwLock::new(TableInner {
                query,
                store,
                view: ViewState::Idle,
                latest: LatestFetch::NotIssued,
                applied: 0,
            }),
            snapshots,
        }
    }

    /// Controller for a named resource, with path and initial query taken
    /// from the config.
    pub fn from_config(remote: Arc<R>, config: &Config, resource: &str) -> Self {
        Self::new(remote, config.path_for(resource), config.query_for(resource))
    }

    pub fn resource(&self) -> &str {
        self.fetcher.resource()
    }

    pub fn subscribe(&self) -> watch::Receiver<TableSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn view(&self) -> ViewState {
        self.snapshots.borrow().view.clone()
    }

    pub fn query(&self) -> QueryState {
        self.snapshots.borrow().query.clone()
    }

    pub fn page(&self) -> Option<PageResult> {
        self.snapshots.borrow().page().cloned()
    }

    pub fn total(&self) -> Option<u64> {
        self.snapshots.borrow().page().map(|p| p.total)
    }

    /// Initial fetch. Does nothing if the current snapshot is already loaded
    /// or loading.
    pub async fn load(&self) -> Result<FetchOutcome, SyncError> {
        self.change_query(QueryState::clone).await
    }

    /// Fetch the current snapshot again, even if it is already loaded.
    pub async fn refresh(&self) -> Result<FetchOutcome, SyncError> {
        let ticket = {
            let mut inner = self.inner.write().await;
            let query = inner.query.clone();
            self.begin_fetch(&mut inner, query)
        };
        self.run_fetch(ticket).await
    }

    pub async fn change_page(&self, page: u32) -> Result<FetchOutcome, SyncError> {
        self.change_query(|q| q.with_page(page)).await
    }

    pub async fn change_page_size(&self, page_size: u32) -> Result<FetchOutcome, SyncError> {
        self.change_query(|q| q.with_page_size(page_size)).await
    }

    pub async fn change_sort(
        &self,
        field: &str,
        direction: SortDirection,
    ) -> Result<FetchOutcome, SyncError> {
        self.change_query(|q| q.with_sort(field, direction)).await
    }

    pub async fn change_filter(
        &self,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<FetchOutcome, SyncError> {
        let value = value.into();
        self.change_query(|q| q.with_filter(key, value)).await
    }

    pub async fn clear_filter(&self, key: &str) -> Result<FetchOutcome, SyncError> {
        self.change_query(|q| q.without_filter(key)).await
    }

    /// Replace the whole query snapshot, e.g. when restoring a saved view.
    pub async fn apply_query(&self, query: QueryState) -> Result<FetchOutcome, SyncError> {
        self.change_query(|_| query).await
    }

    async fn change_query(
        &self,
        change: impl FnOnce(&QueryState) -> QueryState,
    ) -> Result<FetchOutcome, SyncError> {
        let ticket = {
            let mut inner = self.inner.write().await;
            let next = change(&inner.query);
            let live = matches!(inner.latest, LatestFetch::InFlight | LatestFetch::Applied);
            if next == inner.query && live {
                debug!("{}: query unchanged, not fetching", self.resource());
                return Ok(FetchOutcome::Unchanged);
            }
            self.begin_fetch(&mut inner, next)
        };
        self.run_fetch(ticket).await
    }

    /// Install `query` and issue its fetch under the same lock, so token
    /// order always matches query order.
    fn begin_fetch(&self, inner: &mut TableInner, query: QueryState) -> FetchTicket {
        inner.query = query;
        inner.latest = LatestFetch::InFlight;
        inner.transition(ViewEvent::QueryChanged);
        let ticket = self.fetcher.issue(&inner.query);
        self.publish(inner);
        ticket
    }

    async fn run_fetch(&self, ticket: FetchTicket) -> Result<FetchOutcome, SyncError> {
        let (mut inner, outcome) = self
            .fetcher
            .complete(&ticket, &self.inner, |inner| &mut inner.store)
            .await;
        match outcome {
            Ok(FetchOutcome::Applied(page)) => {
                inner.latest = LatestFetch::Applied;
                inner.applied += 1;
                inner.transition(ViewEvent::FetchSucceeded(page.clone()));
                self.publish(&inner);
                Ok(FetchOutcome::Applied(page))
            }
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if self.fetcher.is_current(&ticket) {
                    warn!("{}: fetch #{} failed: {}", self.resource(), ticket.token, err);
                    inner.latest = LatestFetch::Failed;
                    inner.transition(ViewEvent::FetchFailed(err.clone()));
                    self.publish(&inner);
                } else {
                    debug!(
                        "{}: stale fetch #{} failed: {}",
                        self.resource(),
                        ticket.token,
                        err
                    );
                }
                Err(err)
            }
        }
    }

    /// Create a record. It appears on the current page only when that page
    /// is the unsorted first page; the total grows by one either way.
    pub async fn create(&self, fields: Fields) -> Result<Record, SyncError> {
        let permit = self.mutator.begin()?;
        let mutation = Mutation::Create {
            fields: fields.clone(),
        };
        let epoch = self.start_mutation(&mutation).await;

        match self.mutator.create(&permit, &fields).await {
            Ok(record) => {
                let mut inner = self.inner.write().await;
                let refetched = inner.applied != epoch;
                apply_created(&mut inner.store, record.clone(), refetched);
                self.finish_mutation(&mut inner);
                Ok(record)
            }
            Err(err) => self.fail_mutation(err, mutation).await,
        }
    }

    /// Update a record. A record that is not on the current page is left
    /// alone; the call still succeeds.
    pub async fn update(&self, id: RecordId, fields: Fields) -> Result<Record, SyncError> {
        let permit = self.mutator.begin()?;
        let mutation = Mutation::Update {
            id,
            fields: fields.clone(),
        };
        self.start_mutation(&mutation).await;

        match self.mutator.update(&permit, id, &fields).await {
            Ok(record) => {
                let mut inner = self.inner.write().await;
                apply_updated(&mut inner.store, record.clone());
                self.finish_mutation(&mut inner);
                Ok(record)
            }
            Err(err) => self.fail_mutation(err, mutation).await,
        }
    }

    /// Delete a record. If that empties a page after the first, the table
    /// steps back one page and fetches it.
    pub async fn delete(&self, id: RecordId) -> Result<(), SyncError> {
        let permit = self.mutator.begin()?;
        let mutation = Mutation::Delete { id };
        let epoch = self.start_mutation(&mutation).await;

        if let Err(err) = self.mutator.delete(&permit, id).await {
            return self.fail_mutation(err, mutation).await;
        }

        let step_back = {
            let mut inner = self.inner.write().await;
            let refetched = inner.applied != epoch;
            let effect = apply_deleted(&mut inner.store, id, refetched);
            self.finish_mutation(&mut inner);
            // A query already moved off the emptied page brings its own fetch.
            let shown = inner.store.page();
            effect
                .step_back_to
                .filter(|_| inner.query.page() == shown)
                .map(|page| {
                    let query = inner.query.with_page(page);
                    self.begin_fetch(&mut inner, query)
                })
        };
        drop(permit);

        if let Some(ticket) = step_back {
            debug!(
                "{}: page emptied by delete, moving to page {}",
                self.resource(),
                ticket.query.page()
            );
            // The delete itself succeeded; a failed re-fetch shows up in the view.
            if let Err(err) = self.run_fetch(ticket).await {
                warn!("{}: re-fetch after delete failed: {}", self.resource(), err);
            }
        }
        Ok(())
    }

    /// Enter `Mutating` and return the applied-fetch count at that moment.
    async fn start_mutation(&self, mutation: &Mutation) -> u64 {
        let mut inner = self.inner.write().await;
        inner.transition(ViewEvent::MutationStarted(mutation.clone()));
        self.publish(&inner);
        inner.applied
    }

    fn finish_mutation(&self, inner: &mut TableInner) {
        let page = inner.store.snapshot();
        inner.transition(ViewEvent::MutationSucceeded(page));
        self.publish(inner);
    }

    async fn fail_mutation<T>(&self, err: SyncError, mutation: Mutation) -> Result<T, SyncError> {
        warn!("{}: mutation failed: {}", self.resource(), err);
        let mut inner = self.inner.write().await;
        inner.transition(ViewEvent::MutationFailed(err.clone(), mutation));
        self.publish(&inner);
        Err(err)
    }

    fn publish(&self, inner: &TableInner) {
        self.snapshots.send_replace(TableSnapshot {
            view: inner.view.clone(),
            query: inner.query.clone(),
        });
    }
}
