use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::core::SyncError;
use crate::query::QueryState;
use crate::remote::Remote;
use crate::store::{PageResult, RecordStore};

/// Sequence number assigned to a list request when it is issued.
pub type RequestToken = u64;

/// A list request that has been issued but not yet reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub token: RequestToken,
    pub query: QueryState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The response was the newest issued and now backs the store.
    Applied(PageResult),
    /// A newer request was issued meanwhile; the response was dropped.
    Stale(RequestToken),
    /// The snapshot was already loaded or loading; nothing was issued.
    Unchanged,
}

/// Issues list requests and decides which responses may reach the store.
///
/// A response is applied only if its token is the highest one issued so far.
/// Tokens are compared against the highest *issued*, not the highest arrived,
/// so a slow early request can never overwrite a later one. Superseded
/// requests are not aborted; their responses are ignored on arrival.
pub struct FetchCoordinator<R: Remote> {
    remote: Arc<R>,
    resource: String,
    issued: AtomicU64,
}

impl<R: Remote> FetchCoordinator<R> {
    pub fn new(remote: Arc<R>, resource: impl Into<String>) -> Self {
        Self {
            remote,
            resource: resource.into(),
            issued: AtomicU64::new(0),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Assign the next token to a request for `query`.
    pub fn issue(&self, query: &QueryState) -> FetchTicket {
        let token = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "{}: issued fetch #{} for page {} (size {})",
            self.resource,
            token,
            query.page(),
            query.page_size()
        );
        FetchTicket {
            token,
            query: query.clone(),
        }
    }

    pub fn highest_issued(&self) -> RequestToken {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.token >= self.highest_issued()
    }

    /// Perform the request. Does not touch any store.
    pub async fn execute(&self, ticket: &FetchTicket) -> Result<PageResult, SyncError> {
        self.remote.list(&self.resource, &ticket.query).await
    }

    /// Replace the store with `result` if `ticket` is still the newest
    /// request. Returns whether it was applied.
    pub fn reconcile(
        &self,
        ticket: &FetchTicket,
        result: PageResult,
        store: &mut RecordStore,
    ) -> bool {
        if !self.is_current(ticket) {
            debug!(
                "{}: discarding stale response #{} (newest is #{})",
                self.resource,
                ticket.token,
                self.highest_issued()
            );
            return false;
        }
        store.reload(&ticket.query, result);
        true
    }

    /// Issue, execute and reconcile one request against a shared store.
    /// On failure the store is left unchanged.
    pub async fn fetch_page(
        &self,
        query: &QueryState,
        store: &RwLock<RecordStore>,
    ) -> Result<FetchOutcome, SyncError> {
        let ticket = self.issue(query);
        let (_store, outcome) = self.complete(&ticket, store, |store| store).await;
        outcome
    }

    /// Execute an issued request and reconcile it into the store reached
    /// through `state`. The write guard is handed back so callers can
    /// update their own state under the same lock the store changed under.
    pub async fn complete<'a, S>(
        &self,
        ticket: &FetchTicket,
        state: &'a RwLock<S>,
        store: impl FnOnce(&mut S) -> &mut RecordStore,
    ) -> (RwLockWriteGuard<'a, S>, Result<FetchOutcome, SyncError>) {
        let result = self.execute(ticket).await;
        let mut guard = state.write().await;
        let outcome = result.map(|page| {
            let target = store(&mut *guard);
            if self.reconcile(ticket, page, target) {
                FetchOutcome::Applied(target.snapshot())
            } else {
                FetchOutcome::Stale(ticket.token)
            }
        });
        (guard, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryCollection, MemoryRemote};

    fn remote(rows: usize) -> Arc<MemoryRemote> {
        Arc::new(MemoryRemote::new().with_collection("clients", MemoryCollection::named(rows)))
    }

    #[tokio::test]
    async fn test_tokens_increase() {
        let fetcher = FetchCoordinator::new(remote(0), "clients");
        let query = QueryState::default();
        let first = fetcher.issue(&query);
        let second = fetcher.issue(&query);
        assert_eq!(first.token, 1);
        assert_eq!(second.token, 2);
        assert!(!fetcher.is_current(&first));
        assert!(fetcher.is_current(&second));
    }

    #[tokio::test]
    async fn test_fetch_page_applies() {
        let fetcher = FetchCoordinator::new(remote(25), "clients");
        let store = RwLock::new(RecordStore::new(1, 10));

        let outcome = fetcher.fetch_page(&QueryState::new(10), &store).await.unwrap();
        let FetchOutcome::Applied(page) = outcome else {
            panic!("expected applied, got {outcome:?}");
        };
        assert_eq!(page.records.len(), 10);
        assert_eq!(page.total, 25);
        assert_eq!(store.read().await.total(), 25);
    }

    #[tokio::test]
    async fn test_later_issue_wins_even_if_earlier_arrives_last() {
        let remote = remote(25);
        let fetcher = FetchCoordinator::new(remote.clone(), "clients");
        let store = RwLock::new(RecordStore::new(1, 10));

        let release = remote.hold_next_list();
        let slow_query = QueryState::new(10).with_search("Client 1");
        let fast_query = QueryState::new(10).with_page(2);

        let slow = fetcher.fetch_page(&slow_query, &store);
        let fast = async {
            let outcome = fetcher.fetch_page(&fast_query, &store).await;
            release.send(()).unwrap();
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow.unwrap(), FetchOutcome::Stale(1));
        assert!(matches!(fast.unwrap(), FetchOutcome::Applied(_)));

        let store = store.read().await;
        assert_eq!(store.page(), 2);
        assert_eq!(store.total(), 25);
        assert_eq!(store.records().next().unwrap().id, 11);
    }

    #[tokio::test]
    async fn test_failure_leaves_store() {
        let remote = remote(5);
        let fetcher = FetchCoordinator::new(remote.clone(), "clients");
        let store = RwLock::new(RecordStore::new(1, 10));
        fetcher.fetch_page(&QueryState::new(10), &store).await.unwrap();

        remote.fail_next(SyncError::Network("connection reset".into()));
        let err = fetcher
            .fetch_page(&QueryState::new(10).with_page(2), &store)
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::Network("connection reset".into()));

        let store = store.read().await;
        assert_eq!(store.page(), 1);
        assert_eq!(store.len(), 5);
    }
}
