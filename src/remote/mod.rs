mod http;
pub mod wire;

pub use http::HttpRemote;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::SyncError;
use crate::query::QueryState;
use crate::store::{Fields, PageResult, Record, RecordId};

/// A remote collection endpoint. `resource` is the path of the collection
/// relative to the remote's base, e.g. `clients`.
///
/// Implementations report timeouts as [`SyncError::Network`] and never retry.
/// Requests may complete in any order relative to each other.
#[async_trait]
pub trait Remote: Send + Sync {
    async fn list(&self, resource: &str, query: &QueryState) -> Result<PageResult, SyncError>;
    async fn create(&self, resource: &str, fields: &Fields) -> Result<Record, SyncError>;
    async fn update(
        &self,
        resource: &str,
        id: RecordId,
        fields: &Fields,
    ) -> Result<Record, SyncError>;
    async fn delete(&self, resource: &str, id: RecordId) -> Result<(), SyncError>;
}

#[async_trait]
impl<R: Remote + ?Sized> Remote for Arc<R> {
    async fn list(&self, resource: &str, query: &QueryState) -> Result<PageResult, SyncError> {
        (**self).list(resource, query).await
    }

    async fn create(&self, resource: &str, fields: &Fields) -> Result<Record, SyncError> {
        (**self).create(resource, fields).await
    }

    async fn update(
        &self,
        resource: &str,
        id: RecordId,
        fields: &Fields,
    ) -> Result<Record, SyncError> {
        (**self).update(resource, id, fields).await
    }

    async fn delete(&self, resource: &str, id: RecordId) -> Result<(), SyncError> {
        (**self).delete(resource, id).await
    }
}
