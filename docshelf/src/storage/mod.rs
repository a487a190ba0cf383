use crate::connection::ConnectionOptions;
use crate::error::Result;
use crate::schema::IndexOptions;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub mod memory;

/// Options for a paged `find`. A `limit` of zero means unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    pub limit: u64,
    pub skip: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    pub upsert: bool,
}

/// What a single-document update did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
    pub upserted: u64,
}

/// Entry point of a storage backend. Implementations connect once and
/// hand out collection handles; everything past `connect` is owned by the
/// returned connection.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        options: &ConnectionOptions,
    ) -> Result<Arc<dyn StorageConnection>>;
}

pub trait StorageConnection: Send + Sync {
    fn collection(&self, name: &str) -> Arc<dyn StorageCollection>;
}

/// The narrow per-collection contract this layer orchestrates around.
///
/// `update_one` has set-merge semantics: fields of `update` overwrite the
/// matched document's fields; with `upsert` and no match, `update` itself
/// is inserted. `create_index` must be idempotent for an equivalent spec.
#[async_trait]
pub trait StorageCollection: Send + Sync {
    async fn find(&self, filter: &Value, options: FindOptions) -> Result<Vec<Value>>;

    async fn update_one(
        &self,
        filter: &Value,
        update: &Value,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome>;

    async fn find_one(&self, filter: &Value) -> Result<Option<Value>>;

    async fn create_index(&self, path: &str, options: &IndexOptions) -> Result<()>;
}
