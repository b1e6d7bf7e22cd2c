#![deny(clippy::all)]

use crate::domain::{Attributes, FieldValue, PersistOptions};
use crate::key::CacheKey;
use async_trait::async_trait;
use futures::future::BoxFuture;
use shared::{Result, TtlSecs};

// Ports are the pluggable collaborators the gateway is composed from

/// Point query against a record store: first record where `field = value`
#[derive(Clone, Debug, PartialEq)]
pub struct RecordQuery {
    pub field: String,
    pub value: FieldValue,
    pub with_soft_deleted: bool,
}

impl RecordQuery {
    pub fn new(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            with_soft_deleted: false,
        }
    }

    /// Widen the query to records hidden by a soft-delete policy
    pub fn include_soft_deleted(mut self) -> Self {
        self.with_soft_deleted = true;
        self
    }
}

/// Port for the persistent record store (e.g., a database table)
#[async_trait]
pub trait RecordStore<R>: Send + Sync + 'static {
    /// First record matching the query, if any
    async fn first(&self, query: RecordQuery) -> Result<Option<R>>;

    /// Create or update the record, applying `attributes` first when given.
    /// Returns `false` when the store declined the write.
    async fn persist(
        &self,
        record: &mut R,
        attributes: Option<Attributes>,
        options: &PersistOptions,
    ) -> Result<bool>;

    /// Returns `false` when nothing was removed
    async fn remove(&self, record: &R) -> Result<bool>;

    /// Whether default queries hide soft-deleted records
    fn has_soft_delete_policy(&self) -> bool;
}

/// Port for the shared key-value cache. Payloads are opaque bytes so one
/// backend can serve every record type.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Unexpired payload stored under `key`
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;

    /// Return the unexpired payload under `key`, otherwise await `compute`,
    /// store its output for `ttl` and return it
    async fn remember<'a>(
        &'a self,
        key: &'a CacheKey,
        ttl: TtlSecs,
        compute: BoxFuture<'a, Result<Vec<u8>>>,
    ) -> Result<Vec<u8>>;

    /// Overwrite the payload under `key`, expiring after `ttl`
    async fn put(&self, key: &CacheKey, payload: Vec<u8>, ttl: TtlSecs) -> Result<()>;

    /// Returns whether an entry was present
    async fn forget(&self, key: &CacheKey) -> Result<bool>;
}
