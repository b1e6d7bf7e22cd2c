use crate::domain::{Attributes, FieldValue, PersistOptions};
use crate::events::{
    CoherenceEvent, RecordForgottenEvent, RecordLoadedEvent, RecordRefreshedEvent, now_timestamp,
    publish,
};
use crate::key::{self, CacheKey, DEFAULT_IDENTIFYING_FIELD, IdentifyingValue, derive_key};
use crate::ports::{CacheBackend, RecordQuery, RecordStore};
use crate::record::CacheableRecord;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result, TtlSecs};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Per-type cache settings, resolved once when the gateway is built
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayConfig {
    pub identifying_fields: Vec<String>,
    pub expiration: TtlSecs,
}

impl GatewayConfig {
    /// Settings declared by the record type
    pub fn for_record<R: CacheableRecord>() -> Self {
        Self {
            identifying_fields: key::identifying_fields::<R>(),
            expiration: key::expiration_duration::<R>(),
        }
    }

    pub fn with_identifying_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifying_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_expiration(mut self, expiration: TtlSecs) -> Self {
        self.expiration = expiration;
        self
    }
}

/// Cache-aside gateway binding one record type to a record store and a cache backend.
///
/// Reads go through the cache (`remember`), successful writes overwrite the
/// entry for the record's current identifying values, successful deletes
/// forget it. A store failure or refusal never touches the cache, and every
/// error from either collaborator is returned unchanged.
pub struct RecordGateway<R>
where
    R: CacheableRecord,
{
    store: Arc<dyn RecordStore<R>>,
    cache: Arc<dyn CacheBackend>,
    config: GatewayConfig,
    event_broadcaster: Option<broadcast::Sender<CoherenceEvent>>,
}

impl<R> RecordGateway<R>
where
    R: CacheableRecord,
{
    pub fn new(store: Arc<dyn RecordStore<R>>, cache: Arc<dyn CacheBackend>) -> Self {
        Self::with_config(store, cache, GatewayConfig::for_record::<R>())
    }

    pub fn with_config(
        store: Arc<dyn RecordStore<R>>,
        cache: Arc<dyn CacheBackend>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
            event_broadcaster: None,
        }
    }

    pub fn with_event_broadcaster(mut self, broadcaster: broadcast::Sender<CoherenceEvent>) -> Self {
        self.event_broadcaster = Some(broadcaster);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Fetch by the default `id` field
    pub async fn fetch(&self, id: impl Into<FieldValue>) -> Result<Option<R>> {
        self.fetch_by_key(DEFAULT_IDENTIFYING_FIELD, id).await
    }

    /// Fetch the first record where `key_field = key_value`, through the cache.
    ///
    /// The cache key is derived from the value alone. On a miss the store is
    /// queried (including soft-deleted records when the store hides them by
    /// default) and the result, found or not, is cached for the configured
    /// expiration.
    pub async fn fetch_by_key(
        &self,
        key_field: &str,
        key_value: impl Into<FieldValue>,
    ) -> Result<Option<R>> {
        let key_value = key_value.into();
        let key = derive_key(R::RECORD_TYPE, &IdentifyingValue::Single(key_value.clone()));

        let mut query = RecordQuery::new(key_field, key_value);
        if self.store.has_soft_delete_policy() {
            query = query.include_soft_deleted();
        }

        let store = Arc::clone(&self.store);
        let broadcaster = self.event_broadcaster.clone();
        let miss_key = key.clone();
        let compute: BoxFuture<'_, Result<Vec<u8>>> = Box::pin(async move {
            tracing::debug!("Cache miss for '{}', querying record store", miss_key);
            let record = store.first(query).await?;
            let payload = encode(&record)?;
            publish(
                broadcaster.as_ref(),
                CoherenceEvent::Loaded(RecordLoadedEvent {
                    record_type: R::RECORD_TYPE.to_string(),
                    key: miss_key.into_string(),
                    found: record.is_some(),
                    timestamp: now_timestamp(),
                }),
            );
            Ok(payload)
        });

        let payload = self
            .cache
            .remember(&key, self.config.expiration, compute)
            .await?;
        decode(&payload)
    }

    /// Create or update `record`, then refresh its cache entry
    pub async fn save(&self, record: &mut R, options: &PersistOptions) -> Result<bool> {
        self.persist_through(record, None, options).await
    }

    /// Apply `attributes` to `record` and persist, then refresh its cache entry
    pub async fn update(
        &self,
        record: &mut R,
        attributes: Attributes,
        options: &PersistOptions,
    ) -> Result<bool> {
        self.persist_through(record, Some(attributes), options)
            .await
    }

    async fn persist_through(
        &self,
        record: &mut R,
        attributes: Option<Attributes>,
        options: &PersistOptions,
    ) -> Result<bool> {
        if !self.store.persist(record, attributes, options).await? {
            tracing::debug!(
                "Record store declined write of {}, cache left untouched",
                R::RECORD_TYPE
            );
            return Ok(false);
        }

        self.reset_relation_cache(record);

        // Identifying values are read after the write; an insert may have assigned them
        let key = self.cache_key_for(record)?;
        let payload = encode(&Some(&*record))?;
        let payload_size = payload.len();
        self.cache
            .put(&key, payload, self.config.expiration)
            .await?;

        tracing::debug!(
            "Refreshed cache entry '{}' ({} bytes, ttl {}s)",
            key,
            payload_size,
            self.config.expiration.0
        );
        publish(
            self.event_broadcaster.as_ref(),
            CoherenceEvent::Refreshed(RecordRefreshedEvent {
                record_type: R::RECORD_TYPE.to_string(),
                key: key.into_string(),
                payload_size,
                ttl_secs: self.config.expiration.0,
                timestamp: now_timestamp(),
            }),
        );

        Ok(true)
    }

    /// Remove `record` from the store, then forget its cache entry
    pub async fn delete(&self, record: &R) -> Result<bool> {
        let key = self.cache_key_for(record)?;

        if !self.store.remove(record).await? {
            tracing::debug!(
                "Record store removed nothing for '{}', cache left untouched",
                key
            );
            return Ok(false);
        }

        let existed = self.cache.forget(&key).await?;
        tracing::debug!("Forgot cache entry '{}' (present: {})", key, existed);
        publish(
            self.event_broadcaster.as_ref(),
            CoherenceEvent::Forgotten(RecordForgottenEvent {
                record_type: R::RECORD_TYPE.to_string(),
                key: key.into_string(),
                timestamp: now_timestamp(),
            }),
        );

        Ok(true)
    }

    pub fn reset_relation_cache(&self, record: &mut R) {
        record.relations_mut().clear();
    }

    /// Cache key for the record's current identifying values
    pub fn cache_key_for(&self, record: &R) -> Result<CacheKey> {
        let values = record.identifying_values(&self.config.identifying_fields)?;
        Ok(derive_key(R::RECORD_TYPE, &values))
    }
}

impl<R> Clone for RecordGateway<R>
where
    R: CacheableRecord,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
            event_broadcaster: self.event_broadcaster.clone(),
        }
    }
}

impl<R> std::fmt::Debug for RecordGateway<R>
where
    R: CacheableRecord,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordGateway")
            .field("record_type", &R::RECORD_TYPE)
            .field("config", &self.config)
            .finish()
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn decode<R: DeserializeOwned>(payload: &[u8]) -> Result<Option<R>> {
    serde_json::from_slice(payload).map_err(|e| Error::Serialization(e.to_string()))
}
