use async_trait::async_trait;
use chrono::{DateTime, Utc};
use selfcache::{Attributes, CacheableRecord, FieldValue, PersistOptions, RecordQuery, RecordStore};
use serde::{Deserialize, Serialize};
use shared::config::Config;
use shared::{Error, Result};
use std::marker::PhantomData;
use std::path::Path;

#[derive(Deserialize)]
struct StoredRow<R> {
    deleted_at: Option<DateTime<Utc>>,
    record: R,
}

#[derive(Serialize)]
struct StoredRowRef<'a, R> {
    deleted_at: Option<DateTime<Utc>>,
    record: &'a R,
}

/// Sled-based record store, one tree per record type.
///
/// Rows are keyed by the record's identifying values. With the soft-delete
/// policy on, removal stamps `deleted_at` and default queries skip the row.
pub struct SledRecordStore<R> {
    db: sled::Db,
    tree: sled::Tree,
    soft_deletes: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R> SledRecordStore<R>
where
    R: CacheableRecord,
{
    /// Open (or create) the database at `path`
    /// Creates the parent directory if it doesn't exist
    pub fn open(path: impl AsRef<Path>, soft_deletes: bool) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Store(format!("Failed to create directory: {}", e)))?;
        }

        let db = sled::open(path)
            .map_err(|e| Error::Store(format!("Failed to open Sled database: {}", e)))?;

        Self::from_db(db, soft_deletes)
    }

    pub fn open_with_config(config: &Config) -> Result<Self> {
        Self::open(&config.data_dir, config.soft_deletes)
    }

    /// Use an already open database, so several record types can share it
    pub fn from_db(db: sled::Db, soft_deletes: bool) -> Result<Self> {
        let tree = db
            .open_tree(R::RECORD_TYPE)
            .map_err(|e| Error::Store(format!("Failed to open tree {}: {}", R::RECORD_TYPE, e)))?;

        Ok(Self {
            db,
            tree,
            soft_deletes,
            _record: PhantomData,
        })
    }

    /// Number of rows, soft-deleted ones included
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn row_key(record: &R) -> Result<String> {
        Ok(record
            .identifying_values(R::identifying_fields())?
            .to_string())
    }

    fn read_row(bytes: &[u8]) -> Result<StoredRow<R>> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize row: {}", e)))
    }

    fn encode_row(record: &R, deleted_at: Option<DateTime<Utc>>) -> Result<Vec<u8>> {
        serde_json::to_vec(&StoredRowRef { deleted_at, record })
            .map_err(|e| Error::Serialization(format!("Failed to serialize row: {}", e)))
    }

    fn existing_row(&self, key: &str) -> Result<Option<StoredRow<R>>> {
        self.tree
            .get(key.as_bytes())
            .map_err(|e| Error::Store(format!("Failed to get row: {}", e)))?
            .map(|bytes| Self::read_row(&bytes))
            .transpose()
    }

    /// Give a record without an identifier a fresh one, when keyed by a single field
    fn assign_identifier(&self, record: &mut R) -> Result<()> {
        if let [field] = R::identifying_fields() {
            if record.field(field).is_none() {
                let id = self.unused_identifier()?;
                record.set_field(field, FieldValue::UInt(id))?;
            }
        }
        Ok(())
    }

    /// Next generated id whose row is free; callers may have saved rows under explicit ids
    fn unused_identifier(&self) -> Result<u64> {
        loop {
            // sled ids start at 0
            let id = self
                .db
                .generate_id()
                .map_err(|e| Error::Store(format!("Failed to generate id: {}", e)))?
                + 1;
            let taken = self
                .tree
                .contains_key(FieldValue::UInt(id).to_string().as_bytes())
                .map_err(|e| Error::Store(format!("Failed to check id {}: {}", id, e)))?;
            if !taken {
                return Ok(id);
            }
            tracing::debug!("Skipping taken {} id {}", R::RECORD_TYPE, id);
        }
    }

    fn visible(&self, row: &StoredRow<R>, query: &RecordQuery) -> bool {
        !self.soft_deletes || query.with_soft_deleted || row.deleted_at.is_none()
    }
}

#[async_trait]
impl<R> RecordStore<R> for SledRecordStore<R>
where
    R: CacheableRecord,
{
    async fn first(&self, query: RecordQuery) -> Result<Option<R>> {
        // Point lookup when querying by the sole identifying field
        if R::identifying_fields() == [query.field.as_str()] {
            let row = self.existing_row(&query.value.to_string())?;
            return Ok(row
                .filter(|row| self.visible(row, &query))
                .map(|row| row.record));
        }

        for entry in self.tree.iter() {
            let (_, bytes) =
                entry.map_err(|e| Error::Store(format!("Failed to iterate rows: {}", e)))?;
            let row = Self::read_row(&bytes)?;
            let matched = row
                .record
                .field(&query.field)
                .is_some_and(|value| value.matches(&query.value));
            if matched && self.visible(&row, &query) {
                return Ok(Some(row.record));
            }
        }

        Ok(None)
    }

    async fn persist(
        &self,
        record: &mut R,
        attributes: Option<Attributes>,
        options: &PersistOptions,
    ) -> Result<bool> {
        for (name, value) in attributes.unwrap_or_default() {
            record.set_field(&name, value)?;
        }
        self.assign_identifier(record)?;

        let key = Self::row_key(record)?;
        let deleted_at = self
            .existing_row(&key)?
            .and_then(|row| row.deleted_at);
        let bytes = Self::encode_row(record, deleted_at)?;

        self.tree
            .insert(key.as_bytes(), bytes)
            .map_err(|e| Error::Store(format!("Failed to save row: {}", e)))?;

        if options.flush {
            self.tree
                .flush()
                .map_err(|e| Error::Store(format!("Failed to flush database: {}", e)))?;
        }

        tracing::debug!("Persisted {} row '{}'", R::RECORD_TYPE, key);
        Ok(true)
    }

    async fn remove(&self, record: &R) -> Result<bool> {
        let key = Self::row_key(record)?;

        let removed = if self.soft_deletes {
            match self.existing_row(&key)? {
                Some(row) if row.deleted_at.is_none() => {
                    let bytes = Self::encode_row(&row.record, Some(Utc::now()))?;
                    self.tree
                        .insert(key.as_bytes(), bytes)
                        .map_err(|e| Error::Removal(format!("Failed to soft delete row: {}", e)))?;
                    true
                }
                _ => false,
            }
        } else {
            self.tree
                .remove(key.as_bytes())
                .map_err(|e| Error::Removal(format!("Failed to delete row: {}", e)))?
                .is_some()
        };

        self.tree
            .flush()
            .map_err(|e| Error::Removal(format!("Failed to flush database: {}", e)))?;

        tracing::debug!("Removed {} row '{}': {}", R::RECORD_TYPE, key, removed);
        Ok(removed)
    }

    fn has_soft_delete_policy(&self) -> bool {
        self.soft_deletes
    }
}
