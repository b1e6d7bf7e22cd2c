//! # selfcache
//!
//! Cache-aside layer for single records looked up by key.
//!
//! - **Key derivation** ([`key`]): `<type>:selfCache:<value>[:<value>...]`
//! - **Gateway** ([`gateway::RecordGateway`]): read-through on fetch,
//!   write-through on save/update, delete-through on delete
//! - **Ports** ([`ports`]): the record store and cache backend the gateway is
//!   composed from; adapters live in `storage-engine`

pub mod domain;
pub mod events;
pub mod gateway;
pub mod key;
pub mod ports;
pub mod record;

pub use domain::{Attributes, FieldValue, PersistOptions, RelationCache};
pub use events::CoherenceEvent;
pub use gateway::{GatewayConfig, RecordGateway};
pub use key::{CacheKey, IdentifyingValue, derive_key};
pub use ports::{CacheBackend, RecordQuery, RecordStore};
pub use record::CacheableRecord;
pub use shared::{Error, Result, TtlSecs};
