//! Adapters for the selfcache ports: a moka cache backend and a sled record store.

pub mod moka_cache;
pub mod sled_store;

#[cfg(test)]
mod fixtures;

pub use moka_cache::MokaCacheBackend;
pub use sled_store::SledRecordStore;
