// shared/src/lib.rs

use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("record store: {0}")]
    Store(String),
    #[error("record removal failed: {0}")]
    Removal(String),
    #[error("cache backend: {0}")]
    Backend(String),
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("unknown field '{field}' on {record_type}")]
    UnknownField {
        record_type: &'static str,
        field: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Expiration duration of a cached entry, in seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TtlSecs(pub u64);

impl TtlSecs {
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl From<TtlSecs> for Duration {
    fn from(ttl: TtlSecs) -> Self {
        ttl.as_duration()
    }
}

pub mod config;
