use std::str::FromStr;
use tracing::{info, warn};

/// Process-wide settings for the cache backend and the record store adapters.
/// Per-record-type settings (identifying fields, expiration) live on the record type.
#[derive(Clone, Debug)]
pub struct Config {
    pub cache_name: String,
    pub max_entries: Option<u64>,
    pub data_dir: String,
    pub soft_deletes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_name: Self::DEFAULT_CACHE_NAME.to_string(),
            max_entries: None,
            data_dir: Self::DEFAULT_DATA_DIR.to_string(),
            soft_deletes: false,
        }
    }
}

impl Config {
    const DEFAULT_CACHE_NAME: &str = "selfcache";
    const DEFAULT_DATA_DIR: &str = "./data";

    /// Load a `.env` file if present, then read the environment
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment variables from {}", path.display()),
            Err(_) => info!("No .env file found, using system environment variables"),
        }
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            cache_name: lookup("SELFCACHE_CACHE_NAME")
                .unwrap_or_else(|| Self::DEFAULT_CACHE_NAME.to_string()),
            max_entries: lookup("SELFCACHE_MAX_ENTRIES")
                .and_then(|raw| parse_or_warn::<u64>("SELFCACHE_MAX_ENTRIES", &raw)),
            data_dir: lookup("SELFCACHE_DATA_DIR")
                .unwrap_or_else(|| Self::DEFAULT_DATA_DIR.to_string()),
            soft_deletes: lookup("SELFCACHE_SOFT_DELETES")
                .and_then(|raw| parse_or_warn::<bool>("SELFCACHE_SOFT_DELETES", &raw))
                .unwrap_or(false),
        }
    }
}

fn parse_or_warn<T: FromStr>(name: &str, raw: &str) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{} has unparsable value '{}', using default", name, raw);
            None
        }
    }
}
