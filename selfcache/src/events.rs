use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoherenceEvent {
    Loaded(RecordLoadedEvent),
    Refreshed(RecordRefreshedEvent),
    Forgotten(RecordForgottenEvent),
}

impl CoherenceEvent {
    pub fn record_type(&self) -> &str {
        match self {
            CoherenceEvent::Loaded(e) => &e.record_type,
            CoherenceEvent::Refreshed(e) => &e.record_type,
            CoherenceEvent::Forgotten(e) => &e.record_type,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            CoherenceEvent::Loaded(e) => &e.key,
            CoherenceEvent::Refreshed(e) => &e.key,
            CoherenceEvent::Forgotten(e) => &e.key,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            CoherenceEvent::Loaded(_) => "loaded",
            CoherenceEvent::Refreshed(_) => "refreshed",
            CoherenceEvent::Forgotten(_) => "forgotten",
        }
    }
}

/// A read-through miss queried the record store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordLoadedEvent {
    pub record_type: String,
    pub key: String,
    pub found: bool,
    pub timestamp: i64,
}

/// A successful write pushed the fresh record into the cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordRefreshedEvent {
    pub record_type: String,
    pub key: String,
    pub payload_size: usize,
    pub ttl_secs: u64,
    pub timestamp: i64,
}

/// A successful delete removed the cache entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordForgottenEvent {
    pub record_type: String,
    pub key: String,
    pub timestamp: i64,
}

/// Current unix timestamp in seconds
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Send on an optional channel. Having no subscribers is logged, not an error.
pub(crate) fn publish(
    broadcaster: Option<&tokio::sync::broadcast::Sender<CoherenceEvent>>,
    event: CoherenceEvent,
) {
    let Some(broadcaster) = broadcaster else {
        return;
    };
    let kind = event.kind();
    let key = event.key().to_string();
    match broadcaster.send(event) {
        Ok(subscriber_count) => {
            tracing::debug!(
                "Broadcasted {} event for key '{}' to {} subscriber(s)",
                kind,
                key,
                subscriber_count
            );
        }
        Err(_) => {
            tracing::warn!("No subscribers for {} event on key '{}'", kind, key);
        }
    }
}
