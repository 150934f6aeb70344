//! Typed, failure-absorbing view over a [`KvStore`].
//!
//! Local persistence errors never escape this type: a failed or corrupt read
//! becomes "no local data" and a failed write is logged and reported as
//! `false`.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::kv::KvStore;
use crate::schema::{HistoryEntry, ProfileRecord};

/// Keys used in the local cache.
pub mod keys {
    pub const CLIENT_ID: &str = "client_id";
    pub const PROFILE: &str = "profile";
    pub const HISTORY: &str = "history";
    pub const REMOTE_CREDENTIALS: &str = "remote_credentials";
}

#[derive(Clone)]
pub struct LocalCache {
    kv: Arc<dyn KvStore>,
}

impl LocalCache {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "local cache read failed, treating as empty");
                None
            }
        }
    }

    pub fn set_string(&self, key: &str, value: &str) -> bool {
        match self.kv.set(key, value) {
            Ok(()) => true,
            Err(err) => {
                warn!(key, error = %err, "local cache write failed");
                false
            }
        }
    }

    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_string(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "corrupt local cache record, ignoring");
                None
            }
        }
    }

    pub fn store_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(raw) => self.set_string(key, &raw),
            Err(err) => {
                warn!(key, error = %err, "failed to serialize local cache record");
                false
            }
        }
    }

    pub fn load_profile(&self) -> Option<ProfileRecord> {
        self.load_json(keys::PROFILE)
    }

    pub fn store_profile(&self, record: &ProfileRecord) -> bool {
        self.store_json(keys::PROFILE, record)
    }

    /// The cached history window; empty when absent or unreadable.
    pub fn load_history(&self) -> Vec<HistoryEntry> {
        self.load_json(keys::HISTORY).unwrap_or_default()
    }

    pub fn store_history(&self, entries: &[HistoryEntry]) -> bool {
        self.store_json(keys::HISTORY, entries)
    }
}
