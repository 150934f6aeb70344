//! Remote store adapter: the per-client profile document and the per-client
//! ordered history collection living on the authoritative server.
//!
//! Whether a remote exists at all is decided once, at construction, and
//! carried as [`Remote`].  Reconcilers match on it instead of checking for a
//! missing handle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use cachesync_store::{ClientId, ProfileRecord, RemoteId};

pub mod http;
pub mod memory;

pub use http::HttpRemote;
pub use memory::MemoryRemote;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected remote response: {0}")]
    Decode(String),
    #[error("remote unavailable: {0}")]
    Unavailable(String),
}

/// Timestamp attached to a remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteTimestamp {
    /// Let the remote stamp the write with its own clock.
    Server,
    /// Preserve a client-side creation time.
    At(DateTime<Utc>),
}

/// A history entry as submitted for append; carries no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRemoteEntry {
    pub payload: Value,
    pub timestamp: RemoteTimestamp,
}

/// A history entry as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: RemoteId,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payload: Value,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_profile(&self, client: &ClientId) -> Result<Option<ProfileRecord>, RemoteError>;

    /// Store `record` as the client's profile.  The remote stamps
    /// `last_updated` with its own clock.
    async fn put_profile(&self, client: &ClientId, record: &ProfileRecord) -> Result<(), RemoteError>;

    async fn append_history(
        &self,
        client: &ClientId,
        entry: NewRemoteEntry,
    ) -> Result<RemoteId, RemoteError>;

    /// Up to `limit` entries, newest first.
    async fn list_recent_history(
        &self,
        client: &ClientId,
        limit: usize,
    ) -> Result<Vec<RemoteEntry>, RemoteError>;
}

#[derive(Clone)]
pub enum Remote {
    Configured(Arc<dyn RemoteStore>),
    Unconfigured,
}

impl Remote {
    pub fn configured(store: impl RemoteStore + 'static) -> Self {
        Self::Configured(Arc::new(store))
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }
}

impl std::fmt::Debug for Remote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured(_) => f.write_str("Remote::Configured"),
            Self::Unconfigured => f.write_str("Remote::Unconfigured"),
        }
    }
}
