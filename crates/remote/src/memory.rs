//! In-process [`RemoteStore`].  Clones share state, so two clones behave like
//! two devices talking to the same backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use cachesync_store::{ClientId, ProfileRecord, RemoteId};

use crate::{NewRemoteEntry, RemoteEntry, RemoteError, RemoteStore, RemoteTimestamp};

#[derive(Debug, Default)]
struct ClientState {
    profile: Option<ProfileRecord>,
    history: Vec<RemoteEntry>,
}

#[derive(Debug, Default)]
struct Inner {
    clients: HashMap<ClientId, ClientState>,
    next_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, RemoteError> {
        self.inner
            .lock()
            .map_err(|_| RemoteError::Unavailable("memory remote lock poisoned".into()))
    }

    /// Current remote profile for `client`, bypassing the trait.
    pub fn profile(&self, client: &ClientId) -> Option<ProfileRecord> {
        self.lock()
            .ok()
            .and_then(|inner| inner.clients.get(client).and_then(|state| state.profile.clone()))
    }

    /// Every stored entry for `client` in insertion order.
    pub fn history(&self, client: &ClientId) -> Vec<RemoteEntry> {
        self.lock()
            .ok()
            .and_then(|inner| inner.clients.get(client).map(|state| state.history.clone()))
            .unwrap_or_default()
    }

    /// Insert a stored entry verbatim, e.g. one written by another device.
    pub fn insert_entry(&self, client: &ClientId, entry: RemoteEntry) {
        if let Ok(mut inner) = self.lock() {
            inner.clients.entry(client.clone()).or_default().history.push(entry);
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn get_profile(&self, client: &ClientId) -> Result<Option<ProfileRecord>, RemoteError> {
        let inner = self.lock()?;
        Ok(inner.clients.get(client).and_then(|state| state.profile.clone()))
    }

    async fn put_profile(&self, client: &ClientId, record: &ProfileRecord) -> Result<(), RemoteError> {
        // Re-stamped with this store's clock, like the HTTP backend.
        let stored = ProfileRecord::new(record.fields.clone());
        let mut inner = self.lock()?;
        inner.clients.entry(client.clone()).or_default().profile = Some(stored);
        Ok(())
    }

    async fn append_history(
        &self,
        client: &ClientId,
        entry: NewRemoteEntry,
    ) -> Result<RemoteId, RemoteError> {
        let timestamp = match entry.timestamp {
            RemoteTimestamp::Server => Utc::now(),
            RemoteTimestamp::At(at) => at,
        };
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = RemoteId::new(format!("mem-{:06}", inner.next_id));
        inner.clients.entry(client.clone()).or_default().history.push(RemoteEntry {
            id: id.clone(),
            timestamp: Some(timestamp),
            payload: entry.payload,
        });
        Ok(id)
    }

    async fn list_recent_history(
        &self,
        client: &ClientId,
        limit: usize,
    ) -> Result<Vec<RemoteEntry>, RemoteError> {
        let inner = self.lock()?;
        let mut entries = inner
            .clients
            .get(client)
            .map(|state| state.history.clone())
            .unwrap_or_default();
        // Stable sort keeps insertion order among equal timestamps; entries
        // without a timestamp sort last.
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }
}
