#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use cachesync_remote::{MemoryRemote, NewRemoteEntry, Remote, RemoteEntry, RemoteError, RemoteStore};
use cachesync_store::{ClientId, LocalCache, MemoryKv, ProfileRecord, RemoteId};
use cachesync_sync::SyncEngine;

/// [`MemoryRemote`] with switches for simulating outages.
#[derive(Clone, Default)]
pub struct FlakyRemote {
    pub backend: MemoryRemote,
    offline: Arc<AtomicBool>,
    fail_list: Arc<AtomicBool>,
    reject_payloads: Arc<Mutex<HashSet<String>>>,
    pub append_calls: Arc<AtomicUsize>,
}

impl FlakyRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make every append whose payload equals `payload` fail.
    pub fn reject_payload(&self, payload: &Value) {
        self.reject_payloads.lock().unwrap().insert(payload.to_string());
    }

    pub fn clear_rejections(&self) {
        self.reject_payloads.lock().unwrap().clear();
    }

    pub fn appends(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FlakyRemote {
    async fn get_profile(&self, client: &ClientId) -> Result<Option<ProfileRecord>, RemoteError> {
        self.check_online()?;
        self.backend.get_profile(client).await
    }

    async fn put_profile(&self, client: &ClientId, record: &ProfileRecord) -> Result<(), RemoteError> {
        self.check_online()?;
        self.backend.put_profile(client, record).await
    }

    async fn append_history(
        &self,
        client: &ClientId,
        entry: NewRemoteEntry,
    ) -> Result<RemoteId, RemoteError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.reject_payloads.lock().unwrap().contains(&entry.payload.to_string()) {
            return Err(RemoteError::Status {
                status: 500,
                body: "rejected".into(),
            });
        }
        self.backend.append_history(client, entry).await
    }

    async fn list_recent_history(
        &self,
        client: &ClientId,
        limit: usize,
    ) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.check_online()?;
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("query timed out".into()));
        }
        self.backend.list_recent_history(client, limit).await
    }
}

/// A cache that outlives engines, like a disk across restarts.
pub fn disk() -> MemoryKv {
    MemoryKv::new()
}

pub fn engine(disk: &MemoryKv, remote: Remote) -> SyncEngine {
    SyncEngine::new(LocalCache::new(Arc::new(disk.clone())), remote)
}

pub fn online(disk: &MemoryKv, remote: &FlakyRemote) -> SyncEngine {
    engine(disk, Remote::configured(remote.clone()))
}

pub fn offline(disk: &MemoryKv) -> SyncEngine {
    engine(disk, Remote::Unconfigured)
}
