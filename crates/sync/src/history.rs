//! History reconciliation: upload everything still holding a temporary id,
//! then replace the local window with the remote's newest entries.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info};

use cachesync_remote::{NewRemoteEntry, Remote, RemoteEntry, RemoteTimestamp};
use cachesync_store::{
    EntryId, HistoryEntry, HistoryLog, IdentityProvider, LocalCache, RemoteId, TempId,
    millis_to_datetime, now_millis,
};

use crate::policy::{BestEffort, SyncOp};

pub struct HistoryReconciler {
    cache: LocalCache,
    remote: Remote,
    identity: Arc<IdentityProvider>,
    policy: Arc<BestEffort>,
    limit: usize,
}

impl HistoryReconciler {
    pub fn new(
        cache: LocalCache,
        remote: Remote,
        identity: Arc<IdentityProvider>,
        policy: Arc<BestEffort>,
        limit: usize,
    ) -> Self {
        Self {
            cache,
            remote,
            identity,
            policy,
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// The cached window, without contacting the remote.
    pub fn window(&self) -> HistoryLog {
        self.cache.load_history()
    }

    /// Cached entries that have never been accepted by the remote.
    pub fn pending(&self) -> Vec<HistoryEntry> {
        self.window().into_iter().filter(|entry| entry.id.is_local()).collect()
    }

    /// Record `payload` locally and try to upload it right away.
    ///
    /// Returns the remote id when the upload succeeded (the temporary id is
    /// retired in the cache), otherwise the temporary id.
    pub async fn append(&self, payload: Value) -> EntryId {
        let entry = HistoryEntry::new_local(payload);
        let temp_id = entry.id.clone();

        let mut window = self.cache.load_history();
        // Downloaded entries carry the remote's clock, which may run ahead.
        let at = window.partition_point(|existing| existing.timestamp > entry.timestamp);
        window.insert(at, entry.clone());
        cap_window(&mut window, self.limit);
        self.cache.store_history(&window);

        let store = match &self.remote {
            Remote::Unconfigured => return temp_id,
            Remote::Configured(store) => store,
        };

        let client = self.identity.client_id();
        let new_entry = NewRemoteEntry {
            payload: entry.payload,
            timestamp: RemoteTimestamp::Server,
        };
        let Some(remote_id) = self
            .policy
            .absorb(SyncOp::AppendHistory, store.append_history(&client, new_entry).await)
        else {
            return temp_id;
        };

        if let EntryId::Local(temp) = temp_id {
            let retired = HashMap::from([(temp, remote_id.clone())]);
            let mut window = self.cache.load_history();
            if retire(&mut window, &retired) > 0 {
                self.cache.store_history(&window);
            }
        }
        EntryId::Remote(remote_id)
    }

    /// Upload pending entries, then refresh the window from the remote.
    ///
    /// Falls back to the cached window (with any fresh retirements applied)
    /// when the download fails or comes back empty.
    pub async fn fetch(&self) -> HistoryLog {
        let mut local = self.cache.load_history();

        let store = match &self.remote {
            Remote::Unconfigured => return local,
            Remote::Configured(store) => store,
        };
        let client = self.identity.client_id();

        // Upload phase: independent, concurrent, joined before downloading.
        let uploads = local
            .iter()
            .filter_map(|entry| match &entry.id {
                EntryId::Local(temp) => Some((temp.clone(), entry)),
                EntryId::Remote(_) => None,
            })
            .map(|(temp, entry)| {
                let new_entry = NewRemoteEntry {
                    payload: entry.payload.clone(),
                    timestamp: RemoteTimestamp::At(millis_to_datetime(entry.timestamp)),
                };
                let client = &client;
                async move { (temp, store.append_history(client, new_entry).await) }
            });
        let results = join_all(uploads).await;

        let attempted = results.len();
        let retired: HashMap<TempId, RemoteId> = results
            .into_iter()
            .filter_map(|(temp, result)| {
                self.policy
                    .absorb(SyncOp::UploadPending, result)
                    .map(|remote_id| (temp, remote_id))
            })
            .collect();
        if attempted > 0 {
            info!(
                attempted,
                uploaded = retired.len(),
                client_id = %client,
                "uploaded pending history entries"
            );
        }
        if retire(&mut local, &retired) > 0 {
            self.cache.store_history(&local);
        }

        // Download phase.
        let downloaded = self
            .policy
            .absorb(
                SyncOp::ListHistory,
                store.list_recent_history(&client, self.limit).await,
            )
            .unwrap_or_default();
        if downloaded.is_empty() {
            debug!("remote history empty or unreachable, keeping cached window");
            return local;
        }

        let window = self.merge_window(downloaded, &local);
        self.cache.store_history(&window);
        window
    }

    /// Remote entries, plus any cached entries whose upload is still
    /// outstanding, newest first and capped at the window size.
    fn merge_window(&self, downloaded: Vec<RemoteEntry>, local: &[HistoryEntry]) -> HistoryLog {
        let mut window: HistoryLog = downloaded.into_iter().map(from_remote).collect();
        window.extend(local.iter().filter(|entry| entry.id.is_local()).cloned());
        window.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        cap_window(&mut window, self.limit);
        window
    }
}

fn from_remote(entry: RemoteEntry) -> HistoryEntry {
    HistoryEntry {
        id: EntryId::Remote(entry.id),
        timestamp: entry
            .timestamp
            .map(|at| at.timestamp_millis())
            .unwrap_or_else(now_millis),
        payload: entry.payload,
    }
}

/// Trim a newest-first window to `limit`, dropping the oldest confirmed
/// entries before any pending one.  Pending entries exist nowhere else, so
/// they only go once they alone exceed the limit.
fn cap_window(window: &mut HistoryLog, limit: usize) {
    let mut excess = window.len().saturating_sub(limit);
    if excess == 0 {
        return;
    }
    let mut keep = vec![true; window.len()];
    for (slot, entry) in keep.iter_mut().zip(window.iter()).rev() {
        if excess == 0 {
            break;
        }
        if !entry.id.is_local() {
            *slot = false;
            excess -= 1;
        }
    }
    let mut keep = keep.into_iter();
    window.retain(|_| keep.next().unwrap_or(true));
    window.truncate(limit);
}

/// Swap temporary ids for their remote ids in place.  Returns how many
/// entries changed.
fn retire(window: &mut [HistoryEntry], retired: &HashMap<TempId, RemoteId>) -> usize {
    let mut changed = 0;
    for entry in window.iter_mut() {
        if let EntryId::Local(temp) = &entry.id {
            if let Some(remote_id) = retired.get(temp) {
                entry.id = EntryId::Remote(remote_id.clone());
                changed += 1;
            }
        }
    }
    changed
}
