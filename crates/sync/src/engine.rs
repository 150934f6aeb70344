use std::sync::Arc;

use tracing::info;

use cachesync_config::DEFAULT_HISTORY_LIMIT;
use cachesync_remote::Remote;
use cachesync_store::{ClientId, IdentityProvider, LocalCache};

use crate::history::HistoryReconciler;
use crate::policy::BestEffort;
use crate::profile::ProfileReconciler;

/// Both reconcilers wired to one cache, one remote, one identity and one
/// failure policy.
pub struct SyncEngine {
    profile: ProfileReconciler,
    history: HistoryReconciler,
    identity: Arc<IdentityProvider>,
    policy: Arc<BestEffort>,
    remote: Remote,
}

impl SyncEngine {
    pub fn new(cache: LocalCache, remote: Remote) -> Self {
        Self::with_history_limit(cache, remote, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(cache: LocalCache, remote: Remote, history_limit: usize) -> Self {
        let identity = Arc::new(IdentityProvider::new(cache.clone()));
        let policy = Arc::new(BestEffort::new());
        info!(
            remote = remote.is_configured(),
            history_limit, "sync engine ready"
        );
        Self {
            profile: ProfileReconciler::new(
                cache.clone(),
                remote.clone(),
                Arc::clone(&identity),
                Arc::clone(&policy),
            ),
            history: HistoryReconciler::new(
                cache,
                remote.clone(),
                Arc::clone(&identity),
                Arc::clone(&policy),
                history_limit,
            ),
            identity,
            policy,
            remote,
        }
    }

    pub fn profile(&self) -> &ProfileReconciler {
        &self.profile
    }

    pub fn history(&self) -> &HistoryReconciler {
        &self.history
    }

    pub fn client_id(&self) -> ClientId {
        self.identity.client_id()
    }

    pub fn policy(&self) -> &BestEffort {
        &self.policy
    }

    pub fn remote(&self) -> &Remote {
        &self.remote
    }
}
