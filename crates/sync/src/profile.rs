//! Profile reconciliation: local write-through, cloud-wins on load, and
//! one-time bootstrap of an empty remote from the local copy.

use std::sync::Arc;

use tracing::{debug, info};

use cachesync_remote::Remote;
use cachesync_store::{IdentityProvider, LocalCache, ProfileRecord};

use crate::policy::{BestEffort, SyncOp};

pub struct ProfileReconciler {
    cache: LocalCache,
    remote: Remote,
    identity: Arc<IdentityProvider>,
    policy: Arc<BestEffort>,
}

impl ProfileReconciler {
    pub fn new(
        cache: LocalCache,
        remote: Remote,
        identity: Arc<IdentityProvider>,
        policy: Arc<BestEffort>,
    ) -> Self {
        Self {
            cache,
            remote,
            identity,
            policy,
        }
    }

    /// Persist `record` locally, then mirror it to the remote if one is
    /// configured.  Neither step can fail the caller.
    pub async fn save_profile(&self, record: &ProfileRecord) {
        self.cache.store_profile(record);

        match &self.remote {
            Remote::Unconfigured => debug!("no remote configured, profile saved locally only"),
            Remote::Configured(store) => {
                let client = self.identity.client_id();
                let mirrored = self
                    .policy
                    .absorb(SyncOp::PutProfile, store.put_profile(&client, record).await);
                if mirrored.is_some() {
                    debug!(client_id = %client, "profile mirrored to remote");
                }
            }
        }
    }

    /// Resolve the authoritative profile.
    ///
    /// Any remote profile supersedes the local one, with no timestamp
    /// comparison.  An empty remote is seeded from the local copy.  Remote
    /// errors fall back to the local copy.
    pub async fn load_profile(&self) -> Option<ProfileRecord> {
        let local = self.cache.load_profile();

        let store = match &self.remote {
            Remote::Unconfigured => return local,
            Remote::Configured(store) => store,
        };

        let client = self.identity.client_id();
        let Some(remote) = self
            .policy
            .absorb(SyncOp::GetProfile, store.get_profile(&client).await)
        else {
            return local;
        };

        match (remote, local) {
            (Some(remote), _) => {
                self.cache.store_profile(&remote);
                Some(remote)
            }
            (None, Some(local)) => {
                let seeded = self
                    .policy
                    .absorb(SyncOp::BootstrapProfile, store.put_profile(&client, &local).await);
                if seeded.is_some() {
                    info!(client_id = %client, "seeded empty remote profile from local cache");
                }
                Some(local)
            }
            (None, None) => None,
        }
    }
}
