//! Turning config plus stored credentials into a [`Remote`].

use std::time::Duration;

use tracing::{info, warn};

use cachesync_config::{AppConfig, CredentialError, RemoteCredentials};
use cachesync_remote::{HttpRemote, Remote};
use cachesync_store::{LocalCache, keys};

/// Validate a pasted credential blob and keep it in the local cache.
///
/// Invalid blobs are reported to the caller and nothing is stored.
pub fn store_credentials(cache: &LocalCache, raw: &str) -> Result<RemoteCredentials, CredentialError> {
    let credentials = RemoteCredentials::parse(raw)?;
    if !cache.store_json(keys::REMOTE_CREDENTIALS, &credentials) {
        warn!("validated credentials could not be written to the local cache");
    }
    Ok(credentials)
}

pub fn stored_credentials(cache: &LocalCache) -> Option<RemoteCredentials> {
    let raw = cache.get_string(keys::REMOTE_CREDENTIALS)?;
    match RemoteCredentials::parse(&raw) {
        Ok(credentials) => Some(credentials),
        Err(err) => {
            warn!(error = %err, "stored remote credentials are invalid, ignoring");
            None
        }
    }
}

/// Decide, once, whether this session talks to a remote.
pub fn build_remote(cache: &LocalCache, config: &AppConfig) -> Remote {
    if !config.remote.enabled {
        info!("remote sync disabled in config");
        return Remote::Unconfigured;
    }

    let Some(credentials) = stored_credentials(cache) else {
        info!("no remote credentials stored, running local-only");
        return Remote::Unconfigured;
    };

    let timeout = Duration::from_secs(config.remote.request_timeout_secs.max(1));
    match HttpRemote::new(&credentials, &config.remote.base_url, timeout) {
        Ok(remote) => {
            info!(project_id = %credentials.project_id, "remote store configured");
            Remote::configured(remote)
        }
        Err(err) => {
            warn!(error = %err, "could not construct remote adapter, running local-only");
            Remote::Unconfigured
        }
    }
}
