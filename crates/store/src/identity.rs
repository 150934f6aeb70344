use std::sync::OnceLock;

use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{LocalCache, keys};
use crate::schema::ClientId;

/// Hands out the installation's [`ClientId`], creating and persisting it on
/// first use.  Never touches the network.
pub struct IdentityProvider {
    cache: LocalCache,
    resolved: OnceLock<ClientId>,
}

impl IdentityProvider {
    pub fn new(cache: LocalCache) -> Self {
        Self {
            cache,
            resolved: OnceLock::new(),
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.resolved.get_or_init(|| self.load_or_create()).clone()
    }

    fn load_or_create(&self) -> ClientId {
        if let Some(existing) = self.cache.get_string(keys::CLIENT_ID) {
            let existing = existing.trim();
            if !existing.is_empty() {
                return ClientId::new(existing);
            }
        }

        let id = ClientId::new(Uuid::new_v4().to_string());
        if self.cache.set_string(keys::CLIENT_ID, id.as_str()) {
            info!(client_id = %id, "generated new client identity");
        } else {
            // Still stable for this process via `resolved`.
            warn!(client_id = %id, "client identity could not be persisted");
        }
        id
    }
}
