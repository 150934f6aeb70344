pub mod cache;
pub mod identity;
pub mod kv;
pub mod redb_store;
pub mod schema;

pub use cache::{LocalCache, keys};
pub use identity::IdentityProvider;
pub use kv::{KvStore, MemoryKv, StoreError};
pub use redb_store::RedbStore;
pub use schema::{
    ClientId, EntryId, HistoryEntry, HistoryLog, LAST_UPDATED, ProfileRecord, RemoteId, TempId,
    is_reserved_key, millis_to_datetime, now_millis,
};
