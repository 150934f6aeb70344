use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Stable per-installation identifier that scopes every remote call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key the record's own timestamp is stored under.  Application fields may
/// not use it.
pub const LAST_UPDATED: &str = "last_updated";

/// The singleton profile document: arbitrary application fields plus the
/// time of the last write.
///
/// `fields` shares one JSON object with `last_updated`, so a field named
/// [`LAST_UPDATED`] is never written out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProfileRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn new(mut fields: Map<String, Value>) -> Self {
        fields.remove(LAST_UPDATED);
        Self {
            fields,
            last_updated: Utc::now(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set one field and bump `last_updated`.  Returns `false`, changing
    /// nothing, when `key` is the reserved [`LAST_UPDATED`].
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if is_reserved_key(&key) {
            return false;
        }
        self.fields.insert(key, value);
        self.last_updated = Utc::now();
        true
    }
}

pub fn is_reserved_key(key: &str) -> bool {
    key == LAST_UPDATED
}

impl Serialize for ProfileRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in self.fields.iter().filter(|(key, _)| !is_reserved_key(key)) {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(LAST_UPDATED, &self.last_updated)?;
        map.end()
    }
}

impl Default for ProfileRecord {
    fn default() -> Self {
        Self::new(Map::new())
    }
}

// ── History ──────────────────────────────────────────────────────────────────

/// Identifier assigned locally before the remote has confirmed the entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(String);

/// Highest sequence value handed out so far; keeps ids strictly increasing
/// even when several entries are created within one millisecond.
static LAST_TEMP_SEQ: AtomicI64 = AtomicI64::new(0);

impl TempId {
    /// Allocate a fresh id derived from the creation time `at_millis`.
    pub fn allocate(at_millis: i64) -> Self {
        let mut prev = LAST_TEMP_SEQ.load(Ordering::Relaxed);
        loop {
            let next = at_millis.max(prev + 1);
            match LAST_TEMP_SEQ.compare_exchange_weak(prev, next, Ordering::SeqCst, Ordering::Relaxed) {
                Ok(_) => return Self(format!("local_{next}")),
                Err(current) => prev = current,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier assigned by the remote store once the entry is durable there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Which side currently owns an entry's identity.  Retirement of a
/// temporary id is the transition `Local -> Remote`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EntryId {
    Local(TempId),
    Remote(RemoteId),
}

impl EntryId {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Local(id) => id.as_str(),
            Self::Remote(id) => id.as_str(),
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: EntryId,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
    pub payload: Value,
}

impl HistoryEntry {
    /// Build a not-yet-uploaded entry stamped with the current time.
    pub fn new_local(payload: Value) -> Self {
        let timestamp = now_millis();
        Self {
            id: EntryId::Local(TempId::allocate(timestamp)),
            timestamp,
            payload,
        }
    }
}

/// Newest-first window of history entries.
pub type HistoryLog = Vec<HistoryEntry>;

// ── Time helpers ─────────────────────────────────────────────────────────────

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert epoch milliseconds to a UTC timestamp, clamping values chrono
/// cannot represent to "now".
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}
