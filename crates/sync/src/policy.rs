//! The "never fail the caller because of the network" policy.
//!
//! Every remote call made by a reconciler goes through
//! [`BestEffort::absorb`], which turns a failure into `None`, logs it, and
//! keeps a bounded record so callers (and tests) can see what was swallowed.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use cachesync_remote::RemoteError;

/// Number of failures kept before the oldest are dropped.
const FAILURE_LOG_CAPACITY: usize = 64;

/// Remote operation a reconciler attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOp {
    GetProfile,
    PutProfile,
    BootstrapProfile,
    AppendHistory,
    UploadPending,
    ListHistory,
}

impl SyncOp {
    pub fn slug(self) -> &'static str {
        match self {
            Self::GetProfile => "get-profile",
            Self::PutProfile => "put-profile",
            Self::BootstrapProfile => "bootstrap-profile",
            Self::AppendHistory => "append-history",
            Self::UploadPending => "upload-pending",
            Self::ListHistory => "list-history",
        }
    }
}

impl fmt::Display for SyncOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone)]
pub struct RemoteFailure {
    pub op: SyncOp,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct BestEffort {
    failures: Mutex<VecDeque<RemoteFailure>>,
}

impl BestEffort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapse `result` to `Some(value)` or, on failure, log + record and
    /// return `None`.
    pub fn absorb<T>(&self, op: SyncOp, result: Result<T, RemoteError>) -> Option<T> {
        match result {
            Ok(value) => {
                debug!(op = %op, "remote call succeeded");
                Some(value)
            }
            Err(err) => {
                warn!(op = %op, error = %err, "remote call failed, continuing with local data");
                if let Ok(mut failures) = self.failures.lock() {
                    if failures.len() == FAILURE_LOG_CAPACITY {
                        failures.pop_front();
                    }
                    failures.push_back(RemoteFailure {
                        op,
                        message: err.to_string(),
                        at: Utc::now(),
                    });
                }
                None
            }
        }
    }

    /// Snapshot of recorded failures, oldest first.
    pub fn failures(&self) -> Vec<RemoteFailure> {
        self.failures
            .lock()
            .map(|failures| failures.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn failure_count(&self, op: SyncOp) -> usize {
        self.failures
            .lock()
            .map(|failures| failures.iter().filter(|f| f.op == op).count())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
    }
}
