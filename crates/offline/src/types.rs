//! Shared types exposed to the UI layer.
//!
//! Plain data only (serde-friendly), so a front end can render them as-is.

use serde::{Deserialize, Serialize};

use bontez_core::LocalSaleId;

use crate::remote::RemoteError;

/// Connectivity state of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    /// The backend is reachable.
    Online,
    /// Network unreachable or backend unavailable.
    Offline,
}

impl ConnectivityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityState::Online => "online",
            ConnectivityState::Offline => "offline",
        }
    }

    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        }
    }
}

impl core::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot for the "pending sync" indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub connectivity: ConnectivityState,
    /// Sales captured locally and not yet accepted by the server.
    pub pending: usize,
    /// Whether a sync pass is running right now.
    pub syncing: bool,
}

/// A record the remote refused (or never answered) during a pass.
#[derive(Debug, Clone)]
pub struct SyncFailure {
    pub id: LocalSaleId,
    pub error: RemoteError,
}

/// What one or more back-to-back sync passes did.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub synced: Vec<LocalSaleId>,
    pub failed: Vec<SyncFailure>,
    /// Records left untouched because the device went offline mid-pass.
    pub deferred: usize,
    pub pruned: u64,
    pub passes: u32,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.deferred == 0
    }

    /// Fold a later pass into this report.
    ///
    /// A later pass revisits every record still unsynced, so its failures and
    /// deferrals replace the earlier ones.
    pub fn absorb(&mut self, later: SyncReport) {
        self.synced.extend(later.synced);
        self.failed = later.failed;
        self.deferred = later.deferred;
        self.pruned += later.pruned;
        self.passes += later.passes;
    }
}

/// Result of asking the engine to sync.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Passes ran to completion.
    Completed(SyncReport),
    /// A pass was already running; it will run once more when done.
    Coalesced,
    /// The device is offline; nothing was attempted.
    Offline,
}
