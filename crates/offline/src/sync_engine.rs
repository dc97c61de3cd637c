//! Sync engine: reconciles the local sale queue with the remote backend.
//!
//! A pass:
//! 1. lists unsynced records (oldest first)
//! 2. submits each payload to the remote, bounded by a timeout
//! 3. marks accepted records synced by their **local** id
//! 4. leaves refused records unsynced and moves on (no retry within a pass)
//! 5. prunes synced records
//!
//! Only one pass runs at a time. Triggers that arrive during a pass collapse
//! into a single extra pass once the current one finishes.
//!
//! Delivery to the server is at-least-once: if the server stores a sale but
//! the response is lost, the record stays unsynced and is submitted again on
//! the next trigger.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::connectivity::ConnectivityMonitor;
use crate::queue::{QueueError, SaleQueue};
use crate::remote::{RemoteError, RemoteSales};
use crate::types::{SyncFailure, SyncOutcome, SyncReport};

/// Default bound on a single remote create call.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("client is offline")]
    Offline,
    #[error("a sync pass is already running")]
    InProgress,
    #[error("{failed} sale(s) could not be synced ({synced} synced): {last_error}")]
    Incomplete {
        failed: usize,
        synced: usize,
        last_error: RemoteError,
    },
    #[error(transparent)]
    Queue(#[from] QueueError),
}

#[derive(Debug, Clone, Copy, Default)]
struct PassState {
    running: bool,
    rerun: bool,
}

/// Clears `running` if the pass future is dropped, panics or fails before it
/// released the slot itself. `rerun` is left untouched.
struct RunningGuard<'a> {
    state: &'a watch::Sender<PassState>,
    armed: bool,
}

impl RunningGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(|s| s.running = false);
        }
    }
}

pub struct SyncEngine {
    queue: Arc<dyn SaleQueue>,
    remote: Arc<dyn RemoteSales>,
    monitor: ConnectivityMonitor,
    submit_timeout: Duration,
    state: watch::Sender<PassState>,
    passes: AtomicU64,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<dyn SaleQueue>,
        remote: Arc<dyn RemoteSales>,
        monitor: ConnectivityMonitor,
    ) -> Self {
        let (state, _) = watch::channel(PassState::default());
        Self {
            queue,
            remote,
            monitor,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            state,
            passes: AtomicU64::new(0),
        }
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    pub fn queue(&self) -> &Arc<dyn SaleQueue> {
        &self.queue
    }

    pub fn remote(&self) -> &Arc<dyn RemoteSales> {
        &self.remote
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Whether a pass is running right now.
    pub fn is_syncing(&self) -> bool {
        self.state.borrow().running
    }

    /// Number of passes completed since start-up.
    pub fn pass_count(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Resolve once no pass is running.
    pub async fn wait_idle(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|s| !s.running).await;
    }

    /// Fire-and-forget sync, used by background triggers.
    ///
    /// Failures are logged and otherwise contained here.
    pub fn trigger(self: &Arc<Self>) {
        if self.monitor.is_offline() {
            tracing::debug!("sync trigger ignored while offline");
            return;
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            match engine.run_until_idle().await {
                Ok(SyncOutcome::Completed(report)) if !report.is_clean() => {
                    tracing::warn!(
                        synced = report.synced.len(),
                        failed = report.failed.len(),
                        deferred = report.deferred,
                        "background sync left sales pending"
                    );
                }
                Ok(_) => {}
                Err(err) => tracing::error!("background sync failed: {err}"),
            }
        });
    }

    /// Manual "sync now": like a trigger, but failures are reported.
    pub async fn sync_now(&self) -> Result<SyncReport, SyncError> {
        match self.run_until_idle().await? {
            SyncOutcome::Offline => Err(SyncError::Offline),
            SyncOutcome::Coalesced => Err(SyncError::InProgress),
            SyncOutcome::Completed(report) => match report.failed.last() {
                Some(last) => Err(SyncError::Incomplete {
                    failed: report.failed.len(),
                    synced: report.synced.len(),
                    last_error: last.error.clone(),
                }),
                // Connectivity dropped before every pending sale was tried.
                None if report.deferred > 0 || report.passes == 0 => Err(SyncError::Offline),
                None => Ok(report),
            },
        }
    }

    /// Run passes until no trigger is outstanding.
    ///
    /// If a pass is already running this only asks it to go around once more.
    pub async fn run_until_idle(&self) -> Result<SyncOutcome, SyncError> {
        if self.monitor.is_offline() {
            return Ok(SyncOutcome::Offline);
        }

        let mut acquired = false;
        self.state.send_modify(|s| {
            if s.running {
                s.rerun = true;
            } else {
                // This pass covers anything a stale rerun asked for.
                *s = PassState {
                    running: true,
                    rerun: false,
                };
                acquired = true;
            }
        });
        if !acquired {
            tracing::debug!("sync already running; coalescing trigger");
            return Ok(SyncOutcome::Coalesced);
        }
        let mut guard = RunningGuard {
            state: &self.state,
            armed: true,
        };

        let mut report = SyncReport::default();
        loop {
            if self.monitor.is_offline() {
                tracing::debug!("went offline between passes; stopping");
                let unsynced = self.queue.count_unsynced().await?;
                report.deferred = unsynced.saturating_sub(report.failed.len());
                self.state.send_modify(|s| *s = PassState::default());
                break;
            }

            report.absorb(self.run_pass().await?);

            // Consuming `rerun` and releasing the slot happen under one update,
            // so a trigger either lands before (and gets its pass) or after
            // (and starts its own).
            let mut again = false;
            self.state.send_modify(|s| {
                again = std::mem::take(&mut s.rerun);
                if !again {
                    s.running = false;
                }
            });
            if !again {
                break;
            }
        }
        guard.disarm();

        Ok(SyncOutcome::Completed(report))
    }

    async fn run_pass(&self) -> Result<SyncReport, SyncError> {
        let pending = self.queue.list_unsynced().await?;
        let mut report = SyncReport {
            passes: 1,
            ..SyncReport::default()
        };

        tracing::info!(pending = pending.len(), "starting sync pass");

        let total = pending.len();
        for (idx, sale) in pending.into_iter().enumerate() {
            if self.monitor.is_offline() {
                report.deferred = total - idx;
                tracing::info!(deferred = report.deferred, "went offline mid-pass; deferring rest");
                break;
            }

            match self.submit(&sale.sale).await {
                Ok(remote) => {
                    self.queue.mark_synced(&sale.id).await?;
                    tracing::debug!(sale_id = %sale.id, server_id = remote.id, "sale synced");
                    report.synced.push(sale.id);
                }
                Err(error) => {
                    tracing::warn!(sale_id = %sale.id, "sale not synced, will retry on next trigger: {error}");
                    report.failed.push(SyncFailure { id: sale.id, error });
                }
            }
        }

        report.pruned = self.queue.prune_synced().await?;
        self.passes.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            synced = report.synced.len(),
            failed = report.failed.len(),
            deferred = report.deferred,
            pruned = report.pruned,
            "sync pass complete"
        );

        Ok(report)
    }

    async fn submit(
        &self,
        sale: &bontez_sales::SalePayload,
    ) -> Result<crate::remote::RemoteSale, RemoteError> {
        match tokio::time::timeout(self.submit_timeout, self.remote.create_sale(sale)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.submit_timeout)),
        }
    }
}
