//! Background worker that keeps the queue draining.
//!
//! The worker owns the two background sync triggers: coming back online, and
//! start-up with sales left over from a previous run. It also runs the
//! reachability probe that feeds the connectivity monitor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::connectivity::{ConnectivityMonitor, ConnectivityState};
use crate::sync_engine::SyncEngine;

/// Default spacing between reachability probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);

pub struct SyncWorker {
    engine: Arc<SyncEngine>,
    probe_interval: Option<Duration>,
    shutdown: Arc<Notify>,
}

/// Handle to a running worker.
pub struct WorkerHandle {
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
}

impl SyncWorker {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            probe_interval: Some(DEFAULT_PROBE_INTERVAL),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Set the probe interval. `None` disables probing, leaving the monitor to
    /// whoever else feeds it.
    pub fn with_probe_interval(mut self, interval: Option<Duration>) -> Self {
        self.probe_interval = interval.filter(|d| !d.is_zero());
        self
    }

    /// Spawn the worker loop.
    ///
    /// The monitor subscription and the start-up drain decision are both taken
    /// before spawning. A transition that happens right after `start` returns
    /// is then seen exactly once, through the subscription.
    pub fn start(self) -> WorkerHandle {
        let monitor = self.engine.monitor().clone();
        let (mut transitions, drain_at_start) = (monitor.subscribe(), monitor.is_online());
        let shutdown = self.shutdown.clone();
        let engine = self.engine;
        let probe_interval = self.probe_interval;

        let join = tokio::spawn(async move {
            tracing::info!(probe_interval = ?probe_interval, "sync worker started");

            // Drain anything a previous run left behind.
            if drain_at_start {
                engine.trigger();
            }

            let mut probe = probe_interval.map(|period| {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                interval
            });

            loop {
                tokio::select! {
                    _ = shutdown.notified() => {
                        tracing::info!("sync worker received shutdown signal");
                        break;
                    }
                    change = transitions.recv() => match change {
                        Some(ConnectivityState::Online) => {
                            tracing::debug!("back online; triggering sync");
                            engine.trigger();
                        }
                        Some(ConnectivityState::Offline) => {}
                        None => break,
                    },
                    _ = next_probe(&mut probe) => {
                        probe_once(&engine, &monitor).await;
                    }
                }
            }

            tracing::info!("sync worker stopped");
        });

        WorkerHandle {
            shutdown: self.shutdown,
            join,
        }
    }
}

impl WorkerHandle {
    /// Signal shutdown and wait for the worker loop to exit.
    ///
    /// A pass already spawned by the worker keeps running; use
    /// `SyncEngine::wait_idle` to wait for it.
    pub async fn stop(self) {
        self.shutdown.notify_one();
        if let Err(err) = self.join.await {
            tracing::error!("sync worker task failed: {err}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

async fn next_probe(probe: &mut Option<tokio::time::Interval>) {
    match probe {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn probe_once(engine: &SyncEngine, monitor: &ConnectivityMonitor) {
    let reachable = engine.remote().is_reachable().await;
    tracing::trace!(reachable, "connectivity probe");
    // A transition to online comes back through the subscription and triggers sync.
    monitor.set_state(ConnectivityState::from_reachable(reachable));
}
