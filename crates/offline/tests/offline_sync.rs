//! Black-box tests for offline capture and sync.
//!
//! These drive the public API only: capture façade, queue, monitor, engine,
//! worker. The remote is a scripted in-test double.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bontez_offline::{
    ConnectivityMonitor, ConnectivityState, InMemorySaleQueue, RemoteError, RemoteSale, RemoteSales,
    SaleCapture, SaleQueue, SqliteSaleQueue, SyncEngine, SyncError, SyncWorker, WorkerHandle,
};
use bontez_sales::{PaymentMethod, SaleLine, SalePayload};

/// Remote that accepts everything unless told to fail, and records calls.
#[derive(Default)]
struct ScriptedRemote {
    fail_all: AtomicBool,
    failing_clients: Mutex<HashSet<i64>>,
    calls: AtomicUsize,
    accepted: Mutex<Vec<SalePayload>>,
}

impl ScriptedRemote {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail_for_client(&self, client: i64) {
        self.failing_clients.lock().unwrap().insert(client);
    }

    fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RemoteSales for ScriptedRemote {
    async fn create_sale(&self, sale: &SalePayload) -> Result<RemoteSale, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let refused = self.fail_all.load(Ordering::SeqCst)
            || self.failing_clients.lock().unwrap().contains(&sale.client_id.get());
        if refused {
            return Err(RemoteError::Network("connection reset".to_string()));
        }

        let mut accepted = self.accepted.lock().unwrap();
        accepted.push(sale.clone());
        Ok(RemoteSale {
            id: accepted.len() as i64,
            total_amount: Some(sale.total() as f64),
        })
    }
}

struct Harness {
    queue: Arc<dyn SaleQueue>,
    remote: Arc<ScriptedRemote>,
    monitor: ConnectivityMonitor,
    engine: Arc<SyncEngine>,
    capture: SaleCapture,
}

impl Harness {
    fn new(state: ConnectivityState) -> Self {
        Self::with_queue(Arc::new(InMemorySaleQueue::new()), state)
    }

    fn with_queue(queue: Arc<dyn SaleQueue>, state: ConnectivityState) -> Self {
        let remote = Arc::new(ScriptedRemote::default());
        let monitor = ConnectivityMonitor::new(state);
        let engine = Arc::new(SyncEngine::new(queue.clone(), remote.clone(), monitor.clone()));
        let capture = SaleCapture::new(engine.clone());
        Self {
            queue,
            remote,
            monitor,
            engine,
            capture,
        }
    }

    fn start_worker(&self) -> WorkerHandle {
        SyncWorker::new(self.engine.clone())
            .with_probe_interval(None)
            .start()
    }
}

/// Poll `check` until it holds, or fail after about two seconds.
async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}

fn cash_sale(client: i64) -> SalePayload {
    SalePayload::new(client, PaymentMethod::Cash, vec![SaleLine::new(1, 2, 1200)])
}

#[tokio::test]
async fn captured_sale_is_immediately_listed_unsynced() {
    let h = Harness::new(ConnectivityState::Offline);

    let id = h.capture.capture_sale(cash_sale(1)).await.unwrap();

    let all = h.queue.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, id);
    assert!(!all[0].synced);
}

#[tokio::test]
async fn offline_captures_queue_up_without_network_calls() {
    let h = Harness::new(ConnectivityState::Offline);

    for client in 1..=5 {
        h.capture.capture_sale(cash_sale(client)).await.unwrap();
    }

    assert_eq!(h.queue.list_unsynced().await.unwrap().len(), 5);
    assert_eq!(h.capture.pending_count().await.unwrap(), 5);
    assert_eq!(h.remote.calls(), 0);
    assert_eq!(h.engine.pass_count(), 0);
}

#[tokio::test]
async fn reconnecting_runs_exactly_one_pass_and_empties_the_queue() {
    let h = Harness::new(ConnectivityState::Offline);
    let worker = h.start_worker();
    for client in 1..=3 {
        h.capture.capture_sale(cash_sale(client)).await.unwrap();
    }

    h.monitor.set_online();

    eventually("one sync pass", || h.engine.pass_count() >= 1).await;
    h.engine.wait_idle().await;

    assert_eq!(h.engine.pass_count(), 1);
    assert_eq!(h.remote.calls(), 3);
    assert!(h.queue.list_unsynced().await.unwrap().is_empty());
    assert!(h.queue.list_all().await.unwrap().is_empty());

    worker.stop().await;
}

#[tokio::test]
async fn a_refused_sale_does_not_hold_back_later_ones() {
    let h = Harness::new(ConnectivityState::Offline);
    h.remote.fail_for_client(1);
    let x = h.capture.capture_sale(cash_sale(1)).await.unwrap();
    h.capture.capture_sale(cash_sale(2)).await.unwrap();

    h.monitor.set_online();
    let err = h.capture.sync_now().await.unwrap_err();
    assert!(matches!(err, SyncError::Incomplete { failed: 1, synced: 1, .. }));

    let all = h.queue.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, x);
    assert!(!all[0].synced);
}

#[tokio::test]
async fn marking_synced_twice_is_the_same_as_once() {
    let h = Harness::new(ConnectivityState::Offline);
    let a = h.capture.capture_sale(cash_sale(1)).await.unwrap();
    let b = h.capture.capture_sale(cash_sale(2)).await.unwrap();

    h.queue.mark_synced(&a).await.unwrap();
    let once = h.queue.list_all().await.unwrap();
    h.queue.mark_synced(&a).await.unwrap();
    let twice = h.queue.list_all().await.unwrap();

    assert_eq!(once, twice);
    let unsynced: Vec<_> = h.queue.list_unsynced().await.unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(unsynced, vec![b]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_captures_get_distinct_ids() {
    let h = Harness::new(ConnectivityState::Offline);

    let tasks: Vec<_> = (1..=50)
        .map(|client| {
            let capture = h.capture.clone();
            tokio::spawn(async move { capture.capture_sale(cash_sale(client)).await })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap().unwrap());
    }

    assert_eq!(ids.len(), 50);
    let stored: HashSet<_> = h.queue.list_all().await.unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(stored, ids);
}

#[tokio::test]
async fn cylinder_sale_captured_offline_is_delivered_on_reconnect() {
    let h = Harness::new(ConnectivityState::Offline);
    let worker = h.start_worker();

    let sale_a = cash_sale(1);
    let a = h.capture.capture_sale(sale_a.clone()).await.unwrap();
    let unsynced: Vec<_> = h.queue.list_unsynced().await.unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(unsynced, vec![a]);

    h.monitor.set_online();
    eventually("sync pass", || h.engine.pass_count() >= 1).await;
    h.engine.wait_idle().await;

    assert!(h.queue.list_all().await.unwrap().is_empty());
    assert_eq!(*h.remote.accepted.lock().unwrap(), vec![sale_a]);

    worker.stop().await;
}

#[tokio::test]
async fn failed_online_capture_is_retried_manually() {
    let h = Harness::new(ConnectivityState::Online);
    h.remote.set_fail_all(true);

    let b = h.capture.capture_sale(cash_sale(2)).await.unwrap();
    eventually("background attempt", || h.engine.pass_count() >= 1).await;
    h.engine.wait_idle().await;

    let unsynced: Vec<_> = h.queue.list_unsynced().await.unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(unsynced, vec![b]);

    h.remote.set_fail_all(false);
    let report = h.capture.sync_now().await.unwrap();

    assert_eq!(report.synced, vec![b]);
    assert!(h.queue.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn queued_sales_survive_a_restart_and_drain_at_startup() {
    let dir = tempfile::tempdir().unwrap();

    {
        let queue = Arc::new(SqliteSaleQueue::open_in_dir(dir.path()).await.unwrap());
        let h = Harness::with_queue(queue.clone(), ConnectivityState::Offline);
        h.capture.capture_sale(cash_sale(1)).await.unwrap();
        h.capture.capture_sale(cash_sale(2)).await.unwrap();
        queue.close().await;
    }

    let queue = Arc::new(SqliteSaleQueue::open_in_dir(dir.path()).await.unwrap());
    let h = Harness::with_queue(queue.clone(), ConnectivityState::Online);
    assert_eq!(h.capture.pending_count().await.unwrap(), 2);

    let worker = h.start_worker();
    eventually("startup drain", || h.engine.pass_count() >= 1).await;
    h.engine.wait_idle().await;

    assert_eq!(h.remote.calls(), 2);
    assert!(h.queue.list_all().await.unwrap().is_empty());

    worker.stop().await;
    queue.close().await;
}

#[tokio::test]
async fn status_reflects_connectivity_and_backlog() {
    let h = Harness::new(ConnectivityState::Offline);
    h.capture.capture_sale(cash_sale(1)).await.unwrap();

    let status = h.capture.status().await.unwrap();
    assert_eq!(status.connectivity, ConnectivityState::Offline);
    assert_eq!(status.pending, 1);

    h.monitor.set_online();
    h.capture.sync_now().await.unwrap();

    let status = h.capture.status().await.unwrap();
    assert_eq!(status.connectivity, ConnectivityState::Online);
    assert_eq!(status.pending, 0);
    assert!(!status.syncing);
}
