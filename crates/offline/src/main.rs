//! `bontez-syncd`: keeps the local sale queue draining to the backend.

use std::sync::Arc;

use anyhow::Context;
use bontez_offline::{
    ConnectivityMonitor, ConnectivityState, HttpSalesClient, OfflineConfig, RemoteSales, SaleQueue,
    SqliteSaleQueue, SyncEngine, SyncWorker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bontez_observability::init();

    let config = OfflineConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        api_url = %config.api_url,
        data_dir = %config.data_dir.display(),
        authenticated = config.auth_token.is_some(),
        "starting bontez-syncd"
    );

    let queue = Arc::new(
        SqliteSaleQueue::open(config.queue_path())
            .await
            .with_context(|| format!("failed to open sale queue at {:?}", config.queue_path()))?,
    );

    let remote = match &config.auth_token {
        Some(token) => HttpSalesClient::with_token(&config.api_url, token, config.submit_timeout),
        None => HttpSalesClient::new(&config.api_url, config.submit_timeout),
    };
    let remote: Arc<dyn RemoteSales> = Arc::new(remote);

    let initial = ConnectivityState::from_reachable(remote.is_reachable().await);
    let monitor = ConnectivityMonitor::new(initial);

    let engine = Arc::new(
        SyncEngine::new(queue.clone(), remote, monitor).with_submit_timeout(config.submit_timeout),
    );
    let worker = SyncWorker::new(engine.clone())
        .with_probe_interval(config.probe_interval)
        .start();

    let pending = queue.count_unsynced().await.context("failed to read sale queue")?;
    tracing::info!(connectivity = %initial, pending, "sync service ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("shutting down");
    worker.stop().await;
    engine.wait_idle().await;
    queue.close().await;

    Ok(())
}
