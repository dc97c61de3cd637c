//! Sale capture API used by the UI.
//!
//! Capture is always local-first: a sale is durably queued before anything
//! touches the network, and the call returns as soon as the write lands.

use std::sync::Arc;

use thiserror::Error;

use bontez_core::{DomainError, LocalSaleId};
use bontez_sales::SalePayload;

use crate::connectivity::ConnectivityMonitor;
use crate::queue::{QueueError, SaleQueue};
use crate::sync_engine::{SyncEngine, SyncError};
use crate::types::{SyncReport, SyncStatus};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid sale: {0}")]
    Invalid(#[from] DomainError),
    #[error("could not store sale locally: {0}")]
    Storage(#[from] QueueError),
    #[error("discarding pending sales needs explicit confirmation")]
    ResetNotConfirmed,
}

/// Entry point the sales screens talk to.
#[derive(Clone)]
pub struct SaleCapture {
    queue: Arc<dyn SaleQueue>,
    engine: Arc<SyncEngine>,
}

impl SaleCapture {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            queue: Arc::clone(engine.queue()),
            engine,
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        self.engine.monitor()
    }

    /// Validate and durably queue a sale, then nudge the engine if online.
    ///
    /// Never waits on the network. A sale is only reported captured once the
    /// queue write has succeeded.
    pub async fn capture_sale(&self, sale: SalePayload) -> Result<LocalSaleId, CaptureError> {
        sale.validate()?;

        let id = self.queue.enqueue(sale).await.map_err(|err| {
            tracing::error!("failed to queue sale: {err}");
            err
        })?;

        tracing::info!(sale_id = %id, online = self.monitor().is_online(), "sale captured");

        if self.monitor().is_online() {
            self.engine.trigger();
        }

        Ok(id)
    }

    /// Number of sales waiting to reach the server.
    pub async fn pending_count(&self) -> Result<usize, CaptureError> {
        Ok(self.queue.count_unsynced().await?)
    }

    pub async fn status(&self) -> Result<SyncStatus, CaptureError> {
        Ok(SyncStatus {
            connectivity: self.monitor().state(),
            pending: self.pending_count().await?,
            syncing: self.engine.is_syncing(),
        })
    }

    /// Manual "sync now". Unlike background triggers, failures come back.
    pub async fn sync_now(&self) -> Result<SyncReport, SyncError> {
        self.engine.sync_now().await
    }

    /// Drop every queued record, synced or not.
    ///
    /// Unsynced sales are lost for good, so the caller has to confirm.
    pub async fn discard_all_pending(&self, confirmed: bool) -> Result<u64, CaptureError> {
        if !confirmed {
            return Err(CaptureError::ResetNotConfirmed);
        }

        let unsynced = self.queue.count_unsynced().await?;
        let removed = self.queue.clear_all().await?;
        tracing::warn!(removed, unsynced, "discarded local sale queue");
        Ok(removed)
    }
}
