//! Local durable queue of captured sales.
//!
//! Every sale the sale form submits lands here first. Records stay until the
//! sync engine has confirmed them with the server and a prune removes them;
//! the only other way out is an explicit `clear_all`.

mod in_memory;
mod sqlite;

pub use in_memory::InMemorySaleQueue;
pub use sqlite::{QUEUE_DB_FILE, SqliteSaleQueue};

use bontez_core::LocalSaleId;
use bontez_sales::{PendingSale, SalePayload};
use thiserror::Error;

/// Queue operation error.
///
/// Losing a sale is the worst outcome this subsystem can produce, so storage
/// failures always reach the caller.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A new or updated record could not be made durable.
    #[error("failed to write pending sale: {0}")]
    Write(String),

    #[error("failed to read pending sales: {0}")]
    Read(String),

    /// A stored record could not be decoded.
    #[error("corrupt pending sale record: {0}")]
    Corrupt(String),

    /// The queue handle was closed.
    #[error("sale queue is closed")]
    Closed,
}

/// Durable FIFO of `PendingSale` records keyed by their local id.
///
/// Implementations must keep insertion order stable for `list_all` and
/// `list_unsynced`, and must make `mark_synced` a no-op for unknown or
/// already synced ids.
#[async_trait::async_trait]
pub trait SaleQueue: Send + Sync {
    /// Persist a new unsynced record and return its generated id.
    async fn enqueue(&self, sale: SalePayload) -> Result<LocalSaleId, QueueError>;

    /// All stored records, oldest first.
    async fn list_all(&self) -> Result<Vec<PendingSale>, QueueError>;

    /// Records not yet accepted by the server, oldest first.
    async fn list_unsynced(&self) -> Result<Vec<PendingSale>, QueueError>;

    /// Flag a record as accepted by the server.
    async fn mark_synced(&self, id: &LocalSaleId) -> Result<(), QueueError>;

    /// Delete every record that is already synced. Returns how many were removed.
    async fn prune_synced(&self) -> Result<u64, QueueError>;

    /// Delete everything, synced or not. Returns how many were removed.
    async fn clear_all(&self) -> Result<u64, QueueError>;

    async fn count_unsynced(&self) -> Result<usize, QueueError> {
        Ok(self.list_unsynced().await?.len())
    }
}
