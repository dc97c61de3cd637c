use std::sync::RwLock;

use bontez_core::LocalSaleId;
use bontez_sales::{PendingSale, SalePayload};

use super::{QueueError, SaleQueue};

/// In-memory sale queue.
///
/// Intended for tests/dev. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemorySaleQueue {
    records: RwLock<Vec<PendingSale>>,
}

impl InMemorySaleQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SaleQueue for InMemorySaleQueue {
    async fn enqueue(&self, sale: SalePayload) -> Result<LocalSaleId, QueueError> {
        let pending = PendingSale::capture(sale);
        let id = pending.id;

        self.records
            .write()
            .map_err(|_| QueueError::Write("lock poisoned".to_string()))?
            .push(pending);

        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<PendingSale>, QueueError> {
        let records = self
            .records
            .read()
            .map_err(|_| QueueError::Read("lock poisoned".to_string()))?;
        Ok(records.clone())
    }

    async fn list_unsynced(&self) -> Result<Vec<PendingSale>, QueueError> {
        let records = self
            .records
            .read()
            .map_err(|_| QueueError::Read("lock poisoned".to_string()))?;
        Ok(records.iter().filter(|s| !s.synced).cloned().collect())
    }

    async fn mark_synced(&self, id: &LocalSaleId) -> Result<(), QueueError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| QueueError::Write("lock poisoned".to_string()))?;

        if let Some(record) = records.iter_mut().find(|s| s.id == *id) {
            record.mark_synced();
        }
        Ok(())
    }

    async fn prune_synced(&self) -> Result<u64, QueueError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| QueueError::Write("lock poisoned".to_string()))?;

        let before = records.len();
        records.retain(|s| !s.synced);
        Ok((before - records.len()) as u64)
    }

    async fn clear_all(&self) -> Result<u64, QueueError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| QueueError::Write("lock poisoned".to_string()))?;

        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }

    async fn count_unsynced(&self) -> Result<usize, QueueError> {
        let records = self
            .records
            .read()
            .map_err(|_| QueueError::Read("lock poisoned".to_string()))?;
        Ok(records.iter().filter(|s| !s.synced).count())
    }
}
