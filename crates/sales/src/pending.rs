//! Locally captured sale awaiting confirmation from the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bontez_core::{Entity, LocalSaleId};

use crate::sale::SalePayload;

/// A sale captured on this device before the server confirmed it.
///
/// `id` and `timestamp` are fixed at capture; `synced` flips from `false` to
/// `true` once and never back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSale {
    pub id: LocalSaleId,
    #[serde(flatten)]
    pub sale: SalePayload,
    pub timestamp: DateTime<Utc>,
    pub synced: bool,
}

impl PendingSale {
    /// Wrap a payload into a fresh, unsynced record stamped with the device clock.
    pub fn capture(sale: SalePayload) -> Self {
        Self::capture_at(sale, Utc::now())
    }

    pub fn capture_at(sale: SalePayload, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: LocalSaleId::new(),
            sale,
            timestamp,
            synced: false,
        }
    }

    /// Flag the record as accepted by the server.
    ///
    /// Returns `false` when it already was.
    pub fn mark_synced(&mut self) -> bool {
        if self.synced {
            return false;
        }
        self.synced = true;
        true
    }
}

impl Entity for PendingSale {
    type Id = LocalSaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
