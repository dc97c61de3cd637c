//! Remote sale submission.
//!
//! The sync engine only needs "create this sale on the backend". Both the REST
//! API and the storage-only fallback used on static hosting provide it.

mod http;
mod in_memory;

pub use http::HttpSalesClient;
pub use in_memory::InMemorySalesBackend;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bontez_sales::{ClientId, PaymentMethod, ProductId, SalePayload, SupplierId};

/// Why a remote create call did not succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// The server's representation of an accepted sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSale {
    /// Server-assigned id. Logged only; never written back to the local record.
    pub id: i64,
    #[serde(default)]
    pub total_amount: Option<f64>,
}

/// Capability to create sales on a backend.
#[async_trait::async_trait]
pub trait RemoteSales: Send + Sync {
    /// Create one sale. The local id is never sent.
    async fn create_sale(&self, sale: &SalePayload) -> Result<RemoteSale, RemoteError>;

    /// Cheap reachability check used to drive the connectivity monitor.
    async fn is_reachable(&self) -> bool {
        true
    }
}

/// Request body accepted by `POST /sales`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSaleRequest {
    pub client_id: ClientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<SupplierId>,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpesa_code: Option<String>,
    pub items: Vec<CreateSaleItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_installments: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSaleItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: u64,
}

impl From<&SalePayload> for CreateSaleRequest {
    fn from(sale: &SalePayload) -> Self {
        // The backend only keeps an M-Pesa code for M-Pesa payments and an
        // installment count for installment plans.
        let mpesa_code = match sale.payment_method {
            PaymentMethod::Mpesa => sale.mpesa_code.clone(),
            _ => None,
        };
        let num_installments = match sale.payment_method {
            PaymentMethod::Installment => sale.installments,
            _ => None,
        };

        Self {
            client_id: sale.client_id,
            supplier_id: sale.supplier_id,
            payment_method: sale.payment_method,
            mpesa_code,
            items: sale
                .items
                .iter()
                .map(|line| CreateSaleItem {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            notes: sale.notes.clone(),
            num_installments,
        }
    }
}
