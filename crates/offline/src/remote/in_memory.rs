use std::sync::Mutex;

use bontez_sales::SalePayload;

use super::{CreateSaleRequest, RemoteError, RemoteSale, RemoteSales};

/// Storage-only sales backend.
///
/// Stands in for the REST API when the app is served statically with no
/// server behind it: accepted sales are kept in memory and numbered
/// `max(id) + 1`, as the browser-storage backend does.
#[derive(Debug, Default)]
pub struct InMemorySalesBackend {
    sales: Mutex<Vec<(i64, CreateSaleRequest)>>,
}

impl InMemorySalesBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sale accepted so far, in arrival order.
    pub fn accepted(&self) -> Vec<(i64, CreateSaleRequest)> {
        self.sales
            .lock()
            .map(|sales| sales.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sales.lock().map(|sales| sales.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl RemoteSales for InMemorySalesBackend {
    async fn create_sale(&self, sale: &SalePayload) -> Result<RemoteSale, RemoteError> {
        let mut sales = self
            .sales
            .lock()
            .map_err(|_| RemoteError::Api(500, "backend lock poisoned".to_string()))?;

        let id = sales.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
        sales.push((id, CreateSaleRequest::from(sale)));

        Ok(RemoteSale {
            id,
            total_amount: Some(sale.total() as f64),
        })
    }
}
