//! Sales domain module.
//!
//! Sale payloads as the sale-entry form produces them, their validation rules,
//! and the `PendingSale` record that the offline queue persists. Pure domain
//! logic: no IO, no HTTP, no storage.

pub mod pending;
pub mod sale;

pub use pending::PendingSale;
pub use sale::{ClientId, GeoTag, PaymentMethod, ProductId, SaleLine, SalePayload, SupplierId};
