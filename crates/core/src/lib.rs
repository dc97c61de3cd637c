//! `bontez-core`: domain building blocks shared by the sales and offline crates.
//!
//! This crate contains **pure domain** primitives (no storage, no network).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::LocalSaleId;
