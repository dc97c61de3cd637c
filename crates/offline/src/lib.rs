//! `bontez-offline`
//!
//! **Responsibility:** Offline-first sale capture and synchronization.
//!
//! This crate provides:
//! - A durable local queue of captured sales (SQLite, or in-memory for tests)
//! - A connectivity monitor with subscribe/unsubscribe
//! - A single-pass sync engine that pushes queued sales to the backend
//! - The capture façade the UI calls, and a background worker
//!
//! The server stays the system of record. Local records exist only until the
//! backend has accepted them.

pub mod capture;
pub mod config;
pub mod connectivity;
pub mod queue;
pub mod remote;
pub mod sync_engine;
pub mod sync_worker;
pub mod types;

pub use capture::{CaptureError, SaleCapture};
pub use config::OfflineConfig;
pub use connectivity::{ConnectivityMonitor, ConnectivitySubscription};
pub use queue::{InMemorySaleQueue, QueueError, SaleQueue, SqliteSaleQueue};
pub use remote::{HttpSalesClient, InMemorySalesBackend, RemoteError, RemoteSale, RemoteSales};
pub use sync_engine::{SyncEngine, SyncError};
pub use sync_worker::{SyncWorker, WorkerHandle};
pub use types::{ConnectivityState, SyncFailure, SyncOutcome, SyncReport, SyncStatus};
