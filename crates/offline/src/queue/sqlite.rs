use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};

use bontez_core::LocalSaleId;
use bontez_sales::{PendingSale, SalePayload};

use super::{QueueError, SaleQueue};

/// File name of the queue database inside the data directory.
///
/// Kept apart from any cached reference data (clients, suppliers, products) so
/// that resetting one never touches the other.
pub const QUEUE_DB_FILE: &str = "pending_sales.db";

/// SQLite-backed sale queue.
///
/// Owns its connection pool: open it once at start-up, share it behind an
/// `Arc`, and `close` it on shutdown.
#[derive(Debug, Clone)]
pub struct SqliteSaleQueue {
    pool: SqlitePool,
}

impl SqliteSaleQueue {
    /// Open (or create) the queue database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                QueueError::Write(format!("failed to create queue directory at {parent:?}: {e}"))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| write_error(&format!("failed to open sale queue at {path:?}"), e))?;

        tracing::debug!(path = %path.display(), "opened sale queue");
        Self::init(pool).await
    }

    /// Open `{dir}/pending_sales.db`.
    pub async fn open_in_dir(dir: impl AsRef<Path>) -> Result<Self, QueueError> {
        Self::open(dir.as_ref().join(QUEUE_DB_FILE)).await
    }

    /// Open a private in-memory database (tests/dev).
    pub async fn open_in_memory() -> Result<Self, QueueError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| write_error("invalid in-memory connection string", e))?;

        // One long-lived connection: each new in-memory connection is a new database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| write_error("failed to open in-memory sale queue", e))?;

        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self, QueueError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_sales (
                seq        INTEGER PRIMARY KEY AUTOINCREMENT,
                id         TEXT NOT NULL UNIQUE,
                payload    TEXT NOT NULL,
                created_at TEXT NOT NULL,
                synced     INTEGER NOT NULL DEFAULT 0,
                synced_at  TEXT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| write_error("failed to create pending_sales table", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS pending_sales_synced_idx ON pending_sales (synced, seq)",
        )
        .execute(&pool)
        .await
        .map_err(|e| write_error("failed to create pending_sales index", e))?;

        Ok(Self { pool })
    }

    /// Close the pool. Later operations fail with `QueueError::Closed`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    async fn fetch(&self, unsynced_only: bool) -> Result<Vec<PendingSale>, QueueError> {
        let sql = if unsynced_only {
            r#"
            SELECT id, payload, created_at, synced
            FROM pending_sales
            WHERE synced = 0
            ORDER BY seq ASC
            "#
        } else {
            r#"
            SELECT id, payload, created_at, synced
            FROM pending_sales
            ORDER BY seq ASC
            "#
        };

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| read_error("failed to list pending sales", e))?;

        rows.into_iter().map(row_to_pending).collect()
    }
}

#[async_trait::async_trait]
impl SaleQueue for SqliteSaleQueue {
    async fn enqueue(&self, sale: SalePayload) -> Result<LocalSaleId, QueueError> {
        let pending = PendingSale::capture(sale);
        let payload = serde_json::to_string(&pending.sale)
            .map_err(|e| QueueError::Write(format!("failed to encode sale payload: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO pending_sales (id, payload, created_at, synced, synced_at)
            VALUES (?1, ?2, ?3, 0, NULL)
            "#,
        )
        .bind(pending.id.to_string())
        .bind(payload)
        .bind(pending.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("failed to insert pending sale", e))?;

        tracing::debug!(sale_id = %pending.id, "pending sale stored");
        Ok(pending.id)
    }

    async fn list_all(&self) -> Result<Vec<PendingSale>, QueueError> {
        self.fetch(false).await
    }

    async fn list_unsynced(&self) -> Result<Vec<PendingSale>, QueueError> {
        self.fetch(true).await
    }

    async fn mark_synced(&self, id: &LocalSaleId) -> Result<(), QueueError> {
        let result = sqlx::query(
            r#"
            UPDATE pending_sales
            SET synced = 1,
                synced_at = ?2
            WHERE id = ?1
              AND synced = 0
            "#,
        )
        .bind(id.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("failed to mark pending sale as synced", e))?;

        if result.rows_affected() == 0 {
            tracing::debug!(sale_id = %id, "mark_synced matched nothing; already synced or gone");
        }
        Ok(())
    }

    async fn prune_synced(&self) -> Result<u64, QueueError> {
        let result = sqlx::query("DELETE FROM pending_sales WHERE synced = 1")
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("failed to prune synced sales", e))?;

        Ok(result.rows_affected())
    }

    async fn clear_all(&self) -> Result<u64, QueueError> {
        let result = sqlx::query("DELETE FROM pending_sales")
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("failed to clear pending sales", e))?;

        tracing::warn!(removed = result.rows_affected(), "sale queue cleared");
        Ok(result.rows_affected())
    }

    async fn count_unsynced(&self) -> Result<usize, QueueError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_sales WHERE synced = 0")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| read_error("failed to count unsynced sales", e))?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn write_error(context: &str, err: sqlx::Error) -> QueueError {
    match err {
        sqlx::Error::PoolClosed => QueueError::Closed,
        other => QueueError::Write(format!("{context}: {other}")),
    }
}

fn read_error(context: &str, err: sqlx::Error) -> QueueError {
    match err {
        sqlx::Error::PoolClosed => QueueError::Closed,
        other => QueueError::Read(format!("{context}: {other}")),
    }
}

/// Map a database row into a `PendingSale`.
fn row_to_pending(row: SqliteRow) -> Result<PendingSale, QueueError> {
    let corrupt = |what: &str, e: &dyn std::fmt::Display| {
        QueueError::Corrupt(format!("{what} in pending_sales: {e}"))
    };

    let id_str: String = row.try_get("id").map_err(|e| corrupt("missing id", &e))?;
    let id = id_str
        .parse::<LocalSaleId>()
        .map_err(|e| corrupt("invalid id", &e))?;

    let payload_str: String = row
        .try_get("payload")
        .map_err(|e| corrupt("missing payload", &e))?;
    let sale: SalePayload =
        serde_json::from_str(&payload_str).map_err(|e| corrupt("invalid JSON payload", &e))?;

    let created_at_str: String = row
        .try_get("created_at")
        .map_err(|e| corrupt("missing created_at", &e))?;
    let timestamp = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt("invalid created_at", &e))?;

    let synced: i64 = row
        .try_get("synced")
        .map_err(|e| corrupt("missing synced flag", &e))?;

    Ok(PendingSale {
        id,
        sale,
        timestamp,
        synced: synced != 0,
    })
}
