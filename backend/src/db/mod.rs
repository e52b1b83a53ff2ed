//! Relational store gateway
//!
//! A [`Store`] hands out one [`StoreTx`] per orchestrated operation. The
//! handle carries every repository, so the whole operation runs on a single
//! pooled connection and is committed or rolled back as a unit.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::repositories::{
    AuditRepository, DepositStockRepository, InventoryRepository, KardexRepository,
    LotRepository, ProductRepository, PurchaseRepository,
};

pub mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgStore, PgTx};

/// An open transaction exposing every repository
#[async_trait]
pub trait StoreTx:
    ProductRepository
    + InventoryRepository
    + LotRepository
    + DepositStockRepository
    + PurchaseRepository
    + KardexRepository
    + AuditRepository
    + Send
{
    async fn commit(&mut self) -> AppResult<()>;

    async fn rollback(&mut self) -> AppResult<()>;
}

/// Source of transactions
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    /// Cheap connectivity probe
    async fn ping(&self) -> AppResult<()>;
}

/// Commit on success; on failure roll back before surfacing the error
pub async fn finish<T>(mut tx: Box<dyn StoreTx>, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!("Rollback after {} failed: {}", err.code(), rollback_err);
            }
            Err(err)
        }
    }
}

/// Bound a unit of work; on expiry the work future is dropped
pub async fn with_deadline<T, F>(limit: Duration, work: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(limit)),
    }
}

/// Postgres `unique_violation`
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}
