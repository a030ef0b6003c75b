pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::{NewWager, Purchase, Wager};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("wager {0} not found")]
    NotFound(i64),

    #[error("remaining value changed under the buyer: expected {expected}, found {actual}")]
    Conflict { expected: Decimal, actual: Decimal },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// State transition committed by one successful buy.
///
/// `expected_current` is the pre-image of `current_selling_price` read by
/// the purchase engine; the store must apply the update only while the row
/// still carries exactly that value, and must commit the wager update and
/// the purchase insert as one atomic unit.
#[derive(Debug, Clone)]
pub struct PurchaseUpdate {
    pub wager_id: i64,
    pub expected_current: Decimal,
    pub new_current: Decimal,
    pub new_amount_sold: Decimal,
    pub new_percentage_sold: i32,
    pub buying_price: Decimal,
}

/// Persistence operations for wagers and their purchase ledger.
///
/// Implementations must be thread-safe; `apply_purchase` is the only
/// multi-row mutation and carries the conditional-commit contract that the
/// purchase engine's optimistic concurrency relies on.
#[async_trait]
pub trait WagerStore: Send + Sync {
    /// Insert a new wager row and return it with its assigned id.
    async fn create_wager(&self, wager: NewWager) -> Result<Wager, StoreError>;

    /// Read one wager by id.
    async fn fetch_wager(&self, id: i64) -> Result<Option<Wager>, StoreError>;

    /// Read a page of wagers in insertion order.
    async fn list_wagers(&self, offset: i64, limit: i64) -> Result<Vec<Wager>, StoreError>;

    /// Atomically commit the wager state transition plus its purchase row.
    ///
    /// Fails with [`StoreError::Conflict`] when `current_selling_price` no
    /// longer equals `expected_current` (a concurrent buy won the race), in
    /// which case nothing is written.
    async fn apply_purchase(&self, update: PurchaseUpdate) -> Result<Purchase, StoreError>;

    /// Connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
