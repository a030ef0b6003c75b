use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::{NewWager, Purchase, Wager};

use super::{PurchaseUpdate, StoreError, WagerStore};

/// PostgreSQL-backed store. All money columns are NUMERIC, so the
/// conditional predicate on `current_selling_price` compares exact values.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl WagerStore for PgStore {
    async fn create_wager(&self, wager: NewWager) -> Result<Wager, StoreError> {
        let row = sqlx::query_as::<_, Wager>(
            r#"
            INSERT INTO wagers (total_wager_value, odds, selling_percentage, selling_price, current_selling_price, placed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(wager.total_wager_value)
        .bind(wager.odds)
        .bind(wager.selling_percentage)
        .bind(wager.selling_price)
        .bind(wager.current_selling_price)
        .bind(wager.placed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn fetch_wager(&self, id: i64) -> Result<Option<Wager>, StoreError> {
        let wager = sqlx::query_as::<_, Wager>(
            "SELECT * FROM wagers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wager)
    }

    async fn list_wagers(&self, offset: i64, limit: i64) -> Result<Vec<Wager>, StoreError> {
        let wagers = sqlx::query_as::<_, Wager>(
            "SELECT * FROM wagers ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(wagers)
    }

    async fn apply_purchase(&self, update: PurchaseUpdate) -> Result<Purchase, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-swap on the pre-image: the row only moves if no
        // concurrent buy committed since the engine read it.
        let updated = sqlx::query(
            r#"
            UPDATE wagers
            SET current_selling_price = $3,
                amount_sold = $4,
                percentage_sold = $5
            WHERE id = $1 AND current_selling_price = $2
            "#,
        )
        .bind(update.wager_id)
        .bind(update.expected_current)
        .bind(update.new_current)
        .bind(update.new_amount_sold)
        .bind(update.new_percentage_sold)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Re-read inside the same transaction so the caller learns what
            // it lost to. Dropping `tx` rolls everything back.
            let live: Option<(Decimal,)> = sqlx::query_as(
                "SELECT current_selling_price FROM wagers WHERE id = $1",
            )
            .bind(update.wager_id)
            .fetch_optional(&mut *tx)
            .await?;

            return match live {
                Some((actual,)) => Err(StoreError::Conflict {
                    expected: update.expected_current,
                    actual,
                }),
                None => Err(StoreError::NotFound(update.wager_id)),
            };
        }

        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (wager_id, buying_price)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(update.wager_id)
        .bind(update.buying_price)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(purchase)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
