use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for the wagers table.
///
/// `current_selling_price` is the only field mutated after creation (always
/// downward, only through a committed buy); `amount_sold` and
/// `percentage_sold` stay NULL until the first purchase.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wager {
    pub id: i64,
    pub total_wager_value: i64,
    pub odds: i64,
    pub selling_percentage: i32,
    pub selling_price: Decimal,
    pub current_selling_price: Decimal,
    pub percentage_sold: Option<i32>,
    pub amount_sold: Option<Decimal>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub placed_at: DateTime<Utc>,
}

impl Wager {
    /// A wager is exhausted once every cent of the offered slice is sold.
    /// Exhausted wagers reject all further buys.
    pub fn is_exhausted(&self) -> bool {
        self.current_selling_price.is_zero()
    }
}

/// Payload for inserting a new wager row. The id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewWager {
    pub total_wager_value: i64,
    pub odds: i64,
    pub selling_percentage: i32,
    pub selling_price: Decimal,
    pub current_selling_price: Decimal,
    pub placed_at: DateTime<Utc>,
}

/// Body of POST /wagers.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWagerRequest {
    pub total_wager_value: i64,
    pub odds: i64,
    pub selling_percentage: i32,
    pub selling_price: Decimal,
}
