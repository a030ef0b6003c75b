use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for the purchases table. Append-only: one row per committed
/// buy, never updated or deleted. `id` and `bought_at` are store-assigned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: i64,
    pub wager_id: i64,
    pub buying_price: Decimal,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub bought_at: DateTime<Utc>,
}

/// Body of POST /buy/{wager_id}.
#[derive(Debug, Clone, Deserialize)]
pub struct BuyWagerRequest {
    pub buying_price: Decimal,
}
