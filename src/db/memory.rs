use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::models::{NewWager, Purchase, Wager};

use super::{PurchaseUpdate, StoreError, WagerStore};

/// In-memory store with the same conditional-commit semantics as `PgStore`.
///
/// Backs the test suites and local runs without PostgreSQL. A single mutex
/// makes each operation atomic, so the pre-image check in `apply_purchase`
/// always observes committed state — exactly what the row-level predicate
/// gives us on the SQL side.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    /// Wagers keyed by id; BTreeMap keeps listing in insertion-id order.
    wagers: BTreeMap<i64, Wager>,
    /// Purchase ledger in commit order.
    purchases: Vec<Purchase>,
    next_wager_id: i64,
    next_purchase_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded purchases for one wager, in commit order.
    pub async fn purchases_for_wager(&self, wager_id: i64) -> Vec<Purchase> {
        let inner = self.inner.lock().await;
        inner
            .purchases
            .iter()
            .filter(|p| p.wager_id == wager_id)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl WagerStore for MemoryStore {
    async fn create_wager(&self, wager: NewWager) -> Result<Wager, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_wager_id += 1;
        let id = inner.next_wager_id;

        let wager = Wager {
            id,
            total_wager_value: wager.total_wager_value,
            odds: wager.odds,
            selling_percentage: wager.selling_percentage,
            selling_price: wager.selling_price,
            current_selling_price: wager.current_selling_price,
            percentage_sold: None,
            amount_sold: None,
            placed_at: wager.placed_at,
        };
        inner.wagers.insert(id, wager.clone());

        Ok(wager)
    }

    async fn fetch_wager(&self, id: i64) -> Result<Option<Wager>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.wagers.get(&id).cloned())
    }

    async fn list_wagers(&self, offset: i64, limit: i64) -> Result<Vec<Wager>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .wagers
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn apply_purchase(&self, update: PurchaseUpdate) -> Result<Purchase, StoreError> {
        let mut inner = self.inner.lock().await;

        let wager = match inner.wagers.get_mut(&update.wager_id) {
            Some(wager) => wager,
            None => return Err(StoreError::NotFound(update.wager_id)),
        };

        if wager.current_selling_price != update.expected_current {
            return Err(StoreError::Conflict {
                expected: update.expected_current,
                actual: wager.current_selling_price,
            });
        }

        wager.current_selling_price = update.new_current;
        wager.amount_sold = Some(update.new_amount_sold);
        wager.percentage_sold = Some(update.new_percentage_sold);

        inner.next_purchase_id += 1;
        let purchase = Purchase {
            id: inner.next_purchase_id,
            wager_id: update.wager_id,
            buying_price: update.buying_price,
            bought_at: Utc::now(),
        };
        inner.purchases.push(purchase.clone());

        Ok(purchase)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
