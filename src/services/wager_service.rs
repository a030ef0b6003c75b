use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::db::{PurchaseUpdate, StoreError, WagerStore};
use crate::models::{CreateWagerRequest, NewWager, Purchase, Wager};

/// Tunables for the purchase path.
#[derive(Debug, Clone)]
pub struct WagerServiceConfig {
    /// How many times a buy may retry after losing the conditional update
    /// (default 3).
    pub max_buy_attempts: u32,
    /// Optional overall deadline for a single buy call.
    pub buy_timeout: Option<Duration>,
}

impl Default for WagerServiceConfig {
    fn default() -> Self {
        Self {
            max_buy_attempts: 3,
            buy_timeout: None,
        }
    }
}

/// Failure modes of the marketplace operations.
#[derive(Debug, Error)]
pub enum WagerError {
    #[error("invalid purchase request: {0}")]
    Validation(String),

    #[error("wager {0} not found")]
    NotFound(i64),

    #[error("buying price {requested} exceeds remaining value {available}")]
    InsufficientInventory {
        requested: Decimal,
        available: Decimal,
    },

    #[error("purchase of wager {wager_id} abandoned after {attempts} conflicting attempts")]
    Contention { wager_id: i64, attempts: u32 },

    #[error("purchase timed out")]
    Timeout,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for WagerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => WagerError::NotFound(id),
            other => WagerError::Store(other),
        }
    }
}

/// Marketplace operations over a [`WagerStore`].
///
/// `buy_wager` is the contended path: it reads the wager, prices the
/// purchase against `current_selling_price`, and commits through the
/// store's conditional update. Losing that update means another purchase
/// landed in between, so the buy re-reads fresh state and tries again,
/// up to `max_buy_attempts` times.
#[derive(Clone)]
pub struct WagerService {
    store: Arc<dyn WagerStore>,
    config: WagerServiceConfig,
}

impl WagerService {
    pub fn new(store: Arc<dyn WagerStore>, config: WagerServiceConfig) -> Self {
        Self { store, config }
    }

    /// List a wager for sale. The full asking price is initially available.
    pub async fn create_wager(&self, req: CreateWagerRequest) -> Result<Wager, WagerError> {
        let wager = self
            .store
            .create_wager(NewWager {
                total_wager_value: req.total_wager_value,
                odds: req.odds,
                selling_percentage: req.selling_percentage,
                selling_price: req.selling_price,
                current_selling_price: req.selling_price,
                placed_at: Utc::now(),
            })
            .await?;

        counter!("wagers_created_total").increment(1);
        tracing::info!(
            wager_id = wager.id,
            total_wager_value = wager.total_wager_value,
            selling_price = %wager.selling_price,
            "Wager listed for sale"
        );

        Ok(wager)
    }

    /// One page of wagers in listing order. `page` is 1-based; a page past
    /// the end of the data is empty.
    pub async fn list_wagers(&self, page: i64, limit: i64) -> Result<Vec<Wager>, WagerError> {
        let page = page.max(1);
        let limit = limit.max(1);
        // Saturate so absurd page/limit pairs stay a valid past-the-end
        // offset instead of overflowing.
        let offset = page.saturating_sub(1).saturating_mul(limit);
        Ok(self.store.list_wagers(offset, limit).await?)
    }

    /// Check that the backing store answers.
    pub async fn ping(&self) -> Result<(), WagerError> {
        Ok(self.store.ping().await?)
    }

    /// Buy a fraction of a wager at `buying_price`.
    pub async fn buy_wager(
        &self,
        wager_id: i64,
        buying_price: Decimal,
    ) -> Result<Purchase, WagerError> {
        match self.config.buy_timeout {
            Some(deadline) => {
                tokio::time::timeout(deadline, self.buy_with_retries(wager_id, buying_price))
                    .await
                    .map_err(|_| WagerError::Timeout)?
            }
            None => self.buy_with_retries(wager_id, buying_price).await,
        }
    }

    async fn buy_with_retries(
        &self,
        wager_id: i64,
        buying_price: Decimal,
    ) -> Result<Purchase, WagerError> {
        // The HTTP layer validates first, but the engine still defends
        // against direct callers.
        if wager_id <= 0 {
            return Err(WagerError::Validation(format!(
                "wager id {wager_id} is not a valid identity"
            )));
        }
        if buying_price <= Decimal::ZERO {
            return Err(WagerError::Validation(format!(
                "buying price {buying_price} must be positive"
            )));
        }

        for attempt in 1..=self.config.max_buy_attempts {
            // 1. Read the freshest state.
            let wager = self
                .store
                .fetch_wager(wager_id)
                .await?
                .ok_or(WagerError::NotFound(wager_id))?;

            // 2. Admission: the purchase must fit in what is left.
            let available = wager.current_selling_price;
            if buying_price > available {
                counter!("wager_buy_rejections_total").increment(1);
                return Err(WagerError::InsufficientInventory {
                    requested: buying_price,
                    available,
                });
            }

            // 3. Price the post-purchase state off the read snapshot.
            let new_current = available - buying_price;
            let new_amount_sold = wager.amount_sold.unwrap_or(Decimal::ZERO) + buying_price;
            let new_percentage_sold = percentage_sold(new_amount_sold, wager.selling_price);

            // 4. Commit, conditional on the snapshot still being current.
            let update = PurchaseUpdate {
                wager_id,
                expected_current: available,
                new_current,
                new_amount_sold,
                new_percentage_sold,
                buying_price,
            };

            match self.store.apply_purchase(update).await {
                Ok(purchase) => {
                    counter!("wager_purchases_total").increment(1);
                    tracing::info!(
                        wager_id,
                        purchase_id = purchase.id,
                        buying_price = %buying_price,
                        remaining = %new_current,
                        attempt,
                        "Purchase committed"
                    );
                    return Ok(purchase);
                }
                Err(StoreError::Conflict { expected, actual }) => {
                    counter!("wager_buy_conflicts_total").increment(1);
                    tracing::warn!(
                        wager_id,
                        attempt,
                        expected = %expected,
                        actual = %actual,
                        "Purchase lost the conditional update, retrying"
                    );
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(WagerError::Contention {
            wager_id,
            attempts: self.config.max_buy_attempts,
        })
    }
}

/// Share of the asking price sold so far, floored to a whole percent.
fn percentage_sold(amount_sold: Decimal, selling_price: Decimal) -> i32 {
    if selling_price.is_zero() {
        return 0;
    }
    (amount_sold / selling_price * Decimal::ONE_HUNDRED)
        .floor()
        .to_i32()
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::db::MemoryStore;
    use crate::models::NewWager;

    use super::*;

    fn service(store: MemoryStore) -> WagerService {
        WagerService::new(Arc::new(store), WagerServiceConfig::default())
    }

    fn listing(total: i64, price: i64) -> CreateWagerRequest {
        CreateWagerRequest {
            total_wager_value: total,
            odds: 2,
            selling_percentage: 50,
            selling_price: Decimal::from(price),
        }
    }

    #[tokio::test]
    async fn test_create_wager_opens_at_full_price() {
        let store = MemoryStore::new();
        let svc = service(store.clone());
        let wager = svc.create_wager(listing(1000, 100)).await.unwrap();

        assert_eq!(wager.id, 1);
        assert_eq!(wager.selling_price, Decimal::from(100));
        assert_eq!(wager.current_selling_price, Decimal::from(100));
        assert_eq!(wager.percentage_sold, None);
        assert_eq!(wager.amount_sold, None);

        // Fetching it back returns the same record.
        let fetched = store.fetch_wager(wager.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, wager.id);
        assert_eq!(fetched.total_wager_value, wager.total_wager_value);
        assert_eq!(fetched.odds, wager.odds);
        assert_eq!(fetched.selling_percentage, wager.selling_percentage);
        assert_eq!(fetched.current_selling_price, wager.current_selling_price);
        assert_eq!(fetched.placed_at, wager.placed_at);
    }

    #[tokio::test]
    async fn test_buy_defends_against_invalid_direct_calls() {
        let svc = service(MemoryStore::new());

        let err = svc.buy_wager(0, Decimal::from(10)).await.unwrap_err();
        assert!(matches!(err, WagerError::Validation(_)));

        let err = svc.buy_wager(1, Decimal::ZERO).await.unwrap_err();
        assert!(matches!(err, WagerError::Validation(_)));

        let err = svc.buy_wager(1, Decimal::from(-5)).await.unwrap_err();
        assert!(matches!(err, WagerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_buy_debits_remaining_and_records_progress() {
        let store = MemoryStore::new();
        let svc = service(store.clone());
        let wager = svc.create_wager(listing(1000, 100)).await.unwrap();

        let purchase = svc.buy_wager(wager.id, Decimal::from(30)).await.unwrap();
        assert_eq!(purchase.wager_id, wager.id);
        assert_eq!(purchase.buying_price, Decimal::from(30));

        let after = store.fetch_wager(wager.id).await.unwrap().unwrap();
        assert_eq!(after.current_selling_price, Decimal::from(70));
        assert_eq!(after.amount_sold, Some(Decimal::from(30)));
        assert_eq!(after.percentage_sold, Some(30));
    }

    #[tokio::test]
    async fn test_buy_rejects_more_than_remaining() {
        let svc = service(MemoryStore::new());
        let wager = svc.create_wager(listing(1000, 100)).await.unwrap();

        svc.buy_wager(wager.id, Decimal::from(40)).await.unwrap();
        let err = svc.buy_wager(wager.id, Decimal::from(70)).await.unwrap_err();

        match err {
            WagerError::InsufficientInventory {
                requested,
                available,
            } => {
                assert_eq!(requested, Decimal::from(70));
                assert_eq!(available, Decimal::from(60));
            }
            other => panic!("expected insufficient inventory, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_buy_exact_remaining_exhausts_the_wager() {
        let store = MemoryStore::new();
        let svc = service(store.clone());
        let wager = svc.create_wager(listing(1000, 100)).await.unwrap();

        svc.buy_wager(wager.id, Decimal::from(100)).await.unwrap();

        let after = store.fetch_wager(wager.id).await.unwrap().unwrap();
        assert!(after.is_exhausted());
        assert_eq!(after.current_selling_price, Decimal::ZERO);
        assert_eq!(after.percentage_sold, Some(100));

        let err = svc.buy_wager(wager.id, Decimal::ONE).await.unwrap_err();
        assert!(matches!(
            err,
            WagerError::InsufficientInventory { available, .. } if available == Decimal::ZERO
        ));
    }

    #[tokio::test]
    async fn test_buy_unknown_wager() {
        let svc = service(MemoryStore::new());
        let err = svc.buy_wager(99, Decimal::from(10)).await.unwrap_err();
        assert!(matches!(err, WagerError::NotFound(99)));
    }

    #[tokio::test]
    async fn test_list_wagers_clamps_and_saturates() {
        let svc = service(MemoryStore::new());
        for _ in 0..3 {
            svc.create_wager(listing(1000, 100)).await.unwrap();
        }

        // Non-positive page/limit fall back to the first page.
        let clamped = svc.list_wagers(0, 2).await.unwrap();
        assert_eq!(clamped.len(), 2);
        assert_eq!(clamped[0].id, 1);

        // A page far beyond the data is an empty page.
        let far = svc.list_wagers(i64::MAX, i64::MAX).await.unwrap();
        assert!(far.is_empty());
    }

    #[tokio::test]
    async fn test_percentage_sold_uses_asking_price_not_total_value() {
        let store = MemoryStore::new();
        let svc = service(store.clone());
        // Asking price 40 on a wager worth 1000. Buying 10 is a quarter of
        // the asking price, not one percent of the face value.
        let wager = svc.create_wager(listing(1000, 40)).await.unwrap();

        svc.buy_wager(wager.id, Decimal::from(10)).await.unwrap();

        let after = store.fetch_wager(wager.id).await.unwrap().unwrap();
        assert_eq!(after.percentage_sold, Some(25));
    }

    #[test]
    fn test_percentage_sold_floors() {
        let one_third = percentage_sold(Decimal::ONE, Decimal::from(3));
        assert_eq!(one_third, 33);

        let two_thirds = percentage_sold(Decimal::from(2), Decimal::from(3));
        assert_eq!(two_thirds, 66);

        assert_eq!(percentage_sold(Decimal::from(5), Decimal::ZERO), 0);
    }

    /// Fails the first `conflicts` conditional commits, then delegates.
    struct ContendedStore {
        inner: MemoryStore,
        conflicts_left: AtomicU32,
    }

    #[async_trait::async_trait]
    impl WagerStore for ContendedStore {
        async fn create_wager(&self, wager: NewWager) -> Result<Wager, StoreError> {
            self.inner.create_wager(wager).await
        }

        async fn fetch_wager(&self, id: i64) -> Result<Option<Wager>, StoreError> {
            self.inner.fetch_wager(id).await
        }

        async fn list_wagers(&self, offset: i64, limit: i64) -> Result<Vec<Wager>, StoreError> {
            self.inner.list_wagers(offset, limit).await
        }

        async fn apply_purchase(&self, update: PurchaseUpdate) -> Result<Purchase, StoreError> {
            if self.conflicts_left.load(Ordering::SeqCst) > 0 {
                self.conflicts_left.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::Conflict {
                    expected: update.expected_current,
                    actual: update.expected_current - Decimal::ONE,
                });
            }
            self.inner.apply_purchase(update).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }
    }

    #[tokio::test]
    async fn test_buy_retries_after_conflict_and_commits_once() {
        let inner = MemoryStore::new();
        let store = ContendedStore {
            inner: inner.clone(),
            conflicts_left: AtomicU32::new(2),
        };
        let svc = WagerService::new(Arc::new(store), WagerServiceConfig::default());
        let wager = svc.create_wager(listing(1000, 100)).await.unwrap();

        // Two synthetic conflicts, success on the third attempt.
        svc.buy_wager(wager.id, Decimal::from(10)).await.unwrap();

        let ledger = inner.purchases_for_wager(wager.id).await;
        assert_eq!(ledger.len(), 1);
        let after = inner.fetch_wager(wager.id).await.unwrap().unwrap();
        assert_eq!(after.current_selling_price, Decimal::from(90));
    }

    #[tokio::test]
    async fn test_buy_gives_up_after_max_attempts() {
        let inner = MemoryStore::new();
        let store = ContendedStore {
            inner: inner.clone(),
            conflicts_left: AtomicU32::new(3),
        };
        let svc = WagerService::new(Arc::new(store), WagerServiceConfig::default());
        let wager = svc.create_wager(listing(1000, 100)).await.unwrap();

        let err = svc.buy_wager(wager.id, Decimal::from(10)).await.unwrap_err();
        assert!(matches!(err, WagerError::Contention { attempts: 3, .. }));

        // Nothing committed.
        assert!(inner.purchases_for_wager(wager.id).await.is_empty());
        let after = inner.fetch_wager(wager.id).await.unwrap().unwrap();
        assert_eq!(after.current_selling_price, Decimal::from(100));
    }

    /// Delegates reads through an artificial delay.
    struct StalledStore {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl WagerStore for StalledStore {
        async fn create_wager(&self, wager: NewWager) -> Result<Wager, StoreError> {
            self.inner.create_wager(wager).await
        }

        async fn fetch_wager(&self, id: i64) -> Result<Option<Wager>, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            self.inner.fetch_wager(id).await
        }

        async fn list_wagers(&self, offset: i64, limit: i64) -> Result<Vec<Wager>, StoreError> {
            self.inner.list_wagers(offset, limit).await
        }

        async fn apply_purchase(&self, update: PurchaseUpdate) -> Result<Purchase, StoreError> {
            self.inner.apply_purchase(update).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }
    }

    #[tokio::test]
    async fn test_buy_times_out_when_store_stalls() {
        let inner = MemoryStore::new();
        let seeded = service(inner.clone());
        let wager = seeded.create_wager(listing(1000, 100)).await.unwrap();

        let svc = WagerService::new(
            Arc::new(StalledStore { inner }),
            WagerServiceConfig {
                max_buy_attempts: 3,
                buy_timeout: Some(Duration::from_millis(20)),
            },
        );

        let err = svc.buy_wager(wager.id, Decimal::from(10)).await.unwrap_err();
        assert!(matches!(err, WagerError::Timeout));
    }
}
