use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use giftbay_core::{StoreError, Transition, VoucherStore};
use giftbay_shared::{Voucher, VoucherStatus};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory voucher store. Each `try_*` transition runs its check and its
/// update inside one write-lock critical section, so it is a genuine
/// compare-and-swap at map level, with the same exactly-one-winner semantics
/// as the Postgres store's conditional UPDATE.
#[derive(Default)]
pub struct MemoryVoucherStore {
    vouchers: RwLock<HashMap<Uuid, Voucher>>,
}

impl MemoryVoucherStore {
    pub fn new() -> Self {
        Self {
            vouchers: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VoucherStore for MemoryVoucherStore {
    async fn insert(&self, voucher: Voucher) -> Result<(), StoreError> {
        self.vouchers.write().await.insert(voucher.id, voucher);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Voucher>, StoreError> {
        Ok(self.vouchers.read().await.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Voucher>, StoreError> {
        let map = self.vouchers.read().await;
        Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
    }

    async fn list_for_sale(&self, brand: &str) -> Result<Vec<Voucher>, StoreError> {
        let map = self.vouchers.read().await;
        Ok(map
            .values()
            .filter(|v| v.brand == brand && v.status == VoucherStatus::ForSale)
            .cloned()
            .collect())
    }

    async fn list_by_status(&self, status: VoucherStatus) -> Result<Vec<Voucher>, StoreError> {
        let map = self.vouchers.read().await;
        Ok(map.values().filter(|v| v.status == status).cloned().collect())
    }

    async fn list_stale_reservations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Voucher>, StoreError> {
        let map = self.vouchers.read().await;
        Ok(map
            .values()
            .filter(|v| {
                v.status == VoucherStatus::Reserved
                    && v.reserved_at.map_or(false, |at| at < cutoff)
            })
            .cloned()
            .collect())
    }

    async fn try_reserve(
        &self,
        id: Uuid,
        buyer_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Transition, StoreError> {
        let mut map = self.vouchers.write().await;
        let Some(voucher) = map.get_mut(&id) else {
            return Ok(Transition::Missing);
        };
        if voucher.status != VoucherStatus::ForSale {
            return Ok(Transition::StatusMismatch(voucher.status));
        }
        if voucher.is_expired(today) {
            return Ok(Transition::Expired);
        }
        voucher.status = VoucherStatus::Reserved;
        voucher.reserved_by = Some(buyer_id.to_string());
        voucher.reserved_at = Some(now);
        Ok(Transition::Applied(voucher.clone()))
    }

    async fn try_release(
        &self,
        id: Uuid,
        expected_buyer: Option<&str>,
    ) -> Result<Transition, StoreError> {
        let mut map = self.vouchers.write().await;
        let Some(voucher) = map.get_mut(&id) else {
            return Ok(Transition::Missing);
        };
        if voucher.status != VoucherStatus::Reserved {
            return Ok(Transition::StatusMismatch(voucher.status));
        }
        if let Some(expected) = expected_buyer {
            if voucher.reserved_by.as_deref() != Some(expected) {
                return Ok(Transition::OwnerMismatch);
            }
        }
        voucher.status = VoucherStatus::ForSale;
        voucher.reserved_by = None;
        voucher.reserved_at = None;
        Ok(Transition::Applied(voucher.clone()))
    }

    async fn try_finalize(
        &self,
        id: Uuid,
        expected_buyer: &str,
    ) -> Result<Transition, StoreError> {
        let mut map = self.vouchers.write().await;
        let Some(voucher) = map.get_mut(&id) else {
            return Ok(Transition::Missing);
        };
        if voucher.status != VoucherStatus::Reserved {
            return Ok(Transition::StatusMismatch(voucher.status));
        }
        if voucher.reserved_by.as_deref() != Some(expected_buyer) {
            return Ok(Transition::OwnerMismatch);
        }
        voucher.status = VoucherStatus::Sold;
        voucher.reserved_by = None;
        voucher.reserved_at = None;
        Ok(Transition::Applied(voucher.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn listing(brand: &str, original: i64, sale: i64) -> Voucher {
        let expiry = Utc::now().date_naive() + chrono::Duration::days(30);
        Voucher::new(brand, original, sale, expiry)
    }

    #[tokio::test]
    async fn test_reserve_release_round_trip() {
        let store = MemoryVoucherStore::new();
        let voucher = listing("cafe-latte", 3000, 2700);
        let id = voucher.id;
        store.insert(voucher).await.unwrap();

        let now = Utc::now();
        let reserved = store
            .try_reserve(id, "buyer-1", now.date_naive(), now)
            .await
            .unwrap();
        let Transition::Applied(reserved) = reserved else {
            panic!("expected reservation to land");
        };
        assert_eq!(reserved.status, VoucherStatus::Reserved);
        assert!(reserved.reservation_fields_consistent());

        let released = store.try_release(id, Some("buyer-1")).await.unwrap();
        let Transition::Applied(released) = released else {
            panic!("expected release to land");
        };
        assert_eq!(released.status, VoucherStatus::ForSale);
        assert!(released.reserved_by.is_none());
        assert!(released.reserved_at.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_reserves_have_exactly_one_winner() {
        let store = Arc::new(MemoryVoucherStore::new());
        let voucher = listing("cafe-latte", 3000, 2700);
        let id = voucher.id;
        store.insert(voucher).await.unwrap();

        let mut handles = Vec::new();
        for buyer in ["buyer-1", "buyer-2"] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let now = Utc::now();
                store.try_reserve(id, buyer, now.date_naive(), now).await
            }));
        }

        let mut wins = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                Transition::Applied(_) => wins += 1,
                Transition::StatusMismatch(VoucherStatus::Reserved) => conflicts += 1,
                other => panic!("unexpected outcome: {:?}", other),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 1);
    }

    #[tokio::test]
    async fn test_reserve_rejects_expired_voucher() {
        let store = MemoryVoucherStore::new();
        let today = Utc::now().date_naive();
        let voucher = Voucher::new("cafe-latte", 3000, 2700, today - chrono::Duration::days(1));
        let id = voucher.id;
        store.insert(voucher).await.unwrap();

        let outcome = store.try_reserve(id, "buyer-1", today, Utc::now()).await.unwrap();
        assert!(matches!(outcome, Transition::Expired));
    }

    #[tokio::test]
    async fn test_release_by_non_owner_is_rejected() {
        let store = MemoryVoucherStore::new();
        let voucher = listing("cafe-latte", 3000, 2700);
        let id = voucher.id;
        store.insert(voucher).await.unwrap();

        let now = Utc::now();
        store
            .try_reserve(id, "buyer-1", now.date_naive(), now)
            .await
            .unwrap();

        let outcome = store.try_release(id, Some("buyer-2")).await.unwrap();
        assert!(matches!(outcome, Transition::OwnerMismatch));

        // owner bypass still lands
        let outcome = store.try_release(id, None).await.unwrap();
        assert!(matches!(outcome, Transition::Applied(_)));
    }

    #[tokio::test]
    async fn test_release_of_for_sale_voucher_is_a_no_op() {
        let store = MemoryVoucherStore::new();
        let voucher = listing("cafe-latte", 3000, 2700);
        let id = voucher.id;
        store.insert(voucher.clone()).await.unwrap();

        let outcome = store.try_release(id, Some("buyer-1")).await.unwrap();
        assert!(matches!(
            outcome,
            Transition::StatusMismatch(VoucherStatus::ForSale)
        ));
        let unchanged = store.get(id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, VoucherStatus::ForSale);
        assert!(unchanged.reservation_fields_consistent());
    }

    #[tokio::test]
    async fn test_stale_reservation_listing_honours_cutoff() {
        let store = MemoryVoucherStore::new();
        let now = Utc::now();

        let mut stale = listing("cafe-latte", 3000, 2700);
        stale.status = VoucherStatus::Reserved;
        stale.reserved_by = Some("buyer-1".to_string());
        stale.reserved_at = Some(now - chrono::Duration::seconds(600));
        let stale_id = stale.id;
        store.insert(stale).await.unwrap();

        let mut fresh = listing("cafe-latte", 5000, 4000);
        fresh.status = VoucherStatus::Reserved;
        fresh.reserved_by = Some("buyer-2".to_string());
        fresh.reserved_at = Some(now);
        store.insert(fresh).await.unwrap();

        let found = store
            .list_stale_reservations(now - chrono::Duration::seconds(300))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, stale_id);
    }
}
