use chrono::Utc;
use giftbay_core::ranking;
use giftbay_reserve::{ReservationError, ReservationManager};
use giftbay_shared::{Voucher, VoucherStatus};
use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Picks one best voucher per price bucket and lazily expands a bucket with
/// the next-best sibling once its predecessor is selected.
#[derive(Clone)]
pub struct BucketRecommender {
    reservations: Arc<ReservationManager>,
    bucket_size: i64,
}

impl BucketRecommender {
    pub fn new(reservations: Arc<ReservationManager>, bucket_size: i64) -> Self {
        Self {
            reservations,
            bucket_size,
        }
    }

    pub fn bucket_size(&self) -> i64 {
        self.bucket_size
    }

    /// One best candidate per distinct price bucket, ordered by bucket
    /// ascending. Pure over the supplied candidate set; expired vouchers are
    /// excluded up front.
    pub fn recommend(&self, for_sale: &[Voucher]) -> Vec<Voucher> {
        let today = Utc::now().date_naive();
        let mut buckets: HashMap<i64, Voucher> = HashMap::new();

        for voucher in for_sale {
            if voucher.is_expired(today) {
                continue;
            }
            match buckets.entry(voucher.price_bucket(self.bucket_size)) {
                Entry::Vacant(slot) => {
                    slot.insert(voucher.clone());
                }
                Entry::Occupied(mut slot) => {
                    if ranking::compare(voucher, slot.get()) == Ordering::Less {
                        slot.insert(voucher.clone());
                    }
                }
            }
        }

        let mut picks: Vec<(i64, Voucher)> = buckets.into_iter().collect();
        picks.sort_by_key(|(bucket, _)| *bucket);
        picks.into_iter().map(|(_, voucher)| voucher).collect()
    }

    /// Initial picker for a brand: one best voucher per bucket of the
    /// current for-sale pool
    pub async fn recommend_for_brand(
        &self,
        brand: &str,
    ) -> Result<Vec<Voucher>, ReservationError> {
        let pool = self.reservations.store().list_for_sale(brand).await?;
        Ok(self.recommend(&pool))
    }

    /// Reserve and surface the next-best sibling in `bucket` that has not
    /// been shown yet. A contested or expired candidate advances to the next
    /// one; running out of candidates is "nothing more to show", not an
    /// error.
    pub async fn expand_bucket(
        &self,
        brand: &str,
        bucket: i64,
        already_loaded: &[Uuid],
        buyer_id: &str,
    ) -> Result<Option<Voucher>, ReservationError> {
        let today = Utc::now().date_naive();
        let mut candidates: Vec<Voucher> = self
            .reservations
            .store()
            .list_for_sale(brand)
            .await?
            .into_iter()
            .filter(|v| v.price_bucket(self.bucket_size) == bucket)
            .filter(|v| !already_loaded.contains(&v.id))
            .filter(|v| !v.is_expired(today))
            .collect();
        ranking::rank(&mut candidates);

        for candidate in candidates {
            match self.reservations.reserve(candidate.id, buyer_id).await {
                Ok(token) => {
                    let mut reserved = candidate;
                    reserved.status = VoucherStatus::Reserved;
                    reserved.reserved_by = Some(token.buyer_id);
                    reserved.reserved_at = Some(token.reserved_at);
                    return Ok(Some(reserved));
                }
                Err(ReservationError::Conflict(_)) | Err(ReservationError::ExpiredVoucher(_)) => {
                    continue;
                }
                Err(ReservationError::NotFound(id)) => {
                    warn!(voucher_id = %id, "expansion candidate vanished, skipping");
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use giftbay_core::VoucherStore;
    use giftbay_store::MemoryVoucherStore;

    const BUCKET_SIZE: i64 = 1000;

    fn listing(original: i64, sale: i64, days_out: i64) -> Voucher {
        let expiry = Utc::now().date_naive() + chrono::Duration::days(days_out);
        Voucher::new("cafe-latte", original, sale, expiry)
    }

    async fn recommender_with(
        vouchers: Vec<Voucher>,
    ) -> (BucketRecommender, Arc<MemoryVoucherStore>) {
        let store = Arc::new(MemoryVoucherStore::new());
        for voucher in vouchers {
            store.insert(voucher).await.unwrap();
        }
        let manager = Arc::new(ReservationManager::new(store.clone(), 300));
        (BucketRecommender::new(manager, BUCKET_SIZE), store)
    }

    #[tokio::test]
    async fn test_recommend_picks_best_per_bucket_ordered_by_bucket() {
        // A and B share the 3000 bucket; B wins on efficiency. C stands alone.
        let a = listing(3000, 2700, 5);
        let b = listing(3000, 2500, 5);
        let c = listing(5000, 4000, 1);
        let b_id = b.id;
        let c_id = c.id;

        let (recommender, _) = recommender_with(vec![a, b, c]).await;
        let picks = recommender.recommend_for_brand("cafe-latte").await.unwrap();

        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].id, b_id);
        assert_eq!(picks[1].id, c_id);
    }

    #[tokio::test]
    async fn test_recommend_excludes_expired_vouchers() {
        let expired = listing(3000, 2000, -1);
        let live = listing(3000, 2900, 5);
        let live_id = live.id;

        let (recommender, _) = recommender_with(vec![expired, live]).await;
        let picks = recommender.recommend_for_brand("cafe-latte").await.unwrap();

        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].id, live_id);
    }

    #[tokio::test]
    async fn test_expand_reserves_next_best_sibling() {
        let root = listing(3000, 2500, 5);
        let sibling = listing(3000, 2700, 5);
        let root_id = root.id;
        let sibling_id = sibling.id;

        let (recommender, store) = recommender_with(vec![root, sibling]).await;
        let surfaced = recommender
            .expand_bucket("cafe-latte", 3000, &[root_id], "buyer-1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(surfaced.id, sibling_id);
        assert_eq!(surfaced.status, VoucherStatus::Reserved);
        assert_eq!(
            store.get(sibling_id).await.unwrap().unwrap().status,
            VoucherStatus::Reserved
        );
    }

    #[tokio::test]
    async fn test_expand_skips_contested_candidates() {
        let root = listing(3000, 2500, 5);
        let contested = listing(3000, 2600, 5);
        let fallback = listing(3000, 2800, 5);
        let root_id = root.id;
        let contested_id = contested.id;
        let fallback_id = fallback.id;

        let (recommender, store) = recommender_with(vec![root, contested, fallback]).await;

        // another buyer grabs the best sibling first
        let now = Utc::now();
        store
            .try_reserve(contested_id, "buyer-2", now.date_naive(), now)
            .await
            .unwrap();

        let surfaced = recommender
            .expand_bucket("cafe-latte", 3000, &[root_id], "buyer-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(surfaced.id, fallback_id);
    }

    #[tokio::test]
    async fn test_expand_returns_none_when_bucket_is_exhausted() {
        let root = listing(3000, 2500, 5);
        let root_id = root.id;

        let (recommender, _) = recommender_with(vec![root]).await;
        let surfaced = recommender
            .expand_bucket("cafe-latte", 3000, &[root_id], "buyer-1")
            .await
            .unwrap();
        assert!(surfaced.is_none());
    }
}
