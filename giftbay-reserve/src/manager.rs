use chrono::{DateTime, Duration, Utc};
use giftbay_core::{StoreError, Transition, VoucherStore};
use giftbay_shared::Voucher;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Proof of a successful reservation handed back to the caller.
/// `expires_at` is advisory; the sweeper's TTL scan is authoritative.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationToken {
    pub voucher_id: Uuid,
    pub buyer_id: String,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    /// No longer for sale at reservation time; routine under contention
    #[error("voucher {0} is no longer for sale")]
    Conflict(Uuid),

    #[error("voucher {0} has expired")]
    ExpiredVoucher(Uuid),

    /// Release/finalize attempted by a party that does not hold the reservation
    #[error("voucher {0} is not held by the requesting buyer")]
    NotOwned(Uuid),

    #[error("voucher {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The only component that mutates voucher state. Every operation maps onto
/// a single conditional transition against the store, so concurrent buyers
/// racing on one voucher get exactly one success and the rest a `Conflict`.
pub struct ReservationManager {
    store: Arc<dyn VoucherStore>,
    reservation_ttl: Duration,
}

impl ReservationManager {
    pub fn new(store: Arc<dyn VoucherStore>, reservation_ttl_seconds: u64) -> Self {
        Self {
            store,
            reservation_ttl: Duration::seconds(reservation_ttl_seconds as i64),
        }
    }

    pub fn store(&self) -> Arc<dyn VoucherStore> {
        Arc::clone(&self.store)
    }

    pub fn reservation_ttl(&self) -> Duration {
        self.reservation_ttl
    }

    /// `ForSale` -> `Reserved`, gated on the voucher still being sellable
    pub async fn reserve(
        &self,
        voucher_id: Uuid,
        buyer_id: &str,
    ) -> Result<ReservationToken, ReservationError> {
        let now = Utc::now();
        match self
            .store
            .try_reserve(voucher_id, buyer_id, now.date_naive(), now)
            .await?
        {
            Transition::Applied(voucher) => {
                tracing::debug!(voucher_id = %voucher_id, buyer_id = %buyer_id, "voucher reserved");
                let reserved_at = voucher.reserved_at.unwrap_or(now);
                Ok(ReservationToken {
                    voucher_id,
                    buyer_id: buyer_id.to_string(),
                    reserved_at,
                    expires_at: reserved_at + self.reservation_ttl,
                })
            }
            Transition::StatusMismatch(_) | Transition::OwnerMismatch => {
                Err(ReservationError::Conflict(voucher_id))
            }
            Transition::Expired => Err(ReservationError::ExpiredVoucher(voucher_id)),
            Transition::Missing => Err(ReservationError::NotFound(voucher_id)),
        }
    }

    /// `Reserved` -> `ForSale`, by the holder only
    pub async fn release(&self, voucher_id: Uuid, buyer_id: &str) -> Result<(), ReservationError> {
        match self.store.try_release(voucher_id, Some(buyer_id)).await? {
            Transition::Applied(_) => {
                tracing::debug!(voucher_id = %voucher_id, buyer_id = %buyer_id, "reservation released");
                Ok(())
            }
            Transition::Missing => Err(ReservationError::NotFound(voucher_id)),
            _ => Err(ReservationError::NotOwned(voucher_id)),
        }
    }

    /// `Reserved` -> `Sold`, by the holder only. Called by the checkout
    /// collaborator strictly after the payment processor confirms payment.
    pub async fn finalize(&self, voucher_id: Uuid, buyer_id: &str) -> Result<(), ReservationError> {
        match self.store.try_finalize(voucher_id, buyer_id).await? {
            Transition::Applied(_) => {
                tracing::info!(voucher_id = %voucher_id, buyer_id = %buyer_id, "voucher sold");
                Ok(())
            }
            Transition::Missing => Err(ReservationError::NotFound(voucher_id)),
            _ => Err(ReservationError::NotOwned(voucher_id)),
        }
    }

    /// Sweeper path: release regardless of owner. `Ok(false)` means the race
    /// was lost (the voucher is no longer reserved) and there is nothing to do.
    pub async fn reclaim(&self, voucher_id: Uuid) -> Result<bool, ReservationError> {
        match self.store.try_release(voucher_id, None).await? {
            Transition::Applied(_) => Ok(true),
            _ => Ok(false),
        }
    }

    /// Reservations older than the TTL as of `now`
    pub async fn stale_reservations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Voucher>, ReservationError> {
        Ok(self
            .store
            .list_stale_reservations(now - self.reservation_ttl)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use giftbay_shared::VoucherStatus;
    use giftbay_store::MemoryVoucherStore;

    const TTL_SECONDS: u64 = 300;

    async fn manager_with_listing(original: i64, sale: i64) -> (ReservationManager, Uuid) {
        let store = Arc::new(MemoryVoucherStore::new());
        let expiry = Utc::now().date_naive() + chrono::Duration::days(30);
        let voucher = Voucher::new("cafe-latte", original, sale, expiry);
        let id = voucher.id;
        store.insert(voucher).await.unwrap();
        (ReservationManager::new(store, TTL_SECONDS), id)
    }

    #[tokio::test]
    async fn test_reserve_returns_token_with_ttl_expiry() {
        let (manager, id) = manager_with_listing(3000, 2700).await;

        let token = manager.reserve(id, "buyer-1").await.unwrap();
        assert_eq!(token.voucher_id, id);
        assert_eq!(token.buyer_id, "buyer-1");
        assert_eq!(
            token.expires_at - token.reserved_at,
            Duration::seconds(TTL_SECONDS as i64)
        );

        let stored = manager.store().get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, VoucherStatus::Reserved);
        assert!(stored.reservation_fields_consistent());
    }

    #[tokio::test]
    async fn test_second_reserve_is_a_conflict() {
        let (manager, id) = manager_with_listing(3000, 2700).await;

        manager.reserve(id, "buyer-1").await.unwrap();
        let err = manager.reserve(id, "buyer-2").await.unwrap_err();
        assert!(matches!(err, ReservationError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_release_restores_for_sale() {
        let (manager, id) = manager_with_listing(3000, 2700).await;

        manager.reserve(id, "buyer-1").await.unwrap();
        manager.release(id, "buyer-1").await.unwrap();

        let stored = manager.store().get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, VoucherStatus::ForSale);
        assert!(stored.reserved_by.is_none());
        assert!(stored.reserved_at.is_none());
    }

    #[tokio::test]
    async fn test_double_release_is_not_owned_and_mutates_nothing() {
        let (manager, id) = manager_with_listing(3000, 2700).await;

        manager.reserve(id, "buyer-1").await.unwrap();
        manager.release(id, "buyer-1").await.unwrap();

        let err = manager.release(id, "buyer-1").await.unwrap_err();
        assert!(matches!(err, ReservationError::NotOwned(_)));

        let stored = manager.store().get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, VoucherStatus::ForSale);
        assert!(stored.reservation_fields_consistent());
    }

    #[tokio::test]
    async fn test_finalize_requires_the_holder() {
        let (manager, id) = manager_with_listing(3000, 2700).await;

        manager.reserve(id, "buyer-1").await.unwrap();
        let err = manager.finalize(id, "buyer-2").await.unwrap_err();
        assert!(matches!(err, ReservationError::NotOwned(_)));

        manager.finalize(id, "buyer-1").await.unwrap();
        let stored = manager.store().get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, VoucherStatus::Sold);
        assert!(stored.reservation_fields_consistent());
    }

    #[tokio::test]
    async fn test_unknown_voucher_is_not_found() {
        let (manager, _) = manager_with_listing(3000, 2700).await;
        let err = manager.reserve(Uuid::new_v4(), "buyer-1").await.unwrap_err();
        assert!(matches!(err, ReservationError::NotFound(_)));
    }
}
