use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use giftbay_shared::{Voucher, VoucherStatus};
use uuid::Uuid;

/// Failures of the storage layer itself. A transition whose precondition no
/// longer holds is not an error; it comes back as a `Transition` variant.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("voucher store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt voucher record {id}: {detail}")]
    Corrupt { id: Uuid, detail: String },
}

/// Outcome of a single conditional status transition
#[derive(Debug, Clone)]
pub enum Transition {
    /// The precondition held and the update landed; carries the new record
    Applied(Voucher),
    /// The status no longer matched the precondition
    StatusMismatch(VoucherStatus),
    /// Reserved, but by a different buyer than expected
    OwnerMismatch,
    /// No voucher with this id
    Missing,
    /// Still for sale, but past its expiry date
    Expired,
}

/// Storage seam for the voucher pool.
///
/// Every state change goes through one of the three `try_*` transitions, and
/// each is a single atomic conditional update keyed on `status` (an
/// optimistic lock): concurrent callers racing on the same voucher produce
/// exactly one `Applied`, never a lost update. Implementations must not
/// read-then-write.
#[async_trait]
pub trait VoucherStore: Send + Sync {
    async fn insert(&self, voucher: Voucher) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Voucher>, StoreError>;

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Voucher>, StoreError>;

    /// All `ForSale` vouchers of one brand
    async fn list_for_sale(&self, brand: &str) -> Result<Vec<Voucher>, StoreError>;

    async fn list_by_status(&self, status: VoucherStatus) -> Result<Vec<Voucher>, StoreError>;

    /// `Reserved` vouchers whose `reserved_at` is before `cutoff`
    async fn list_stale_reservations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Voucher>, StoreError>;

    /// `ForSale` and not expired as of `today` -> `Reserved` by `buyer_id` at `now`
    async fn try_reserve(
        &self,
        id: Uuid,
        buyer_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Transition, StoreError>;

    /// `Reserved` -> `ForSale`, clearing the reservation fields. With
    /// `expected_buyer` set the current holder must match; `None` is the
    /// sweeper's owner-bypass path.
    async fn try_release(
        &self,
        id: Uuid,
        expected_buyer: Option<&str>,
    ) -> Result<Transition, StoreError>;

    /// `Reserved` by `expected_buyer` -> `Sold`
    async fn try_finalize(
        &self,
        id: Uuid,
        expected_buyer: &str,
    ) -> Result<Transition, StoreError>;
}
