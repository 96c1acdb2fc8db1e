use chrono::Utc;
use giftbay_core::ranking;
use giftbay_reserve::{ReservationError, ReservationManager};
use giftbay_shared::{Voucher, VoucherStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a budget-driven bulk pick
#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    pub selected: Vec<Voucher>,
    /// Sum of sale prices: what the buyer pays
    pub total_cost: i64,
    /// Budget left after debiting each selection's face value
    pub remaining_budget: i64,
}

/// Greedily reserves the best-ranked affordable vouchers across a brand's
/// whole pool. A deliberate single linear pass, not a knapsack solver:
/// candidates are already ranked by efficiency, and responsiveness matters
/// more than squeezing the last unit out of the budget.
pub struct BudgetAllocator {
    reservations: Arc<ReservationManager>,
}

impl BudgetAllocator {
    pub fn new(reservations: Arc<ReservationManager>) -> Self {
        Self { reservations }
    }

    /// Reserve the best-ranked affordable vouchers until the budget or the
    /// pool runs out. Contested and expired candidates are skipped without
    /// consuming budget. No affordable candidate at all yields an empty
    /// selection with the budget returned untouched.
    pub async fn allocate(
        &self,
        brand: &str,
        buyer_id: &str,
        budget: i64,
    ) -> Result<Allocation, ReservationError> {
        let today = Utc::now().date_naive();
        let mut candidates: Vec<Voucher> = self
            .reservations
            .store()
            .list_for_sale(brand)
            .await?
            .into_iter()
            .filter(|v| !v.is_expired(today))
            .collect();
        ranking::rank(&mut candidates);

        let mut selected = Vec::new();
        let mut total_cost = 0;
        let mut remaining_budget = budget;

        for candidate in candidates {
            if candidate.original_price > remaining_budget {
                continue;
            }
            match self.reservations.reserve(candidate.id, buyer_id).await {
                Ok(token) => {
                    remaining_budget -= candidate.original_price;
                    total_cost += candidate.sale_price;
                    let mut reserved = candidate;
                    reserved.status = VoucherStatus::Reserved;
                    reserved.reserved_by = Some(token.buyer_id);
                    reserved.reserved_at = Some(token.reserved_at);
                    selected.push(reserved);
                    if remaining_budget == 0 {
                        break;
                    }
                }
                Err(ReservationError::Conflict(id)) => {
                    debug!(voucher_id = %id, "allocation candidate contested, skipping");
                }
                Err(ReservationError::ExpiredVoucher(id)) => {
                    debug!(voucher_id = %id, "allocation candidate expired, skipping");
                }
                Err(ReservationError::NotFound(id)) => {
                    warn!(voucher_id = %id, "allocation candidate vanished, skipping");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Allocation {
            selected,
            total_cost,
            remaining_budget,
        })
    }

    /// Release an abandoned or cancelled allocation. A voucher the sweeper
    /// already reclaimed no-ops and is logged, not failed. Returns the count
    /// actually released.
    pub async fn cancel(
        &self,
        buyer_id: &str,
        selection: &[Voucher],
    ) -> Result<usize, ReservationError> {
        let mut released = 0;
        for voucher in selection {
            match self.reservations.release(voucher.id, buyer_id).await {
                Ok(()) => released += 1,
                Err(ReservationError::NotOwned(id)) | Err(ReservationError::NotFound(id)) => {
                    debug!(voucher_id = %id, "cancel release was already resolved, skipping");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(released)
    }
}
