use crate::buyer::BuyerId;
use crate::error::AppError;
use crate::picker::VoucherResponse;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    /// Face-value budget to spend, in minor currency units
    pub budget: i64,
}

#[derive(Debug, Serialize)]
pub struct AllocationResponse {
    pub selected: Vec<VoucherResponse>,
    pub total_cost: i64,
    pub remaining_budget: i64,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub voucher_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub released: usize,
}

/// POST /v1/brands/{brand}/allocate
/// Greedy budget pick over the brand's whole for-sale pool.
pub async fn allocate(
    State(state): State<AppState>,
    BuyerId(buyer): BuyerId,
    Path(brand): Path<String>,
    Json(req): Json<AllocateRequest>,
) -> Result<Json<AllocationResponse>, AppError> {
    if req.budget <= 0 {
        return Err(AppError::ValidationError(
            "budget must be positive".to_string(),
        ));
    }

    let allocation = state.allocator.allocate(&brand, &buyer, req.budget).await?;
    state
        .metrics
        .reservations_total
        .inc_by(allocation.selected.len() as u64);

    Ok(Json(AllocationResponse {
        selected: allocation
            .selected
            .iter()
            .map(|voucher| VoucherResponse::new(voucher, state.market.bucket_size))
            .collect(),
        total_cost: allocation.total_cost,
        remaining_budget: allocation.remaining_budget,
    }))
}

/// POST /v1/allocations/cancel
/// Release an abandoned allocation back to the pool.
pub async fn cancel(
    State(state): State<AppState>,
    BuyerId(buyer): BuyerId,
    Json(req): Json<CancelRequest>,
) -> Result<Json<CancelResponse>, AppError> {
    let vouchers = state.store.get_many(&req.voucher_ids).await?;
    let released = state.allocator.cancel(&buyer, &vouchers).await?;
    state.metrics.releases_total.inc_by(released as u64);
    Ok(Json(CancelResponse { released }))
}
