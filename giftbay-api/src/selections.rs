use crate::buyer::BuyerId;
use crate::error::AppError;
use crate::picker::VoucherResponse;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use giftbay_offer::SelectionState;
use giftbay_reserve::{ReservationError, ReservationToken};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub voucher_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ToggleOnResponse {
    pub reserved: ReservationToken,
    /// The next-best sibling surfaced by the selection, if one was available
    pub sibling: Option<VoucherResponse>,
}

#[derive(Debug, Serialize)]
pub struct ToggleOffResponse {
    pub released: Vec<Uuid>,
}

/// POST /v1/selections/toggle-on
pub async fn toggle_on(
    State(state): State<AppState>,
    BuyerId(buyer): BuyerId,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ToggleOnResponse>, AppError> {
    let voucher = state
        .store
        .get(req.voucher_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("voucher {} not found", req.voucher_id)))?;

    let mut sessions = state.sessions.write().await;
    let controller = sessions
        .entry(buyer.clone())
        .or_insert_with(|| state.new_session(&buyer));

    let result = controller.toggle_on(&voucher).await;
    if matches!(result, Err(ReservationError::Conflict(_))) {
        state.metrics.reservation_conflicts_total.inc();
    }
    let (token, sibling) = result?;
    state.metrics.reservations_total.inc();

    Ok(Json(ToggleOnResponse {
        reserved: token,
        sibling: sibling
            .as_ref()
            .map(|voucher| VoucherResponse::new(voucher, state.market.bucket_size)),
    }))
}

/// POST /v1/selections/toggle-off
/// Deselect a voucher; siblings whose load-order justification disappears
/// are released back to the pool and dropped from the display.
pub async fn toggle_off(
    State(state): State<AppState>,
    BuyerId(buyer): BuyerId,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ToggleOffResponse>, AppError> {
    let voucher = state
        .store
        .get(req.voucher_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("voucher {} not found", req.voucher_id)))?;
    let bucket = voucher.price_bucket(state.market.bucket_size);

    let mut sessions = state.sessions.write().await;
    let controller = sessions.get_mut(&buyer).ok_or_else(|| {
        AppError::NotFoundError(format!("no selection session for buyer {}", buyer))
    })?;

    let released = controller.toggle_off(bucket, req.voucher_id).await?;
    state.metrics.releases_total.inc_by(released.len() as u64);
    Ok(Json(ToggleOffResponse { released }))
}

/// GET /v1/selections
pub async fn get_selections(
    State(state): State<AppState>,
    BuyerId(buyer): BuyerId,
) -> Result<Json<SelectionState>, AppError> {
    let sessions = state.sessions.read().await;
    let session_state = sessions
        .get(&buyer)
        .map(|controller| controller.state().clone())
        .unwrap_or_default();
    Ok(Json(session_state))
}
