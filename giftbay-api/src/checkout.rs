use crate::buyer::BuyerId;
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub voucher_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub finalized: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub released: Vec<Uuid>,
}

/// POST /v1/checkout/finalize
/// Called by the checkout collaborator strictly after the payment processor
/// confirms payment. Completing checkout ends the buyer's selection session.
pub async fn finalize(
    State(state): State<AppState>,
    BuyerId(buyer): BuyerId,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<FinalizeResponse>, AppError> {
    let mut finalized = Vec::new();
    for voucher_id in req.voucher_ids {
        state.reservations.finalize(voucher_id, &buyer).await?;
        state.metrics.finalized_total.inc();
        finalized.push(voucher_id);
    }

    state.sessions.write().await.remove(&buyer);
    Ok(Json(FinalizeResponse { finalized }))
}

/// POST /v1/checkout/release
/// Called by the checkout collaborator when payment fails, is abandoned, or
/// times out client-side. Also ends the buyer's selection session.
pub async fn release(
    State(state): State<AppState>,
    BuyerId(buyer): BuyerId,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<ReleaseResponse>, AppError> {
    let mut released = Vec::new();
    for voucher_id in req.voucher_ids {
        state.reservations.release(voucher_id, &buyer).await?;
        state.metrics.releases_total.inc();
        released.push(voucher_id);
    }

    state.sessions.write().await.remove(&buyer);
    Ok(Json(ReleaseResponse { released }))
}
