use crate::error::AppError;
use axum::Json;
use chrono::Utc;
use giftbay_offer::coupons::{apply, pick_best};
use giftbay_offer::AppliedCoupon;
use giftbay_shared::Coupon;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PickCouponRequest {
    /// Sum of sale prices over the final selection
    pub cart_total: i64,
    pub coupons: Vec<Coupon>,
}

#[derive(Debug, Serialize)]
pub struct PickCouponResponse {
    pub coupon: Option<Coupon>,
    pub applied: Option<AppliedCoupon>,
}

/// POST /v1/coupons/pick
/// Pick and apply the single best usable coupon for a cart total.
pub async fn pick(
    Json(req): Json<PickCouponRequest>,
) -> Result<Json<PickCouponResponse>, AppError> {
    if req.cart_total < 0 {
        return Err(AppError::ValidationError(
            "cart total must not be negative".to_string(),
        ));
    }

    let today = Utc::now().date_naive();
    let best = pick_best(&req.coupons, req.cart_total, today).cloned();
    let applied = best.as_ref().map(|coupon| apply(coupon, req.cart_total));

    Ok(Json(PickCouponResponse {
        coupon: best,
        applied,
    }))
}
