use crate::error::AppError;
use crate::picker::VoucherResponse;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use giftbay_core::ranking;
use giftbay_shared::{Voucher, VoucherStatus};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateVoucherRequest {
    pub brand: String,
    pub display_name: Option<String>,
    pub original_price: i64,
    pub sale_price: i64,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ListVouchersQuery {
    pub status: Option<VoucherStatus>,
}

/// POST /v1/admin/vouchers
/// Intake from the external listing collaborator.
pub async fn create_voucher(
    State(state): State<AppState>,
    Json(req): Json<CreateVoucherRequest>,
) -> Result<Json<VoucherResponse>, AppError> {
    if req.brand.is_empty() {
        return Err(AppError::ValidationError("brand must be set".to_string()));
    }
    if req.original_price <= 0 || req.sale_price <= 0 || req.sale_price > req.original_price {
        return Err(AppError::ValidationError(
            "sale price must be positive and at most the face value".to_string(),
        ));
    }

    let mut voucher = Voucher::new(
        req.brand,
        req.original_price,
        req.sale_price,
        req.expiry_date,
    );
    voucher.display_name = req.display_name;

    state.store.insert(voucher.clone()).await?;
    tracing::info!(voucher_id = %voucher.id, brand = %voucher.brand, "voucher listed");

    Ok(Json(VoucherResponse::new(&voucher, state.market.bucket_size)))
}

/// GET /v1/admin/vouchers
/// Operational listing across all brands, filtered by status
/// (defaults to the currently held reservations).
pub async fn list_vouchers(
    State(state): State<AppState>,
    Query(query): Query<ListVouchersQuery>,
) -> Result<Json<Vec<VoucherResponse>>, AppError> {
    let status = query.status.unwrap_or(VoucherStatus::Reserved);
    let vouchers = state.store.list_by_status(status).await?;

    Ok(Json(
        vouchers
            .iter()
            .map(|voucher| VoucherResponse::new(voucher, state.market.bucket_size))
            .collect(),
    ))
}

/// GET /v1/brands/{brand}/vouchers
/// The brand's current for-sale pool, in ranked order.
pub async fn list_brand_vouchers(
    State(state): State<AppState>,
    Path(brand): Path<String>,
) -> Result<Json<Vec<VoucherResponse>>, AppError> {
    let mut pool = state.store.list_for_sale(&brand).await?;
    ranking::rank(&mut pool);

    Ok(Json(
        pool.iter()
            .map(|voucher| VoucherResponse::new(voucher, state.market.bucket_size))
            .collect(),
    ))
}
