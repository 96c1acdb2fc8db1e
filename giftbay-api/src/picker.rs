use crate::buyer::BuyerId;
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use giftbay_shared::{Voucher, VoucherStatus};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct VoucherResponse {
    pub id: Uuid,
    pub brand: String,
    pub display_name: Option<String>,
    pub original_price: i64,
    pub sale_price: i64,
    pub expiry_date: NaiveDate,
    pub status: VoucherStatus,
    pub reserved_by: Option<String>,
    pub reserved_at: Option<DateTime<Utc>>,
    pub price_bucket: i64,
}

impl VoucherResponse {
    pub fn new(voucher: &Voucher, bucket_size: i64) -> Self {
        Self {
            id: voucher.id,
            brand: voucher.brand.clone(),
            display_name: voucher.display_name.clone(),
            original_price: voucher.original_price,
            sale_price: voucher.sale_price,
            expiry_date: voucher.expiry_date,
            status: voucher.status,
            reserved_by: voucher.reserved_by.clone(),
            reserved_at: voucher.reserved_at,
            price_bucket: voucher.price_bucket(bucket_size),
        }
    }
}

/// GET /v1/brands/{brand}/picker
/// Initial recommended set: one best voucher per price bucket, recorded as
/// the root of each bucket's load sequence in the buyer's session.
pub async fn get_picker(
    State(state): State<AppState>,
    BuyerId(buyer): BuyerId,
    Path(brand): Path<String>,
) -> Result<Json<Vec<VoucherResponse>>, AppError> {
    let mut sessions = state.sessions.write().await;
    let controller = sessions
        .entry(buyer.clone())
        .or_insert_with(|| state.new_session(&buyer));

    let picks = controller.load_picker(&brand).await?;
    Ok(Json(
        picks
            .iter()
            .map(|voucher| VoucherResponse::new(voucher, state.market.bucket_size))
            .collect(),
    ))
}
