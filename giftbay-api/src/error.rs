use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use giftbay_core::StoreError;
use giftbay_reserve::ReservationError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    ExpiredError(String),
    NotOwnedError(String),
    UnavailableError(String),
    Anyhow(anyhow::Error),
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Conflict(_) => AppError::ConflictError(err.to_string()),
            ReservationError::ExpiredVoucher(_) => AppError::ExpiredError(err.to_string()),
            ReservationError::NotOwned(_) => AppError::NotOwnedError(err.to_string()),
            ReservationError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            ReservationError::Store(_) => AppError::UnavailableError(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::UnavailableError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::ExpiredError(msg) => (StatusCode::GONE, msg),
            AppError::NotOwnedError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::UnavailableError(msg) => {
                tracing::error!("Voucher store unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service Unavailable".to_string(),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
