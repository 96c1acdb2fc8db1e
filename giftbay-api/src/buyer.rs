use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Opaque buyer session id issued by the external authentication
/// collaborator, carried on the `x-buyer-id` header.
pub struct BuyerId(pub String);

impl<S> FromRequestParts<S> for BuyerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-buyer-id")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| BuyerId(value.to_string()))
            .ok_or_else(|| AppError::ValidationError("missing x-buyer-id header".to_string()))
    }
}
