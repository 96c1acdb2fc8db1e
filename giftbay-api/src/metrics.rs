use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,
    pub reservations_total: IntCounter,
    pub reservation_conflicts_total: IntCounter,
    pub releases_total: IntCounter,
    pub finalized_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let reservations_total = IntCounter::new(
            "giftbay_reservations_total",
            "Vouchers successfully reserved",
        )
        .expect("valid metric definition");
        let reservation_conflicts_total = IntCounter::new(
            "giftbay_reservation_conflicts_total",
            "Reservation attempts lost to another buyer",
        )
        .expect("valid metric definition");
        let releases_total = IntCounter::new(
            "giftbay_releases_total",
            "Reservations released back to the pool",
        )
        .expect("valid metric definition");
        let finalized_total =
            IntCounter::new("giftbay_finalized_total", "Vouchers sold through checkout")
                .expect("valid metric definition");

        registry
            .register(Box::new(reservations_total.clone()))
            .expect("metric registration");
        registry
            .register(Box::new(reservation_conflicts_total.clone()))
            .expect("metric registration");
        registry
            .register(Box::new(releases_total.clone()))
            .expect("metric registration");
        registry
            .register(Box::new(finalized_total.clone()))
            .expect("metric registration");

        Self {
            registry,
            reservations_total,
            reservation_conflicts_total,
            releases_total,
            finalized_total,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, AppError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&state.metrics.registry.gather(), &mut buffer)
        .map_err(|err| AppError::Anyhow(err.into()))?;
    String::from_utf8(buffer).map_err(|err| AppError::Anyhow(err.into()))
}
