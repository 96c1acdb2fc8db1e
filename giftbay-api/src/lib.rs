use axum::http::{HeaderName, Method};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod allocations;
pub mod buyer;
pub mod checkout;
pub mod coupons;
pub mod error;
pub mod metrics;
pub mod picker;
pub mod selections;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static("x-buyer-id"),
        ]);

    Router::new()
        .route("/v1/brands/{brand}/picker", get(picker::get_picker))
        .route("/v1/brands/{brand}/vouchers", get(admin::list_brand_vouchers))
        .route("/v1/brands/{brand}/allocate", post(allocations::allocate))
        .route("/v1/allocations/cancel", post(allocations::cancel))
        .route("/v1/selections", get(selections::get_selections))
        .route("/v1/selections/toggle-on", post(selections::toggle_on))
        .route("/v1/selections/toggle-off", post(selections::toggle_off))
        .route("/v1/checkout/finalize", post(checkout::finalize))
        .route("/v1/checkout/release", post(checkout::release))
        .route("/v1/coupons/pick", post(coupons::pick))
        .route(
            "/v1/admin/vouchers",
            post(admin::create_voucher).get(admin::list_vouchers),
        )
        .route("/metrics", get(metrics::metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
