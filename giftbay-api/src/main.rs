use giftbay_api::{app, metrics::Metrics, state::AppState};
use giftbay_core::VoucherStore;
use giftbay_offer::{BucketRecommender, BudgetAllocator};
use giftbay_reserve::{ExpirySweeper, ReservationManager};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "giftbay_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = giftbay_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Giftbay API on port {}", config.server.port);

    let store: Arc<dyn VoucherStore> = match &config.database.url {
        Some(url) => {
            let db = giftbay_store::DbClient::new(url)
                .await
                .expect("Failed to connect to Postgres");
            db.migrate().await.expect("Failed to run migrations");
            Arc::new(giftbay_store::PostgresVoucherStore::new(db.pool.clone()))
        }
        None => {
            tracing::info!("No database configured, using the in-memory voucher store");
            Arc::new(giftbay_store::MemoryVoucherStore::new())
        }
    };

    let reservations = Arc::new(ReservationManager::new(
        store.clone(),
        config.market.reservation_ttl_seconds,
    ));

    let sweeper = ExpirySweeper::new(reservations.clone(), config.market.sweep_interval_seconds);
    tokio::spawn(sweeper.run());

    let app_state = AppState {
        store,
        reservations: reservations.clone(),
        recommender: BucketRecommender::new(reservations.clone(), config.market.bucket_size),
        allocator: Arc::new(BudgetAllocator::new(reservations)),
        sessions: Arc::new(RwLock::new(HashMap::new())),
        market: config.market.clone(),
        metrics: Metrics::new(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
