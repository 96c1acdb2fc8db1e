use giftbay_core::VoucherStore;
use giftbay_offer::{BucketRecommender, BudgetAllocator, SelectionController};
use giftbay_reserve::ReservationManager;
use giftbay_store::app_config::MarketRules;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Per-buyer selection sessions, keyed by the opaque buyer id
pub type SessionMap = Arc<RwLock<HashMap<String, SelectionController>>>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VoucherStore>,
    pub reservations: Arc<ReservationManager>,
    pub recommender: BucketRecommender,
    pub allocator: Arc<BudgetAllocator>,
    pub sessions: SessionMap,
    pub market: MarketRules,
    pub metrics: crate::metrics::Metrics,
}

impl AppState {
    /// Fresh selection session for a buyer
    pub fn new_session(&self, buyer_id: &str) -> SelectionController {
        SelectionController::new(buyer_id, self.reservations.clone(), self.recommender.clone())
    }
}
