use crate::recommend::BucketRecommender;
use chrono::Utc;
use giftbay_reserve::{ReservationError, ReservationManager, ReservationToken};
use giftbay_shared::Voucher;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Ephemeral per-buyer selection state: what is selected, and the order in
/// which vouchers were surfaced per price bucket (root recommendation first,
/// then lazily-loaded siblings).
#[derive(Debug, Default, Clone, Serialize)]
pub struct SelectionState {
    pub selected: HashSet<Uuid>,
    pub load_order: HashMap<i64, Vec<Uuid>>,
}

/// Pure cascade rule for deselecting `toggled` within one bucket's load
/// sequence.
///
/// A surfaced voucher may stay on display only while every voucher surfaced
/// before it in the same bucket is still selected. With `toggled` treated as
/// deselected, the longest such prefix survives; everything past it is
/// released, selected or not, since its justifying predecessor is gone and
/// it must return to the pool. A load sequence whose ordering was already
/// broken by an earlier action releases `toggled` itself the same way.
pub fn plan_cascade(
    selected: &HashSet<Uuid>,
    loaded: &[Uuid],
    toggled: Uuid,
) -> (HashSet<Uuid>, Vec<Uuid>) {
    let mut new_selected = selected.clone();
    new_selected.remove(&toggled);

    // position p stays displayed while positions 0..p are all selected
    let mut kept = 0;
    for id in loaded {
        if new_selected.contains(id) {
            kept += 1;
        } else {
            break;
        }
    }

    let releases: Vec<Uuid> = loaded.iter().skip(kept + 1).copied().collect();
    for id in &releases {
        new_selected.remove(id);
    }
    (new_selected, releases)
}

/// Session-scoped controller for one buyer's in-progress selection. Owns the
/// selection state; every cascade decision goes through `plan_cascade`, and
/// this object performs the resulting reservations and releases.
pub struct SelectionController {
    buyer_id: String,
    reservations: Arc<ReservationManager>,
    recommender: BucketRecommender,
    state: SelectionState,
}

impl SelectionController {
    pub fn new(
        buyer_id: impl Into<String>,
        reservations: Arc<ReservationManager>,
        recommender: BucketRecommender,
    ) -> Self {
        Self {
            buyer_id: buyer_id.into(),
            reservations,
            recommender,
            state: SelectionState::default(),
        }
    }

    pub fn buyer_id(&self) -> &str {
        &self.buyer_id
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Record a voucher surfaced to this buyer at the end of its bucket's
    /// load sequence
    pub fn record_loaded(&mut self, bucket: i64, voucher_id: Uuid) {
        let sequence = self.state.load_order.entry(bucket).or_default();
        if !sequence.contains(&voucher_id) {
            sequence.push(voucher_id);
        }
    }

    /// Load the initial picker for a brand into this session
    pub async fn load_picker(&mut self, brand: &str) -> Result<Vec<Voucher>, ReservationError> {
        let picks = self.recommender.recommend_for_brand(brand).await?;
        for voucher in &picks {
            let bucket = voucher.price_bucket(self.recommender.bucket_size());
            self.record_loaded(bucket, voucher.id);
        }
        Ok(picks)
    }

    /// Select a voucher: reserve it, then surface the next sibling in its
    /// bucket. Returns the reservation and the sibling, if one could be
    /// reserved.
    ///
    /// A voucher this session already holds (a surfaced sibling, or a root
    /// that was deselected without losing its display slot) is selectable
    /// without a second reservation.
    pub async fn toggle_on(
        &mut self,
        voucher: &Voucher,
    ) -> Result<(ReservationToken, Option<Voucher>), ReservationError> {
        let token = match self.reservations.reserve(voucher.id, &self.buyer_id).await {
            Ok(token) => token,
            Err(ReservationError::Conflict(id)) => {
                let current = self.reservations.store().get(id).await?;
                match current {
                    Some(held) if held.reserved_by.as_deref() == Some(self.buyer_id.as_str()) => {
                        let reserved_at = held.reserved_at.unwrap_or_else(Utc::now);
                        ReservationToken {
                            voucher_id: id,
                            buyer_id: self.buyer_id.clone(),
                            reserved_at,
                            expires_at: reserved_at + self.reservations.reservation_ttl(),
                        }
                    }
                    _ => return Err(ReservationError::Conflict(id)),
                }
            }
            Err(err) => return Err(err),
        };
        let bucket = voucher.price_bucket(self.recommender.bucket_size());
        self.record_loaded(bucket, voucher.id);
        self.state.selected.insert(voucher.id);

        let loaded = self
            .state
            .load_order
            .get(&bucket)
            .cloned()
            .unwrap_or_default();
        let sibling = self
            .recommender
            .expand_bucket(&voucher.brand, bucket, &loaded, &self.buyer_id)
            .await?;
        if let Some(ref surfaced) = sibling {
            self.record_loaded(bucket, surfaced.id);
        }
        Ok((token, sibling))
    }

    /// Deselect a voucher and release every sibling whose load-order
    /// justification that removes. Returns the ids dropped from display.
    pub async fn toggle_off(
        &mut self,
        bucket: i64,
        voucher_id: Uuid,
    ) -> Result<Vec<Uuid>, ReservationError> {
        let loaded = self
            .state
            .load_order
            .get(&bucket)
            .cloned()
            .unwrap_or_default();
        let (new_selected, releases) = plan_cascade(&self.state.selected, &loaded, voucher_id);

        for id in &releases {
            match self.reservations.release(*id, &self.buyer_id).await {
                Ok(()) => {}
                // the sweeper, or another transition, got there first
                Err(ReservationError::NotOwned(_)) | Err(ReservationError::NotFound(_)) => {
                    debug!(voucher_id = %id, "cascade release was already resolved");
                }
                Err(err) => return Err(err),
            }
        }

        self.state.selected = new_selected;
        if let Some(sequence) = self.state.load_order.get_mut(&bucket) {
            sequence.retain(|id| !releases.contains(id));
        }
        Ok(releases)
    }
}
