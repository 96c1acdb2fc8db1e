use crate::manager::{ReservationError, ReservationManager};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Background task reclaiming reservations abandoned past the TTL. Runs on
/// its own schedule, fully decoupled from any buyer session; its releases go
/// through the same conditional transition as everyone else's, so losing a
/// race against a buyer's own release or finalize is harmless.
pub struct ExpirySweeper {
    reservations: Arc<ReservationManager>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(reservations: Arc<ReservationManager>, sweep_interval_seconds: u64) -> Self {
        Self {
            reservations,
            interval: Duration::from_secs(sweep_interval_seconds),
        }
    }

    /// One scan: release every reservation stale as of `now`. A voucher that
    /// changed hands between the scan and the release lost the race and is
    /// skipped.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<usize, ReservationError> {
        let stale = self.reservations.stale_reservations(now).await?;
        let mut reclaimed = 0;
        for voucher in stale {
            match self.reservations.reclaim(voucher.id).await {
                Ok(true) => {
                    debug!(voucher_id = %voucher.id, "reclaimed stale reservation");
                    reclaimed += 1;
                }
                Ok(false) => {
                    debug!(voucher_id = %voucher.id, "stale reservation already resolved, skipping");
                }
                Err(err) => {
                    warn!(voucher_id = %voucher.id, error = %err, "failed to reclaim reservation");
                }
            }
        }
        Ok(reclaimed)
    }

    /// Sweep forever. Store failures are logged and retried next tick, never
    /// fatal.
    pub async fn run(self) {
        info!(interval_seconds = self.interval.as_secs(), "expiry sweeper started");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.sweep_once(Utc::now()).await {
                Ok(0) => {}
                Ok(reclaimed) => info!(reclaimed, "expiry sweep complete"),
                Err(err) => warn!(error = %err, "expiry sweep failed, will retry next tick"),
            }
        }
    }
}
