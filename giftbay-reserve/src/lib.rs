pub mod manager;
pub mod sweeper;

pub use manager::{ReservationError, ReservationManager, ReservationToken};
pub use sweeper::ExpirySweeper;
