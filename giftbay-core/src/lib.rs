pub mod ranking;
pub mod repository;

pub use repository::{StoreError, Transition, VoucherStore};
