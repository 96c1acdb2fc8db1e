pub mod allocator;
pub mod cascade;
pub mod coupons;
pub mod recommend;

pub use allocator::{Allocation, BudgetAllocator};
pub use cascade::{plan_cascade, SelectionController, SelectionState};
pub use coupons::AppliedCoupon;
pub use recommend::BucketRecommender;
