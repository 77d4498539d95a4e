//! Rate limiting logic and state management.

pub mod evaluator;
pub mod janitor;
pub mod limiter;
mod record;
pub mod result;
mod stats;
mod store;
mod tier;
mod window;

pub use evaluator::evaluate;
pub use janitor::{Janitor, JanitorHandle};
pub use limiter::RateLimiter;
pub use record::RateLimitRecord;
pub use result::RateLimitResult;
pub use stats::{AggregateStats, PrincipalStats, Stats, WindowStats};
pub use store::RecordStore;
pub use tier::{Tier, TierLimits, TierLimitsSource, TierTable};
pub use window::{TimeWindow, Window};
