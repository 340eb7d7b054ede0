//! Sliding-window attempt throttling.

mod clock;
mod limiter;
mod policy;
mod registry;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{RateLimitDecision, RateLimiter, DEFAULT_IDENTIFIER};
pub use policy::{LimitPolicy, PolicyKind};
pub use registry::Limiters;
pub use window::AttemptLog;
