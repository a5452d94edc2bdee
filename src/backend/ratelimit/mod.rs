//! Rate Limiting Module
//!
//! Per-identity sliding-window counters with a hard cooldown.
//!
//! # Architecture
//!
//! - **`clock`** - `Clock` trait with `SystemClock` and the controllable
//!   `ManualClock`
//! - **`limiter`** - `RateLimiter`, its configuration, keys and admission
//!   results
//! - **`sweeper`** - background task evicting idle, unblocked keys
//!
//! Two limiters run in a server: the general one (100 events per minute by
//! default) and the one guarding the privileged system namespace (50).

/// Clock sources
pub mod clock;

/// Sliding-window limiter
pub mod limiter;

/// Idle-key sweeper
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{Admission, RateKey, RateLimitConfig, RateLimiter, RateLimiterStats};
pub use sweeper::{spawn_sweeper, SweeperHandle};
