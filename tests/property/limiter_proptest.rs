//! Property-based tests for the sliding-window limiter

use proptest::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;
use xfboard::backend::ratelimit::{ManualClock, RateKey, RateLimitConfig, RateLimiter};

fn limiter(max_events: usize, clock: &ManualClock) -> RateLimiter {
    RateLimiter::with_clock(
        "proptest",
        RateLimitConfig {
            window: Duration::from_secs(60),
            max_events,
            cooldown: Duration::from_secs(300),
        },
        Arc::new(clock.clone()),
    )
}

proptest! {
    #[test]
    fn test_admissions_never_exceed_the_cap(
        max_events in 1usize..30,
        attempts in 0usize..90,
        step_ms in 0u64..500,
    ) {
        let clock = ManualClock::new(Instant::now());
        let limiter = limiter(max_events, &clock);
        let key = RateKey::Identity(Uuid::new_v4());

        let mut allowed = 0;
        for _ in 0..attempts {
            if limiter.admit(key).is_allowed() {
                allowed += 1;
            }
            clock.advance(Duration::from_millis(step_ms));
        }
        // Every attempt lands inside one 60s window and its cooldown
        prop_assert_eq!(allowed, attempts.min(max_events));
    }

    #[test]
    fn test_keys_do_not_share_budgets(max_events in 1usize..10, users in 2usize..6) {
        let clock = ManualClock::new(Instant::now());
        let limiter = limiter(max_events, &clock);
        let keys: Vec<_> = (0..users).map(|_| RateKey::Identity(Uuid::new_v4())).collect();

        for _ in 0..max_events {
            for key in &keys {
                prop_assert!(limiter.admit(*key).is_allowed());
            }
        }
        for key in &keys {
            prop_assert!(!limiter.admit(*key).is_allowed());
        }
    }
}
