//! Outbound rate limiting.
//!
//! A limiter is owned by the client it wraps. There is no process-global
//! limiter.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

pub type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub const DEFAULT_BURST: u32 = 10;
pub const DEFAULT_PER_SECOND: u32 = 5;

/// `per_second` sustained with bursts up to `burst`. Zero is treated as one.
pub fn quota(per_second: u32, burst: u32) -> Quota {
    let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    Quota::per_second(per_second).allow_burst(burst)
}

pub fn default_quota() -> Quota {
    quota(DEFAULT_PER_SECOND, DEFAULT_BURST)
}

pub fn limiter(quota: Quota) -> DirectRateLimiter {
    RateLimiter::direct(quota)
}

/// Take one cell now, or report how long until one frees up.
pub fn try_acquire(limiter: &DirectRateLimiter) -> Result<(), Duration> {
    limiter
        .check()
        .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
}
