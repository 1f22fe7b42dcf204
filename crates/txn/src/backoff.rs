//! Full-jitter backoff computation.
//!
//! `delay = uniform_random(0, min(base * 2^(attempt-1), max))`, floored at
//! [`MIN_DELAY`] to avoid zero-wait hot loops.
//!
//! Full jitter (not just exponential backoff) is the point: a write
//! conflict implies at least one *other* concurrent writer, and if both
//! losers wait the same deterministic interval they re-collide on the next
//! attempt. Drawing uniformly from the whole window decorrelates competing
//! retriers.

use std::cell::Cell;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::time::Duration;

/// Smallest delay ever returned, so retry loops always yield the CPU.
pub const MIN_DELAY: Duration = Duration::from_millis(10);

/// Compute the randomized wait before retrying `attempt` (1-indexed).
pub fn full_jitter(base_delay: Duration, max_delay: Duration, attempt: u32) -> Duration {
    let attempt = attempt.max(1);
    let base_ms = base_delay.as_millis() as u64;
    let cap_ms = max_delay.as_millis() as u64;

    let exponential = base_ms
        .saturating_mul(2u64.saturating_pow(attempt - 1))
        .min(cap_ms);

    let drawn = uniform_inclusive(exponential);
    Duration::from_millis(drawn.max(MIN_DELAY.as_millis() as u64))
}

thread_local! {
    static RNG_STATE: Cell<u64> = Cell::new(seed());
}

/// Per-thread seed. `RandomState` draws fresh entropy per instance, which
/// is all the unpredictability jitter needs (this is not cryptographic).
fn seed() -> u64 {
    // xorshift state must be nonzero.
    RandomState::new().build_hasher().finish() | 1
}

fn next_u64() -> u64 {
    RNG_STATE.with(|state| {
        let mut x = state.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        state.set(x);
        x
    })
}

/// Uniform draw from `[0, bound]`. Modulo bias is irrelevant at these
/// magnitudes.
fn uniform_inclusive(bound: u64) -> u64 {
    if bound == u64::MAX {
        next_u64()
    } else {
        next_u64() % (bound + 1)
    }
}
