//! Wall-clock helpers with strictly increasing readings
//!
//! Queue sort keys embed a microsecond timestamp and list sort keys embed a
//! nanosecond timestamp. Two insertions inside the same clock tick would
//! otherwise produce colliding or randomly ordered keys, so the fine-grained
//! readings here are forced through an atomic high-water mark: each call
//! returns at least one more than the previous call returned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static LAST_MICROS: AtomicU64 = AtomicU64::new(0);
static LAST_NANOS: AtomicU64 = AtomicU64::new(0);

fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Current time in epoch seconds.
pub fn now_seconds() -> u64 {
    unix_nanos() / 1_000_000_000
}

fn monotonic(raw: u64, last: &AtomicU64) -> u64 {
    let mut prev = last.load(Ordering::Relaxed);
    loop {
        let next = raw.max(prev + 1);
        match last.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => prev = observed,
        }
    }
}

/// Epoch microseconds, strictly increasing across calls in this process.
pub fn now_micros() -> u64 {
    monotonic(unix_nanos() / 1_000, &LAST_MICROS)
}

/// Epoch nanoseconds, strictly increasing across calls in this process.
pub fn now_nanos() -> u64 {
    monotonic(unix_nanos(), &LAST_NANOS)
}
