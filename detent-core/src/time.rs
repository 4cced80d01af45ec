//! Millisecond time base
//!
//! Timestamps are a free-running `u32` millisecond counter supplied by the
//! caller (embassy `Instant`, a hardware timer, or a fake clock in tests).
//! All comparisons use wrapping differences, so the counter rolling over
//! after ~49.7 days does not disturb in-flight timeouts.
//!
//! Individual durations (pulse length, cooldown, sensor timeout) are `u16`
//! milliseconds. That caps any single duration at [`MAX_DURATION_MS`]
//! (~65 s); configuration validation rejects values that would need more
//! instead of letting them wrap.

/// Monotonic timestamp in milliseconds
pub type Millis = u32;

/// Longest single duration representable by the 16-bit duration fields
pub const MAX_DURATION_MS: u32 = u16::MAX as u32;

/// Milliseconds elapsed from `since` to `now`
#[inline]
pub fn elapsed(now: Millis, since: Millis) -> u32 {
    now.wrapping_sub(since)
}

/// Check whether `deadline` has been reached at `now`
///
/// Deadlines up to half the counter range in the future or past are
/// ordered correctly across a counter wrap.
#[inline]
pub fn reached(now: Millis, deadline: Millis) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

/// Deadline `delay_ms` after `now`
#[inline]
pub fn after(now: Millis, delay_ms: u32) -> Millis {
    now.wrapping_add(delay_ms)
}
