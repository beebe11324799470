// Monotonic nanosecond clock shared by every time limit and timing sample

use lazy_static::lazy_static;
use std::time::Instant;

lazy_static! {
    /// Process-wide epoch. All timestamps are nanoseconds since this instant,
    /// so they are comparable across threads.
    static ref EPOCH: Instant = Instant::now();
}

/// Current monotonic time in nanoseconds since the process epoch.
#[inline]
pub fn now_ns() -> u64 {
    EPOCH.elapsed().as_nanos() as u64
}

/// Nanoseconds elapsed since `start_ns` (saturates at zero).
#[inline]
pub fn elapsed_since(start_ns: u64) -> u64 {
    now_ns().saturating_sub(start_ns)
}
