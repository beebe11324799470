use super::clock;
use std::fmt;

/// How much more wall-clock time a bounded operation may consume.
///
/// A `TimeLimit` is either an absolute point on the [`clock`] timeline or
/// unbounded. It is `Copy` so handlers can be handed the caller's remaining
/// budget without any bookkeeping.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum TimeLimit {
    /// Never expires.
    Unbounded,
    /// Expires once the clock reaches this many nanoseconds.
    At(u64),
}

impl TimeLimit {
    pub fn unbounded() -> Self {
        TimeLimit::Unbounded
    }

    /// A limit `ns` nanoseconds from now.
    pub fn relative(ns: u64) -> Self {
        TimeLimit::At(clock::now_ns().saturating_add(ns))
    }

    pub fn absolute(deadline_ns: u64) -> Self {
        TimeLimit::At(deadline_ns)
    }

    /// A limit that has already passed.
    pub fn expired() -> Self {
        TimeLimit::At(0)
    }

    #[inline]
    pub fn is_unbounded(&self) -> bool {
        matches!(self, TimeLimit::Unbounded)
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        match *self {
            TimeLimit::Unbounded => false,
            TimeLimit::At(deadline) => clock::now_ns() >= deadline,
        }
    }

    /// True if the limit passes within the next `ns` nanoseconds.
    #[inline]
    pub fn will_expire(&self, ns: u64) -> bool {
        match *self {
            TimeLimit::Unbounded => false,
            TimeLimit::At(deadline) => clock::now_ns().saturating_add(ns) >= deadline,
        }
    }

    /// Remaining budget, `None` when unbounded.
    pub fn remaining_ns(&self) -> Option<u64> {
        match *self {
            TimeLimit::Unbounded => None,
            TimeLimit::At(deadline) => Some(deadline.saturating_sub(clock::now_ns())),
        }
    }
}

impl fmt::Debug for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remaining_ns() {
            None => f.write_str("TimeLimit(unbounded)"),
            Some(ns) => write!(f, "TimeLimit({}ns left)", ns),
        }
    }
}
