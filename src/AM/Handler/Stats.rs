// Per-handler timing accumulator, updated lock-free by every dispatching thread

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::Relaxed;

/// Running duration statistics for one handler.
///
/// Each field is independently atomic. A reader may observe a count that
/// already includes a sample whose sum has not landed yet; the group is only
/// read for reporting and cost estimation, where that skew is harmless.
pub struct HandlerStats {
    count: AtomicU64,
    sum_ns: AtomicU64,
    /// f64 bit pattern; squared nanoseconds overflow a u64 quickly.
    sum2_bits: AtomicU64,
    min_ns: AtomicU64,
    max_ns: AtomicU64,
}

/// A best-effort copy of a handler's statistics.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StatsSnapshot {
    pub count: u64,
    pub avg_ns: f64,
    pub stddev_ns: f64,
    pub min_ns: u64,
    pub max_ns: u64,
}

impl Default for HandlerStats {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerStats {
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_ns: AtomicU64::new(0),
            sum2_bits: AtomicU64::new(0f64.to_bits()),
            min_ns: AtomicU64::new(u64::MAX),
            max_ns: AtomicU64::new(0),
        }
    }

    pub fn record(&self, duration_ns: u64) {
        self.count.fetch_add(1, Relaxed);
        self.sum_ns.fetch_add(duration_ns, Relaxed);
        let sq = (duration_ns as f64) * (duration_ns as f64);
        // fetch_update only fails if the closure returns None
        let _ = self
            .sum2_bits
            .fetch_update(Relaxed, Relaxed, |bits| Some((f64::from_bits(bits) + sq).to_bits()));
        self.min_ns.fetch_min(duration_ns, Relaxed);
        self.max_ns.fetch_max(duration_ns, Relaxed);
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Relaxed)
    }

    /// Mean duration, `None` before the first sample.
    pub fn average_ns(&self) -> Option<u64> {
        let count = self.count.load(Relaxed);
        if count == 0 {
            return None;
        }
        Some(self.sum_ns.load(Relaxed) / count)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let count = self.count.load(Relaxed);
        if count == 0 {
            return StatsSnapshot::default();
        }
        let sum = self.sum_ns.load(Relaxed) as f64;
        let sum2 = f64::from_bits(self.sum2_bits.load(Relaxed));
        let n = count as f64;
        let avg = sum / n;
        let var = (sum2 / n - avg * avg).max(0.0);
        StatsSnapshot {
            count,
            avg_ns: avg,
            stddev_ns: var.sqrt(),
            min_ns: self.min_ns.load(Relaxed),
            max_ns: self.max_ns.load(Relaxed),
        }
    }

    pub fn reset(&self) {
        self.count.store(0, Relaxed);
        self.sum_ns.store(0, Relaxed);
        self.sum2_bits.store(0f64.to_bits(), Relaxed);
        self.min_ns.store(u64::MAX, Relaxed);
        self.max_ns.store(0, Relaxed);
    }
}
