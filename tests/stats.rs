use am_dispatch::AM::Handler::HandlerStats;
use std::sync::Arc;
use std::thread;

#[test]
fn empty_stats() {
    let stats = HandlerStats::new();
    assert_eq!(stats.count(), 0);
    assert_eq!(stats.average_ns(), None);
    assert_eq!(stats.snapshot().count, 0);
}

#[test]
fn summary_values() {
    let stats = HandlerStats::new();
    for d in [10, 20, 30] {
        stats.record(d);
    }

    let s = stats.snapshot();
    assert_eq!(s.count, 3);
    assert_eq!(s.min_ns, 10);
    assert_eq!(s.max_ns, 30);
    assert!((s.avg_ns - 20.0).abs() < 1e-9);
    // population stddev of 10, 20, 30
    assert!((s.stddev_ns - (200.0f64 / 3.0).sqrt()).abs() < 1e-6);
    assert_eq!(stats.average_ns(), Some(20));
}

#[test]
fn large_durations_do_not_overflow() {
    let stats = HandlerStats::new();
    let ten_seconds = 10_000_000_000u64;
    for _ in 0..1000 {
        stats.record(ten_seconds);
    }
    let s = stats.snapshot();
    assert_eq!(s.count, 1000);
    assert!((s.avg_ns - ten_seconds as f64).abs() < 1.0);
    // squared sums lose precision at this scale; stay well under the mean
    assert!(s.stddev_ns < s.avg_ns * 1e-3);
}

#[test]
fn concurrent_updates_are_not_lost() {
    let stats = Arc::new(HandlerStats::new());
    let threads = 8;
    let per_thread = 1000u64;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let stats = Arc::clone(&stats);
            thread::spawn(move || {
                for i in 0..per_thread {
                    stats.record(t as u64 * per_thread + i + 1);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let s = stats.snapshot();
    let n = threads as u64 * per_thread;
    assert_eq!(s.count, n);
    assert_eq!(s.min_ns, 1);
    assert_eq!(s.max_ns, n);
    assert!((s.avg_ns - (n + 1) as f64 / 2.0).abs() < 1e-6);
}

#[test]
fn reset_clears_everything() {
    let stats = HandlerStats::new();
    stats.record(5);
    stats.reset();
    assert_eq!(stats.count(), 0);
    stats.record(7);
    let s = stats.snapshot();
    assert_eq!((s.min_ns, s.max_ns), (7, 7));
}
