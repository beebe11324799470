use am_dispatch::Core::config::{DEFAULT_INLINE_THRESHOLD_NS, DEFAULT_MAX_DEFERRALS};
use am_dispatch::Core::DispatchConfig;
use am_dispatch::DispatchError;
use serial_test::serial;
use std::env;

const VARS: &[&str] = &[
    "AM_DISPATCH_PROFILE",
    "AM_DISPATCH_INLINE_NS",
    "AM_DISPATCH_MAX_DEFERRALS",
    "AM_DISPATCH_ORDERED",
    "AM_DISPATCH_THREADS",
    "AM_DISPATCH_STACK",
    "AM_DISPATCH_CPUS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_without_environment() {
    clear_env();
    let cfg = DispatchConfig::from_env().unwrap();
    assert!(!cfg.profile_handlers);
    assert_eq!(cfg.inline_threshold_ns, DEFAULT_INLINE_THRESHOLD_NS);
    assert_eq!(cfg.inline_threshold_ns, 5_000);
    assert_eq!(cfg.max_deferrals, DEFAULT_MAX_DEFERRALS);
    assert!(cfg.preserve_sender_order);
    assert_eq!(cfg.handler_threads, 0);
    assert!(cfg.handler_thread_cpus.is_empty());
    assert_eq!(cfg.handler_stack_size, None);
}

#[test]
#[serial]
fn environment_overrides() {
    clear_env();
    env::set_var("AM_DISPATCH_PROFILE", "yes");
    env::set_var("AM_DISPATCH_INLINE_NS", "12000");
    env::set_var("AM_DISPATCH_MAX_DEFERRALS", "0");
    env::set_var("AM_DISPATCH_ORDERED", "false");
    env::set_var("AM_DISPATCH_THREADS", "3");
    env::set_var("AM_DISPATCH_STACK", "1048576");
    env::set_var("AM_DISPATCH_CPUS", "0, 2,5");

    let cfg = DispatchConfig::from_env().unwrap();
    clear_env();

    assert!(cfg.profile_handlers);
    assert_eq!(cfg.inline_threshold_ns, 12_000);
    assert_eq!(cfg.max_deferrals, 0);
    assert!(!cfg.preserve_sender_order);
    assert_eq!(cfg.handler_threads, 3);
    assert_eq!(cfg.handler_stack_size, Some(1 << 20));
    assert_eq!(cfg.handler_thread_cpus, vec![0, 2, 5]);
}

#[test]
#[serial]
fn malformed_values_are_reported() {
    clear_env();
    env::set_var("AM_DISPATCH_INLINE_NS", "soon");
    let err = DispatchConfig::from_env().unwrap_err();
    clear_env();
    assert!(matches!(err, DispatchError::InvalidConfig { key: "AM_DISPATCH_INLINE_NS", .. }));
    assert!(err.to_string().contains("soon"));

    env::set_var("AM_DISPATCH_CPUS", "1,x");
    let err = DispatchConfig::from_env().unwrap_err();
    clear_env();
    assert!(matches!(err, DispatchError::InvalidConfig { key: "AM_DISPATCH_CPUS", .. }));
}

#[test]
fn builder_setters() {
    let cfg = DispatchConfig::new()
        .with_profiling(true)
        .with_inline_threshold_ns(1)
        .with_max_deferrals(2)
        .with_sender_order(false)
        .with_handler_threads(4);
    assert!(cfg.profile_handlers);
    assert_eq!(cfg.inline_threshold_ns, 1);
    assert_eq!(cfg.max_deferrals, 2);
    assert!(!cfg.preserve_sender_order);
    assert_eq!(cfg.handler_threads, 4);
}
