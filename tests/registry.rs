use am_dispatch::AM::Handler::Registry::stable_hash;
use am_dispatch::AM::Handler::{HandlerRegistration, RegistryBuilder};

fn noop(name: &'static str) -> HandlerRegistration {
    HandlerRegistration::new(name).unlimited(|_ctx, _hdr, _payload| {})
}

#[test]
fn ids_follow_hash_order_not_registration_order() {
    let a = RegistryBuilder::new()
        .with(noop("alpha"))
        .with(noop("beta"))
        .with(noop("gamma"))
        .finalize(false);
    let b = RegistryBuilder::new()
        .with(noop("gamma"))
        .with(noop("alpha"))
        .with(noop("beta"))
        .finalize(false);

    for name in ["alpha", "beta", "gamma"] {
        assert_eq!(a.find(name), b.find(name), "id for {} differs", name);
    }

    let hashes: Vec<u64> = a.iter().map(|e| e.hash()).collect();
    let mut sorted = hashes.clone();
    sorted.sort();
    assert_eq!(hashes, sorted);

    for (i, entry) in a.iter().enumerate() {
        assert_eq!(entry.id() as usize, i);
        assert_eq!(a.lookup(entry.id()).name(), entry.name());
    }
}

#[test]
fn explicit_hash_overrides_name_hash() {
    let registry = RegistryBuilder::new()
        .with(noop("a").with_hash(20))
        .with(noop("z").with_hash(10))
        .finalize(false);

    assert_eq!(registry.find("z"), Some(0));
    assert_eq!(registry.find("a"), Some(1));
    assert_eq!(registry.lookup(0).hash(), 10);
}

#[test]
fn stable_hash_is_sha256_prefix() {
    // SHA-256("abc") = ba7816bf8f01cfea414140de5dae2223...
    assert_eq!(stable_hash("abc"), 0xba78_16bf_8f01_cfea);
    assert_eq!(stable_hash("abc"), stable_hash("abc"));
    assert_ne!(stable_hash("abc"), stable_hash("abd"));
}

#[test]
fn entry_reports_callback_forms() {
    let mut builder = RegistryBuilder::new();
    builder
        .register(noop("plain"))
        .register(
            HandlerRegistration::new("timed")
                .time_limited(|_ctx, _hdr, _payload, _limit| true)
                .inline(|_ctx, _hdr, _payload, _limit| true),
        )
        .register(HandlerRegistration::new(format!("owned_{}", 7)).unlimited(|_ctx, _hdr, _payload| {}));
    assert_eq!(builder.len(), 3);
    let registry = builder.finalize(true);

    let plain = registry.lookup(registry.find("plain").unwrap());
    assert!(!plain.is_time_limited());
    assert!(!plain.has_inline());

    let timed = registry.lookup(registry.find("timed").unwrap());
    assert!(timed.is_time_limited());
    assert!(timed.has_inline());

    assert!(registry.find("owned_7").is_some());
    assert!(registry.find("missing").is_none());
    assert_eq!(registry.len(), 3);
}

#[test]
#[should_panic(expected = "out of range")]
fn lookup_out_of_range_panics() {
    let registry = RegistryBuilder::new().with(noop("only")).finalize(false);
    registry.lookup(1);
}

#[test]
#[should_panic(expected = "without a time-limited or unlimited callback")]
fn inline_only_handler_is_rejected() {
    RegistryBuilder::new()
        .with(HandlerRegistration::new("inline_only").inline(|_ctx, _hdr, _payload, _limit| true))
        .finalize(false);
}

#[test]
#[should_panic(expected = "share stable hash")]
fn duplicate_names_are_rejected() {
    RegistryBuilder::new()
        .with(noop("twice"))
        .with(noop("twice"))
        .finalize(false);
}
