// Simulates a polling thread feeding active messages from several nodes into
// an IncomingMessageManager drained by background slices and handler threads.
//
//   cargo run --example dispatch_demo -- <num_messages> [--auto-exit]

use am_dispatch::AM::Backend::{BackgroundWorkManager, BgWorkConfig};
use am_dispatch::AM::Handler::{HandlerRegistration, RegistryBuilder};
use am_dispatch::AM::ManagerBuilder;
use am_dispatch::AM::Structs::IncomingBuffer;
use am_dispatch::Core::{DispatchConfig, TimeLimit};
use sha2::{Digest, Sha256};
use std::env;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const NODES: usize = 8;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <num_messages> [--auto-exit]", args[0]);
        std::process::exit(1);
    }
    let num_messages: usize = args[1].parse()?;
    let auto_exit = args.get(2).map(|s| s == "--auto-exit").unwrap_or(false);

    let hashed = Arc::new(AtomicU64::new(0));
    let counted = Arc::new(AtomicU64::new(0));

    let registry = {
        let hashed = Arc::clone(&hashed);
        let counted_queued = Arc::clone(&counted);
        let counted_inline = Arc::clone(&counted);
        RegistryBuilder::new()
            // untimed handler: cost is estimated from its running average
            .with(HandlerRegistration::new("hash_payload").unlimited(move |_ctx, _hdr, payload| {
                let digest = Sha256::digest(payload);
                if digest[0] != 0xff || digest[1] != 0xff {
                    hashed.fetch_add(1, Ordering::Relaxed);
                }
            }))
            // cheap enough to try inline on the polling thread
            .with(
                HandlerRegistration::new("count")
                    .time_limited(move |_ctx, _hdr, _payload, _limit| {
                        counted_queued.fetch_add(1, Ordering::Relaxed);
                        true
                    })
                    .inline(move |_ctx, _hdr, _payload, _limit| {
                        counted_inline.fetch_add(1, Ordering::Relaxed);
                        true
                    }),
            )
            .finalize(true)
    };
    let registry = Arc::new(registry);
    let hash_id = registry.find("hash_payload").ok_or("hash_payload not registered")?;
    let count_id = registry.find("count").ok_or("count not registered")?;

    let bgwork = BackgroundWorkManager::new(BgWorkConfig::default().with_workers(2))?;
    let config = DispatchConfig::from_env()?.with_profiling(true).with_handler_threads(1);
    let manager = ManagerBuilder::new(Arc::clone(&registry), NODES)
        .with_config(config)
        .with_background(&bgwork)
        .build()?;

    let running = Arc::new(AtomicBool::new(true));
    let running_for_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_for_handler.store(false, Ordering::SeqCst);
    })?;

    println!("Demo: submitting {} messages from {} nodes", num_messages, NODES);
    let start = std::time::Instant::now();
    let mut inline = 0usize;
    for i in 0..num_messages {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let sender = (i % NODES) as u32;
        let payload = format!("message_{}", i).into_bytes();
        let (handler, deadline) = if i % 4 == 0 {
            (count_id, TimeLimit::relative(50_000))
        } else {
            (hash_id, TimeLimit::expired())
        };
        if manager.submit(
            sender,
            handler,
            IncomingBuffer::empty(),
            IncomingBuffer::Transfer(payload),
            None,
            deadline,
        ) {
            inline += 1;
        }
    }

    manager.drain_all_and_wait();
    let elapsed = start.elapsed();
    println!(
        "Demo: dispatched {} hashed + {} counted ({} inline) in {:.2?}",
        hashed.load(Ordering::Relaxed),
        counted.load(Ordering::Relaxed),
        inline,
        elapsed
    );
    registry.report_timing(tracing::Level::INFO);
    println!("Demo: {:#?}", manager);

    if !auto_exit {
        println!("Press Ctrl+C to exit...");
        while running.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    manager.shutdown();
    bgwork.shutdown();
    println!("Demo: shut down");
    Ok(())
}
