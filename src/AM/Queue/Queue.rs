// Per-sender incoming message queues, shared by every drain path
//
// All mutable queue state sits behind one parking_lot mutex. Two condition
// variables hang off it: `work_cv` (new pending sender or shutdown) for
// blocked dedicated threads, and `drain_cv` (queue became idle) for
// `drain_all_and_wait`.

use super::todo::TodoList;
use crate::AM::Backend::background::{ActivationHook, WorkItemHandle};
use crate::AM::Handler::Registry::HandlerRegistry;
use crate::AM::Structs::Message::MessageList;
use crate::Core::DispatchConfig;
use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Queue state for one remote node.
#[derive(Default)]
pub struct SenderQueue {
    /// Pending messages in arrival order.
    pub(crate) messages: MessageList,
    /// Some thread currently owns this sender's detached list.
    pub(crate) in_drain: bool,
}

/// Everything guarded by the queue mutex.
///
/// Invariant: a sender is in `todo` iff its `messages` is non-empty and it
/// is not `in_drain`.
pub(crate) struct QueueState {
    pub(crate) senders: Vec<SenderQueue>,
    pub(crate) todo: TodoList,
    /// Threads blocked in `claim_next(true)`.
    pub(crate) sleepers: usize,
    /// Callers blocked in `drain_all_and_wait`.
    pub(crate) drain_waiters: usize,
    /// Senders currently `in_drain`.
    pub(crate) active_drains: usize,
    pub(crate) shutdown: bool,
    pub(crate) activation: Option<Arc<dyn ActivationHook>>,
    /// Our slot with a background scheduler, released at shutdown.
    pub(crate) background: Option<WorkItemHandle>,
}

/// Monotonic event counters for diagnostics and tests.
#[derive(Default)]
pub struct QueueCounters {
    pub submitted: CachePadded<AtomicU64>,
    pub handled_inline: CachePadded<AtomicU64>,
    /// Messages that were allocated and queued.
    pub queued: CachePadded<AtomicU64>,
    pub dispatched: CachePadded<AtomicU64>,
    pub deferred: CachePadded<AtomicU64>,
    /// Deferred messages run despite their cost estimate.
    pub forced: CachePadded<AtomicU64>,
}

impl QueueCounters {
    #[inline]
    pub(crate) fn bump(counter: &CachePadded<AtomicU64>) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &CachePadded<AtomicU64>) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// A consistent view of the queue taken under its lock.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub pending_senders: usize,
    pub active_drains: usize,
    pub queued_messages: usize,
    pub shutdown: bool,
}

impl QueueSnapshot {
    pub fn is_idle(&self) -> bool {
        self.pending_senders == 0 && self.active_drains == 0
    }
}

/// The incoming active-message queue and drain engine for one runtime
/// instance.
///
/// Messages from one sender are always handed to handlers in arrival order,
/// and at most one thread drains a given sender at a time. Draining happens
/// in background-work slices (`drain_slice`), on dedicated handler threads,
/// or both at once.
pub struct IncomingMessageManager {
    pub(crate) registry: Arc<HandlerRegistry>,
    pub(crate) config: DispatchConfig,
    pub(crate) nodes: usize,
    pub(crate) state: Mutex<QueueState>,
    pub(crate) work_cv: Condvar,
    pub(crate) drain_cv: Condvar,
    pub(crate) counters: QueueCounters,
    pub(crate) threads: Mutex<Vec<JoinHandle<()>>>,
    pub(crate) dedicated_threads: AtomicUsize,
}
