// Cooperative background-work backend
//
// Work sources register once with a BackgroundWorkManager and call
// `make_active` on their handle whenever they have something to do. Worker
// threads hand each active source one time-limited slice at a time.
// Activations are coalesced: a source is queued at most once, and its flag is
// cleared before its slice starts so activations raised during the slice
// queue another one.

use crate::AM::Queue::IncomingMessageManager;
use crate::error::DispatchError;
use crate::Core::{CoreReservation, TimeLimit};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

pub const DEFAULT_TIMESLICE_NS: u64 = 100_000;

/// A schedulable unit of bounded work.
pub trait BackgroundWork: Send + Sync {
    fn name(&self) -> &str;

    /// Do some work and return by `work_until`. Must not block.
    fn do_work(&self, work_until: TimeLimit);
}

/// Requests CPU time from a cooperative scheduler.
///
/// Implementations must only record the request: the queue calls this with
/// its lock held.
pub trait ActivationHook: Send + Sync {
    fn make_active(&self);
}

#[derive(Clone, Debug)]
pub struct BgWorkConfig {
    /// Worker threads. With 0, slices only run through `run_one`/`run_pending`.
    pub workers: usize,
    pub timeslice_ns: u64,
    pub worker_cpus: Vec<usize>,
}

impl Default for BgWorkConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            timeslice_ns: DEFAULT_TIMESLICE_NS,
            worker_cpus: Vec::new(),
        }
    }
}

impl BgWorkConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeslice_ns(mut self, ns: u64) -> Self {
        self.timeslice_ns = ns;
        self
    }

    pub fn with_worker_cpus(mut self, cpus: Vec<usize>) -> Self {
        self.worker_cpus = cpus;
        self
    }
}

/// One registration slot. `generation` changes on every unregister so a
/// stale handle cannot reach the slot's next occupant.
#[derive(Default)]
struct Slot {
    item: Option<Arc<dyn BackgroundWork>>,
    generation: u64,
    active: bool,
}

struct BgState {
    slots: Vec<Slot>,
    ready: VecDeque<usize>,
    shutdown: bool,
    slices: u64,
}

impl BgState {
    fn slot_mut(&mut self, index: usize, generation: u64) -> Option<&mut Slot> {
        self.slots
            .get_mut(index)
            .filter(|slot| slot.generation == generation && slot.item.is_some())
    }
}

pub(crate) struct BgShared {
    state: Mutex<BgState>,
    cv: Condvar,
    timeslice_ns: u64,
}

impl BgShared {
    fn activate(&self, index: usize, generation: u64) {
        let mut st = self.state.lock();
        if st.shutdown {
            return;
        }
        match st.slot_mut(index, generation) {
            Some(slot) if !slot.active => slot.active = true,
            _ => return,
        }
        st.ready.push_back(index);
        self.cv.notify_one();
    }

    /// Free the slot if `generation` still owns it. Pending activations are
    /// discarded.
    fn unregister(&self, index: usize, generation: u64) -> bool {
        let mut st = self.state.lock();
        let Some(slot) = st.slot_mut(index, generation) else {
            return false;
        };
        let name = slot.item.take().map(|item| item.name().to_owned());
        slot.active = false;
        slot.generation += 1;
        st.ready.retain(|&i| i != index);
        tracing::debug!(name = ?name, index, "unregistered background work item");
        true
    }

    /// Pop the next ready item, clearing its flag.
    fn take_ready(st: &mut BgState) -> Option<Arc<dyn BackgroundWork>> {
        while let Some(index) = st.ready.pop_front() {
            let slot = &mut st.slots[index];
            slot.active = false;
            if let Some(item) = slot.item.clone() {
                st.slices += 1;
                return Some(item);
            }
        }
        None
    }

    fn worker_loop(&self) {
        let mut st = self.state.lock();
        loop {
            if st.shutdown {
                break;
            }
            let next = Self::take_ready(&mut st);
            match next {
                Some(item) => {
                    drop(st);
                    item.do_work(TimeLimit::relative(self.timeslice_ns));
                    st = self.state.lock();
                }
                None => self.cv.wait(&mut st),
            }
        }
    }
}

/// Handle returned by `register`; requests slices for one work item.
#[derive(Clone)]
pub struct WorkItemHandle {
    shared: Arc<BgShared>,
    index: usize,
    generation: u64,
}

impl WorkItemHandle {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Stop scheduling this item and free its slot. Returns false if it was
    /// already unregistered or the manager has shut down.
    pub fn unregister(&self) -> bool {
        self.shared.unregister(self.index, self.generation)
    }
}

impl ActivationHook for WorkItemHandle {
    fn make_active(&self) {
        self.shared.activate(self.index, self.generation);
    }
}

/// A shared, time-sliced scheduler for background work items.
pub struct BackgroundWorkManager {
    pub(crate) shared: Arc<BgShared>,
    pub(crate) workers: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundWorkManager {
    pub fn new(config: BgWorkConfig) -> Result<Self, DispatchError> {
        let shared = Arc::new(BgShared {
            state: Mutex::new(BgState {
                slots: Vec::new(),
                ready: VecDeque::new(),
                shutdown: false,
                slices: 0,
            }),
            cv: Condvar::new(),
            timeslice_ns: config.timeslice_ns,
        });

        let manager = Self {
            shared,
            workers: Mutex::new(Vec::with_capacity(config.workers)),
        };

        let reservation = CoreReservation::new("bgwork").with_cpus(config.worker_cpus.iter().copied());
        for i in 0..config.workers {
            let shared = Arc::clone(&manager.shared);
            let handle = reservation
                .spawn(i, move || shared.worker_loop())
                .map_err(|source| DispatchError::Spawn {
                    name: format!("bgwork-{}", i),
                    source,
                })?;
            manager.workers.lock().push(handle);
        }
        tracing::debug!(workers = config.workers, timeslice_ns = config.timeslice_ns, "background work manager started");
        Ok(manager)
    }

    /// Add a work item, reusing a freed slot when there is one.
    pub fn register(&self, item: Arc<dyn BackgroundWork>) -> WorkItemHandle {
        let mut st = self.shared.state.lock();
        let index = match st.slots.iter().position(|slot| slot.item.is_none()) {
            Some(free) => free,
            None => {
                st.slots.push(Slot::default());
                st.slots.len() - 1
            }
        };
        tracing::debug!(name = item.name(), index, "registered background work item");
        let slot = &mut st.slots[index];
        slot.item = Some(item);
        slot.active = false;
        WorkItemHandle {
            shared: Arc::clone(&self.shared),
            index,
            generation: slot.generation,
        }
    }

    /// Stop scheduling `handle`'s item. Pending activations are discarded.
    pub fn unregister(&self, handle: &WorkItemHandle) -> bool {
        handle.unregister()
    }

    /// Items currently registered.
    pub fn registered(&self) -> usize {
        self.shared.state.lock().slots.iter().filter(|slot| slot.item.is_some()).count()
    }

    /// Slots ever allocated, free or not.
    pub fn slot_capacity(&self) -> usize {
        self.shared.state.lock().slots.len()
    }

    /// Run a single ready slice on the calling thread. Returns false if
    /// nothing was ready.
    pub fn run_one(&self) -> bool {
        let item = {
            let mut st = self.shared.state.lock();
            if st.shutdown {
                return false;
            }
            BgShared::take_ready(&mut st)
        };
        match item {
            Some(item) => {
                item.do_work(TimeLimit::relative(self.shared.timeslice_ns));
                true
            }
            None => false,
        }
    }

    /// Run slices on the calling thread until nothing is ready.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }

    /// Whether any item is waiting for a slice.
    pub fn has_ready(&self) -> bool {
        !self.shared.state.lock().ready.is_empty()
    }

    /// Total slices started since creation.
    pub fn slices_run(&self) -> u64 {
        self.shared.state.lock().slices
    }

    pub fn timeslice_ns(&self) -> u64 {
        self.shared.timeslice_ns
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Stop the workers and drop all registered items. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut st = self.shared.state.lock();
            st.shutdown = true;
            st.ready.clear();
            for slot in st.slots.iter_mut() {
                slot.item = None;
                slot.active = false;
            }
            self.shared.cv.notify_all();
        }
        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("background worker panicked");
            }
        }
    }
}

impl Drop for BackgroundWorkManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Adapts a message manager into a background work item. Holds it weakly so
/// the scheduler never keeps a manager alive.
pub(crate) struct DrainWork {
    manager: Weak<IncomingMessageManager>,
}

impl BackgroundWork for DrainWork {
    fn name(&self) -> &str {
        "incoming message manager"
    }

    fn do_work(&self, work_until: TimeLimit) {
        if let Some(manager) = self.manager.upgrade() {
            manager.drain_slice(work_until);
        }
    }
}

impl IncomingMessageManager {
    /// Register this queue as a work source with `bgwork`. The registration
    /// is released by `shutdown` or when the manager is dropped.
    pub fn add_to_manager(self: &Arc<Self>, bgwork: &BackgroundWorkManager) -> Result<WorkItemHandle, DispatchError> {
        if self.has_activation_hook() {
            return Err(DispatchError::AlreadyRegistered);
        }
        let handle = bgwork.register(Arc::new(DrainWork {
            manager: Arc::downgrade(self),
        }));
        if let Err(err) = self.attach_background(handle.clone()) {
            handle.unregister();
            return Err(err);
        }
        Ok(handle)
    }
}
