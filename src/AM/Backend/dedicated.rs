// Dedicated handler threads: standing threads that block on the queue

use crate::error::DispatchError;
use crate::AM::Queue::IncomingMessageManager;
use crate::AM::Structs::Message::{DispatchMode, MessageList};
use crate::Core::CoreReservation;
use std::sync::atomic::Ordering;
use std::sync::Arc;

impl IncomingMessageManager {
    /// Body of a dedicated handler thread.
    ///
    /// Blocks for the next pending sender and dispatches its whole list with
    /// no time limit. Returns once shutdown has been requested.
    ///
    /// # Panics
    /// If a time-limited handler declines the unbounded limit.
    pub fn dedicated_thread_loop(&self) {
        tracing::debug!("handler thread started");
        let mut lists = 0u64;
        while let Some((sender, list)) = self.claim_next(true) {
            self.dispatch_unbounded(list, DispatchMode::Dedicated);
            self.release(sender, MessageList::new());
            lists += 1;
        }
        tracing::debug!(lists, "handler thread exiting");
    }

    /// Start `count` dedicated handler threads on `reservation`.
    pub fn start_handler_threads(
        self: &Arc<Self>,
        reservation: &CoreReservation,
        count: usize,
    ) -> Result<(), DispatchError> {
        if self.is_shut_down() {
            return Err(DispatchError::ShutDown);
        }

        let mut threads = self.threads.lock();
        let base = threads.len();
        for i in base..base + count {
            let manager = Arc::clone(self);
            let handle = reservation
                .spawn(i, move || manager.dedicated_thread_loop())
                .map_err(|source| DispatchError::Spawn {
                    name: format!("{}-{}", reservation.name(), i),
                    source,
                })?;
            threads.push(handle);
            self.dedicated_threads.fetch_add(1, Ordering::AcqRel);
        }
        tracing::debug!(count, total = threads.len(), cpus = ?reservation.cpus(), "started handler threads");
        Ok(())
    }
}
