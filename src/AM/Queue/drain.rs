// Drain engine: runs a claimed sender's messages under a time budget

use super::Queue::{IncomingMessageManager, QueueCounters};
use crate::AM::Handler::Registry::HandlerEntry;
use crate::AM::Structs::Message::{DispatchMode, HandlerContext, Message, MessageList};
use crate::Core::{clock, TimeLimit};

/// Assumed cost of a handler that has not built up enough samples yet.
pub const DEFAULT_COST_ESTIMATE_NS: u64 = 20_000;

/// Samples needed before a handler's average is trusted above the default.
pub const MIN_COST_SAMPLES: u64 = 8;

impl IncomingMessageManager {
    /// One bounded unit of work for the cooperative backend. Never blocks.
    ///
    /// Claims the oldest pending sender and dispatches its messages until the
    /// list is exhausted or `deadline` passes. Handlers with a time-limited
    /// form are handed the remaining budget; others are admitted only if
    /// their estimated cost fits. Whatever is left goes back to the queue.
    pub fn drain_slice(&self, deadline: TimeLimit) {
        let Some((sender, mut list)) = self.claim_next(false) else {
            // a dedicated thread got there first
            debug_assert!(
                self.dedicated_thread_count() > 0 || self.is_shut_down(),
                "background slice found no work and no dedicated thread is running"
            );
            return;
        };

        let mut deferred = MessageList::new();
        while let Some(mut msg) = list.pop_front() {
            let entry = self.registry.lookup(msg.handler);

            let admitted = if entry.is_time_limited() {
                true
            } else if deadline.will_expire(self.estimate_cost(entry)) {
                let force = self.config.max_deferrals > 0
                    && msg.deferrals >= self.config.max_deferrals
                    && !deadline.is_expired();
                if force {
                    tracing::warn!(
                        sender,
                        handler = %entry.name(),
                        deferrals = msg.deferrals,
                        "running repeatedly deferred message over budget"
                    );
                    QueueCounters::bump(&self.counters.forced);
                }
                force
            } else {
                true
            };

            let outcome = if admitted {
                self.dispatch(entry, msg, DispatchMode::Background, deadline)
            } else {
                Err(msg)
            };

            if let Err(mut msg) = outcome {
                msg.deferrals += 1;
                QueueCounters::bump(&self.counters.deferred);
                tracing::trace!(sender, handler = %entry.name(), "deferred message");
                deferred.push_back(msg);
                if self.config.preserve_sender_order {
                    break;
                }
            }

            if deadline.is_expired() {
                break;
            }
        }

        deferred.append(&mut list);
        self.release(sender, deferred);
    }

    /// Run one message's handler, then its completion callback, then record
    /// timing. A time-limited handler that declines hands the message back.
    pub(crate) fn dispatch(
        &self,
        entry: &HandlerEntry,
        mut msg: Message,
        mode: DispatchMode,
        limit: TimeLimit,
    ) -> Result<(), Message> {
        let ctx = HandlerContext {
            sender: msg.sender,
            handler: msg.handler,
            mode,
        };

        let start = clock::now_ns();
        let profile = if let Some(timed) = &entry.timed {
            if !timed(&ctx, msg.header.as_slice(), msg.payload.as_slice(), limit) {
                return Err(msg);
            }
            self.config.profile_handlers
        } else if let Some(unlimited) = &entry.unlimited {
            unlimited(&ctx, msg.header.as_slice(), msg.payload.as_slice());
            // untimed handlers feed the cost estimate, so always measure them
            true
        } else {
            unreachable!("handler `{}` has no callback", entry.name())
        };
        let elapsed = clock::elapsed_since(start);

        msg.complete();
        if profile {
            entry.stats.record(elapsed);
        }
        QueueCounters::bump(&self.counters.dispatched);
        Ok(())
    }

    /// Expected run time of an untimed handler.
    ///
    /// The running average once `MIN_COST_SAMPLES` exist; before that the
    /// average capped at `DEFAULT_COST_ESTIMATE_NS`, or the default itself
    /// with no samples at all.
    ///
    /// Only queued runs are sampled; inline fast-path timings live in
    /// `inline_stats` and do not count here.
    pub fn estimate_cost(&self, entry: &HandlerEntry) -> u64 {
        let stats = entry.stats();
        match stats.average_ns() {
            None => DEFAULT_COST_ESTIMATE_NS,
            Some(avg) if stats.count() < MIN_COST_SAMPLES => avg.min(DEFAULT_COST_ESTIMATE_NS),
            Some(avg) => avg,
        }
    }

    /// Dispatch a whole claimed list with no time limit.
    ///
    /// # Panics
    /// If a time-limited handler declines an unbounded budget. Handing the
    /// message back would only have this thread claim it again.
    pub(crate) fn dispatch_unbounded(&self, list: MessageList, mode: DispatchMode) {
        for msg in list {
            let entry = self.registry.lookup(msg.handler);
            if self.dispatch(entry, msg, mode, TimeLimit::unbounded()).is_err() {
                panic!("handler `{}` declined an unbounded time limit", entry.name());
            }
        }
    }
}
