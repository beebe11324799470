use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::todo::TodoList;
use super::Queue::{IncomingMessageManager, QueueCounters, QueueSnapshot, QueueState, SenderQueue};
use crate::AM::Backend::background::{ActivationHook, WorkItemHandle};
use crate::AM::Handler::Registry::{HandlerId, HandlerRegistry};
use crate::AM::Structs::Message::{
    CompletionFn, DispatchMode, HandlerContext, IncomingBuffer, Message, MessageList, NodeId,
};
use crate::Core::{clock, DispatchConfig, TimeLimit};
use crate::error::DispatchError;
use parking_lot::Mutex;

impl IncomingMessageManager {
    /// Create a queue for messages from `nodes` remote senders (ids `0..nodes`).
    pub fn new(registry: Arc<HandlerRegistry>, nodes: usize, config: DispatchConfig) -> Self {
        let senders = (0..nodes).map(|_| SenderQueue::default()).collect();
        Self {
            registry,
            config,
            nodes,
            state: Mutex::new(QueueState {
                senders,
                todo: TodoList::new(nodes),
                sleepers: 0,
                drain_waiters: 0,
                active_drains: 0,
                shutdown: false,
                activation: None,
                background: None,
            }),
            work_cv: Default::default(),
            drain_cv: Default::default(),
            counters: QueueCounters::default(),
            threads: Mutex::new(Vec::new()),
            dedicated_threads: Default::default(),
        }
    }

    /// Accept a message from the network layer.
    ///
    /// Tries the handler's inline form first when `deadline` leaves at least
    /// the configured inline threshold; returns true if the message was
    /// handled that way. Otherwise the message is queued for its sender and
    /// false is returned.
    ///
    /// # Panics
    /// If `sender` or `handler` is out of range.
    pub fn submit(
        &self,
        sender: NodeId,
        handler: HandlerId,
        header: IncomingBuffer<'_>,
        payload: IncomingBuffer<'_>,
        completion: Option<CompletionFn>,
        deadline: TimeLimit,
    ) -> bool {
        assert!(
            (sender as usize) < self.nodes,
            "sender {} out of range ({} nodes)",
            sender,
            self.nodes
        );
        let entry = self.registry.lookup(handler);
        QueueCounters::bump(&self.counters.submitted);

        if let Some(inline) = &entry.inline {
            if !deadline.will_expire(self.config.inline_threshold_ns) {
                let ctx = HandlerContext {
                    sender,
                    handler,
                    mode: DispatchMode::Inline,
                };
                let start = clock::now_ns();
                if inline(&ctx, header.as_slice(), payload.as_slice(), deadline) {
                    entry.inline_stats.record(clock::elapsed_since(start));
                    if let Some(cb) = completion {
                        cb();
                    }
                    QueueCounters::bump(&self.counters.handled_inline);
                    return true;
                }
            }
        }

        // copies happen here, outside the lock
        let msg = Message::new(sender, handler, header, payload, completion);
        self.enqueue(msg);
        false
    }

    pub(crate) fn enqueue(&self, msg: Message) {
        let sender = msg.sender;
        let mut guard = self.state.lock();
        let st = &mut *guard;
        let queue = &mut st.senders[sender as usize];
        let was_idle = queue.messages.is_empty() && !queue.in_drain;
        queue.messages.push_back(msg);
        QueueCounters::bump(&self.counters.queued);
        if was_idle {
            self.schedule_sender(st, sender);
        }
    }

    /// Put `sender` on the todo list, wake a sleeper, and request a
    /// background slice if the list was empty.
    fn schedule_sender(&self, st: &mut QueueState, sender: NodeId) {
        let first = st.todo.is_empty();
        st.todo.push(sender);
        if st.sleepers > 0 {
            self.work_cv.notify_one();
        }
        if first {
            Self::activate(st);
        }
    }

    // The hook only flags the work item; it never runs a slice synchronously,
    // so calling it with the queue lock held is fine.
    fn activate(st: &QueueState) {
        if let Some(hook) = &st.activation {
            hook.make_active();
        }
    }

    /// Detach the oldest pending sender's whole message list.
    ///
    /// With `wait`, blocks until work appears; returns `None` once shutdown
    /// has been requested. Without `wait`, returns `None` if nothing is
    /// pending. The caller owns the sender until it calls [`release`].
    ///
    /// [`release`]: IncomingMessageManager::release
    pub fn claim_next(&self, wait: bool) -> Option<(NodeId, MessageList)> {
        let mut guard = self.state.lock();
        let sender = loop {
            if guard.shutdown {
                return None;
            }
            if let Some(sender) = guard.todo.pop() {
                break sender;
            }
            if !wait {
                return None;
            }
            guard.sleepers += 1;
            self.work_cv.wait(&mut guard);
            guard.sleepers -= 1;
        };

        let st = &mut *guard;
        let queue = &mut st.senders[sender as usize];
        debug_assert!(!queue.in_drain, "sender {} claimed twice", sender);
        debug_assert!(!queue.messages.is_empty(), "sender {} queued without messages", sender);
        queue.in_drain = true;
        let list = std::mem::take(&mut queue.messages);
        st.active_drains += 1;

        // more senders waiting: let another worker pick them up in parallel
        if !st.todo.is_empty() {
            Self::activate(st);
        }
        Some((sender, list))
    }

    /// Return a claimed sender, handing back whatever was not dispatched.
    ///
    /// `remaining` goes in front of anything that arrived while the sender was
    /// being drained, so arrival order is preserved.
    pub fn release(&self, sender: NodeId, mut remaining: MessageList) {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        let has_work = {
            let queue = &mut st.senders[sender as usize];
            assert!(queue.in_drain, "release of sender {} that was not claimed", sender);
            queue.in_drain = false;
            if !remaining.is_empty() {
                remaining.append(&mut queue.messages);
                queue.messages = remaining;
            }
            !queue.messages.is_empty()
        };
        st.active_drains -= 1;

        if has_work {
            self.schedule_sender(st, sender);
        }
        if st.drain_waiters > 0 && st.todo.is_empty() && st.active_drains == 0 {
            self.drain_cv.notify_all();
        }
    }

    /// Block until no sender is pending and none is being drained.
    ///
    /// Returns early if the manager is shut down, since nothing would drain
    /// the remainder.
    pub fn drain_all_and_wait(&self) {
        let mut st = self.state.lock();
        st.drain_waiters += 1;
        while !st.shutdown && !(st.todo.is_empty() && st.active_drains == 0) {
            self.drain_cv.wait(&mut st);
        }
        st.drain_waiters -= 1;
    }

    /// Stop all dispatch and join the dedicated threads. Idempotent.
    ///
    /// Messages still queued are dropped, releasing their buffers, without
    /// running their handlers.
    pub fn shutdown(&self) {
        {
            let mut st = self.state.lock();
            if !st.shutdown {
                tracing::debug!(
                    pending = st.todo.len(),
                    active = st.active_drains,
                    "shutting down incoming message manager"
                );
            }
            st.shutdown = true;
            self.work_cv.notify_all();
            self.drain_cv.notify_all();
        }

        let background = self.state.lock().background.take();
        if let Some(handle) = background {
            handle.unregister();
        }

        let handles = std::mem::take(&mut *self.threads.lock());
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("handler thread panicked");
            }
        }
        self.dedicated_threads.store(0, Ordering::Release);
    }

    /// Register the hook used to request background slices. Only one hook
    /// may ever be attached.
    pub fn attach_activation_hook(&self, hook: Arc<dyn ActivationHook>) -> Result<(), DispatchError> {
        let mut st = self.state.lock();
        Self::install_hook(&mut st, hook)
    }

    /// Attach a background scheduler slot; it is unregistered at shutdown.
    pub(crate) fn attach_background(&self, handle: WorkItemHandle) -> Result<(), DispatchError> {
        let mut st = self.state.lock();
        if st.shutdown {
            return Err(DispatchError::ShutDown);
        }
        Self::install_hook(&mut st, Arc::new(handle.clone()))?;
        st.background = Some(handle);
        Ok(())
    }

    fn install_hook(st: &mut QueueState, hook: Arc<dyn ActivationHook>) -> Result<(), DispatchError> {
        if st.activation.is_some() {
            return Err(DispatchError::AlreadyRegistered);
        }
        // work that arrived before the hook existed still needs a slice
        if !st.todo.is_empty() {
            hook.make_active();
        }
        st.activation = Some(hook);
        Ok(())
    }

    pub fn has_activation_hook(&self) -> bool {
        self.state.lock().activation.is_some()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let st = self.state.lock();
        QueueSnapshot {
            pending_senders: st.todo.len(),
            active_drains: st.active_drains,
            queued_messages: st.senders.iter().map(|q| q.messages.len()).sum(),
            shutdown: st.shutdown,
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shutdown
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn counters(&self) -> &QueueCounters {
        &self.counters
    }

    pub fn dedicated_thread_count(&self) -> usize {
        self.dedicated_threads.load(Ordering::Acquire)
    }
}

impl Drop for IncomingMessageManager {
    fn drop(&mut self) {
        let st = self.state.get_mut();
        if let Some(handle) = st.background.take() {
            handle.unregister();
        }
        let dropped: usize = st.senders.iter().map(|q| q.messages.len()).sum();
        if dropped > 0 {
            tracing::debug!(dropped, "discarding undelivered messages");
        }
    }
}
