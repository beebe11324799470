use crate::AM::Backend::background::BackgroundWorkManager;
use crate::AM::Handler::Registry::{HandlerEntry, HandlerRegistry};
use crate::AM::Queue::IncomingMessageManager;
use crate::AM::Structs::Message::{Message, MessageBuffer};
use std::fmt;

/// Debug function for HandlerEntry
///
/// Callbacks are shown only as which forms are present.
pub fn debug_handler_entry(entry: &HandlerEntry, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HandlerEntry")
        .field("id", &entry.id())
        .field("hash", &format_args!("{:#018x}", entry.hash()))
        .field("name", &entry.name())
        .field("time_limited", &entry.is_time_limited())
        .field("inline", &entry.has_inline())
        .field("stats", &entry.stats().snapshot())
        .field("inline_stats", &entry.inline_stats().snapshot())
        .finish()
}

pub fn debug_handler_registry(registry: &HandlerRegistry, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list()
        .entries(registry.iter().map(|e| (e.id(), e.name())))
        .finish()
}

/// Debug function for Message
///
/// Buffers are summarized by length and ownership, never dumped.
pub fn debug_message(msg: &Message, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Message")
        .field("sender", &msg.sender)
        .field("handler", &msg.handler)
        .field("header", &msg.header)
        .field("payload", &msg.payload)
        .field("completion", &msg.completion.is_some())
        .field("deferrals", &msg.deferrals)
        .finish()
}

pub fn debug_message_buffer(buf: &MessageBuffer, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let kind = if buf.is_owned() { "owned" } else { "static" };
    write!(f, "{}[{}B]", kind, buf.len())
}

/// Debug function for IncomingMessageManager
///
/// Takes the queue lock briefly to snapshot its state.
pub fn debug_message_manager(manager: &IncomingMessageManager, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IncomingMessageManager")
        .field("nodes", &manager.nodes())
        .field("handlers", &manager.registry().len())
        .field("state", &manager.snapshot())
        .field("dedicated_threads", &manager.dedicated_thread_count())
        .field("background", &manager.has_activation_hook())
        .finish_non_exhaustive()
}

pub fn debug_bgwork_manager(manager: &BackgroundWorkManager, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BackgroundWorkManager")
        .field("workers", &manager.worker_count())
        .field("registered", &manager.registered())
        .field("timeslice_ns", &manager.timeslice_ns())
        .field("slices_run", &manager.slices_run())
        .finish()
}
