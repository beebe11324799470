use super::Backend::background::BackgroundWorkManager;
use super::Handler::Registry::{HandlerEntry, HandlerRegistry};
use super::Queue::IncomingMessageManager;
use super::Structs::Message::{Message, MessageBuffer};
use crate::Debug::StructDebug;
use std::fmt;

// Debug proxy implementations that call the standalone debug functions
impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_handler_entry(self, f)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_handler_registry(self, f)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_message(self, f)
    }
}

impl fmt::Debug for MessageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_message_buffer(self, f)
    }
}

impl fmt::Debug for IncomingMessageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_message_manager(self, f)
    }
}

impl fmt::Debug for BackgroundWorkManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StructDebug::debug_bgwork_manager(self, f)
    }
}
