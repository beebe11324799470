// Queued active messages and the buffers they carry

use crate::AM::Handler::Registry::HandlerId;
use std::collections::VecDeque;

pub type NodeId = u32;

/// Invoked once after a message's handler has run.
pub type CompletionFn = Box<dyn FnOnce() + Send>;

/// A header or payload as handed to `submit`, tagged with its ownership.
pub enum IncomingBuffer<'a> {
    /// Lives for the whole process; never copied, never freed.
    Borrowed(&'static [u8]),
    /// Caller keeps ownership. Duplicated only if the message is queued.
    Copy(&'a [u8]),
    /// Ownership moves to the engine; released after dispatch.
    Transfer(Vec<u8>),
}

impl<'a> IncomingBuffer<'a> {
    pub fn empty() -> Self {
        IncomingBuffer::Borrowed(&[])
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            IncomingBuffer::Borrowed(b) => b,
            IncomingBuffer::Copy(b) => b,
            IncomingBuffer::Transfer(v) => v,
        }
    }

    /// Convert to queue-owned storage, copying `Copy` buffers.
    pub fn into_owned(self) -> MessageBuffer {
        match self {
            IncomingBuffer::Borrowed(b) => MessageBuffer::Static(b),
            IncomingBuffer::Copy(b) => MessageBuffer::Owned(b.to_vec()),
            IncomingBuffer::Transfer(v) => MessageBuffer::Owned(v),
        }
    }
}

impl From<Vec<u8>> for IncomingBuffer<'_> {
    fn from(v: Vec<u8>) -> Self {
        IncomingBuffer::Transfer(v)
    }
}

impl From<&'static str> for IncomingBuffer<'_> {
    fn from(s: &'static str) -> Self {
        IncomingBuffer::Borrowed(s.as_bytes())
    }
}

/// Storage for a queued buffer. Owned storage is released when the message
/// is dropped, on every path (dispatch, deferral, shutdown).
pub enum MessageBuffer {
    Static(&'static [u8]),
    Owned(Vec<u8>),
}

impl MessageBuffer {
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            MessageBuffer::Static(b) => b,
            MessageBuffer::Owned(v) => v,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, MessageBuffer::Owned(_))
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Which execution path is running a handler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// On the receiving (network-polling) thread inside `submit`.
    Inline,
    /// Inside a background-work slice.
    Background,
    /// On a dedicated handler thread.
    Dedicated,
}

/// Passed to every handler invocation. Its existence is the proof that the
/// code is running inside a handler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HandlerContext {
    pub sender: NodeId,
    pub handler: HandlerId,
    pub mode: DispatchMode,
}

impl HandlerContext {
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.mode == DispatchMode::Inline
    }
}

/// One received active message awaiting dispatch.
pub struct Message {
    pub sender: NodeId,
    pub handler: HandlerId,
    pub header: MessageBuffer,
    pub payload: MessageBuffer,
    pub completion: Option<CompletionFn>,
    /// Times this message was passed over for lack of budget.
    pub deferrals: u32,
}

impl Message {
    pub fn new(
        sender: NodeId,
        handler: HandlerId,
        header: IncomingBuffer<'_>,
        payload: IncomingBuffer<'_>,
        completion: Option<CompletionFn>,
    ) -> Self {
        Self {
            sender,
            handler,
            header: header.into_owned(),
            payload: payload.into_owned(),
            completion,
            deferrals: 0,
        }
    }

    pub(crate) fn complete(&mut self) {
        if let Some(cb) = self.completion.take() {
            cb();
        }
    }
}

/// A sender's pending messages in arrival order.
pub type MessageList = VecDeque<Message>;
