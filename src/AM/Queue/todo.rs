use crate::AM::Structs::Message::NodeId;

/// Circular FIFO of senders that have pending, undrained work.
///
/// Sized for `nodes + 1` entries: `oldest == newest` means empty, and since a
/// sender is never queued twice at most `nodes` entries are live, so the
/// buffer cannot wrap into a full-looks-empty state. Overflow means the
/// at-most-once-per-sender invariant was broken, which is fatal.
pub struct TodoList {
    slots: Box<[NodeId]>,
    oldest: usize,
    newest: usize,
}

impl TodoList {
    pub fn new(nodes: usize) -> Self {
        Self {
            slots: vec![0; nodes + 1].into_boxed_slice(),
            oldest: 0,
            newest: 0,
        }
    }

    /// Number of senders this list can hold.
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.oldest == self.newest
    }

    pub fn len(&self) -> usize {
        (self.newest + self.slots.len() - self.oldest) % self.slots.len()
    }

    /// # Panics
    /// If the list is already holding `capacity()` senders.
    pub fn push(&mut self, sender: NodeId) {
        self.slots[self.newest] = sender;
        self.newest = (self.newest + 1) % self.slots.len();
        assert!(
            self.newest != self.oldest,
            "todo list overflow: more than {} pending senders",
            self.capacity()
        );
    }

    pub fn pop(&mut self) -> Option<NodeId> {
        if self.is_empty() {
            return None;
        }
        let sender = self.slots[self.oldest];
        self.oldest = (self.oldest + 1) % self.slots.len();
        Some(sender)
    }

    pub fn contains(&self, sender: NodeId) -> bool {
        self.iter().any(|s| s == sender)
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        let len = self.slots.len();
        (0..self.len()).map(move |i| self.slots[(self.oldest + i) % len])
    }
}
