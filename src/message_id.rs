use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

/// LDAP message IDs are positive INTEGERs; 0 is reserved for unsolicited
/// notifications and never issued.
pub type MessageId = i32;

/// Per-connection allocator of message IDs. An ID is unique among the
/// requests currently in flight on the connection; once released it may be
/// issued again. Constructed per connection, shut down when the connection
/// closes.
#[derive(Debug)]
pub struct MessageIdAllocator {
    state: Mutex<AllocatorState>,
}

#[derive(Debug)]
struct AllocatorState {
    next: MessageId,
    in_flight: HashSet<MessageId>,
    closed: bool,
}

impl Default for MessageIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageIdAllocator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AllocatorState {
                next: 1,
                in_flight: HashSet::new(),
                closed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, AllocatorState> {
        // The lock is only held for map updates; a poisoned lock means a
        // panic mid-update and the connection is unusable anyway.
        self.state.lock().expect("message ID allocator lock poisoned")
    }

    /// Get a fresh ID, or None once the allocator is shut down. The counter
    /// wraps at the top of the positive i32 range, skipping IDs still in
    /// flight; if every ID is outstanding this fails rather than spinning.
    pub fn allocate(&self) -> Option<MessageId> {
        let mut state = self.state();
        if state.closed {
            return None;
        }
        if state.in_flight.len() >= (i32::MAX - 1) as usize {
            return None;
        }
        loop {
            let id = state.next;
            state.next = if state.next == i32::MAX { 1 } else { state.next + 1 };
            if state.in_flight.insert(id) {
                return Some(id);
            }
        }
    }

    /// Return an ID to the pool once its exchange completed (reply received,
    /// timed out, cancelled, or the connection failed). Releasing an ID that
    /// is not in flight is a no-op.
    pub fn release(&self, id: MessageId) {
        let mut state = self.state();
        if !state.in_flight.remove(&id) {
            debug!("Release of message ID {} that was not in flight", id);
        }
    }

    /// Stop issuing IDs. Every allocate call from here on returns None,
    /// including calls racing with the shutdown. IDs already in flight stay
    /// tracked until their owners release them.
    pub fn shutdown(&self) {
        let mut state = self.state();
        state.closed = true;
    }

    pub fn in_flight(&self) -> usize {
        self.state().in_flight.len()
    }
}
