//! Condition-signaled hand-off queue between the acceptor and the workers.
//!
//! # Responsibilities
//! - FIFO hand-off of accepted connections to exactly one worker each
//! - Block idle workers without polling
//! - Carry the shutdown flag under the same lock as the queued items
//!
//! # Design Decisions
//! - One mutex guards both the items and the shutdown flag, so "queue became
//!   non-empty" and "shutdown was requested" are never observed out of order
//! - Workers re-check the predicate after every wake (spurious wakes are normal)
//! - Shutdown drains: workers keep popping until the queue is empty
//! - Once shutdown is latched, `push` hands the item back instead of queueing
//!   it, so nothing can land behind workers that have already exited

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    shutdown: bool,
}

/// A blocking multi-consumer FIFO with a shutdown latch.
#[derive(Debug)]
pub struct ConnectionQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> ConnectionQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
        }
    }

    // Holders never leave the state half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item and wake one waiting consumer.
    ///
    /// Returns the item unqueued if shutdown has already been requested.
    pub fn push(&self, item: T) -> Result<(), T> {
        let depth = {
            let mut state = self.lock();
            if state.shutdown {
                return Err(item);
            }
            state.items.push_back(item);
            state.items.len()
        };
        self.available.notify_one();
        crate::observability::metrics::record_queue_depth(depth);
        Ok(())
    }

    /// Take the oldest item, blocking while the queue is empty.
    ///
    /// Returns `None` once shutdown has been requested and nothing is left,
    /// which tells the caller to exit.
    pub fn pop_blocking(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                let depth = state.items.len();
                drop(state);
                crate::observability::metrics::record_queue_depth(depth);
                return Some(item);
            }
            if state.shutdown {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Point-in-time emptiness check. Not a substitute for [`pop_blocking`](Self::pop_blocking).
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Latch the shutdown flag and wake every waiting consumer. Idempotent.
    ///
    /// Returns `true` for the call that actually latched the flag.
    pub fn request_shutdown(&self) -> bool {
        let first = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.shutdown, true)
        };
        self.available.notify_all();
        first
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }
}

impl<T> Default for ConnectionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
