//! Thread-safe FIFO shared between the connection loops and the application.
//!
//! Provides:
//! - Unbounded push that never fails
//! - Non-blocking pop that reports "empty" instead of suspending
//! - An optional push notification for consumers that prefer waiting to polling
//!
//! All access is serialized by one mutex per queue. The lock is held only for
//! the duration of a single push or pop, never across an await point.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Unbounded multi-producer, multi-consumer FIFO queue.
#[derive(Debug)]
pub struct ConcurrentQueue<T> {
    items: Mutex<VecDeque<T>>,
    pushed: Notify,
}

impl<T> ConcurrentQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        ConcurrentQueue {
            items: Mutex::new(VecDeque::new()),
            pushed: Notify::new(),
        }
    }

    /// Append a value to the tail.
    pub fn push(&self, value: T) {
        self.lock().push_back(value);
        self.pushed.notify_one();
    }

    /// Remove and return the head value, or `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Remove every queued value, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    /// Number of queued values.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if there are no queued values.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wait until a push happens.
    ///
    /// A push that happened while nobody was waiting is remembered, so a
    /// consumer that saw an empty queue and then calls this does not miss it.
    /// Completion does not guarantee a value is still there; re-check with
    /// `try_pop`.
    pub async fn wait_for_push(&self) {
        self.pushed.notified().await;
    }

    // A panic while holding the lock cannot leave the deque half-modified,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
