//! Bounded blocking channel with cooperative shutdown.
//!
//! [`BoundedChannel`] decouples a producer and a consumer running at
//! different rates:
//! - Producers block while the channel is full (backpressure).
//! - Consumers block while the channel is empty.
//! - `deactivate()` wakes every blocked party exactly once, without losing
//!   queued items: consumers drain what remains, then see the shutdown
//!   sentinel.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// A thread-safe bounded FIFO with blocking enqueue/dequeue.
///
/// The capacity bounds queued item count, not bytes. Capacity 0 degenerates
/// to a rendezvous: every enqueue blocks until a matching dequeue collects
/// the item.
///
/// This primitive never errors; it only blocks or reports shutdown through
/// its return values.
///
/// # Example
///
/// ```rust
/// use weir::channel::BoundedChannel;
///
/// let ch = BoundedChannel::new(4);
/// assert!(ch.enqueue(1u32).is_ok());
/// assert_eq!(ch.dequeue(), Some(1));
/// ch.deactivate();
/// assert_eq!(ch.dequeue(), None);
/// ```
pub struct BoundedChannel<T> {
    capacity: usize,
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

struct State<T> {
    items: VecDeque<T>,
    active: bool,
    /// Consumers parked in `dequeue`, counted so a zero-capacity producer
    /// knows a matching dequeue is ready.
    waiting_consumers: usize,
    total_enqueued: u64,
    total_dequeued: u64,
}

impl<T> BoundedChannel<T> {
    /// Create a channel bounding the queued item count to `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity.min(1024)),
                active: true,
                waiting_consumers: 0,
                total_enqueued: 0,
                total_dequeued: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Append an item to the tail, blocking while the channel is full.
    ///
    /// Returns `Err(item)`, handing the item back untouched, if the
    /// channel was deactivated before the item could be admitted. Callers
    /// treat that as the shutdown no-op.
    ///
    /// With capacity 0 the call additionally blocks until a consumer has
    /// collected the item (direct handoff).
    pub fn enqueue(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock().unwrap();

        while state.active && !self.can_admit(&state) {
            state = self.not_full.wait(state).unwrap();
        }

        if !state.active {
            return Err(item);
        }

        state.items.push_back(item);
        state.total_enqueued += 1;
        self.not_empty.notify_one();

        if self.capacity == 0 {
            // Rendezvous: hold the producer until the item is taken.
            while state.active && !state.items.is_empty() {
                state = self.not_full.wait(state).unwrap();
            }
        }

        Ok(())
    }

    /// Pop the head item, blocking while the channel is empty and active.
    ///
    /// Returns `None` only on shutdown with an empty queue; items enqueued
    /// before deactivation are still drained in order.
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap();

        state.waiting_consumers += 1;
        if self.capacity == 0 {
            // A rendezvous producer may be parked waiting for us.
            self.not_full.notify_all();
        }

        while state.active && state.items.is_empty() {
            state = self.not_empty.wait(state).unwrap();
        }
        state.waiting_consumers -= 1;

        let item = state.items.pop_front();
        if item.is_some() {
            state.total_dequeued += 1;
            if self.capacity == 0 {
                self.not_full.notify_all();
            } else {
                self.not_full.notify_one();
            }
        }
        item
    }

    /// Shut the channel down, waking every blocked producer and consumer.
    ///
    /// The broadcast is unconditional: a waiter parked at any fill level is
    /// woken, regardless of whether the queue is empty, full, or in between.
    /// Idempotent; the second call is a no-op.
    pub fn deactivate(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.active {
            return;
        }
        state.active = false;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Check whether the channel is still accepting items.
    pub fn is_active(&self) -> bool {
        self.state.lock().unwrap().active
    }

    /// Snapshot of the queued item count.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured capacity bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get statistics about channel traffic.
    pub fn stats(&self) -> ChannelStats {
        let state = self.state.lock().unwrap();
        ChannelStats {
            queued: state.items.len(),
            total_enqueued: state.total_enqueued,
            total_dequeued: state.total_dequeued,
            active: state.active,
        }
    }

    fn can_admit(&self, state: &State<T>) -> bool {
        if self.capacity == 0 {
            state.items.is_empty() && state.waiting_consumers > 0
        } else {
            state.items.len() < self.capacity
        }
    }
}

/// Statistics about channel traffic.
#[derive(Debug, Clone, Copy)]
pub struct ChannelStats {
    /// Items currently queued.
    pub queued: usize,
    /// Total items admitted since creation.
    pub total_enqueued: u64,
    /// Total items handed to consumers since creation.
    pub total_dequeued: u64,
    /// Whether the channel is still active.
    pub active: bool,
}
