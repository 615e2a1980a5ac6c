//! Bounded FIFO between the frame decoder and its consumers.
//!
//! A full queue evicts its oldest element to make room, so a stalled
//! consumer loses history rather than stalling the sensor reader. Producers
//! never block; consumers either poll with [`IngestQueue::try_pop`] or wait
//! with [`IngestQueue::pop_timeout`].

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Drop-oldest bounded queue guarded by a single mutex
pub struct IngestQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    capacity: usize,
    overflows: AtomicU64,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> IngestQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.min(4096)),
                closed: false,
            }),
            not_empty: Condvar::new(),
            capacity,
            overflows: AtomicU64::new(0),
        }
    }

    /// Append an item, evicting and returning the oldest one if full
    pub fn push(&self, item: T) -> Option<T> {
        let evicted = {
            let mut state = self.state.lock();
            let evicted = if state.items.len() >= self.capacity {
                state.items.pop_front()
            } else {
                None
            };
            state.items.push_back(item);
            evicted
        };
        if evicted.is_some() {
            self.overflows.fetch_add(1, Ordering::Relaxed);
        }
        self.not_empty.notify_one();
        evicted
    }

    /// Append a batch under one lock acquisition; returns how many were evicted
    pub fn push_all<I: IntoIterator<Item = T>>(&self, items: I) -> usize {
        let mut evicted = 0;
        {
            let mut state = self.state.lock();
            for item in items {
                if state.items.len() >= self.capacity {
                    state.items.pop_front();
                    evicted += 1;
                }
                state.items.push_back(item);
            }
        }
        if evicted > 0 {
            self.overflows.fetch_add(evicted as u64, Ordering::Relaxed);
        }
        self.not_empty.notify_one();
        evicted
    }

    /// Remove the oldest item without waiting
    pub fn try_pop(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    /// Remove the oldest item, waiting up to `timeout` for one to arrive
    ///
    /// Returns `None` on timeout, or immediately once the queue is closed
    /// and drained.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            if self.not_empty.wait_until(&mut state, deadline).timed_out() {
                return state.items.pop_front();
            }
        }
    }

    /// Move up to `max` items into `out`, oldest first
    pub fn drain_into(&self, out: &mut Vec<T>, max: usize) -> usize {
        let mut state = self.state.lock();
        let n = state.items.len().min(max);
        out.extend(state.items.drain(..n));
        n
    }

    /// Wake all waiters; subsequent waits return as soon as the queue is empty
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of evictions since creation
    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }
}
