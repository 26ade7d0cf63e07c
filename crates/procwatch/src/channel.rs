//! Bounded, lossy line channels.
//!
//! A [`LineChannel`] pair carries [`Line`] values between a producer task
//! and a single consumer. Capacity is fixed at construction; sending into
//! a full channel evicts the *oldest* queued line before enqueuing the new
//! one (newest-wins, never blocking). Callers must tolerate gaps under
//! sustained backpressure — this is a deliberate lossy-buffer design, and
//! the number of evicted lines is observable via
//! [`dropped`](LineReceiver::dropped).
//!
//! End-of-stream is a value, not an error: once every sender is gone and
//! the queue is drained, [`recv`](LineReceiver::recv) returns `None`.
//! The consumer waits on a notify primitive while the queue is empty;
//! there is no polling.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::types::Line;

#[derive(Debug)]
struct Shared {
    queue: Mutex<VecDeque<Line>>,
    notify: Notify,
    capacity: usize,
    senders: AtomicUsize,
    dropped: AtomicU64,
}

impl Shared {
    /// Lock the queue, recovering from a poisoned mutex (a panicking
    /// producer must not wedge the consumer).
    fn lock(&self) -> MutexGuard<'_, VecDeque<Line>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a bounded line channel with the given capacity.
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn line_channel(capacity: usize) -> (LineSender, LineReceiver) {
    assert!(capacity > 0, "channel capacity must be at least 1");
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::with_capacity(capacity)),
        notify: Notify::new(),
        capacity,
        senders: AtomicUsize::new(1),
        dropped: AtomicU64::new(0),
    });
    (
        LineSender {
            shared: Arc::clone(&shared),
        },
        LineReceiver { shared },
    )
}

/// The producer half of a line channel.
///
/// Senders are cloneable: multiple producers (e.g. a stdout and a stderr
/// reader feeding one merged channel) may share a channel. The channel
/// reports end-of-stream only after the last sender is dropped.
#[derive(Debug)]
pub struct LineSender {
    shared: Arc<Shared>,
}

impl LineSender {
    /// Enqueue a line, evicting the oldest queued line if the channel is
    /// full.
    ///
    /// Never blocks. Returns the evicted line, if any, so callers can log
    /// the loss.
    pub fn send(&self, line: Line) -> Option<Line> {
        let evicted = {
            let mut queue = self.shared.lock();
            let evicted = if queue.len() >= self.shared.capacity {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(line);
            evicted
        };
        if evicted.is_some() {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.notify.notify_one();
        evicted
    }

    /// Capacity fixed at construction.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of lines currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Check whether the channel is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }
}

impl Clone for LineSender {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for LineSender {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last producer gone: wake the consumer so it can observe
            // end-of-stream.
            self.shared.notify.notify_one();
        }
    }
}

/// The consumer half of a line channel.
#[derive(Debug)]
pub struct LineReceiver {
    shared: Arc<Shared>,
}

impl LineReceiver {
    /// Receive the next line, waiting while the channel is empty.
    ///
    /// Returns `None` once every sender has been dropped and the queue is
    /// drained — the explicit end-of-stream sentinel. Buffered lines are
    /// always delivered before `None`, so a consumer looping on `recv`
    /// sees all surviving data and then terminates deterministically.
    pub async fn recv(&mut self) -> Option<Line> {
        loop {
            {
                let mut queue = self.shared.lock();
                if let Some(line) = queue.pop_front() {
                    return Some(line);
                }
            }
            if self.shared.senders.load(Ordering::Acquire) == 0 {
                return None;
            }
            self.shared.notify.notified().await;
        }
    }

    /// Receive the next line without waiting.
    ///
    /// Returns `None` if the channel is currently empty, whether or not
    /// producers remain. Use [`is_closed`](Self::is_closed) to
    /// distinguish an empty open channel from end-of-stream.
    pub fn try_recv(&mut self) -> Option<Line> {
        self.shared.lock().pop_front()
    }

    /// Check whether every sender has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.senders.load(Ordering::Acquire) == 0
    }

    /// Capacity fixed at construction.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of lines currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Check whether the channel is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }

    /// Total number of lines evicted by the overflow policy.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}
