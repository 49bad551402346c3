//! Per-session outbound event queue.
//!
//! Many request handlers may push concurrently; exactly one stream writer
//! drains it. The queue is bounded and applies an explicit overflow policy
//! once full. Closing the queue discards whatever is still buffered.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::Notify;
use tracing::warn;

use super::event::McpEvent;

/// Default maximum number of buffered events per session.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// What to do when a push finds the queue full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest buffered event to make room.
    #[default]
    DropOldest,
    /// Reject the event being pushed.
    DropNewest,
    /// Close the queue, which ends the session.
    CloseSession,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    #[error("queue is full ({0} events)")]
    Full(usize),
}

struct QueueInner {
    events: VecDeque<McpEvent>,
    closed: bool,
    dropped: u64,
}

/// Bounded FIFO of events waiting to be written to a session's stream.
pub struct EventQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    capacity: usize,
    policy: OverflowPolicy,
}

impl EventQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                events: VecDeque::new(),
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
            capacity: capacity.max(1),
            policy,
        }
    }

    /// Append an event.
    ///
    /// Returns `Full` when the policy rejected the event or closed the queue.
    pub fn push(&self, event: McpEvent) -> Result<(), QueueError> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(QueueError::Closed);
            }
            if inner.events.len() >= self.capacity {
                inner.dropped += 1;
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        if let Some(evicted) = inner.events.pop_front() {
                            warn!(
                                "Event queue full ({}), dropped oldest {} event",
                                self.capacity,
                                evicted.kind()
                            );
                        }
                    }
                    OverflowPolicy::DropNewest => {
                        warn!(
                            "Event queue full ({}), rejected {} event",
                            self.capacity,
                            event.kind()
                        );
                        return Err(QueueError::Full(self.capacity));
                    }
                    OverflowPolicy::CloseSession => {
                        warn!("Event queue full ({}), closing session", self.capacity);
                        inner.closed = true;
                        inner.events.clear();
                        drop(inner);
                        self.notify.notify_one();
                        return Err(QueueError::Full(self.capacity));
                    }
                }
            }
            inner.events.push_back(event);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the queue is closed.
    pub async fn recv(&self) -> Option<McpEvent> {
        loop {
            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return None;
                }
                if let Some(event) = inner.events.pop_front() {
                    return Some(event);
                }
            }
            // notify_one stores a permit when nobody is waiting, so a push
            // between the check above and this await is not lost.
            self.notify.notified().await;
        }
    }

    /// Close the queue and discard buffered events.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.events.clear();
        }
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events lost to the overflow policy.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, OverflowPolicy::default())
    }
}
