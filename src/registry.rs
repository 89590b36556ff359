//! Bounded, drop-oldest subscriber queues and the registry that tracks
//! them (C8 support). `crossbeam_channel` isn't a fit here: its overflow
//! policy on a bounded channel is reject-the-newest (`try_send` ->
//! `TrySendError::Full`), but a slow monitor subscriber should lose its
//! *stale* backlog, not have fresh frames rejected. So the queue itself is
//! hand-rolled.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

/// A bounded FIFO of lines that drops the oldest entry when a push would
/// exceed capacity, so one slow consumer can never make the queue (or the
/// broadcaster) block indefinitely.
pub struct DropOldestQueue {
    state: Mutex<VecDeque<String>>,
    not_empty: Condvar,
    capacity: usize,
}

impl DropOldestQueue {
    pub fn new(capacity: usize) -> Self {
        Self { state: Mutex::new(VecDeque::with_capacity(capacity)), not_empty: Condvar::new(), capacity }
    }

    /// Push a line, evicting the oldest queued line first if full.
    pub fn push(&self, line: String) {
        let mut q = self.state.lock().expect("queue mutex poisoned");
        if q.len() >= self.capacity {
            q.pop_front();
        }
        q.push_back(line);
        self.not_empty.notify_one();
    }

    /// Block until a line is available, or `None` once the queue has been
    /// closed (see [`Subscriber::close`]) and drained.
    pub fn pop_blocking(&self, closed: &std::sync::atomic::AtomicBool) -> Option<String> {
        let mut q = self.state.lock().expect("queue mutex poisoned");
        loop {
            if let Some(line) = q.pop_front() {
                return Some(line);
            }
            if closed.load(std::sync::atomic::Ordering::Acquire) {
                return None;
            }
            q = self.not_empty.wait(q).expect("queue mutex poisoned");
        }
    }
}

/// One registered monitor connection: a queue plus the sender thread that
/// drains it onto the socket. Dropping a `Subscriber` (or calling
/// `close`) wakes the sender thread so it can exit instead of blocking
/// forever on an empty queue.
pub struct Subscriber {
    pub id: u64,
    queue: Arc<DropOldestQueue>,
    closed: Arc<std::sync::atomic::AtomicBool>,
}

impl Subscriber {
    pub fn new(id: u64, capacity: usize) -> (Self, Arc<DropOldestQueue>, Arc<std::sync::atomic::AtomicBool>) {
        let queue = Arc::new(DropOldestQueue::new(capacity));
        let closed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        (Self { id, queue: queue.clone(), closed: closed.clone() }, queue, closed)
    }

    pub fn send(&self, line: String) {
        self.queue.push(line);
    }

    pub fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::Release);
        self.queue.not_empty.notify_all();
    }
}

/// All subscribers currently attached to one monitor port. Registration and
/// removal are idempotent: removing an id that isn't present, or removing
/// it twice, is a no-op rather than an error (a subscriber's sender thread
/// and its socket-read-eof detector can both race to remove the same id).
pub struct Registry {
    subscribers: Mutex<Vec<Arc<Subscriber>>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self { subscribers: Mutex::new(Vec::new()), next_id: std::sync::atomic::AtomicU64::new(1) }
    }

    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }

    pub fn add(&self, subscriber: Arc<Subscriber>) {
        self.subscribers.lock().expect("registry mutex poisoned").push(subscriber);
    }

    /// Remove a subscriber by id. Safe to call more than once for the same id.
    pub fn remove(&self, id: u64) {
        let mut subs = self.subscribers.lock().expect("registry mutex poisoned");
        subs.retain(|s| s.id != id);
    }

    /// A point-in-time copy of the current subscriber list, for broadcasting
    /// without holding the registry lock while writing to each queue.
    pub fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.subscribers.lock().expect("registry mutex poisoned").clone()
    }

    pub fn broadcast(&self, line: String) {
        for sub in self.snapshot() {
            sub.send(line.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().expect("registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_oldest_queue_evicts_on_overflow() {
        let q = DropOldestQueue::new(2);
        q.push("a".into());
        q.push("b".into());
        q.push("c".into()); // evicts "a"
        let closed = std::sync::atomic::AtomicBool::new(false);
        assert_eq!(q.pop_blocking(&closed), Some("b".into()));
        assert_eq!(q.pop_blocking(&closed), Some("c".into()));
    }

    #[test]
    fn pop_blocking_returns_none_once_closed_and_drained() {
        let q = DropOldestQueue::new(4);
        let closed = std::sync::atomic::AtomicBool::new(true);
        assert_eq!(q.pop_blocking(&closed), None);
    }

    #[test]
    fn registry_add_remove_and_idempotent_removal() {
        let reg = Registry::new();
        let (sub, _q, _c) = Subscriber::new(reg.next_id(), 16);
        reg.add(Arc::new(sub));
        assert_eq!(reg.len(), 1);

        reg.remove(1);
        assert!(reg.is_empty());
        // Removing again is a no-op, not a panic.
        reg.remove(1);
        assert!(reg.is_empty());
    }

    #[test]
    fn broadcast_reaches_every_subscriber_queue() {
        let reg = Registry::new();
        let (sub1, q1, _c1) = Subscriber::new(reg.next_id(), 16);
        let (sub2, q2, _c2) = Subscriber::new(reg.next_id(), 16);
        reg.add(Arc::new(sub1));
        reg.add(Arc::new(sub2));

        reg.broadcast("hello".into());

        let closed = std::sync::atomic::AtomicBool::new(true);
        q1.push("sentinel".into());
        q2.push("sentinel".into());
        assert_eq!(q1.pop_blocking(&closed), Some("hello".into()));
        assert_eq!(q2.pop_blocking(&closed), Some("hello".into()));
    }
}
