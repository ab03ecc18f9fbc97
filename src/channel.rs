//! The loop's single ordered event queue.
//!
//! All producers (hook callback, tick timer, tray selections, handles) post
//! into one FIFO so the loop sees a single ordering. Input producers are
//! bounded: when `capacity` events are pending, further input is dropped
//! instead of blocking the OS input pipeline. Control messages are never
//! dropped, and posting never blocks, so a callback running on the loop
//! thread can always post without deadlocking.

use crate::event::Event;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// Create a queue that accepts input while fewer than `capacity` events are pending.
pub(crate) fn event_queue(capacity: usize) -> (EventSender, EventQueue) {
    let (sender, receiver) = mpsc::channel();
    let pending = Arc::new(AtomicUsize::new(0));
    (
        EventSender {
            sender,
            pending: pending.clone(),
            capacity: capacity.max(1),
        },
        EventQueue { receiver, pending },
    )
}

/// Producer side. Cheap to clone, safe to use from any thread.
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    sender: Sender<Event>,
    pending: Arc<AtomicUsize>,
    capacity: usize,
}

impl EventSender {
    /// Post an input event. Returns `false` if the queue is full or the loop
    /// is gone; the event is then dropped.
    pub fn post_input(&self, event: Event) -> bool {
        if self.pending.fetch_add(1, Ordering::SeqCst) >= self.capacity {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        self.send(event)
    }

    /// Post a control event regardless of how many inputs are pending.
    pub fn post(&self, event: Event) -> bool {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.send(event)
    }

    fn send(&self, event: Event) -> bool {
        if self.sender.send(event).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }
}

/// Consumer side, owned by the loop.
#[derive(Debug)]
pub(crate) struct EventQueue {
    receiver: Receiver<Event>,
    pending: Arc<AtomicUsize>,
}

impl EventQueue {
    /// Block until the next event. `None` once every sender is gone.
    pub fn recv(&self) -> Option<Event> {
        let event = self.receiver.recv().ok()?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(event)
    }

    /// Next event if one is already waiting.
    pub fn try_recv(&self) -> Option<Event> {
        let event = self.receiver.try_recv().ok()?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(event)
    }

    #[cfg(test)]
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<Event> {
        let event = self.receiver.recv_timeout(timeout).ok()?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(event)
    }

    /// Number of events waiting.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
