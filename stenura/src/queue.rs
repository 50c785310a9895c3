//! The chord queue.
//!
//! A bounded FIFO between the realtime poller (sole producer) and the
//! translation loop (sole consumer).  Strictly first-in first-out, so
//! chords reach the translator in exactly the order the machine emitted
//! them.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use steno_core::chord::Chord;

pub const DEFAULT_CAPACITY: usize = 1024;

struct Inner {
    items: VecDeque<Chord>,
    closed: bool,
}

/// A thread-safe bounded chord FIFO.
pub struct ChordQueue {
    inner: Mutex<Inner>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl ChordQueue {
    pub fn new() -> ChordQueue {
        ChordQueue::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> ChordQueue {
        ChordQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Append a chord, blocking while the queue is full.  Returns false if
    /// the queue has been closed.
    pub fn push(&self, chord: Chord) -> bool {
        let mut inner = self.inner.lock().unwrap();
        while inner.items.len() >= self.capacity && !inner.closed {
            inner = self.not_full.wait(inner).unwrap();
        }
        if inner.closed {
            return false;
        }
        inner.items.push_back(chord);
        self.not_empty.notify_one();
        true
    }

    /// Append without blocking.  Returns false if full or closed.
    pub fn try_push(&self, chord: Chord) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed || inner.items.len() >= self.capacity {
            return false;
        }
        inner.items.push_back(chord);
        self.not_empty.notify_one();
        true
    }

    /// Take the oldest chord, blocking while the queue is empty.  Returns
    /// None once the queue is closed and drained.
    pub fn pop(&self) -> Option<Chord> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(chord) = inner.items.pop_front() {
                self.not_full.notify_one();
                return Some(chord);
            }
            if inner.closed {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Take the oldest chord without blocking.
    pub fn try_pop(&self) -> Option<Chord> {
        let mut inner = self.inner.lock().unwrap();
        let chord = inner.items.pop_front();
        if chord.is_some() {
            self.not_full.notify_one();
        }
        chord
    }

    /// Close the queue, waking every blocked pusher and popper.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChordQueue {
    fn default() -> ChordQueue {
        ChordQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn chord(raw: u32) -> Chord {
        Chord::from_raw(raw)
    }

    #[test]
    fn fifo_order() {
        let q = ChordQueue::new();
        for raw in 1..=5 {
            assert!(q.push(chord(raw)));
        }
        for raw in 1..=5 {
            assert_eq!(q.pop(), Some(chord(raw)));
        }
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn try_push_respects_capacity() {
        let q = ChordQueue::with_capacity(2);
        assert!(q.try_push(chord(1)));
        assert!(q.try_push(chord(2)));
        assert!(!q.try_push(chord(3)));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn close_unblocks_popper() {
        let q = Arc::new(ChordQueue::new());
        let popper = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.pop())
        };
        q.close();
        assert_eq!(popper.join().unwrap(), None);
        assert!(!q.push(chord(1)));
    }

    #[test]
    fn order_survives_threads() {
        let q = Arc::new(ChordQueue::with_capacity(8));
        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                for raw in 1..=1000u32 {
                    assert!(q.push(chord(raw)));
                }
                q.close();
            })
        };

        let mut seen = Vec::new();
        while let Some(c) = q.pop() {
            seen.push(c.into_raw());
        }
        producer.join().unwrap();
        assert_eq!(seen, (1..=1000).collect::<Vec<_>>());
    }
}
