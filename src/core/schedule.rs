/// Virtual-clock event queue.
///
/// Settle and presentation delays are entries on a timeline instead of
/// wall-clock timers. The owner advances the clock and fires whatever falls
/// due, in due-time order; ties fire in scheduling order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Entry<E> {
    due_ms: u64,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.seq == other.seq
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.due_ms, self.seq).cmp(&(other.due_ms, other.seq))
    }
}

/// A queue of events keyed by virtual due time.
#[derive(Debug)]
pub struct Timeline<E> {
    now_ms: u64,
    next_seq: u64,
    queue: BinaryHeap<Reverse<Entry<E>>>,
}

impl<E> Default for Timeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Timeline<E> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Due time of the earliest pending event.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(entry)| entry.due_ms)
    }

    /// Schedule `event` to fire `delay_ms` after the current time.
    pub fn schedule(&mut self, delay_ms: u64, event: E) {
        let entry = Entry {
            due_ms: self.now_ms.saturating_add(delay_ms),
            seq: self.next_seq,
            event,
        };
        self.next_seq += 1;
        self.queue.push(Reverse(entry));
    }

    /// Pop the earliest event due at or before `until_ms`, moving the clock
    /// to its due time. Returns `None` once nothing more is due; the clock
    /// is then left at `until_ms`.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<E> {
        match self.next_due_ms() {
            Some(due) if due <= until_ms => {}
            _ => {
                self.now_ms = self.now_ms.max(until_ms);
                return None;
            }
        }
        let Reverse(entry) = self.queue.pop()?;
        self.now_ms = self.now_ms.max(entry.due_ms);
        Some(entry.event)
    }

    /// Drop every pending event.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Drop pending events that do not satisfy `keep`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&E) -> bool,
    {
        let entries = std::mem::take(&mut self.queue).into_vec();
        self.queue = entries
            .into_iter()
            .filter(|Reverse(entry)| keep(&entry.event))
            .collect();
    }
}
