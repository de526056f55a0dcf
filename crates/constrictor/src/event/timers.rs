//! Loop timers backing the JS timer bindings.
//!
//! Timer ids are indices into a grow-only handle table, so an id stays
//! valid (and answerable) after its timer fires or is cancelled, matching
//! `setTimeout` id semantics.

use std::cell::Cell;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::context::Cx;
use crate::event::LoopShared;

/// A 32-bit timer id usable as a `setTimeout` return value.
pub type TimerId = u32;

/// The callback form for timers: repeating timers re-run the same job, so
/// it is shared rather than consumed.
pub(crate) type TimerJob = Rc<dyn Fn(&mut Cx<'_>)>;

pub(crate) struct TimerHandle {
    job: TimerJob,
    delay: Duration,
    repeat: bool,
    cancelled: Cell<bool>,
    /// Whether a pending expiry exists in the heap.
    scheduled: Cell<bool>,
    /// Whether this timer keeps the event loop alive.
    has_ref: Cell<bool>,
}

pub(crate) struct TimerTable {
    handles: Vec<TimerHandle>,
    /// Min-heap of (deadline, sequence, id); the sequence keeps expiries
    /// with equal deadlines in scheduling order.
    heap: BinaryHeap<Reverse<(Instant, u64, TimerId)>>,
    seq: u64,
}

impl TimerTable {
    pub(crate) fn new() -> Self {
        TimerTable {
            handles: Vec::new(),
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Register a new timer and schedule its first expiry.
    pub(crate) fn schedule(&mut self, job: TimerJob, delay: Duration, repeat: bool) -> TimerId {
        let id = self.handles.len() as TimerId;
        self.handles.push(TimerHandle {
            job,
            delay,
            repeat,
            cancelled: Cell::new(false),
            scheduled: Cell::new(true),
            has_ref: Cell::new(true),
        });
        self.push_expiry(id, delay);
        id
    }

    fn push_expiry(&mut self, id: TimerId, delay: Duration) {
        let deadline = Instant::now() + delay;
        self.seq += 1;
        self.heap.push(Reverse((deadline, self.seq, id)));
    }

    /// Re-arm a repeating timer after a completed run.
    pub(crate) fn reschedule(&mut self, id: TimerId) {
        if let Some(handle) = self.handles.get(id as usize) {
            if !handle.cancelled.get() {
                handle.scheduled.set(true);
                let delay = handle.delay;
                self.push_expiry(id, delay);
            }
        }
    }

    pub(crate) fn handle(&self, id: TimerId) -> Option<&TimerHandle> {
        self.handles.get(id as usize)
    }

    /// Mark a timer cancelled. Cancelling an already-fired or unknown id
    /// does nothing.
    pub(crate) fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.handles.get(id as usize) {
            handle.cancelled.set(true);
            handle.has_ref.set(false);
        }
    }

    pub(crate) fn has_ref(&self, id: TimerId) -> Option<bool> {
        self.handle(id).map(|h| h.has_ref.get())
    }

    pub(crate) fn add_ref(&self, id: TimerId) -> bool {
        match self.handle(id) {
            Some(h) => {
                h.has_ref.set(true);
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_ref(&self, id: TimerId) -> bool {
        match self.handle(id) {
            Some(h) => {
                h.has_ref.set(false);
                true
            }
            None => false,
        }
    }

    /// Pop the next due, non-cancelled expiry. Cancelled expiries are
    /// discarded on the way.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<(TimerId, TimerJob)> {
        while let Some(Reverse((deadline, _, id))) = self.heap.peek().copied() {
            if deadline > now {
                return None;
            }
            self.heap.pop();
            let handle = &self.handles[id as usize];
            handle.scheduled.set(false);
            if handle.cancelled.get() {
                handle.has_ref.set(false);
                continue;
            }
            return Some((id, handle.job.clone()));
        }
        None
    }

    /// Earliest pending non-cancelled deadline.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.heap
            .iter()
            .filter(|Reverse((_, _, id))| !self.handles[*id as usize].cancelled.get())
            .map(|Reverse((deadline, _, _))| *deadline)
            .min()
    }

    /// Whether any pending timer still holds a loop reference.
    pub(crate) fn has_referenced_pending(&self) -> bool {
        self.handles
            .iter()
            .any(|h| h.scheduled.get() && !h.cancelled.get() && h.has_ref.get())
    }
}

/// Run a fired timer job, observing the cancel flag between repeat
/// iterations.
pub(crate) fn fire(shared: &Rc<LoopShared>, id: TimerId, job: TimerJob, cx: &mut Cx<'_>) {
    job(cx);

    let mut timers = shared.timers.borrow_mut();
    let (repeat, cancelled) = match timers.handle(id) {
        Some(h) => (h.repeat, h.cancelled.get()),
        None => return,
    };
    if repeat && !cancelled {
        timers.reschedule(id);
    } else if let Some(h) = timers.handle(id) {
        h.has_ref.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> TimerJob {
        Rc::new(|_cx| {})
    }

    #[test]
    fn ids_are_stable_table_indices() {
        let mut table = TimerTable::new();
        let a = table.schedule(noop(), Duration::from_millis(1), false);
        let b = table.schedule(noop(), Duration::from_millis(2), false);
        assert_eq!((a, b), (0, 1));
        // Ids survive firing and cancellation.
        table.cancel(a);
        assert_eq!(table.has_ref(a), Some(false));
        assert_eq!(table.has_ref(b), Some(true));
        assert_eq!(table.has_ref(99), None);
    }

    #[test]
    fn due_timers_pop_in_deadline_order() {
        let mut table = TimerTable::new();
        let slow = table.schedule(noop(), Duration::from_millis(50), false);
        let fast = table.schedule(noop(), Duration::from_millis(0), false);
        let now = Instant::now() + Duration::from_millis(10);
        let first = table.pop_due(now).map(|(id, _)| id);
        assert_eq!(first, Some(fast));
        // The slow timer is not due yet.
        assert!(table.pop_due(now).is_none());
        assert_eq!(table.next_deadline().is_some(), true);
        let later = Instant::now() + Duration::from_millis(100);
        assert_eq!(table.pop_due(later).map(|(id, _)| id), Some(slow));
    }

    #[test]
    fn cancelled_expiries_are_discarded() {
        let mut table = TimerTable::new();
        let id = table.schedule(noop(), Duration::from_millis(0), false);
        table.cancel(id);
        let later = Instant::now() + Duration::from_millis(10);
        assert!(table.pop_due(later).is_none());
        assert!(!table.has_referenced_pending());
    }

    #[test]
    fn repeat_reschedules_unless_cancelled() {
        let mut table = TimerTable::new();
        let id = table.schedule(noop(), Duration::from_millis(0), true);
        let later = Instant::now() + Duration::from_millis(10);
        assert!(table.pop_due(later).is_some());
        table.reschedule(id);
        assert!(table.has_referenced_pending());

        table.cancel(id);
        table.reschedule(id);
        let much_later = Instant::now() + Duration::from_millis(50);
        assert!(table.pop_due(much_later).is_none());
    }

    #[test]
    fn unreferenced_pending_timers_do_not_hold_the_loop() {
        let mut table = TimerTable::new();
        let id = table.schedule(noop(), Duration::from_secs(60), false);
        assert!(table.has_referenced_pending());
        table.remove_ref(id);
        assert!(!table.has_referenced_pending());
        table.add_ref(id);
        assert!(table.has_referenced_pending());
    }
}
