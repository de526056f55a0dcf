//! The host event loop and its bridges.
//!
//! The loop is the asynchronous half of the bridge: JS microtasks are
//! posted here by the engine's job queue, JS timers *are* loop timers, and
//! promise↔future conversion settles through loop callbacks. The loop is
//! confined to the runtime's thread; the only cross-thread entry is
//! [`Channel`], which hands `Send` closures to the loop queue.

mod channel;
mod future;
mod jobs;
mod timers;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

pub use channel::{Channel, SendError};
pub use future::HostFuture;
pub(crate) use jobs::JobBridge;
pub use timers::TimerId;
pub(crate) use timers::TimerTable;

use crate::context::Cx;
use crate::error::HostError;

/// A queued loop job. Jobs run with the interpreter context in hand.
pub(crate) type Job = Box<dyn FnOnce(&mut Cx<'_>)>;

/// A job posted from another thread.
pub(crate) type SendJob = Box<dyn FnOnce(&mut Cx<'_>) + Send>;

/// Handler invoked for errors nobody awaited (unhandled promise rejections
/// and failed loop jobs).
pub type ExceptionHandler = Rc<dyn Fn(&HostError)>;

/// State shared between the loop driver, the job bridge, timers and
/// futures.
pub(crate) struct LoopShared {
    /// Microtask FIFO.
    ready: RefCell<VecDeque<Job>>,
    /// In-flight job count: incremented on enqueue, decremented when the
    /// wrapper finishes. `wait()` blocks until this reaches zero.
    counter: Cell<usize>,
    pub(crate) timers: RefCell<TimerTable>,
    incoming_tx: mpsc::Sender<SendJob>,
    incoming_rx: RefCell<mpsc::Receiver<SendJob>>,
    /// Count of referenced [`Channel`]s keeping the loop alive. Shared by
    /// `Arc` because channels outlive thread confinement.
    channel_refs: Arc<AtomicUsize>,
    exception_handler: RefCell<Option<ExceptionHandler>>,
}

impl LoopShared {
    pub(crate) fn new() -> Rc<Self> {
        let (tx, rx) = mpsc::channel();
        Rc::new(LoopShared {
            ready: RefCell::new(VecDeque::new()),
            counter: Cell::new(0),
            timers: RefCell::new(TimerTable::new()),
            incoming_tx: tx,
            incoming_rx: RefCell::new(rx),
            channel_refs: Arc::new(AtomicUsize::new(0)),
            exception_handler: RefCell::new(None),
        })
    }

    /// Post a job to the back of the queue (`call_soon`).
    pub(crate) fn call_soon(self: &Rc<Self>, job: Job) {
        self.counter.set(self.counter.get() + 1);
        let shared = Rc::clone(self);
        self.ready.borrow_mut().push_back(Box::new(move |cx| {
            job(cx);
            shared.counter.set(shared.counter.get() - 1);
        }));
    }

    pub(crate) fn job_count(&self) -> usize {
        self.counter.get()
    }

    pub(crate) fn sender(&self) -> mpsc::Sender<SendJob> {
        self.incoming_tx.clone()
    }

    pub(crate) fn channel_refs(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.channel_refs)
    }

    /// The installed exception handler, if any.
    pub(crate) fn exception_handler(&self) -> Option<ExceptionHandler> {
        self.exception_handler.borrow().clone()
    }

    pub(crate) fn set_exception_handler(&self, handler: Option<ExceptionHandler>) {
        *self.exception_handler.borrow_mut() = handler;
    }

    /// Report an error nobody awaited through the exception handler, or the
    /// log when no handler is installed.
    pub(crate) fn report_unhandled(&self, err: &HostError) {
        match self.exception_handler() {
            Some(handler) => handler(err),
            None => log::warn!("unhandled error on the event loop: {err}"),
        }
    }

    /// Move cross-thread posts into the ready queue. Returns how many
    /// arrived.
    fn drain_incoming(self: &Rc<Self>) -> usize {
        let mut n = 0;
        while let Ok(job) = self.incoming_rx.borrow().try_recv() {
            self.call_soon(Box::new(job));
            n += 1;
        }
        n
    }

    /// Park until a cross-thread post arrives or `dur` elapses.
    fn park(self: &Rc<Self>, dur: Duration) {
        let job = self.incoming_rx.borrow().recv_timeout(dur);
        if let Ok(job) = job {
            self.call_soon(Box::new(job));
        }
    }
}

/// The loop driver. Owned by the runtime, which lends it the JS context for
/// each run.
pub(crate) struct EventLoop {
    shared: Rc<LoopShared>,
}

impl EventLoop {
    pub(crate) fn new(shared: Rc<LoopShared>) -> Self {
        EventLoop { shared }
    }

    /// Run one batch: drain cross-thread posts, run every queued microtask
    /// in insertion order, then fire timers that are due. Microtasks posted
    /// by the batch itself run before the timers, preserving the
    /// "microtasks of a tick before expired timers" ordering.
    ///
    /// Returns `true` when any job or timer ran.
    fn turn(&self, cx: &mut Cx<'_>) -> bool {
        let shared = &self.shared;
        shared.drain_incoming();

        let mut progressed = false;
        loop {
            let job = shared.ready.borrow_mut().pop_front();
            match job {
                Some(job) => {
                    job(cx);
                    progressed = true;
                }
                None => break,
            }
        }

        let now = Instant::now();
        while let Some((id, job)) = {
            let due = shared.timers.borrow_mut().pop_due(now);
            due
        } {
            timers::fire(shared, id, job, cx);
            progressed = true;
        }

        progressed
    }

    /// Whether anything is still outstanding: queued jobs, in-flight
    /// counters, referenced timers or referenced channels.
    fn busy(&self) -> bool {
        let shared = &self.shared;
        shared.job_count() > 0
            || !shared.ready.borrow().is_empty()
            || shared.timers.borrow().has_referenced_pending()
            || shared.channel_refs.load(Ordering::SeqCst) > 0
    }

    /// Drive the loop until all asynchronous work drains (`wait()`).
    pub(crate) fn run_until_idle(&self, cx: &mut Cx<'_>) {
        self.run_until(cx, |_| false);
    }

    /// Drive the loop until `done` answers true or the loop goes idle.
    /// Returns whether `done` was satisfied.
    pub(crate) fn run_until(&self, cx: &mut Cx<'_>, done: impl Fn(&mut Cx<'_>) -> bool) -> bool {
        loop {
            if done(cx) {
                return true;
            }
            let progressed = self.turn(cx);
            if progressed {
                continue;
            }
            if done(cx) {
                return true;
            }
            if !self.busy() {
                return false;
            }
            let next = self.shared.timers.borrow().next_deadline();
            let dur = match next {
                Some(deadline) => deadline
                    .checked_duration_since(Instant::now())
                    .unwrap_or(Duration::ZERO),
                // Only cross-thread work can unblock us.
                None => Duration::from_millis(10),
            };
            if !dur.is_zero() {
                self.shared.park(dur);
            }
        }
    }
}
