//! Host futures: the awaitable half of promise↔future conversion.

use std::cell::RefCell;
use std::rc::Rc;

use crate::context::Cx;
use crate::error::{HostError, HostResult};
use crate::event::LoopShared;
use crate::host::HostValue;

type DoneCallback = Box<dyn FnOnce(&mut Cx<'_>, &HostFuture)>;

enum FutureState {
    Pending,
    Done(HostResult<HostValue>),
    Cancelled,
}

struct FutureInner {
    state: FutureState,
    callbacks: Vec<DoneCallback>,
    /// Whether the settled error was observed. An unobserved error fires
    /// the loop exception handler when the last reference drops, exactly
    /// once.
    retrieved: bool,
    loop_shared: Rc<LoopShared>,
}

/// A future attached to the host event loop.
///
/// Mirrors the loop-future protocol: `set_result`/`set_exception` settle it,
/// done-callbacks are scheduled on the loop, cancellation is cooperative,
/// and a settled-with-error future that nobody ever looked at reports
/// through the loop's exception handler when dropped.
#[derive(Clone)]
pub struct HostFuture {
    inner: Rc<RefCell<FutureInner>>,
}

impl HostFuture {
    pub(crate) fn new(loop_shared: Rc<LoopShared>) -> Self {
        HostFuture {
            inner: Rc::new(RefCell::new(FutureInner {
                state: FutureState::Pending,
                callbacks: Vec::new(),
                retrieved: false,
                loop_shared,
            })),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.inner.borrow().state, FutureState::Done(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.inner.borrow().state, FutureState::Cancelled)
    }

    /// Mark the future done with a value. No effect when already settled or
    /// cancelled.
    pub fn set_result(&self, value: HostValue) {
        self.settle(Ok(value));
    }

    /// Mark the future done with an error. No effect when already settled
    /// or cancelled.
    pub fn set_exception(&self, err: HostError) {
        self.settle(Err(err));
    }

    fn settle(&self, result: HostResult<HostValue>) {
        {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, FutureState::Pending) {
                return;
            }
            inner.state = FutureState::Done(result);
        }
        self.schedule_callbacks();
    }

    /// Request cancellation. A settled future cannot be cancelled; a
    /// cancelled future never settles. Cancelling never reaches back into
    /// JS (an attached promise stays in its prior state).
    pub fn cancel(&self) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, FutureState::Pending) {
                return false;
            }
            inner.state = FutureState::Cancelled;
        }
        self.schedule_callbacks();
        true
    }

    /// The result, once done. Pending or cancelled futures answer an error
    /// like the loop-future protocol does.
    pub fn result(&self) -> HostResult<HostValue> {
        let mut inner = self.inner.borrow_mut();
        match &inner.state {
            FutureState::Pending => Err(HostError::Runtime("future is not done yet".into())),
            FutureState::Cancelled => Err(HostError::Runtime("future was cancelled".into())),
            FutureState::Done(result) => {
                inner.retrieved = true;
                result.clone()
            }
        }
    }

    /// The settled error, `None` when fulfilled. Errors for pending and
    /// cancelled futures, like [`HostFuture::result`].
    pub fn exception(&self) -> HostResult<Option<HostError>> {
        let mut inner = self.inner.borrow_mut();
        match &inner.state {
            FutureState::Pending => Err(HostError::Runtime("future is not done yet".into())),
            FutureState::Cancelled => Err(HostError::Runtime("future was cancelled".into())),
            FutureState::Done(result) => {
                inner.retrieved = true;
                Ok(result.as_ref().err().cloned())
            }
        }
    }

    /// Register a callback to run on the loop once the future settles or is
    /// cancelled. Registering on a settled future schedules immediately.
    pub fn add_done_callback(&self, f: impl FnOnce(&mut Cx<'_>, &HostFuture) + 'static) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            if matches!(inner.state, FutureState::Pending) {
                inner.callbacks.push(Box::new(f));
                true
            } else {
                false
            }
        };
        if !pending {
            let fut = self.clone();
            let shared = self.inner.borrow().loop_shared.clone();
            shared.call_soon(Box::new(move |cx| f(cx, &fut)));
        }
    }

    fn schedule_callbacks(&self) {
        let mut inner = self.inner.borrow_mut();
        let callbacks = std::mem::take(&mut inner.callbacks);
        if callbacks.is_empty() {
            return;
        }
        // Callbacks observe the outcome, so the drop report is theirs.
        inner.retrieved = true;
        let shared = inner.loop_shared.clone();
        drop(inner);
        for f in callbacks {
            let fut = self.clone();
            shared.call_soon(Box::new(move |cx| f(cx, &fut)));
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn loop_shared(&self) -> Rc<LoopShared> {
        self.inner.borrow().loop_shared.clone()
    }
}

impl Drop for FutureInner {
    fn drop(&mut self) {
        if self.retrieved {
            return;
        }
        if let FutureState::Done(Err(err)) = &self.state {
            self.loop_shared.report_unhandled(err);
        }
    }
}

impl std::fmt::Debug for HostFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.inner.borrow().state {
            FutureState::Pending => "pending",
            FutureState::Cancelled => "cancelled",
            FutureState::Done(Ok(_)) => "fulfilled",
            FutureState::Done(Err(_)) => "rejected",
        };
        write!(f, "HostFuture<{state}>")
    }
}
