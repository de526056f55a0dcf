//! Channel for scheduling host closures onto the runtime's event loop from
//! other threads.
//!
//! The JS context is confined to the thread that created it; helper threads
//! must never touch it directly. A `Channel` carries `Send` closures across
//! and the loop delivers them with the context in hand, which is the
//! cross-thread dispatch protocol of the bridge: acquire the right to touch
//! host state by going through the loop, never by sharing it.

use std::sync::atomic::Ordering;
use std::sync::{mpsc, Arc, Mutex};

use crate::context::Cx;
use crate::event::{LoopShared, SendJob};

/// Cloneable, `Send` handle that posts closures to the event loop.
///
/// Cloning a `Channel` produces a handle onto the same queue. Closures are
/// delivered in send order per sender; there is no global order across
/// senders.
pub struct Channel {
    state: Arc<ChannelState>,
    has_ref: bool,
}

struct ChannelState {
    tx: Mutex<mpsc::Sender<SendJob>>,
    refs: Arc<std::sync::atomic::AtomicUsize>,
}

impl Channel {
    pub(crate) fn new(shared: &LoopShared) -> Self {
        let state = ChannelState {
            tx: Mutex::new(shared.sender()),
            refs: shared.channel_refs(),
        };
        Channel {
            state: Arc::new(state),
            has_ref: false,
        }
    }

    /// Schedule a closure to run on the loop thread with the JS context in
    /// hand. Returns an error when the runtime has shut down.
    pub fn try_send<F>(&self, f: F) -> Result<(), SendError>
    where
        F: FnOnce(&mut Cx<'_>) + Send + 'static,
    {
        let tx = self.state.tx.lock().expect("channel sender poisoned");
        tx.send(Box::new(f)).map_err(|_| SendError)
    }

    /// Like [`Channel::try_send`], panicking if the runtime is gone.
    pub fn send<F>(&self, f: F)
    where
        F: FnOnce(&mut Cx<'_>) + Send + 'static,
    {
        self.try_send(f).expect("event loop has shut down")
    }

    /// Keep the event loop alive while this channel exists: `wait()` will
    /// not return until the channel is unreferenced or dropped.
    /// Idempotent.
    pub fn reference(&mut self) -> &mut Self {
        if !self.has_ref {
            self.has_ref = true;
            self.state.refs.fetch_add(1, Ordering::SeqCst);
        }
        self
    }

    /// Allow the event loop to go idle while this channel exists.
    /// Idempotent.
    pub fn unref(&mut self) -> &mut Self {
        if self.has_ref {
            self.has_ref = false;
            self.state.refs.fetch_sub(1, Ordering::SeqCst);
        }
        self
    }
}

impl Clone for Channel {
    fn clone(&self) -> Self {
        Channel {
            state: Arc::clone(&self.state),
            has_ref: false,
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.unref();
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Channel")
    }
}

/// The event loop is gone; the closure was not scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendError;

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("the event loop has shut down")
    }
}

impl std::error::Error for SendError {}
