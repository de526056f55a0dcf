//! Persistent root handles for JS values held on the host heap.
//!
//! The engine's values are garbage collected; anything stored for longer
//! than one synchronous call must be rooted. In this engine, ownership of a
//! handle *is* the root: a cloned `JsObject`/`JsString`/`JsValue` keeps its
//! referent alive until dropped. [`Root`] wraps that ownership in a named
//! type so structure-embedded and persistent roots are visible in the data
//! model rather than implied by a stray field.

use std::fmt;

/// A persistent GC root for a JS value stored on the host heap.
///
/// Dropping the `Root` releases the root. Cloning produces an independent
/// root for the same referent.
pub struct Root<T: Clone> {
    inner: T,
}

impl<T: Clone> Root<T> {
    /// Root a JS value.
    pub fn new(value: &T) -> Self {
        Root {
            inner: value.clone(),
        }
    }

    /// Borrow the rooted value.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Clone the rooted value back out for local use.
    pub fn to_inner(&self) -> T {
        self.inner.clone()
    }
}

impl<T: Clone> Clone for Root<T> {
    fn clone(&self) -> Self {
        Root {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone> std::ops::Deref for Root<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Clone> fmt::Debug for Root<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Root")
    }
}

impl<T: Clone> From<T> for Root<T> {
    fn from(value: T) -> Self {
        Root { inner: value }
    }
}
