//! Host callables.

use std::fmt;
use std::rc::Rc;

use crate::context::Cx;
use crate::error::HostResult;
use crate::host::HostValue;

type CallImpl = dyn Fn(&mut Cx<'_>, Option<&HostValue>, &[HostValue]) -> HostResult<HostValue>;

/// A host callable: a plain function, or a method bound to a receiver.
///
/// Calling convention: the receiver (if bound) arrives separately from the
/// positional arguments, so rebinding a method to a new receiver (which the
/// list proxy's callback-taking methods do for `thisArg`) never has to
/// splice argument lists.
#[derive(Clone)]
pub struct HostFn {
    name: Rc<str>,
    arity: Option<u32>,
    f: Rc<CallImpl>,
    receiver: Option<Rc<HostValue>>,
}

impl HostFn {
    /// A plain host function.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Cx<'_>, &[HostValue]) -> HostResult<HostValue> + 'static,
    {
        HostFn {
            name: Rc::from(name.into().into_boxed_str()),
            arity: None,
            f: Rc::new(move |cx, _recv, args| f(cx, args)),
            receiver: None,
        }
    }

    /// A method: receives its bound receiver as a distinguished argument.
    pub fn method<F>(name: impl Into<String>, receiver: HostValue, f: F) -> Self
    where
        F: Fn(&mut Cx<'_>, Option<&HostValue>, &[HostValue]) -> HostResult<HostValue> + 'static,
    {
        HostFn {
            name: Rc::from(name.into().into_boxed_str()),
            arity: None,
            f: Rc::new(f),
            receiver: Some(Rc::new(receiver)),
        }
    }

    /// Declare a fixed argument count, reported as the wrapped JS function's
    /// `length`.
    pub fn with_arity(mut self, arity: u32) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> u32 {
        self.arity.unwrap_or(0)
    }

    pub fn is_bound(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn receiver(&self) -> Option<&HostValue> {
        self.receiver.as_deref()
    }

    /// A copy of this callable bound to a different receiver. Unbound
    /// functions are returned unchanged (there is no receiver to replace).
    pub fn rebind(&self, receiver: HostValue) -> Self {
        if self.receiver.is_none() {
            return self.clone();
        }
        HostFn {
            name: self.name.clone(),
            arity: self.arity,
            f: self.f.clone(),
            receiver: Some(Rc::new(receiver)),
        }
    }

    pub fn call(&self, cx: &mut Cx<'_>, args: &[HostValue]) -> HostResult<HostValue> {
        (self.f)(cx, self.receiver.as_deref(), args)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl PartialEq for HostFn {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            && match (&self.receiver, &other.receiver) {
                (None, None) => true,
                (Some(a), Some(b)) => **a == **b,
                _ => false,
            }
    }
}

impl fmt::Debug for HostFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bound() {
            write!(f, "<bound method {}>", self.name)
        } else {
            write!(f, "<function {}>", self.name)
        }
    }
}
