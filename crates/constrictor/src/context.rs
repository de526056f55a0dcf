//! The execution context handed to host code running inside the bridge.
//!
//! [`Cx`] is the capability to touch the JS engine: host callables receive
//! one when JS invokes them, event-loop jobs receive one when they run, and
//! every proxy operation that needs to read or write JS state threads one
//! through. Holding `&mut Cx` is the structural form of "the interpreter
//! mutex is held".

use crate::convert;
use crate::error::HostResult;
use crate::host::HostValue;
use crate::sys;

/// A view of the live JS context, scoped to one host-side call.
pub struct Cx<'cx> {
    pub(crate) context: &'cx mut sys::Context,
}

impl<'cx> Cx<'cx> {
    pub(crate) fn new(context: &'cx mut sys::Context) -> Self {
        Cx { context }
    }

    pub(crate) fn cx(&mut self) -> &mut sys::Context {
        self.context
    }

    /// Convert a host value into its JS form.
    pub fn to_js(&mut self, value: &HostValue) -> HostResult<sys::JsValue> {
        convert::to_js(self.context, value)
    }

    /// Convert a JS value into its host form.
    pub fn to_host(&mut self, value: &sys::JsValue) -> HostResult<HostValue> {
        convert::to_host(self.context, value)
    }

    /// Evaluate a JS expression from inside host code. The result crosses
    /// back through the standard JS→host path.
    pub fn eval(&mut self, source: &str) -> HostResult<HostValue> {
        let value = sys::eval_source(self.context, source, None)?;
        convert::to_host(self.context, &value)
    }
}
