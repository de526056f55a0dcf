//! Host proxies for JS functions and bound methods.

use std::rc::Rc;

use crate::context::Cx;
use crate::convert;
use crate::error::{engine_error, HostResult};
use crate::handle::Root;
use crate::host::HostValue;
use crate::sys::{JsObject, JsValue};

/// A host callable forwarding to a rooted JS function.
///
/// Calling converts the host arguments (failing fast before entering JS),
/// invokes with the realm's global as `this`, and converts the result back.
#[derive(Clone)]
pub struct JsFunctionProxy {
    func: Root<JsObject>,
}

impl JsFunctionProxy {
    pub(crate) fn new(func: &JsObject) -> Self {
        JsFunctionProxy {
            func: Root::new(func),
        }
    }

    pub(crate) fn function(&self) -> &Root<JsObject> {
        &self.func
    }

    pub fn call(&self, cx: &mut Cx<'_>, args: &[HostValue]) -> HostResult<HostValue> {
        call_js(cx, self.func.inner(), &JsValue::undefined(), args)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        crate::sys::object_ptr_eq(self.func.inner(), other.func.inner())
    }
}

impl std::fmt::Debug for JsFunctionProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsFunctionProxy")
    }
}

/// A host callable forwarding to a rooted JS function with a host `self`
/// routed as `this`.
#[derive(Clone)]
pub struct JsMethodProxy {
    func: Root<JsObject>,
    receiver: Rc<HostValue>,
}

impl JsMethodProxy {
    pub fn new(func: &JsFunctionProxy, receiver: HostValue) -> Self {
        JsMethodProxy {
            func: func.function().clone(),
            receiver: Rc::new(receiver),
        }
    }

    pub fn receiver(&self) -> &HostValue {
        &self.receiver
    }

    pub fn call(&self, cx: &mut Cx<'_>, args: &[HostValue]) -> HostResult<HostValue> {
        let this = cx.to_js(&self.receiver)?;
        call_js(cx, self.func.inner(), &this, args)
    }

    /// The bound JS function this method crosses back to JS as.
    pub(crate) fn to_bound_js(&self, context: &mut crate::sys::Context) -> HostResult<JsValue> {
        let this = convert::to_js(context, &self.receiver)?;
        let helpers = crate::runtime::state::with(|s| s.helpers());
        helpers
            .call(
                context,
                "bindThis",
                &[JsValue::from(self.func.to_inner()), this],
            )
            .map_err(|e| engine_error(e, context))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        crate::sys::object_ptr_eq(self.func.inner(), other.func.inner())
            && *self.receiver == *other.receiver
    }
}

impl std::fmt::Debug for JsMethodProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsMethodProxy")
    }
}

/// Shared call path: convert arguments, invoke, convert the result.
fn call_js(
    cx: &mut Cx<'_>,
    func: &JsObject,
    this: &JsValue,
    args: &[HostValue],
) -> HostResult<HostValue> {
    // Argument conversion errors fail fast without entering JS.
    let mut js_args = Vec::with_capacity(args.len());
    for arg in args {
        js_args.push(convert::to_js(cx.cx(), arg)?);
    }
    let result = func
        .call(this, &js_args, cx.cx())
        .map_err(|e| engine_error(e, cx.cx()))?;
    convert::to_host(cx.cx(), &result)
}
