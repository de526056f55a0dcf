//! Wrapping host callables as JS functions.

use crate::context::Cx;
use crate::convert;
use crate::error::{throw_into_js, HostResult};
use crate::host::{HostFn, HostValue};
use crate::proxy::FnSlot;
use crate::runtime::state;
use crate::sys::{self, Context, JsResult, JsValue};

/// Captures threaded through the wrapped function's native body.
#[derive(boa_gc::Trace, boa_gc::Finalize)]
pub(crate) struct FnCaptures {
    #[unsafe_ignore_trace]
    func: HostFn,
}

/// Wrap a host callable as a JS function.
///
/// The native body converts JS arguments to host values (failing fast
/// before the callable runs), invokes the callable, and converts its result
/// back. The function object carries a slot-keyed property so JS→host
/// classification can unwrap it to the original callable, and so the
/// function ledger can account for its collection.
pub(crate) fn wrap_host_fn(context: &mut Context, func: &HostFn) -> HostResult<JsValue> {
    let name = func.name().to_string();
    let arity = func.arity() as usize;

    let fn_object = sys::closure_function(
        context,
        call_host_fn,
        FnCaptures { func: func.clone() },
        &name,
        arity,
    );

    // Recognition + finalization accounting.
    let slot = sys::slot_object(FnSlot::new(func.clone()));
    let symbol = state::with(|s| s.slot_symbol());
    fn_object
        .define_property_or_throw(
            sys::symbol_key(&symbol),
            boa_engine::property::PropertyDescriptor::builder()
                .value(slot)
                .writable(false)
                .enumerable(false)
                .configurable(true)
                .build(),
            context,
        )
        .map_err(|e| crate::error::engine_error(e, context))?;

    Ok(JsValue::from(fn_object))
}

fn call_host_fn(
    _this: &JsValue,
    args: &[JsValue],
    captures: &FnCaptures,
    context: &mut Context,
) -> JsResult<JsValue> {
    // Fail fast: a single argument that will not convert aborts the call
    // before any host code runs, and in-flight conversions are discarded.
    let mut host_args = Vec::with_capacity(args.len());
    for arg in args {
        match convert::to_host(context, arg) {
            Ok(v) => host_args.push(v),
            Err(err) => return Err(throw_into_js(&err)),
        }
    }

    let mut cx = Cx::new(context);
    let result: HostResult<HostValue> = captures.func.call(&mut cx, &host_args);
    match result {
        Ok(value) => convert::to_js(context, &value).map_err(|err| throw_into_js(&err)),
        Err(err) => Err(throw_into_js(&err)),
    }
}
