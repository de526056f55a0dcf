//! Promise ↔ future conversion.

use crate::error::{engine_error, exception_value_to_js, HostError, HostResult};
use crate::event::HostFuture;
use crate::runtime::state;
use crate::sys::{self, Context, JsError, JsObject, JsResult, JsValue};

/// Captures for the promise reaction callbacks settling a host future.
#[derive(boa_gc::Trace, boa_gc::Finalize)]
pub(crate) struct FutureCaptures {
    #[unsafe_ignore_trace]
    future: HostFuture,
}

/// JS promise → host future.
///
/// Reaction callbacks convert the settlement value through the standard
/// JS→host path and settle the future; attaching them also counts as
/// handling the rejection, so the unhandled-rejection tracker stands down.
pub(crate) fn js_promise_to_future(
    context: &mut Context,
    promise: &JsObject,
) -> HostResult<HostFuture> {
    let shared = state::with(|s| s.loop_shared());
    let future = HostFuture::new(shared);

    let on_resolved = sys::closure_function(
        context,
        resolve_future,
        FutureCaptures {
            future: future.clone(),
        },
        "hostFutureResolve",
        1,
    );
    let on_rejected = sys::closure_function(
        context,
        reject_future,
        FutureCaptures {
            future: future.clone(),
        },
        "hostFutureReject",
        1,
    );

    let then = promise
        .get(sys::js_string_key("then"), context)
        .map_err(|e| engine_error(e, context))?;
    let then = then
        .as_callable()
        .cloned()
        .ok_or_else(|| HostError::Type("promise has no callable `then`".into()))?;
    then.call(
        &JsValue::from(promise.clone()),
        &[JsValue::from(on_resolved), JsValue::from(on_rejected)],
        context,
    )
    .map_err(|e| engine_error(e, context))?;

    Ok(future)
}

fn resolve_future(
    _this: &JsValue,
    args: &[JsValue],
    captures: &FutureCaptures,
    context: &mut Context,
) -> JsResult<JsValue> {
    let value = args.first().cloned().unwrap_or_else(JsValue::undefined);
    match crate::convert::to_host(context, &value) {
        Ok(host) => captures.future.set_result(host),
        Err(err) => captures.future.set_exception(err),
    }
    Ok(JsValue::undefined())
}

fn reject_future(
    _this: &JsValue,
    args: &[JsValue],
    captures: &FutureCaptures,
    context: &mut Context,
) -> JsResult<JsValue> {
    let reason = args.first().cloned().unwrap_or_else(JsValue::undefined);
    let err = engine_error(JsError::from_opaque(reason), context);
    captures.future.set_exception(err);
    Ok(JsValue::undefined())
}

/// Host future → JS promise.
///
/// The promise is created pending up front; the future's done-callback
/// holds the rooted resolving functions and settles it on the loop. A
/// cancelled future leaves the promise in its prior (pending) state.
pub(crate) fn future_to_js_promise(
    context: &mut Context,
    future: &HostFuture,
) -> HostResult<JsValue> {
    let helpers = state::with(|s| s.helpers());
    let deferred = helpers
        .call(context, "makeDeferred", &[])
        .map_err(|e| engine_error(e, context))?;
    let deferred = deferred
        .as_object()
        .cloned()
        .ok_or_else(|| HostError::Runtime("deferred creation failed".into()))?;

    let promise = deferred
        .get(sys::js_string_key("promise"), context)
        .map_err(|e| engine_error(e, context))?;
    let resolve = deferred
        .get(sys::js_string_key("resolve"), context)
        .map_err(|e| engine_error(e, context))?
        .as_object()
        .cloned()
        .ok_or_else(|| HostError::Runtime("deferred without resolver".into()))?;
    let reject = deferred
        .get(sys::js_string_key("reject"), context)
        .map_err(|e| engine_error(e, context))?
        .as_object()
        .cloned()
        .ok_or_else(|| HostError::Runtime("deferred without rejecter".into()))?;

    future.add_done_callback(move |cx, fut| {
        if fut.is_cancelled() {
            // No retroactive JS rejection.
            return;
        }
        let settled = match fut.result() {
            Ok(value) => {
                let js = crate::convert::to_js_safe(cx.cx(), &value);
                resolve.call(&JsValue::undefined(), &[js], cx.cx())
            }
            Err(err) => {
                let reason = exception_value_to_js(&err, cx.cx());
                reject.call(&JsValue::undefined(), &[reason], cx.cx())
            }
        };
        if let Err(err) = settled {
            log::warn!("settling a bridged promise failed: {err}");
        }
    });

    Ok(promise)
}

/// Promise details for the utils binding: `[state, value]` where state is
/// 0 = pending, 1 = fulfilled, 2 = rejected.
pub(crate) fn promise_details(promise: &JsObject) -> Option<(u32, Option<JsValue>)> {
    match sys::promise_state(promise)? {
        sys::PromiseState::Pending => Some((0, None)),
        sys::PromiseState::Fulfilled(v) => Some((1, Some(v))),
        sys::PromiseState::Rejected(v) => Some((2, Some(v))),
    }
}

/// Materialize an unhandled rejection as a settled, unobserved host future
/// whose drop fires the loop's exception handler exactly once.
pub(crate) fn materialize_rejection(context: &mut Context, promise: &JsObject) {
    let Some((2, Some(reason))) = promise_details(promise) else {
        return;
    };
    let shared = state::with(|s| s.loop_shared());
    let future = HostFuture::new(shared);
    let err = engine_error(JsError::from_opaque(reason), context);
    future.set_exception(err);
    drop(future);
}
