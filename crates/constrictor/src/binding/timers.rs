//! `internalBinding("timers")` and the timer globals built over it.

use std::rc::Rc;
use std::time::Duration;

use boa_engine::NativeFunction;

use crate::event::TimerId;
use crate::runtime::state;
use crate::sys::{self, Context, JsObject, JsResult, JsValue};

pub(crate) fn populate(context: &mut Context, object: &JsObject) {
    super::bind_fn(
        context,
        object,
        "enqueueWithDelay",
        NativeFunction::from_fn_ptr(enqueue_with_delay),
        2,
    );
    super::bind_fn(
        context,
        object,
        "cancelByTimeoutId",
        NativeFunction::from_fn_ptr(cancel_by_timeout_id),
        1,
    );
    super::bind_fn(
        context,
        object,
        "timerHasRef",
        NativeFunction::from_fn_ptr(timer_has_ref),
        1,
    );
    super::bind_fn(
        context,
        object,
        "timerAddRef",
        NativeFunction::from_fn_ptr(timer_add_ref),
        1,
    );
    super::bind_fn(
        context,
        object,
        "timerRemoveRef",
        NativeFunction::from_fn_ptr(timer_remove_ref),
        1,
    );
}

/// `setTimeout`/`clearTimeout`/`setInterval`/`clearInterval` globals over
/// the same timer table.
pub(crate) fn install_timer_globals(context: &mut Context) {
    let global = sys::global_object(context);
    for (name, f, length) in [
        (
            "setTimeout",
            NativeFunction::from_fn_ptr(set_timeout),
            2usize,
        ),
        ("clearTimeout", NativeFunction::from_fn_ptr(clear_timer), 1),
        ("setInterval", NativeFunction::from_fn_ptr(set_interval), 2),
        ("clearInterval", NativeFunction::from_fn_ptr(clear_timer), 1),
    ] {
        let func = sys::function(context, f, name, length);
        let _ = global.set(sys::js_string_key(name), JsValue::from(func), false, context);
    }
}

/// Schedule a callable on the loop after `seconds`, optionally repeating.
/// Returns the timeout id.
fn schedule(
    callable: JsObject,
    extra_args: Vec<JsValue>,
    seconds: f64,
    repeat: bool,
) -> TimerId {
    let shared = state::with(|s| s.loop_shared());
    let job = Rc::new(move |cx: &mut crate::context::Cx<'_>| {
        if let Err(err) = callable.call(&JsValue::undefined(), &extra_args, cx.cx()) {
            log::warn!("timer callback failed: {err}");
        }
    });
    let delay = Duration::from_secs_f64(seconds.max(0.0));
    shared.timers.borrow_mut().schedule(job, delay, repeat)
}

fn timer_args(args: &[JsValue]) -> JsResult<(JsObject, f64)> {
    let callable = args
        .first()
        .and_then(JsValue::as_callable)
        .cloned()
        .ok_or_else(|| sys::type_error("timer callback is not callable"))?;
    let seconds = args.get(1).and_then(JsValue::as_number).unwrap_or(0.0);
    Ok((callable, seconds))
}

fn enqueue_with_delay(_this: &JsValue, args: &[JsValue], _cx: &mut Context) -> JsResult<JsValue> {
    let (callable, seconds) = timer_args(args)?;
    let repeat = args.get(2).map(JsValue::to_boolean).unwrap_or(false);
    let id = schedule(callable, Vec::new(), seconds, repeat);
    Ok(JsValue::from(id as i32))
}

fn timeout_id(args: &[JsValue]) -> Option<TimerId> {
    args.first()
        .and_then(JsValue::as_number)
        .filter(|n| *n >= 0.0)
        .map(|n| n as TimerId)
}

fn cancel_by_timeout_id(
    _this: &JsValue,
    args: &[JsValue],
    _cx: &mut Context,
) -> JsResult<JsValue> {
    // An invalid id does nothing, like `clearTimeout`.
    if let Some(id) = timeout_id(args) {
        let shared = state::with(|s| s.loop_shared());
        shared.timers.borrow_mut().cancel(id);
    }
    Ok(sys::undefined())
}

fn timer_has_ref(_this: &JsValue, args: &[JsValue], _cx: &mut Context) -> JsResult<JsValue> {
    let answer = timeout_id(args)
        .and_then(|id| {
            let shared = state::with(|s| s.loop_shared());
            let has = shared.timers.borrow().has_ref(id);
            has
        })
        .unwrap_or(false);
    Ok(JsValue::from(answer))
}

fn timer_add_ref(_this: &JsValue, args: &[JsValue], _cx: &mut Context) -> JsResult<JsValue> {
    if let Some(id) = timeout_id(args) {
        let shared = state::with(|s| s.loop_shared());
        shared.timers.borrow().add_ref(id);
    }
    Ok(sys::undefined())
}

fn timer_remove_ref(_this: &JsValue, args: &[JsValue], _cx: &mut Context) -> JsResult<JsValue> {
    if let Some(id) = timeout_id(args) {
        let shared = state::with(|s| s.loop_shared());
        shared.timers.borrow().remove_ref(id);
    }
    Ok(sys::undefined())
}

fn set_timeout(_this: &JsValue, args: &[JsValue], _cx: &mut Context) -> JsResult<JsValue> {
    let (callable, ms) = timer_args(args)?;
    let extra: Vec<JsValue> = args.iter().skip(2).cloned().collect();
    let id = schedule(callable, extra, ms / 1000.0, false);
    Ok(JsValue::from(id as i32))
}

fn set_interval(_this: &JsValue, args: &[JsValue], _cx: &mut Context) -> JsResult<JsValue> {
    let (callable, ms) = timer_args(args)?;
    let extra: Vec<JsValue> = args.iter().skip(2).cloned().collect();
    let id = schedule(callable, extra, ms / 1000.0, true);
    Ok(JsValue::from(id as i32))
}

fn clear_timer(_this: &JsValue, args: &[JsValue], _cx: &mut Context) -> JsResult<JsValue> {
    if let Some(id) = timeout_id(args) {
        let shared = state::with(|s| s.loop_shared());
        shared.timers.borrow_mut().cancel(id);
    }
    Ok(sys::undefined())
}
