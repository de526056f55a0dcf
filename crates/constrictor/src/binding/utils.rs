//! `internalBinding("utils")`.

use boa_engine::NativeFunction;

use crate::convert;
use crate::runtime::state;
use crate::sys::{self, Context, JsObject, JsResult, JsValue};

pub(crate) fn populate(context: &mut Context, object: &JsObject) {
    super::bind_fn(
        context,
        object,
        "defineGlobal",
        NativeFunction::from_fn_ptr(define_global),
        2,
    );
    super::bind_fn(
        context,
        object,
        "isAnyArrayBuffer",
        NativeFunction::from_fn_ptr(is_any_array_buffer),
        1,
    );
    super::bind_fn(
        context,
        object,
        "isPromise",
        NativeFunction::from_fn_ptr(is_promise),
        1,
    );
    super::bind_fn(
        context,
        object,
        "isRegExp",
        NativeFunction::from_fn_ptr(is_regexp),
        1,
    );
    super::bind_fn(
        context,
        object,
        "isTypedArray",
        NativeFunction::from_fn_ptr(is_typed_array),
        1,
    );
    super::bind_fn(
        context,
        object,
        "getPromiseDetails",
        NativeFunction::from_fn_ptr(get_promise_details),
        1,
    );
    super::bind_fn(
        context,
        object,
        "getProxyDetails",
        NativeFunction::from_fn_ptr(get_proxy_details),
        1,
    );
}

fn define_global(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let name = args
        .first()
        .and_then(JsValue::as_string)
        .map(sys::decode_js_string)
        .ok_or_else(|| sys::type_error("defineGlobal expects a string name"))?;
    let value = args.get(1).cloned().unwrap_or_else(JsValue::undefined);
    let global = sys::global_object(context);
    global.set(sys::js_string_key(&name), value, false, context)?;
    Ok(sys::undefined())
}

fn arg_object(args: &[JsValue]) -> Option<JsObject> {
    args.first().and_then(JsValue::as_object).cloned()
}

fn is_any_array_buffer(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let helpers = state::with(|s| s.helpers());
    let value = args.first().cloned().unwrap_or_else(JsValue::undefined);
    helpers.call(context, "isAnyArrayBuffer", &[value])
}

fn is_promise(_this: &JsValue, args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    let answer = arg_object(args).is_some_and(|o| sys::is_promise(&o));
    Ok(JsValue::from(answer))
}

fn is_regexp(_this: &JsValue, args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    let answer = arg_object(args).is_some_and(|o| sys::is_regexp(&o));
    Ok(JsValue::from(answer))
}

fn is_typed_array(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let helpers = state::with(|s| s.helpers());
    let value = args.first().cloned().unwrap_or_else(JsValue::undefined);
    helpers.call(context, "isTypedArray", &[value])
}

/// `[state, value]` for a promise (0 pending, 1 fulfilled, 2 rejected);
/// `undefined` for anything else.
fn get_promise_details(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let Some(object) = arg_object(args) else {
        return Ok(sys::undefined());
    };
    match convert::promise_details(&object) {
        Some((status, value)) => {
            let mut items = vec![JsValue::from(status as i32)];
            if let Some(value) = value {
                items.push(value);
            }
            Ok(JsValue::from(sys::array_from(context, items)))
        }
        None => Ok(sys::undefined()),
    }
}

/// `[target, handler]` for a scripted proxy, `undefined` otherwise. Served
/// by the bootstrap-wrapped `Proxy` constructor's detail table.
fn get_proxy_details(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let helpers = state::with(|s| s.helpers());
    let value = args.first().cloned().unwrap_or_else(JsValue::undefined);
    helpers.call(context, "proxyDetails", &[value])
}
