//! `internalBinding(namespace)`: native plumbing exposed to JS by
//! namespace, for the built-in layers above the bridge.

mod timers;
mod utils;

use boa_engine::NativeFunction;

use crate::sys::{self, Context, JsObject, JsResult, JsValue};

pub(crate) use timers::install_timer_globals;

/// The namespace object for `namespace`, or `null` when unknown.
pub(crate) fn namespace_object(context: &mut Context, namespace: &str) -> JsResult<JsValue> {
    let populate: fn(&mut Context, &JsObject) = match namespace {
        "utils" => utils::populate,
        "timers" => timers::populate,
        _ => return Ok(JsValue::null()),
    };
    let object = sys::plain_object(context);
    populate(context, &object);
    Ok(JsValue::from(object))
}

/// Install the JS-side `internalBinding` global.
pub(crate) fn install_internal_binding(context: &mut Context) {
    let f = sys::function(
        context,
        NativeFunction::from_fn_ptr(internal_binding_fn),
        "internalBinding",
        1,
    );
    let global = sys::global_object(context);
    let _ = global.set(
        sys::js_string_key("internalBinding"),
        JsValue::from(f),
        false,
        context,
    );
}

fn internal_binding_fn(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let namespace = args
        .first()
        .and_then(JsValue::as_string)
        .map(sys::decode_js_string)
        .unwrap_or_default();
    namespace_object(context, &namespace)
}

/// Define a function-valued property on a binding namespace object.
pub(crate) fn bind_fn(
    context: &mut Context,
    object: &JsObject,
    name: &str,
    f: NativeFunction,
    length: usize,
) {
    let func = sys::function(context, f, name, length);
    let _ = object.set(sys::js_string_key(name), JsValue::from(func), false, context);
}
