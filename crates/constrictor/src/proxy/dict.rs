//! The mapping handler: exposes a host dict to JS.

use boa_engine::NativeFunction;

use crate::host::{DictKey, HostValue};
use crate::proxy::{
    self, data_descriptor, host_to_js_or_throw, js_to_host_or_throw, set_trap, slot_of,
    trap_key, trap_target, TrapKey,
};
use crate::sys::{self, Context, JsObject, JsResult, JsValue};

/// Build the mapping handler object (one per runtime).
pub(crate) fn handler_object(context: &mut Context) -> JsObject {
    let handler = sys::plain_object(context);
    set_trap(context, &handler, "get", NativeFunction::from_fn_ptr(get), 3);
    set_trap(context, &handler, "set", NativeFunction::from_fn_ptr(set), 4);
    set_trap(context, &handler, "has", NativeFunction::from_fn_ptr(has), 2);
    set_trap(
        context,
        &handler,
        "deleteProperty",
        NativeFunction::from_fn_ptr(delete_property),
        2,
    );
    set_trap(
        context,
        &handler,
        "ownKeys",
        NativeFunction::from_fn_ptr(own_keys),
        1,
    );
    set_trap(
        context,
        &handler,
        "getOwnPropertyDescriptor",
        NativeFunction::from_fn_ptr(get_own_property_descriptor),
        2,
    );
    set_trap(
        context,
        &handler,
        "defineProperty",
        NativeFunction::from_fn_ptr(define_property),
        3,
    );
    set_trap(
        context,
        &handler,
        "preventExtensions",
        NativeFunction::from_fn_ptr(prevent_extensions),
        1,
    );
    handler
}

fn dict_of(context: &mut Context, args: &[JsValue]) -> JsResult<(JsObject, crate::host::HostDict)> {
    let target = trap_target(args)?;
    let (host, _, _) = slot_of(context, &target)?;
    match host {
        HostValue::Dict(dict) => Ok((target, dict)),
        other => Err(sys::type_error(format!(
            "mapping proxy backed by {} instead of a dict",
            other.type_name()
        ))),
    }
}

/// Prototype methods served ahead of dict entries.
const OBJECT_METHODS: &[(&str, fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>)] = &[
    ("toString", object_to_string),
    ("toLocaleString", object_to_string),
    ("valueOf", object_value_of),
];

fn object_to_string(_: &JsValue, _: &[JsValue], _: &mut Context) -> JsResult<JsValue> {
    Ok(sys::js_str_value("[object Object]"))
}

fn object_value_of(this: &JsValue, _: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    // `this` is the proxy; valueOf answers the proxied host value itself.
    let Some(object) = this.as_object() else {
        return Ok(sys::undefined());
    };
    match proxy::unwrap_bridge_object(context, object) {
        Some(host) => host_to_js_or_throw(context, &host),
        None => Ok(this.clone()),
    }
}

fn method_for(name: &str) -> Option<NativeFunction> {
    OBJECT_METHODS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| NativeFunction::from_fn_ptr(*f))
}

fn get(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (target, dict) = dict_of(context, args)?;
    match trap_key(args, 1)? {
        key if proxy::is_slot_symbol(&key) => proxy::carrier_of(context, &target),
        TrapKey::Symbol(_) => Ok(sys::undefined()),
        TrapKey::Name(name) => {
            // Prototype-method table first, then the dict, then the
            // target's prototype chain so `Object.prototype` methods stay
            // reachable.
            if let Some(f) = method_for(&name) {
                return Ok(JsValue::from(sys::function(context, f, &name, 0)));
            }
            if let Some(value) = dict.get(&DictKey::from_property(&name)) {
                return host_to_js_or_throw(context, &value);
            }
            target.get(sys::js_string_key(&name), context)
        }
    }
}

fn set(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, dict) = dict_of(context, args)?;
    let key = match trap_key(args, 1)? {
        TrapKey::Name(name) => DictKey::from_property(&name),
        TrapKey::Symbol(_) => {
            return Err(sys::type_error("can't set interposed symbol property"))
        }
    };
    let value = args.get(2).cloned().unwrap_or_else(JsValue::undefined);
    let host = js_to_host_or_throw(context, &value)?;
    dict.insert(key, host);
    Ok(JsValue::from(true))
}

fn has(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, dict) = dict_of(context, args)?;
    let answer = match trap_key(args, 1)? {
        key if proxy::is_slot_symbol(&key) => true,
        TrapKey::Symbol(_) => false,
        TrapKey::Name(name) => dict.contains(&DictKey::from_property(&name)),
    };
    Ok(JsValue::from(answer))
}

fn delete_property(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, dict) = dict_of(context, args)?;
    let removed = match trap_key(args, 1)? {
        TrapKey::Symbol(_) => false,
        TrapKey::Name(name) => dict.remove(&DictKey::from_property(&name)).is_some(),
    };
    // A missing key can't be deleted; the false answer surfaces as a
    // TypeError in strict mode.
    Ok(JsValue::from(removed))
}

fn own_keys(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, dict) = dict_of(context, args)?;
    let keys = dict
        .keys()
        .into_iter()
        .map(|k| sys::js_str_value(&k.to_string()))
        .collect::<Vec<_>>();
    Ok(JsValue::from(sys::array_from(context, keys)))
}

fn get_own_property_descriptor(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let (_, dict) = dict_of(context, args)?;
    match trap_key(args, 1)? {
        TrapKey::Symbol(_) => Ok(sys::undefined()),
        TrapKey::Name(name) => {
            // Prototype-method table first, then the dict; a missing key
            // reports no descriptor (JS `undefined`).
            if let Some(f) = method_for(&name) {
                let func = sys::function(context, f, &name, 0);
                return data_descriptor(context, JsValue::from(func), false, true, true);
            }
            match dict.get(&DictKey::from_property(&name)) {
                Some(value) => {
                    let js = host_to_js_or_throw(context, &value)?;
                    data_descriptor(context, js, true, true, true)
                }
                None => Ok(sys::undefined()),
            }
        }
    }
}

fn define_property(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    // Direct defineProperty is blocked; mutation goes through `set`.
    Ok(JsValue::from(false))
}

fn prevent_extensions(
    _this: &JsValue,
    _args: &[JsValue],
    _context: &mut Context,
) -> JsResult<JsValue> {
    // Refused: the engine's proxy invariants do not allow reporting
    // success without freezing the target, which would pin the key set.
    Ok(JsValue::from(false))
}
