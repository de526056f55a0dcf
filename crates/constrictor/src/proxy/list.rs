//! The list handler: exposes a host sequence to JS with Array semantics.
//!
//! Invariant carried from the design: a string index is equivalent to the
//! numeric index ("3" and 3 reach the same slot).

use boa_engine::NativeFunction;

use crate::host::{HostList, HostValue};
use crate::proxy::{
    self, data_descriptor, host_to_js_or_throw, js_to_host_or_throw, set_trap, slot_of,
    trap_key, trap_target, TrapKey,
};
use crate::proxy::list_methods;
use crate::sys::{self, Context, JsObject, JsResult, JsValue};

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

pub(crate) fn list_of(context: &mut Context, args: &[JsValue]) -> JsResult<(JsObject, HostList)> {
    let target = trap_target(args)?;
    let (host, _, _) = slot_of(context, &target)?;
    match host {
        HostValue::List(list) => Ok((target, list)),
        other => Err(sys::type_error(format!(
            "list proxy backed by {} instead of a list",
            other.type_name()
        ))),
    }
}

/// Parse a canonical array index out of a property name.
pub(crate) fn parse_index(name: &str) -> Option<usize> {
    if name == "0" {
        return Some(0);
    }
    if name.starts_with('0') || name.starts_with('-') {
        return None;
    }
    name.parse::<usize>().ok()
}

fn get(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (target, list) = list_of(context, args)?;
    match trap_key(args, 1)? {
        key if proxy::is_slot_symbol(&key) => proxy::carrier_of(context, &target),
        TrapKey::Symbol(sym) => {
            if sym == sys::iterator_symbol() {
                let f = sys::function(
                    context,
                    NativeFunction::from_fn_ptr(list_methods::values),
                    "values",
                    0,
                );
                return Ok(JsValue::from(f));
            }
            target.get(sys::symbol_key(&sym), context)
        }
        TrapKey::Name(name) => {
            if name == "length" {
                return Ok(JsValue::from(list.len() as i32));
            }
            if let Some(index) = parse_index(&name) {
                return match list.get(index) {
                    Some(item) => host_to_js_or_throw(context, &item),
                    None => Ok(sys::undefined()),
                };
            }
            if let Some(f) = list_methods::method_for(&name) {
                return Ok(JsValue::from(sys::function(context, f, &name, 0)));
            }
            // Everything else (constructor included) resolves through the
            // target array's prototype chain. Array.prototype generics that
            // we do not reimplement run against the proxy via its traps.
            target.get(sys::js_string_key(&name), context)
        }
    }
}

fn set(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, list) = list_of(context, args)?;
    let value = args.get(2).cloned().unwrap_or_else(JsValue::undefined);
    match trap_key(args, 1)? {
        TrapKey::Symbol(_) => Ok(JsValue::from(false)),
        TrapKey::Name(name) => {
            if name == "length" {
                let Some(len) = value.as_number().filter(|n| *n >= 0.0) else {
                    return Err(sys::range_error("invalid array length"));
                };
                let len = len as usize;
                list.with_mut(|items| items.resize(len, HostValue::None));
                return Ok(JsValue::from(true));
            }
            match parse_index(&name) {
                Some(index) => {
                    let host = js_to_host_or_throw(context, &value)?;
                    // Writing past the end pads with undefined, then
                    // appends.
                    list.set_padded(index, host);
                    Ok(JsValue::from(true))
                }
                None => Ok(JsValue::from(false)),
            }
        }
    }
}

fn has(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (target, list) = list_of(context, args)?;
    let answer = match trap_key(args, 1)? {
        key if proxy::is_slot_symbol(&key) => true,
        TrapKey::Symbol(sym) => {
            sym == sys::iterator_symbol()
                || target.has_property(sys::symbol_key(&sym), context)?
        }
        TrapKey::Name(name) => {
            name == "length"
                || parse_index(&name).is_some_and(|i| i < list.len())
                || list_methods::method_for(&name).is_some()
                || target.has_property(sys::js_string_key(&name), context)?
        }
    };
    Ok(JsValue::from(answer))
}

fn delete_property(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, list) = list_of(context, args)?;
    if let TrapKey::Name(name) = trap_key(args, 1)? {
        if let Some(index) = parse_index(&name) {
            // Sparse-array semantics: the slot empties, the length stays.
            if index < list.len() {
                list.set(index, HostValue::None);
            }
        }
    }
    Ok(JsValue::from(true))
}

fn own_keys(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, list) = list_of(context, args)?;
    let mut keys: Vec<JsValue> = (0..list.len())
        .map(|i| sys::js_str_value(&i.to_string()))
        .collect();
    keys.push(sys::js_str_value("length"));
    Ok(JsValue::from(sys::array_from(context, keys)))
}

fn get_own_property_descriptor(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let (target, list) = list_of(context, args)?;
    match trap_key(args, 1)? {
        TrapKey::Symbol(sym) => {
            if sym == sys::iterator_symbol() {
                let f = sys::function(
                    context,
                    NativeFunction::from_fn_ptr(list_methods::values),
                    "values",
                    0,
                );
                return data_descriptor(context, JsValue::from(f), true, false, true);
            }
            Ok(sys::undefined())
        }
        TrapKey::Name(name) => {
            if name == "length" {
                // The target array really has a non-configurable `length`,
                // so the report must be non-configurable too.
                return data_descriptor(
                    context,
                    JsValue::from(list.len() as i32),
                    true,
                    false,
                    false,
                );
            }
            if name == "constructor" {
                let ctor = target.get(sys::js_string_key("constructor"), context)?;
                return data_descriptor(context, ctor, true, false, true);
            }
            if let Some(index) = parse_index(&name) {
                return match list.get(index) {
                    Some(item) => {
                        let js = host_to_js_or_throw(context, &item)?;
                        data_descriptor(context, js, true, true, true)
                    }
                    None => Ok(sys::undefined()),
                };
            }
            if let Some(f) = list_methods::method_for(&name) {
                let func = sys::function(context, f, &name, 0);
                return data_descriptor(context, JsValue::from(func), false, true, true);
            }
            Ok(sys::undefined())
        }
    }
}

fn define_property(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, list) = list_of(context, args)?;
    // Only integer ids can be defined; everything else is blocked.
    let TrapKey::Name(name) = trap_key(args, 1)? else {
        return Ok(JsValue::from(false));
    };
    let Some(index) = parse_index(&name) else {
        return Ok(JsValue::from(false));
    };
    let Some(desc) = args.get(2).and_then(JsValue::as_object) else {
        return Ok(JsValue::from(false));
    };
    let value = desc.get(sys::js_string_key("value"), context)?;
    let host = js_to_host_or_throw(context, &value)?;
    list.set_padded(index, host);
    Ok(JsValue::from(true))
}

fn prevent_extensions(
    _this: &JsValue,
    _args: &[JsValue],
    _context: &mut Context,
) -> JsResult<JsValue> {
    Ok(JsValue::from(false))
}
