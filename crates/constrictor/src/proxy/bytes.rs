//! The immutable-bytes handler: a read-only Uint8Array-shaped view over
//! host bytes.

use boa_engine::NativeFunction;

use crate::error::HostResult;
use crate::host::{HostBytes, HostValue};
use crate::proxy::{
    self, data_descriptor, set_trap, slot_of, trap_key, trap_target, ProxyFamily, TrapKey,
};
use crate::proxy::list::parse_index;
use crate::sys::{self, Context, JsObject, JsResult, JsValue};

/// Create a bytes proxy. The backing ArrayBuffer is captured at creation
/// and rooted in the slot's auxiliary field; finalization releases the host
/// reference and the buffer root together.
pub(crate) fn new_bytes_proxy(context: &mut Context, bytes: &HostBytes) -> HostResult<JsValue> {
    let buffer = sys::array_buffer(context, bytes.to_vec())
        .map_err(|e| crate::error::engine_error(e, context))?;
    proxy::new_proxy_with_aux(
        context,
        HostValue::Bytes(bytes.clone()),
        ProxyFamily::Bytes,
        Some(buffer),
    )
}

pub(crate) fn handler_object(context: &mut Context) -> JsObject {
    let handler = sys::plain_object(context);
    set_trap(context, &handler, "get", NativeFunction::from_fn_ptr(get), 3);
    set_trap(context, &handler, "set", NativeFunction::from_fn_ptr(set), 4);
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
        "ownKeys",
        NativeFunction::from_fn_ptr(own_keys),
        1,
    );
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
        "preventExtensions",
        NativeFunction::from_fn_ptr(prevent_extensions),
        1,
    );
    handler
}

fn bytes_of(
    context: &mut Context,
    args: &[JsValue],
) -> JsResult<(JsObject, HostBytes, Option<JsObject>)> {
    let target = trap_target(args)?;
    let (host, _, aux) = slot_of(context, &target)?;
    match host {
        HostValue::Bytes(bytes) => Ok((target, bytes, aux)),
        other => Err(sys::type_error(format!(
            "bytes proxy backed by {} instead of bytes",
            other.type_name()
        ))),
    }
}

/// Named properties the view exposes besides indices.
fn named_value(
    context: &mut Context,
    bytes: &HostBytes,
    aux: Option<&JsObject>,
    name: &str,
) -> JsResult<Option<JsValue>> {
    Ok(match name {
        "length" | "byteLength" => Some(JsValue::from(bytes.len() as i32)),
        "byteOffset" => Some(JsValue::from(0)),
        "BYTES_PER_ELEMENT" => Some(JsValue::from(1)),
        "buffer" => Some(
            aux.map(|b| JsValue::from(b.clone()))
                .unwrap_or_else(sys::undefined),
        ),
        "constructor" => {
            let global = sys::global_object(context);
            Some(global.get(sys::js_string_key("Uint8Array"), context)?)
        }
        _ => None,
    })
}

fn get(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (target, bytes, aux) = bytes_of(context, args)?;
    match trap_key(args, 1)? {
        key if proxy::is_slot_symbol(&key) => proxy::carrier_of(context, &target),
        TrapKey::Symbol(sym) => target.get(sys::symbol_key(&sym), context),
        TrapKey::Name(name) => {
            if let Some(value) = named_value(context, &bytes, aux.as_ref(), &name)? {
                return Ok(value);
            }
            if let Some(index) = parse_index(&name) {
                return Ok(bytes
                    .byte(index)
                    .map(|b| JsValue::from(b as i32))
                    .unwrap_or_else(sys::undefined));
            }
            target.get(sys::js_string_key(&name), context)
        }
    }
}

fn set(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    // Read only.
    Ok(JsValue::from(false))
}

fn delete_property(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(false))
}

fn get_own_property_descriptor(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let (_, bytes, aux) = bytes_of(context, args)?;
    match trap_key(args, 1)? {
        TrapKey::Symbol(_) => Ok(sys::undefined()),
        TrapKey::Name(name) => {
            if let Some(value) = named_value(context, &bytes, aux.as_ref(), &name)? {
                return data_descriptor(context, value, false, false, true);
            }
            match parse_index(&name).and_then(|i| bytes.byte(i)) {
                Some(byte) => {
                    data_descriptor(context, JsValue::from(byte as i32), false, true, true)
                }
                None => Ok(sys::undefined()),
            }
        }
    }
}

fn own_keys(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, bytes, _) = bytes_of(context, args)?;
    let mut keys: Vec<JsValue> = (0..bytes.len())
        .map(|i| sys::js_str_value(&i.to_string()))
        .collect();
    keys.push(sys::js_str_value("length"));
    Ok(JsValue::from(sys::array_from(context, keys)))
}

fn has(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (target, bytes, _) = bytes_of(context, args)?;
    let answer = match trap_key(args, 1)? {
        key if proxy::is_slot_symbol(&key) => true,
        TrapKey::Symbol(sym) => target.has_property(sys::symbol_key(&sym), context)?,
        TrapKey::Name(name) => {
            matches!(
                name.as_str(),
                "length" | "byteLength" | "byteOffset" | "BYTES_PER_ELEMENT" | "buffer"
                    | "constructor"
            ) || parse_index(&name).is_some_and(|i| i < bytes.len())
                || target.has_property(sys::js_string_key(&name), context)?
        }
    };
    Ok(JsValue::from(answer))
}

fn prevent_extensions(
    _this: &JsValue,
    _args: &[JsValue],
    _context: &mut Context,
) -> JsResult<JsValue> {
    Ok(JsValue::from(false))
}
