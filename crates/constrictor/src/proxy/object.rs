//! The generic object handler: attribute forwarding for arbitrary host
//! objects.

use boa_engine::NativeFunction;

use crate::host::{HostObject, HostValue};
use crate::proxy::{
    self, data_descriptor, host_to_js_or_throw, js_to_host_or_throw, set_trap, slot_of,
    trap_key, trap_target, TrapKey,
};
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
        "preventExtensions",
        NativeFunction::from_fn_ptr(prevent_extensions),
        1,
    );
    handler
}

fn object_of(context: &mut Context, args: &[JsValue]) -> JsResult<(JsObject, HostObject)> {
    let target = trap_target(args)?;
    let (host, _, _) = slot_of(context, &target)?;
    match host {
        HostValue::Object(object) => Ok((target, object)),
        other => Err(sys::type_error(format!(
            "object proxy backed by {} instead of an object",
            other.type_name()
        ))),
    }
}

fn object_to_string(this: &JsValue, _: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let Some(object) = this.as_object() else {
        return Ok(sys::js_str_value("[object Object]"));
    };
    match proxy::unwrap_bridge_object(context, object) {
        Some(HostValue::Object(o)) => {
            Ok(sys::js_str_value(&format!("<{} object>", o.class_name())))
        }
        _ => Ok(sys::js_str_value("[object Object]")),
    }
}

fn object_value_of(this: &JsValue, _: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let Some(object) = this.as_object() else {
        return Ok(sys::undefined());
    };
    match proxy::unwrap_bridge_object(context, object) {
        Some(host) => host_to_js_or_throw(context, &host),
        None => Ok(this.clone()),
    }
}

fn method_for(name: &str) -> Option<NativeFunction> {
    match name {
        "toString" | "toLocaleString" => Some(NativeFunction::from_fn_ptr(object_to_string)),
        "valueOf" => Some(NativeFunction::from_fn_ptr(object_value_of)),
        _ => None,
    }
}

fn get(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (target, object) = object_of(context, args)?;
    match trap_key(args, 1)? {
        key if proxy::is_slot_symbol(&key) => proxy::carrier_of(context, &target),
        TrapKey::Symbol(sym) => target.get(sys::symbol_key(&sym), context),
        TrapKey::Name(name) => {
            if let Some(value) = object.get_attr(&name) {
                return host_to_js_or_throw(context, &value);
            }
            if let Some(f) = method_for(&name) {
                return Ok(JsValue::from(sys::function(context, f, &name, 0)));
            }
            target.get(sys::js_string_key(&name), context)
        }
    }
}

fn set(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, object) = object_of(context, args)?;
    let TrapKey::Name(name) = trap_key(args, 1)? else {
        return Err(sys::type_error("can't set interposed symbol attribute"));
    };
    let value = args.get(2).cloned().unwrap_or_else(JsValue::undefined);
    let host = js_to_host_or_throw(context, &value)?;
    object.set_attr(&name, host);
    Ok(JsValue::from(true))
}

fn has(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, object) = object_of(context, args)?;
    let answer = match trap_key(args, 1)? {
        key if proxy::is_slot_symbol(&key) => true,
        TrapKey::Symbol(_) => false,
        TrapKey::Name(name) => object.get_attr(&name).is_some(),
    };
    Ok(JsValue::from(answer))
}

fn delete_property(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, object) = object_of(context, args)?;
    let removed = match trap_key(args, 1)? {
        TrapKey::Symbol(_) => false,
        TrapKey::Name(name) => object.attrs().remove(&name.as_str().into()).is_some(),
    };
    Ok(JsValue::from(removed))
}

fn own_keys(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, object) = object_of(context, args)?;
    let keys = object
        .attrs()
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
    let (_, object) = object_of(context, args)?;
    match trap_key(args, 1)? {
        TrapKey::Symbol(_) => Ok(sys::undefined()),
        TrapKey::Name(name) => {
            if let Some(value) = object.get_attr(&name) {
                let js = host_to_js_or_throw(context, &value)?;
                return data_descriptor(context, js, true, true, true);
            }
            if let Some(f) = method_for(&name) {
                let func = sys::function(context, f, &name, 0);
                return data_descriptor(context, JsValue::from(func), false, true, true);
            }
            Ok(sys::undefined())
        }
    }
}

fn prevent_extensions(
    _this: &JsValue,
    _args: &[JsValue],
    _context: &mut Context,
) -> JsResult<JsValue> {
    Ok(JsValue::from(false))
}
