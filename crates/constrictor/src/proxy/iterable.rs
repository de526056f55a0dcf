//! The iterable handler: exposes a host iterator to JS.
//!
//! The proxy answers `Symbol.iterator` with a function producing an
//! iterator object whose `next` drives the host iterator protocol,
//! reporting `{done: true}` once the host side is exhausted. The proxy
//! itself also answers `next`, so a host iterator can be consumed directly.

use boa_engine::NativeFunction;

use crate::host::{HostIter, HostValue};
use crate::proxy::{
    self, data_descriptor, host_to_js_or_throw, set_trap, slot_of, trap_key, trap_target,
    TrapKey,
};
use crate::sys::{self, Context, JsObject, JsResult, JsValue};

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
        "preventExtensions",
        NativeFunction::from_fn_ptr(prevent_extensions),
        1,
    );
    handler
}

fn iter_of(context: &mut Context, args: &[JsValue]) -> JsResult<(JsObject, HostIter)> {
    let target = trap_target(args)?;
    let (host, _, _) = slot_of(context, &target)?;
    match host {
        HostValue::Iter(iter) => Ok((target, iter)),
        other => Err(sys::type_error(format!(
            "iterable proxy backed by {} instead of an iterator",
            other.type_name()
        ))),
    }
}

#[derive(boa_gc::Trace, boa_gc::Finalize, boa_engine::JsData)]
struct IterableIteratorSlot {
    #[unsafe_ignore_trace]
    iter: HostIter,
}

/// Build the `IterableIterator` object returned by `[Symbol.iterator]()`.
fn iterable_iterator(context: &mut Context, iter: HostIter) -> JsResult<JsValue> {
    let object = sys::slot_object(IterableIteratorSlot { iter });
    let next = sys::function(context, NativeFunction::from_fn_ptr(iterator_next), "next", 0);
    object.set(sys::js_string_key("next"), JsValue::from(next), false, context)?;
    let self_fn = sys::function(
        context,
        NativeFunction::from_fn_ptr(iterator_self),
        "[Symbol.iterator]",
        0,
    );
    let iterator = sys::iterator_symbol();
    object.set(sys::symbol_key(&iterator), JsValue::from(self_fn), false, context)?;
    Ok(JsValue::from(object))
}

fn iterator_self(this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(this.clone())
}

fn next_result(context: &mut Context, iter: &HostIter) -> JsResult<JsValue> {
    let result = sys::plain_object(context);
    match iter.next() {
        Some(item) => {
            let value = host_to_js_or_throw(context, &item)?;
            result.set(sys::js_string_key("value"), value, false, context)?;
            result.set(
                sys::js_string_key("done"),
                JsValue::from(false),
                false,
                context,
            )?;
        }
        None => {
            result.set(
                sys::js_string_key("done"),
                JsValue::from(true),
                false,
                context,
            )?;
        }
    }
    Ok(JsValue::from(result))
}

fn iterator_next(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let object = this
        .as_object()
        .ok_or_else(|| sys::type_error("next called on a non-object"))?;
    let iter = object
        .downcast_ref::<IterableIteratorSlot>()
        .map(|slot| slot.iter.clone())
        .ok_or_else(|| sys::type_error("next called on a foreign object"))?;
    next_result(context, &iter)
}

/// `next` on the proxy itself: drive the underlying host iterator.
fn proxy_next(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let object = this
        .as_object()
        .ok_or_else(|| sys::type_error("next called on a non-object"))?;
    match proxy::unwrap_bridge_object(context, object) {
        Some(HostValue::Iter(iter)) => next_result(context, &iter),
        _ => Err(sys::type_error("next called on a foreign object")),
    }
}

/// `[Symbol.iterator]` on the proxy: wrap the host iterator.
fn make_iterator(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let object = this
        .as_object()
        .ok_or_else(|| sys::type_error("iterator request on a non-object"))?;
    match proxy::unwrap_bridge_object(context, object) {
        Some(HostValue::Iter(iter)) => iterable_iterator(context, iter),
        _ => Err(sys::type_error("iterator request on a foreign object")),
    }
}

/// String form for coercion contexts.
fn iterable_repr(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(sys::js_str_value("<host iterator>"))
}

fn get(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (target, _) = iter_of(context, args)?;
    match trap_key(args, 1)? {
        key if proxy::is_slot_symbol(&key) => proxy::carrier_of(context, &target),
        TrapKey::Symbol(sym) => {
            if sym == sys::iterator_symbol() {
                let f = sys::function(
                    context,
                    NativeFunction::from_fn_ptr(make_iterator),
                    "[Symbol.iterator]",
                    0,
                );
                return Ok(JsValue::from(f));
            }
            if sym == sys::to_primitive_symbol() {
                let f = sys::function(
                    context,
                    NativeFunction::from_fn_ptr(iterable_repr),
                    "[Symbol.toPrimitive]",
                    0,
                );
                return Ok(JsValue::from(f));
            }
            target.get(sys::symbol_key(&sym), context)
        }
        TrapKey::Name(name) => match name.as_str() {
            "next" => Ok(JsValue::from(sys::function(
                context,
                NativeFunction::from_fn_ptr(proxy_next),
                "next",
                0,
            ))),
            "valueOf" => Ok(JsValue::from(sys::function(
                context,
                NativeFunction::from_fn_ptr(iterable_repr),
                "valueOf",
                0,
            ))),
            _ => target.get(sys::js_string_key(&name), context),
        },
    }
}

fn set(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(false))
}

fn get_own_property_descriptor(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let (_, _) = iter_of(context, args)?;
    match trap_key(args, 1)? {
        TrapKey::Symbol(sym) if sym == sys::iterator_symbol() => {
            let f = sys::function(
                context,
                NativeFunction::from_fn_ptr(make_iterator),
                "[Symbol.iterator]",
                0,
            );
            data_descriptor(context, JsValue::from(f), false, false, true)
        }
        TrapKey::Name(name) if name == "next" => {
            let f = sys::function(context, NativeFunction::from_fn_ptr(proxy_next), "next", 0);
            data_descriptor(context, JsValue::from(f), false, false, true)
        }
        _ => Ok(sys::undefined()),
    }
}

fn own_keys(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (_, _) = iter_of(context, args)?;
    let keys = vec![sys::js_str_value("next")];
    Ok(JsValue::from(sys::array_from(context, keys)))
}

fn has(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let (target, _) = iter_of(context, args)?;
    let answer = match trap_key(args, 1)? {
        key if proxy::is_slot_symbol(&key) => true,
        TrapKey::Symbol(sym) => {
            sym == sys::iterator_symbol()
                || target.has_property(sys::symbol_key(&sym), context)?
        }
        TrapKey::Name(name) => {
            name == "next" || target.has_property(sys::js_string_key(&name), context)?
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
