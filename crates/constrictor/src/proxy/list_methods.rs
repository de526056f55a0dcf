//! The Array method table served by the list handler.
//!
//! Each method runs natively against the host list, matching what the same
//! method would produce on a plain JS array of identical content.

use std::cell::Cell;

use boa_engine::NativeFunction;

use crate::context::Cx;
use crate::host::{HostList, HostValue};
use crate::proxy::{self, host_to_js_or_throw, js_to_host_or_throw};
use crate::sys::{self, Context, JsObject, JsResult, JsValue};

type Native = fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>;

const METHODS: &[(&str, Native)] = &[
    ("reverse", reverse),
    ("pop", pop),
    ("push", push),
    ("shift", shift),
    ("unshift", unshift),
    ("concat", concat),
    ("slice", slice),
    ("indexOf", index_of),
    ("lastIndexOf", last_index_of),
    ("splice", splice),
    ("sort", sort),
    ("fill", fill),
    ("copyWithin", copy_within),
    ("includes", includes),
    ("forEach", for_each),
    ("map", map),
    ("filter", filter),
    ("reduce", reduce),
    ("reduceRight", reduce_right),
    ("some", some),
    ("every", every),
    ("find", find),
    ("findIndex", find_index),
    ("flat", flat),
    ("flatMap", flat_map),
    ("join", join),
    ("toString", to_string),
    ("toLocaleString", to_string),
    ("valueOf", value_of),
    ("entries", entries),
    ("keys", keys),
    ("values", values),
];

pub(crate) fn method_for(name: &str) -> Option<NativeFunction> {
    METHODS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| NativeFunction::from_fn_ptr(*f))
}

/// The host list behind the method receiver.
fn this_list(this: &JsValue, context: &mut Context) -> JsResult<HostList> {
    let object = this
        .as_object()
        .ok_or_else(|| sys::type_error("array method called on a non-object"))?;
    match proxy::unwrap_bridge_object(context, object) {
        Some(HostValue::List(list)) => Ok(list),
        _ => Err(sys::type_error("array method called on a foreign object")),
    }
}

/// Clamp a possibly-negative relative index to `[0, len]`.
fn relative_index(arg: Option<f64>, default: f64, len: usize) -> usize {
    let len_f = len as f64;
    let idx = arg.unwrap_or(default);
    let idx = if idx < 0.0 { len_f + idx } else { idx };
    idx.clamp(0.0, len_f) as usize
}

fn arg_f64(args: &[JsValue], index: usize) -> Option<f64> {
    args.get(index).and_then(JsValue::as_number)
}

fn arg_present(args: &[JsValue], index: usize) -> bool {
    args.get(index).is_some_and(|v| !v.is_undefined())
}

/// The callback and its `this` value for a callback-taking method. A
/// supplied `thisArg` rebinds bound-method host callables to the new
/// receiver before the callback is used.
fn prepare_callback(
    context: &mut Context,
    args: &[JsValue],
) -> JsResult<(JsObject, JsValue)> {
    let callback = args
        .first()
        .and_then(JsValue::as_callable)
        .cloned()
        .ok_or_else(|| sys::type_error("callback is not a function"))?;
    let this_arg = args.get(1).cloned().unwrap_or_else(JsValue::undefined);
    if this_arg.is_undefined() {
        return Ok((callback, this_arg));
    }
    if let Some(HostValue::Func(f)) = proxy::unwrap_bridge_object(context, &callback) {
        if f.is_bound() {
            let receiver = js_to_host_or_throw(context, &this_arg)?;
            let rebound = f.rebind(receiver);
            let rewrapped = crate::convert::wrap_host_fn(context, &rebound)
                .map_err(|e| crate::error::throw_into_js(&e))?;
            let rewrapped = rewrapped
                .as_object()
                .cloned()
                .ok_or_else(|| sys::type_error("rebinding produced a non-function"))?;
            return Ok((rewrapped, this_arg));
        }
    }
    Ok((callback, this_arg))
}

fn call_cb(
    context: &mut Context,
    callback: &JsObject,
    this_arg: &JsValue,
    item: &HostValue,
    index: usize,
    receiver: &JsValue,
) -> JsResult<JsValue> {
    let elem = host_to_js_or_throw(context, item)?;
    callback.call(
        this_arg,
        &[elem, JsValue::from(index as i32), receiver.clone()],
        context,
    )
}

/// ECMA `ToString` of a host element for `join`: the host's none/null cross
/// as undefined/null and render empty.
fn element_string(context: &mut Context, item: &HostValue) -> JsResult<String> {
    match item {
        HostValue::None | HostValue::Null => Ok(String::new()),
        other => {
            let js = host_to_js_or_throw(context, other)?;
            let s = js.to_string(context)?;
            Ok(sys::decode_js_string(&s))
        }
    }
}

fn new_list_value(context: &mut Context, items: Vec<HostValue>) -> JsResult<JsValue> {
    host_to_js_or_throw(context, &HostValue::List(HostList::from_iter(items)))
}

// --- mutators ---------------------------------------------------------------

fn reverse(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    list.with_mut(|items| items.reverse());
    Ok(this.clone())
}

fn pop(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    match list.with_mut(|items| items.pop()) {
        Some(item) => host_to_js_or_throw(context, &item),
        None => Ok(sys::undefined()),
    }
}

fn push(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    for arg in args {
        let host = js_to_host_or_throw(context, arg)?;
        list.push(host);
    }
    Ok(JsValue::from(list.len() as i32))
}

fn shift(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let first = list.with_mut(|items| {
        if items.is_empty() {
            None
        } else {
            Some(items.remove(0))
        }
    });
    match first {
        Some(item) => host_to_js_or_throw(context, &item),
        None => Ok(sys::undefined()),
    }
}

fn unshift(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let mut converted = Vec::with_capacity(args.len());
    for arg in args {
        converted.push(js_to_host_or_throw(context, arg)?);
    }
    list.with_mut(|items| items.splice(0..0, converted));
    Ok(JsValue::from(list.len() as i32))
}

fn splice(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let len = list.len();
    let start = relative_index(arg_f64(args, 0), 0.0, len);
    let delete_count = if arg_present(args, 1) {
        let n = arg_f64(args, 1).unwrap_or(0.0).max(0.0) as usize;
        n.min(len - start)
    } else {
        len - start
    };
    let mut inserted = Vec::new();
    for arg in args.iter().skip(2) {
        inserted.push(js_to_host_or_throw(context, arg)?);
    }
    let removed: Vec<HostValue> =
        list.with_mut(|items| items.splice(start..start + delete_count, inserted).collect());
    new_list_value(context, removed)
}

fn fill(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let len = list.len();
    let value = js_to_host_or_throw(context, &args.first().cloned().unwrap_or_else(JsValue::undefined))?;
    let start = relative_index(arg_f64(args, 1), 0.0, len);
    let end = relative_index(arg_f64(args, 2), len as f64, len);
    list.with_mut(|items| {
        for slot in &mut items[start..end.max(start)] {
            *slot = value.clone();
        }
    });
    Ok(this.clone())
}

fn copy_within(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let len = list.len();
    let target = relative_index(arg_f64(args, 0), 0.0, len);
    let start = relative_index(arg_f64(args, 1), 0.0, len);
    let end = relative_index(arg_f64(args, 2), len as f64, len);
    list.with_mut(|items| {
        let window: Vec<HostValue> = items[start..end.max(start)].to_vec();
        for (offset, item) in window.into_iter().enumerate() {
            let dst = target + offset;
            if dst >= len {
                break;
            }
            items[dst] = item;
        }
    });
    Ok(this.clone())
}

// --- accessors --------------------------------------------------------------

fn concat(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let mut out = list.to_vec();
    for arg in args {
        let host = js_to_host_or_throw(context, arg)?;
        // Depth-1 flattening of host lists and list proxies (plain JS
        // arrays arrive as array proxies).
        match host {
            HostValue::List(l) => out.extend(l.to_vec()),
            HostValue::ArrayProxy(a) => {
                let mut cx = Cx::new(context);
                let items = a
                    .to_vec(&mut cx)
                    .map_err(|e| crate::error::throw_into_js(&e))?;
                out.extend(items);
            }
            other => out.push(other),
        }
    }
    new_list_value(context, out)
}

fn slice(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let len = list.len();
    let start = relative_index(arg_f64(args, 0), 0.0, len);
    let end = relative_index(arg_f64(args, 1), len as f64, len);
    let items = list.to_vec()[start..end.max(start)].to_vec();
    new_list_value(context, items)
}

fn index_of(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let needle = js_to_host_or_throw(context, &args.first().cloned().unwrap_or_else(JsValue::undefined))?;
    let from = relative_index(arg_f64(args, 1), 0.0, list.len());
    let found = list
        .to_vec()
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, item)| **item == needle)
        .map(|(i, _)| i as i32)
        .unwrap_or(-1);
    Ok(JsValue::from(found))
}

fn last_index_of(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let needle = js_to_host_or_throw(context, &args.first().cloned().unwrap_or_else(JsValue::undefined))?;
    let found = list
        .to_vec()
        .iter()
        .rposition(|item| *item == needle)
        .map(|i| i as i32)
        .unwrap_or(-1);
    Ok(JsValue::from(found))
}

fn includes(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let needle = js_to_host_or_throw(context, &args.first().cloned().unwrap_or_else(JsValue::undefined))?;
    Ok(JsValue::from(list.to_vec().contains(&needle)))
}

fn join(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let sep = match args.first() {
        Some(v) if !v.is_undefined() => sys::decode_js_string(&v.to_string(context)?),
        _ => ",".to_string(),
    };
    let mut parts = Vec::with_capacity(list.len());
    for item in list.to_vec() {
        parts.push(element_string(context, &item)?);
    }
    Ok(sys::js_str_value(&parts.join(&sep)))
}

fn to_string(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    join(this, &[], context)
}

fn value_of(this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(this.clone())
}

// --- callback-taking methods ------------------------------------------------

fn for_each(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let (cb, this_arg) = prepare_callback(context, args)?;
    for (i, item) in list.to_vec().iter().enumerate() {
        call_cb(context, &cb, &this_arg, item, i, this)?;
    }
    Ok(sys::undefined())
}

fn map(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let (cb, this_arg) = prepare_callback(context, args)?;
    let mut out = Vec::with_capacity(list.len());
    for (i, item) in list.to_vec().iter().enumerate() {
        let mapped = call_cb(context, &cb, &this_arg, item, i, this)?;
        out.push(js_to_host_or_throw(context, &mapped)?);
    }
    new_list_value(context, out)
}

fn filter(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let (cb, this_arg) = prepare_callback(context, args)?;
    let mut out = Vec::new();
    for (i, item) in list.to_vec().iter().enumerate() {
        if call_cb(context, &cb, &this_arg, item, i, this)?.to_boolean() {
            out.push(item.clone());
        }
    }
    new_list_value(context, out)
}

fn reduce(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let cb = args
        .first()
        .and_then(JsValue::as_callable)
        .cloned()
        .ok_or_else(|| sys::type_error("callback is not a function"))?;
    let items = list.to_vec();
    let mut iter = items.iter().enumerate();
    let mut acc = if arg_present(args, 1) {
        js_to_host_or_throw(context, &args[1])?
    } else {
        match iter.next() {
            Some((_, first)) => first.clone(),
            None => return Err(sys::type_error("reduce of empty array with no initial value")),
        }
    };
    for (i, item) in iter {
        let acc_js = host_to_js_or_throw(context, &acc)?;
        let elem = host_to_js_or_throw(context, item)?;
        let next = cb.call(
            &sys::undefined(),
            &[acc_js, elem, JsValue::from(i as i32), this.clone()],
            context,
        )?;
        acc = js_to_host_or_throw(context, &next)?;
    }
    host_to_js_or_throw(context, &acc)
}

fn reduce_right(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let cb = args
        .first()
        .and_then(JsValue::as_callable)
        .cloned()
        .ok_or_else(|| sys::type_error("callback is not a function"))?;
    let items = list.to_vec();
    let mut iter = items.iter().enumerate().rev();
    let mut acc = if arg_present(args, 1) {
        js_to_host_or_throw(context, &args[1])?
    } else {
        match iter.next() {
            Some((_, last)) => last.clone(),
            None => {
                return Err(sys::type_error(
                    "reduceRight of empty array with no initial value",
                ))
            }
        }
    };
    for (i, item) in iter {
        let acc_js = host_to_js_or_throw(context, &acc)?;
        let elem = host_to_js_or_throw(context, item)?;
        let next = cb.call(
            &sys::undefined(),
            &[acc_js, elem, JsValue::from(i as i32), this.clone()],
            context,
        )?;
        acc = js_to_host_or_throw(context, &next)?;
    }
    host_to_js_or_throw(context, &acc)
}

fn some(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let (cb, this_arg) = prepare_callback(context, args)?;
    for (i, item) in list.to_vec().iter().enumerate() {
        if call_cb(context, &cb, &this_arg, item, i, this)?.to_boolean() {
            return Ok(JsValue::from(true));
        }
    }
    Ok(JsValue::from(false))
}

fn every(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let (cb, this_arg) = prepare_callback(context, args)?;
    for (i, item) in list.to_vec().iter().enumerate() {
        if !call_cb(context, &cb, &this_arg, item, i, this)?.to_boolean() {
            return Ok(JsValue::from(false));
        }
    }
    Ok(JsValue::from(true))
}

fn find(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let (cb, this_arg) = prepare_callback(context, args)?;
    for (i, item) in list.to_vec().iter().enumerate() {
        if call_cb(context, &cb, &this_arg, item, i, this)?.to_boolean() {
            return host_to_js_or_throw(context, item);
        }
    }
    Ok(sys::undefined())
}

fn find_index(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let (cb, this_arg) = prepare_callback(context, args)?;
    for (i, item) in list.to_vec().iter().enumerate() {
        if call_cb(context, &cb, &this_arg, item, i, this)?.to_boolean() {
            return Ok(JsValue::from(i as i32));
        }
    }
    Ok(JsValue::from(-1))
}

fn flatten(
    context: &mut Context,
    items: &[HostValue],
    depth: f64,
    out: &mut Vec<HostValue>,
) -> JsResult<()> {
    for item in items {
        let nested = match item {
            HostValue::List(l) if depth >= 1.0 => Some(l.to_vec()),
            HostValue::ArrayProxy(a) if depth >= 1.0 => {
                let mut cx = Cx::new(context);
                Some(a.to_vec(&mut cx).map_err(|e| crate::error::throw_into_js(&e))?)
            }
            _ => None,
        };
        match nested {
            Some(inner) => flatten(context, &inner, depth - 1.0, out)?,
            None => out.push(item.clone()),
        }
    }
    Ok(())
}

fn flat(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let depth = arg_f64(args, 0).unwrap_or(1.0);
    let mut out = Vec::new();
    flatten(context, &list.to_vec(), depth, &mut out)?;
    new_list_value(context, out)
}

fn flat_map(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let mapped = map(this, args, context)?;
    let Some(object) = mapped.as_object() else {
        return Ok(mapped);
    };
    let Some(HostValue::List(list)) = proxy::unwrap_bridge_object(context, object) else {
        return Ok(mapped);
    };
    let mut out = Vec::new();
    flatten(context, &list.to_vec(), 1.0, &mut out)?;
    new_list_value(context, out)
}

// --- sort -------------------------------------------------------------------

/// Quicksort whose partition consults the comparator, which may be a JS
/// callback.
fn quicksort(
    context: &mut Context,
    items: &mut Vec<HostValue>,
    lo: isize,
    hi: isize,
    cmp: &dyn Fn(&mut Context, &HostValue, &HostValue) -> JsResult<f64>,
) -> JsResult<()> {
    if lo >= hi {
        return Ok(());
    }
    let pivot = items[hi as usize].clone();
    let mut i = lo - 1;
    let mut j = lo;
    while j < hi {
        let before = cmp(context, &items[j as usize], &pivot)? <= 0.0;
        if before {
            i += 1;
            items.swap(i as usize, j as usize);
        }
        j += 1;
    }
    items.swap((i + 1) as usize, hi as usize);
    quicksort(context, items, lo, i, cmp)?;
    quicksort(context, items, i + 2, hi, cmp)
}

fn sort(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    let comparator = args.first().and_then(JsValue::as_callable).cloned();

    let mut items = list.to_vec();
    let len = items.len() as isize;
    match comparator {
        Some(cb) => {
            let cmp = move |context: &mut Context, a: &HostValue, b: &HostValue| {
                let a_js = host_to_js_or_throw(context, a)?;
                let b_js = host_to_js_or_throw(context, b)?;
                let out = cb.call(&sys::undefined(), &[a_js, b_js], context)?;
                Ok(out.as_number().unwrap_or(0.0))
            };
            quicksort(context, &mut items, 0, len - 1, &cmp)?;
        }
        None => {
            // No comparator: compare string forms, undefined last.
            let cmp = |context: &mut Context, a: &HostValue, b: &HostValue| {
                let rank = |v: &HostValue| matches!(v, HostValue::None) as u8;
                match rank(a).cmp(&rank(b)) {
                    std::cmp::Ordering::Less => return Ok(-1.0),
                    std::cmp::Ordering::Greater => return Ok(1.0),
                    std::cmp::Ordering::Equal => {}
                }
                let a_s = element_string(context, a)?;
                let b_s = element_string(context, b)?;
                Ok(match a_s.cmp(&b_s) {
                    std::cmp::Ordering::Less => -1.0,
                    std::cmp::Ordering::Equal => 0.0,
                    std::cmp::Ordering::Greater => 1.0,
                })
            };
            quicksort(context, &mut items, 0, len - 1, &cmp)?;
        }
    }
    list.replace(items);
    Ok(this.clone())
}

// --- iterators --------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum IterKind {
    Keys,
    Values,
    Entries,
}

#[derive(boa_gc::Trace, boa_gc::Finalize, boa_engine::JsData)]
struct ListIterSlot {
    #[unsafe_ignore_trace]
    list: HostList,
    #[unsafe_ignore_trace]
    index: Cell<usize>,
    #[unsafe_ignore_trace]
    kind: IterKind,
}

fn iter_object(context: &mut Context, list: HostList, kind: IterKind) -> JsResult<JsValue> {
    let object = sys::slot_object(ListIterSlot {
        list,
        index: Cell::new(0),
        kind,
    });
    let next = sys::function(context, NativeFunction::from_fn_ptr(iter_next), "next", 0);
    object.set(sys::js_string_key("next"), JsValue::from(next), false, context)?;
    let self_fn = sys::function(
        context,
        NativeFunction::from_fn_ptr(iter_self),
        "[Symbol.iterator]",
        0,
    );
    let iterator = sys::iterator_symbol();
    object.set(sys::symbol_key(&iterator), JsValue::from(self_fn), false, context)?;
    Ok(JsValue::from(object))
}

fn iter_result(context: &mut Context, value: JsValue, done: bool) -> JsResult<JsValue> {
    let result = sys::plain_object(context);
    result.set(sys::js_string_key("value"), value, false, context)?;
    result.set(
        sys::js_string_key("done"),
        JsValue::from(done),
        false,
        context,
    )?;
    Ok(JsValue::from(result))
}

fn iter_next(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let object = this
        .as_object()
        .ok_or_else(|| sys::type_error("iterator method called on a non-object"))?;
    let (value, done) = {
        let slot = object
            .downcast_ref::<ListIterSlot>()
            .ok_or_else(|| sys::type_error("next called on a foreign object"))?;
        let i = slot.index.get();
        if i >= slot.list.len() {
            (None, true)
        } else {
            slot.index.set(i + 1);
            (Some((i, slot.list.get(i).unwrap_or(HostValue::None), slot.kind)), false)
        }
    };
    match value {
        None => iter_result(context, sys::undefined(), done),
        Some((i, item, kind)) => {
            let value = match kind {
                IterKind::Keys => JsValue::from(i as i32),
                IterKind::Values => host_to_js_or_throw(context, &item)?,
                IterKind::Entries => {
                    let entry = host_to_js_or_throw(context, &item)?;
                    JsValue::from(sys::array_from(
                        context,
                        vec![JsValue::from(i as i32), entry],
                    ))
                }
            };
            iter_result(context, value, false)
        }
    }
}

fn iter_self(this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(this.clone())
}

fn entries(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    iter_object(context, list, IterKind::Entries)
}

fn keys(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    iter_object(context, list, IterKind::Keys)
}

pub(crate) fn values(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = this_list(this, context)?;
    iter_object(context, list, IterKind::Values)
}
