//! The proxy registry: slot data, family ids, proxy creation and
//! recognition.
//!
//! A host→JS proxy is an ECMAScript `Proxy` whose target carries a hidden
//! slot: a native-data object stored under a private symbol. The slot holds
//! the proxied host value (slot 0 of the design), the family id that the
//! JS→host classifier uses to recognize bridge proxies, and an optional
//! auxiliary root (slot 1; the ArrayBuffer backing a bytes view). Trap
//! functions are plain native functions shared per family; they recover the
//! slot from the trap's target argument.

pub(crate) mod bytes;
pub(crate) mod dict;
pub(crate) mod iterable;
pub(crate) mod list;
mod list_methods;
mod object;

use boa_engine::property::PropertyDescriptor;

use crate::error::{engine_error, HostResult};
use crate::host::{HostFn, HostValue};
use crate::runtime::state;
use crate::sys::{self, Context, JsObject, JsResult, JsValue};

/// Which handler family a proxy belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyFamily {
    /// Generic host object: attribute forwarding.
    Object,
    /// Host mapping.
    Dict,
    /// Host sequence.
    List,
    /// Host iterator.
    Iterable,
    /// Immutable host bytes.
    Bytes,
}

/// Slot data carried by a proxy target.
#[derive(boa_gc::Trace, boa_engine::JsData)]
pub(crate) struct ProxySlot {
    #[unsafe_ignore_trace]
    host: HostValue,
    #[unsafe_ignore_trace]
    family: ProxyFamily,
    /// Auxiliary root kept alive for the proxy's lifetime.
    aux: Option<JsObject>,
}

impl ProxySlot {
    pub(crate) fn host(&self) -> &HostValue {
        &self.host
    }

    pub(crate) fn family(&self) -> ProxyFamily {
        self.family
    }

    pub(crate) fn aux(&self) -> Option<&JsObject> {
        self.aux.as_ref()
    }
}

impl boa_gc::Finalize for ProxySlot {
    fn finalize(&self) {
        // Finalization order: the JS side goes first; the host reference
        // releases when the slot's fields drop right after. The ledger
        // decrement is skipped during shutdown, when accounting is frozen.
        state::with(|s| s.proxy_finalized());
    }
}

/// Slot data carried by a wrapped host callable.
#[derive(boa_gc::Trace, boa_engine::JsData)]
pub(crate) struct FnSlot {
    #[unsafe_ignore_trace]
    func: HostFn,
}

impl FnSlot {
    pub(crate) fn new(func: HostFn) -> Self {
        state::with(|s| s.fn_created());
        FnSlot { func }
    }

    pub(crate) fn func(&self) -> &HostFn {
        &self.func
    }
}

impl boa_gc::Finalize for FnSlot {
    fn finalize(&self) {
        state::with(|s| s.fn_finalized());
    }
}

/// The per-family handler objects, built once at runtime init and rooted in
/// the bridge state.
#[derive(Clone, boa_gc::Trace, boa_gc::Finalize)]
pub(crate) struct ProxyHandlers {
    object: JsObject,
    dict: JsObject,
    list: JsObject,
    iterable: JsObject,
    bytes: JsObject,
}

impl ProxyHandlers {
    pub(crate) fn install(context: &mut Context) -> ProxyHandlers {
        ProxyHandlers {
            object: object::handler_object(context),
            dict: dict::handler_object(context),
            list: list::handler_object(context),
            iterable: iterable::handler_object(context),
            bytes: bytes::handler_object(context),
        }
    }

    fn for_family(&self, family: ProxyFamily) -> JsObject {
        match family {
            ProxyFamily::Object => self.object.clone(),
            ProxyFamily::Dict => self.dict.clone(),
            ProxyFamily::List => self.list.clone(),
            ProxyFamily::Iterable => self.iterable.clone(),
            ProxyFamily::Bytes => self.bytes.clone(),
        }
    }
}

/// Create a host→JS proxy for `host`.
pub(crate) fn new_proxy(
    context: &mut Context,
    host: HostValue,
    family: ProxyFamily,
) -> HostResult<JsValue> {
    new_proxy_with_aux(context, host, family, None)
}

pub(crate) fn new_proxy_with_aux(
    context: &mut Context,
    host: HostValue,
    family: ProxyFamily,
    aux: Option<JsObject>,
) -> HostResult<JsValue> {
    // A list proxy targets a real (empty) array so `Array.isArray` and the
    // Array prototype answer through the target; other families target a
    // plain object with the Object prototype.
    let target = match family {
        ProxyFamily::List => sys::empty_array(context),
        _ => sys::plain_object(context),
    };

    attach_slot(context, &target, ProxySlot { host, family, aux })
        .map_err(|e| engine_error(e, context))?;

    let handler = state::with(|s| s.proxy_handlers()).for_family(family);
    let helpers = state::with(|s| s.helpers());
    let proxy = helpers
        .call(
            context,
            "makeProxy",
            &[JsValue::from(target), JsValue::from(handler)],
        )
        .map_err(|e| engine_error(e, context))?;

    state::with(|s| s.proxy_created());
    Ok(proxy)
}

/// Attach the hidden slot to a proxy target (or a wrapped function).
fn attach_slot(context: &mut Context, target: &JsObject, slot: ProxySlot) -> JsResult<()> {
    let carrier = sys::slot_object(slot);
    let symbol = state::with(|s| s.slot_symbol());
    target.define_property_or_throw(
        sys::symbol_key(&symbol),
        PropertyDescriptor::builder()
            .value(carrier)
            .writable(false)
            .enumerable(false)
            .configurable(true)
            .build(),
        context,
    )?;
    Ok(())
}

/// Recognize a bridge proxy or wrapped callable and unwrap the host value.
///
/// The probe is one property read of the private slot symbol: bridge
/// proxies answer it from their `get` trap with the slot carrier, wrapped
/// functions carry it directly, and everything else misses. Errors (for
/// example a revoked user proxy) count as a miss.
pub(crate) fn unwrap_bridge_object(context: &mut Context, object: &JsObject) -> Option<HostValue> {
    let symbol = state::with(|s| s.slot_symbol());
    let probed = object.get(sys::symbol_key(&symbol), context).ok()?;
    let carrier = probed.as_object()?;
    if let Some(slot) = carrier.downcast_ref::<ProxySlot>() {
        return Some(slot.host().clone());
    }
    if let Some(slot) = carrier.downcast_ref::<FnSlot>() {
        return Some(HostValue::Func(slot.func().clone()));
    }
    None
}

// ---------------------------------------------------------------------------
// Shared trap plumbing.

/// A property key as a trap sees it.
pub(crate) enum TrapKey {
    Name(String),
    Symbol(boa_engine::JsSymbol),
}

/// The trap's target argument.
pub(crate) fn trap_target(args: &[JsValue]) -> JsResult<JsObject> {
    args.first()
        .and_then(JsValue::as_object)
        .cloned()
        .ok_or_else(|| sys::type_error("proxy trap called without a target"))
}

pub(crate) fn trap_key(args: &[JsValue], index: usize) -> JsResult<TrapKey> {
    let key = args
        .get(index)
        .ok_or_else(|| sys::type_error("proxy trap called without a key"))?;
    if let Some(s) = key.as_string() {
        return Ok(TrapKey::Name(sys::decode_js_string(s)));
    }
    if let Some(sym) = key.as_symbol() {
        return Ok(TrapKey::Symbol(sym.clone()));
    }
    Err(sys::type_error("proxy trap key is neither string nor symbol"))
}

/// Read the slot from a trap's target.
pub(crate) fn slot_of(
    context: &mut Context,
    target: &JsObject,
) -> JsResult<(HostValue, ProxyFamily, Option<JsObject>)> {
    let symbol = state::with(|s| s.slot_symbol());
    let carrier = target.get(sys::symbol_key(&symbol), context)?;
    let carrier = carrier
        .as_object()
        .ok_or_else(|| sys::type_error("proxy target lost its slot"))?;
    let slot = carrier
        .downcast_ref::<ProxySlot>()
        .ok_or_else(|| sys::type_error("proxy target carries no slot data"))?;
    Ok((slot.host().clone(), slot.family(), slot.aux().cloned()))
}

/// The slot carrier itself, for answering the recognition probe.
pub(crate) fn carrier_of(context: &mut Context, target: &JsObject) -> JsResult<JsValue> {
    let symbol = state::with(|s| s.slot_symbol());
    target.get(sys::symbol_key(&symbol), context)
}

/// Whether `key` is the private slot symbol.
pub(crate) fn is_slot_symbol(key: &TrapKey) -> bool {
    match key {
        TrapKey::Symbol(sym) => state::with(|s| s.slot_symbol()) == *sym,
        TrapKey::Name(_) => false,
    }
}

/// Build a JS data-descriptor object for `getOwnPropertyDescriptor` traps.
///
/// Properties absent from the target must report configurable (an engine
/// proxy invariant); the one non-configurable descriptor the bridge reports
/// is a list proxy's `length`, which really does exist non-configurable on
/// the target array.
pub(crate) fn data_descriptor(
    context: &mut Context,
    value: JsValue,
    writable: bool,
    enumerable: bool,
    configurable: bool,
) -> JsResult<JsValue> {
    let desc = sys::plain_object(context);
    desc.set(sys::js_string_key("value"), value, false, context)?;
    desc.set(
        sys::js_string_key("writable"),
        JsValue::from(writable),
        false,
        context,
    )?;
    desc.set(
        sys::js_string_key("enumerable"),
        JsValue::from(enumerable),
        false,
        context,
    )?;
    desc.set(
        sys::js_string_key("configurable"),
        JsValue::from(configurable),
        false,
        context,
    )?;
    Ok(JsValue::from(desc))
}

/// Install a trap on a handler object.
pub(crate) fn set_trap(
    context: &mut Context,
    handler: &JsObject,
    name: &str,
    f: boa_engine::NativeFunction,
    length: usize,
) {
    let func = sys::function(context, f, name, length);
    let _ = handler.set(sys::js_string_key(name), JsValue::from(func), false, context);
}

/// Convert a host value for a trap result, turning host errors into JS
/// throws.
pub(crate) fn host_to_js_or_throw(
    context: &mut Context,
    value: &HostValue,
) -> JsResult<JsValue> {
    crate::convert::to_js(context, value).map_err(|e| crate::error::throw_into_js(&e))
}

/// Convert a JS value for host storage, turning host errors into JS throws.
pub(crate) fn js_to_host_or_throw(
    context: &mut Context,
    value: &JsValue,
) -> JsResult<HostValue> {
    crate::convert::to_host(context, value).map_err(|e| crate::error::throw_into_js(&e))
}
