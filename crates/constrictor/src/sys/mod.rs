//! Engine adapter.
//!
//! Every call into `boa_engine` that is sensitive to the engine's API
//! surface is concentrated here. The rest of the crate talks to this module
//! (plus the engine's stable value types re-exported below), so engine
//! upgrades touch one file.
//!
//! A handful of operations the engine does not expose to embedders
//! (constructing with `new`, typed-array reflection, proxy detail capture)
//! are provided by a small realm-bootstrap script evaluated once at startup;
//! see [`Helpers`].

use std::path::Path;

use boa_engine::object::builtins::{JsArray, JsArrayBuffer, JsDate, JsPromise, JsRegExp};
use boa_engine::object::FunctionObjectBuilder;
use boa_engine::property::PropertyKey;
use boa_engine::{js_string, JsNativeError, JsString, JsSymbol, NativeFunction, Source};

pub(crate) use boa_engine::builtins::promise::PromiseState;
pub(crate) use boa_engine::job::{FutureJob, JobQueue, NativeJob};
pub(crate) use boa_engine::{Context, JsError, JsObject, JsResult, JsValue};
pub(crate) use boa_gc::{Finalize, Trace};

use crate::error::{EngineError, HostError, HostResult};

/// Names bound by the bootstrap script, for reference:
/// `makeProxy`, `makeDeferred`, `makeDate`, `dateTime`, `newTypedArray`,
/// `typedArrayInfo`, `isTypedArray`, `isAnyArrayBuffer`, `bindThis`,
/// `assign`, `proxyDetails`.
const BOOTSTRAP: &str = r#"
(() => {
    const details = new WeakMap();
    const NativeProxy = Proxy;
    // Wrap the Proxy constructor so scripted proxies stay introspectable;
    // the engine itself exposes no [[ProxyTarget]]/[[ProxyHandler]] access.
    const WrappedProxy = function Proxy(target, handler) {
        const p = new NativeProxy(target, handler);
        details.set(p, [target, handler]);
        return p;
    };
    WrappedProxy.revocable = function revocable(target, handler) {
        const r = NativeProxy.revocable(target, handler);
        details.set(r.proxy, [target, handler]);
        return r;
    };
    globalThis.Proxy = WrappedProxy;

    return {
        makeProxy: (target, handler) => new NativeProxy(target, handler),
        makeDeferred: () => {
            let resolve, reject;
            const promise = new Promise((res, rej) => { resolve = res; reject = rej; });
            return { promise, resolve, reject };
        },
        makeDate: (ms) => new Date(ms),
        dateTime: (date) => date.getTime(),
        newTypedArray: (name, buffer) => new globalThis[name](buffer),
        typedArrayInfo: (ta) => [ta.constructor.name, ta.length, ta.byteOffset, ta.byteLength],
        isTypedArray: (x) => ArrayBuffer.isView(x) && !(x instanceof DataView),
        isAnyArrayBuffer: (x) => x instanceof ArrayBuffer
            || (typeof SharedArrayBuffer !== "undefined" && x instanceof SharedArrayBuffer),
        bindThis: (f, self) => f.bind(self),
        assign: (target, source) => Object.assign(target, source),
        proxyDetails: (p) => details.get(p),
        builtinBrand: (x) => Object.prototype.toString.call(x).slice(8, -1),
        unbox: (x) => x.valueOf(),
        bufferBytes: (x) => Array.from(x instanceof ArrayBuffer
            ? new Uint8Array(x)
            : new Uint8Array(x.buffer, x.byteOffset, x.byteLength)),
    };
})()
"#;

/// Rooted bootstrap helper functions, owned by the runtime state.
#[derive(Clone, Debug)]
pub(crate) struct Helpers {
    object: JsObject,
}

impl Helpers {
    pub(crate) fn install(context: &mut Context) -> HostResult<Helpers> {
        let value = eval_source(context, BOOTSTRAP, None)?;
        let object = value
            .as_object()
            .cloned()
            .ok_or_else(|| HostError::Runtime("engine bootstrap did not produce helpers".into()))?;
        Ok(Helpers { object })
    }

    pub(crate) fn call(
        &self,
        context: &mut Context,
        name: &str,
        args: &[JsValue],
    ) -> JsResult<JsValue> {
        let f = self.object.get(js_string_key(name), context)?;
        let f = f.as_callable().cloned().ok_or_else(|| {
            JsNativeError::typ().with_message(format!("missing bootstrap helper {name}"))
        })?;
        f.call(&JsValue::undefined(), args, context)
    }
}

/// Build the one JS context, wiring in the bridge's job queue and host
/// hooks.
pub(crate) fn new_context<Q: JobQueue + 'static, H: boa_engine::context::HostHooks + 'static>(
    queue: std::rc::Rc<Q>,
    hooks: &'static H,
) -> HostResult<Context> {
    Context::builder()
        .job_queue(queue)
        .host_hooks(hooks)
        .build()
        .map_err(|e| HostError::Engine(EngineError::msg(format!("could not create context: {e}"))))
}

/// Evaluate a script source, returning the raw engine result.
pub(crate) fn eval_source(
    context: &mut Context,
    src: &str,
    path: Option<&Path>,
) -> HostResult<JsValue> {
    let result = match path {
        Some(p) => context.eval(Source::from_reader(src.as_bytes(), Some(p))),
        None => context.eval(Source::from_bytes(src.as_bytes())),
    };
    result.map_err(|e| crate::error::engine_error(e, context))
}

/// Parse (without running) to decide whether `src` is a complete compilable
/// unit. Errors that are plainly "the input stopped too early" mean "not yet
/// complete"; anything else is a real syntax error and therefore complete
/// enough to hand to `eval` for a proper report.
pub(crate) fn is_compilable_unit(context: &mut Context, src: &str) -> bool {
    let source = Source::from_bytes(src.as_bytes());
    match boa_engine::Script::parse(source, None, context) {
        Ok(_) => true,
        Err(err) => {
            let msg = err.to_string().to_lowercase();
            !(msg.contains("abrupt end")
                || msg.contains("unexpected end of input")
                || msg.contains("end of file")
                || msg.contains("unexpected eof"))
        }
    }
}

/// Parse and start evaluating a module; the returned promise settles when
/// module evaluation (including top-level await) finishes.
pub(crate) fn eval_module(
    context: &mut Context,
    src: &str,
    path: Option<&Path>,
) -> HostResult<JsObject> {
    let module = match path {
        Some(p) => {
            boa_engine::Module::parse(Source::from_reader(src.as_bytes(), Some(p)), None, context)
        }
        None => boa_engine::Module::parse(Source::from_bytes(src.as_bytes()), None, context),
    };
    let module = module
        .map_err(|e| crate::error::engine_error(e, context))?;
    let promise = module.load_link_evaluate(context);
    Ok(promise.into())
}

/// Create a JS function from a native function pointer.
pub(crate) fn function(
    context: &mut Context,
    f: NativeFunction,
    name: &str,
    length: usize,
) -> JsObject {
    FunctionObjectBuilder::new(context.realm(), f)
        .name(JsString::from(name))
        .length(length)
        .build()
        .into()
}

/// Create a JS function from a Rust closure with traced captures.
pub(crate) fn closure_function<T, F>(
    context: &mut Context,
    f: F,
    captures: T,
    name: &str,
    length: usize,
) -> JsObject
where
    T: Trace + Finalize + 'static,
    F: Fn(&JsValue, &[JsValue], &T, &mut Context) -> JsResult<JsValue> + Copy + 'static,
{
    let native = NativeFunction::from_copy_closure_with_captures(
        move |this, args, captures, context| f(this, args, captures, context),
        captures,
    );
    function(context, native, name, length)
}

/// A fresh ordinary object with `Object.prototype`.
pub(crate) fn plain_object(context: &mut Context) -> JsObject {
    JsObject::with_object_proto(context.intrinsics())
}

/// The realm's global object, as an owned handle.
pub(crate) fn global_object(context: &mut Context) -> JsObject {
    context.global_object().clone()
}

/// A native-data object with no prototype; used for bridge slots.
pub(crate) fn slot_object<T: Trace + Finalize + 'static + boa_engine::JsData>(data: T) -> JsObject {
    JsObject::from_proto_and_data(None::<JsObject>, data)
}

/// A fresh empty JS array (real array: proxies over it answer
/// `Array.isArray` through their target).
pub(crate) fn empty_array(context: &mut Context) -> JsObject {
    JsArray::new(context).into()
}

pub(crate) fn array_from(context: &mut Context, values: Vec<JsValue>) -> JsObject {
    JsArray::from_iter(values, context).into()
}

pub(crate) fn new_symbol(description: &str) -> JsSymbol {
    JsSymbol::new(Some(JsString::from(description)))
        .expect("symbol creation only fails on hash exhaustion")
}

pub(crate) fn iterator_symbol() -> JsSymbol {
    JsSymbol::iterator()
}

pub(crate) fn to_primitive_symbol() -> JsSymbol {
    JsSymbol::to_primitive()
}

pub(crate) fn js_string_key(name: &str) -> PropertyKey {
    PropertyKey::from(JsString::from(name))
}

pub(crate) fn symbol_key(symbol: &JsSymbol) -> PropertyKey {
    PropertyKey::from(symbol.clone())
}

/// Address of a JS string's character storage. Clones of one string share
/// storage, which is what the string table keys on.
pub(crate) fn js_string_addr(s: &JsString) -> usize {
    use boa_engine::string::JsStrVariant;
    match s.as_str().variant() {
        JsStrVariant::Latin1(b) => b.as_ptr() as usize,
        JsStrVariant::Utf16(u) => u.as_ptr() as usize,
    }
}

/// Decode a JS string to host UTF-8. Surrogate pairs join into scalar
/// values; unpaired surrogates degrade to a lossy escape rather than
/// failing.
pub(crate) fn decode_js_string(s: &JsString) -> String {
    match s.to_std_string() {
        Ok(s) => s,
        Err(_) => {
            log::debug!("JS string contains unpaired surrogates; using lossy decoding");
            s.to_std_string_escaped()
        }
    }
}

/// Bigint from a decimal string (arbitrary-precision crossing path).
pub(crate) fn bigint_from_decimal(digits: &str) -> Option<boa_engine::JsBigInt> {
    boa_engine::JsBigInt::from_string(digits)
}

pub(crate) fn bigint_from_i64(v: i64) -> boa_engine::JsBigInt {
    boa_engine::JsBigInt::from(v)
}

/// The engine ArrayBuffer for a byte block (the engine has no external
/// buffer facility, so bytes copy at the boundary).
pub(crate) fn array_buffer(context: &mut Context, bytes: Vec<u8>) -> JsResult<JsObject> {
    Ok(JsArrayBuffer::from_byte_block(bytes, context)?.into())
}

pub(crate) fn is_array(object: &JsObject) -> bool {
    JsArray::from_object(object.clone()).is_ok()
}

pub(crate) fn is_promise(object: &JsObject) -> bool {
    JsPromise::from_object(object.clone()).is_ok()
}

pub(crate) fn is_regexp(object: &JsObject) -> bool {
    JsRegExp::from_object(object.clone()).is_ok()
}

pub(crate) fn is_date(object: &JsObject) -> bool {
    JsDate::from_object(object.clone()).is_ok()
}

/// Whether the value is in the engine's integer representation (as opposed
/// to an integral-valued double, which must stay a host float).
pub(crate) fn is_tagged_integer(value: &JsValue) -> bool {
    value.is_integer()
}

pub(crate) fn promise_state(object: &JsObject) -> Option<PromiseState> {
    JsPromise::from_object(object.clone()).ok().map(|p| p.state())
}

/// Force a full engine GC cycle.
pub(crate) fn force_gc() {
    boa_gc::force_collect();
}

/// Read `arr[index]` for an engine object.
pub(crate) fn get_index(object: &JsObject, index: u64, context: &mut Context) -> JsResult<JsValue> {
    object.get(PropertyKey::from(index as u32), context)
}

pub(crate) fn set_index(
    object: &JsObject,
    index: u64,
    value: JsValue,
    context: &mut Context,
) -> JsResult<bool> {
    object.set(PropertyKey::from(index as u32), value, false, context)
}

/// `delete obj[key]`, returning whether the deletion succeeded.
pub(crate) fn delete_key(
    object: &JsObject,
    key: PropertyKey,
    context: &mut Context,
) -> JsResult<bool> {
    object.delete_property_or_throw(key, context)
}

/// Own property keys of an object, string keys only (symbols skipped),
/// in definition order.
pub(crate) fn own_string_keys(object: &JsObject, context: &mut Context) -> JsResult<Vec<String>> {
    let keys = object.own_property_keys(context)?;
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        match key {
            PropertyKey::String(s) => out.push(decode_js_string(&s)),
            PropertyKey::Index(i) => out.push(i.get().to_string()),
            PropertyKey::Symbol(_) => {}
        }
    }
    Ok(out)
}

/// Count of own properties including non-enumerable ones.
pub(crate) fn own_key_count(object: &JsObject, context: &mut Context) -> JsResult<usize> {
    Ok(object.own_property_keys(context)?.len())
}

/// Reference identity of two engine objects.
pub(crate) fn object_ptr_eq(a: &JsObject, b: &JsObject) -> bool {
    JsObject::equals(a, b)
}

pub(crate) fn js_string(s: &str) -> JsString {
    JsString::from(s)
}

pub(crate) fn js_str_value(s: &str) -> JsValue {
    JsValue::from(JsString::from(s))
}

/// Engine string for a JS value, for diagnostics ("cannot convert ...").
pub(crate) fn display_value(value: &JsValue, context: &mut Context) -> String {
    value
        .to_string(context)
        .map(|s| decode_js_string(&s))
        .unwrap_or_else(|_| "<unprintable>".into())
}

pub(crate) fn type_error(message: impl Into<String>) -> JsError {
    JsNativeError::typ().with_message(message.into()).into()
}

pub(crate) fn range_error(message: impl Into<String>) -> JsError {
    JsNativeError::range().with_message(message.into()).into()
}

/// `undefined` as a trap return.
pub(crate) fn undefined() -> JsValue {
    JsValue::undefined()
}
