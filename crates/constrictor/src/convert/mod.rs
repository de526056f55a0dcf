//! The value classifier and the two type factories.
//!
//! [`classify_host`] decides, for any host value, which conversion path the
//! host→JS factory takes; JS→host classification happens inline in
//! [`to_host`] because deciding an object's builtin class requires the
//! engine. Both factories uphold the routing invariant: primitives copy,
//! compound values proxy, and a value that is already a proxy for the other
//! world unwraps instead of double-wrapping.

mod callable;
mod primitive;
mod promise;

pub(crate) use callable::wrap_host_fn;
pub(crate) use promise::{
    future_to_js_promise, js_promise_to_future, materialize_rejection, promise_details,
};

use crate::error::{engine_error, exception_value_to_js, HostError, HostResult};
use crate::host::{HostStr, HostValue};
use crate::jsproxy::{JsArrayProxy, JsFunctionProxy, JsObjectProxy};
use crate::proxy::{self, ProxyFamily};
use crate::runtime::state;
use crate::sys::{self, Context, JsError, JsObject, JsValue};

/// The conversion path a host value takes across the boundary.
///
/// First match wins; every host value routes to exactly one path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostPath {
    CopyBool,
    CopyBigInt,
    CopyNumber,
    CopyFloat,
    UnwrapStringProxy,
    ExternString,
    WrapCallable,
    ExceptionToError,
    CopyDate,
    BufferView,
    BytesProxy,
    UnwrapProxy,
    DictProxy,
    ListProxy,
    ObjectProxy,
    NoneToUndefined,
    NullToNull,
    FutureToPromise,
    IterableProxy,
}

/// Classify a host value (host→JS direction).
pub fn classify_host(value: &HostValue) -> HostPath {
    match value {
        HostValue::Bool(_) => HostPath::CopyBool,
        HostValue::BigInt(_) => HostPath::CopyBigInt,
        HostValue::Int(_) => HostPath::CopyNumber,
        HostValue::Float(_) => HostPath::CopyFloat,
        HostValue::Str(HostStr::Proxy(_)) => HostPath::UnwrapStringProxy,
        HostValue::Str(HostStr::Owned(_)) => HostPath::ExternString,
        HostValue::Func(_) => HostPath::WrapCallable,
        HostValue::Exception(_) => HostPath::ExceptionToError,
        HostValue::DateTime(_) => HostPath::CopyDate,
        HostValue::Bytes(b) if b.is_readonly() => HostPath::BytesProxy,
        HostValue::Bytes(_) => HostPath::BufferView,
        HostValue::ObjectProxy(_)
        | HostValue::ArrayProxy(_)
        | HostValue::FunctionProxy(_)
        | HostValue::MethodProxy(_) => HostPath::UnwrapProxy,
        HostValue::Dict(_) => HostPath::DictProxy,
        HostValue::List(_) => HostPath::ListProxy,
        HostValue::None => HostPath::NoneToUndefined,
        HostValue::Null => HostPath::NullToNull,
        HostValue::Future(_) => HostPath::FutureToPromise,
        HostValue::Iter(_) => HostPath::IterableProxy,
        HostValue::Object(_) => HostPath::ObjectProxy,
    }
}

/// Host→JS type factory.
pub(crate) fn to_js(context: &mut Context, value: &HostValue) -> HostResult<JsValue> {
    match (classify_host(value), value) {
        (HostPath::CopyBool, HostValue::Bool(b)) => Ok(JsValue::from(*b)),
        (HostPath::CopyBigInt, HostValue::BigInt(b)) => primitive::bigint_to_js(b),
        (HostPath::CopyNumber, HostValue::Int(i)) => primitive::int_to_js_number(*i),
        (HostPath::CopyFloat, HostValue::Float(f)) => Ok(JsValue::from(*f)),
        (HostPath::UnwrapStringProxy, HostValue::Str(HostStr::Proxy(p))) => {
            Ok(JsValue::from(p.js_string()))
        }
        (HostPath::ExternString, HostValue::Str(HostStr::Owned(s))) => {
            Ok(primitive::host_string_to_js(s))
        }
        (HostPath::WrapCallable, HostValue::Func(f)) => callable::wrap_host_fn(context, f),
        (HostPath::ExceptionToError, HostValue::Exception(e)) => {
            Ok(exception_value_to_js(e, context))
        }
        (HostPath::CopyDate, HostValue::DateTime(dt)) => primitive::date_to_js(context, dt),
        (HostPath::BytesProxy, HostValue::Bytes(b)) => proxy::bytes::new_bytes_proxy(context, b),
        (HostPath::BufferView, HostValue::Bytes(b)) => {
            primitive::buffer_to_typed_array(context, b)
        }
        (HostPath::UnwrapProxy, HostValue::ObjectProxy(p)) => {
            Ok(JsValue::from(p.object().to_inner()))
        }
        (HostPath::UnwrapProxy, HostValue::ArrayProxy(p)) => {
            Ok(JsValue::from(p.array().to_inner()))
        }
        (HostPath::UnwrapProxy, HostValue::FunctionProxy(p)) => {
            Ok(JsValue::from(p.function().to_inner()))
        }
        (HostPath::UnwrapProxy, HostValue::MethodProxy(p)) => p.to_bound_js(context),
        (HostPath::DictProxy, HostValue::Dict(_)) => {
            proxy::new_proxy(context, value.clone(), ProxyFamily::Dict)
        }
        (HostPath::ListProxy, HostValue::List(_)) => {
            proxy::new_proxy(context, value.clone(), ProxyFamily::List)
        }
        (HostPath::ObjectProxy, HostValue::Object(_)) => {
            proxy::new_proxy(context, value.clone(), ProxyFamily::Object)
        }
        (HostPath::IterableProxy, HostValue::Iter(_)) => {
            proxy::new_proxy(context, value.clone(), ProxyFamily::Iterable)
        }
        (HostPath::NoneToUndefined, _) => Ok(JsValue::undefined()),
        (HostPath::NullToNull, _) => Ok(JsValue::null()),
        (HostPath::FutureToPromise, HostValue::Future(f)) => {
            promise::future_to_js_promise(context, f)
        }
        // `classify_host` is total over the enum; the paths above cover it.
        _ => unreachable!("classifier routed a value to a mismatched path"),
    }
}

/// Like [`to_js`], but never lets a conversion failure escape: the error is
/// logged as a warning and JS `null` is produced instead. Used where a
/// failure has nowhere to propagate (finalizers, fire-and-forget jobs).
pub(crate) fn to_js_safe(context: &mut Context, value: &HostValue) -> JsValue {
    match to_js(context, value) {
        Ok(v) => v,
        Err(err) => {
            log::warn!("host→JS conversion failed: {err}");
            JsValue::null()
        }
    }
}

/// JS→host type factory.
pub(crate) fn to_host(context: &mut Context, value: &JsValue) -> HostResult<HostValue> {
    if value.is_undefined() {
        return Ok(HostValue::None);
    }
    if value.is_null() {
        return Ok(HostValue::Null);
    }
    if let Some(b) = value.as_boolean() {
        return Ok(HostValue::Bool(b));
    }
    if let Some(n) = value.as_number() {
        // The engine keeps int-valued arithmetic results in its integer
        // representation; those become host ints. Everything else stays a
        // float so float round-trips are exact.
        if sys::is_tagged_integer(value) {
            return Ok(HostValue::Int(n as i64));
        }
        return Ok(HostValue::Float(n));
    }
    if let Some(s) = value.as_string() {
        return Ok(HostValue::Str(primitive::js_string_to_host(s)));
    }
    if let Some(b) = value.as_bigint() {
        return primitive::bigint_to_host(b);
    }
    if value.as_symbol().is_some() {
        return Err(HostError::Type(
            "JS symbols cannot cross into the host runtime".into(),
        ));
    }
    let Some(object) = value.as_object() else {
        return Err(HostError::Type(format!(
            "cannot convert JS value: {}",
            sys::display_value(value, context)
        )));
    };
    object_to_host(context, object)
}

fn object_to_host(context: &mut Context, object: &JsObject) -> HostResult<HostValue> {
    // Bridge proxies and wrapped host callables unwrap to the original
    // host value.
    if let Some(unwrapped) = proxy::unwrap_bridge_object(context, object) {
        return Ok(unwrapped);
    }

    // Boxed primitives: unbox and recurse on the primitive.
    let brand = builtin_brand(context, object)?;
    match brand.as_str() {
        "Boolean" | "Number" | "String" | "BigInt" => {
            let helpers = state::with(|s| s.helpers());
            let unboxed = helpers
                .call(context, "unbox", &[JsValue::from(object.clone())])
                .map_err(|e| engine_error(e, context))?;
            return to_host(context, &unboxed);
        }
        _ => {}
    }

    if sys::is_date(object) {
        return primitive::date_to_host(context, object);
    }
    if sys::is_promise(object) {
        return Ok(HostValue::Future(promise::js_promise_to_future(
            context, object,
        )?));
    }
    if brand == "Error" {
        let err = engine_error(JsError::from_opaque(JsValue::from(object.clone())), context);
        return Ok(HostValue::Exception(std::rc::Rc::new(err)));
    }
    if object.is_callable() {
        // Bound functions land here too; a wrapped host callable was
        // already unwrapped above.
        return Ok(HostValue::FunctionProxy(JsFunctionProxy::new(object)));
    }
    if sys::is_array(object) {
        return Ok(HostValue::ArrayProxy(JsArrayProxy::new(object)));
    }
    if primitive::is_typed_array(context, object)? {
        return primitive::typed_array_to_host(context, object);
    }
    if primitive::is_any_array_buffer(context, object)? {
        return primitive::array_buffer_to_host(context, object);
    }

    Ok(HostValue::ObjectProxy(JsObjectProxy::new(object)))
}

/// The object's builtin brand (`Object.prototype.toString` class name):
/// the embedder-visible stand-in for the engine's builtin-class query.
fn builtin_brand(context: &mut Context, object: &JsObject) -> HostResult<String> {
    let helpers = state::with(|s| s.helpers());
    let brand = helpers
        .call(context, "builtinBrand", &[JsValue::from(object.clone())])
        .map_err(|e| engine_error(e, context))?;
    Ok(brand
        .as_string()
        .map(sys::decode_js_string)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostBytes, HostDict, HostList, HostObject};

    #[test]
    fn classifier_routes_each_variant_once() {
        assert_eq!(classify_host(&HostValue::Bool(true)), HostPath::CopyBool);
        assert_eq!(classify_host(&HostValue::Int(1)), HostPath::CopyNumber);
        assert_eq!(classify_host(&HostValue::bigint(1)), HostPath::CopyBigInt);
        assert_eq!(classify_host(&HostValue::Float(0.5)), HostPath::CopyFloat);
        assert_eq!(
            classify_host(&HostValue::string("s")),
            HostPath::ExternString
        );
        assert_eq!(
            classify_host(&HostValue::List(HostList::new())),
            HostPath::ListProxy
        );
        assert_eq!(
            classify_host(&HostValue::Dict(HostDict::new())),
            HostPath::DictProxy
        );
        assert_eq!(
            classify_host(&HostValue::Object(HostObject::new("Point"))),
            HostPath::ObjectProxy
        );
        assert_eq!(classify_host(&HostValue::None), HostPath::NoneToUndefined);
        assert_eq!(classify_host(&HostValue::Null), HostPath::NullToNull);
        assert_eq!(
            classify_host(&HostValue::Bytes(HostBytes::immutable(vec![1]))),
            HostPath::BytesProxy
        );
        assert_eq!(
            classify_host(&HostValue::Bytes(HostBytes::writable(
                vec![1],
                crate::host::FormatCode::U8
            ))),
            HostPath::BufferView
        );
    }
}
