//! The primitive converter: scalars, strings, dates and buffers.
//!
//! Never creates a proxy; the proxy factories never copy primitives.

use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::{engine_error, HostError, HostResult};
use crate::host::{FormatCode, HostBytes, HostStr, HostValue};
use crate::jsproxy::JsStringProxy;
use crate::runtime::state;
use crate::sys::{self, Context, JsObject, JsValue};

/// Largest integer magnitude that fits a 53-bit mantissa exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Plain host int → JS number, refusing magnitudes a double cannot hold
/// exactly.
pub(crate) fn int_to_js_number(value: i64) -> HostResult<JsValue> {
    if value.unsigned_abs() > MAX_SAFE_INTEGER {
        return Err(HostError::Overflow(
            "integer magnitude exceeds the JS safe-integer range; \
             use the big-integer subtype for lossless crossing"
                .into(),
        ));
    }
    if let Ok(small) = i32::try_from(value) {
        Ok(JsValue::from(small))
    } else {
        Ok(JsValue::from(value as f64))
    }
}

/// Host big integer → JS bigint. One 64-bit limb uses the engine's fast
/// constructor; anything wider goes through a radix-string intermediate.
pub(crate) fn bigint_to_js(value: &BigInt) -> HostResult<JsValue> {
    if let Some(small) = value.to_i64() {
        return Ok(JsValue::from(sys::bigint_from_i64(small)));
    }
    let digits = value.to_str_radix(10);
    let bigint = sys::bigint_from_decimal(&digits).ok_or_else(|| {
        HostError::Value(format!("cannot build JS bigint from {digits}"))
    })?;
    Ok(JsValue::from(bigint))
}

/// JS bigint → host big integer, tagged as the big-integer subtype so the
/// next host→JS crossing routes back through bigint rather than number.
pub(crate) fn bigint_to_host(value: &boa_engine::JsBigInt) -> HostResult<HostValue> {
    let digits = value.to_string();
    let parsed: BigInt = digits
        .parse()
        .map_err(|_| HostError::Value(format!("cannot parse JS bigint {digits}")))?;
    Ok(HostValue::BigInt(Rc::new(parsed)))
}

/// Host string → engine string, through the string table.
///
/// Converting the same host string twice answers the same engine string, so
/// repeat crossings share character storage. The table entry keeps the host
/// string alive while the engine string exists, standing in for the
/// external-string finalizer of engines that support storage sharing.
pub(crate) fn host_string_to_js(value: &Rc<str>) -> JsValue {
    state::with(|s| {
        let mut strings = s.strings.borrow_mut();
        if let Some(js) = strings.js_for(value) {
            return JsValue::from(js);
        }
        let js = sys::js_string(value);
        strings.record(value, &js);
        JsValue::from(js)
    })
}

/// Engine string → host string. Strings created by this bridge hand back a
/// new reference to the original host string; foreign strings become string
/// proxies rooting the engine string.
pub(crate) fn js_string_to_host(value: &boa_engine::JsString) -> HostStr {
    state::with(|s| {
        if let Some(original) = s.strings.borrow().host_for(value) {
            return HostStr::Owned(original);
        }
        HostStr::Proxy(JsStringProxy::new(value))
    })
}

/// Host datetime → JS `Date`, by millisecond epoch.
pub(crate) fn date_to_js(context: &mut Context, value: &DateTime<Utc>) -> HostResult<JsValue> {
    let ms = value.timestamp_millis() as f64;
    let helpers = state::with(|s| s.helpers());
    helpers
        .call(context, "makeDate", &[JsValue::from(ms)])
        .map_err(|e| engine_error(e, context))
}

/// JS `Date` → UTC-aware host datetime.
pub(crate) fn date_to_host(context: &mut Context, object: &JsObject) -> HostResult<HostValue> {
    let helpers = state::with(|s| s.helpers());
    let ms = helpers
        .call(context, "dateTime", &[JsValue::from(object.clone())])
        .map_err(|e| engine_error(e, context))?;
    let ms = ms
        .as_number()
        .filter(|ms| ms.is_finite())
        .ok_or_else(|| HostError::Value("JS Date holds an invalid time value".into()))?;
    match Utc.timestamp_millis_opt(ms as i64) {
        chrono::LocalResult::Single(dt) => Ok(HostValue::DateTime(dt)),
        _ => Err(HostError::Value(format!(
            "JS Date epoch {ms} is outside the host datetime range"
        ))),
    }
}

/// Writable host buffer → JS typed array over an engine ArrayBuffer.
///
/// The engine has no external-buffer facility, so the bytes copy; the
/// format code selects the view subtype.
pub(crate) fn buffer_to_typed_array(
    context: &mut Context,
    bytes: &HostBytes,
) -> HostResult<JsValue> {
    let buffer = sys::array_buffer(context, bytes.to_vec()).map_err(|e| engine_error(e, context))?;
    let helpers = state::with(|s| s.helpers());
    helpers
        .call(
            context,
            "newTypedArray",
            &[
                sys::js_str_value(bytes.format().typed_array_name()),
                JsValue::from(buffer),
            ],
        )
        .map_err(|e| engine_error(e, context))
}

pub(crate) fn is_typed_array(context: &mut Context, object: &JsObject) -> HostResult<bool> {
    let helpers = state::with(|s| s.helpers());
    let answer = helpers
        .call(context, "isTypedArray", &[JsValue::from(object.clone())])
        .map_err(|e| engine_error(e, context))?;
    Ok(answer.as_boolean().unwrap_or(false))
}

pub(crate) fn is_any_array_buffer(context: &mut Context, object: &JsObject) -> HostResult<bool> {
    let helpers = state::with(|s| s.helpers());
    let answer = helpers
        .call(context, "isAnyArrayBuffer", &[JsValue::from(object.clone())])
        .map_err(|e| engine_error(e, context))?;
    Ok(answer.as_boolean().unwrap_or(false))
}

/// JS typed array → writable host buffer, with the format code matching the
/// view's constructor.
pub(crate) fn typed_array_to_host(
    context: &mut Context,
    object: &JsObject,
) -> HostResult<HostValue> {
    let helpers = state::with(|s| s.helpers());
    let info = helpers
        .call(context, "typedArrayInfo", &[JsValue::from(object.clone())])
        .map_err(|e| engine_error(e, context))?;
    let info = info
        .as_object()
        .cloned()
        .ok_or_else(|| HostError::Type("typed array reflection failed".into()))?;

    let name = sys::get_index(&info, 0, context)
        .map_err(|e| engine_error(e, context))?
        .as_string()
        .map(sys::decode_js_string)
        .unwrap_or_default();
    let format = FormatCode::from_typed_array_name(&name)
        .ok_or_else(|| HostError::Type(format!("unsupported typed array {name}")))?;

    let bytes = read_view_bytes(context, object)?;
    Ok(HostValue::Bytes(HostBytes::writable(bytes, format)))
}

/// JS ArrayBuffer → writable host buffer of unsigned bytes.
pub(crate) fn array_buffer_to_host(
    context: &mut Context,
    object: &JsObject,
) -> HostResult<HostValue> {
    let bytes = read_buffer_bytes(context, JsValue::from(object.clone()))?;
    Ok(HostValue::Bytes(HostBytes::writable(bytes, FormatCode::U8)))
}

fn read_view_bytes(context: &mut Context, view: &JsObject) -> HostResult<Vec<u8>> {
    // The projection respects the view's offset and length.
    read_buffer_bytes(context, JsValue::from(view.clone()))
}

/// Read a buffer's (or view's) contents byte by byte through a `Uint8Array`
/// projection. Buffer crossings copy, so the linear walk is the whole cost.
fn read_buffer_bytes(context: &mut Context, buffer: JsValue) -> HostResult<Vec<u8>> {
    let helpers = state::with(|s| s.helpers());
    let array = helpers
        .call(context, "bufferBytes", &[buffer])
        .map_err(|e| engine_error(e, context))?;
    let array = array
        .as_object()
        .cloned()
        .ok_or_else(|| HostError::Type("buffer projection failed".into()))?;

    let len = array
        .get(sys::js_string_key("length"), context)
        .map_err(|e| engine_error(e, context))?
        .as_number()
        .unwrap_or(0.0) as usize;
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let byte = sys::get_index(&array, i as u64, context)
            .map_err(|e| engine_error(e, context))?
            .as_number()
            .unwrap_or(0.0);
        out.push(byte as u8);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_integer_boundary() {
        let max = (1_i64 << 53) - 1;
        assert!(int_to_js_number(max).is_ok());
        assert!(int_to_js_number(-max).is_ok());
        assert!(matches!(
            int_to_js_number(max + 1),
            Err(HostError::Overflow(_))
        ));
        assert!(matches!(
            int_to_js_number(-(max + 1)),
            Err(HostError::Overflow(_))
        ));
    }
}
