//! Round-trip laws and boundary behavior for the primitive converter.

#![allow(missing_docs)]

use constrictor::{HostError, HostValue, Runtime, NULL};

/// Push a host value through JS identity and back.
fn round_trip(rt: &mut Runtime, value: HostValue) -> HostValue {
    rt.define_global("probe", &value).unwrap();
    rt.eval("probe").unwrap()
}

#[test]
fn primitive_round_trips_preserve_value() {
    let mut rt = Runtime::new().unwrap();
    for value in [
        HostValue::Bool(true),
        HostValue::Bool(false),
        HostValue::Int(0),
        HostValue::Int(-17),
        HostValue::Float(0.5),
        HostValue::Float(-123.25),
        HostValue::string("plain ascii"),
        HostValue::string("uniçødé 🐍"),
        NULL,
        HostValue::None,
    ] {
        let back = round_trip(&mut rt, value.clone());
        assert_eq!(back, value);
    }
}

#[test]
fn js_primitive_round_trips_are_strict_equal() {
    let mut rt = Runtime::new().unwrap();
    for src in ["true", "0", "-1.5", "'text'", "null", "undefined", "123n"] {
        let through = rt.eval(src).unwrap();
        rt.define_global("back", &through).unwrap();
        let same = rt.eval(&format!("back === ({src})")).unwrap();
        assert_eq!(same, HostValue::Bool(true), "round trip of {src}");
    }
}

#[test]
fn safe_integer_boundary_is_exact() {
    let mut rt = Runtime::new().unwrap();
    let max53 = (1_i64 << 53) - 1;
    for v in [max53, -max53] {
        let back = round_trip(&mut rt, HostValue::Int(v));
        assert_eq!(back, HostValue::Float(v as f64));
    }
    for v in [max53 + 1, -(max53 + 1)] {
        let err = rt.define_global("overflow", &HostValue::Int(v)).unwrap_err();
        assert!(matches!(err, HostError::Overflow(_)), "{v} gave {err:?}");
    }
}

#[test]
fn bigint_subtype_round_trips_losslessly() {
    let mut rt = Runtime::new().unwrap();
    let big: num_bigint::BigInt = "123456789012345678901234567890".parse().unwrap();
    rt.define_global("big", &HostValue::bigint(big.clone()))
        .unwrap();
    assert_eq!(
        rt.eval("typeof big").unwrap().as_str(),
        Some("bigint"),
        "opt-in ints cross as bigint"
    );
    // The reverse direction re-tags as the big-integer subtype, so the
    // next crossing routes through bigint again.
    let back = rt.eval("big").unwrap();
    assert_eq!(back, HostValue::bigint(big));
    assert!(matches!(back, HostValue::BigInt(_)));
}

#[test]
fn small_bigint_uses_the_fast_path() {
    let mut rt = Runtime::new().unwrap();
    let back = round_trip(&mut rt, HostValue::bigint(99));
    assert_eq!(back, HostValue::bigint(99));
}

#[test]
fn date_round_trips_by_epoch_millisecond() {
    let mut rt = Runtime::new().unwrap();
    let dt = chrono::DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
    rt.define_global("when", &HostValue::DateTime(dt)).unwrap();
    assert_eq!(
        rt.eval("when.getTime()").unwrap(),
        HostValue::Float(1_700_000_000_123.0)
    );
    let back = rt.eval("when").unwrap();
    assert_eq!(back, HostValue::DateTime(dt));
}

#[test]
fn js_date_converts_to_utc_datetime() {
    let mut rt = Runtime::new().unwrap();
    let value = rt.eval("new Date(86400000)").unwrap();
    let HostValue::DateTime(dt) = value else {
        panic!("expected a datetime, got {value:?}");
    };
    assert_eq!(dt.timestamp_millis(), 86_400_000);
}

#[test]
fn repeated_string_conversion_shares_engine_storage() {
    let mut rt = Runtime::new().unwrap();
    let s = HostValue::string("shared backing storage");
    rt.define_global("s1", &s).unwrap();
    let count = rt.stats().interned_strings;
    rt.define_global("s2", &s).unwrap();
    // Same host string, same table entry: the engine string is reused.
    assert_eq!(rt.stats().interned_strings, count);
    assert_eq!(rt.eval("s1 === s2").unwrap(), HostValue::Bool(true));
}

#[test]
fn bridge_string_converts_back_to_the_original() {
    let mut rt = Runtime::new().unwrap();
    let s = HostValue::string("there and back");
    rt.define_global("s", &s).unwrap();
    let back = rt.eval("s").unwrap();
    // Not a proxy: the original host string comes back.
    let HostValue::Str(back) = back else {
        panic!("expected a string");
    };
    assert!(!back.is_proxy());
    assert_eq!(back.as_str(), "there and back");
}

#[test]
fn foreign_js_string_becomes_a_proxy() {
    let mut rt = Runtime::new().unwrap();
    let value = rt.eval("'made in JS: ' + 'concat'").unwrap();
    let HostValue::Str(s) = value else {
        panic!("expected a string");
    };
    assert!(s.is_proxy());
    assert_eq!(s.as_str(), "made in JS: concat");
}

#[test]
fn symbols_refuse_to_cross() {
    let mut rt = Runtime::new().unwrap();
    let err = rt.eval("Symbol('nope')").unwrap_err();
    assert!(matches!(err, HostError::Type(_)), "got {err:?}");
}

#[test]
fn boxed_primitives_unbox() {
    let mut rt = Runtime::new().unwrap();
    assert_eq!(
        rt.eval("new Number(6)").unwrap(),
        HostValue::Float(6.0)
    );
    assert_eq!(rt.eval("new Boolean(true)").unwrap(), HostValue::Bool(true));
    assert_eq!(
        rt.eval("new String('boxed')").unwrap().as_str(),
        Some("boxed")
    );
}

#[test]
fn typed_array_format_codes() {
    let mut rt = Runtime::new().unwrap();
    // q/Q (8-byte ints) view through the bigint-element arrays.
    let q = HostValue::Bytes(constrictor::HostBytes::writable(
        vec![0; 16],
        constrictor::FormatCode::from_format("q", 8).unwrap(),
    ));
    rt.define_global("q", &q).unwrap();
    assert_eq!(
        rt.eval("q.constructor.name").unwrap().as_str(),
        Some("BigInt64Array")
    );

    let cap_q = HostValue::Bytes(constrictor::HostBytes::writable(
        vec![0; 16],
        constrictor::FormatCode::from_format("Q", 8).unwrap(),
    ));
    rt.define_global("Q", &cap_q).unwrap();
    assert_eq!(
        rt.eval("Q.constructor.name").unwrap().as_str(),
        Some("BigUint64Array")
    );

    // Unknown format codes are type errors before anything crosses.
    assert!(matches!(
        constrictor::FormatCode::from_format("Z", 3),
        Err(HostError::Type(_))
    ));
}

#[test]
fn typed_arrays_convert_to_host_buffers() {
    let mut rt = Runtime::new().unwrap();
    let value = rt.eval("new Uint8Array([1, 2, 3])").unwrap();
    let HostValue::Bytes(bytes) = value else {
        panic!("expected bytes, got {value:?}");
    };
    assert_eq!(bytes.to_vec(), vec![1, 2, 3]);
    assert_eq!(bytes.format().code(), 'B');

    let value = rt.eval("new Float64Array([0.5]).buffer").unwrap();
    let HostValue::Bytes(buffer) = value else {
        panic!("expected bytes");
    };
    assert_eq!(buffer.len(), 8);
}
