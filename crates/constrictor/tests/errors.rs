//! The exception bridge: identity round-trips and error kinds.

#![allow(missing_docs)]

use std::rc::Rc;

use constrictor::{HostError, HostValue, Runtime};

#[test]
fn js_throw_becomes_an_engine_error_with_the_original_attached() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::FunctionProxy(thrower) =
        rt.eval("() => { throw new Error('boom'); }").unwrap()
    else {
        panic!("expected a function");
    };
    let err = rt.enter(|cx| thrower.call(cx, &[])).unwrap_err();
    assert!(err.to_string().contains("boom"), "got: {err}");
    assert!(err.js_error().is_some(), "original JS error must ride along");
}

#[test]
fn host_exception_round_trips_to_the_same_js_object() {
    let mut rt = Runtime::new().unwrap();
    rt.eval("globalThis.original = new Error('boom')").unwrap();
    let HostValue::FunctionProxy(thrower) =
        rt.eval("() => { throw globalThis.original; }").unwrap()
    else {
        panic!()
    };
    let err = rt.enter(|cx| thrower.call(cx, &[])).unwrap_err();

    // Re-emitting the caught error into JS produces the very same object,
    // not a reconstruction.
    let exception = HostValue::Exception(Rc::new(err));
    rt.define_global("caught", &exception).unwrap();
    assert_eq!(
        rt.eval("caught === globalThis.original").unwrap(),
        HostValue::Bool(true)
    );
    assert_eq!(rt.eval("caught.message").unwrap().as_str(), Some("boom"));
}

#[test]
fn js_error_values_convert_to_host_exceptions() {
    let mut rt = Runtime::new().unwrap();
    let value = rt.eval("new TypeError('wrong shape')").unwrap();
    let HostValue::Exception(err) = value else {
        panic!("expected an exception value, got {value:?}");
    };
    assert!(err.to_string().contains("wrong shape"));
    assert!(err.js_error().is_some());
}

#[test]
fn fresh_host_errors_surface_with_kind_and_backtrace() {
    let mut rt = Runtime::new().unwrap();
    let fail = constrictor::HostFn::new("fail", |_cx, _args| {
        Err(HostError::Key("no such entry".into()))
    });
    rt.define_global("fail", &HostValue::Func(fail)).unwrap();
    let text = rt
        .eval("(() => { try { fail(); } catch (e) { return e.message; } })()")
        .unwrap();
    let text = text.as_str().unwrap();
    assert!(text.starts_with("KeyError: no such entry"), "got: {text}");
}

#[test]
fn proxy_operations_raise_native_error_kinds() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::ArrayProxy(array) = rt.eval("[1]").unwrap() else {
        panic!()
    };
    let err = rt.enter(|cx| array.get(cx, 7)).unwrap_err();
    assert!(matches!(err, HostError::Index(_)));

    let HostValue::ObjectProxy(object) = rt.eval("({})").unwrap() else {
        panic!()
    };
    let err = rt
        .enter(|cx| object.get_item(cx, &constrictor::DictKey::from("gone")))
        .unwrap_err();
    assert!(matches!(err, HostError::Key(_)));
}

#[test]
fn engine_error_messages_include_the_js_stack_when_present() {
    let mut rt = Runtime::new().unwrap();
    let err = rt
        .eval("function inner() { throw new Error('deep'); } inner()")
        .unwrap_err();
    let HostError::Engine(engine) = &err else {
        panic!("expected an engine error");
    };
    assert!(engine.message().contains("deep"));
}

#[test]
fn overflow_error_names_the_bigint_escape_hatch() {
    let mut rt = Runtime::new().unwrap();
    let err = rt
        .define_global("big", &HostValue::Int(1 << 60))
        .unwrap_err();
    assert!(err.to_string().contains("big-integer"), "got: {err}");
}

#[test]
fn internal_binding_utils_answers_type_probes() {
    let mut rt = Runtime::new().unwrap();
    rt.eval("globalThis.utils = internalBinding('utils')").unwrap();
    assert_eq!(
        rt.eval("utils.isPromise(Promise.resolve())").unwrap(),
        HostValue::Bool(true)
    );
    assert_eq!(
        rt.eval("utils.isPromise({})").unwrap(),
        HostValue::Bool(false)
    );
    assert_eq!(
        rt.eval("utils.isRegExp(/x/)").unwrap(),
        HostValue::Bool(true)
    );
    assert_eq!(
        rt.eval("utils.isTypedArray(new Uint16Array(1))").unwrap(),
        HostValue::Bool(true)
    );
    assert_eq!(
        rt.eval("utils.isTypedArray(new DataView(new ArrayBuffer(1)))")
            .unwrap(),
        HostValue::Bool(false)
    );
    assert_eq!(
        rt.eval("utils.isAnyArrayBuffer(new ArrayBuffer(1))").unwrap(),
        HostValue::Bool(true)
    );

    rt.eval("utils.defineGlobal('fromBinding', 5)").unwrap();
    assert_eq!(rt.eval("fromBinding").unwrap(), HostValue::Int(5));
}

#[test]
fn internal_binding_promise_and_proxy_details() {
    let mut rt = Runtime::new().unwrap();
    rt.eval("globalThis.utils = internalBinding('utils')").unwrap();
    assert_eq!(
        rt.eval("utils.getPromiseDetails(Promise.resolve(3)).join(',')")
            .unwrap()
            .as_str(),
        Some("1,3")
    );
    assert_eq!(
        rt.eval("utils.getPromiseDetails(new Promise(() => {}))[0]")
            .unwrap(),
        HostValue::Int(0)
    );
    assert_eq!(
        rt.eval("utils.getPromiseDetails({})").unwrap(),
        HostValue::None
    );

    // Scripted proxies report [target, handler]; everything else reports
    // undefined.
    rt.eval("globalThis.t = {}; globalThis.h = {}; globalThis.p = new Proxy(t, h)")
        .unwrap();
    assert_eq!(
        rt.eval("utils.getProxyDetails(p)[0] === t").unwrap(),
        HostValue::Bool(true)
    );
    assert_eq!(
        rt.eval("utils.getProxyDetails(p)[1] === h").unwrap(),
        HostValue::Bool(true)
    );
    assert_eq!(
        rt.eval("utils.getProxyDetails({})").unwrap(),
        HostValue::None
    );
}

#[test]
fn unknown_binding_namespace_is_null() {
    let mut rt = Runtime::new().unwrap();
    assert_eq!(
        rt.eval("internalBinding('no-such-namespace')").unwrap(),
        HostValue::Null
    );
}

#[test]
fn runtime_stats_track_bridge_accounting() {
    let mut rt = Runtime::new().unwrap();
    let before = rt.stats();
    rt.define_global("d", &HostValue::dict([])).unwrap();
    let after = rt.stats();
    assert_eq!(after.live_proxies, before.live_proxies + 1);

    let f = constrictor::HostFn::new("noop", |_cx, _args| Ok(HostValue::None));
    rt.define_global("f", &HostValue::Func(f)).unwrap();
    assert_eq!(rt.stats().live_functions, before.live_functions + 1);
}
