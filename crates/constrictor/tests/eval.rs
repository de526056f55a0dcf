//! End-to-end `eval` behavior.

#![allow(missing_docs)]

use constrictor::{DictKey, EvalOptions, HostError, HostValue, Runtime};

#[test]
fn eval_arithmetic_returns_host_int() {
    let mut rt = Runtime::new().unwrap();
    let value = rt.eval("40 + 2").unwrap();
    assert_eq!(value.as_int(), Some(42));
}

#[test]
fn eval_object_literal_navigates_to_nested_element() {
    let mut rt = Runtime::new().unwrap();
    let value = rt.eval("({a: 1, b: [1, 2, 3]})").unwrap();
    let HostValue::ObjectProxy(object) = value else {
        panic!("expected an object proxy, got {value:?}");
    };
    let element = rt.enter(|cx| {
        let b = object.get_item(cx, &DictKey::from("b"))?;
        let HostValue::ArrayProxy(array) = b else {
            panic!("expected an array proxy");
        };
        array.get(cx, 1)
    });
    assert_eq!(element.unwrap(), HostValue::Int(2));
}

#[test]
fn host_dict_crosses_into_js_function() {
    let mut rt = Runtime::new().unwrap();
    let nested = HostValue::dict([(DictKey::from("y"), HostValue::Int(20))]);
    let dict = HostValue::dict([
        (DictKey::from("x"), HostValue::Int(10)),
        (DictKey::from("nested"), nested),
    ]);

    let func = rt.eval("d => d.nested.y * 2").unwrap();
    let HostValue::FunctionProxy(func) = func else {
        panic!("expected a function proxy");
    };
    let result = rt.enter(|cx| func.call(cx, &[dict])).unwrap();
    assert_eq!(result.as_int(), Some(40));
}

#[test]
fn eval_primitives() {
    let mut rt = Runtime::new().unwrap();
    assert_eq!(rt.eval("true").unwrap(), HostValue::Bool(true));
    assert_eq!(rt.eval("null").unwrap(), HostValue::Null);
    assert!(rt.eval("undefined").unwrap().is_none());
    assert_eq!(rt.eval("1.5").unwrap(), HostValue::Float(1.5));
    assert_eq!(rt.eval("'hi'").unwrap().as_str(), Some("hi"));
}

#[test]
fn eval_syntax_error_reports_engine_error() {
    let mut rt = Runtime::new().unwrap();
    let err = rt.eval("let let = 1;").unwrap_err();
    assert!(matches!(err, HostError::Engine(_)), "got {err:?}");
}

#[test]
fn eval_filename_shows_up_in_errors() {
    let mut rt = Runtime::new().unwrap();
    let options = EvalOptions {
        filename: Some("unit.js".into()),
        ..Default::default()
    };
    let err = rt.eval_with("throw new Error('named')", &options).unwrap_err();
    assert!(err.to_string().contains("named"), "got: {err}");
}

#[test]
fn strict_mode_rejects_undeclared_assignment() {
    let mut rt = Runtime::new().unwrap();
    let options = EvalOptions {
        strict: true,
        ..Default::default()
    };
    let err = rt.eval_with("undeclaredVariable = 3", &options).unwrap_err();
    assert!(matches!(err, HostError::Engine(_)));
    // Without strict mode the same assignment succeeds.
    assert!(rt.eval("undeclaredOther = 3").is_ok());
}

#[test]
fn no_script_rval_discards_the_result() {
    let mut rt = Runtime::new().unwrap();
    let options = EvalOptions {
        no_script_rval: true,
        ..Default::default()
    };
    let value = rt.eval_with("1 + 1", &options).unwrap();
    assert!(value.is_none());
}

#[test]
fn line_offset_is_attached_to_errors() {
    let mut rt = Runtime::new().unwrap();
    let options = EvalOptions {
        lineno: 12,
        ..Default::default()
    };
    let err = rt.eval_with("throw new Error('x')", &options).unwrap_err();
    assert!(err.to_string().contains("12"), "got: {err}");
}

#[test]
fn from_host_frame_infers_a_filename() {
    let mut rt = Runtime::new().unwrap();
    let options = EvalOptions {
        from_host_frame: true,
        ..Default::default()
    };
    // Good enough to know inference didn't break evaluation.
    assert_eq!(rt.eval_with("7", &options).unwrap(), HostValue::Int(7));
}

#[test]
fn is_compilable_unit_buffers_incomplete_input() {
    let mut rt = Runtime::new().unwrap();
    assert!(rt.is_compilable_unit("1 + 1"));
    assert!(rt.is_compilable_unit("function f() { return 1; }"));
    assert!(!rt.is_compilable_unit("function f() {"));
    assert!(!rt.is_compilable_unit("({"));
}

#[test]
fn eval_module_runs_to_completion() {
    let mut rt = Runtime::new().unwrap();
    let options = EvalOptions {
        module: true,
        ..Default::default()
    };
    let value = rt
        .eval_with("globalThis.fromModule = 9;", &options)
        .unwrap();
    assert!(value.is_none());
    assert_eq!(rt.eval("globalThis.fromModule").unwrap(), HostValue::Int(9));
}

#[test]
fn collect_is_callable() {
    let mut rt = Runtime::new().unwrap();
    rt.eval("({})").unwrap();
    rt.collect();
}

#[test]
fn second_runtime_on_thread_is_refused() {
    let mut rt = Runtime::new().unwrap();
    assert!(Runtime::new().is_err());
    rt.eval("1").unwrap();
}
