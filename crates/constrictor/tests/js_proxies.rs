//! Host→JS proxies: dicts, lists, iterables and bytes as seen from JS.

#![allow(missing_docs)]

use constrictor::{DictKey, HostBytes, HostIter, HostValue, Runtime};
use indoc::indoc;

fn dict_fixture() -> HostValue {
    HostValue::dict([
        (DictKey::from("x"), HostValue::Int(10)),
        (DictKey::from("name"), HostValue::string("host")),
    ])
}

#[test]
fn dict_proxy_reads_and_writes_the_original() {
    let mut rt = Runtime::new().unwrap();
    let dict = dict_fixture();
    rt.define_global("d", &dict).unwrap();

    assert_eq!(rt.eval("d.x").unwrap(), HostValue::Int(10));
    assert_eq!(rt.eval("d['name']").unwrap().as_str(), Some("host"));
    assert_eq!(rt.eval("d.missing").unwrap(), HostValue::None);

    rt.eval("d.x = 11; d.fresh = [1, 2]").unwrap();
    let HostValue::Dict(d) = dict else { unreachable!() };
    assert_eq!(d.get(&"x".into()), Some(HostValue::Int(11)));
    assert!(matches!(
        d.get(&"fresh".into()),
        Some(HostValue::List(_))
    ));
}

#[test]
fn dict_proxy_delete_removes_the_host_key() {
    let mut rt = Runtime::new().unwrap();
    let dict = dict_fixture();
    rt.define_global("d", &dict).unwrap();
    assert_eq!(rt.eval("delete d.x").unwrap(), HostValue::Bool(true));
    let HostValue::Dict(d) = dict else { unreachable!() };
    assert!(!d.contains(&"x".into()));
}

#[test]
fn dict_proxy_enumeration_and_membership() {
    let mut rt = Runtime::new().unwrap();
    rt.define_global("d", &dict_fixture()).unwrap();
    assert_eq!(
        rt.eval("Object.keys(d).join(',')").unwrap().as_str(),
        Some("x,name")
    );
    assert_eq!(rt.eval("'x' in d").unwrap(), HostValue::Bool(true));
    assert_eq!(rt.eval("'nope' in d").unwrap(), HostValue::Bool(false));
    assert_eq!(
        rt.eval("JSON.stringify(d)").unwrap().as_str(),
        Some(r#"{"x":10,"name":"host"}"#)
    );
}

#[test]
fn dict_proxy_prototype_methods() {
    let mut rt = Runtime::new().unwrap();
    rt.define_global("d", &dict_fixture()).unwrap();
    assert_eq!(
        rt.eval("d.toString()").unwrap().as_str(),
        Some("[object Object]")
    );
    // `Object.prototype` stays reachable through the prototype chain.
    assert_eq!(
        rt.eval("d.hasOwnProperty instanceof Function").unwrap(),
        HostValue::Bool(true)
    );
}

#[test]
fn int_like_keys_are_numeric_ids() {
    let mut rt = Runtime::new().unwrap();
    let dict = HostValue::dict([(DictKey::Int(3), HostValue::string("three"))]);
    rt.define_global("d", &dict).unwrap();
    assert_eq!(rt.eval("d[3]").unwrap().as_str(), Some("three"));
    assert_eq!(rt.eval("d['3']").unwrap().as_str(), Some("three"));
}

fn list_fixture() -> HostValue {
    HostValue::list([HostValue::Int(3), HostValue::Int(1), HostValue::Int(2)])
}

#[test]
fn list_proxy_length_and_indexing() {
    let mut rt = Runtime::new().unwrap();
    let list = list_fixture();
    rt.define_global("a", &list).unwrap();
    assert_eq!(rt.eval("a.length").unwrap(), HostValue::Int(3));
    assert_eq!(rt.eval("a[0]").unwrap(), HostValue::Int(3));
    assert_eq!(rt.eval("a['2']").unwrap(), HostValue::Int(2));
    assert_eq!(rt.eval("a[9]").unwrap(), HostValue::None);
    assert_eq!(rt.eval("Array.isArray(a)").unwrap(), HostValue::Bool(true));
}

#[test]
fn list_proxy_write_past_end_pads_with_undefined() {
    let mut rt = Runtime::new().unwrap();
    let list = HostValue::list([HostValue::Int(1)]);
    rt.define_global("a", &list).unwrap();
    rt.eval("a[3] = 9").unwrap();
    let HostValue::List(l) = list else { unreachable!() };
    assert_eq!(l.len(), 4);
    assert_eq!(l.get(1), Some(HostValue::None));
    assert_eq!(l.get(3), Some(HostValue::Int(9)));
}

#[test]
fn list_proxy_delete_preserves_length() {
    let mut rt = Runtime::new().unwrap();
    let list = list_fixture();
    rt.define_global("a", &list).unwrap();
    rt.eval("delete a[1]").unwrap();
    let HostValue::List(l) = list else { unreachable!() };
    assert_eq!(l.len(), 3);
    assert_eq!(l.get(1), Some(HostValue::None));
}

#[test]
fn sort_mutates_the_host_list_and_returns_the_proxy() {
    let mut rt = Runtime::new().unwrap();
    let list = list_fixture();
    rt.define_global("a", &list).unwrap();

    let func = rt.eval("arr => arr.sort((x, y) => x - y)").unwrap();
    let HostValue::FunctionProxy(func) = func else {
        panic!("expected a function");
    };
    let result = rt.enter(|cx| func.call(cx, &[list.clone()])).unwrap();

    let HostValue::List(l) = &list else { unreachable!() };
    assert_eq!(
        l.to_vec(),
        vec![HostValue::Int(1), HostValue::Int(2), HostValue::Int(3)]
    );
    // The same host list comes back, not a copy.
    assert_eq!(result, list);
}

#[test]
fn default_sort_compares_string_forms() {
    let mut rt = Runtime::new().unwrap();
    let list = HostValue::list([
        HostValue::Int(10),
        HostValue::Int(9),
        HostValue::Int(100),
    ]);
    rt.define_global("a", &list).unwrap();
    assert_eq!(
        rt.eval("a.sort().join(',')").unwrap().as_str(),
        Some("10,100,9")
    );
}

/// Per-method parity against a plain JS array of identical content.
#[test]
fn array_methods_match_plain_arrays() {
    let mut rt = Runtime::new().unwrap();
    let cases = [
        "a.indexOf(2)",
        "a.lastIndexOf(1)",
        "a.includes(3)",
        "a.includes(99)",
        "a.join('-')",
        "a.slice(1).join(',')",
        "a.slice(-2).join(',')",
        "a.concat([7, 8]).join(',')",
        "a.map(x => x * 2).join(',')",
        "a.filter(x => x > 1).join(',')",
        "a.reduce((s, x) => s + x, 0)",
        "a.reduceRight((s, x) => s + x)",
        "a.some(x => x > 2)",
        "a.every(x => x > 0)",
        "a.find(x => x > 1)",
        "a.findIndex(x => x > 1)",
        "a.flat().join(',')",
        "a.flatMap(x => [x, x]).join(',')",
        "a.toString()",
        "[...a.keys()].join(',')",
        "[...a.values()].join(',')",
        "[...a.entries()].map(e => e.join(':')).join(',')",
        "[...a].join(',')",
    ];
    for case in cases {
        rt.define_global("a", &list_fixture()).unwrap();
        let proxied = rt.eval(case).unwrap();
        rt.eval("a = [3, 1, 2]").unwrap();
        let plain = rt.eval(case).unwrap();
        assert_eq!(proxied, plain, "parity failure for {case}");
    }
}

#[test]
fn mutating_array_methods_match_plain_arrays() {
    let mut rt = Runtime::new().unwrap();
    let cases = [
        "a.push(4, 5)",
        "a.pop()",
        "a.shift()",
        "a.unshift(0)",
        "a.reverse().join(',')",
        "a.splice(1, 1, 7, 8).join(',')",
        "a.fill(0, 1).join(',')",
        "a.copyWithin(0, 1).join(',')",
    ];
    for case in cases {
        rt.define_global("a", &list_fixture()).unwrap();
        let proxied = rt.eval(&format!("{case} + '|' + a.length")).unwrap();
        rt.eval("a = [3, 1, 2]").unwrap();
        let plain = rt.eval(&format!("{case} + '|' + a.length")).unwrap();
        assert_eq!(proxied, plain, "parity failure for {case}");
    }
}

#[test]
fn empty_list_edge_methods_are_no_ops() {
    let mut rt = Runtime::new().unwrap();
    rt.define_global("a", &HostValue::list([])).unwrap();
    assert_eq!(rt.eval("a.pop()").unwrap(), HostValue::None);
    assert_eq!(rt.eval("a.shift()").unwrap(), HostValue::None);
    assert_eq!(rt.eval("a.reverse() === a").unwrap(), HostValue::Bool(true));
}

#[test]
fn callback_this_arg_is_honored() {
    let mut rt = Runtime::new().unwrap();
    rt.define_global("a", &list_fixture()).unwrap();
    let out = rt
        .eval(indoc! {r#"
            (() => {
                const seen = [];
                a.forEach(function (x) { seen.push(this.tag + x); }, { tag: "t" });
                return seen.join(",");
            })()
        "#})
        .unwrap();
    assert_eq!(out.as_str(), Some("t3,t1,t2"));
}

#[test]
fn iterable_proxy_drives_for_of() {
    let mut rt = Runtime::new().unwrap();
    let iter = HostIter::new((1..=3).map(HostValue::Int));
    rt.define_global("it", &HostValue::Iter(iter)).unwrap();
    let out = rt
        .eval(indoc! {r#"
            (() => {
                const seen = [];
                for (const v of it) seen.push(v);
                return seen.join(",");
            })()
        "#})
        .unwrap();
    assert_eq!(out.as_str(), Some("1,2,3"));
}

#[test]
fn iterable_proxy_answers_next_directly() {
    let mut rt = Runtime::new().unwrap();
    let iter = HostIter::new([HostValue::Int(7)].into_iter());
    rt.define_global("it", &HostValue::Iter(iter)).unwrap();
    assert_eq!(rt.eval("it.next().value").unwrap(), HostValue::Int(7));
    assert_eq!(rt.eval("it.next().done").unwrap(), HostValue::Bool(true));
}

#[test]
fn bytes_proxy_is_a_read_only_view() {
    let mut rt = Runtime::new().unwrap();
    let bytes = HostValue::Bytes(HostBytes::immutable(vec![5, 6, 7]));
    rt.define_global("b", &bytes).unwrap();

    assert_eq!(rt.eval("b.length").unwrap(), HostValue::Int(3));
    assert_eq!(rt.eval("b.byteLength").unwrap(), HostValue::Int(3));
    assert_eq!(rt.eval("b.byteOffset").unwrap(), HostValue::Int(0));
    assert_eq!(rt.eval("b.BYTES_PER_ELEMENT").unwrap(), HostValue::Int(1));
    assert_eq!(rt.eval("b[1]").unwrap(), HostValue::Int(6));
    assert_eq!(
        rt.eval("b.constructor === Uint8Array").unwrap(),
        HostValue::Bool(true)
    );
    assert_eq!(
        rt.eval("b.buffer instanceof ArrayBuffer").unwrap(),
        HostValue::Bool(true)
    );
    // Writes are refused.
    assert!(rt.eval("'use strict'; b[0] = 9").is_err());
    let HostValue::Bytes(b) = bytes else { unreachable!() };
    assert_eq!(b.byte(0), Some(5));
}

#[test]
fn generic_object_proxy_forwards_attributes() {
    let mut rt = Runtime::new().unwrap();
    let object = constrictor::HostObject::new("Point");
    object.set_attr("x", HostValue::Int(4));
    rt.define_global("p", &HostValue::Object(object.clone()))
        .unwrap();
    assert_eq!(rt.eval("p.x").unwrap(), HostValue::Int(4));
    rt.eval("p.y = 5").unwrap();
    assert_eq!(object.get_attr("y"), Some(HostValue::Int(5)));
    assert_eq!(
        rt.eval("Object.keys(p).join(',')").unwrap().as_str(),
        Some("x,y")
    );
}

#[test]
fn proxies_unwrap_on_the_way_back() {
    let mut rt = Runtime::new().unwrap();
    let dict = dict_fixture();
    rt.define_global("d", &dict).unwrap();
    // Identity through the boundary: the same host dict comes back.
    let back = rt.eval("d").unwrap();
    assert_eq!(back, dict);

    let list = list_fixture();
    rt.define_global("a", &list).unwrap();
    assert_eq!(rt.eval("a").unwrap(), list);
}

#[test]
fn host_callable_is_callable_from_js() {
    let mut rt = Runtime::new().unwrap();
    let double = constrictor::HostFn::new("double", |_cx, args| {
        let n = args.first().and_then(HostValue::as_int).unwrap_or(0);
        Ok(HostValue::Int(n * 2))
    })
    .with_arity(1);
    rt.define_global("double", &HostValue::Func(double)).unwrap();
    assert_eq!(rt.eval("double(21)").unwrap(), HostValue::Int(42));
    assert_eq!(rt.eval("double.length").unwrap(), HostValue::Int(1));
    // Wrapped callables unwrap back to the original host function.
    let back = rt.eval("double").unwrap();
    assert!(matches!(back, HostValue::Func(_)));
}

#[test]
fn bound_host_methods_rebind_to_this_arg() {
    let mut rt = Runtime::new().unwrap();
    let original = HostValue::dict([(DictKey::from("tag"), HostValue::string("old"))]);
    let collect = constrictor::HostFn::method("collect", original, |cx, recv, args| {
        let recv = recv.expect("bound method has a receiver");
        let HostValue::Dict(recv) = recv else {
            panic!("receiver must be the dict");
        };
        let tag = recv
            .get(&"tag".into())
            .and_then(|t| t.as_str().map(str::to_owned))
            .unwrap_or_default();
        let seen = recv.get(&"seen".into()).and_then(|v| v.as_int()).unwrap_or(0);
        recv.insert("seen".into(), HostValue::Int(seen + 1));
        let _ = (cx, args);
        Ok(HostValue::string(tag))
    });
    rt.define_global("collect", &HostValue::Func(collect)).unwrap();
    rt.define_global("a", &list_fixture()).unwrap();

    let replacement = HostValue::dict([(DictKey::from("tag"), HostValue::string("new"))]);
    rt.define_global("replacement", &replacement).unwrap();
    rt.eval("a.forEach(collect, replacement)").unwrap();

    // The callback ran against the rebound receiver, once per element.
    let HostValue::Dict(replacement) = replacement else {
        unreachable!()
    };
    assert_eq!(replacement.get(&"seen".into()), Some(HostValue::Int(3)));
}

#[test]
fn host_callable_errors_cross_as_js_exceptions() {
    let mut rt = Runtime::new().unwrap();
    let boom = constrictor::HostFn::new("boom", |_cx, _args| {
        Err(constrictor::HostError::Value("expected failure".into()))
    });
    rt.define_global("boom", &HostValue::Func(boom)).unwrap();
    let caught = rt
        .eval("(() => { try { boom(); return 'no'; } catch (e) { return String(e); } })()")
        .unwrap();
    let text = caught.as_str().unwrap().to_string();
    assert!(text.contains("ValueError"), "got: {text}");
    assert!(text.contains("expected failure"), "got: {text}");
}
