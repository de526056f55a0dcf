//! JS→host proxies: JS objects, arrays, strings and functions behind host
//! facades.

#![allow(missing_docs)]

use constrictor::{DictKey, HostValue, ItemKind, JsMethodProxy, Runtime};

#[test]
fn object_proxy_maps_like_a_dict() {
    let mut rt = Runtime::new().unwrap();
    let value = rt.eval("({a: 1, b: 'two'})").unwrap();
    let HostValue::ObjectProxy(object) = value else {
        panic!("expected an object proxy");
    };

    rt.enter(|cx| {
        assert_eq!(object.len(cx).unwrap(), 2);
        assert_eq!(
            object.get(cx, &"a".into()).unwrap(),
            Some(HostValue::Int(1))
        );
        assert!(object.contains(cx, &"b".into()).unwrap());
        assert!(!object.contains(cx, &"zzz".into()).unwrap());

        object.set(cx, &"c".into(), &HostValue::Bool(true)).unwrap();
        assert_eq!(
            object.get(cx, &"c".into()).unwrap(),
            Some(HostValue::Bool(true))
        );

        assert!(object.delete(cx, &"a".into()).unwrap());
        assert!(!object.contains(cx, &"a".into()).unwrap());

        // Subscript semantics: missing key is a key error.
        assert!(matches!(
            object.get_item(cx, &DictKey::from("a")),
            Err(constrictor::HostError::Key(_))
        ));
    });

    // The JS side observed every mutation.
    rt.define_global("o", &HostValue::ObjectProxy(object)).unwrap();
    assert_eq!(
        rt.eval("JSON.stringify(o)").unwrap().as_str(),
        Some(r#"{"b":"two","c":true}"#)
    );
}

#[test]
fn object_proxy_dict_method_set() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::ObjectProxy(object) = rt.eval("({a: 1})").unwrap() else {
        panic!("expected an object proxy");
    };
    rt.enter(|cx| {
        assert_eq!(
            object
                .get_or(cx, &"missing".into(), HostValue::Int(9))
                .unwrap(),
            HostValue::Int(9)
        );
        assert_eq!(
            object
                .setdefault(cx, &"fresh".into(), HostValue::Int(2))
                .unwrap(),
            HostValue::Int(2)
        );
        assert_eq!(
            object
                .setdefault(cx, &"fresh".into(), HostValue::Int(3))
                .unwrap(),
            HostValue::Int(2),
            "setdefault keeps the first value"
        );
        assert_eq!(
            object.pop(cx, &"a".into(), None).unwrap(),
            HostValue::Int(1)
        );
        assert!(object.pop(cx, &"a".into(), None).is_err());
        assert_eq!(
            object
                .pop(cx, &"a".into(), Some(HostValue::None))
                .unwrap(),
            HostValue::None
        );

        let copy = object.copy(cx).unwrap();
        object.clear(cx).unwrap();
        assert_eq!(object.len(cx).unwrap(), 0);
        assert_eq!(copy.len(cx).unwrap(), 1, "copies are independent");
    });
}

#[test]
fn object_proxy_update_and_merge() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::ObjectProxy(object) = rt.eval("({a: 1})").unwrap() else {
        panic!("expected an object proxy");
    };
    let other = HostValue::dict([
        (DictKey::from("b"), HostValue::Int(2)),
        (DictKey::from("a"), HostValue::Int(10)),
    ]);
    rt.enter(|cx| {
        let merged = object.merged(cx, &other).unwrap();
        assert_eq!(
            merged.get(cx, &"a".into()).unwrap(),
            Some(HostValue::Int(10))
        );
        assert_eq!(merged.get(cx, &"b".into()).unwrap(), Some(HostValue::Int(2)));
        // `|` leaves the left operand untouched.
        assert_eq!(
            object.get(cx, &"a".into()).unwrap(),
            Some(HostValue::Int(1))
        );

        object.merge_in_place(cx, &other).unwrap();
        assert_eq!(
            object.get(cx, &"a".into()).unwrap(),
            Some(HostValue::Int(10))
        );
    });
}

#[test]
fn object_proxy_views_and_iteration() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::ObjectProxy(object) = rt.eval("({a: 1, b: 2, c: 3})").unwrap() else {
        panic!("expected an object proxy");
    };
    rt.enter(|cx| {
        let keys = object.keys();
        assert_eq!(keys.len(cx).unwrap(), 3);
        assert!(keys.contains(cx, &"a".into()).unwrap());
        let names: Vec<String> = keys
            .to_list(cx)
            .unwrap()
            .iter()
            .map(|k| k.as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);

        let shared = keys
            .intersection(cx, [HostValue::string("b"), HostValue::string("z")])
            .unwrap();
        assert_eq!(shared, vec![HostValue::string("b")]);

        let values = object.values();
        assert!(values.contains(cx, &HostValue::Int(2)).unwrap());

        let items = object.items();
        let pairs = items.to_list(cx).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(
            pairs[0],
            HostValue::list([HostValue::string("a"), HostValue::Int(1)])
        );

        // Iteration by kind, with live reads.
        let it = object.iter(cx, ItemKind::Keys).unwrap();
        let mut seen = Vec::new();
        while let Some(k) = it.next(cx).unwrap() {
            seen.push(k.as_str().unwrap().to_string());
        }
        assert_eq!(seen, ["a", "b", "c"]);
    });
}

#[test]
fn object_proxy_equality_and_repr() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::ObjectProxy(a) = rt.eval("({x: 1, y: [1, 2]})").unwrap() else {
        panic!()
    };
    let HostValue::ObjectProxy(b) = rt.eval("({x: 1, y: [1, 2]})").unwrap() else {
        panic!()
    };
    let host_twin = HostValue::dict([
        (DictKey::from("x"), HostValue::Int(1)),
        (
            DictKey::from("y"),
            HostValue::list([HostValue::Int(1), HostValue::Int(2)]),
        ),
    ]);
    rt.enter(|cx| {
        let mut visited = Default::default();
        assert!(a
            .eq_value(cx, &HostValue::ObjectProxy(b.clone()), &mut visited)
            .unwrap());
        let mut visited = Default::default();
        assert!(a.eq_value(cx, &host_twin, &mut visited).unwrap());
        assert_eq!(a.repr(cx).unwrap(), r#"{"x": 1, "y": [1, 2]}"#);
    });
}

#[test]
fn cyclic_structures_repr_and_compare_without_crashing() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::ObjectProxy(cyclic) =
        rt.eval("(() => { const o = {n: 1}; o.self = o; return o; })()").unwrap()
    else {
        panic!()
    };
    rt.enter(|cx| {
        let repr = cyclic.repr(cx).unwrap();
        assert!(repr.contains("{...}"), "cycle marker missing: {repr}");

        let mut visited = Default::default();
        let same = cyclic
            .eq_value(cx, &HostValue::ObjectProxy(cyclic.clone()), &mut visited)
            .unwrap();
        assert!(same);
    });

    let HostValue::ArrayProxy(cyclic_arr) =
        rt.eval("(() => { const a = [1]; a.push(a); return a; })()").unwrap()
    else {
        panic!()
    };
    rt.enter(|cx| {
        let repr = cyclic_arr.repr(cx).unwrap();
        assert!(repr.contains("[...]"), "cycle marker missing: {repr}");
    });
}

#[test]
fn array_proxy_behaves_like_a_list() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::ArrayProxy(array) = rt.eval("[10, 20, 30]").unwrap() else {
        panic!("expected an array proxy");
    };
    rt.enter(|cx| {
        assert_eq!(array.len(cx).unwrap(), 3);
        assert_eq!(array.get(cx, 0).unwrap(), HostValue::Int(10));
        assert_eq!(array.get(cx, -1).unwrap(), HostValue::Int(30));
        assert!(array.get(cx, 5).is_err());

        array.set(cx, 1, &HostValue::Int(21)).unwrap();
        assert_eq!(array.get(cx, 1).unwrap(), HostValue::Int(21));

        array.append(cx, &HostValue::Int(40)).unwrap();
        assert_eq!(array.len(cx).unwrap(), 4);

        array.insert(cx, 0, &HostValue::Int(5)).unwrap();
        assert_eq!(array.get(cx, 0).unwrap(), HostValue::Int(5));

        assert_eq!(array.pop(cx, None).unwrap(), HostValue::Int(40));
        assert_eq!(array.index_of(cx, &HostValue::Int(21)).unwrap(), 2);
        assert_eq!(array.count(cx, &HostValue::Int(21)).unwrap(), 1);

        array.remove(cx, &HostValue::Int(21)).unwrap();
        assert!(array.remove(cx, &HostValue::Int(999)).is_err());

        array.reverse(cx).unwrap();
        assert_eq!(array.get(cx, 0).unwrap(), HostValue::Int(30));

        array.delete(cx, 0).unwrap();
        assert_eq!(array.len(cx).unwrap(), 2);

        let copy = array.copy(cx).unwrap();
        array.clear(cx).unwrap();
        assert_eq!(array.len(cx).unwrap(), 0);
        assert_eq!(copy.as_list().unwrap().len(), 2, "copies are independent");
    });
}

#[test]
fn array_proxy_iterates_both_directions() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::ArrayProxy(array) = rt.eval("[1, 2, 3]").unwrap() else {
        panic!()
    };
    rt.enter(|cx| {
        let forward = array.iter(cx).unwrap();
        let mut seen = Vec::new();
        while let Some(v) = forward.next(cx).unwrap() {
            seen.push(v.as_int().unwrap());
        }
        assert_eq!(seen, [1, 2, 3]);

        let backward = array.iter_reversed(cx).unwrap();
        assert!(backward.is_reversed());
        let mut seen = Vec::new();
        while let Some(v) = backward.next(cx).unwrap() {
            seen.push(v.as_int().unwrap());
        }
        assert_eq!(seen, [3, 2, 1]);
    });
}

#[test]
fn array_proxy_sorts_in_place() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::ArrayProxy(array) = rt.eval("[3, 1, 2]").unwrap() else {
        panic!()
    };
    let comparator = rt.eval("(x, y) => x - y").unwrap();
    rt.enter(|cx| {
        array.sort_by(cx, Some(&comparator)).unwrap();
        assert_eq!(
            array.to_vec(cx).unwrap(),
            vec![HostValue::Int(1), HostValue::Int(2), HostValue::Int(3)]
        );
    });
}

#[test]
fn string_proxy_reads_and_shares_storage() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::Str(s) = rt.eval("'from js ' + 'land'").unwrap() else {
        panic!()
    };
    let constrictor::HostStr::Proxy(proxy) = s else {
        panic!("expected a string proxy");
    };
    assert_eq!(proxy.as_str(), "from js land");
    let copy = proxy.copied();
    assert!(proxy.shares_storage(&copy));
    assert_eq!(proxy, copy);
}

#[test]
fn function_proxy_round_trips_arguments() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::FunctionProxy(concat) =
        rt.eval("(a, b) => `${a}|${b}`").unwrap()
    else {
        panic!()
    };
    let out = rt
        .enter(|cx| concat.call(cx, &[HostValue::Int(1), HostValue::string("two")]))
        .unwrap();
    assert_eq!(out.as_str(), Some("1|two"));
}

#[test]
fn function_proxy_fails_fast_on_unconvertible_arguments() {
    let mut rt = Runtime::new().unwrap();
    rt.eval("globalThis.called = false").unwrap();
    let HostValue::FunctionProxy(f) =
        rt.eval("x => { globalThis.called = true; return x; }").unwrap()
    else {
        panic!()
    };
    let err = rt.enter(|cx| f.call(cx, &[HostValue::Int(1 << 60)])).unwrap_err();
    assert!(matches!(err, constrictor::HostError::Overflow(_)));
    assert_eq!(
        rt.eval("globalThis.called").unwrap(),
        HostValue::Bool(false),
        "the JS body must not run when an argument fails to convert"
    );
}

#[test]
fn method_proxy_binds_the_receiver_as_this() {
    let mut rt = Runtime::new().unwrap();
    let HostValue::FunctionProxy(getter) = rt.eval("function f() { return this.tag; } f").unwrap()
    else {
        panic!()
    };
    let receiver = HostValue::dict([(DictKey::from("tag"), HostValue::string("bound"))]);
    let method = JsMethodProxy::new(&getter, receiver.clone());
    let out = rt.enter(|cx| method.call(cx, &[])).unwrap();
    assert_eq!(out.as_str(), Some("bound"));
    assert_eq!(method.receiver(), &receiver);
}
