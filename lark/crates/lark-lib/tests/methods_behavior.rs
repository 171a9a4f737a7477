//! Behaviour of the per-type methods, including the collision-heavy
//! dict cost model.

mod common;

use common::{as_i64, as_string, call, call_method, thread};
use lark_util::ErrorKind;
use lark_value::{LarkInt, Value};

fn ints(values: &[i64]) -> Value {
    common::ints(values)
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[test]
fn list_mutators() {
    let t = thread();
    let list = ints(&[1, 2, 3]);
    call_method(&t, &list, "append", vec![Value::int(4)]).unwrap();
    call_method(&t, &list, "insert", vec![Value::int(0), Value::int(0)]).unwrap();
    assert!(list.equals(&ints(&[0, 1, 2, 3, 4])));

    let popped = call_method(&t, &list, "pop", vec![]).unwrap();
    assert_eq!(as_i64(&popped), 4);
    let popped = call_method(&t, &list, "pop", vec![Value::int(0)]).unwrap();
    assert_eq!(as_i64(&popped), 0);

    call_method(&t, &list, "remove", vec![Value::int(2)]).unwrap();
    assert!(list.equals(&ints(&[1, 3])));
    assert_eq!(
        call_method(&t, &list, "remove", vec![Value::int(99)])
            .unwrap_err()
            .kind(),
        ErrorKind::ValueOutOfRange
    );

    call_method(&t, &list, "clear", vec![]).unwrap();
    assert_eq!(list.length(), Some(0));
}

#[test]
fn list_extend_and_index() {
    let t = thread();
    let list = ints(&[1]);
    call_method(&t, &list, "extend", vec![ints(&[2, 3])]).unwrap();
    assert!(list.equals(&ints(&[1, 2, 3])));
    assert_eq!(
        as_i64(&call_method(&t, &list, "index", vec![Value::int(3)]).unwrap()),
        2
    );
    assert_eq!(
        call_method(&t, &list, "index", vec![Value::int(9)])
            .unwrap_err()
            .kind(),
        ErrorKind::ValueOutOfRange
    );
}

#[test]
fn frozen_list_methods_refuse() {
    let t = thread();
    let list = ints(&[1]);
    list.freeze();
    assert_eq!(
        call_method(&t, &list, "append", vec![Value::int(2)])
            .unwrap_err()
            .kind(),
        ErrorKind::Frozen
    );
}

// ---------------------------------------------------------------------------
// dict
// ---------------------------------------------------------------------------

#[test]
fn dict_accessors() {
    let t = thread();
    let dict = call(&t, "dict", vec![]).unwrap();
    call_method(&t, &dict, "update", vec![Value::list(vec![
        Value::tuple(vec![Value::str("a"), Value::int(1)]),
        Value::tuple(vec![Value::str("b"), Value::int(2)]),
    ])])
    .unwrap();

    let got = call_method(&t, &dict, "get", vec![Value::str("a")]).unwrap();
    assert_eq!(as_i64(&got), 1);
    let fallback =
        call_method(&t, &dict, "get", vec![Value::str("zz"), Value::int(9)]).unwrap();
    assert_eq!(as_i64(&fallback), 9);

    let keys = call_method(&t, &dict, "keys", vec![]).unwrap();
    assert!(keys.equals(&Value::list(vec![Value::str("a"), Value::str("b")])));
    let values = call_method(&t, &dict, "values", vec![]).unwrap();
    assert!(values.equals(&ints(&[1, 2])));

    let prev = call_method(&t, &dict, "setdefault", vec![Value::str("a"), Value::int(0)]).unwrap();
    assert_eq!(as_i64(&prev), 1);
    let fresh = call_method(&t, &dict, "setdefault", vec![Value::str("c"), Value::int(3)]).unwrap();
    assert_eq!(as_i64(&fresh), 3);
    assert_eq!(dict.length(), Some(3));
}

#[test]
fn dict_pop_and_popitem() {
    let t = thread();
    let dict = call(&t, "dict", vec![]).unwrap();
    call_method(&t, &dict, "update", vec![Value::list(vec![
        Value::tuple(vec![Value::int(1), Value::str("one")]),
        Value::tuple(vec![Value::int(2), Value::str("two")]),
    ])])
    .unwrap();

    let v = call_method(&t, &dict, "pop", vec![Value::int(1)]).unwrap();
    assert_eq!(as_string(&v), "one");
    assert_eq!(
        call_method(&t, &dict, "pop", vec![Value::int(1)])
            .unwrap_err()
            .kind(),
        ErrorKind::NameLookup
    );

    // popitem removes the oldest surviving entry.
    let item = call_method(&t, &dict, "popitem", vec![]).unwrap();
    assert!(item.equals(&Value::tuple(vec![Value::int(2), Value::str("two")])));
    assert_eq!(
        call_method(&t, &dict, "popitem", vec![]).unwrap_err().kind(),
        ErrorKind::NameLookup
    );
}

/// 500 keys whose hashes collide into one probe chain: a hit costs at
/// most ceil(500/8) + 1 steps, a miss at least ceil(500/8).
#[test]
fn dict_pop_cost_under_heavy_collisions() {
    let t = thread();
    let dict = call(&t, "dict", vec![]).unwrap();

    // n + k*2^64 differs from n only above bit 63, so every key
    // shares its low-64-bit hash with every other.
    let two_to_64 = LarkInt::from(1).shl(&LarkInt::from(64)).unwrap();
    let key = |k: i64| -> Value {
        Value::Int(two_to_64.mul(&LarkInt::from(k)).add(&LarkInt::from(7)))
    };
    let probe_hash = Value::Int(two_to_64.mul(&LarkInt::from(0)).add(&LarkInt::from(7)))
        .hash_value()
        .unwrap();
    for k in 0..500 {
        let kv = key(k);
        assert_eq!(kv.hash_value().unwrap(), probe_hash, "collision setup broken");
        call_method(&t, &dict, "setdefault", vec![kv, Value::int(k)]).unwrap();
    }

    let bound = 500_u64 / 8 + 1;

    // Present key, worst position: the last inserted.
    let before = t.accountant().steps();
    let popped = call_method(&t, &dict, "pop", vec![key(499)]).unwrap();
    assert_eq!(as_i64(&popped), 499);
    let hit_cost = t.accountant().steps() - before - 1; // minus the attr step
    assert!(
        hit_cost <= bound + 1,
        "hit probed too much: {} > {}",
        hit_cost,
        bound + 1
    );

    // Missing key with the same colliding hash walks the whole chain.
    let missing = Value::Int(two_to_64.mul(&LarkInt::from(1000)).add(&LarkInt::from(7)));
    let before = t.accountant().steps();
    let err = call_method(&t, &dict, "pop", vec![missing]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NameLookup);
    let miss_cost = t.accountant().steps() - before - 1;
    assert!(
        miss_cost >= 500 / 8,
        "miss probed too little: {} < {}",
        miss_cost,
        500 / 8
    );
}

// ---------------------------------------------------------------------------
// set
// ---------------------------------------------------------------------------

#[test]
fn set_relational_methods() {
    let t = thread();
    let a = call(&t, "set", vec![ints(&[1, 2, 3])]).unwrap();
    let b = call(&t, "set", vec![ints(&[2, 3, 4])]).unwrap();

    let union = call_method(&t, &a, "union", vec![b.clone()]).unwrap();
    assert_eq!(union.length(), Some(4));
    let inter = call_method(&t, &a, "intersection", vec![b.clone()]).unwrap();
    assert_eq!(inter.length(), Some(2));
    let diff = call_method(&t, &a, "difference", vec![b.clone()]).unwrap();
    assert!(diff.equals(&call(&t, "set", vec![ints(&[1])]).unwrap()));
    let sym = call_method(&t, &a, "symmetric_difference", vec![b.clone()]).unwrap();
    assert!(sym.equals(&call(&t, "set", vec![ints(&[1, 4])]).unwrap()));

    // Relational methods accept plain iterables too.
    let disjoint = call_method(&t, &a, "isdisjoint", vec![ints(&[7, 8])]).unwrap();
    assert!(disjoint.equals(&Value::Bool(true)));
    let subset = call_method(&t, &a, "issubset", vec![ints(&[1, 2, 3, 9])]).unwrap();
    assert!(subset.equals(&Value::Bool(true)));
    let superset = call_method(&t, &a, "issuperset", vec![ints(&[1, 2])]).unwrap();
    assert!(superset.equals(&Value::Bool(true)));
}

#[test]
fn set_mutators() {
    let t = thread();
    let set = call(&t, "set", vec![]).unwrap();
    call_method(&t, &set, "add", vec![Value::int(1)]).unwrap();
    call_method(&t, &set, "add", vec![Value::int(1)]).unwrap();
    assert_eq!(set.length(), Some(1));

    call_method(&t, &set, "discard", vec![Value::int(99)]).unwrap();
    assert_eq!(
        call_method(&t, &set, "remove", vec![Value::int(99)])
            .unwrap_err()
            .kind(),
        ErrorKind::NameLookup
    );
    call_method(&t, &set, "add", vec![Value::int(2)]).unwrap();
    // pop removes the oldest member.
    let popped = call_method(&t, &set, "pop", vec![]).unwrap();
    assert_eq!(as_i64(&popped), 1);
    call_method(&t, &set, "clear", vec![]).unwrap();
    assert_eq!(set.length(), Some(0));
}

// ---------------------------------------------------------------------------
// string
// ---------------------------------------------------------------------------

fn s(text: &str) -> Value {
    Value::str(text)
}

#[test]
fn string_case_methods() {
    let t = thread();
    assert_eq!(
        as_string(&call_method(&t, &s("Hello World"), "lower", vec![]).unwrap()),
        "hello world"
    );
    assert_eq!(
        as_string(&call_method(&t, &s("héllo"), "upper", vec![]).unwrap()),
        "HÉLLO"
    );
    assert_eq!(
        as_string(&call_method(&t, &s("hELLO wORLD"), "capitalize", vec![]).unwrap()),
        "Hello world"
    );
    assert_eq!(
        as_string(&call_method(&t, &s("hello world"), "title", vec![]).unwrap()),
        "Hello World"
    );
}

#[test]
fn string_predicates() {
    let t = thread();
    let cases: &[(&str, &str, bool)] = &[
        ("abc123", "isalnum", true),
        ("abc 123", "isalnum", false),
        ("abc", "isalpha", true),
        ("123", "isdigit", true),
        ("12.3", "isdigit", false),
        ("abc", "islower", true),
        ("aBc", "islower", false),
        ("ABC", "isupper", true),
        (" \t\n", "isspace", true),
        ("", "isspace", false),
        ("Hello World", "istitle", true),
        ("Hello world", "istitle", false),
    ];
    for (text, method, want) in cases {
        let got = call_method(&t, &s(text), method, vec![]).unwrap();
        assert!(
            got.equals(&Value::Bool(*want)),
            "{:?}.{}() should be {}",
            text,
            method,
            want
        );
    }
}

#[test]
fn string_scanning() {
    let t = thread();
    let text = s("mississippi");
    assert_eq!(
        as_i64(&call_method(&t, &text, "count", vec![s("ss")]).unwrap()),
        2
    );
    assert_eq!(
        as_i64(&call_method(&t, &text, "find", vec![s("ss")]).unwrap()),
        2
    );
    assert_eq!(
        as_i64(&call_method(&t, &text, "rfind", vec![s("ss")]).unwrap()),
        5
    );
    assert_eq!(
        as_i64(&call_method(&t, &text, "find", vec![s("zz")]).unwrap()),
        -1
    );
    assert_eq!(
        call_method(&t, &text, "index", vec![s("zz")]).unwrap_err().kind(),
        ErrorKind::ValueOutOfRange
    );
    // Spans clamp like slices.
    assert_eq!(
        as_i64(&call_method(&t, &text, "find", vec![s("ss"), Value::int(3)]).unwrap()),
        5
    );
}

#[test]
fn string_scanning_charges_span_bytes() {
    let t = thread();
    let text = s(&"x".repeat(1000));
    let before = t.accountant().steps();
    call_method(&t, &text, "count", vec![s("y")]).unwrap();
    let cost = t.accountant().steps() - before;
    assert!(cost >= 1000, "count scanned {} < 1000 steps", cost);
}

#[test]
fn string_affixes() {
    let t = thread();
    let text = s("lark.lang");
    assert!(call_method(&t, &text, "startswith", vec![s("lark")])
        .unwrap()
        .equals(&Value::Bool(true)));
    let options = Value::tuple(vec![s(".rs"), s(".lang")]);
    assert!(call_method(&t, &text, "endswith", vec![options])
        .unwrap()
        .equals(&Value::Bool(true)));
    assert_eq!(
        as_string(&call_method(&t, &text, "removeprefix", vec![s("lark")]).unwrap()),
        ".lang"
    );
    assert_eq!(
        as_string(&call_method(&t, &text, "removesuffix", vec![s("none")]).unwrap()),
        "lark.lang"
    );
}

#[test]
fn string_strip_family() {
    let t = thread();
    assert_eq!(
        as_string(&call_method(&t, &s("  pad  "), "strip", vec![]).unwrap()),
        "pad"
    );
    assert_eq!(
        as_string(&call_method(&t, &s("xxyyabcyy"), "lstrip", vec![s("xy")]).unwrap()),
        "abcyy"
    );
    assert_eq!(
        as_string(&call_method(&t, &s("abcyy"), "rstrip", vec![s("xy")]).unwrap()),
        "abc"
    );
}

#[test]
fn string_split_family() {
    let t = thread();
    let csv = s("a,b,,c");
    let out = call_method(&t, &csv, "split", vec![s(",")]).unwrap();
    let expected = Value::list(vec![s("a"), s("b"), s(""), s("c")]);
    assert!(out.equals(&expected));

    let out = call_method(&t, &csv, "split", vec![s(","), Value::int(1)]).unwrap();
    assert!(out.equals(&Value::list(vec![s("a"), s("b,,c")])));

    let out = call_method(&t, &csv, "rsplit", vec![s(","), Value::int(1)]).unwrap();
    assert!(out.equals(&Value::list(vec![s("a,b,"), s("c")])));

    // Whitespace mode drops empty pieces.
    let out = call_method(&t, &s("  one\t two  "), "split", vec![]).unwrap();
    assert!(out.equals(&Value::list(vec![s("one"), s("two")])));

    let out = call_method(&t, &s("a\nb\r\nc"), "splitlines", vec![]).unwrap();
    assert!(out.equals(&Value::list(vec![s("a"), s("b"), s("c")])));
    let out = call_method(
        &t,
        &s("a\nb"),
        "splitlines",
        vec![Value::Bool(true)],
    )
    .unwrap();
    assert!(out.equals(&Value::list(vec![s("a\n"), s("b")])));
}

#[test]
fn string_split_charges_source_retention() {
    let t = thread();
    let text = s(&"a,".repeat(500)); // 1000 bytes
    let before = t.accountant().allocs();
    call_method(&t, &text, "split", vec![s(",")]).unwrap();
    let charged = t.accountant().allocs() - before;
    // The pieces keep the source alive, so at least its full length
    // is charged on top of the per-piece storage.
    assert!(charged >= 1000, "split charged {} < source length", charged);
}

#[test]
fn splitlines_charges_source_retention() {
    let t = thread();
    let text = s(&"line\n".repeat(200)); // 1000 bytes
    let before = t.accountant().allocs();
    call_method(&t, &text, "splitlines", vec![]).unwrap();
    let charged = t.accountant().allocs() - before;
    assert!(
        charged >= 1000,
        "splitlines charged {} < source length",
        charged
    );
}

#[test]
fn affix_probes_charge_their_length() {
    let t = thread();
    let text = s("zz");
    let affixes: Vec<Value> = (0..100).map(|_| s(&"y".repeat(100))).collect();
    let before = t.accountant().steps();
    let out = call_method(&t, &text, "startswith", vec![Value::tuple(affixes)]).unwrap();
    assert!(out.equals(&Value::Bool(false)));
    let cost = t.accountant().steps() - before;
    // Every affix probed costs at least its own length, however short
    // the receiver is.
    assert!(cost >= 100 * 100, "startswith charged only {} steps", cost);
}

#[test]
fn affix_tuple_refused_under_step_budget() {
    use common::cpu_thread;
    let t = cpu_thread(50);
    let text = s("zz");
    let affixes: Vec<Value> = (0..100).map(|_| s(&"y".repeat(100))).collect();
    let err = call_method(&t, &text, "endswith", vec![Value::tuple(affixes)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Safety);
}

#[test]
fn string_partition() {
    let t = thread();
    let text = s("key=value=more");
    let out = call_method(&t, &text, "partition", vec![s("=")]).unwrap();
    assert!(out.equals(&Value::tuple(vec![s("key"), s("="), s("value=more")])));
    let out = call_method(&t, &text, "rpartition", vec![s("=")]).unwrap();
    assert!(out.equals(&Value::tuple(vec![s("key=value"), s("="), s("more")])));
    let out = call_method(&t, &text, "partition", vec![s("@")]).unwrap();
    assert!(out.equals(&Value::tuple(vec![s("key=value=more"), s(""), s("")])));
}

#[test]
fn string_replace_and_join() {
    let t = thread();
    assert_eq!(
        as_string(&call_method(&t, &s("aaa"), "replace", vec![s("a"), s("bb")]).unwrap()),
        "bbbbbb"
    );
    assert_eq!(
        as_string(
            &call_method(&t, &s("aaa"), "replace", vec![s("a"), s("b"), Value::int(2)]).unwrap()
        ),
        "bba"
    );
    let joined = call_method(
        &t,
        &s(", "),
        "join",
        vec![Value::list(vec![s("a"), s("b"), s("c")])],
    )
    .unwrap();
    assert_eq!(as_string(&joined), "a, b, c");
    assert_eq!(
        call_method(&t, &s(","), "join", vec![ints(&[1])]).unwrap_err().kind(),
        ErrorKind::TypeMismatch
    );
}

#[test]
fn string_format_method() {
    let t = thread();
    // A named field with no binding fails the lookup.
    assert_eq!(
        call_method(&t, &s("{} eats {count}"), "format", vec![s("lark")])
            .unwrap_err()
            .kind(),
        ErrorKind::NameLookup
    );
    let method = lark_lib::safe_attr(&t, &s("{} eats {count}"), "format").unwrap();
    let result = method
        .call(
            &t,
            &lark_value::Arguments::new(
                vec![s("lark")],
                vec![("count".to_owned(), Value::int(3))],
            ),
        )
        .unwrap();
    assert_eq!(as_string(&result), "lark eats 3");
}

#[test]
fn string_views_compose_with_builtins() {
    let t = thread();
    let text = s("héllo");
    let cps = call_method(&t, &text, "codepoints", vec![]).unwrap();
    let as_list = call(&t, "list", vec![cps]).unwrap();
    assert_eq!(as_list.length(), Some(5));

    let ords = call_method(&t, &text, "codepoint_ords", vec![]).unwrap();
    let as_list = call(&t, "list", vec![ords]).unwrap();
    match &as_list {
        Value::List(l) => assert!(l.get(1).unwrap().equals(&Value::int(0xE9))),
        _ => unreachable!(),
    }

    // Byte views have constant-time length; codepoint views do not.
    let elems = call_method(&t, &text, "elems", vec![]).unwrap();
    assert_eq!(elems.length(), Some(6));
    let cps = call_method(&t, &text, "codepoints", vec![]).unwrap();
    assert_eq!(cps.length(), None);
}

// ---------------------------------------------------------------------------
// bytes
// ---------------------------------------------------------------------------

#[test]
fn bytes_views() {
    let t = thread();
    let b = Value::bytes(b"\x01\x02");
    let ords = call_method(&t, &b, "elem_ords", vec![]).unwrap();
    let as_list = call(&t, "list", vec![ords]).unwrap();
    assert!(as_list.equals(&ints(&[1, 2])));

    let elems = call_method(&t, &b, "elems", vec![]).unwrap();
    let as_list = call(&t, "list", vec![elems]).unwrap();
    match &as_list {
        Value::List(l) => {
            assert!(l.get(0).unwrap().equals(&Value::bytes(b"\x01")));
        }
        _ => unreachable!(),
    }
}
