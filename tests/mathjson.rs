// パス: tests/mathjson.rs
// 役割: MathJSON との相互変換をセッション経由で検証する
// 意図: 演算子表・数値表現・未対応演算子のフォールバックが期待通りに働くことを保証する
// 関連ファイル: src/interchange/mathjson.rs, src/session.rs
#[path = "test_support.rs"]
mod support;

use giac::interchange::{from_mathjson, to_mathjson};
use serde_json::json;

use support::{eval, session};

#[test]
fn exports_polynomials() {
    let s = session();
    assert_eq!(
        to_mathjson(&eval(&s, "x^2+1")).unwrap(),
        json!(["Add", ["Power", "x", 2], 1])
    );
    assert_eq!(
        to_mathjson(&eval(&s, "2*sin(x)")).unwrap(),
        json!(["Multiply", 2, ["Sin", "x"]])
    );
}

#[test]
fn exports_numbers_and_constants() {
    let s = session();
    assert_eq!(to_mathjson(&eval(&s, "3/4")).unwrap(), json!(["Rational", 3, 4]));
    assert_eq!(
        to_mathjson(&eval(&s, "10^30")).unwrap(),
        json!({"num": "1000000000000000000000000000000"})
    );
    assert_eq!(to_mathjson(&eval(&s, "1+2*i")).unwrap(), json!(["Complex", 1, 2]));
    assert_eq!(to_mathjson(&eval(&s, "i")).unwrap(), json!("ImaginaryUnit"));
    assert_eq!(to_mathjson(&eval(&s, "pi")).unwrap(), json!("Pi"));
    assert_eq!(to_mathjson(&eval(&s, "\"hi\"")).unwrap(), json!({"str": "hi"}));
    assert_eq!(to_mathjson(&eval(&s, "[1,x]")).unwrap(), json!(["List", 1, "x"]));
    assert_eq!(to_mathjson(&eval(&s, "-x")).unwrap(), json!(["Negate", "x"]));
}

#[test]
fn imports_and_evaluates() {
    let s = session();
    let v = from_mathjson(&s, &json!(["Add", ["Power", "x", 2], 1])).unwrap();
    assert_eq!(v.to_string(), "x^2+1");
    let v = from_mathjson(&s, &json!(["Multiply", ["Rational", 1, 2], 4])).unwrap();
    assert_eq!(v.to_string(), "2");
    let v = from_mathjson(&s, &json!(["Factor", ["Subtract", ["Power", "x", 2], 1]])).unwrap();
    assert_eq!(v.to_string(), "(x-1)*(x+1)");
    let v = from_mathjson(&s, &json!(["Sin", "Pi"])).unwrap();
    assert_eq!(v.to_string(), "0");
    let v = from_mathjson(&s, &json!(["List", 1, ["Negate", 2]])).unwrap();
    assert_eq!(v.to_string(), "[1,-2]");
}

#[test]
fn unknown_operators_fall_back_to_symbolic_calls() {
    let s = session();
    let v = from_mathjson(&s, &json!(["Frobnicate", "x", 2])).unwrap();
    assert_eq!(v.to_string(), "frobnicate(x,2)");
    let v = from_mathjson(&s, &json!(["Foo Bar", "x"])).unwrap();
    assert_eq!(v.to_string(), "foo_bar(x)");
}

#[test]
fn round_trips_through_export() {
    let s = session();
    for src in ["x^3/3", "(x-1)*(x+1)", "[[1,2],[3,4]]", "2*x+1"] {
        let e = eval(&s, src);
        let back = from_mathjson(&s, &to_mathjson(&e).unwrap()).unwrap();
        assert_eq!(back, e, "{src}");
    }
}

#[test]
fn malformed_input_is_rejected() {
    let s = session();
    assert_eq!(from_mathjson(&s, &json!(null)).unwrap_err().code(), "JSON020");
    assert_eq!(from_mathjson(&s, &json!(["Rational", 1])).unwrap_err().code(), "JSON020");
}
