// パス: tests/marshal.rs
// 役割: 型タグに基づくネイティブ値への変換と明示的な変換トレイトを検証する
// 意図: 正確に表現できる値だけをネイティブ型にし、それ以外は不透明ハンドルのまま返すことを保証する
// 関連ファイル: src/marshal.rs, src/expr.rs, src/config.rs
#[path = "test_support.rs"]
mod support;

use giac::{ConversionPolicy, Native, NativeComplex, NativeList, Session, SessionConfig};
use num_bigint::BigInt;
use num_complex::{Complex, Complex64};
use num_rational::BigRational;

use support::{eval, session};

fn native(s: &Session, src: &str) -> Native {
    s.to_native(&eval(s, src)).unwrap()
}

fn q(p: i64, d: i64) -> BigRational {
    BigRational::new(p.into(), d.into())
}

#[test]
fn scalars_map_to_nearest_native_type() {
    let s = session();
    assert_eq!(native(&s, "2+3"), Native::Int(5));
    assert_eq!(native(&s, "1==1"), Native::Bool(true));
    assert_eq!(native(&s, "3/6"), Native::Rational(q(1, 2)));
    assert_eq!(native(&s, "0.5"), Native::Float(0.5));
    let big: BigInt = "100000000000000000000".parse().unwrap();
    assert_eq!(native(&s, "10^20"), Native::BigInt(big));
}

#[test]
fn complex_values_keep_exactness() {
    let s = session();
    assert_eq!(
        native(&s, "1+2*i"),
        Native::Complex(NativeComplex::Exact(Complex::new(q(1, 1), q(2, 1))))
    );
    assert_eq!(
        native(&s, "0.5+i"),
        Native::Complex(NativeComplex::Float(Complex64::new(0.5, 1.0)))
    );
}

#[test]
fn lists_unify_element_types() {
    let s = session();
    assert_eq!(native(&s, "[1,2,3]"), Native::List(NativeList::Int(vec![1, 2, 3])));
    assert_eq!(native(&s, "[]"), Native::List(NativeList::Int(vec![])));
    assert_eq!(
        native(&s, "[1.0,2.5]"),
        Native::List(NativeList::Float(vec![1.0, 2.5]))
    );
    match native(&s, "[1,10^20]") {
        Native::List(NativeList::BigInt(v)) => assert_eq!(v.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
    match native(&s, "[[1,2],[3,4]]") {
        Native::List(NativeList::Nested(rows)) => {
            assert_eq!(rows, vec![NativeList::Int(vec![1, 2]), NativeList::Int(vec![3, 4])])
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn mixed_lists_stay_symbolic() {
    let s = session();
    match native(&s, "[1,x]") {
        Native::List(NativeList::Symbolic(items)) => {
            assert_eq!(items.len(), 2);
            assert_eq!(items[1].to_string(), "x");
        }
        other => panic!("unexpected {other:?}"),
    }
    match native(&s, "x+1") {
        Native::Symbolic(e) => assert_eq!(e.to_string(), "x+1"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn policy_controls_widening() {
    let config = SessionConfig {
        conversion: ConversionPolicy {
            widen_integers: true,
            widen_rationals: true,
            narrow_bigints: true,
        },
        ..SessionConfig::default()
    };
    let s = Session::with_config(config).unwrap();
    assert_eq!(
        native(&s, "[1,1/2]"),
        Native::List(NativeList::Rational(vec![q(1, 1), q(1, 2)]))
    );
    let strict = session();
    assert!(matches!(
        native(&strict, "[1,1/2]"),
        Native::List(NativeList::Symbolic(_))
    ));
}

#[test]
fn explicit_conversions() {
    let s = session();
    assert_eq!(eval(&s, "2^10").to::<i64>().unwrap(), 1024);
    assert_eq!(eval(&s, "1/4").to::<f64>().unwrap(), 0.25);
    assert_eq!(eval(&s, "1/4").to::<BigRational>().unwrap(), q(1, 4));
    assert!(eval(&s, "1<2").to::<bool>().unwrap());
    assert_eq!(eval(&s, "[1,2]").to::<Vec<i64>>().unwrap(), vec![1, 2]);
    assert_eq!(eval(&s, "\"abc\"").to::<String>().unwrap(), "abc");
    let err = eval(&s, "x").to::<i64>().unwrap_err();
    assert_eq!(err.code(), "MAR001");
    assert_eq!(eval(&s, "true").to::<i64>().unwrap_err().code(), "MAR001");
}
