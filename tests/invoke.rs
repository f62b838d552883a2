// パス: tests/invoke.rs
// 役割: 動的呼び出し（名前と引数列からの呼び出し式組み立て）をエンドツーエンドで検証する
// 意図: 引数の書式化・登録簿による名前検証・エンジン評価の連携を保証する
// 関連ファイル: src/invoke.rs, src/session.rs, src/registry/mod.rs
#[path = "test_support.rs"]
mod support;

use giac::{Arg, ErrorCategory};
use num_bigint::BigInt;
use num_rational::BigRational;

use support::{assert_code, assert_shows, eval, session};

#[test]
fn factor_and_diff_through_invoke() {
    let s = session();
    let f = s.invoke("factor", &[Arg::code("x^2-1")]).unwrap();
    assert_eq!(f.to_string(), "(x-1)*(x+1)");
    let d = s.invoke("diff", &[Arg::code("x^3"), Arg::symbol("x")]).unwrap();
    assert_eq!(d.to_string(), "3*x^2");
    let i = s.invoke("integrate", &[Arg::code("x^2"), Arg::symbol("x")]).unwrap();
    assert_eq!(i.to_string(), "x^3/3");
}

#[test]
fn native_arguments_are_formatted() {
    let s = session();
    let r = s.invoke("gcd", &[Arg::Int(12), Arg::Int(18)]).unwrap();
    assert_eq!(r.to_string(), "6");
    let big: BigInt = "123456789012345678901234567890".parse().unwrap();
    let r = s.invoke("irem", &[Arg::BigInt(big), Arg::Int(7)]).unwrap();
    assert_eq!(r.to_string(), "0");
    let half = BigRational::new(1.into(), 2.into());
    let r = s.invoke("numer", &[Arg::Rational(half)]).unwrap();
    assert_eq!(r.to_string(), "1");
    let r = s.invoke("size", &[Arg::from(vec![1i64, 2, 3])]).unwrap();
    assert_eq!(r.to_string(), "3");
    let r = s.invoke("det", &[Arg::matrix(vec![vec![1i64, 2], vec![3, 4]])]).unwrap();
    assert_eq!(r.to_string(), "-2");
}

#[test]
fn handles_can_be_passed_back_as_arguments() {
    let s = session();
    let p = eval(&s, "x^2+2*x+1");
    let f = s.invoke("factor", &[Arg::from(&p)]).unwrap();
    assert_eq!(f.to_string(), "(x+1)^2");
    let cmd = s.command("expand").unwrap();
    let e = s.apply(&cmd, &[&f]).unwrap();
    assert_eq!(e, p);
}

#[test]
fn convenience_methods_match_invoke() {
    let s = session();
    let x = s.var("x").unwrap();
    let p = eval(&s, "x^3-x");
    assert_eq!(s.factor(&p).unwrap().to_string(), "x*(x-1)*(x+1)");
    assert_eq!(s.diff(&p, &x).unwrap().to_string(), "3*x^2-1");
    let zero = s.value(0i64).unwrap();
    assert_eq!(s.subst(&p, &x, &zero).unwrap().to_string(), "0");
    assert_eq!(s.solve(&p, &x).unwrap().to_string(), "[-1,0,1]");
    assert_eq!(s.var("2x").unwrap_err().code(), "ARG003");
}

#[test]
fn unknown_commands_fail_before_the_engine() {
    let s = session();
    let before = s.live_handles();
    let err = s.invoke("factr", &[Arg::code("x^2-1")]).unwrap_err();
    assert_code(&err, "CMD001");
    assert_eq!(err.category(), ErrorCategory::Eval);
    assert!(err.suggestions().iter().any(|n| n == "factor"));
    assert!(err.to_string().contains("did you mean: factor"));
    assert_eq!(s.live_handles(), before);
}

#[test]
fn bad_arguments_are_type_errors() {
    let s = session();
    let err = s.invoke("size", &[Arg::List(vec![Arg::Int(1), Arg::Null])]).unwrap_err();
    assert_code(&err, "ARG001");
    assert_eq!(err.category(), ErrorCategory::Type);
    let err = s.invoke("size", &[Arg::Map(vec![("a".into(), Arg::Int(1))])]).unwrap_err();
    assert_code(&err, "ARG002");
}

#[test]
fn engine_errors_propagate() {
    let s = session();
    let err = s.invoke("diff", &[]).unwrap_err();
    assert_code(&err, "EVAL010");
    let err = s.invoke("inv", &[Arg::matrix(vec![vec![1i64, 2], vec![2, 4]])]).unwrap_err();
    assert_code(&err, "EVAL030");
}

#[test]
fn unevaluated_catalog_commands_stay_symbolic() {
    let s = session();
    assert!(s.registry().exists("laplace"));
    assert_shows(&s, "laplace(f(t),t,s)", "laplace(f(t),t,s)");
}

#[test]
fn rational_arguments_round_trip_exactly() {
    let s = session();
    let big = "123456789012345678901234567890".parse::<BigInt>().unwrap();
    let cases = [
        BigRational::new(BigInt::from(3), BigInt::from(4)),
        BigRational::new(BigInt::from(-3), BigInt::from(4)),
        BigRational::new(BigInt::from(5), BigInt::from(-7)),
        BigRational::new(big.clone(), BigInt::from(7)),
        BigRational::new(-big, BigInt::from(11)),
        BigRational::from_integer(BigInt::from(6)),
    ];
    for q in cases {
        let v = s.value(Arg::Rational(q.clone())).unwrap();
        assert_eq!(v.to::<BigRational>().unwrap(), q, "{q}");
    }
}

#[test]
fn matrix_products_multiply_in_order() {
    let s = session();
    let a = s.matrix(vec![vec![1i64, 2], vec![3, 4]]).unwrap();
    let p = s.matrix(vec![vec![0i64, 1], vec![1, 0]]).unwrap();
    assert_eq!(a.try_mul(&p).unwrap().to_string(), "[[2,1],[4,3]]");
    assert_eq!(p.try_mul(&a).unwrap().to_string(), "[[3,4],[1,2]]");
    assert_eq!(
        a.try_mul(&p).unwrap().to::<Vec<Vec<i64>>>().unwrap(),
        vec![vec![2, 1], vec![4, 3]]
    );
    assert_shows(&s, "[[1,2],[3,4]]*[[1,0],[0,1]]", "[[1,2],[3,4]]");
    assert_shows(&s, "[1,2,3]*[4,5,6]", "32");
    assert_shows(&s, "3*[1,2]", "[3,6]");
}
