// パス: tests/handles.rs
// 役割: 式ハンドルの所有・解放・スレッド間共有を検証する
// 意図: Drop による決定的な解放で生存数が基準値へ戻り、ロックの下で並行利用できることを保証する
// 関連ファイル: src/expr.rs, src/engine/mod.rs, src/session.rs
#[path = "test_support.rs"]
mod support;

use std::sync::Arc;
use std::thread;

use giac::{Arg, Native};

use support::{eval, session};

#[test]
fn live_count_returns_to_baseline_after_drops() {
    let s = session();
    let baseline = s.live_handles();
    {
        let p = eval(&s, "x^2-1");
        let f = s.factor(&p).unwrap();
        let parts = f.children().unwrap();
        assert_eq!(parts.len(), 2);
        let copies: Vec<_> = (0..5).map(|_| f.clone()).collect();
        assert!(s.live_handles() > baseline);
        drop(copies);
        let _native = s.to_native(&eval(&s, "[1,x,[2,3]]")).unwrap();
    }
    assert_eq!(s.live_handles(), baseline);
}

#[test]
fn explicit_release_nulls_the_handle() {
    let s = session();
    let baseline = s.live_handles();
    let mut e = eval(&s, "x+1");
    let copy = e.clone();
    e.release();
    assert!(e.is_null());
    assert_eq!(e.print().unwrap_err().code(), "MEM001");
    assert_eq!(copy.to_string(), "x+1");
    e.release();
    drop(copy);
    assert_eq!(s.live_handles(), baseline);
}

#[test]
fn handles_outlive_the_session() {
    let e = {
        let s = session();
        eval(&s, "diff(x^3,x)")
    };
    assert_eq!(e.to_string(), "3*x^2");
    let sq = e.try_mul(&e).unwrap();
    assert_eq!(sq.to_string(), "9*x^4");
}

#[test]
fn sessions_are_shared_across_threads() {
    let s = Arc::new(session());
    let baseline = s.live_handles();
    let workers: Vec<_> = (0..4i64)
        .map(|k| {
            let s = Arc::clone(&s);
            thread::spawn(move || {
                for n in 0..20i64 {
                    let m = n + k + 1;
                    let r = s.invoke("gcd", &[Arg::Int(6 * m), Arg::Int(4)]).unwrap();
                    let want = if m % 2 == 0 { 4 } else { 2 };
                    assert_eq!(r.to::<i64>().unwrap(), want, "gcd({},4)", 6 * m);
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(s.live_handles(), baseline);
}

#[test]
fn boolean_results_marshal_to_bool() {
    let s = session();
    assert_eq!(s.to_native(&eval(&s, "isprime(97)")).unwrap(), Native::Bool(true));
    assert_eq!(s.to_native(&eval(&s, "2>3")).unwrap(), Native::Bool(false));
}
