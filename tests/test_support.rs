// パス: tests/test_support.rs
// 役割: 統合テスト共通の補助関数とアサーションを提供する
// 意図: セッション生成・評価・表示の繰り返しを一元化しテストを簡潔に保つ
// 関連ファイル: tests/invoke.rs, tests/marshal.rs, tests/handles.rs
#![allow(dead_code)]
use giac::{GiacError, GiacExpr, Session};

pub fn session() -> Session {
    Session::new().expect("builtin session")
}

pub fn eval(session: &Session, src: &str) -> GiacExpr {
    session
        .eval(src)
        .unwrap_or_else(|e| panic!("eval {src}: {e}"))
}

/// 評価結果の表示を返す。
pub fn show(session: &Session, src: &str) -> String {
    eval(session, src).to_string()
}

pub fn assert_shows(session: &Session, src: &str, expected: &str) {
    assert_eq!(show(session, src), expected, "{src}");
}

pub fn eval_err(session: &Session, src: &str) -> GiacError {
    match session.eval(src) {
        Ok(v) => panic!("{src}: expected error, got {v}"),
        Err(e) => e,
    }
}

pub fn assert_code(err: &GiacError, code: &str) {
    assert_eq!(err.code(), code, "{err}");
}
