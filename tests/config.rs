// パス: tests/config.rs
// 役割: 設定ファイルの読み込みと環境変数による上書きを検証する
// 意図: JSON・環境変数・既定値の優先順位と、不正値の Usage エラーを保証する
// 関連ファイル: src/config.rs, src/bin/giac_repl.rs
use std::io::Write;

use giac::config::{Backend, SessionConfig, BACKEND_ENV, MAX_SUGGESTIONS_ENV};
use giac::Session;

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"max_suggestions": 2, "conversion": {{"widen_rationals": true}}}}"#
    )
    .unwrap();
    let config = SessionConfig::from_path(file.path()).unwrap();
    assert_eq!(config.max_suggestions, 2);
    assert!(config.conversion.widen_rationals);
    assert!(config.conversion.widen_integers);
    assert_eq!(config.backend, Backend::Builtin);
    let s = Session::with_config(config).unwrap();
    assert!(s.suggest("fctor").len() <= 2);
}

#[test]
fn file_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert_eq!(SessionConfig::from_path(&missing).unwrap_err().code(), "CFG002");
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"backend": "maple"}"#).unwrap();
    assert_eq!(SessionConfig::from_path(&bad).unwrap_err().code(), "CFG001");
}

#[test]
fn overrides_from_lookup() {
    let lookup = |key: &str| match key {
        k if k == MAX_SUGGESTIONS_ENV => Some("7".to_string()),
        k if k == BACKEND_ENV => Some("builtin".to_string()),
        _ => None,
    };
    let config = SessionConfig::default().with_overrides_from(lookup).unwrap();
    assert_eq!(config.max_suggestions, 7);
    let bad = |key: &str| (key == MAX_SUGGESTIONS_ENV).then(|| "many".to_string());
    assert_eq!(
        SessionConfig::default().with_overrides_from(bad).unwrap_err().code(),
        "CFG004"
    );
}

#[test]
fn serialises_back_to_json() {
    let config = SessionConfig::default();
    let text = config.to_json_string().unwrap();
    assert_eq!(SessionConfig::from_json_str(&text).unwrap(), config);
}
