// パス: tests/errors.rs
// 役割: エラーの分類・コード・表示形式をセッション経由で検証する
// 意図: 呼び出し側が分類とコードで失敗を判別でき、表示に位置と候補が出ることを保証する
// 関連ファイル: src/errors.rs, src/engine/builtin/parser.rs, src/registry/mod.rs
#[path = "test_support.rs"]
mod support;

use giac::{Arg, ErrorCategory, GiacExpr};

use support::{assert_code, eval_err, session};

#[test]
fn parse_errors_carry_position_and_snippet() {
    let s = session();
    let err = eval_err(&s, "1+*2");
    assert_eq!(err.category(), ErrorCategory::Parse);
    let text = err.to_string();
    assert!(text.starts_with("[PAR"), "{text}");
    assert!(text.contains("line=1"), "{text}");
    assert!(text.contains('^'), "{text}");
    assert_code(&eval_err(&s, "   "), "PAR010");
}

#[test]
fn deeply_nested_input_is_rejected_on_a_small_stack() {
    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let s = session();
            let src = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
            let err = eval_err(&s, &src);
            assert_eq!(err.category(), ErrorCategory::Parse);
            err.code().to_string()
        })
        .unwrap();
    assert_eq!(worker.join().unwrap(), "PAR030");
}

#[test]
fn evaluation_errors() {
    let s = session();
    let err = eval_err(&s, "[1,2,3][7]");
    assert_eq!(err.category(), ErrorCategory::Eval);
    assert_code(&err, "EVAL021");
    assert_code(&eval_err(&s, "iquo(1,0)"), "EVAL040");
}

#[test]
fn unknown_command_display_lists_suggestions() {
    let s = session();
    let err = s.invoke("simplfy", &[Arg::symbol("x")]).unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("[CMD001]"), "{text}");
    assert!(text.contains("did you mean: simplify"), "{text}");
}

#[test]
fn null_handles_are_memory_errors() {
    let s = session();
    let null = GiacExpr::null();
    let x = s.var("x").unwrap();
    let err = (&x + &null).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Memory);
    assert_code(&err, "MEM001");
    assert_code(&s.factor(&null).unwrap_err(), "MEM001");
    assert_eq!(null.to_string(), "<null GiacExpr>");
}

#[test]
fn configuration_errors_are_usage_errors() {
    let err = giac::SessionConfig::from_json_str("{").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Usage);
    assert_code(&err, "CFG001");
}
