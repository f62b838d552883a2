// パス: giac_capi/tests/capi.rs
// 役割: giac_capi クレートの公開 ABI をエンドツーエンドで検証する
// 意図: ハンドルの受け渡し・変換・last error が C 側から見て期待通りに動くことを保証する
// 関連ファイル: giac_capi/src/lib.rs, giac_capi/src/error.rs

use std::ffi::{CStr, CString};
use std::ptr;

use giac_capi::{
    giac_command_exists, giac_eval, giac_expr_free, giac_expr_to_f64, giac_expr_to_i64,
    giac_expr_to_string, giac_expr_type_tag, giac_invoke, giac_last_error,
    giac_last_error_message, giac_session_free, giac_session_new, giac_session_new_with_config,
    giac_string_free, giac_suggest, GiacExprHandle, GiacStatus,
};

unsafe fn take_string(s: *mut std::ffi::c_char) -> String {
    assert!(!s.is_null());
    let out = CStr::from_ptr(s).to_str().unwrap().to_string();
    giac_string_free(s);
    out
}

unsafe fn last_message() -> String {
    CStr::from_ptr(giac_last_error_message()).to_str().unwrap().to_string()
}

#[test]
fn eval_print_and_convert() {
    unsafe {
        let session = giac_session_new();
        assert!(!session.is_null());
        let src = CString::new("2^10").unwrap();
        let e = giac_eval(session, src.as_ptr());
        assert!(!e.is_null());
        assert_eq!(take_string(giac_expr_to_string(e)), "1024");
        let mut n = 0i64;
        assert_eq!(giac_expr_to_i64(e, &mut n), GiacStatus::Ok);
        assert_eq!(n, 1024);
        let mut d = 0.0f64;
        assert_eq!(giac_expr_to_f64(e, &mut d), GiacStatus::Ok);
        assert_eq!(d, 1024.0);
        assert_eq!(giac_expr_type_tag(e), 0);
        giac_expr_free(e);
        giac_session_free(session);
    }
}

#[test]
fn invoke_applies_handles() {
    unsafe {
        let session = giac_session_new();
        let src = CString::new("x^2-1").unwrap();
        let poly = giac_eval(session, src.as_ptr());
        let name = CString::new("factor").unwrap();
        let args: [*const GiacExprHandle; 1] = [poly];
        let f = giac_invoke(session, name.as_ptr(), args.as_ptr(), 1);
        assert!(!f.is_null());
        assert_eq!(take_string(giac_expr_to_string(f)), "(x-1)*(x+1)");
        giac_expr_free(f);
        giac_expr_free(poly);
        giac_session_free(session);
    }
}

#[test]
fn unknown_commands_report_suggestions() {
    unsafe {
        let session = giac_session_new();
        let name = CString::new("factr").unwrap();
        let r = giac_invoke(session, name.as_ptr(), ptr::null(), 0);
        assert!(r.is_null());
        assert_eq!(giac_last_error(), GiacStatus::Eval);
        let msg = last_message();
        assert!(msg.starts_with("[CMD001]"), "{msg}");
        assert!(msg.contains("factor"), "{msg}");
        assert!(take_string(giac_suggest(session, name.as_ptr())).split(',').any(|s| s == "factor"));
        assert_eq!(giac_command_exists(session, name.as_ptr()), 0);
        let diff = CString::new("diff").unwrap();
        assert_eq!(giac_command_exists(session, diff.as_ptr()), 1);
        assert_eq!(giac_last_error(), GiacStatus::Ok);
        giac_session_free(session);
    }
}

#[test]
fn null_and_mismatched_inputs() {
    unsafe {
        assert_eq!(take_string(giac_expr_to_string(ptr::null())), "<null>");
        assert!(giac_eval(ptr::null(), ptr::null()).is_null());
        assert_eq!(giac_last_error(), GiacStatus::NullPointer);

        let session = giac_session_new();
        let src = CString::new("x+1").unwrap();
        let e = giac_eval(session, src.as_ptr());
        let mut n = 7i64;
        assert_eq!(giac_expr_to_i64(e, &mut n), GiacStatus::Type);
        assert_eq!(n, 7);
        assert_eq!(giac_expr_to_i64(e, ptr::null_mut()), GiacStatus::NullPointer);
        giac_expr_free(e);

        let bad = CString::new("1+").unwrap();
        assert!(giac_eval(session, bad.as_ptr()).is_null());
        assert_eq!(giac_last_error(), GiacStatus::Parse);
        giac_session_free(session);
    }
}

#[test]
fn handles_outlive_their_session() {
    unsafe {
        let session = giac_session_new();
        let src = CString::new("[1,2,3]").unwrap();
        let e = giac_eval(session, src.as_ptr());
        giac_session_free(session);
        assert_eq!(take_string(giac_expr_to_string(e)), "[1,2,3]");
        giac_expr_free(e);
    }
}

#[test]
fn sessions_from_json_config() {
    unsafe {
        let config = CString::new(r#"{"max_suggestions": 1}"#).unwrap();
        let session = giac_session_new_with_config(config.as_ptr());
        assert!(!session.is_null());
        let name = CString::new("factr").unwrap();
        assert_eq!(take_string(giac_suggest(session, name.as_ptr())), "factor");
        giac_session_free(session);

        let bad = CString::new(r#"{"colour": "blue"}"#).unwrap();
        assert!(giac_session_new_with_config(bad.as_ptr()).is_null());
        assert_eq!(giac_last_error(), GiacStatus::Usage);
        assert!(last_message().contains("CFG001"));
    }
}
