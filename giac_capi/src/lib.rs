//! giac-rs の C ABI
//!
//! セッションと式ハンドルを不透明なポインタとして C 側へ渡す。
//! 失敗した関数は null・負値・ステータスで失敗を返し、理由は `giac_last_error` と
//! `giac_last_error_message` で取り出す。成功した呼び出しは last error を `Ok` に戻す。

#![allow(clippy::missing_safety_doc)]

mod error;

use std::ffi::{c_char, c_int, CStr, CString};

use giac::{GiacExpr, Session, SessionConfig};

pub use error::*;

const SESSION_MAGIC: u64 = 0x4749_4143_5345_5331; // "GIACSES1"
const EXPR_MAGIC: u64 = 0x4749_4143_4558_5031; // "GIACEXP1"

/// `<null>` 表示。null ハンドルの文字列化で返す。
const NULL_SENTINEL: &str = "<null>";

pub struct GiacSessionHandle {
    magic: u64,
    session: Session,
}

pub struct GiacExprHandle {
    magic: u64,
    expr: GiacExpr,
}

type CapiResult<T> = Result<T, GiacStatus>;

fn fail<T>(status: GiacStatus, msg: &str) -> CapiResult<T> {
    set_last_error(status, msg);
    Err(status)
}

unsafe fn text<'a>(ptr: *const c_char, what: &str) -> CapiResult<&'a str> {
    if ptr.is_null() {
        return fail(GiacStatus::NullPointer, &format!("{what} が null です"));
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Ok(s),
        Err(_) => fail(GiacStatus::InvalidArgument, &format!("{what} が UTF-8 ではありません")),
    }
}

unsafe fn session_ref<'a>(ptr: *const GiacSessionHandle) -> CapiResult<&'a Session> {
    match ptr.as_ref() {
        None => fail(GiacStatus::NullPointer, "session が null です"),
        Some(h) if h.magic != SESSION_MAGIC => {
            fail(GiacStatus::InvalidArgument, "session ハンドルが不正です")
        }
        Some(h) => Ok(&h.session),
    }
}

unsafe fn expr_ref<'a>(ptr: *const GiacExprHandle) -> CapiResult<&'a GiacExpr> {
    match ptr.as_ref() {
        None => fail(GiacStatus::NullPointer, "expr が null です"),
        Some(h) if h.magic != EXPR_MAGIC => fail(GiacStatus::InvalidArgument, "expr ハンドルが不正です"),
        Some(h) => Ok(&h.expr),
    }
}

fn into_expr_handle(result: giac::GiacResult<GiacExpr>) -> *mut GiacExprHandle {
    match result {
        Ok(expr) => {
            clear_last_error();
            Box::into_raw(Box::new(GiacExprHandle {
                magic: EXPR_MAGIC,
                expr,
            }))
        }
        Err(e) => {
            record_error(&e);
            std::ptr::null_mut()
        }
    }
}

fn into_c_string(s: &str) -> *mut c_char {
    match CString::new(s.replace('\0', " ")) {
        Ok(c) => c.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// 既定設定のセッションを作る。失敗時は null。
#[no_mangle]
pub extern "C" fn giac_session_new() -> *mut GiacSessionHandle {
    new_session(Session::new())
}

/// JSON 形式の設定からセッションを作る。`config_json` が null なら既定設定。
#[no_mangle]
pub unsafe extern "C" fn giac_session_new_with_config(
    config_json: *const c_char,
) -> *mut GiacSessionHandle {
    if config_json.is_null() {
        return giac_session_new();
    }
    let Ok(src) = text(config_json, "config_json") else {
        return std::ptr::null_mut();
    };
    new_session(SessionConfig::from_json_str(src).and_then(Session::with_config))
}

fn new_session(result: giac::GiacResult<Session>) -> *mut GiacSessionHandle {
    match result {
        Ok(session) => {
            clear_last_error();
            Box::into_raw(Box::new(GiacSessionHandle {
                magic: SESSION_MAGIC,
                session,
            }))
        }
        Err(e) => {
            record_error(&e);
            std::ptr::null_mut()
        }
    }
}

/// セッションを破棄する。このセッションから作った式ハンドルはその後も有効。
#[no_mangle]
pub unsafe extern "C" fn giac_session_free(session: *mut GiacSessionHandle) {
    if session.is_null() || (*session).magic != SESSION_MAGIC {
        return;
    }
    (*session).magic = 0;
    drop(Box::from_raw(session));
}

#[no_mangle]
pub unsafe extern "C" fn giac_eval(
    session: *const GiacSessionHandle,
    src: *const c_char,
) -> *mut GiacExprHandle {
    let run = || -> CapiResult<_> {
        let session = session_ref(session)?;
        let src = text(src, "src")?;
        Ok(into_expr_handle(session.eval(src)))
    };
    run().unwrap_or(std::ptr::null_mut())
}

/// 登録簿で名前を検証してから、既存の式ハンドルを引数に直接適用する。
/// `argc` が 0 のとき `args` は null でもよい。
#[no_mangle]
pub unsafe extern "C" fn giac_invoke(
    session: *const GiacSessionHandle,
    name: *const c_char,
    args: *const *const GiacExprHandle,
    argc: usize,
) -> *mut GiacExprHandle {
    let run = || -> CapiResult<_> {
        let session = session_ref(session)?;
        let name = text(name, "name")?;
        if args.is_null() && argc > 0 {
            return fail(GiacStatus::NullPointer, "args が null です");
        }
        let mut exprs = Vec::with_capacity(argc);
        for i in 0..argc {
            exprs.push(expr_ref(*args.add(i))?);
        }
        let result = session.command(name).and_then(|cmd| session.apply(&cmd, &exprs));
        Ok(into_expr_handle(result))
    };
    run().unwrap_or(std::ptr::null_mut())
}

/// エンジンのプリンタによる文字列。null ハンドルは `<null>`。
/// 戻り値は `giac_string_free` で解放する。
#[no_mangle]
pub unsafe extern "C" fn giac_expr_to_string(expr: *const GiacExprHandle) -> *mut c_char {
    if expr.is_null() {
        clear_last_error();
        return into_c_string(NULL_SENTINEL);
    }
    let Ok(e) = expr_ref(expr) else {
        return std::ptr::null_mut();
    };
    if e.is_null() {
        clear_last_error();
        return into_c_string(NULL_SENTINEL);
    }
    match e.print() {
        Ok(s) => {
            clear_last_error();
            into_c_string(&s)
        }
        Err(err) => {
            record_error(&err);
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn giac_expr_free(expr: *mut GiacExprHandle) {
    if expr.is_null() || (*expr).magic != EXPR_MAGIC {
        return;
    }
    (*expr).magic = 0;
    drop(Box::from_raw(expr));
}

unsafe fn convert<T: giac::FromGiac>(expr: *const GiacExprHandle, out: *mut T) -> GiacStatus {
    if out.is_null() {
        set_last_error(GiacStatus::NullPointer, "out が null です");
        return GiacStatus::NullPointer;
    }
    let e = match expr_ref(expr) {
        Ok(e) => e,
        Err(status) => return status,
    };
    match e.to::<T>() {
        Ok(v) => {
            out.write(v);
            clear_last_error();
            GiacStatus::Ok
        }
        Err(err) => record_error(&err),
    }
}

/// 整数へ変換する。変換できなければ `Type` を返し、`out` は書き換えない。
#[no_mangle]
pub unsafe extern "C" fn giac_expr_to_i64(expr: *const GiacExprHandle, out: *mut i64) -> GiacStatus {
    convert(expr, out)
}

#[no_mangle]
pub unsafe extern "C" fn giac_expr_to_f64(expr: *const GiacExprHandle, out: *mut f64) -> GiacStatus {
    convert(expr, out)
}

/// 型タグのコード（`TypeTag::code`）。失敗時は -1。
#[no_mangle]
pub unsafe extern "C" fn giac_expr_type_tag(expr: *const GiacExprHandle) -> c_int {
    let Ok(e) = expr_ref(expr) else {
        return -1;
    };
    match e.type_tag() {
        Ok((tag, _)) => {
            clear_last_error();
            tag.code()
        }
        Err(err) => {
            record_error(&err);
            -1
        }
    }
}

/// 似た名前のコマンドをカンマ区切りで返す（候補なしなら空文字列）。
/// 戻り値は `giac_string_free` で解放する。
#[no_mangle]
pub unsafe extern "C" fn giac_suggest(
    session: *const GiacSessionHandle,
    name: *const c_char,
) -> *mut c_char {
    let run = || -> CapiResult<_> {
        let session = session_ref(session)?;
        let name = text(name, "name")?;
        clear_last_error();
        Ok(into_c_string(&session.suggest(name).join(",")))
    };
    run().unwrap_or(std::ptr::null_mut())
}

/// 1: 存在する、0: 存在しない、-1: 引数エラー。
#[no_mangle]
pub unsafe extern "C" fn giac_command_exists(
    session: *const GiacSessionHandle,
    name: *const c_char,
) -> c_int {
    let run = || -> CapiResult<_> {
        let session = session_ref(session)?;
        let name = text(name, "name")?;
        clear_last_error();
        Ok(c_int::from(session.registry().exists(name)))
    };
    run().unwrap_or(-1)
}

#[no_mangle]
pub unsafe extern "C" fn giac_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
