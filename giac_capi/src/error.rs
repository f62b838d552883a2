// パス: giac_capi/src/error.rs
// 役割: C ABI のステータスコードとスレッドローカルな last error の保持
// 意図: 失敗した呼び出しの理由を、戻り値を変えずに C 側から取り出せるようにする
// 関連ファイル: giac_capi/src/lib.rs, src/errors.rs

use std::cell::{Cell, RefCell};
use std::ffi::{c_char, CString};

use giac::{ErrorCategory, GiacError};

/// C 側へ返すステータスコード。
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GiacStatus {
    Ok = 0,
    InvalidArgument = 1,
    NullPointer = 2,
    Parse = 3,
    Eval = 4,
    Type = 5,
    Memory = 6,
    Usage = 7,
}

impl GiacStatus {
    pub fn from_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Parse => Self::Parse,
            ErrorCategory::Eval => Self::Eval,
            ErrorCategory::Type => Self::Type,
            ErrorCategory::Memory => Self::Memory,
            ErrorCategory::Usage => Self::Usage,
        }
    }
}

thread_local! {
    static LAST_ERROR: Cell<GiacStatus> = const { Cell::new(GiacStatus::Ok) };
    static LAST_MESSAGE: RefCell<CString> = RefCell::new(CString::default());
}

fn set_message(msg: &str) {
    // 内部の NUL は C 文字列にできないので空白へ置き換える
    let cleaned = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    LAST_MESSAGE.with(|cell| *cell.borrow_mut() = cleaned);
}

pub(crate) fn set_last_error(status: GiacStatus, msg: &str) {
    LAST_ERROR.with(|cell| cell.set(status));
    set_message(msg);
}

/// `GiacError` をステータスとメッセージに写して記録する。
pub(crate) fn record_error(e: &GiacError) -> GiacStatus {
    let status = GiacStatus::from_category(e.category());
    set_last_error(status, &e.to_string());
    status
}

pub(crate) fn clear_last_error() {
    set_last_error(GiacStatus::Ok, "");
}

/// 直近の呼び出しのステータス。
#[no_mangle]
pub extern "C" fn giac_last_error() -> GiacStatus {
    LAST_ERROR.with(|cell| cell.get())
}

/// 直近のエラーメッセージ（`[CODE] ...` 形式、候補行を含む）。
/// 同じスレッドで次に API を呼ぶまで有効。
#[no_mangle]
pub extern "C" fn giac_last_error_message() -> *const c_char {
    LAST_MESSAGE.with(|cell| cell.borrow().as_ptr())
}

#[no_mangle]
pub extern "C" fn giac_status_message(status: GiacStatus) -> *const c_char {
    match status {
        GiacStatus::Ok => c"ok".as_ptr(),
        GiacStatus::InvalidArgument => c"invalid argument".as_ptr(),
        GiacStatus::NullPointer => c"null pointer".as_ptr(),
        GiacStatus::Parse => c"parse error".as_ptr(),
        GiacStatus::Eval => c"evaluation error".as_ptr(),
        GiacStatus::Type => c"type error".as_ptr(),
        GiacStatus::Memory => c"memory error".as_ptr(),
        GiacStatus::Usage => c"usage error".as_ptr(),
    }
}
