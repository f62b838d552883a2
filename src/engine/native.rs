// パス: src/engine/native.rs
// 役割: libgiac を C シム（giac_c）経由で呼び出すネイティブエンジン
// 意図: C++ の `gen` を不透明ポインタとして扱い、所有権を RawId の参照カウントで管理する
// 関連ファイル: build.rs, native/giac_c.cpp, src/engine/mod.rs, src/engine/builtin/mod.rs
//! ネイティブエンジン（feature `giac-native`）
//!
//! シムの実装は `native/giac_c.cpp`（宣言は `native/giac_c.h`）。約束事:
//! - `gen*` はシムが `new` したもので、`giac_c_free` で解放する。
//! - 文字列はシムが確保し、`giac_c_string_free` で解放する。
//! - 戻り値 0 が成功。1 は構文エラー、2 は評価エラーで、`err` にメッセージが入る。

#![allow(clippy::missing_safety_doc)]

use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::ptr;

use num_bigint::BigInt;
use num_rational::BigRational;
use tracing::{debug, trace};

use super::{adopt_all, Engine, HelpRecord, RawId, Scalar, Subtype, TypeTag, View};
use crate::errors::{GiacError, GiacResult};

type GenPtr = *mut c_void;

extern "C" {
    fn giac_c_context_new() -> *mut c_void;
    fn giac_c_context_free(ctx: *mut c_void);
    fn giac_c_eval(ctx: *mut c_void, src: *const c_char, out: *mut GenPtr, err: *mut *mut c_char) -> c_int;
    fn giac_c_apply(
        ctx: *mut c_void,
        name: *const c_char,
        args: *const GenPtr,
        argc: usize,
        out: *mut GenPtr,
        err: *mut *mut c_char,
    ) -> c_int;
    fn giac_c_print(ctx: *mut c_void, g: GenPtr) -> *mut c_char;
    fn giac_c_type(g: GenPtr) -> c_int;
    fn giac_c_subtype(g: GenPtr) -> c_int;
    fn giac_c_free(g: GenPtr);
    fn giac_c_string_free(s: *mut c_char);
    fn giac_c_to_i64(g: GenPtr, out: *mut i64) -> c_int;
    fn giac_c_to_double(g: GenPtr, out: *mut f64) -> c_int;
    /// 整数・有理数・複素数の成分を 10 進文字列で返す（`part`: 0=実部/分子, 1=虚部/分母）。
    fn giac_c_part_string(g: GenPtr, part: c_int) -> *mut c_char;
    fn giac_c_part(g: GenPtr, part: c_int) -> GenPtr;
    fn giac_c_len(g: GenPtr) -> usize;
    fn giac_c_at(g: GenPtr, index: usize) -> GenPtr;
    fn giac_c_symb_op(g: GenPtr) -> *mut c_char;
    fn giac_c_help_count() -> usize;
    /// `field`: 0=name, 1=description, 2=related（`,` 区切り）, 3=examples（`;` 区切り）。
    fn giac_c_help_field(index: usize, field: c_int) -> *mut c_char;
}

/// シムが返した文字列を所有権ごと受け取る。
unsafe fn take_string(raw: *mut c_char) -> Option<String> {
    if raw.is_null() {
        return None;
    }
    let s = CStr::from_ptr(raw).to_string_lossy().into_owned();
    giac_c_string_free(raw);
    Some(s)
}

fn c_string(s: &str) -> GiacResult<CString> {
    CString::new(s).map_err(|_| GiacError::usage("ARG010", "NUL 文字を含む文字列は渡せません"))
}

fn status_error(status: c_int, message: Option<String>) -> GiacError {
    let msg = message.unwrap_or_else(|| format!("libgiac がステータス {status} を返しました"));
    if status == 1 {
        GiacError::parse("PAR100", msg)
    } else {
        GiacError::eval("EVAL100", msg)
    }
}

#[derive(Debug)]
struct Entry {
    ptr: GenPtr,
    refs: usize,
}

/// libgiac のコンテキストと、発行済みハンドルの表。
#[derive(Debug)]
pub struct NativeEngine {
    ctx: *mut c_void,
    entries: HashMap<u64, Entry>,
    next_id: u64,
}

// ENGINE_LOCK で直列化されるため、ポインタを別スレッドへ渡してよい
unsafe impl Send for NativeEngine {}

impl NativeEngine {
    pub fn new() -> GiacResult<Self> {
        // SAFETY: 引数なしのコンストラクタ
        let ctx = unsafe { giac_c_context_new() };
        if ctx.is_null() {
            return Err(GiacError::memory("MEM010", "libgiac のコンテキストを作成できません"));
        }
        Ok(Self {
            ctx,
            entries: HashMap::new(),
            next_id: 1,
        })
    }

    fn adopt(&mut self, ptr: GenPtr) -> GiacResult<RawId> {
        if ptr.is_null() {
            return Err(GiacError::memory("MEM011", "libgiac が null を返しました"));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, Entry { ptr, refs: 1 });
        Ok(RawId(id))
    }

    /// 子要素をすべて adopt する。途中で失敗したら、それまでに adopt した分を解放する。
    fn adopt_children(&mut self, g: GenPtr) -> GiacResult<Vec<RawId>> {
        // SAFETY: g は生存中
        let n = unsafe { giac_c_len(g) };
        adopt_all(self, n, |engine, i| {
            // SAFETY: giac_c_at は範囲外で null を返す
            let child = unsafe { giac_c_at(g, i) };
            engine.adopt(child)
        })
    }

    fn ptr(&self, id: RawId) -> GiacResult<GenPtr> {
        self.entries
            .get(&id.0)
            .map(|e| e.ptr)
            .ok_or_else(GiacError::released_handle)
    }

    fn scalar(&self, g: GenPtr, part: c_int) -> Scalar {
        // SAFETY: g は有効な複素数 gen、part は 0/1
        unsafe {
            let component = giac_c_part(g, part);
            let out = self.number(component);
            giac_c_free(component);
            out
        }
    }

    unsafe fn number(&self, g: GenPtr) -> Scalar {
        match TypeTag::from_code(giac_c_type(g)) {
            TypeTag::Int | TypeTag::Zint => {
                let digits = take_string(giac_c_part_string(g, 0)).unwrap_or_default();
                Scalar::Int(digits.parse().unwrap_or_default())
            }
            TypeTag::Frac => {
                let num: BigInt = take_string(giac_c_part_string(g, 0))
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default();
                let den: BigInt = take_string(giac_c_part_string(g, 1))
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| BigInt::from(1));
                Scalar::Rational(BigRational::new(num, den))
            }
            _ => {
                let mut d = f64::NAN;
                giac_c_to_double(g, &mut d);
                Scalar::Float(d)
            }
        }
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        for (_, entry) in self.entries.drain() {
            // SAFETY: adopt したポインタは 1 度だけ解放する
            unsafe { giac_c_free(entry.ptr) };
        }
        // SAFETY: new で得たコンテキスト
        unsafe { giac_c_context_free(self.ctx) };
    }
}

impl Engine for NativeEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    fn eval(&mut self, src: &str) -> GiacResult<RawId> {
        debug!(target: "giac::engine", src, "native eval");
        let c_src = c_string(src)?;
        let mut out: GenPtr = ptr::null_mut();
        let mut err: *mut c_char = ptr::null_mut();
        // SAFETY: 出力ポインタはこのスタックフレームで有効
        let status = unsafe { giac_c_eval(self.ctx, c_src.as_ptr(), &mut out, &mut err) };
        if status != 0 {
            // SAFETY: 失敗時の err はシムが確保した文字列または null
            return Err(status_error(status, unsafe { take_string(err) }));
        }
        self.adopt(out)
    }

    fn apply(&mut self, command: &str, args: &[RawId]) -> GiacResult<RawId> {
        debug!(target: "giac::engine", command, argc = args.len(), "native apply");
        let name = c_string(command)?;
        let ptrs = args
            .iter()
            .map(|id| self.ptr(*id))
            .collect::<GiacResult<Vec<_>>>()?;
        let mut out: GenPtr = ptr::null_mut();
        let mut err: *mut c_char = ptr::null_mut();
        // SAFETY: ptrs の各要素は生存中のエントリ
        let status = unsafe {
            giac_c_apply(self.ctx, name.as_ptr(), ptrs.as_ptr(), ptrs.len(), &mut out, &mut err)
        };
        if status != 0 {
            return Err(status_error(status, unsafe { take_string(err) }));
        }
        self.adopt(out)
    }

    fn print(&self, id: RawId) -> GiacResult<String> {
        let g = self.ptr(id)?;
        // SAFETY: g は生存中
        unsafe { take_string(giac_c_print(self.ctx, g)) }
            .ok_or_else(|| GiacError::memory("MEM011", "libgiac が null を返しました"))
    }

    fn type_tag(&self, id: RawId) -> GiacResult<(TypeTag, Subtype)> {
        let g = self.ptr(id)?;
        // SAFETY: g は生存中
        let (tag, sub) = unsafe { (giac_c_type(g), giac_c_subtype(g)) };
        Ok((TypeTag::from_code(tag), Subtype::from_code(sub)))
    }

    fn view(&mut self, id: RawId) -> GiacResult<View> {
        let g = self.ptr(id)?;
        let (tag, subtype) = self.type_tag(id)?;
        // SAFETY: g は生存中。子要素はシムが新しく確保し adopt が所有する
        let view = unsafe {
            match tag {
                TypeTag::Int if subtype == Subtype::Boolean => {
                    let mut v = 0i64;
                    giac_c_to_i64(g, &mut v);
                    View::Bool(v != 0)
                }
                TypeTag::Int => {
                    let mut v = 0i64;
                    giac_c_to_i64(g, &mut v);
                    View::Int(v)
                }
                TypeTag::Zint => match self.number(g) {
                    Scalar::Int(n) => View::Zint(n),
                    _ => View::Other(tag),
                },
                TypeTag::Frac => match self.number(g) {
                    Scalar::Rational(q) => View::Frac(q),
                    _ => View::Other(tag),
                },
                TypeTag::Double | TypeTag::Real | TypeTag::Float => {
                    let mut d = f64::NAN;
                    giac_c_to_double(g, &mut d);
                    View::Float(d)
                }
                TypeTag::Cplx => View::Cplx(self.scalar(g, 0), self.scalar(g, 1)),
                TypeTag::Idnt => View::Idnt(take_string(giac_c_print(self.ctx, g)).unwrap_or_default()),
                TypeTag::String => View::Str(take_string(giac_c_part_string(g, 0)).unwrap_or_default()),
                TypeTag::Vect => View::Vect {
                    items: self.adopt_children(g)?,
                    subtype,
                },
                TypeTag::Symb => {
                    let op = take_string(giac_c_symb_op(g)).unwrap_or_default();
                    View::Symb {
                        op,
                        args: self.adopt_children(g)?,
                    }
                }
                other => View::Other(other),
            }
        };
        Ok(view)
    }

    fn retain(&mut self, id: RawId) -> GiacResult<RawId> {
        let entry = self.entries.get_mut(&id.0).ok_or_else(GiacError::released_handle)?;
        entry.refs += 1;
        Ok(id)
    }

    fn release(&mut self, id: RawId) {
        let Some(entry) = self.entries.get_mut(&id.0) else {
            trace!(target: "giac::engine", id = id.0, "release of unknown id ignored");
            return;
        };
        entry.refs -= 1;
        if entry.refs == 0 {
            if let Some(entry) = self.entries.remove(&id.0) {
                // SAFETY: 最後の参照なので解放してよい
                unsafe { giac_c_free(entry.ptr) };
                trace!(target: "giac::engine", id = id.0, "gen freed");
            }
        }
    }

    fn live_handles(&self) -> usize {
        self.entries.len()
    }

    fn help_records(&self) -> Vec<HelpRecord> {
        let split = |s: String, sep: char| -> Vec<String> {
            s.split(sep)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };
        // SAFETY: index はシムが報告した件数未満
        unsafe {
            (0..giac_c_help_count())
                .filter_map(|i| {
                    let name = take_string(giac_c_help_field(i, 0))?;
                    Some(HelpRecord {
                        name,
                        description: take_string(giac_c_help_field(i, 1)).unwrap_or_default(),
                        related: split(take_string(giac_c_help_field(i, 2)).unwrap_or_default(), ','),
                        examples: split(take_string(giac_c_help_field(i, 3)).unwrap_or_default(), ';'),
                    })
                })
                .collect()
        }
    }
}
