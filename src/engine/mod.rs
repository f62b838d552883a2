// パス: src/engine/mod.rs
// 役割: 計算エンジンの抽象（Engine トレイト）・型タグ・ロックを定義する
// 意図: libgiac と組み込みエンジンを同じ呼び出し経路で扱えるようにする
// 関連ファイル: src/engine/builtin/mod.rs, src/engine/native.rs, src/expr.rs
//! エンジン抽象モジュール
//!
//! - `Engine` はラップ対象エンジンの最小インターフェース（評価・表示・解放・内省）。
//! - エンジン内の値は `RawId` で参照し、所有は `expr::GiacExpr` が RAII で管理する。
//! - エンジン呼び出しはすべてプロセス全体の `ENGINE_LOCK` で直列化する。

pub mod builtin;
#[cfg(feature = "giac-native")]
pub mod native;

use std::sync::{Arc, Mutex, PoisonError};

use num_bigint::BigInt;
use num_rational::BigRational;
use once_cell::sync::Lazy;

use crate::errors::GiacResult;

/// エンジン側に存在する値への生の参照。所有権は持たない。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawId(pub u64);

/// GIAC の内部判別子に対応する型タグ。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    Double,
    Zint,
    Real,
    Cplx,
    Poly,
    Idnt,
    Vect,
    Symb,
    Spol1,
    Frac,
    Ext,
    String,
    Func,
    Root,
    Mod,
    User,
    Map,
    Eqw,
    Grob,
    Pointer,
    Float,
}

impl TypeTag {
    /// GIAC の `gen::type` 値から変換する（未知の値は `Pointer` 扱い）。
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Int,
            1 => Self::Double,
            2 => Self::Zint,
            3 => Self::Real,
            4 => Self::Cplx,
            5 => Self::Poly,
            6 => Self::Idnt,
            7 => Self::Vect,
            8 => Self::Symb,
            9 => Self::Spol1,
            10 => Self::Frac,
            11 => Self::Ext,
            12 => Self::String,
            13 => Self::Func,
            14 => Self::Root,
            15 => Self::Mod,
            16 => Self::User,
            17 => Self::Map,
            18 => Self::Eqw,
            19 => Self::Grob,
            21 => Self::Float,
            _ => Self::Pointer,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Int => 0,
            Self::Double => 1,
            Self::Zint => 2,
            Self::Real => 3,
            Self::Cplx => 4,
            Self::Poly => 5,
            Self::Idnt => 6,
            Self::Vect => 7,
            Self::Symb => 8,
            Self::Spol1 => 9,
            Self::Frac => 10,
            Self::Ext => 11,
            Self::String => 12,
            Self::Func => 13,
            Self::Root => 14,
            Self::Mod => 15,
            Self::User => 16,
            Self::Map => 17,
            Self::Eqw => 18,
            Self::Grob => 19,
            Self::Pointer => 20,
            Self::Float => 21,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Zint => "zint",
            Self::Real => "real",
            Self::Cplx => "cplx",
            Self::Poly => "poly",
            Self::Idnt => "idnt",
            Self::Vect => "vect",
            Self::Symb => "symb",
            Self::Spol1 => "spol1",
            Self::Frac => "frac",
            Self::Ext => "ext",
            Self::String => "string",
            Self::Func => "func",
            Self::Root => "root",
            Self::Mod => "mod",
            Self::User => "user",
            Self::Map => "map",
            Self::Eqw => "eqw",
            Self::Grob => "grob",
            Self::Pointer => "pointer",
            Self::Float => "float",
        }
    }
}

/// 型タグを補う副分類。C シムは以下のコードへ正規化して返す。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subtype {
    None,
    Boolean,
    Sequence,
    Set,
    List,
    Matrix,
}

impl Subtype {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Boolean,
            2 => Self::Sequence,
            3 => Self::Set,
            4 => Self::List,
            5 => Self::Matrix,
            _ => Self::None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Boolean => 1,
            Self::Sequence => 2,
            Self::Set => 3,
            Self::List => 4,
            Self::Matrix => 5,
        }
    }
}

/// 複素数の実部・虚部に現れる数値。
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Int(BigInt),
    Rational(BigRational),
    Float(f64),
}

/// 値の形状を覗くための表現。子要素の `RawId` は呼び出し側が解放する。
#[derive(Clone, Debug, PartialEq)]
pub enum View {
    Bool(bool),
    Int(i64),
    Zint(BigInt),
    Frac(BigRational),
    Float(f64),
    Cplx(Scalar, Scalar),
    Vect { items: Vec<RawId>, subtype: Subtype },
    Idnt(String),
    Symb { op: String, args: Vec<RawId> },
    Str(String),
    Other(TypeTag),
}

impl View {
    /// `View` が抱える子ハンドルを列挙する（解放漏れ防止用）。
    pub fn children(&self) -> &[RawId] {
        match self {
            View::Vect { items, .. } => items,
            View::Symb { args, .. } => args,
            _ => &[],
        }
    }
}

/// エンジン内蔵ヘルプデータベースの 1 レコード。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HelpRecord {
    pub name: String,
    pub description: String,
    pub related: Vec<String>,
    pub examples: Vec<String>,
}

/// ラップ対象エンジンが満たすべき操作群。
///
/// 実装はスレッド安全である必要はない（呼び出しは `EngineCell` 経由で直列化される）。
pub trait Engine: Send {
    /// バックエンド名（ログ・REPL 表示用）。
    fn name(&self) -> &'static str;
    /// GIAC 構文の文字列を評価し、新しい参照を返す。
    fn eval(&mut self, src: &str) -> GiacResult<RawId>;
    /// 既存ハンドルを引数にコマンドを直接適用する（文字列往復なし）。
    fn apply(&mut self, command: &str, args: &[RawId]) -> GiacResult<RawId>;
    /// エンジン自身のプリンタで文字列化する。
    fn print(&self, id: RawId) -> GiacResult<String>;
    fn type_tag(&self, id: RawId) -> GiacResult<(TypeTag, Subtype)>;
    fn view(&mut self, id: RawId) -> GiacResult<View>;
    /// 参照を複製する。
    fn retain(&mut self, id: RawId) -> GiacResult<RawId>;
    /// 参照を解放する。未知の id は無視する。
    fn release(&mut self, id: RawId);
    /// 生存中の参照数（リーク検査用）。
    fn live_handles(&self) -> usize;
    fn help_records(&self) -> Vec<HelpRecord>;
}

/// `n` 個の子参照を順に取得する。途中で失敗したら、取得済みの参照を解放してから失敗を返す。
#[cfg_attr(not(feature = "giac-native"), allow(dead_code))]
pub(crate) fn adopt_all<E: Engine + ?Sized>(
    engine: &mut E,
    n: usize,
    mut next: impl FnMut(&mut E, usize) -> GiacResult<RawId>,
) -> GiacResult<Vec<RawId>> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        match next(engine, i) {
            Ok(id) => ids.push(id),
            Err(e) => {
                for id in ids {
                    engine.release(id);
                }
                return Err(e);
            }
        }
    }
    Ok(ids)
}

/// すべてのエンジン呼び出しを直列化するプロセス全体のロック。
pub(crate) static ENGINE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// エンジン実体とそのロックをまとめたセル。ハンドルとセッションで共有する。
pub struct EngineCell {
    backend: &'static str,
    engine: Mutex<Box<dyn Engine>>,
}

impl EngineCell {
    pub fn new(engine: Box<dyn Engine>) -> Arc<Self> {
        Arc::new(Self {
            backend: engine.name(),
            engine: Mutex::new(engine),
        })
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// グローバルロックを取得した上でエンジンを操作する。
    ///
    /// クロージャ内で `GiacExpr` を生成・破棄してはならない（再入でデッドロックする）。
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Engine) -> R) -> R {
        let _global = ENGINE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut guard = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        f(guard.as_mut())
    }
}

impl std::fmt::Debug for EngineCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCell")
            .field("backend", &self.backend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tag_codes_round_trip() {
        for code in 0..=21 {
            let tag = TypeTag::from_code(code);
            assert_eq!(tag.code(), code, "tag {}", tag.name());
        }
        assert_eq!(TypeTag::from_code(99), TypeTag::Pointer);
    }

    #[test]
    fn adopt_all_releases_on_partial_failure() {
        use crate::errors::GiacError;
        let mut engine = builtin::BuiltinEngine::new();
        let err = adopt_all(&mut engine, 4, |e, i| {
            if i == 2 {
                Err(GiacError::memory("MEM011", "null child"))
            } else {
                e.eval("[1,2]")
            }
        })
        .unwrap_err();
        assert_eq!(err.code(), "MEM011");
        assert_eq!(engine.live_handles(), 0);
        let ids = adopt_all(&mut engine, 3, |e, _| e.eval("x")).unwrap();
        assert_eq!(engine.live_handles(), 3);
        for id in ids {
            engine.release(id);
        }
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn subtype_unknown_code_is_none() {
        assert_eq!(Subtype::from_code(1), Subtype::Boolean);
        assert_eq!(Subtype::from_code(42), Subtype::None);
    }
}
