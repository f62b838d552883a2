// パス: src/expr.rs
// 役割: エンジン内の値を 1 参照ぶん所有する RAII ハンドル GiacExpr
// 意図: 解放をファイナライザではなく Drop で決定的に行い、null ハンドルの利用を型付きエラーにする
// 関連ファイル: src/engine/mod.rs, src/marshal.rs, src/session.rs
//! 式ハンドル
//!
//! - `Clone` はエンジンに参照を 1 つ増やしてもらい、`Drop` はロック下で参照を返す。
//! - エンジンのクロージャ内では `RawId` のみを扱い、`GiacExpr` の生成・破棄はロック解放後に行う。
//! - null ハンドルは `<null GiacExpr>` と表示され、計算に使うと `MEM001`。

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::engine::{EngineCell, RawId, Subtype, TypeTag, View};
use crate::errors::{GiacError, GiacResult};
use crate::marshal::FromGiac;

pub struct GiacExpr {
    cell: Option<Arc<EngineCell>>,
    id: Option<RawId>,
}

impl GiacExpr {
    /// どのエンジンにも属さないハンドル。
    pub const fn null() -> Self {
        Self {
            cell: None,
            id: None,
        }
    }

    /// 既に 1 参照ぶん確保済みの id を引き取る。
    pub(crate) fn adopt(cell: &Arc<EngineCell>, id: RawId) -> Self {
        Self {
            cell: Some(Arc::clone(cell)),
            id: Some(id),
        }
    }

    pub fn is_null(&self) -> bool {
        self.id.is_none()
    }

    pub(crate) fn raw_id(&self) -> GiacResult<RawId> {
        self.id.ok_or_else(GiacError::released_handle)
    }

    pub(crate) fn cell(&self) -> GiacResult<&Arc<EngineCell>> {
        match (&self.cell, self.id) {
            (Some(cell), Some(_)) => Ok(cell),
            _ => Err(GiacError::released_handle()),
        }
    }

    /// 同じエンジンに属するか。
    pub fn same_engine(&self, other: &GiacExpr) -> bool {
        match (&self.cell, &other.cell) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// 参照を明示的に返し、以後このハンドルを null にする。
    pub fn release(&mut self) {
        if let (Some(cell), Some(id)) = (self.cell.take(), self.id.take()) {
            cell.with(|engine| engine.release(id));
            trace!(target: "giac::expr", id = id.0, "handle released");
        }
    }

    /// エンジンのプリンタによる文字列表現。
    pub fn print(&self) -> GiacResult<String> {
        let id = self.raw_id()?;
        self.cell()?.with(|engine| engine.print(id))
    }

    pub fn type_tag(&self) -> GiacResult<(TypeTag, Subtype)> {
        let id = self.raw_id()?;
        self.cell()?.with(|engine| engine.type_tag(id))
    }

    /// 値の形状と、子要素を所有するハンドル列。
    pub(crate) fn view(&self) -> GiacResult<(View, Vec<GiacExpr>)> {
        let id = self.raw_id()?;
        let cell = self.cell()?;
        let view = cell.with(|engine| engine.view(id))?;
        let children = view
            .children()
            .iter()
            .map(|child| GiacExpr::adopt(cell, *child))
            .collect();
        Ok((view, children))
    }

    /// Vect・Symb の子要素。それ以外は空。
    pub fn children(&self) -> GiacResult<Vec<GiacExpr>> {
        Ok(self.view()?.1)
    }

    /// 明示的な型変換（`expr.to::<i64>()` など）。
    pub fn to<T: FromGiac>(&self) -> GiacResult<T> {
        T::from_giac(self)
    }

    /// 同じエンジン上でコマンドを直接適用する。
    pub(crate) fn apply_in(
        cell: &Arc<EngineCell>,
        command: &str,
        args: &[&GiacExpr],
    ) -> GiacResult<GiacExpr> {
        let mut ids = Vec::with_capacity(args.len());
        for arg in args {
            let arg_cell = arg.cell()?;
            if !Arc::ptr_eq(arg_cell, cell) {
                return Err(GiacError::usage(
                    "EXPR010",
                    "別のセッションに属するハンドルは混在できません",
                ));
            }
            ids.push(arg.raw_id()?);
        }
        let id = cell.with(|engine| engine.apply(command, &ids))?;
        Ok(GiacExpr::adopt(cell, id))
    }

    fn binary(&self, op: &str, rhs: &GiacExpr) -> GiacResult<GiacExpr> {
        let cell = self.cell()?;
        GiacExpr::apply_in(cell, op, &[self, rhs])
    }

    pub fn try_add(&self, rhs: &GiacExpr) -> GiacResult<GiacExpr> {
        self.binary("+", rhs)
    }

    pub fn try_sub(&self, rhs: &GiacExpr) -> GiacResult<GiacExpr> {
        self.binary("-", rhs)
    }

    pub fn try_mul(&self, rhs: &GiacExpr) -> GiacResult<GiacExpr> {
        self.binary("*", rhs)
    }

    pub fn try_div(&self, rhs: &GiacExpr) -> GiacResult<GiacExpr> {
        self.binary("/", rhs)
    }

    pub fn try_pow(&self, rhs: &GiacExpr) -> GiacResult<GiacExpr> {
        self.binary("^", rhs)
    }

    pub fn try_neg(&self) -> GiacResult<GiacExpr> {
        let cell = self.cell()?;
        GiacExpr::apply_in(cell, "neg", &[self])
    }
}

impl Clone for GiacExpr {
    /// 複製に失敗した場合（解放済みなど）は null を返す。
    fn clone(&self) -> Self {
        match (&self.cell, self.id) {
            (Some(cell), Some(id)) => match cell.with(|engine| engine.retain(id)) {
                Ok(id) => GiacExpr::adopt(cell, id),
                Err(_) => GiacExpr::null(),
            },
            _ => GiacExpr::null(),
        }
    }
}

impl Drop for GiacExpr {
    fn drop(&mut self) {
        self.release();
    }
}

impl Default for GiacExpr {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for GiacExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("<null GiacExpr>");
        }
        match self.print() {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<null GiacExpr>"),
        }
    }
}

impl fmt::Debug for GiacExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "GiacExpr({}: {})", id.0, self),
            None => f.write_str("GiacExpr(null)"),
        }
    }
}

impl PartialEq for GiacExpr {
    /// 同じエンジン上で表示が一致すれば等しいとみなす。
    fn eq(&self, other: &Self) -> bool {
        if self.is_null() || other.is_null() {
            return self.is_null() && other.is_null();
        }
        self.same_engine(other)
            && matches!((self.print(), other.print()), (Ok(a), Ok(b)) if a == b)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $inner:ident) => {
        impl std::ops::$trait<&GiacExpr> for &GiacExpr {
            type Output = GiacResult<GiacExpr>;

            fn $method(self, rhs: &GiacExpr) -> Self::Output {
                self.$inner(rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, try_add);
impl_binary_op!(Sub, sub, try_sub);
impl_binary_op!(Mul, mul, try_mul);
impl_binary_op!(Div, div, try_div);

impl std::ops::Neg for &GiacExpr {
    type Output = GiacResult<GiacExpr>;

    fn neg(self) -> Self::Output {
        self.try_neg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::builtin::BuiltinEngine;

    fn cell() -> Arc<EngineCell> {
        EngineCell::new(Box::new(BuiltinEngine::new()))
    }

    fn eval(cell: &Arc<EngineCell>, src: &str) -> GiacExpr {
        let id = cell.with(|e| e.eval(src)).unwrap();
        GiacExpr::adopt(cell, id)
    }

    fn live(cell: &Arc<EngineCell>) -> usize {
        cell.with(|e| e.live_handles())
    }

    #[test]
    fn drop_and_clone_track_references() {
        let c = cell();
        let a = eval(&c, "x+1");
        let b = a.clone();
        assert_eq!(live(&c), 1);
        drop(a);
        assert_eq!(b.to_string(), "x+1");
        drop(b);
        assert_eq!(live(&c), 0);
    }

    #[test]
    fn null_handles_display_and_fail() {
        let n = GiacExpr::null();
        assert_eq!(n.to_string(), "<null GiacExpr>");
        assert_eq!(n.print().unwrap_err().code(), "MEM001");
        let c = cell();
        let mut x = eval(&c, "x");
        x.release();
        assert!(x.is_null());
        assert_eq!((&x + &x).unwrap_err().code(), "MEM001");
    }

    #[test]
    fn operators_call_the_engine() {
        let c = cell();
        let x = eval(&c, "x");
        let one = eval(&c, "1");
        let sum = (&x + &one).unwrap();
        let sq = sum.try_pow(&eval(&c, "2")).unwrap();
        assert_eq!(sq.to_string(), "(x+1)^2");
        assert_eq!((-&x).unwrap().to_string(), "-x");
    }

    #[test]
    fn handles_from_different_engines_do_not_mix() {
        let a = eval(&cell(), "1");
        let b = eval(&cell(), "2");
        assert_eq!((&a + &b).unwrap_err().code(), "EXPR010");
    }
}
