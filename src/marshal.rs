// パス: src/marshal.rs
// 役割: 結果ハンドルを型タグに従って最も近いネイティブ型へ変換する（型付き変換 FromGiac を含む）
// 意図: 情報を失う変換は行わず、表せないものは不透明ハンドルのまま返す
// 関連ファイル: src/expr.rs, src/engine/mod.rs, src/config.rs
//! 型マーシャラ
//!
//! - 変換は (TypeTag, Subtype) で振り分ける。真偽値は整数 1 とは区別する。
//! - リストは全要素が同じネイティブ種別に揃うときだけネイティブ化し、1 つでも揃わなければ
//!   全体を `NativeList::Symbolic` で返す（ネイティブ値と不透明値を混ぜない）。
//! - 拡幅規則は `ConversionPolicy` で切り替える。

use num_bigint::BigInt;
use num_complex::{Complex, Complex64};
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::engine::{Scalar, Subtype, TypeTag, View};
use crate::errors::{GiacError, GiacResult};
use crate::expr::GiacExpr;

/// リスト要素の拡幅と大整数の縮小の方針。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionPolicy {
    /// `i64` と `BigInt` が混在するリストを `BigInt` に揃える。
    pub widen_integers: bool,
    /// 整数と有理数が混在するリストを `BigRational` に揃える。
    pub widen_rationals: bool,
    /// `i64` に収まる大整数を `i64` として返す。
    pub narrow_bigints: bool,
}

impl Default for ConversionPolicy {
    fn default() -> Self {
        Self {
            widen_integers: true,
            widen_rationals: false,
            narrow_bigints: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NativeComplex {
    Float(Complex64),
    Exact(Complex<BigRational>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum NativeList {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    BigInt(Vec<BigInt>),
    Rational(Vec<BigRational>),
    Float(Vec<f64>),
    Complex(Vec<NativeComplex>),
    /// 同じ種別の入れ子リスト（行列など）。
    Nested(Vec<NativeList>),
    Symbolic(Vec<GiacExpr>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Native {
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Rational(BigRational),
    Float(f64),
    Complex(NativeComplex),
    List(NativeList),
    Symbolic(GiacExpr),
}

impl NativeList {
    pub fn len(&self) -> usize {
        match self {
            NativeList::Bool(v) => v.len(),
            NativeList::Int(v) => v.len(),
            NativeList::BigInt(v) => v.len(),
            NativeList::Rational(v) => v.len(),
            NativeList::Float(v) => v.len(),
            NativeList::Complex(v) => v.len(),
            NativeList::Nested(v) => v.len(),
            NativeList::Symbolic(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 入れ子の種別比較用のラベル。
    fn kind(&self) -> String {
        match self {
            NativeList::Bool(_) => "bool".into(),
            NativeList::Int(_) => "int".into(),
            NativeList::BigInt(_) => "bigint".into(),
            NativeList::Rational(_) => "rational".into(),
            NativeList::Float(_) => "float".into(),
            NativeList::Complex(_) => "complex".into(),
            NativeList::Nested(items) => match items.first() {
                Some(first) => format!("nested<{}>", first.kind()),
                None => "nested".into(),
            },
            NativeList::Symbolic(_) => "symbolic".into(),
        }
    }
}

fn scalar_to_rational(s: &Scalar) -> Option<BigRational> {
    match s {
        Scalar::Int(i) => Some(BigRational::from_integer(i.clone())),
        Scalar::Rational(q) => Some(q.clone()),
        Scalar::Float(_) => None,
    }
}

fn scalar_to_f64(s: &Scalar) -> f64 {
    match s {
        Scalar::Int(i) => i.to_f64().unwrap_or(f64::NAN),
        Scalar::Rational(q) => q.to_f64().unwrap_or(f64::NAN),
        Scalar::Float(d) => *d,
    }
}

fn complex_from_scalars(re: &Scalar, im: &Scalar) -> NativeComplex {
    match (scalar_to_rational(re), scalar_to_rational(im)) {
        (Some(r), Some(i)) => NativeComplex::Exact(Complex::new(r, i)),
        _ => NativeComplex::Float(Complex64::new(scalar_to_f64(re), scalar_to_f64(im))),
    }
}

/// ハンドルを最も近いネイティブ値へ変換する。
pub fn to_native(expr: &GiacExpr, policy: &ConversionPolicy) -> GiacResult<Native> {
    let (tag, _) = expr.type_tag()?;
    match tag {
        TypeTag::Int
        | TypeTag::Zint
        | TypeTag::Frac
        | TypeTag::Double
        | TypeTag::Real
        | TypeTag::Float
        | TypeTag::Cplx
        | TypeTag::Vect => {}
        _ => return Ok(Native::Symbolic(expr.clone())),
    }
    let (view, children) = expr.view()?;
    Ok(match view {
        View::Bool(b) => Native::Bool(b),
        View::Int(i) => Native::Int(i),
        View::Zint(n) => match n.to_i64() {
            Some(i) if policy.narrow_bigints => Native::Int(i),
            _ => Native::BigInt(n),
        },
        View::Frac(q) => Native::Rational(q),
        View::Float(d) => Native::Float(d),
        View::Cplx(re, im) => Native::Complex(complex_from_scalars(&re, &im)),
        View::Vect { .. } => Native::List(list_to_native(children, policy)?),
        _ => Native::Symbolic(expr.clone()),
    })
}

fn list_to_native(items: Vec<GiacExpr>, policy: &ConversionPolicy) -> GiacResult<NativeList> {
    let natives = items
        .iter()
        .map(|item| to_native(item, policy))
        .collect::<GiacResult<Vec<_>>>()?;
    Ok(unify(natives, policy).unwrap_or(NativeList::Symbolic(items)))
}

/// 要素が 1 つの種別に揃えばそのリストを返す。
fn unify(items: Vec<Native>, policy: &ConversionPolicy) -> Option<NativeList> {
    let Some(first) = items.first() else {
        return Some(NativeList::Int(Vec::new()));
    };
    let all = |pred: fn(&Native) -> bool| items.iter().all(pred);
    let is_int = |n: &Native| matches!(n, Native::Int(_));
    let is_integer = |n: &Native| matches!(n, Native::Int(_) | Native::BigInt(_));
    let is_exact = |n: &Native| matches!(n, Native::Int(_) | Native::BigInt(_) | Native::Rational(_));

    if all(|n| matches!(n, Native::Bool(_))) {
        return Some(NativeList::Bool(
            items.into_iter().filter_map(|n| match n {
                Native::Bool(b) => Some(b),
                _ => None,
            }).collect(),
        ));
    }
    if all(is_int) {
        return Some(NativeList::Int(
            items.into_iter().filter_map(|n| match n {
                Native::Int(i) => Some(i),
                _ => None,
            }).collect(),
        ));
    }
    if all(|n| matches!(n, Native::BigInt(_))) || (policy.widen_integers && all(is_integer)) {
        return Some(NativeList::BigInt(
            items.into_iter().filter_map(|n| match n {
                Native::Int(i) => Some(BigInt::from(i)),
                Native::BigInt(b) => Some(b),
                _ => None,
            }).collect(),
        ));
    }
    if all(|n| matches!(n, Native::Rational(_))) || (policy.widen_rationals && all(is_exact)) {
        return Some(NativeList::Rational(
            items.into_iter().filter_map(|n| match n {
                Native::Int(i) => Some(BigRational::from_integer(BigInt::from(i))),
                Native::BigInt(b) => Some(BigRational::from_integer(b)),
                Native::Rational(q) => Some(q),
                _ => None,
            }).collect(),
        ));
    }
    if all(|n| matches!(n, Native::Float(_))) {
        return Some(NativeList::Float(
            items.into_iter().filter_map(|n| match n {
                Native::Float(d) => Some(d),
                _ => None,
            }).collect(),
        ));
    }
    if all(|n| matches!(n, Native::Complex(_))) {
        return Some(NativeList::Complex(
            items.into_iter().filter_map(|n| match n {
                Native::Complex(c) => Some(c),
                _ => None,
            }).collect(),
        ));
    }
    if let Native::List(head) = first {
        let kind = head.kind();
        let homogeneous = items.iter().all(|n| match n {
            Native::List(l) => !matches!(l, NativeList::Symbolic(_)) && l.kind() == kind,
            _ => false,
        });
        if homogeneous {
            return Some(NativeList::Nested(
                items.into_iter().filter_map(|n| match n {
                    Native::List(l) => Some(l),
                    _ => None,
                }).collect(),
            ));
        }
    }
    None
}

/// ハンドルから Rust の型への明示的な変換。
pub trait FromGiac: Sized {
    fn from_giac(expr: &GiacExpr) -> GiacResult<Self>;
}

fn mismatch(expr: &GiacExpr, target: &str) -> GiacError {
    GiacError::type_error("MAR001", format!("`{expr}` は {target} に変換できません"))
}

fn scalar_view(expr: &GiacExpr) -> GiacResult<View> {
    let (tag, subtype) = expr.type_tag()?;
    if tag == TypeTag::Vect || tag == TypeTag::Symb {
        return Ok(View::Other(tag));
    }
    let (view, _) = expr.view()?;
    Ok(match view {
        View::Int(i) if subtype == Subtype::Boolean => View::Bool(i != 0),
        other => other,
    })
}

impl FromGiac for i64 {
    fn from_giac(expr: &GiacExpr) -> GiacResult<Self> {
        match scalar_view(expr)? {
            View::Int(i) => Ok(i),
            View::Zint(n) => n.to_i64().ok_or_else(|| mismatch(expr, "i64")),
            _ => Err(mismatch(expr, "i64")),
        }
    }
}

impl FromGiac for BigInt {
    fn from_giac(expr: &GiacExpr) -> GiacResult<Self> {
        match scalar_view(expr)? {
            View::Int(i) => Ok(BigInt::from(i)),
            View::Zint(n) => Ok(n),
            _ => Err(mismatch(expr, "BigInt")),
        }
    }
}

impl FromGiac for BigRational {
    fn from_giac(expr: &GiacExpr) -> GiacResult<Self> {
        match scalar_view(expr)? {
            View::Int(i) => Ok(BigRational::from_integer(BigInt::from(i))),
            View::Zint(n) => Ok(BigRational::from_integer(n)),
            View::Frac(q) => Ok(q),
            _ => Err(mismatch(expr, "BigRational")),
        }
    }
}

impl FromGiac for f64 {
    fn from_giac(expr: &GiacExpr) -> GiacResult<Self> {
        match scalar_view(expr)? {
            View::Float(d) => Ok(d),
            View::Int(i) => Ok(i as f64),
            View::Zint(n) => n.to_f64().ok_or_else(|| mismatch(expr, "f64")),
            View::Frac(q) => q.to_f64().ok_or_else(|| mismatch(expr, "f64")),
            _ => Err(mismatch(expr, "f64")),
        }
    }
}

impl FromGiac for bool {
    fn from_giac(expr: &GiacExpr) -> GiacResult<Self> {
        match scalar_view(expr)? {
            View::Bool(b) => Ok(b),
            _ => Err(mismatch(expr, "bool")),
        }
    }
}

impl FromGiac for Complex64 {
    fn from_giac(expr: &GiacExpr) -> GiacResult<Self> {
        match scalar_view(expr)? {
            View::Cplx(re, im) => Ok(Complex64::new(scalar_to_f64(&re), scalar_to_f64(&im))),
            View::Bool(_) => Err(mismatch(expr, "Complex64")),
            _ => Ok(Complex64::new(f64::from_giac(expr)?, 0.0)),
        }
    }
}

impl FromGiac for Complex<BigRational> {
    fn from_giac(expr: &GiacExpr) -> GiacResult<Self> {
        match scalar_view(expr)? {
            View::Cplx(re, im) => match (scalar_to_rational(&re), scalar_to_rational(&im)) {
                (Some(r), Some(i)) => Ok(Complex::new(r, i)),
                _ => Err(mismatch(expr, "Complex<BigRational>")),
            },
            _ => Ok(Complex::new(BigRational::from_giac(expr)?, BigRational::zero())),
        }
    }
}

/// 文字列値は中身を、それ以外はエンジンの表示を返す。
impl FromGiac for String {
    fn from_giac(expr: &GiacExpr) -> GiacResult<Self> {
        if expr.type_tag()?.0 == TypeTag::String {
            if let (View::Str(s), _) = expr.view()? {
                return Ok(s);
            }
        }
        expr.print()
    }
}

impl<T: FromGiac> FromGiac for Vec<T> {
    fn from_giac(expr: &GiacExpr) -> GiacResult<Self> {
        let (tag, _) = expr.type_tag()?;
        if tag != TypeTag::Vect {
            return Err(mismatch(expr, "Vec"));
        }
        expr.children()?.iter().map(T::from_giac).collect()
    }
}
