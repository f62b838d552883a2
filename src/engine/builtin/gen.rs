// パス: src/engine/builtin/gen.rs
// 役割: 組み込みエンジンの値表現 `Gen` と数値演算（整数・有理数・浮動小数・複素数）
// 意図: GIAC のタグ付き共用体に倣った表現で、型タグの判定と数値計算を一箇所に集める
// 関連ファイル: src/engine/builtin/ops.rs, src/engine/builtin/printer.rs, src/engine/mod.rs

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::engine::{Subtype, TypeTag};

/// 組み込みエンジンの式。正規化の約束:
/// - `Frac` の分母は 1 にならない（整数は `Int`）。
/// - `Cplx` の虚部は 0 にならない。
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Gen {
    Int(BigInt),
    Frac(BigRational),
    Double(f64),
    Cplx(Box<Gen>, Box<Gen>),
    Bool(bool),
    Idnt(String),
    Str(String),
    Vect(Vec<Gen>, Subtype),
    Symb(String, Vec<Gen>),
}

impl Gen {
    pub fn int(v: impl Into<BigInt>) -> Gen {
        Gen::Int(v.into())
    }

    pub fn zero() -> Gen {
        Gen::Int(BigInt::zero())
    }

    pub fn one() -> Gen {
        Gen::Int(BigInt::one())
    }

    pub fn minus_one() -> Gen {
        Gen::Int(-BigInt::one())
    }

    pub fn idnt(name: impl Into<String>) -> Gen {
        Gen::Idnt(name.into())
    }

    pub fn symb(op: impl Into<String>, args: Vec<Gen>) -> Gen {
        Gen::Symb(op.into(), args)
    }

    pub fn list(items: Vec<Gen>) -> Gen {
        Gen::Vect(items, Subtype::List)
    }

    pub fn imaginary_unit() -> Gen {
        Gen::Cplx(Box::new(Gen::zero()), Box::new(Gen::one()))
    }

    pub fn undef() -> Gen {
        Gen::Idnt("undef".into())
    }

    pub fn rational(q: BigRational) -> Gen {
        if q.is_integer() {
            Gen::Int(q.to_integer())
        } else {
            Gen::Frac(q)
        }
    }

    pub fn complex(re: Gen, im: Gen) -> Gen {
        if im.is_zero() {
            re
        } else {
            Gen::Cplx(Box::new(re), Box::new(im))
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Gen::Int(_) | Gen::Frac(_) | Gen::Double(_) | Gen::Cplx(..)
        )
    }

    pub fn is_real_number(&self) -> bool {
        matches!(self, Gen::Int(_) | Gen::Frac(_) | Gen::Double(_))
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Gen::Int(_) | Gen::Frac(_))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Gen::Int(i) => i.is_zero(),
            Gen::Double(d) => *d == 0.0,
            _ => false,
        }
    }

    pub fn is_one(&self) -> bool {
        match self {
            Gen::Int(i) => i.is_one(),
            _ => false,
        }
    }

    pub fn is_minus_one(&self) -> bool {
        match self {
            Gen::Int(i) => *i == -BigInt::one(),
            _ => false,
        }
    }

    pub fn is_negative_real(&self) -> bool {
        match self {
            Gen::Int(i) => i.is_negative(),
            Gen::Frac(q) => q.is_negative(),
            Gen::Double(d) => *d < 0.0,
            _ => false,
        }
    }

    pub fn as_rational(&self) -> Option<BigRational> {
        match self {
            Gen::Int(i) => Some(BigRational::from_integer(i.clone())),
            Gen::Frac(q) => Some(q.clone()),
            _ => None,
        }
    }

    pub fn as_bigint(&self) -> Option<&BigInt> {
        match self {
            Gen::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_bigint().and_then(ToPrimitive::to_i64)
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Gen::Int(i) => i.to_f64(),
            Gen::Frac(q) => q.to_f64(),
            Gen::Double(d) => Some(*d),
            Gen::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn is_symbol(&self, name: &str) -> bool {
        matches!(self, Gen::Idnt(n) if n == name)
    }

    pub fn is_op(&self, name: &str) -> bool {
        matches!(self, Gen::Symb(op, _) if op == name)
    }

    /// 行列（同じ長さのベクトルを要素に持つ空でないベクトル）か。
    pub fn matrix_dims(&self) -> Option<(usize, usize)> {
        let Gen::Vect(rows, _) = self else {
            return None;
        };
        let first = match rows.first() {
            Some(Gen::Vect(r, _)) => r.len(),
            _ => return None,
        };
        if first == 0 {
            return None;
        }
        for row in rows {
            match row {
                Gen::Vect(r, _) if r.len() == first => {}
                _ => return None,
            }
        }
        Some((rows.len(), first))
    }

    /// 指定した識別子を含むか。
    pub fn contains_symbol(&self, name: &str) -> bool {
        match self {
            Gen::Idnt(n) => n == name,
            Gen::Cplx(re, im) => re.contains_symbol(name) || im.contains_symbol(name),
            Gen::Vect(items, _) | Gen::Symb(_, items) => {
                items.iter().any(|g| g.contains_symbol(name))
            }
            _ => false,
        }
    }

    /// GIAC 側の型タグと副分類。
    pub fn type_tag(&self) -> (TypeTag, Subtype) {
        match self {
            Gen::Int(i) => {
                if i.to_i64().is_some() {
                    (TypeTag::Int, Subtype::None)
                } else {
                    (TypeTag::Zint, Subtype::None)
                }
            }
            Gen::Bool(_) => (TypeTag::Int, Subtype::Boolean),
            Gen::Frac(_) => (TypeTag::Frac, Subtype::None),
            Gen::Double(_) => (TypeTag::Double, Subtype::None),
            Gen::Cplx(..) => (TypeTag::Cplx, Subtype::None),
            Gen::Idnt(_) => (TypeTag::Idnt, Subtype::None),
            Gen::Str(_) => (TypeTag::String, Subtype::None),
            Gen::Vect(_, sub) => {
                if self.matrix_dims().is_some() && *sub == Subtype::List {
                    (TypeTag::Vect, Subtype::Matrix)
                } else {
                    (TypeTag::Vect, *sub)
                }
            }
            Gen::Symb(..) => (TypeTag::Symb, Subtype::None),
        }
    }
}

/// 数値を (実部, 虚部) に分解する。
pub(crate) fn re_im(g: &Gen) -> (Gen, Gen) {
    match g {
        Gen::Cplx(re, im) => ((**re).clone(), (**im).clone()),
        other => (other.clone(), Gen::zero()),
    }
}

fn float_of(g: &Gen) -> f64 {
    g.to_f64().unwrap_or(f64::NAN)
}

pub(crate) fn num_add(a: &Gen, b: &Gen) -> Gen {
    match (a, b) {
        (Gen::Cplx(..), _) | (_, Gen::Cplx(..)) => {
            let (ar, ai) = re_im(a);
            let (br, bi) = re_im(b);
            Gen::complex(num_add(&ar, &br), num_add(&ai, &bi))
        }
        (Gen::Int(x), Gen::Int(y)) => Gen::Int(x + y),
        (Gen::Double(_), _) | (_, Gen::Double(_)) => Gen::Double(float_of(a) + float_of(b)),
        _ => match (a.as_rational(), b.as_rational()) {
            (Some(x), Some(y)) => Gen::rational(x + y),
            _ => Gen::symb("+", vec![a.clone(), b.clone()]),
        },
    }
}

pub(crate) fn num_neg(a: &Gen) -> Gen {
    match a {
        Gen::Int(i) => Gen::Int(-i),
        Gen::Frac(q) => Gen::Frac(-q),
        Gen::Double(d) => Gen::Double(-d),
        Gen::Cplx(re, im) => Gen::complex(num_neg(re), num_neg(im)),
        other => Gen::symb("*", vec![Gen::minus_one(), other.clone()]),
    }
}

pub(crate) fn num_mul(a: &Gen, b: &Gen) -> Gen {
    match (a, b) {
        (Gen::Cplx(..), _) | (_, Gen::Cplx(..)) => {
            let (ar, ai) = re_im(a);
            let (br, bi) = re_im(b);
            let re = num_add(&num_mul(&ar, &br), &num_neg(&num_mul(&ai, &bi)));
            let im = num_add(&num_mul(&ar, &bi), &num_mul(&ai, &br));
            Gen::complex(re, im)
        }
        (Gen::Int(x), Gen::Int(y)) => Gen::Int(x * y),
        (Gen::Double(_), _) | (_, Gen::Double(_)) => Gen::Double(float_of(a) * float_of(b)),
        _ => match (a.as_rational(), b.as_rational()) {
            (Some(x), Some(y)) => Gen::rational(x * y),
            _ => Gen::symb("*", vec![a.clone(), b.clone()]),
        },
    }
}

/// 逆数。厳密な 0 の逆数は `infinity`。
pub(crate) fn num_inv(a: &Gen) -> Gen {
    match a {
        Gen::Int(i) if i.is_zero() => Gen::idnt("infinity"),
        Gen::Int(_) | Gen::Frac(_) => match a.as_rational() {
            Some(q) => Gen::rational(q.recip()),
            None => Gen::undef(),
        },
        Gen::Double(d) => Gen::Double(1.0 / d),
        Gen::Cplx(re, im) => {
            let norm = num_add(&num_mul(re, re), &num_mul(im, im));
            let inv_norm = num_inv(&norm);
            Gen::complex(num_mul(re, &inv_norm), num_neg(&num_mul(im, &inv_norm)))
        }
        other => Gen::symb("^", vec![other.clone(), Gen::minus_one()]),
    }
}

/// 整数冪。指数が負なら逆数を取る。
pub(crate) fn num_pow_int(base: &Gen, n: &BigInt) -> Gen {
    if n.is_negative() {
        return num_inv(&num_pow_int(base, &-n));
    }
    let Some(mut e) = n.to_u64() else {
        return Gen::symb("^", vec![base.clone(), Gen::Int(n.clone())]);
    };
    match base {
        Gen::Int(i) => match u32::try_from(e) {
            Ok(e32) => Gen::Int(num_traits::pow::Pow::pow(i, e32)),
            Err(_) => Gen::symb("^", vec![base.clone(), Gen::Int(n.clone())]),
        },
        Gen::Frac(q) => match i32::try_from(e) {
            Ok(e32) => Gen::rational(q.pow(e32)),
            Err(_) => Gen::symb("^", vec![base.clone(), Gen::Int(n.clone())]),
        },
        Gen::Double(d) => Gen::Double(d.powf(e as f64)),
        _ => {
            // 二乗して掛ける
            let mut acc = Gen::one();
            let mut sq = base.clone();
            while e > 0 {
                if e & 1 == 1 {
                    acc = num_mul(&acc, &sq);
                }
                sq = num_mul(&sq, &sq);
                e >>= 1;
            }
            acc
        }
    }
}

/// 実数同士の比較。複素数や非数値なら `None`。
pub(crate) fn num_cmp(a: &Gen, b: &Gen) -> Option<Ordering> {
    match (a.as_rational(), b.as_rational()) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ if a.is_real_number() && b.is_real_number() => a.to_f64()?.partial_cmp(&b.to_f64()?),
        _ => None,
    }
}

/// 数値の絶対値（複素数は対象外）。
pub(crate) fn num_abs(a: &Gen) -> Gen {
    if a.is_negative_real() {
        num_neg(a)
    } else {
        a.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: i64, d: i64) -> Gen {
        Gen::rational(BigRational::new(BigInt::from(n), BigInt::from(d)))
    }

    #[test]
    fn rational_constructor_normalizes_integers() {
        assert_eq!(q(4, 2), Gen::int(2));
        assert!(matches!(q(3, 4), Gen::Frac(_)));
    }

    #[test]
    fn exact_arithmetic_stays_exact() {
        assert_eq!(num_add(&q(1, 2), &q(1, 3)), q(5, 6));
        assert_eq!(num_mul(&q(2, 3), &Gen::int(3)), Gen::int(2));
        assert_eq!(num_inv(&q(3, 4)), q(4, 3));
        assert_eq!(num_pow_int(&q(1, 2), &BigInt::from(-2)), Gen::int(4));
    }

    #[test]
    fn complex_product_collapses_when_imaginary_cancels() {
        let i = Gen::imaginary_unit();
        assert_eq!(num_mul(&i, &i), Gen::int(-1));
        let one_plus_i = Gen::complex(Gen::int(1), Gen::int(1));
        let conj = Gen::complex(Gen::int(1), Gen::int(-1));
        assert_eq!(num_mul(&one_plus_i, &conj), Gen::int(2));
    }

    #[test]
    fn zero_inverse_is_infinity_and_mixed_compare_works() {
        assert!(num_inv(&Gen::zero()).is_symbol("infinity"));
        assert_eq!(num_cmp(&q(1, 2), &Gen::Double(0.75)), Some(Ordering::Less));
        assert_eq!(num_cmp(&Gen::imaginary_unit(), &Gen::one()), None);
    }

    #[test]
    fn type_tag_distinguishes_small_and_big_integers() {
        assert_eq!(Gen::int(5).type_tag().0, TypeTag::Int);
        let big = Gen::Int(BigInt::from(i64::MAX) * 10u32);
        assert_eq!(big.type_tag().0, TypeTag::Zint);
        assert_eq!(Gen::Bool(true).type_tag(), (TypeTag::Int, Subtype::Boolean));
        let m = Gen::list(vec![
            Gen::list(vec![Gen::int(1), Gen::int(2)]),
            Gen::list(vec![Gen::int(3), Gen::int(4)]),
        ]);
        assert_eq!(m.type_tag(), (TypeTag::Vect, Subtype::Matrix));
    }
}
