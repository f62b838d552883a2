// パス: src/engine/builtin/poly.rs
// 役割: 展開・一変数多項式（有理数係数）・因数分解・有理式の約分・方程式の根
// 意図: expand / factor / normal / solve が共有する多項式演算を一箇所に閉じ込める
// 関連ファイル: src/engine/builtin/commands.rs, src/engine/builtin/ops.rs
//! 多項式モジュール
//!
//! - `expand` は記号式のまま積を和へ分配する。
//! - `UPoly` は係数を次数の昇順に持つ一変数多項式。
//! - 因数分解は無平方分解と有理根の探索で一次因子を取り出す。

use std::cmp::Ordering;
use std::collections::BTreeSet;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::gen::Gen;
use super::ops::{add, add_all, approx_real, mul, neg, pow};

/// 積と正の整数冪を和へ分配する。
pub(crate) fn expand(g: Gen) -> Gen {
    match g {
        Gen::Symb(op, args) if op == "+" => add_all(args.into_iter().map(expand).collect()),
        Gen::Symb(op, args) if op == "*" => args
            .into_iter()
            .map(expand)
            .fold(Gen::one(), mul_distribute),
        Gen::Symb(op, mut args) if op == "^" && args.len() == 2 => {
            let e = args.pop().unwrap_or_else(Gen::one);
            let b = expand(args.pop().unwrap_or_else(Gen::zero));
            match e.as_i64() {
                Some(n) if (1..=64).contains(&n) && b.is_op("+") => {
                    (0..n).fold(Gen::one(), |acc, _| mul_distribute(acc, b.clone()))
                }
                Some(n) if (-64..0).contains(&n) && b.is_op("+") => {
                    let den = (0..-n).fold(Gen::one(), |acc, _| mul_distribute(acc, b.clone()));
                    pow(den, Gen::minus_one())
                }
                _ => pow(b, e),
            }
        }
        Gen::Vect(items, sub) => Gen::Vect(items.into_iter().map(expand).collect(), sub),
        other => other,
    }
}

fn terms_of(g: Gen) -> Vec<Gen> {
    match g {
        Gen::Symb(op, args) if op == "+" => args,
        other => vec![other],
    }
}

fn mul_distribute(a: Gen, b: Gen) -> Gen {
    if !a.is_op("+") && !b.is_op("+") {
        return mul(a, b);
    }
    let ta = terms_of(a);
    let tb = terms_of(b);
    let mut out = Vec::with_capacity(ta.len() * tb.len());
    for x in &ta {
        for y in &tb {
            out.push(mul(x.clone(), y.clone()));
        }
    }
    add_all(out)
}

/// 式に現れる自由変数（定数名を除く）。
pub(crate) fn free_symbols(g: &Gen) -> BTreeSet<String> {
    fn walk(g: &Gen, out: &mut BTreeSet<String>) {
        match g {
            Gen::Idnt(n) if !matches!(n.as_str(), "pi" | "e" | "infinity" | "undef") => {
                out.insert(n.clone());
            }
            Gen::Symb(_, args) | Gen::Vect(args, _) => args.iter().for_each(|a| walk(a, out)),
            _ => {}
        }
    }
    let mut out = BTreeSet::new();
    walk(g, &mut out);
    out
}

pub(crate) fn big_gcd(a: &BigInt, b: &BigInt) -> BigInt {
    let mut x = a.abs();
    let mut y = b.abs();
    while !y.is_zero() {
        let r = &x % &y;
        x = y;
        y = r;
    }
    x
}

/// 一変数多項式。`coeffs[k]` が `x^k` の係数で、末尾に 0 を残さない。
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct UPoly {
    coeffs: Vec<BigRational>,
}

impl UPoly {
    pub fn new(mut coeffs: Vec<BigRational>) -> Self {
        while coeffs.last().is_some_and(Zero::is_zero) {
            coeffs.pop();
        }
        Self { coeffs }
    }

    pub fn zero() -> Self {
        Self { coeffs: Vec::new() }
    }

    pub fn constant(q: BigRational) -> Self {
        Self::new(vec![q])
    }

    pub fn x() -> Self {
        Self::new(vec![BigRational::zero(), BigRational::one()])
    }

    pub fn coeffs(&self) -> &[BigRational] {
        &self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// 零多項式は `None`。
    pub fn degree(&self) -> Option<usize> {
        self.coeffs.len().checked_sub(1)
    }

    pub fn lead(&self) -> BigRational {
        self.coeffs.last().cloned().unwrap_or_else(BigRational::zero)
    }

    pub fn add(&self, other: &Self) -> Self {
        let n = self.coeffs.len().max(other.coeffs.len());
        let zero = BigRational::zero();
        Self::new(
            (0..n)
                .map(|i| {
                    self.coeffs.get(i).unwrap_or(&zero) + other.coeffs.get(i).unwrap_or(&zero)
                })
                .collect(),
        )
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.scale(&-BigRational::one()))
    }

    pub fn scale(&self, q: &BigRational) -> Self {
        Self::new(self.coeffs.iter().map(|c| c * q).collect())
    }

    pub fn mul(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        let mut out = vec![BigRational::zero(); self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        Self::new(out)
    }

    pub fn pow(&self, n: u32) -> Self {
        (0..n).fold(Self::constant(BigRational::one()), |acc, _| acc.mul(self))
    }

    /// 商と剰余。`d` は零でないこと。
    pub fn divrem(&self, d: &Self) -> (Self, Self) {
        let Some(dd) = d.degree() else {
            return (Self::zero(), self.clone());
        };
        let mut rem = self.coeffs.clone();
        let lead = d.lead();
        let mut quot = vec![BigRational::zero(); self.coeffs.len().saturating_sub(dd).max(1)];
        while rem.len() > dd && !rem.is_empty() {
            let k = rem.len() - 1 - dd;
            let c = rem[rem.len() - 1].clone() / &lead;
            for (i, dc) in d.coeffs.iter().enumerate() {
                rem[k + i] -= &c * dc;
            }
            quot[k] = c;
            rem.pop();
            while rem.last().is_some_and(Zero::is_zero) {
                rem.pop();
            }
        }
        (Self::new(quot), Self::new(rem))
    }

    pub fn monic(&self) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        self.scale(&self.lead().recip())
    }

    /// 最大公約多項式（モニック）。
    pub fn gcd(a: &Self, b: &Self) -> Self {
        let mut x = a.clone();
        let mut y = b.clone();
        while !y.is_zero() {
            let (_, r) = x.divrem(&y);
            x = y;
            y = r;
        }
        x.monic()
    }

    pub fn derivative(&self) -> Self {
        Self::new(
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, c)| c * BigRational::from_integer(BigInt::from(k)))
                .collect(),
        )
    }

    pub fn eval(&self, at: &BigRational) -> BigRational {
        self.coeffs
            .iter()
            .rev()
            .fold(BigRational::zero(), |acc, c| acc * at + c)
    }

    /// (内容, 原始部分)。原始部分は整数係数で最高次係数が正。
    pub fn primitive(&self) -> (BigRational, Self) {
        if self.is_zero() {
            return (BigRational::zero(), Self::zero());
        }
        let mut lcm = BigInt::one();
        for c in &self.coeffs {
            let d = c.denom();
            lcm = &lcm / big_gcd(&lcm, d) * d;
        }
        let mut g = BigInt::zero();
        for c in &self.coeffs {
            g = big_gcd(&g, &(c * BigRational::from_integer(lcm.clone())).to_integer());
        }
        let mut content = BigRational::new(g, lcm);
        if self.lead().is_negative() {
            content = -content;
        }
        (content.clone(), self.scale(&content.recip()))
    }

    /// 無平方分解（Yun）。`(因子, 重複度)` のモニック因子列を返す。
    pub fn square_free(&self) -> Vec<(Self, usize)> {
        let p = self.monic();
        if p.degree().unwrap_or(0) == 0 {
            return Vec::new();
        }
        let dp = p.derivative();
        let a = Self::gcd(&p, &dp);
        let mut b = p.divrem(&a).0;
        let mut c = dp.divrem(&a).0;
        let mut d = c.sub(&b.derivative());
        let mut out = Vec::new();
        let mut i = 1;
        while b.degree().unwrap_or(0) > 0 {
            let ai = Self::gcd(&b, &d);
            b = b.divrem(&ai).0;
            c = d.divrem(&ai).0;
            d = c.sub(&b.derivative());
            if ai.degree().unwrap_or(0) > 0 {
                out.push((ai, i));
            }
            i += 1;
        }
        out
    }

    /// 有理根の候補を試して根を列挙する（重複なし）。
    pub fn rational_roots(&self) -> Vec<BigRational> {
        let (_, prim) = self.primitive();
        let mut roots = Vec::new();
        if prim.coeffs.first().is_some_and(Zero::is_zero) {
            roots.push(BigRational::zero());
        }
        let trailing = prim.coeffs.iter().find(|c| !c.is_zero()).map(|c| c.to_integer());
        let (Some(a0), lead) = (trailing, prim.lead().to_integer()) else {
            return roots;
        };
        let (Some(nums), Some(dens)) = (divisors(&a0), divisors(&lead)) else {
            return roots;
        };
        for p in &nums {
            for q in &dens {
                for cand in [p.clone(), -p] {
                    let r = BigRational::new(cand, q.clone());
                    if !roots.contains(&r) && prim.eval(&r).is_zero() {
                        roots.push(r);
                    }
                }
            }
        }
        roots
    }
}

/// 正の約数の列挙（大きすぎる値は `None`）。
fn divisors(n: &BigInt) -> Option<Vec<BigInt>> {
    let n = n.abs().to_u64().filter(|v| *v <= 1_000_000_000_000)?;
    let mut out = Vec::new();
    let mut d = 1u64;
    while d * d <= n {
        if n % d == 0 {
            out.push(BigInt::from(d));
            if d * d != n {
                out.push(BigInt::from(n / d));
            }
        }
        d += 1;
    }
    Some(out)
}

/// 式を `var` の一変数多項式へ変換する（有理数係数でなければ `None`）。
pub(crate) fn to_upoly(g: &Gen, var: &str) -> Option<UPoly> {
    match g {
        Gen::Int(_) | Gen::Frac(_) => Some(UPoly::constant(g.as_rational()?)),
        Gen::Idnt(n) if n == var => Some(UPoly::x()),
        Gen::Symb(op, args) if op == "+" => args
            .iter()
            .try_fold(UPoly::zero(), |acc, a| Some(acc.add(&to_upoly(a, var)?))),
        Gen::Symb(op, args) if op == "*" => args.iter().try_fold(
            UPoly::constant(BigRational::one()),
            |acc, a| Some(acc.mul(&to_upoly(a, var)?)),
        ),
        Gen::Symb(op, args) if op == "^" && args.len() == 2 => {
            let n = args[1].as_i64().filter(|n| (0..=256).contains(n))?;
            Some(to_upoly(&args[0], var)?.pow(n as u32))
        }
        _ => None,
    }
}

/// 有理式を (分子, 分母) の組へ変換する。
pub(crate) fn to_ratfun(g: &Gen, var: &str) -> Option<(UPoly, UPoly)> {
    let one = || UPoly::constant(BigRational::one());
    match g {
        Gen::Symb(op, args) if op == "+" => {
            args.iter().try_fold((UPoly::zero(), one()), |(n, d), a| {
                let (an, ad) = to_ratfun(a, var)?;
                Some((n.mul(&ad).add(&an.mul(&d)), d.mul(&ad)))
            })
        }
        Gen::Symb(op, args) if op == "*" => args.iter().try_fold((one(), one()), |(n, d), a| {
            let (an, ad) = to_ratfun(a, var)?;
            Some((n.mul(&an), d.mul(&ad)))
        }),
        Gen::Symb(op, args) if op == "^" && args.len() == 2 => {
            let n = args[1].as_i64().filter(|n| (-256..=256).contains(n))?;
            let (bn, bd) = to_ratfun(&args[0], var)?;
            let e = n.unsigned_abs() as u32;
            if n >= 0 {
                Some((bn.pow(e), bd.pow(e)))
            } else {
                Some((bd.pow(e), bn.pow(e)))
            }
        }
        other => Some((to_upoly(other, var)?, one())),
    }
}

pub(crate) fn from_upoly(p: &UPoly, var: &str) -> Gen {
    let x = Gen::idnt(var);
    add_all(
        p.coeffs
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_zero())
            .map(|(k, c)| mul(Gen::rational(c.clone()), pow(x.clone(), Gen::int(k as i64))))
            .collect(),
    )
}

/// 有理式を約分した形で返す。
pub(crate) fn normal_ratfun(num: &UPoly, den: &UPoly, var: &str) -> Gen {
    if den.is_zero() {
        return Gen::undef();
    }
    let g = UPoly::gcd(num, den);
    let n = num.divrem(&g).0;
    let d = den.divrem(&g).0;
    let (dc, dp) = d.primitive();
    let n = n.scale(&dc.recip());
    if dp.degree() == Some(0) {
        return from_upoly(&n, var);
    }
    mul(from_upoly(&n, var), pow(from_upoly(&dp, var), Gen::minus_one()))
}

fn linear_factor(root: &BigRational) -> UPoly {
    // b*x - a
    UPoly::new(vec![
        BigRational::from_integer(-root.numer().clone()),
        BigRational::from_integer(root.denom().clone()),
    ])
}

fn with_multiplicity(f: Gen, m: usize) -> Gen {
    if m == 1 {
        f
    } else {
        Gen::symb("^", vec![f, Gen::int(m as i64)])
    }
}

/// 有理数体上で一次因子を取り出した因数分解。
pub(crate) fn factor_upoly(p: &UPoly, var: &str) -> Gen {
    if p.degree().unwrap_or(0) == 0 {
        return Gen::rational(p.lead());
    }
    let (content, prim) = p.primitive();
    let shift = prim.coeffs.iter().take_while(|c| c.is_zero()).count();
    let core = UPoly::new(prim.coeffs[shift..].to_vec());

    let mut linear: Vec<(BigRational, usize)> = Vec::new();
    let mut rest: Vec<(UPoly, usize)> = Vec::new();
    for (mut q, m) in core.square_free() {
        for r in q.rational_roots() {
            q = q.divrem(&linear_factor(&r)).0;
            linear.push((r, m));
        }
        if q.degree().unwrap_or(0) > 0 {
            rest.push((q.primitive().1, m));
        }
    }
    // 定数項 -a の昇順（根の降順）
    linear.sort_by(|a, b| b.0.cmp(&a.0));

    let mut product = UPoly::constant(BigRational::one());
    let mut factors: Vec<Gen> = Vec::new();
    if shift > 0 {
        factors.push(with_multiplicity(Gen::idnt(var), shift));
        product = product.mul(&UPoly::x().pow(shift as u32));
    }
    for (r, m) in &linear {
        let f = linear_factor(r);
        product = product.mul(&f.pow(*m as u32));
        factors.push(with_multiplicity(from_upoly(&f, var), *m));
    }
    for (f, m) in &rest {
        product = product.mul(&f.pow(*m as u32));
        factors.push(with_multiplicity(from_upoly(f, var), *m));
    }
    let coef = Gen::rational(content * prim.lead() / product.lead());
    if !coef.is_one() {
        factors.insert(0, coef);
    }
    if factors.len() == 1 {
        return factors.remove(0);
    }
    Gen::Symb("*".into(), factors)
}

/// 多項式の実根（有理根と二次の無理根）を昇順で返す。
pub(crate) fn real_roots(p: &UPoly) -> Vec<Gen> {
    let mut roots: Vec<Gen> = Vec::new();
    for (mut q, _) in p.square_free() {
        for r in q.rational_roots() {
            q = q.divrem(&linear_factor(&r)).0;
            roots.push(Gen::rational(r));
        }
        if q.degree() == Some(2) {
            let c = q.coeffs();
            let (c0, c1, c2) = (c[0].clone(), c[1].clone(), c[2].clone());
            let disc = &c1 * &c1 - BigRational::from_integer(BigInt::from(4)) * &c2 * &c0;
            if disc.is_negative() {
                continue;
            }
            let sqrt_disc = pow(
                Gen::rational(disc),
                Gen::rational(BigRational::new(BigInt::one(), BigInt::from(2))),
            );
            let two_a = Gen::rational(&c2 * BigRational::from_integer(BigInt::from(2)));
            let inv_two_a = pow(two_a, Gen::minus_one());
            let minus_b = Gen::rational(-c1);
            for s in [neg(sqrt_disc.clone()), sqrt_disc] {
                roots.push(mul(add(minus_b.clone(), s), inv_two_a.clone()));
            }
        }
    }
    roots.sort_by(|a, b| {
        approx_real(a)
            .partial_cmp(&approx_real(b))
            .unwrap_or(Ordering::Equal)
    });
    roots.dedup();
    roots
}
