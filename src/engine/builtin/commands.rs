// パス: src/engine/builtin/commands.rs
// 役割: 組み込みエンジンが実装するコマンドの表（名前・引数個数・関数ポインタ）と実装本体
// 意図: 文字列比較の連鎖ではなく、起動時に検証した表で関数を引けるようにする
// 関連ファイル: src/engine/builtin/eval.rs, src/engine/builtin/calculus.rs, src/engine/builtin/poly.rs
//! ビルトインコマンド表
//!
//! - `define_builtins!` で `BUILTINS` を静的に宣言し、名前索引は `Lazy` で一度だけ作る。
//! - 索引の構築時に重複名と不正な引数個数範囲を検出したら panic する（静的データの誤り）。
//! - 表にないカタログ上のコマンドは評価器が未評価のまま返す。

use std::collections::HashMap;

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use once_cell::sync::Lazy;

use super::calculus::{antiderivative, diff, is_finite_value, is_unevaluated, replace};
use super::eval::Evaluator;
use super::functions::elementary;
use super::gen::{num_cmp, re_im, Gen};
use super::ops::{
    add, add_all, approx_real, div, dot, matrix_rows, mul, mul_all, neg, pow, structurally_equal,
    sub,
};
use super::poly::{
    big_gcd, expand, factor_upoly, free_symbols, from_upoly, normal_ratfun, real_roots, to_ratfun,
    to_upoly, UPoly,
};
use crate::errors::{GiacError, GiacResult};

pub(crate) type BuiltinFn = fn(&mut Evaluator, Vec<Gen>) -> GiacResult<Gen>;

/// 受け付ける引数の個数。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
            Arity::AtLeast(lo) => n >= lo,
        }
    }

    fn describe(self) -> String {
        match self {
            Arity::Exact(k) => k.to_string(),
            Arity::Range(lo, hi) => format!("{lo}..{hi}"),
            Arity::AtLeast(lo) => format!("{lo} 以上"),
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct BuiltinSpec {
    pub name: &'static str,
    pub arity: Arity,
    pub f: BuiltinFn,
}

impl BuiltinSpec {
    pub fn check_arity(&self, n: usize) -> GiacResult<()> {
        if self.arity.accepts(n) {
            Ok(())
        } else {
            Err(GiacError::eval(
                "EVAL010",
                format!(
                    "{}: 引数の個数が不正です（{} 個、期待値 {}）",
                    self.name,
                    n,
                    self.arity.describe()
                ),
            ))
        }
    }
}

impl std::fmt::Debug for BuiltinSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinSpec")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

macro_rules! define_builtins {
    ( $( $name:literal => $arity:expr, $f:path );+ $(;)? ) => {
        pub(crate) const BUILTINS: &[BuiltinSpec] = &[
            $( BuiltinSpec { name: $name, arity: $arity, f: $f }, )+
        ];
    };
}

use Arity::{AtLeast, Exact, Range};

define_builtins! {
    // algebra
    "expand" => Exact(1), cmd_expand;
    "factor" => Range(1, 2), cmd_factor;
    "normal" => Exact(1), cmd_normal;
    "ratnormal" => Exact(1), cmd_normal;
    "simplify" => Exact(1), cmd_simplify;
    "subst" => Range(2, 3), cmd_subst;
    "numer" => Exact(1), cmd_numer;
    "denom" => Exact(1), cmd_denom;
    "eval" => Exact(1), cmd_eval;
    "evalf" => Range(1, 2), cmd_evalf;
    "approx" => Range(1, 2), cmd_evalf;
    // arithmetic
    "gcd" => AtLeast(1), cmd_gcd;
    "lcm" => AtLeast(1), cmd_lcm;
    "iquo" => Exact(2), cmd_iquo;
    "irem" => Exact(2), cmd_irem;
    "isprime" => Exact(1), cmd_isprime;
    "nextprime" => Exact(1), cmd_nextprime;
    "prevprime" => Exact(1), cmd_prevprime;
    "ifactor" => Exact(1), cmd_ifactor;
    "ifactors" => Exact(1), cmd_ifactors;
    "idivis" => Exact(1), cmd_idivis;
    "euler" => Exact(1), cmd_euler;
    "powmod" => Exact(3), cmd_powmod;
    "factorial" => Exact(1), cmd_factorial;
    "comb" => Exact(2), cmd_comb;
    "binomial" => Exact(2), cmd_comb;
    "perm" => Exact(2), cmd_perm;
    // elementary functions
    "sin" => Exact(1), fn_sin;
    "cos" => Exact(1), fn_cos;
    "tan" => Exact(1), fn_tan;
    "asin" => Exact(1), fn_asin;
    "acos" => Exact(1), fn_acos;
    "atan" => Exact(1), fn_atan;
    "exp" => Exact(1), fn_exp;
    "ln" => Exact(1), fn_ln;
    "log" => Exact(1), fn_ln;
    "sqrt" => Exact(1), fn_sqrt;
    "abs" => Exact(1), fn_abs;
    "sign" => Exact(1), fn_sign;
    "floor" => Exact(1), fn_floor;
    "ceil" => Exact(1), fn_ceil;
    "round" => Exact(1), fn_round;
    // complex
    "re" => Exact(1), cmd_re;
    "im" => Exact(1), cmd_im;
    "conj" => Exact(1), cmd_conj;
    "arg" => Exact(1), cmd_arg;
    // calculus
    "diff" => Range(1, 3), cmd_diff;
    "integrate" => Range(1, 4), cmd_integrate;
    "int" => Range(1, 4), cmd_integrate;
    "limit" => Exact(3), cmd_limit;
    "sum" => AtLeast(1), cmd_sum;
    "product" => AtLeast(1), cmd_product;
    // solving
    "solve" => Range(1, 2), cmd_solve;
    // polynomials
    "degree" => Range(1, 2), cmd_degree;
    "lcoeff" => Range(1, 2), cmd_lcoeff;
    "symb2poly" => Range(1, 2), cmd_symb2poly;
    "poly2symb" => Range(1, 2), cmd_poly2symb;
    "quo" => Range(2, 3), cmd_quo;
    "rem" => Range(2, 3), cmd_rem;
    // lists
    "size" => Exact(1), cmd_size;
    "length" => Exact(1), cmd_size;
    "nops" => Exact(1), cmd_size;
    "concat" => AtLeast(2), cmd_concat;
    "append" => Exact(2), cmd_append;
    "revlist" => Exact(1), cmd_revlist;
    "sort" => Exact(1), cmd_sort;
    "head" => Exact(1), cmd_head;
    "tail" => Exact(1), cmd_tail;
    "seq" => Range(2, 5), cmd_seq;
    "range" => Range(1, 3), cmd_range;
    "max" => AtLeast(1), cmd_max;
    "min" => AtLeast(1), cmd_min;
    // statistics
    "mean" => Exact(1), cmd_mean;
    "median" => Exact(1), cmd_median;
    "variance" => Exact(1), cmd_variance;
    "stddev" => Exact(1), cmd_stddev;
    // linear algebra
    "det" => Exact(1), cmd_det;
    "tran" => Exact(1), cmd_transpose;
    "transpose" => Exact(1), cmd_transpose;
    "inv" => Exact(1), cmd_inv;
    "trace" => Exact(1), cmd_trace;
    "idn" => Exact(1), cmd_identity;
    "identity" => Exact(1), cmd_identity;
    "dot" => Exact(2), cmd_dot;
    "cross" => Exact(2), cmd_cross;
    "matrix" => Range(2, 3), cmd_matrix;
    // other
    "type" => Exact(1), cmd_type;
    "string" => Exact(1), cmd_string;
}

static BUILTINS_BY_NAME: Lazy<HashMap<&'static str, &'static BuiltinSpec>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(BUILTINS.len());
    for spec in BUILTINS {
        if let Arity::Range(lo, hi) = spec.arity {
            assert!(lo <= hi, "builtin `{}` の引数範囲が逆転しています", spec.name);
        }
        let previous = map.insert(spec.name, spec);
        assert!(previous.is_none(), "builtin `{}` が重複しています", spec.name);
    }
    map
});

pub(crate) fn lookup(name: &str) -> Option<&'static BuiltinSpec> {
    BUILTINS_BY_NAME.get(name).copied()
}

// ---------------------------------------------------------------------------
// 引数ヘルパ

fn first(mut args: Vec<Gen>) -> Gen {
    if args.is_empty() {
        Gen::zero()
    } else {
        args.swap_remove(0)
    }
}

fn bad_arg(cmd: &str, what: &str) -> GiacError {
    GiacError::eval("EVAL020", format!("{cmd}: {what}"))
}

fn int_arg<'a>(cmd: &str, g: &'a Gen) -> GiacResult<&'a BigInt> {
    g.as_bigint().ok_or_else(|| bad_arg(cmd, "整数の引数が必要です"))
}

fn small_arg(cmd: &str, g: &Gen) -> GiacResult<u64> {
    int_arg(cmd, g)?
        .to_u64()
        .filter(|n| *n <= 100_000)
        .ok_or_else(|| bad_arg(cmd, "0 以上 100000 以下の整数が必要です"))
}

fn var_arg(cmd: &str, g: &Gen) -> GiacResult<String> {
    match g {
        Gen::Idnt(n) => Ok(n.clone()),
        _ => Err(bad_arg(cmd, "変数名（識別子）が必要です")),
    }
}

/// 省略された変数引数を式の唯一の自由変数（なければ `x`）で補う。
fn main_var(g: &Gen) -> String {
    free_symbols(g)
        .into_iter()
        .next()
        .unwrap_or_else(|| "x".to_string())
}

fn list_items(cmd: &str, g: Gen) -> GiacResult<Vec<Gen>> {
    match g {
        Gen::Vect(items, _) => Ok(items),
        _ => Err(bad_arg(cmd, "リストが必要です")),
    }
}

/// 引数が 1 つのリストならその要素、そうでなければ引数列そのもの。
fn spread(args: Vec<Gen>) -> Vec<Gen> {
    match <[Gen; 1]>::try_from(args) {
        Ok([Gen::Vect(items, _)]) => items,
        Ok([other]) => vec![other],
        Err(args) => args,
    }
}

fn map_list(g: Gen, f: &dyn Fn(Gen) -> Gen) -> Gen {
    match g {
        Gen::Vect(items, sub) => Gen::Vect(items.into_iter().map(|i| map_list(i, f)).collect(), sub),
        other => f(other),
    }
}

// ---------------------------------------------------------------------------
// algebra

fn cmd_expand(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    Ok(expand(first(args)))
}

fn factor_gen(g: Gen, var: Option<&str>) -> Gen {
    match &g {
        Gen::Int(n) => return ifactor(n),
        Gen::Frac(q) => {
            let num = ifactor(q.numer());
            let den = ifactor(q.denom());
            return Gen::symb("*", vec![num, Gen::symb("^", vec![den, Gen::minus_one()])]);
        }
        Gen::Vect(..) => return map_list(g, &|e| factor_gen(e, var)),
        _ => {}
    }
    let vars = free_symbols(&g);
    let var = match var {
        Some(v) => v.to_string(),
        None if vars.len() == 1 => main_var(&g),
        None => return g,
    };
    if let Some(p) = to_upoly(&g, &var) {
        return factor_upoly(&p, &var);
    }
    match to_ratfun(&g, &var) {
        Some((n, d)) if !d.is_zero() => {
            let common = UPoly::gcd(&n, &d);
            let n = n.divrem(&common).0;
            let d = d.divrem(&common).0;
            let num = factor_upoly(&n, &var);
            let den = factor_upoly(&d, &var);
            if den.is_one() {
                num
            } else {
                Gen::symb("*", vec![num, Gen::symb("^", vec![den, Gen::minus_one()])])
            }
        }
        _ => g,
    }
}

fn cmd_factor(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let var = match args.get(1) {
        Some(v) => Some(var_arg("factor", v)?),
        None => None,
    };
    Ok(factor_gen(first(args), var.as_deref()))
}

fn normal(g: Gen) -> Gen {
    match g {
        Gen::Vect(..) => map_list(g, &normal),
        g => {
            let vars = free_symbols(&g);
            if vars.len() == 1 {
                let var = main_var(&g);
                if let Some((n, d)) = to_ratfun(&g, &var) {
                    return normal_ratfun(&n, &d, &var);
                }
            }
            expand(g)
        }
    }
}

fn cmd_normal(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    Ok(normal(first(args)))
}

/// `c*sin(u)^2 + c*cos(u)^2` を `c` へまとめる。
fn pythagorean(g: Gen) -> Gen {
    let Gen::Symb(op, terms) = g else {
        return g;
    };
    if op != "+" {
        return Gen::Symb(op, terms);
    }
    fn split(t: &Gen, f: &str) -> Option<(Gen, Gen)> {
        let (coef, rest) = match t {
            Gen::Symb(op, fs) if op == "*" && fs.len() == 2 && fs[0].is_number() => {
                (fs[0].clone(), &fs[1])
            }
            other => (Gen::one(), other),
        };
        match rest {
            Gen::Symb(op, a) if op == "^" && a.len() == 2 && a[1] == Gen::int(2) => match &a[0] {
                Gen::Symb(name, u) if name == f && u.len() == 1 => Some((coef, u[0].clone())),
                _ => None,
            },
            _ => None,
        }
    }
    let mut terms = terms;
    let mut i = 0;
    while i < terms.len() {
        if let Some((c, u)) = split(&terms[i], "sin") {
            let partner = terms
                .iter()
                .position(|t| split(t, "cos").is_some_and(|(c2, u2)| c2 == c && u2 == u));
            if let Some(j) = partner {
                let (hi, lo) = if i > j { (i, j) } else { (j, i) };
                terms.remove(hi);
                terms.remove(lo);
                terms.push(c);
                i = 0;
                continue;
            }
        }
        i += 1;
    }
    add_all(terms)
}

fn cmd_simplify(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let g = first(args);
    Ok(normal(pythagorean(normal(g))))
}

fn substitute(ev: &mut Evaluator, g: Gen, rules: Vec<(String, Gen)>) -> GiacResult<Gen> {
    let mut out = g;
    for (var, value) in rules {
        out = replace(&out, &var, &value);
    }
    ev.eval(out)
}

fn equation_rule(cmd: &str, g: Gen) -> GiacResult<(String, Gen)> {
    match g {
        Gen::Symb(op, mut a) if op == "=" && a.len() == 2 => {
            let value = a.remove(1);
            Ok((var_arg(cmd, &a[0])?, value))
        }
        _ => Err(bad_arg(cmd, "`var=value` 形式の等式が必要です")),
    }
}

fn cmd_subst(ev: &mut Evaluator, mut args: Vec<Gen>) -> GiacResult<Gen> {
    let rules = if args.len() == 3 {
        let value = args.remove(2);
        vec![(var_arg("subst", &args[1])?, value)]
    } else {
        match args.remove(1) {
            Gen::Vect(eqs, _) => eqs
                .into_iter()
                .map(|e| equation_rule("subst", e))
                .collect::<GiacResult<Vec<_>>>()?,
            eq => vec![equation_rule("subst", eq)?],
        }
    };
    substitute(ev, first(args), rules)
}

/// 正規形を分子・分母へ分ける。
fn split_fraction(g: &Gen) -> (Gen, Gen) {
    match g {
        Gen::Frac(q) => (Gen::Int(q.numer().clone()), Gen::Int(q.denom().clone())),
        Gen::Symb(op, a) if op == "^" && a.len() == 2 && a[1].is_negative_real() => {
            (Gen::one(), pow(a[0].clone(), neg(a[1].clone())))
        }
        Gen::Symb(op, fs) if op == "*" => {
            let mut num = Vec::new();
            let mut den = Vec::new();
            for f in fs {
                let (n, d) = split_fraction(f);
                num.push(n);
                den.push(d);
            }
            (mul_all(num), mul_all(den))
        }
        other => (other.clone(), Gen::one()),
    }
}

fn cmd_numer(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    Ok(split_fraction(&normal(first(args))).0)
}

fn cmd_denom(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    Ok(split_fraction(&normal(first(args))).1)
}

fn cmd_eval(ev: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    ev.eval(first(args))
}

/// 厳密な数と定数を浮動小数へ置き換える。
fn to_floats(g: Gen) -> Gen {
    match g {
        Gen::Int(_) | Gen::Frac(_) => Gen::Double(g.to_f64().unwrap_or(f64::NAN)),
        Gen::Idnt(ref n) if n == "pi" => Gen::Double(std::f64::consts::PI),
        Gen::Idnt(ref n) if n == "e" => Gen::Double(std::f64::consts::E),
        Gen::Cplx(re, im) => Gen::complex(to_floats(*re), to_floats(*im)),
        Gen::Vect(items, sub) => Gen::Vect(items.into_iter().map(to_floats).collect(), sub),
        Gen::Symb(op, args) if op == "^" && args.len() == 2 => {
            // 指数は整数のまま残して実数の負底を許す
            let mut it = args.into_iter();
            let b = it.next().map(to_floats).unwrap_or_else(Gen::zero);
            let e = it.next().unwrap_or_else(Gen::one);
            let e = if matches!(e, Gen::Int(_)) { e } else { to_floats(e) };
            Gen::Symb(op, vec![b, e])
        }
        Gen::Symb(op, args) => Gen::Symb(op, args.into_iter().map(to_floats).collect()),
        other => other,
    }
}

fn cmd_evalf(ev: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    ev.eval(to_floats(first(args)))
}

// ---------------------------------------------------------------------------
// arithmetic

fn cmd_gcd(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let args = spread(args);
    if args.iter().all(|a| matches!(a, Gen::Int(_))) {
        let g = args
            .iter()
            .filter_map(Gen::as_bigint)
            .fold(BigInt::zero(), |acc, n| big_gcd(&acc, n));
        return Ok(Gen::Int(g));
    }
    let var = args
        .iter()
        .flat_map(free_symbols)
        .next()
        .unwrap_or_else(|| "x".into());
    let polys: Option<Vec<UPoly>> = args.iter().map(|a| to_upoly(a, &var)).collect();
    let Some(polys) = polys else {
        return Ok(Gen::symb("gcd", args));
    };
    let g = polys
        .iter()
        .fold(UPoly::zero(), |acc, p| UPoly::gcd(&acc, p));
    Ok(from_upoly(&g.primitive().1, &var))
}

fn cmd_lcm(ev: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let args = spread(args);
    if args.iter().all(|a| matches!(a, Gen::Int(_))) {
        let l = args.iter().filter_map(Gen::as_bigint).fold(BigInt::one(), |acc, n| {
            if n.is_zero() {
                BigInt::zero()
            } else {
                (&acc / big_gcd(&acc, n) * n).abs()
            }
        });
        return Ok(Gen::Int(l));
    }
    let mut acc = Gen::one();
    for a in args {
        let g = cmd_gcd(ev, vec![acc.clone(), a.clone()])?;
        acc = normal(div(mul(acc, a), g));
    }
    Ok(acc)
}

/// ユークリッド除算（剰余は 0 以上 |b| 未満）。
fn euclid(cmd: &str, a: &BigInt, b: &BigInt) -> GiacResult<(BigInt, BigInt)> {
    if b.is_zero() {
        return Err(GiacError::eval("EVAL040", format!("{cmd}: 0 による除算")));
    }
    let mut r = a % b;
    if r.is_negative() {
        r += b.abs();
    }
    Ok(((a - &r) / b, r))
}

fn cmd_iquo(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let (q, _) = euclid("iquo", int_arg("iquo", &args[0])?, int_arg("iquo", &args[1])?)?;
    Ok(Gen::Int(q))
}

fn cmd_irem(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let (_, r) = euclid("irem", int_arg("irem", &args[0])?, int_arg("irem", &args[1])?)?;
    Ok(Gen::Int(r))
}

/// 決定的 Miller-Rabin（3.3e24 未満で正確）。
pub(crate) fn is_prime(n: &BigInt) -> bool {
    let two = BigInt::from(2);
    if *n < two {
        return false;
    }
    const BASES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    for p in BASES {
        let p = BigInt::from(p);
        if *n == p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }
    let n1 = n - 1u32;
    let mut d = n1.clone();
    let mut s = 0u32;
    while (&d % 2u32).is_zero() {
        d /= 2u32;
        s += 1;
    }
    'witness: for a in BASES {
        let mut x = BigInt::from(a).modpow(&d, n);
        if x.is_one() || x == n1 {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

fn cmd_isprime(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    Ok(Gen::Bool(is_prime(int_arg("isprime", &args[0])?)))
}

fn cmd_nextprime(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let mut n = (int_arg("nextprime", &args[0])? + 1u32).max(BigInt::from(2));
    while !is_prime(&n) {
        n += 1u32;
    }
    Ok(Gen::Int(n))
}

fn cmd_prevprime(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let mut n = int_arg("prevprime", &args[0])? - 1u32;
    while n >= BigInt::from(2) {
        if is_prime(&n) {
            return Ok(Gen::Int(n));
        }
        n -= 1u32;
    }
    Err(bad_arg("prevprime", "2 より大きい整数が必要です"))
}

/// 試し割りによる素因数分解 `(素数, 指数)` の列。残りが合成数なら 1 つの因子として残す。
fn prime_factors(n: &BigInt) -> Vec<(BigInt, u32)> {
    let mut out = Vec::new();
    let mut m = n.abs();
    let mut p = BigInt::from(2);
    let limit = BigInt::from(1_000_000);
    while &p * &p <= m && p <= limit {
        let mut e = 0;
        while (&m % &p).is_zero() {
            m /= &p;
            e += 1;
        }
        if e > 0 {
            out.push((p.clone(), e));
        }
        p += if p == BigInt::from(2) { 1u32 } else { 2u32 };
    }
    if m > BigInt::one() {
        out.push((m, 1));
    }
    out
}

/// 整数の素因数分解を `2^2*3` の形で組み立てる（数値として畳み込まない）。
fn ifactor(n: &BigInt) -> Gen {
    let factors = prime_factors(n);
    if factors.is_empty() {
        return Gen::Int(n.clone());
    }
    let mut fs: Vec<Gen> = Vec::new();
    if n.is_negative() {
        fs.push(Gen::minus_one());
    }
    for (p, e) in factors {
        if e == 1 {
            fs.push(Gen::Int(p));
        } else {
            fs.push(Gen::symb("^", vec![Gen::Int(p), Gen::int(e)]));
        }
    }
    if fs.len() == 1 {
        return fs.remove(0);
    }
    Gen::Symb("*".into(), fs)
}

fn cmd_ifactor(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    Ok(ifactor(int_arg("ifactor", &args[0])?))
}

fn cmd_ifactors(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let n = int_arg("ifactors", &args[0])?;
    let mut out = Vec::new();
    for (p, e) in prime_factors(n) {
        out.push(Gen::Int(p));
        out.push(Gen::int(e));
    }
    Ok(Gen::list(out))
}

fn cmd_idivis(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let n = int_arg("idivis", &args[0])?.abs();
    let mut divs = vec![BigInt::one()];
    for (p, e) in prime_factors(&n) {
        let mut next = Vec::with_capacity(divs.len() * (e as usize + 1));
        for d in &divs {
            let mut pk = BigInt::one();
            for _ in 0..=e {
                next.push(d * &pk);
                pk *= &p;
            }
        }
        divs = next;
    }
    divs.sort();
    Ok(Gen::list(divs.into_iter().map(Gen::Int).collect()))
}

fn cmd_euler(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let n = int_arg("euler", &args[0])?;
    let mut phi = n.abs();
    for (p, _) in prime_factors(n) {
        phi = &phi / &p * (&p - 1u32);
    }
    Ok(Gen::Int(phi))
}

fn cmd_powmod(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let a = int_arg("powmod", &args[0])?;
    let e = int_arg("powmod", &args[1])?;
    let m = int_arg("powmod", &args[2])?;
    if m.is_zero() || e.is_negative() {
        return Err(bad_arg("powmod", "法は 0 以外、指数は 0 以上が必要です"));
    }
    let r = a.modpow(e, &m.abs());
    let r = if r.is_negative() { r + m.abs() } else { r };
    Ok(Gen::Int(r))
}

fn cmd_factorial(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let n = small_arg("factorial", &args[0])?;
    Ok(Gen::Int((1..=n).fold(BigInt::one(), |acc, k| acc * k)))
}

fn falling(n: &BigInt, k: u64) -> BigInt {
    (0..k).fold(BigInt::one(), |acc, i| acc * (n - i))
}

fn cmd_comb(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let n = int_arg("comb", &args[0])?;
    let k = small_arg("comb", &args[1])?;
    let k_fact = (1..=k).fold(BigInt::one(), |acc, i| acc * i);
    Ok(Gen::Int(falling(n, k) / k_fact))
}

fn cmd_perm(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let n = int_arg("perm", &args[0])?;
    let k = small_arg("perm", &args[1])?;
    Ok(Gen::Int(falling(n, k)))
}

// ---------------------------------------------------------------------------
// elementary functions

macro_rules! elementary_fns {
    ( $( $fname:ident => $name:literal ),+ $(,)? ) => {
        $(
            fn $fname(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
                Ok(map_list(first(args), &|x| elementary($name, x)))
            }
        )+
    };
}

elementary_fns! {
    fn_sin => "sin",
    fn_cos => "cos",
    fn_tan => "tan",
    fn_asin => "asin",
    fn_acos => "acos",
    fn_atan => "atan",
    fn_exp => "exp",
    fn_ln => "ln",
    fn_sqrt => "sqrt",
    fn_abs => "abs",
    fn_sign => "sign",
    fn_floor => "floor",
    fn_ceil => "ceil",
    fn_round => "round",
}

// ---------------------------------------------------------------------------
// complex

fn real_imag(g: &Gen) -> Option<(Gen, Gen)> {
    match g {
        _ if g.is_number() => Some(re_im(g)),
        Gen::Symb(op, terms) if op == "+" => {
            let parts: Option<Vec<(Gen, Gen)>> = terms.iter().map(real_imag).collect();
            let (re, im): (Vec<Gen>, Vec<Gen>) = parts?.into_iter().unzip();
            Some((add_all(re), add_all(im)))
        }
        Gen::Symb(op, fs) if op == "*" && fs.first().is_some_and(Gen::is_number) => {
            let (cr, ci) = re_im(&fs[0]);
            let rest = mul_all(fs[1..].to_vec());
            let (rr, ri) = real_imag(&rest)?;
            Some((
                sub(mul(cr.clone(), rr.clone()), mul(ci.clone(), ri.clone())),
                add(mul(cr, ri), mul(ci, rr)),
            ))
        }
        // 変数は実数とみなす
        Gen::Idnt(_) => Some((g.clone(), Gen::zero())),
        _ => None,
    }
}

fn cmd_re(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let g = first(args);
    Ok(real_imag(&g).map(|(r, _)| r).unwrap_or_else(|| Gen::symb("re", vec![g])))
}

fn cmd_im(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let g = first(args);
    Ok(real_imag(&g).map(|(_, i)| i).unwrap_or_else(|| Gen::symb("im", vec![g])))
}

fn cmd_conj(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let g = first(args);
    Ok(match real_imag(&g) {
        Some((r, i)) => sub(r, mul(i, Gen::imaginary_unit())),
        None => Gen::symb("conj", vec![g]),
    })
}

fn cmd_arg(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let g = first(args);
    let Some((re, im)) = real_imag(&g) else {
        return Ok(Gen::symb("arg", vec![g]));
    };
    if matches!(re, Gen::Double(_)) || matches!(im, Gen::Double(_)) {
        if let (Some(x), Some(y)) = (re.to_f64(), im.to_f64()) {
            return Ok(Gen::Double(y.atan2(x)));
        }
    }
    if im.is_zero() {
        return Ok(match approx_real(&re) {
            Some(v) if v > 0.0 => Gen::zero(),
            Some(v) if v < 0.0 => Gen::idnt("pi"),
            _ => Gen::symb("arg", vec![g]),
        });
    }
    if re.is_zero() {
        let half_pi = div(Gen::idnt("pi"), Gen::int(2));
        return Ok(match approx_real(&im) {
            Some(v) if v > 0.0 => half_pi,
            Some(_) => neg(half_pi),
            None => Gen::symb("arg", vec![g]),
        });
    }
    Ok(Gen::symb("arg", vec![g]))
}

// ---------------------------------------------------------------------------
// calculus

fn cmd_diff(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let var = match args.get(1) {
        Some(v) => var_arg("diff", v)?,
        None => main_var(&args[0]),
    };
    let times = match args.get(2) {
        Some(n) => small_arg("diff", n)?,
        None => 1,
    };
    let mut g = first(args);
    for _ in 0..times {
        g = diff(&g, &var);
    }
    Ok(g)
}

fn cmd_integrate(ev: &mut Evaluator, mut args: Vec<Gen>) -> GiacResult<Gen> {
    let var = match args.get(1) {
        Some(v) => var_arg("integrate", v)?,
        None => main_var(&args[0]),
    };
    let g = args[0].clone();
    let Some(prim) = antiderivative(&g, &var) else {
        return Ok(Gen::Symb("integrate".into(), args));
    };
    if args.len() < 4 {
        return Ok(prim);
    }
    let b = args.remove(3);
    let a = args.remove(2);
    let upper = substitute(ev, prim.clone(), vec![(var.clone(), b)])?;
    let lower = substitute(ev, prim, vec![(var, a)])?;
    Ok(sub(upper, lower))
}

fn cmd_limit(ev: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let var = var_arg("limit", &args[1])?;
    let at = args[2].clone();
    let g = args[0].clone();
    // 有理式は先に約分して 0/0 を避ける
    let target = match to_ratfun(&g, &var) {
        Some((n, d)) if free_symbols(&g).len() == 1 && !d.is_zero() => normal_ratfun(&n, &d, &var),
        _ => g.clone(),
    };
    let den = substitute(ev, split_fraction(&target).1, vec![(var.clone(), at.clone())])?;
    if den.is_zero() {
        return Ok(Gen::symb("limit", vec![g, Gen::idnt(var), at]));
    }
    let value = substitute(ev, target, vec![(var.clone(), at.clone())])?;
    if is_finite_value(&value) && !is_unevaluated(&value, "diff") {
        return Ok(value);
    }
    Ok(Gen::symb("limit", vec![g, Gen::idnt(var), at]))
}

/// `sum(expr, var, a, b)` は有限和、`sum(list)` は要素の和。
fn cmd_sum(ev: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    fold_over(ev, args, "sum", add_all)
}

fn cmd_product(ev: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    fold_over(ev, args, "product", mul_all)
}

fn fold_over(
    ev: &mut Evaluator,
    args: Vec<Gen>,
    cmd: &str,
    combine: fn(Vec<Gen>) -> Gen,
) -> GiacResult<Gen> {
    if args.len() < 4 {
        return Ok(combine(spread(args)));
    }
    let terms = sequence_values(ev, cmd, &args)?;
    Ok(combine(terms))
}

fn sequence_values(ev: &mut Evaluator, cmd: &str, args: &[Gen]) -> GiacResult<Vec<Gen>> {
    let var = var_arg(cmd, &args[1])?;
    let lo = int_arg(cmd, &args[2])?.clone();
    let hi = int_arg(cmd, &args[3])?.clone();
    let step = match args.get(4) {
        Some(s) => int_arg(cmd, s)?.clone(),
        None => BigInt::one(),
    };
    if !step.is_positive() || (&hi - &lo) / &step > BigInt::from(100_000) {
        return Err(bad_arg(cmd, "範囲が不正です"));
    }
    let mut out = Vec::new();
    let mut k = lo;
    while k <= hi {
        out.push(substitute(ev, args[0].clone(), vec![(var.clone(), Gen::Int(k.clone()))])?);
        k += &step;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// solving

fn cmd_solve(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let eq = args[0].clone();
    let expr = match eq {
        Gen::Symb(op, mut a) if op == "=" && a.len() == 2 => {
            let r = a.remove(1);
            sub(a.remove(0), r)
        }
        other => other,
    };
    let var = match args.get(1) {
        Some(v) => var_arg("solve", v)?,
        None => main_var(&expr),
    };
    let Some((num, _)) = to_ratfun(&expr, &var) else {
        return Ok(Gen::Symb("solve".into(), args));
    };
    if num.is_zero() {
        return Ok(Gen::list(vec![Gen::idnt(var)]));
    }
    Ok(Gen::list(real_roots(&num)))
}

// ---------------------------------------------------------------------------
// polynomials

fn poly_arg(cmd: &str, args: &[Gen]) -> GiacResult<(UPoly, String)> {
    let var = match args.get(1) {
        Some(v) => var_arg(cmd, v)?,
        None => main_var(&args[0]),
    };
    let p = to_upoly(&args[0], &var).ok_or_else(|| bad_arg(cmd, "多項式が必要です"))?;
    Ok((p, var))
}

fn cmd_degree(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let (p, _) = poly_arg("degree", &args)?;
    Ok(Gen::int(p.degree().unwrap_or(0) as i64))
}

fn cmd_lcoeff(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let (p, _) = poly_arg("lcoeff", &args)?;
    Ok(Gen::rational(p.lead()))
}

fn cmd_symb2poly(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let (p, _) = poly_arg("symb2poly", &args)?;
    Ok(Gen::list(
        p.coeffs().iter().rev().cloned().map(Gen::rational).collect(),
    ))
}

fn cmd_poly2symb(_: &mut Evaluator, mut args: Vec<Gen>) -> GiacResult<Gen> {
    let var = match args.get(1) {
        Some(v) => var_arg("poly2symb", v)?,
        None => "x".to_string(),
    };
    let coeffs = list_items("poly2symb", args.swap_remove(0))?;
    let x = Gen::idnt(var);
    let n = coeffs.len();
    let terms = coeffs
        .into_iter()
        .enumerate()
        .map(|(i, c)| mul(c, pow(x.clone(), Gen::int((n - 1 - i) as i64))))
        .collect();
    Ok(add_all(terms))
}

fn divide(cmd: &str, args: &[Gen]) -> GiacResult<(UPoly, UPoly, String)> {
    let var = match args.get(2) {
        Some(v) => var_arg(cmd, v)?,
        None => main_var(&add(args[0].clone(), args[1].clone())),
    };
    let a = to_upoly(&args[0], &var).ok_or_else(|| bad_arg(cmd, "多項式が必要です"))?;
    let b = to_upoly(&args[1], &var).ok_or_else(|| bad_arg(cmd, "多項式が必要です"))?;
    if b.is_zero() {
        return Err(GiacError::eval("EVAL040", format!("{cmd}: 0 による除算")));
    }
    let (q, r) = a.divrem(&b);
    Ok((q, r, var))
}

fn cmd_quo(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let (q, _, var) = divide("quo", &args)?;
    Ok(from_upoly(&q, &var))
}

fn cmd_rem(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let (_, r, var) = divide("rem", &args)?;
    Ok(from_upoly(&r, &var))
}

// ---------------------------------------------------------------------------
// lists

fn cmd_size(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    Ok(match first(args) {
        Gen::Vect(items, _) => Gen::int(items.len() as i64),
        Gen::Str(s) => Gen::int(s.chars().count() as i64),
        Gen::Symb(_, a) => Gen::int(a.len() as i64),
        _ => Gen::one(),
    })
}

fn cmd_concat(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let mut out = Vec::new();
    for a in args {
        match a {
            Gen::Vect(items, _) => out.extend(items),
            other => out.push(other),
        }
    }
    Ok(Gen::list(out))
}

fn cmd_append(_: &mut Evaluator, mut args: Vec<Gen>) -> GiacResult<Gen> {
    let item = args.remove(1);
    let mut items = list_items("append", args.remove(0))?;
    items.push(item);
    Ok(Gen::list(items))
}

fn cmd_revlist(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let mut items = list_items("revlist", first(args))?;
    items.reverse();
    Ok(Gen::list(items))
}

fn cmd_sort(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let mut items = list_items("sort", first(args))?;
    items.sort_by(|a, b| match (approx_real(a), approx_real(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => super::printer::print(a).cmp(&super::printer::print(b)),
    });
    Ok(Gen::list(items))
}

fn cmd_head(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let items = list_items("head", first(args))?;
    items
        .into_iter()
        .next()
        .ok_or_else(|| bad_arg("head", "空のリストです"))
}

fn cmd_tail(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let items = list_items("tail", first(args))?;
    Ok(Gen::list(items.into_iter().skip(1).collect()))
}

fn cmd_seq(ev: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    if args.len() < 4 {
        // seq(expr, n) は expr の n 回の繰り返し
        let n = small_arg("seq", &args[1])?;
        return Ok(Gen::list(vec![args[0].clone(); n as usize]));
    }
    Ok(Gen::list(sequence_values(ev, "seq", &args)?))
}

fn cmd_range(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let ints: Vec<i64> = args
        .iter()
        .map(|a| a.as_i64().ok_or_else(|| bad_arg("range", "整数の引数が必要です")))
        .collect::<GiacResult<_>>()?;
    let (lo, hi, step) = match ints.as_slice() {
        [n] => (0, *n, 1),
        [a, b] => (*a, *b, 1),
        [a, b, s] => (*a, *b, *s),
        _ => return Err(bad_arg("range", "引数が不正です")),
    };
    if step == 0 || (hi - lo) / step > 100_000 {
        return Err(bad_arg("range", "範囲が不正です"));
    }
    let mut out = Vec::new();
    let mut k = lo;
    while (step > 0 && k < hi) || (step < 0 && k > hi) {
        out.push(Gen::int(k));
        k += step;
    }
    Ok(Gen::list(out))
}

fn extremum(cmd: &str, args: Vec<Gen>, want: std::cmp::Ordering) -> GiacResult<Gen> {
    let items = spread(args);
    let mut best: Option<(Gen, f64)> = None;
    for item in items {
        let Some(v) = approx_real(&item) else {
            return Ok(Gen::Symb(cmd.into(), vec![item]));
        };
        let replace = match &best {
            None => true,
            Some((b, bv)) => match num_cmp(&item, b) {
                Some(o) => o == want,
                None => v.partial_cmp(bv) == Some(want),
            },
        };
        if replace {
            best = Some((item, v));
        }
    }
    best.map(|(g, _)| g).ok_or_else(|| bad_arg(cmd, "空のリストです"))
}

fn cmd_max(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    extremum("max", args, std::cmp::Ordering::Greater)
}

fn cmd_min(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    extremum("min", args, std::cmp::Ordering::Less)
}

// ---------------------------------------------------------------------------
// statistics

fn stats_items(cmd: &str, g: Gen) -> GiacResult<Vec<Gen>> {
    let items = list_items(cmd, g)?;
    if items.is_empty() {
        return Err(bad_arg(cmd, "空のリストです"));
    }
    Ok(items)
}

fn mean_of(items: &[Gen]) -> Gen {
    div(add_all(items.to_vec()), Gen::int(items.len() as i64))
}

fn cmd_mean(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    Ok(mean_of(&stats_items("mean", first(args))?))
}

fn cmd_median(ev: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let items = stats_items("median", first(args))?;
    let sorted = list_items("median", cmd_sort(ev, vec![Gen::list(items)])?)?;
    let n = sorted.len();
    if n % 2 == 1 {
        Ok(sorted[n / 2].clone())
    } else {
        Ok(mean_of(&sorted[n / 2 - 1..=n / 2]))
    }
}

/// 母分散。
fn variance_of(items: &[Gen]) -> Gen {
    let m = mean_of(items);
    let squares: Vec<Gen> = items
        .iter()
        .map(|x| {
            let d = sub(x.clone(), m.clone());
            expand(mul(d.clone(), d))
        })
        .collect();
    div(add_all(squares), Gen::int(items.len() as i64))
}

fn cmd_variance(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    Ok(variance_of(&stats_items("variance", first(args))?))
}

fn cmd_stddev(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let v = variance_of(&stats_items("stddev", first(args))?);
    Ok(elementary("sqrt", v))
}

// ---------------------------------------------------------------------------
// linear algebra

fn matrix_arg(cmd: &str, g: Gen) -> GiacResult<Vec<Vec<Gen>>> {
    if g.matrix_dims().is_none() {
        return Err(bad_arg(cmd, "行列が必要です"));
    }
    Ok(matrix_rows(g))
}

fn square_arg(cmd: &str, g: Gen) -> GiacResult<Vec<Vec<Gen>>> {
    let rows = matrix_arg(cmd, g)?;
    if rows.iter().any(|r| r.len() != rows.len()) {
        return Err(bad_arg(cmd, "正方行列が必要です"));
    }
    Ok(rows)
}

fn from_rows(rows: Vec<Vec<Gen>>) -> Gen {
    Gen::list(rows.into_iter().map(Gen::list).collect())
}

fn minor(rows: &[Vec<Gen>], skip_row: usize, skip_col: usize) -> Vec<Vec<Gen>> {
    rows.iter()
        .enumerate()
        .filter(|(i, _)| *i != skip_row)
        .map(|(_, r)| {
            r.iter()
                .enumerate()
                .filter(|(j, _)| *j != skip_col)
                .map(|(_, v)| v.clone())
                .collect()
        })
        .collect()
}

/// 余因子展開による行列式（小さい行列向け）。
fn determinant(rows: &[Vec<Gen>]) -> Gen {
    match rows.len() {
        0 => Gen::one(),
        1 => rows[0][0].clone(),
        2 => sub(
            mul(rows[0][0].clone(), rows[1][1].clone()),
            mul(rows[0][1].clone(), rows[1][0].clone()),
        ),
        n => {
            let mut terms = Vec::with_capacity(n);
            for j in 0..n {
                if rows[0][j].is_zero() {
                    continue;
                }
                let cof = mul(rows[0][j].clone(), determinant(&minor(rows, 0, j)));
                terms.push(if j % 2 == 0 { cof } else { neg(cof) });
            }
            add_all(terms)
        }
    }
}

const MAX_MATRIX: usize = 8;

fn cmd_det(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let rows = square_arg("det", first(args))?;
    if rows.len() > MAX_MATRIX {
        return Err(bad_arg("det", "行列が大きすぎます"));
    }
    Ok(expand(determinant(&rows)))
}

fn cmd_transpose(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let rows = matrix_arg("transpose", first(args))?;
    let cols = rows.first().map(Vec::len).unwrap_or(0);
    Ok(from_rows(
        (0..cols)
            .map(|j| rows.iter().map(|r| r[j].clone()).collect())
            .collect(),
    ))
}

fn cmd_inv(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let g = first(args);
    if g.matrix_dims().is_none() {
        return Ok(pow(g, Gen::minus_one()));
    }
    let rows = square_arg("inv", g)?;
    let n = rows.len();
    if n > MAX_MATRIX {
        return Err(bad_arg("inv", "行列が大きすぎます"));
    }
    let det = expand(determinant(&rows));
    if structurally_equal(&det, &Gen::zero()) {
        return Err(GiacError::eval("EVAL030", "inv: 正則でない行列です"));
    }
    let mut out = vec![vec![Gen::zero(); n]; n];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            // 余因子行列の転置
            let cof = if n == 1 {
                Gen::one()
            } else {
                determinant(&minor(&rows, j, i))
            };
            let signed = if (i + j) % 2 == 0 { cof } else { neg(cof) };
            *cell = normal(div(signed, det.clone()));
        }
    }
    Ok(from_rows(out))
}

fn cmd_trace(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let rows = square_arg("trace", first(args))?;
    Ok(add_all(
        rows.into_iter().enumerate().map(|(i, mut r)| r.swap_remove(i)).collect(),
    ))
}

fn cmd_identity(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let n = small_arg("idn", &args[0])? as usize;
    if n > 1000 {
        return Err(bad_arg("idn", "次元が大きすぎます"));
    }
    Ok(from_rows(
        (0..n)
            .map(|i| (0..n).map(|j| if i == j { Gen::one() } else { Gen::zero() }).collect())
            .collect(),
    ))
}

fn cmd_dot(_: &mut Evaluator, mut args: Vec<Gen>) -> GiacResult<Gen> {
    let b = list_items("dot", args.remove(1))?;
    let a = list_items("dot", args.remove(0))?;
    if a.len() != b.len() {
        return Err(bad_arg("dot", "同じ長さのベクトルが必要です"));
    }
    Ok(dot(a, b))
}

fn cmd_cross(_: &mut Evaluator, mut args: Vec<Gen>) -> GiacResult<Gen> {
    let b = list_items("cross", args.remove(1))?;
    let a = list_items("cross", args.remove(0))?;
    let (Ok([a1, a2, a3]), Ok([b1, b2, b3])) = (<[Gen; 3]>::try_from(a), <[Gen; 3]>::try_from(b))
    else {
        return Err(bad_arg("cross", "3 次元ベクトルが必要です"));
    };
    Ok(Gen::list(vec![
        sub(mul(a2.clone(), b3.clone()), mul(a3.clone(), b2.clone())),
        sub(mul(a3, b1.clone()), mul(a1.clone(), b3)),
        sub(mul(a1, b2), mul(a2, b1)),
    ]))
}

fn cmd_matrix(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let r = small_arg("matrix", &args[0])? as usize;
    let c = small_arg("matrix", &args[1])? as usize;
    if r * c > 1_000_000 {
        return Err(bad_arg("matrix", "次元が大きすぎます"));
    }
    let fill = args.get(2).cloned().unwrap_or_else(Gen::zero);
    Ok(from_rows(vec![vec![fill; c]; r]))
}

// ---------------------------------------------------------------------------
// other

fn cmd_type(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    let g = first(args);
    let name = match g {
        Gen::Int(_) | Gen::Bool(_) => "DOM_INT",
        Gen::Frac(_) => "DOM_RAT",
        Gen::Double(_) => "DOM_FLOAT",
        Gen::Cplx(..) => "DOM_COMPLEX",
        Gen::Idnt(_) => "DOM_IDENT",
        Gen::Str(_) => "DOM_STRING",
        Gen::Vect(..) => "DOM_LIST",
        Gen::Symb(..) => "DOM_SYMBOLIC",
    };
    Ok(Gen::idnt(name))
}

fn cmd_string(_: &mut Evaluator, args: Vec<Gen>) -> GiacResult<Gen> {
    Ok(Gen::Str(super::printer::print(&first(args))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::builtin::parser::parse_program;
    use crate::engine::builtin::printer::print;
    use std::collections::HashSet;

    fn run(src: &str) -> GiacResult<String> {
        let mut ev = Evaluator::default();
        let mut last = Gen::zero();
        for stmt in parse_program(src)? {
            last = ev.eval(stmt)?;
        }
        Ok(print(&last))
    }

    #[test]
    fn builtin_table_has_unique_names_and_sane_arities() {
        let mut seen = HashSet::new();
        for spec in BUILTINS {
            assert!(seen.insert(spec.name), "duplicate {}", spec.name);
            if let Arity::Range(lo, hi) = spec.arity {
                assert!(lo <= hi, "{}", spec.name);
            }
        }
        assert!(lookup("factor").is_some());
        assert!(lookup("no_such_command").is_none());
    }

    #[test]
    fn algebra_commands() {
        let cases = [
            ("factor(x^2-1)", "(x-1)*(x+1)"),
            ("factor(x^3-x)", "x*(x-1)*(x+1)"),
            ("factor(12)", "2^2*3"),
            ("expand((x+1)^2)", "x^2+2*x+1"),
            ("normal((x^2-1)/(x-1))", "x+1"),
            ("simplify(sin(x)^2+cos(x)^2)", "1"),
            ("subst(x^2+1,x=2)", "5"),
            ("subst(x^2+1,x,3)", "10"),
            ("numer(3/4)", "3"),
            ("denom(3/4)", "4"),
            ("evalf(1/4)", "0.25"),
            ("evalf(pi)", "3.14159265359"),
        ];
        for (src, want) in cases {
            assert_eq!(run(src).unwrap(), want, "{src}");
        }
    }

    #[test]
    fn arithmetic_commands() {
        let cases = [
            ("gcd(12,18)", "6"),
            ("lcm(4,6)", "12"),
            ("iquo(-7,2)", "-4"),
            ("irem(-7,2)", "1"),
            ("isprime(97)", "true"),
            ("isprime(1)", "false"),
            ("nextprime(13)", "17"),
            ("nextprime(1)", "2"),
            ("nextprime(-2^70)", "2"),
            ("prevprime(20)", "19"),
            ("factorial(10)", "3628800"),
            ("comb(5,2)", "10"),
            ("ifactors(360)", "[2,3,3,2,5,1]"),
            ("idivis(12)", "[1,2,3,4,6,12]"),
            ("euler(36)", "12"),
            ("powmod(2,10,1000)", "24"),
            ("gcd(x^2-1,x^2+2*x+1)", "x+1"),
        ];
        for (src, want) in cases {
            assert_eq!(run(src).unwrap(), want, "{src}");
        }
    }

    #[test]
    fn calculus_and_solving() {
        let cases = [
            ("diff(x^3,x)", "3*x^2"),
            ("diff(x^3,x,2)", "6*x"),
            ("integrate(x^2,x)", "x^3/3"),
            ("integrate(x^2,x,0,3)", "9"),
            ("limit((x^2-1)/(x-1),x,1)", "2"),
            ("sum(k,k,1,10)", "55"),
            ("solve(x^2-3*x+2=0,x)", "[1,2]"),
            ("solve(x^2-2,x)", "[-sqrt(2),sqrt(2)]"),
            ("degree(x^3+x,x)", "3"),
            ("symb2poly(x^2+2*x+3,x)", "[1,2,3]"),
            ("quo(x^2-1,x-1,x)", "x+1"),
        ];
        for (src, want) in cases {
            assert_eq!(run(src).unwrap(), want, "{src}");
        }
    }

    #[test]
    fn lists_statistics_and_matrices() {
        let cases = [
            ("size([1,2,3])", "3"),
            ("concat([1],[2,3])", "[1,2,3]"),
            ("revlist([1,2,3])", "[3,2,1]"),
            ("sort([3,1,2])", "[1,2,3]"),
            ("seq(k^2,k,1,4)", "[1,4,9,16]"),
            ("max(3,7,5)", "7"),
            ("mean([1,2,3,4])", "5/2"),
            ("median([3,1,2])", "2"),
            ("variance([1,2,3,4])", "5/4"),
            ("det([[1,2],[3,4]])", "-2"),
            ("inv([[1,2],[3,4]])", "[[-2,1],[3/2,-1/2]]"),
            ("tran([[1,2],[3,4]])", "[[1,3],[2,4]]"),
            ("trace([[1,2],[3,4]])", "5"),
            ("idn(2)", "[[1,0],[0,1]]"),
            ("[[1,2],[3,4]]*[[1,0],[0,1]]", "[[1,2],[3,4]]"),
            ("[[1,2],[3,4]]*[[0,1],[1,0]]", "[[2,1],[4,3]]"),
            ("[[0,1],[1,0]]*[[1,2],[3,4]]", "[[3,4],[1,2]]"),
            ("[1,2]*[3,4]", "11"),
            ("2*[1,2]", "[2,4]"),
            ("cross([1,0,0],[0,1,0])", "[0,0,1]"),
            ("re(3+4*i)", "3"),
            ("im(3+4*i)", "4"),
            ("conj(3+4*i)", "3-4*i"),
            ("abs(3+4*i)", "5"),
        ];
        for (src, want) in cases {
            assert_eq!(run(src).unwrap(), want, "{src}");
        }
    }

    #[test]
    fn argument_errors_have_codes() {
        assert_eq!(run("factorial(x)").unwrap_err().code(), "EVAL020");
        assert_eq!(run("iquo(1,0)").unwrap_err().code(), "EVAL040");
        assert_eq!(run("diff()").unwrap_err().code(), "EVAL010");
        assert_eq!(run("inv([[1,2],[2,4]])").unwrap_err().code(), "EVAL030");
    }
}
