// パス: src/engine/builtin/ops.rs
// 役割: 和・積・冪の正規形を構成する記号演算と比較・論理演算
// 意図: 演算結果を常に正規形に保ち、構造比較だけで同類項をまとめられるようにする
// 関連ファイル: src/engine/builtin/gen.rs, src/engine/builtin/printer.rs
//! 記号演算
//!
//! - 和は平坦化して同類項をまとめ、定数項を末尾に置く。
//! - 積は係数を先頭に集め、同じ底の指数を足し合わせる。
//! - 冪は整数冪・有理数冪（完全冪・平方因子の抽出）を厳密に計算する。

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::gen::{num_add, num_cmp, num_inv, num_mul, num_neg, num_pow_int, Gen};
use super::printer::print;
use crate::engine::Subtype;

fn bool_to_int(g: Gen) -> Gen {
    match g {
        Gen::Bool(b) => Gen::int(i64::from(b)),
        other => other,
    }
}

pub(crate) fn add(a: Gen, b: Gen) -> Gen {
    let a = bool_to_int(a);
    let b = bool_to_int(b);
    if a.is_number() && b.is_number() {
        return num_add(&a, &b);
    }
    match (a, b) {
        (Gen::Vect(x, sub), Gen::Vect(y, _)) if x.len() == y.len() => {
            Gen::Vect(x.into_iter().zip(y).map(|(p, q)| add(p, q)).collect(), sub)
        }
        (Gen::Str(x), Gen::Str(y)) => Gen::Str(x + &y),
        (a, b) => add_all(vec![a, b]),
    }
}

pub(crate) fn sub(a: Gen, b: Gen) -> Gen {
    add(a, neg(b))
}

pub(crate) fn neg(a: Gen) -> Gen {
    match a {
        Gen::Vect(items, sub) => Gen::Vect(items.into_iter().map(neg).collect(), sub),
        other => mul(Gen::minus_one(), other),
    }
}

fn flatten_into(op: &str, items: Vec<Gen>, out: &mut Vec<Gen>) {
    for item in items {
        match item {
            Gen::Symb(o, args) if o == op => flatten_into(op, args, out),
            other => out.push(other),
        }
    }
}

/// 項を (数値係数, 残り) に分ける。
fn split_coef(term: Gen) -> (Gen, Gen) {
    match term {
        Gen::Symb(op, mut fs) if op == "*" && fs.len() >= 2 && fs[0].is_number() => {
            let coef = fs.remove(0);
            let rest = if fs.len() == 1 {
                fs.remove(0)
            } else {
                Gen::Symb(op, fs)
            };
            (coef, rest)
        }
        other => (Gen::one(), other),
    }
}

fn with_coef(coef: Gen, rest: Gen) -> Gen {
    if coef.is_one() {
        return rest;
    }
    match rest {
        Gen::Symb(op, fs) if op == "*" => {
            let mut out = Vec::with_capacity(fs.len() + 1);
            out.push(coef);
            out.extend(fs);
            Gen::Symb(op, out)
        }
        other => Gen::Symb("*".into(), vec![coef, other]),
    }
}

/// 項に現れる識別子のうち辞書順最小のもの。
fn leading_symbol(g: &Gen) -> Option<String> {
    match g {
        Gen::Idnt(n) => Some(n.clone()),
        Gen::Symb(_, args) | Gen::Vect(args, _) => {
            args.iter().filter_map(leading_symbol).min()
        }
        _ => None,
    }
}

/// `var` に関する単項式としての次数（多項式でない部分は 0 と数える）。
pub(crate) fn degree_in(g: &Gen, var: &str) -> i64 {
    match g {
        Gen::Idnt(n) if n == var => 1,
        Gen::Symb(op, args) if op == "^" && args.len() == 2 && args[0].is_symbol(var) => {
            args[1].as_i64().unwrap_or(0)
        }
        Gen::Symb(op, args) if op == "*" => args.iter().map(|a| degree_in(a, var)).sum(),
        _ => 0,
    }
}

/// 和の項の並び順: 主変数の辞書順、次数の降順、表示文字列。
fn term_order(a: &Gen, b: &Gen) -> Ordering {
    let (_, ra) = split_coef(a.clone());
    let (_, rb) = split_coef(b.clone());
    match (leading_symbol(&ra), leading_symbol(&rb)) {
        (Some(x), Some(y)) => x
            .cmp(&y)
            .then_with(|| degree_in(&rb, &y).cmp(&degree_in(&ra, &x)))
            .then_with(|| print(&ra).cmp(&print(&rb))),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => print(&ra).cmp(&print(&rb)),
    }
}

pub(crate) fn add_all(items: Vec<Gen>) -> Gen {
    let mut flat = Vec::new();
    flatten_into("+", items.into_iter().map(bool_to_int).collect(), &mut flat);
    let mut constant = Gen::zero();
    let mut collected: Vec<(Gen, Gen)> = Vec::new();
    for term in flat {
        if term.is_number() {
            constant = num_add(&constant, &term);
            continue;
        }
        let (coef, rest) = split_coef(term);
        match collected.iter_mut().find(|(r, _)| *r == rest) {
            Some(entry) => entry.1 = num_add(&entry.1, &coef),
            None => collected.push((rest, coef)),
        }
    }
    let mut terms: Vec<Gen> = collected
        .into_iter()
        .filter(|(_, c)| !c.is_zero())
        .map(|(r, c)| with_coef(c, r))
        .collect();
    terms.sort_by(term_order);
    if terms.is_empty() {
        return constant;
    }
    if !constant.is_zero() {
        terms.push(constant);
    }
    if terms.len() == 1 {
        return terms.remove(0);
    }
    Gen::Symb("+".into(), terms)
}

pub(crate) fn mul(a: Gen, b: Gen) -> Gen {
    let a = bool_to_int(a);
    let b = bool_to_int(b);
    if a.is_number() && b.is_number() {
        return num_mul(&a, &b);
    }
    match (a, b) {
        (a, b) if a.matrix_dims().is_some() && b.matrix_dims().is_some() => mat_mul(a, b),
        (Gen::Vect(x, sub), Gen::Vect(y, _)) if x.len() == y.len() => {
            if sub == Subtype::List || sub == Subtype::Sequence {
                dot(x, y)
            } else {
                Gen::symb("*", vec![Gen::Vect(x, sub), Gen::list(y)])
            }
        }
        (Gen::Vect(x, sub), s) | (s, Gen::Vect(x, sub)) if !matches!(s, Gen::Vect(..)) => {
            Gen::Vect(x.into_iter().map(|g| mul(s.clone(), g)).collect(), sub)
        }
        (a, b) => mul_all(vec![a, b]),
    }
}

/// ベクトルの内積。
pub(crate) fn dot(x: Vec<Gen>, y: Vec<Gen>) -> Gen {
    add_all(x.into_iter().zip(y).map(|(p, q)| mul(p, q)).collect())
}

fn mat_mul(a: Gen, b: Gen) -> Gen {
    let (Some((_, ac)), Some((br, bc))) = (a.matrix_dims(), b.matrix_dims()) else {
        return mul_all(vec![a, b]);
    };
    if ac != br {
        return Gen::symb("*", vec![a, b]);
    }
    let rows = matrix_rows(a);
    let cols = matrix_rows(b);
    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut line = Vec::with_capacity(bc);
        for j in 0..bc {
            let column: Vec<Gen> = cols.iter().map(|r| r[j].clone()).collect();
            line.push(dot(row.clone(), column));
        }
        out.push(Gen::list(line));
    }
    Gen::list(out)
}

/// 行列を行ベクトルの配列へほどく。
pub(crate) fn matrix_rows(m: Gen) -> Vec<Vec<Gen>> {
    match m {
        Gen::Vect(rows, _) => rows
            .into_iter()
            .map(|r| match r {
                Gen::Vect(items, _) => items,
                other => vec![other],
            })
            .collect(),
        other => vec![vec![other]],
    }
}

fn split_pow(f: Gen) -> (Gen, Gen) {
    match f {
        Gen::Symb(op, mut args) if op == "^" && args.len() == 2 => {
            let e = args.pop().unwrap_or_else(Gen::one);
            let b = args.pop().unwrap_or_else(Gen::zero);
            (b, e)
        }
        other => (other, Gen::one()),
    }
}

/// 積の因子の並び: 変数・数の冪、和の冪、その他（関数呼び出しなど）。
fn factor_rank(f: &Gen) -> u8 {
    let base = match f {
        Gen::Symb(op, args) if op == "^" && args.len() == 2 => &args[0],
        other => other,
    };
    match base {
        Gen::Idnt(_) | Gen::Int(_) | Gen::Frac(_) => 0,
        Gen::Symb(op, _) if op == "+" => 1,
        _ => 2,
    }
}

pub(crate) fn mul_all(items: Vec<Gen>) -> Gen {
    let mut flat = Vec::new();
    flatten_into("*", items.into_iter().map(bool_to_int).collect(), &mut flat);
    let mut coef = Gen::one();
    let mut factors: Vec<(Gen, Gen)> = Vec::new();
    // ベクトル・行列の因子は非可換なので並べ替えず、まとめもしない
    let mut vects: Vec<Gen> = Vec::new();
    for f in flat {
        if f.is_number() {
            coef = num_mul(&coef, &f);
            continue;
        }
        if matches!(f, Gen::Vect(..)) {
            vects.push(f);
            continue;
        }
        let (base, exp) = split_pow(f);
        match factors.iter_mut().find(|(b, _)| *b == base) {
            Some(entry) => entry.1 = add(entry.1.clone(), exp),
            None => factors.push((base, exp)),
        }
    }
    if coef.is_zero() && coef.is_exact() {
        return Gen::zero();
    }
    let mut built: Vec<Gen> = Vec::new();
    for (base, exp) in factors {
        if exp.is_zero() {
            continue;
        }
        match pow(base, exp) {
            n if n.is_number() => coef = num_mul(&coef, &n),
            Gen::Symb(op, fs) if op == "*" => {
                for f in fs {
                    if f.is_number() {
                        coef = num_mul(&coef, &f);
                    } else {
                        built.push(f);
                    }
                }
            }
            other => built.push(other),
        }
    }
    if coef.is_zero() && coef.is_exact() {
        return Gen::zero();
    }
    // -1 * (a + b) は符号を配る
    if vects.is_empty() && built.len() == 1 && coef.is_minus_one() && built[0].is_op("+") {
        if let Some(Gen::Symb(_, terms)) = built.pop() {
            return add_all(terms.into_iter().map(neg).collect());
        }
    }
    built.sort_by_key(|f| (factor_rank(f), print(f)));
    built.extend(vects);
    if built.is_empty() {
        return coef;
    }
    if built.len() == 1 && coef.is_one() {
        return built.remove(0);
    }
    let mut fs = Vec::with_capacity(built.len() + 1);
    if !coef.is_one() {
        fs.push(coef);
    }
    fs.extend(built);
    Gen::Symb("*".into(), fs)
}

pub(crate) fn inv(a: Gen) -> Gen {
    pow(a, Gen::minus_one())
}

pub(crate) fn div(a: Gen, b: Gen) -> Gen {
    let a = bool_to_int(a);
    let b = bool_to_int(b);
    if a.is_number() && b.is_number() {
        return num_mul(&a, &num_inv(&b));
    }
    if let Gen::Vect(items, sub) = a {
        if !matches!(b, Gen::Vect(..)) {
            let ib = inv(b);
            return Gen::Vect(items.into_iter().map(|g| mul(g, ib.clone())).collect(), sub);
        }
        return Gen::symb("/", vec![Gen::Vect(items, sub), b]);
    }
    mul(a, inv(b))
}

pub(crate) fn pow(a: Gen, b: Gen) -> Gen {
    let a = bool_to_int(a);
    let b = bool_to_int(b);
    if b.is_zero() && b.is_exact() {
        return Gen::one();
    }
    if b.is_one() {
        return a;
    }
    if a.is_number() && b.is_number() {
        return num_pow(a, b);
    }
    if a.is_one() {
        return Gen::one();
    }
    if a.is_zero() && a.is_exact() && b.is_real_number() && !b.is_negative_real() {
        return Gen::zero();
    }
    match a {
        Gen::Symb(op, mut args) if op == "^" && args.len() == 2 && matches!(b, Gen::Int(_)) => {
            let e = args.pop().unwrap_or_else(Gen::one);
            let c = args.pop().unwrap_or_else(Gen::zero);
            pow(c, mul(e, b))
        }
        Gen::Symb(op, fs) if op == "*" && matches!(b, Gen::Int(_)) => {
            mul_all(fs.into_iter().map(|f| pow(f, b.clone())).collect())
        }
        other => Gen::symb("^", vec![other, b]),
    }
}

/// 厳密な底に対する指数の上限。これを超える冪は周期的な底だけを厳密に求める。
const MAX_EXACT_EXPONENT: u32 = 1_000_000;

fn num_pow(a: Gen, b: Gen) -> Gen {
    match &b {
        Gen::Int(n) if n.abs() <= BigInt::from(MAX_EXACT_EXPONENT) => num_pow_int(&a, n),
        Gen::Int(n) if !matches!(a, Gen::Double(_)) => huge_exact_pow(a, n),
        Gen::Frac(q) if a.is_exact() => rational_power(a.clone(), q.numer(), q.denom())
            .unwrap_or_else(|| Gen::symb("^", vec![a, b.clone()])),
        Gen::Double(_) | Gen::Int(_) | Gen::Frac(_) if a.is_real_number() => {
            match (a.to_f64(), b.to_f64()) {
                (Some(x), Some(y)) if x >= 0.0 || y.fract() == 0.0 => Gen::Double(x.powf(y)),
                _ => Gen::symb("^", vec![a, b]),
            }
        }
        _ => Gen::symb("^", vec![a, b]),
    }
}

/// 指数が大きすぎる厳密な冪。0・±1・±i だけを評価し、それ以外は `a^n` のまま残す。
fn huge_exact_pow(a: Gen, n: &BigInt) -> Gen {
    let i = Gen::imaginary_unit();
    if a.is_zero() || a.is_one() {
        return num_pow_int(&a, &BigInt::from(n.signum()));
    }
    if a.is_minus_one() {
        return if (n % 2u32).is_zero() { Gen::one() } else { Gen::minus_one() };
    }
    if a == i || a == num_neg(&i) {
        return num_pow_int(&a, &(n % 4u32));
    }
    Gen::symb("^", vec![a, Gen::Int(n.clone())])
}

/// 有理数 `a` の `p/d` 乗を厳密に求める。表せない場合は `None`。
fn rational_power(a: Gen, p: &BigInt, d: &BigInt) -> Option<Gen> {
    let d_small = d.to_u32().filter(|d| *d <= 64)?;
    let (mut k, mut r) = (p / d, p % d);
    if r.is_negative() {
        r += d;
        k -= 1u32;
    }
    if a.is_negative_real() {
        let pos = num_neg(&a);
        if d_small == 2 {
            // (-a)^(1/2) = i * a^(1/2)
            let root = rational_power(pos, p, d)?;
            let i_pow = num_pow_int(&Gen::imaginary_unit(), p);
            return Some(mul(i_pow, root));
        }
        if d_small % 2 == 1 {
            let root = rational_power(pos, p, d)?;
            let odd = !(p % 2u32).is_zero();
            return Some(if odd { neg(root) } else { root });
        }
        return None;
    }
    let whole = num_pow_int(&a, &k);
    if r.is_zero() {
        return Some(whole);
    }
    let q = a.as_rational()?;
    let (n, m) = (q.numer().clone(), q.denom().clone());
    let rn = n.nth_root(d_small);
    let rm = m.nth_root(d_small);
    let exact = num_traits::pow::Pow::pow(&rn, d_small) == n
        && num_traits::pow::Pow::pow(&rm, d_small) == m;
    let frac = if exact {
        let root = Gen::rational(num_rational::BigRational::new(rn, rm));
        num_pow_int(&root, &r)
    } else if d_small == 2 {
        // sqrt(n/m) = sqrt(n*m)/m、平方因子を外に出す
        let (s, t) = split_square(&(&n * &m));
        let outside = Gen::rational(num_rational::BigRational::new(s, m));
        let root = Gen::symb("^", vec![Gen::Int(t.clone()), Gen::rational(half())]);
        if t.is_one() {
            outside
        } else if outside.is_one() {
            root
        } else {
            // 既に正規形なので mul を通さずに組み立てる
            Gen::symb("*", vec![outside, root])
        }
    } else {
        Gen::symb(
            "^",
            vec![a, Gen::rational(num_rational::BigRational::new(r, d.clone()))],
        )
    };
    if whole.is_one() {
        return Some(frac);
    }
    Some(mul(whole, frac))
}

fn half() -> num_rational::BigRational {
    num_rational::BigRational::new(BigInt::one(), BigInt::from(2))
}

/// `n = s^2 * t` となる (s, t) を試し割りで求める。
pub(crate) fn split_square(n: &BigInt) -> (BigInt, BigInt) {
    let mut s = BigInt::one();
    let mut t = n.clone();
    let mut p = BigInt::from(2);
    let limit = BigInt::from(100_000);
    while &p * &p <= t && p <= limit {
        let sq = &p * &p;
        while (&t % &sq).is_zero() {
            t /= &sq;
            s *= &p;
        }
        p += 1u32;
    }
    (s, t)
}

/// 実数値として評価できれば f64 を返す（`pi` や `e` を含む式も対象）。
pub(crate) fn approx_real(g: &Gen) -> Option<f64> {
    match g {
        Gen::Int(_) | Gen::Frac(_) | Gen::Double(_) | Gen::Bool(_) => g.to_f64(),
        Gen::Idnt(n) if n == "pi" => Some(std::f64::consts::PI),
        Gen::Idnt(n) if n == "e" => Some(std::f64::consts::E),
        Gen::Idnt(n) if n == "infinity" => Some(f64::INFINITY),
        Gen::Symb(op, args) => {
            let vals: Option<Vec<f64>> = args.iter().map(approx_real).collect();
            let vals = vals?;
            match (op.as_str(), vals.as_slice()) {
                ("+", _) => Some(vals.iter().sum()),
                ("*", _) => Some(vals.iter().product()),
                ("^", [x, y]) => Some(x.powf(*y)),
                ("sqrt", [x]) => Some(x.sqrt()),
                ("sin", [x]) => Some(x.sin()),
                ("cos", [x]) => Some(x.cos()),
                ("tan", [x]) => Some(x.tan()),
                ("exp", [x]) => Some(x.exp()),
                ("ln" | "log", [x]) => Some(x.ln()),
                ("atan", [x]) => Some(x.atan()),
                ("abs", [x]) => Some(x.abs()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// 構造的な等価性（差が 0 に正規化されるかも見る）。
pub(crate) fn structurally_equal(a: &Gen, b: &Gen) -> bool {
    if a == b {
        return true;
    }
    if a.is_number() && b.is_number() {
        return num_cmp(a, b) == Some(Ordering::Equal);
    }
    let diff = sub(a.clone(), b.clone());
    diff.is_zero()
}

/// 比較演算。実数として比較できなければ未評価のまま返す。
pub(crate) fn compare(op: &str, a: Gen, b: Gen) -> Gen {
    match op {
        "==" => return Gen::Bool(structurally_equal(&a, &b)),
        "!=" => return Gen::Bool(!structurally_equal(&a, &b)),
        _ => {}
    }
    let ordering = match (num_cmp(&a, &b), approx_real(&a), approx_real(&b)) {
        (Some(o), _, _) => Some(o),
        (None, Some(x), Some(y)) => x.partial_cmp(&y),
        _ => None,
    };
    let Some(ordering) = ordering else {
        return Gen::symb(op, vec![a, b]);
    };
    let value = match op {
        "<" => ordering == Ordering::Less,
        "<=" => ordering != Ordering::Greater,
        ">" => ordering == Ordering::Greater,
        ">=" => ordering != Ordering::Less,
        _ => return Gen::symb(op, vec![a, b]),
    };
    Gen::Bool(value)
}

pub(crate) fn logic(op: &str, args: Vec<Gen>) -> Gen {
    let truth = |g: &Gen| match g {
        Gen::Bool(b) => Some(*b),
        Gen::Int(i) => Some(!i.is_zero()),
        _ => None,
    };
    let values: Option<Vec<bool>> = args.iter().map(truth).collect();
    match (op, values) {
        ("and", Some(vs)) => Gen::Bool(vs.iter().all(|v| *v)),
        ("or", Some(vs)) => Gen::Bool(vs.iter().any(|v| *v)),
        ("not", Some(vs)) if vs.len() == 1 => Gen::Bool(!vs[0]),
        _ => Gen::symb(op, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Gen {
        Gen::idnt("x")
    }

    #[test]
    fn like_terms_collect_and_constant_goes_last() {
        let e = add_all(vec![Gen::int(1), x(), mul(Gen::int(2), x()), pow(x(), Gen::int(2))]);
        assert_eq!(print(&e), "x^2+3*x+1");
        assert_eq!(sub(x(), x()), Gen::zero());
    }

    #[test]
    fn products_merge_exponents() {
        let e = mul(mul(x(), x()), Gen::int(3));
        assert_eq!(print(&e), "3*x^2");
        assert_eq!(div(x(), x()), Gen::one());
    }

    #[test]
    fn sqrt_extracts_square_factors() {
        let h = Gen::rational(half());
        assert_eq!(print(&pow(Gen::int(8), h.clone())), "2*sqrt(2)");
        assert_eq!(pow(Gen::int(9), h.clone()), Gen::int(3));
        assert_eq!(print(&pow(Gen::int(-4), h)), "2*i");
    }

    #[test]
    fn huge_integer_powers_stay_exact() {
        let big = Gen::Int(BigInt::from(10_000_000));
        let odd = Gen::Int(BigInt::from(10_000_001));
        assert_eq!(pow(Gen::minus_one(), big.clone()), Gen::one());
        assert_eq!(pow(Gen::minus_one(), odd.clone()), Gen::minus_one());
        assert_eq!(pow(Gen::zero(), big.clone()), Gen::zero());
        assert_eq!(pow(Gen::one(), odd.clone()), Gen::one());
        assert_eq!(pow(Gen::imaginary_unit(), odd), Gen::imaginary_unit());
        let two = pow(Gen::int(2), big);
        assert!(two.is_op("^"));
        assert_eq!(print(&two), "2^10000000");
    }

    #[test]
    fn matrix_factors_keep_their_order() {
        let a = Gen::list(vec![Gen::list(vec![Gen::int(0), Gen::int(1)])]);
        let b = Gen::idnt("b");
        let e = mul_all(vec![a.clone(), b.clone(), Gen::int(2)]);
        assert_eq!(e, Gen::symb("*", vec![Gen::int(2), b, a]));
    }

    #[test]
    fn negation_distributes_over_sums() {
        let e = neg(add(x(), Gen::int(1)));
        assert_eq!(print(&e), "-x-1");
    }

    #[test]
    fn comparisons_fall_back_to_approximation() {
        assert_eq!(compare("<", Gen::int(1), Gen::int(2)), Gen::Bool(true));
        assert_eq!(
            compare(">", Gen::idnt("pi"), Gen::int(3)),
            Gen::Bool(true)
        );
        assert!(compare("<", x(), Gen::int(1)).is_op("<"));
    }
}
