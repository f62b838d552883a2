// パス: src/engine/builtin/functions.rs
// 役割: 初等関数（三角・指数・対数・平方根・絶対値・丸め）の評価
// 意図: 厳密値で表せる特殊値は厳密に、浮動小数の引数は数値として計算する
// 関連ファイル: src/engine/builtin/eval.rs, src/engine/builtin/calculus.rs

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use super::gen::{num_abs, num_neg, re_im, Gen};
use super::ops::{add, approx_real, div, mul, neg, pow};

fn q(n: i64, d: i64) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}

fn half() -> Gen {
    Gen::rational(q(1, 2))
}

/// `k*pi` の形なら k を返す。
fn pi_multiple(g: &Gen) -> Option<BigRational> {
    match g {
        Gen::Int(i) if i.is_zero() => Some(BigRational::zero()),
        Gen::Idnt(n) if n == "pi" => Some(BigRational::one()),
        Gen::Symb(op, args) if op == "*" && args.len() == 2 && args[1].is_symbol("pi") => {
            args[0].as_rational()
        }
        _ => None,
    }
}

/// sin(k*pi) の厳密値（表にない角度は `None`）。
fn exact_sin(k: &BigRational) -> Option<Gen> {
    let two = BigRational::from_integer(BigInt::from(2));
    let mut r = k % &two;
    if r.is_negative() {
        r += &two;
    }
    if r >= BigRational::one() {
        return exact_sin(&(r - BigRational::one())).map(neg);
    }
    let sqrt_of = |n: i64| pow(Gen::int(n), half());
    let table: [(BigRational, Gen); 9] = [
        (q(0, 1), Gen::zero()),
        (q(1, 6), half()),
        (q(1, 4), div(sqrt_of(2), Gen::int(2))),
        (q(1, 3), div(sqrt_of(3), Gen::int(2))),
        (q(1, 2), Gen::one()),
        (q(2, 3), div(sqrt_of(3), Gen::int(2))),
        (q(3, 4), div(sqrt_of(2), Gen::int(2))),
        (q(5, 6), half()),
        (q(1, 1), Gen::zero()),
    ];
    table.into_iter().find(|(a, _)| *a == r).map(|(_, v)| v)
}

fn float_arg(x: &Gen) -> Option<f64> {
    match x {
        Gen::Double(d) => Some(*d),
        _ => None,
    }
}

/// 初等関数を 1 引数で評価する。簡約できなければ未評価の呼び出しを返す。
pub(crate) fn elementary(name: &str, x: Gen) -> Gen {
    if let Some(d) = float_arg(&x) {
        let v = match name {
            "sin" => d.sin(),
            "cos" => d.cos(),
            "tan" => d.tan(),
            "exp" => d.exp(),
            "ln" | "log" if d > 0.0 => d.ln(),
            "sqrt" if d >= 0.0 => d.sqrt(),
            "atan" => d.atan(),
            "asin" if d.abs() <= 1.0 => d.asin(),
            "acos" if d.abs() <= 1.0 => d.acos(),
            "abs" => d.abs(),
            "sign" => d.signum(),
            "floor" => d.floor(),
            "ceil" => d.ceil(),
            "round" => d.round(),
            _ => return Gen::symb(name, vec![x]),
        };
        return Gen::Double(v);
    }
    match name {
        "sqrt" => pow(x, half()),
        "sin" => match pi_multiple(&x).and_then(|k| exact_sin(&k)) {
            Some(v) => v,
            None if x.is_negative_real() => neg(elementary("sin", num_neg(&x))),
            None => Gen::symb("sin", vec![x]),
        },
        "cos" => match pi_multiple(&x).and_then(|k| exact_sin(&(k + q(1, 2)))) {
            Some(v) => v,
            None => Gen::symb("cos", vec![x]),
        },
        "tan" => match pi_multiple(&x) {
            Some(k) => match (exact_sin(&k), exact_sin(&(k + q(1, 2)))) {
                (Some(_), Some(c)) if c.is_zero() => Gen::idnt("infinity"),
                (Some(s), Some(c)) => div(s, c),
                _ => Gen::symb("tan", vec![x]),
            },
            None => Gen::symb("tan", vec![x]),
        },
        "exp" => match &x {
            _ if x.is_zero() => Gen::one(),
            Gen::Symb(op, args) if (op == "ln" || op == "log") && args.len() == 1 => {
                args[0].clone()
            }
            _ => Gen::symb("exp", vec![x]),
        },
        "ln" | "log" => match &x {
            _ if x.is_one() => Gen::zero(),
            Gen::Idnt(n) if n == "e" => Gen::one(),
            Gen::Symb(op, args) if op == "exp" && args.len() == 1 => args[0].clone(),
            _ if x.is_zero() => neg(Gen::idnt("infinity")),
            _ => Gen::symb("ln", vec![x]),
        },
        "atan" => match &x {
            _ if x.is_zero() => Gen::zero(),
            _ if x.is_one() => div(Gen::idnt("pi"), Gen::int(4)),
            _ if x.is_minus_one() => neg(div(Gen::idnt("pi"), Gen::int(4))),
            _ => Gen::symb("atan", vec![x]),
        },
        "asin" => match &x {
            _ if x.is_zero() => Gen::zero(),
            _ if x.is_one() => div(Gen::idnt("pi"), Gen::int(2)),
            _ => Gen::symb("asin", vec![x]),
        },
        "acos" => match &x {
            _ if x.is_one() => Gen::zero(),
            _ if x.is_zero() => div(Gen::idnt("pi"), Gen::int(2)),
            _ => Gen::symb("acos", vec![x]),
        },
        "abs" => abs(x),
        "sign" => match approx_real(&x) {
            Some(v) if v > 0.0 => Gen::one(),
            Some(v) if v < 0.0 => Gen::minus_one(),
            Some(_) => Gen::zero(),
            None => Gen::symb("sign", vec![x]),
        },
        "floor" | "ceil" | "round" => rounding(name, x),
        _ => Gen::symb(name, vec![x]),
    }
}

fn abs(x: Gen) -> Gen {
    match &x {
        Gen::Int(_) | Gen::Frac(_) => num_abs(&x),
        Gen::Cplx(..) => {
            let (re, im) = re_im(&x);
            pow(add(mul(re.clone(), re), mul(im.clone(), im)), half())
        }
        _ => match approx_real(&x) {
            Some(v) if v >= 0.0 => x,
            Some(_) => neg(x),
            None => Gen::symb("abs", vec![x]),
        },
    }
}

fn rounding(name: &str, x: Gen) -> Gen {
    let Some(r) = x.as_rational() else {
        return Gen::symb(name, vec![x]);
    };
    let v = match name {
        "floor" => r.floor(),
        "ceil" => r.ceil(),
        _ => r.round(),
    };
    Gen::Int(v.to_integer())
}
