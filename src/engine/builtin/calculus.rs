// パス: src/engine/builtin/calculus.rs
// 役割: 記号微分・不定積分／定積分・代入
// 意図: 微積分コマンドの規則を評価器から分離し、式の形ごとの規則表として読めるようにする
// 関連ファイル: src/engine/builtin/commands.rs, src/engine/builtin/functions.rs
//! 微積分
//!
//! - 微分は和・積・冪・初等関数の連鎖律で計算し、未知の関数は `diff(f,x)` のまま残す。
//! - 積分は多項式・線形引数の初等関数・`1/(a*x+b)` に対応し、それ以外は未評価で返す。

use num_rational::BigRational;

use super::functions::elementary;
use super::gen::Gen;
use super::ops::{add, add_all, div, mul, mul_all, neg, pow, sub};
use super::poly::to_upoly;

/// `g` を `var` で 1 回微分する。
pub(crate) fn diff(g: &Gen, var: &str) -> Gen {
    if !g.contains_symbol(var) {
        return match g {
            Gen::Vect(items, sub) => Gen::Vect(items.iter().map(|_| Gen::zero()).collect(), *sub),
            _ => Gen::zero(),
        };
    }
    match g {
        Gen::Idnt(_) => Gen::one(),
        Gen::Vect(items, sub) => Gen::Vect(items.iter().map(|i| diff(i, var)).collect(), *sub),
        Gen::Symb(op, args) => match (op.as_str(), args.as_slice()) {
            ("+", terms) => add_all(terms.iter().map(|t| diff(t, var)).collect()),
            ("*", fs) => {
                let mut terms = Vec::with_capacity(fs.len());
                for i in 0..fs.len() {
                    let mut factors: Vec<Gen> = fs.to_vec();
                    factors[i] = diff(&fs[i], var);
                    terms.push(mul_all(factors));
                }
                add_all(terms)
            }
            ("^", [b, e]) => {
                if !e.contains_symbol(var) {
                    // e * b^(e-1) * b'
                    mul_all(vec![
                        e.clone(),
                        pow(b.clone(), sub(e.clone(), Gen::one())),
                        diff(b, var),
                    ])
                } else if !b.contains_symbol(var) {
                    mul_all(vec![
                        elementary("ln", b.clone()),
                        g.clone(),
                        diff(e, var),
                    ])
                } else {
                    // b^e * (e' ln b + e b'/b)
                    let inner = add(
                        mul(diff(e, var), elementary("ln", b.clone())),
                        div(mul(e.clone(), diff(b, var)), b.clone()),
                    );
                    mul(g.clone(), inner)
                }
            }
            (f, [u]) => {
                let du = diff(u, var);
                let outer = match f {
                    "sin" => elementary("cos", u.clone()),
                    "cos" => neg(elementary("sin", u.clone())),
                    "tan" => add(Gen::one(), pow(elementary("tan", u.clone()), Gen::int(2))),
                    "exp" => g.clone(),
                    "ln" | "log" => pow(u.clone(), Gen::minus_one()),
                    "atan" => pow(add(Gen::one(), pow(u.clone(), Gen::int(2))), Gen::minus_one()),
                    "asin" => pow(
                        sub(Gen::one(), pow(u.clone(), Gen::int(2))),
                        Gen::rational(BigRational::new((-1).into(), 2.into())),
                    ),
                    "acos" => neg(pow(
                        sub(Gen::one(), pow(u.clone(), Gen::int(2))),
                        Gen::rational(BigRational::new((-1).into(), 2.into())),
                    )),
                    "abs" => elementary("sign", u.clone()),
                    _ => return Gen::symb("diff", vec![g.clone(), Gen::idnt(var)]),
                };
                mul(outer, du)
            }
            _ => Gen::symb("diff", vec![g.clone(), Gen::idnt(var)]),
        },
        _ => Gen::zero(),
    }
}

/// `u = a*x + b` なら係数 a を返す。
fn linear_coefficient(u: &Gen, var: &str) -> Option<Gen> {
    let p = to_upoly(u, var)?;
    if p.degree() != Some(1) {
        return None;
    }
    Some(Gen::rational(p.lead()))
}

/// 不定積分。求められなければ `None`。
pub(crate) fn antiderivative(g: &Gen, var: &str) -> Option<Gen> {
    let x = Gen::idnt(var);
    if !g.contains_symbol(var) {
        return Some(mul(g.clone(), x));
    }
    match g {
        Gen::Idnt(_) => Some(div(pow(x, Gen::int(2)), Gen::int(2))),
        Gen::Symb(op, args) => match (op.as_str(), args.as_slice()) {
            ("+", terms) => {
                let parts: Option<Vec<Gen>> =
                    terms.iter().map(|t| antiderivative(t, var)).collect();
                Some(add_all(parts?))
            }
            ("*", fs) => {
                let (consts, rest): (Vec<Gen>, Vec<Gen>) =
                    fs.iter().cloned().partition(|f| !f.contains_symbol(var));
                if consts.is_empty() {
                    return None;
                }
                let inner = antiderivative(&mul_all(rest), var)?;
                Some(mul(mul_all(consts), inner))
            }
            ("^", [b, e]) if !e.contains_symbol(var) => {
                let a = linear_coefficient(b, var)?;
                if e.is_minus_one() {
                    let ln = elementary("ln", elementary("abs", b.clone()));
                    return Some(div(ln, a));
                }
                let e1 = add(e.clone(), Gen::one());
                Some(div(pow(b.clone(), e1.clone()), mul(a, e1)))
            }
            (f @ ("sin" | "cos" | "exp"), [u]) => {
                let a = linear_coefficient(u, var)?;
                let prim = match f {
                    "sin" => neg(elementary("cos", u.clone())),
                    "cos" => elementary("sin", u.clone()),
                    _ => g.clone(),
                };
                Some(div(prim, a))
            }
            _ => None,
        },
        _ => None,
    }
}

/// 式中の識別子 `var` を `value` で置き換える（評価はしない）。
pub(crate) fn replace(g: &Gen, var: &str, value: &Gen) -> Gen {
    match g {
        Gen::Idnt(n) if n == var => value.clone(),
        Gen::Symb(op, args) => Gen::Symb(
            op.clone(),
            args.iter().map(|a| replace(a, var, value)).collect(),
        ),
        Gen::Vect(items, sub) => Gen::Vect(items.iter().map(|a| replace(a, var, value)).collect(), *sub),
        Gen::Cplx(re, im) => Gen::complex(replace(re, var, value), replace(im, var, value)),
        other => other.clone(),
    }
}

pub(crate) fn is_unevaluated(g: &Gen, name: &str) -> bool {
    match g {
        Gen::Symb(op, args) => op == name || args.iter().any(|a| is_unevaluated(a, name)),
        Gen::Vect(items, _) => items.iter().any(|a| is_unevaluated(a, name)),
        _ => false,
    }
}

pub(crate) fn is_finite_value(g: &Gen) -> bool {
    match g {
        Gen::Idnt(n) => !matches!(n.as_str(), "infinity" | "undef"),
        Gen::Double(d) => d.is_finite(),
        Gen::Symb(_, args) | Gen::Vect(args, _) => args.iter().all(is_finite_value),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::builtin::printer::print;

    fn x() -> Gen {
        Gen::idnt("x")
    }

    #[test]
    fn power_rule() {
        assert_eq!(print(&diff(&pow(x(), Gen::int(3)), "x")), "3*x^2");
        assert_eq!(diff(&Gen::int(7), "x"), Gen::zero());
    }

    #[test]
    fn chain_rule_through_elementary_functions() {
        let e = elementary("sin", pow(x(), Gen::int(2)));
        assert_eq!(print(&diff(&e, "x")), "2*x*cos(x^2)");
        let l = elementary("ln", x());
        assert_eq!(print(&diff(&l, "x")), "1/x");
    }

    #[test]
    fn unknown_function_stays_unevaluated() {
        let f = Gen::symb("f", vec![x()]);
        assert!(diff(&f, "x").is_op("diff"));
    }

    #[test]
    fn polynomial_and_linear_argument_integrals() {
        let p = antiderivative(&pow(x(), Gen::int(2)), "x").unwrap();
        assert_eq!(print(&p), "x^3/3");
        let c = antiderivative(&elementary("cos", mul(Gen::int(2), x())), "x").unwrap();
        assert_eq!(print(&c), "sin(2*x)/2");
        let r = antiderivative(&pow(x(), Gen::minus_one()), "x").unwrap();
        assert_eq!(print(&r), "ln(abs(x))");
        assert!(antiderivative(&elementary("tan", x()), "x").is_none());
    }

    #[test]
    fn replace_is_structural() {
        let e = add(x(), Gen::int(1));
        let r = replace(&e, "x", &Gen::int(2));
        assert!(r.is_op("+"));
    }
}
