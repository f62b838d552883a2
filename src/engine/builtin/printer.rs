// パス: src/engine/builtin/printer.rs
// 役割: `Gen` を GIAC 互換の一行表記へ整形する
// 意図: エンジンの表示をホスト側の期待文字列（例: `x^3/3`, `(x-1)*(x+1)`）と一致させる
// 関連ファイル: src/engine/builtin/gen.rs, src/engine/builtin/ops.rs
//! 表示モジュール
//!
//! - 和は符号を見て `+` を補い、積は分子・分母へ振り分けて `/` で結ぶ。
//! - 括弧は子の優先順位が親より低いときだけ付ける。
//! - 浮動小数は有効 12 桁で、整数値でも小数点を残す。

use num_bigint::BigInt;
use num_traits::{One, Signed};

use super::gen::Gen;
use crate::engine::Subtype;

const SUM: u8 = 1;
const PRODUCT: u8 = 2;
const POWER: u8 = 3;
const ATOM: u8 = 4;

fn precedence(g: &Gen) -> u8 {
    match g {
        Gen::Int(i) if i.is_negative() => SUM,
        Gen::Double(d) if *d < 0.0 => SUM,
        Gen::Frac(_) => PRODUCT,
        Gen::Cplx(re, im) => {
            if re.is_zero() && !im.is_negative_real() {
                PRODUCT
            } else {
                SUM
            }
        }
        Gen::Symb(op, _) => match op.as_str() {
            "+" => SUM,
            "*" => PRODUCT,
            "^" => POWER,
            "=" | "==" | "!=" | "<" | "<=" | ">" | ">=" | ":=" | "and" | "or" => 0,
            _ => ATOM,
        },
        Gen::Vect(_, Subtype::Sequence) => 0,
        _ => ATOM,
    }
}

fn wrap(g: &Gen, min: u8) -> String {
    let s = print(g);
    if precedence(g) < min {
        format!("({s})")
    } else {
        s
    }
}

/// 浮動小数を有効 12 桁で整形する。
pub(crate) fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "undef".into();
    }
    if d.is_infinite() {
        return if d > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if d == 0.0 {
        return "0.0".into();
    }
    let sci = format!("{:.11e}", d);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-5..12).contains(&exp) {
        let decimals = (11 - exp).max(1) as usize;
        let fixed = format!("{:.*}", decimals, d);
        let trimmed = fixed.trim_end_matches('0');
        if trimmed.ends_with('.') {
            format!("{trimmed}0")
        } else {
            trimmed.to_string()
        }
    } else {
        let m = mantissa.trim_end_matches('0').trim_end_matches('.');
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{m}e{sign}{:02}", exp.abs())
    }
}

fn print_complex(re: &Gen, im: &Gen) -> String {
    let im_str = if im.is_one() {
        "i".to_string()
    } else if im.is_minus_one() {
        "-i".to_string()
    } else {
        format!("{}*i", wrap(im, PRODUCT))
    };
    if re.is_zero() {
        return im_str;
    }
    let re_str = print(re);
    if im_str.starts_with('-') {
        format!("{re_str}{im_str}")
    } else {
        format!("{re_str}+{im_str}")
    }
}

fn print_sum(terms: &[Gen]) -> String {
    let mut out = String::new();
    for (idx, t) in terms.iter().enumerate() {
        let s = wrap(t, SUM);
        if idx > 0 && !s.starts_with('-') {
            out.push('+');
        }
        out.push_str(&s);
    }
    out
}

fn print_product(fs: &[Gen]) -> String {
    let mut negative = false;
    let mut num: Vec<String> = Vec::new();
    let mut den: Vec<String> = Vec::new();
    for f in fs {
        match f {
            Gen::Int(i) => {
                negative ^= i.is_negative();
                let a = i.abs();
                if !a.is_one() {
                    num.push(a.to_string());
                }
            }
            Gen::Frac(q) => {
                negative ^= q.is_negative();
                let n = q.numer().abs();
                if !n.is_one() {
                    num.push(n.to_string());
                }
                den.push(q.denom().to_string());
            }
            Gen::Double(d) => {
                negative ^= *d < 0.0;
                num.push(format_double(d.abs()));
            }
            Gen::Symb(op, args) if op == "^" && args.len() == 2 && args[1].is_negative_real() => {
                let positive = match &args[1] {
                    Gen::Int(i) => Gen::Int(-i),
                    Gen::Frac(q) => Gen::Frac(-q),
                    Gen::Double(d) => Gen::Double(-d),
                    other => other.clone(),
                };
                let p = Gen::symb("^", vec![args[0].clone(), positive]);
                if matches!(&p, Gen::Symb(_, a) if a[1].is_one()) {
                    den.push(wrap(&args[0], PRODUCT + 1));
                } else {
                    den.push(wrap(&p, PRODUCT));
                }
            }
            other => num.push(wrap(other, PRODUCT)),
        }
    }
    let sign = if negative { "-" } else { "" };
    let numerator = if num.is_empty() {
        "1".to_string()
    } else {
        num.join("*")
    };
    match den.len() {
        0 => format!("{sign}{numerator}"),
        1 => format!("{sign}{numerator}/{}", den[0]),
        _ => format!("{sign}{numerator}/({})", den.join("*")),
    }
}

fn print_power(base: &Gen, exp: &Gen) -> String {
    if let Gen::Frac(q) = exp {
        if q.numer().is_one() && *q.denom() == BigInt::from(2) {
            return format!("sqrt({})", print(base));
        }
    }
    if exp.is_negative_real() {
        return print_product(&[Gen::symb("^", vec![base.clone(), exp.clone()])]);
    }
    format!("{}^{}", wrap(base, ATOM), wrap(exp, ATOM))
}

fn print_args(args: &[Gen]) -> String {
    args.iter().map(print).collect::<Vec<_>>().join(",")
}

/// 式を一行の GIAC 表記へ変換する。
pub(crate) fn print(g: &Gen) -> String {
    match g {
        Gen::Int(i) => i.to_string(),
        Gen::Frac(q) => format!("{}/{}", q.numer(), q.denom()),
        Gen::Double(d) => format_double(*d),
        Gen::Cplx(re, im) => print_complex(re, im),
        Gen::Bool(b) => b.to_string(),
        Gen::Idnt(n) => n.clone(),
        Gen::Str(s) => format!("{s:?}"),
        Gen::Vect(items, Subtype::Sequence) => print_args(items),
        Gen::Vect(items, Subtype::Set) => format!("set[{}]", print_args(items)),
        Gen::Vect(items, _) => format!("[{}]", print_args(items)),
        Gen::Symb(op, args) => match (op.as_str(), args.as_slice()) {
            ("+", terms) => print_sum(terms),
            ("*", fs) => print_product(fs),
            ("^", [b, e]) => print_power(b, e),
            (
                "=" | "==" | "!=" | "<" | "<=" | ">" | ">=" | ":=",
                [l, r],
            ) => format!("{}{}{}", wrap(l, SUM), op, wrap(r, SUM)),
            ("and" | "or", items) => items
                .iter()
                .map(|a| wrap(a, ATOM))
                .collect::<Vec<_>>()
                .join(&format!(" {op} ")),
            (name, items) => format!("{name}({})", print_args(items)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::BigRational;

    fn q(n: i64, d: i64) -> Gen {
        Gen::rational(BigRational::new(BigInt::from(n), BigInt::from(d)))
    }

    #[test]
    fn doubles_keep_a_decimal_point() {
        assert_eq!(format_double(1.0), "1.0");
        assert_eq!(format_double(std::f64::consts::PI), "3.14159265359");
        assert_eq!(format_double(0.1 + 0.2), "0.3");
        assert_eq!(format_double(-2.5), "-2.5");
        assert_eq!(format_double(1e20), "1e+20");
        assert_eq!(format_double(f64::NAN), "undef");
    }

    #[test]
    fn products_split_into_numerator_and_denominator() {
        let x = Gen::idnt("x");
        let cube = Gen::symb("^", vec![x.clone(), Gen::int(3)]);
        assert_eq!(print(&Gen::symb("*", vec![q(1, 3), cube])), "x^3/3");
        let inv = Gen::symb("^", vec![x.clone(), Gen::int(-1)]);
        assert_eq!(print(&inv), "1/x");
        let sum = Gen::symb("+", vec![x.clone(), Gen::int(1)]);
        assert_eq!(print(&Gen::symb("*", vec![Gen::int(-1), sum])), "-(x+1)");
    }

    #[test]
    fn complex_and_lists() {
        assert_eq!(print(&Gen::complex(Gen::int(1), Gen::int(2))), "1+2*i");
        assert_eq!(print(&Gen::complex(Gen::int(1), Gen::int(-1))), "1-i");
        assert_eq!(print(&Gen::complex(Gen::zero(), q(1, 2))), "1/2*i");
        let l = Gen::list(vec![Gen::int(1), Gen::Str("a".into())]);
        assert_eq!(print(&l), "[1,\"a\"]");
    }
}
