// パス: src/invoke.rs
// 役割: ホスト側の引数を GIAC 構文へ書式化し、1 つの呼び出し式を組み立てる
// 意図: 型ごとの書式規則をここに集め、エンジンへ渡す前に不正な引数を弾く
// 関連ファイル: src/session.rs, src/expr.rs, src/registry/mod.rs
//! 動的呼び出し
//!
//! - `Arg` は呼び出し引数の異種リストを表す。書式化は再帰的で、リストのリストは行列になる。
//! - `Null` と `Map` は書式化の時点で `Type` エラー。エンジンには一切触れない。
//! - 呼び出し文字列は `name(a1,a2,...)`。

use std::fmt::Write as _;

use num_bigint::BigInt;
use num_complex::{Complex, Complex64};
use num_rational::BigRational;
use num_traits::{One, Signed};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{GiacError, GiacResult};
use crate::expr::GiacExpr;

static IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|e| panic!("IDENT: {e}"))
});

/// 呼び出し引数。
#[derive(Clone, Debug)]
pub enum Arg {
    Int(i64),
    BigInt(BigInt),
    Float(f64),
    Rational(BigRational),
    Complex(Complex64),
    ExactComplex(Complex<BigRational>),
    Bool(bool),
    /// GIAC の識別子（`x`, `a_1` など）。
    Symbol(String),
    /// GIAC ソースをそのまま埋め込む。
    Code(String),
    Str(String),
    List(Vec<Arg>),
    Expr(GiacExpr),
    Null,
    Map(Vec<(String, Arg)>),
}

impl Arg {
    pub fn symbol(name: impl Into<String>) -> Self {
        Arg::Symbol(name.into())
    }

    pub fn code(src: impl Into<String>) -> Self {
        Arg::Code(src.into())
    }

    pub fn rational(p: i64, q: i64) -> Self {
        Arg::Rational(BigRational::new(BigInt::from(p), BigInt::from(q)))
    }

    pub fn matrix<T: Into<Arg>>(rows: Vec<Vec<T>>) -> Self {
        Arg::List(
            rows.into_iter()
                .map(|r| Arg::List(r.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }
}

macro_rules! impl_from_for_arg {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(impl From<$t> for Arg {
            fn from(v: $t) -> Self {
                Arg::$variant(v.into())
            }
        })+
    };
}

impl_from_for_arg! {
    i64 => Int,
    i32 => Int,
    u32 => Int,
    BigInt => BigInt,
    f64 => Float,
    BigRational => Rational,
    Complex64 => Complex,
    Complex<BigRational> => ExactComplex,
    bool => Bool,
    &str => Str,
    String => Str,
    GiacExpr => Expr,
}

impl From<&GiacExpr> for Arg {
    fn from(e: &GiacExpr) -> Self {
        Arg::Expr(e.clone())
    }
}

impl<T: Into<Arg>> From<Vec<T>> for Arg {
    fn from(items: Vec<T>) -> Self {
        Arg::List(items.into_iter().map(Into::into).collect())
    }
}

/// 小数点を必ず含む浮動小数表記。
pub fn format_float(d: f64) -> String {
    if d.is_nan() {
        return "undef".to_string();
    }
    if d.is_infinite() {
        return if d > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let s = format!("{d:?}");
    if s.contains(['.', 'e', 'E']) {
        s
    } else {
        format!("{s}.0")
    }
}

fn format_rational_part(q: &BigRational) -> String {
    if q.denom().is_one() {
        q.numer().to_string()
    } else {
        format!("{}/{}", q.numer(), q.denom())
    }
}

fn format_complex(re: String, im_negative: bool, im_abs: String) -> String {
    let sign = if im_negative { '-' } else { '+' };
    format!("({re}{sign}{im_abs}*i)")
}

/// GIAC の文字列リテラル。
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn is_identifier(name: &str) -> bool {
    IDENT.is_match(name)
}

/// 1 つの引数を GIAC 構文へ書式化する。
pub fn format_arg(arg: &Arg) -> GiacResult<String> {
    let mut out = String::new();
    write_arg(&mut out, arg)?;
    Ok(out)
}

fn write_arg(out: &mut String, arg: &Arg) -> GiacResult<()> {
    match arg {
        Arg::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Arg::BigInt(n) => {
            let _ = write!(out, "{n}");
        }
        Arg::Float(d) => out.push_str(&format_float(*d)),
        Arg::Rational(q) => {
            let _ = write!(out, "({}/{})", q.numer(), q.denom());
        }
        Arg::Complex(c) => out.push_str(&format_complex(
            format_float(c.re),
            c.im.is_sign_negative() && !c.im.is_nan(),
            format_float(c.im.abs()),
        )),
        Arg::ExactComplex(c) => out.push_str(&format_complex(
            format_rational_part(&c.re),
            c.im.is_negative(),
            format_rational_part(&c.im.abs()),
        )),
        Arg::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Arg::Symbol(name) => {
            if !is_identifier(name) {
                return Err(GiacError::type_error(
                    "ARG003",
                    format!("`{name}` は GIAC の識別子ではありません"),
                ));
            }
            out.push_str(name);
        }
        Arg::Code(src) => out.push_str(src),
        Arg::Str(s) => out.push_str(&quote(s)),
        Arg::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_arg(out, item)?;
            }
            out.push(']');
        }
        Arg::Expr(e) => {
            let printed = e.print()?;
            let _ = write!(out, "({printed})");
        }
        Arg::Null => {
            return Err(GiacError::type_error("ARG001", "null 引数は GIAC へ渡せません"));
        }
        Arg::Map(_) => {
            return Err(GiacError::type_error(
                "ARG002",
                "マップ引数は GIAC の式として表現できません",
            ));
        }
    }
    Ok(())
}

/// `name(arg1,arg2,...)` を組み立てる。
pub fn compose_call(name: &str, args: &[Arg]) -> GiacResult<String> {
    let mut call = String::with_capacity(name.len() + 2 + args.len() * 4);
    call.push_str(name);
    call.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            call.push(',');
        }
        write_arg(&mut call, arg)?;
    }
    call.push(')');
    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars() {
        assert_eq!(format_arg(&Arg::Int(-3)).unwrap(), "-3");
        assert_eq!(format_arg(&Arg::Float(2.0)).unwrap(), "2.0");
        assert_eq!(format_arg(&Arg::Float(f64::NAN)).unwrap(), "undef");
        assert_eq!(format_arg(&Arg::Float(f64::NEG_INFINITY)).unwrap(), "-inf");
        assert_eq!(format_arg(&Arg::rational(3, 4)).unwrap(), "(3/4)");
        assert_eq!(format_arg(&Arg::Bool(true)).unwrap(), "true");
    }

    #[test]
    fn complex_values_put_the_sign_outside() {
        let c = Arg::Complex(Complex64::new(1.0, -2.5));
        assert_eq!(format_arg(&c).unwrap(), "(1.0-2.5*i)");
        let half = BigRational::new(1.into(), 2.into());
        let e = Arg::ExactComplex(Complex::new(BigRational::from_integer(2.into()), half));
        assert_eq!(format_arg(&e).unwrap(), "(2+1/2*i)");
    }

    #[test]
    fn strings_symbols_and_lists() {
        assert_eq!(format_arg(&Arg::Str("a\"b".into())).unwrap(), r#""a\"b""#);
        assert_eq!(format_arg(&Arg::symbol("x_1")).unwrap(), "x_1");
        assert_eq!(format_arg(&Arg::symbol("1x")).unwrap_err().code(), "ARG003");
        let m = Arg::matrix(vec![vec![1i64, 2], vec![3, 4]]);
        assert_eq!(format_arg(&m).unwrap(), "[[1,2],[3,4]]");
    }

    #[test]
    fn unsupported_arguments_fail_fast() {
        assert_eq!(format_arg(&Arg::Null).unwrap_err().code(), "ARG001");
        assert_eq!(format_arg(&Arg::Map(vec![])).unwrap_err().code(), "ARG002");
        let nested = Arg::List(vec![Arg::Int(1), Arg::Null]);
        assert_eq!(compose_call("size", &[nested]).unwrap_err().code(), "ARG001");
        assert_eq!(format_arg(&Arg::Expr(GiacExpr::null())).unwrap_err().code(), "MEM001");
    }

    #[test]
    fn call_string() {
        let call = compose_call("diff", &[Arg::code("x^3"), Arg::symbol("x")]).unwrap();
        assert_eq!(call, "diff(x^3,x)");
    }
}
