// パス: src/interchange/mathjson.rs
// 役割: GiacExpr と MathJSON（serde_json::Value）の相互変換
// 意図: 演算子名の対応を 1 つの静的表に集め、往復どちらの向きも同じ表から引く
// 関連ファイル: src/interchange/mod.rs, src/expr.rs, src/session.rs
//! MathJSON アダプタ
//!
//! - 出力側は `View` を再帰的にたどって JSON を組み立てる（エンジン実装に依存しない）。
//! - 入力側は GIAC 構文の文字列へ書き下してから `Session::eval` で評価する。
//! - 表にない演算子は `warn!` を出し、`lowercase(name)(args)` として評価を続ける。

use std::collections::HashMap;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;
use serde_json::{json, Map, Number, Value};
use tracing::warn;

use crate::engine::{Scalar, Subtype, View};
use crate::errors::{GiacError, GiacResult};
use crate::expr::GiacExpr;
use crate::invoke::{format_float, is_identifier, quote};
use crate::session::Session;

/// GIAC 側での書き方。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Form {
    /// `a op b op c`
    Infix(&'static str),
    /// `op(a)` に相当する前置演算子
    Prefix(&'static str),
    Call,
}

struct OpSpec {
    giac: &'static str,
    mathjson: &'static str,
    form: Form,
}

macro_rules! op_table {
    ($($giac:literal <=> $mj:literal $(as $form:expr)?;)+) => {
        const OPS: &[OpSpec] = &[
            $(OpSpec { giac: $giac, mathjson: $mj, form: op_table!(@form $($form)?) },)+
        ];
    };
    (@form) => { Form::Call };
    (@form $form:expr) => { $form };
}

op_table! {
    // 算術
    "+" <=> "Add" as Form::Infix("+");
    "*" <=> "Multiply" as Form::Infix("*");
    "^" <=> "Power" as Form::Infix("^");
    "-" <=> "Subtract" as Form::Infix("-");
    "/" <=> "Divide" as Form::Infix("/");
    "neg" <=> "Negate" as Form::Prefix("-");
    "inv" <=> "Inverse";
    "sqrt" <=> "Sqrt";
    "sq" <=> "Square";
    "surd" <=> "Root";
    "abs" <=> "Abs";
    "sign" <=> "Sign";
    "floor" <=> "Floor";
    "ceil" <=> "Ceil";
    "round" <=> "Round";
    "frac" <=> "FractionalPart";
    "max" <=> "Max";
    "min" <=> "Min";
    // 関係・論理
    "=" <=> "Equal" as Form::Infix("=");
    "==" <=> "IsSame" as Form::Infix("==");
    "!=" <=> "NotEqual" as Form::Infix("!=");
    "<" <=> "Less" as Form::Infix("<");
    "<=" <=> "LessEqual" as Form::Infix("<=");
    ">" <=> "Greater" as Form::Infix(">");
    ">=" <=> "GreaterEqual" as Form::Infix(">=");
    "and" <=> "And" as Form::Infix(" and ");
    "or" <=> "Or" as Form::Infix(" or ");
    "not" <=> "Not";
    "xor" <=> "Xor";
    "when" <=> "If";
    // 指数・対数
    "exp" <=> "Exp";
    "ln" <=> "Ln";
    "log10" <=> "Log";
    // 三角・双曲線
    "sin" <=> "Sin";
    "cos" <=> "Cos";
    "tan" <=> "Tan";
    "cot" <=> "Cot";
    "sec" <=> "Sec";
    "csc" <=> "Csc";
    "asin" <=> "Arcsin";
    "acos" <=> "Arccos";
    "atan" <=> "Arctan";
    "acot" <=> "Arccot";
    "asec" <=> "Arcsec";
    "acsc" <=> "Arccsc";
    "sinh" <=> "Sinh";
    "cosh" <=> "Cosh";
    "tanh" <=> "Tanh";
    "coth" <=> "Coth";
    "sech" <=> "Sech";
    "csch" <=> "Csch";
    "asinh" <=> "Arsinh";
    "acosh" <=> "Arcosh";
    "atanh" <=> "Artanh";
    "acoth" <=> "Arcoth";
    // 特殊関数
    "Gamma" <=> "Gamma";
    "lgamma" <=> "LogGamma";
    "Beta" <=> "Beta";
    "Zeta" <=> "Zeta";
    "Psi" <=> "Digamma";
    "erf" <=> "Erf";
    "erfc" <=> "Erfc";
    // 複素数
    "re" <=> "Real";
    "im" <=> "Imaginary";
    "conj" <=> "Conjugate";
    "arg" <=> "Argument";
    // 整数
    "factorial" <=> "Factorial";
    "comb" <=> "Binomial";
    "perm" <=> "Permutations";
    "gcd" <=> "GCD";
    "lcm" <=> "LCM";
    "iquo" <=> "Quotient";
    "irem" <=> "Remainder";
    "isprime" <=> "IsPrime";
    "nextprime" <=> "NextPrime";
    "prevprime" <=> "PreviousPrime";
    "ifactor" <=> "FactorInteger";
    "euler" <=> "Totient";
    "powmod" <=> "PowerMod";
    // 代数
    "expand" <=> "Expand";
    "factor" <=> "Factor";
    "simplify" <=> "Simplify";
    "normal" <=> "Together";
    "subst" <=> "Substitute";
    "numer" <=> "Numerator";
    "denom" <=> "Denominator";
    "evalf" <=> "N";
    "degree" <=> "Degree";
    "lcoeff" <=> "LeadingCoefficient";
    "quo" <=> "PolynomialQuotient";
    "rem" <=> "PolynomialRemainder";
    // 解析
    "diff" <=> "D";
    "integrate" <=> "Integrate";
    "limit" <=> "Limit";
    "sum" <=> "Sum";
    "product" <=> "Product";
    "solve" <=> "Solve";
    // リスト・統計
    "size" <=> "Length";
    "concat" <=> "Join";
    "append" <=> "Append";
    "revlist" <=> "Reverse";
    "sort" <=> "Sort";
    "head" <=> "First";
    "tail" <=> "Rest";
    "range" <=> "Range";
    "mean" <=> "Mean";
    "median" <=> "Median";
    "variance" <=> "Variance";
    "stddev" <=> "StandardDeviation";
    // 線形代数
    "det" <=> "Determinant";
    "tran" <=> "Transpose";
    "trace" <=> "Trace";
    "idn" <=> "IdentityMatrix";
    "dot" <=> "Dot";
    "cross" <=> "Cross";
    "string" <=> "String";
}

fn build_index(key: fn(&'static OpSpec) -> &'static str) -> HashMap<&'static str, &'static OpSpec> {
    let mut map = HashMap::with_capacity(OPS.len());
    for spec in OPS {
        let prev = map.insert(key(spec), spec);
        assert!(prev.is_none(), "MathJSON 演算子表に重複があります: {}", key(spec));
    }
    map
}

static BY_GIAC: Lazy<HashMap<&'static str, &'static OpSpec>> = Lazy::new(|| build_index(|s| s.giac));
static BY_MATHJSON: Lazy<HashMap<&'static str, &'static OpSpec>> =
    Lazy::new(|| build_index(|s| s.mathjson));

/// GIAC の識別子と MathJSON の定数記号の対応。
const CONSTANTS: &[(&str, &str)] = &[
    ("pi", "Pi"),
    ("e", "ExponentialE"),
    ("i", "ImaginaryUnit"),
    ("infinity", "PositiveInfinity"),
    ("undef", "Undefined"),
    ("true", "True"),
    ("false", "False"),
];

fn constant_to_mathjson(name: &str) -> Option<&'static str> {
    CONSTANTS.iter().find(|(g, _)| *g == name).map(|(_, m)| *m)
}

fn constant_from_mathjson(name: &str) -> Option<&'static str> {
    match name {
        "NegativeInfinity" => Some("-infinity"),
        "ComplexInfinity" => Some("infinity"),
        "NaN" => Some("undef"),
        _ => CONSTANTS.iter().find(|(_, m)| *m == name).map(|(g, _)| *g),
    }
}

/// 表に載っている演算子の数。
pub fn operator_count() -> usize {
    OPS.len()
}

/// GIAC の演算子・関数名に対応する MathJSON 名。
pub fn mathjson_name(giac: &str) -> Option<&'static str> {
    BY_GIAC.get(giac).map(|s| s.mathjson)
}

/// MathJSON の演算子名に対応する GIAC 名。
pub fn giac_name(mathjson: &str) -> Option<&'static str> {
    BY_MATHJSON.get(mathjson).map(|s| s.giac)
}

// ---- 出力側 ----

fn bigint_json(n: &BigInt) -> Value {
    match n.to_i64() {
        Some(i) => Value::from(i),
        None => json!({ "num": n.to_string() }),
    }
}

fn float_json(d: f64) -> Value {
    match Number::from_f64(d) {
        Some(n) => Value::Number(n),
        None if d.is_nan() => Value::from("NaN"),
        None if d > 0.0 => Value::from("PositiveInfinity"),
        None => Value::from("NegativeInfinity"),
    }
}

fn rational_json(q: &BigRational) -> Value {
    json!(["Rational", bigint_json(q.numer()), bigint_json(q.denom())])
}

fn scalar_json(s: &Scalar) -> Value {
    match s {
        Scalar::Int(n) => bigint_json(n),
        Scalar::Rational(q) => rational_json(q),
        Scalar::Float(d) => float_json(*d),
    }
}

fn is_unit(s: &Scalar) -> (bool, bool) {
    match s {
        Scalar::Int(n) => (n == &BigInt::from(0), n == &BigInt::from(1)),
        Scalar::Float(d) => (*d == 0.0, *d == 1.0),
        Scalar::Rational(_) => (false, false),
    }
}

/// GiacExpr を MathJSON へ書き出す。
pub fn to_mathjson(expr: &GiacExpr) -> GiacResult<Value> {
    let (view, children) = expr.view()?;
    Ok(match view {
        View::Bool(b) => Value::from(if b { "True" } else { "False" }),
        View::Int(i) => Value::from(i),
        View::Zint(n) => bigint_json(&n),
        View::Frac(q) => rational_json(&q),
        View::Float(d) => float_json(d),
        View::Cplx(re, im) => match (is_unit(&re), is_unit(&im)) {
            ((true, _), (_, true)) => Value::from("ImaginaryUnit"),
            _ => json!(["Complex", scalar_json(&re), scalar_json(&im)]),
        },
        View::Idnt(name) => Value::from(constant_to_mathjson(&name).unwrap_or(name.as_str())),
        View::Str(s) => json!({ "str": s }),
        View::Vect { subtype, .. } => {
            let mut items = vec![Value::from(if subtype == Subtype::Matrix { "Matrix" } else { "List" })];
            if subtype == Subtype::Matrix {
                let rows = children
                    .iter()
                    .map(|row| {
                        let mut r = vec![Value::from("List")];
                        r.extend(row.children()?.iter().map(to_mathjson).collect::<GiacResult<Vec<_>>>()?);
                        Ok(Value::Array(r))
                    })
                    .collect::<GiacResult<Vec<_>>>()?;
                let mut list = vec![Value::from("List")];
                list.extend(rows);
                items.push(Value::Array(list));
            } else {
                items.extend(children.iter().map(to_mathjson).collect::<GiacResult<Vec<_>>>()?);
            }
            Value::Array(items)
        }
        View::Symb { op, .. } => {
            let args = children.iter().map(to_mathjson).collect::<GiacResult<Vec<_>>>()?;
            symbolic_json(&op, args)
        }
        View::Other(tag) => {
            return Err(GiacError::type_error(
                "JSON010",
                format!("型 `{}` の値は MathJSON で表現できません", tag.name()),
            ))
        }
    })
}

fn symbolic_json(op: &str, mut args: Vec<Value>) -> Value {
    // 積 -1*x は Negate として書き出す
    if op == "*" && args.len() == 2 && args[0] == Value::from(-1) {
        return json!(["Negate", args.remove(1)]);
    }
    let head = mathjson_name(op).unwrap_or(op);
    let mut out = Vec::with_capacity(args.len() + 1);
    out.push(Value::from(head));
    out.extend(args);
    Value::Array(out)
}

// ---- 入力側 ----

fn malformed(msg: impl Into<String>) -> GiacError {
    GiacError::parse("JSON020", msg)
}

fn number_source(n: &Number) -> String {
    match (n.as_i64(), n.as_u64(), n.as_f64()) {
        (Some(i), _, _) => i.to_string(),
        (None, Some(u), _) => u.to_string(),
        (_, _, Some(d)) => format_float(d),
        _ => n.to_string(),
    }
}

fn symbol_source(name: &str) -> GiacResult<String> {
    if let Some(c) = constant_from_mathjson(name) {
        return Ok(c.to_string());
    }
    if let Some(inner) = name.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return Ok(quote(inner));
    }
    if is_identifier(name) {
        return Ok(name.to_string());
    }
    Err(malformed(format!("`{name}` は記号として解釈できません")))
}

fn object_source(map: &Map<String, Value>) -> GiacResult<String> {
    if let Some(num) = map.get("num") {
        let text = num.as_str().ok_or_else(|| malformed("`num` は文字列で指定してください"))?;
        return match text {
            "NaN" => Ok("undef".to_string()),
            "+Infinity" | "Infinity" => Ok("infinity".to_string()),
            "-Infinity" => Ok("-infinity".to_string()),
            _ if text.parse::<BigInt>().is_ok() || text.parse::<f64>().is_ok() => {
                Ok(text.to_string())
            }
            _ => Err(GiacError::parse("JSON030", format!("`{text}` は数値ではありません"))),
        };
    }
    if let Some(s) = map.get("str") {
        let s = s.as_str().ok_or_else(|| malformed("`str` は文字列で指定してください"))?;
        return Ok(quote(s));
    }
    if let Some(sym) = map.get("sym") {
        let sym = sym.as_str().ok_or_else(|| malformed("`sym` は文字列で指定してください"))?;
        return symbol_source(sym);
    }
    if let Some(Value::Array(items)) = map.get("fn") {
        return function_source(items);
    }
    Err(malformed("`num`・`str`・`sym`・`fn` のいずれも持たないオブジェクトです"))
}

fn join_args(args: &[String]) -> String {
    args.join(",")
}

/// 識別子と符号なしの数値以外は括弧で包む。
fn paren(a: &str) -> String {
    let atom = is_identifier(a)
        || (!a.is_empty() && a.chars().all(|c| c.is_ascii_digit() || c == '.'))
        || (a.starts_with('[') && a.ends_with(']'))
        || (a.starts_with('"') && a.ends_with('"'));
    if atom {
        a.to_string()
    } else {
        format!("({a})")
    }
}

fn function_source(items: &[Value]) -> GiacResult<String> {
    let (head, rest) = items.split_first().ok_or_else(|| malformed("空の関数式です"))?;
    let head = head.as_str().ok_or_else(|| malformed("関数式の先頭は演算子名の文字列です"))?;
    let args = rest.iter().map(source_of).collect::<GiacResult<Vec<_>>>()?;
    match head {
        "List" | "Sequence" | "Set" => return Ok(format!("[{}]", join_args(&args))),
        "Matrix" => {
            return match args.as_slice() {
                [rows] => Ok(rows.clone()),
                _ => Err(malformed("Matrix は行リストを 1 つだけ取ります")),
            }
        }
        "Rational" => {
            return match args.as_slice() {
                [p, q] => Ok(format!("{}/{}", paren(p), paren(q))),
                _ => Err(malformed("Rational は 2 引数です")),
            }
        }
        "Complex" => {
            return match args.as_slice() {
                [re, im] => Ok(format!("{}+{}*i", paren(re), paren(im))),
                _ => Err(malformed("Complex は 2 引数です")),
            }
        }
        "Half" => {
            return match args.as_slice() {
                [x] => Ok(format!("{}/2", paren(x))),
                _ => Err(malformed("Half は 1 引数です")),
            }
        }
        _ => {}
    }
    let Some(spec) = BY_MATHJSON.get(head) else {
        let name = fallback_name(head);
        warn!(
            target: "giac::interchange",
            operator = head,
            fallback = name.as_str(),
            "unsupported MathJSON operator"
        );
        return Ok(format!("{name}({})", join_args(&args)));
    };
    Ok(match spec.form {
        Form::Infix(op) => match args.as_slice() {
            [] => return Err(malformed(format!("{head} には引数が必要です"))),
            [x] if op == "-" => format!("-{}", paren(x)),
            [x] => x.clone(),
            _ => args.iter().map(|a| paren(a)).collect::<Vec<_>>().join(op),
        },
        Form::Prefix(op) => match args.as_slice() {
            [x] => format!("{op}{}", paren(x)),
            _ => return Err(malformed(format!("{head} は 1 引数です"))),
        },
        Form::Call => format!("{}({})", spec.giac, join_args(&args)),
    })
}

/// 未知の演算子名を GIAC の識別子へ写す。小文字化し、識別子に使えない文字は `_` にする。
fn fallback_name(head: &str) -> String {
    let mut name: String = head
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

/// MathJSON の値を GIAC 構文の文字列へ書き下す。
pub fn to_giac_source(value: &Value) -> GiacResult<String> {
    source_of(value)
}

fn source_of(value: &Value) -> GiacResult<String> {
    match value {
        Value::Number(n) => Ok(number_source(n)),
        Value::String(s) => symbol_source(s),
        Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
        Value::Null => Err(malformed("null は MathJSON の式ではありません")),
        Value::Object(map) => object_source(map),
        Value::Array(items) => function_source(items),
    }
}

/// MathJSON を読み込み、セッション上で評価したハンドルを返す。
pub fn from_mathjson(session: &Session, value: &Value) -> GiacResult<GiacExpr> {
    let src = source_of(value)?;
    session.eval(&src)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_table_is_bidirectional() {
        assert!(operator_count() >= 100);
        for spec in OPS {
            assert_eq!(giac_name(spec.mathjson), Some(spec.giac));
            assert_eq!(mathjson_name(spec.giac), Some(spec.mathjson));
        }
    }

    #[test]
    fn writes_giac_source() {
        let v = json!(["Add", ["Power", "x", 2], ["Negate", 1]]);
        assert_eq!(to_giac_source(&v).unwrap(), "(x^2)+(-1)");
        let v = json!(["Rational", -3, 4]);
        assert_eq!(to_giac_source(&v).unwrap(), "(-3)/4");
        let v = json!(["Sin", "Pi"]);
        assert_eq!(to_giac_source(&v).unwrap(), "sin(pi)");
        let v = json!(["List", {"num": "123456789012345678901234567890"}, {"str": "a"}]);
        assert_eq!(
            to_giac_source(&v).unwrap(),
            "[123456789012345678901234567890,\"a\"]"
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(to_giac_source(&Value::Null).unwrap_err().code(), "JSON020");
        assert_eq!(to_giac_source(&json!([])).unwrap_err().code(), "JSON020");
        assert_eq!(to_giac_source(&json!({"num": "abc"})).unwrap_err().code(), "JSON030");
        assert_eq!(to_giac_source(&json!("a b")).unwrap_err().code(), "JSON020");
    }

    #[test]
    fn unknown_operators_fall_back_to_lowercase_calls() {
        let v = json!(["Frobnicate", "x", 1]);
        assert_eq!(to_giac_source(&v).unwrap(), "frobnicate(x,1)");
        let v = json!(["Foo Bar", "x"]);
        assert_eq!(to_giac_source(&v).unwrap(), "foo_bar(x)");
        let v = json!(["2D-Rotate", "x"]);
        assert_eq!(to_giac_source(&v).unwrap(), "_2d_rotate(x)");
        assert!(is_identifier(&fallback_name("Ünïcode")));
        assert!(is_identifier(&fallback_name("")));
    }
}
