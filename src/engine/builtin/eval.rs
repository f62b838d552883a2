// パス: src/engine/builtin/eval.rs
// 役割: 未評価の式を評価し、演算子とビルトインコマンドへ振り分ける
// 意図: 構文ノード（`-`, `/`, `neg` など）を正規形の演算へ落とし、コマンド表で一元的に呼び出す
// 関連ファイル: src/engine/builtin/commands.rs, src/engine/builtin/parser.rs, src/engine/builtin/mod.rs
//! 評価器
//!
//! - 変数への代入（`:=`）は評価済みの値を保存し、参照時に再評価しない。
//! - 引数中のシーケンスは展開してから関数へ渡す（`f((1,2))` は `f(1,2)`）。
//! - コマンド表にない関数呼び出しは GIAC と同じく未評価のまま返す。

use std::collections::HashMap;

use num_traits::ToPrimitive;

use super::commands;
use super::gen::Gen;
use super::ops::{add_all, compare, div, logic, mul, mul_all, neg, pow, sub};
use crate::engine::Subtype;
use crate::errors::{GiacError, GiacResult};

const MAX_DEPTH: usize = 512;

/// 変数環境と再帰深さを持つ評価器。
#[derive(Debug, Default)]
pub(crate) struct Evaluator {
    vars: HashMap<String, Gen>,
    depth: usize,
}

impl Evaluator {
    pub fn purge(&mut self, name: &str) -> Option<Gen> {
        self.vars.remove(name)
    }

    pub fn eval(&mut self, g: Gen) -> GiacResult<Gen> {
        self.depth += 1;
        let result = if self.depth > MAX_DEPTH {
            Err(GiacError::eval("EVAL090", "式の入れ子が深すぎます"))
        } else {
            self.eval_inner(g)
        };
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, g: Gen) -> GiacResult<Gen> {
        match g {
            Gen::Idnt(name) => Ok(self.vars.get(&name).cloned().unwrap_or(Gen::Idnt(name))),
            Gen::Cplx(re, im) => {
                let re = self.eval(*re)?;
                let im = self.eval(*im)?;
                Ok(Gen::complex(re, im))
            }
            Gen::Vect(items, sub) => {
                let items = self.eval_args(items)?;
                Ok(Gen::Vect(items, sub))
            }
            Gen::Symb(op, args) => match op.as_str() {
                ":=" => self.assign(args),
                "purge" => {
                    let mut out = Vec::with_capacity(args.len());
                    for a in args {
                        match a {
                            Gen::Idnt(n) => out.push(self.purge(&n).unwrap_or(Gen::Idnt(n))),
                            other => out.push(other),
                        }
                    }
                    Ok(single_or_sequence(out))
                }
                _ => {
                    let args = self.eval_args(args)?;
                    self.apply(&op, args)
                }
            },
            other => Ok(other),
        }
    }

    fn assign(&mut self, mut args: Vec<Gen>) -> GiacResult<Gen> {
        let (Some(rhs), Some(lhs)) = (args.pop(), args.pop()) else {
            return Err(GiacError::eval("EVAL010", ":= には 2 つの引数が必要です"));
        };
        let Gen::Idnt(name) = lhs else {
            return Err(GiacError::eval(
                "EVAL020",
                "代入の左辺は識別子でなければなりません",
            ));
        };
        let value = self.eval(rhs)?;
        self.vars.insert(name, value.clone());
        Ok(value)
    }

    fn eval_args(&mut self, args: Vec<Gen>) -> GiacResult<Vec<Gen>> {
        let mut out = Vec::with_capacity(args.len());
        for a in args {
            match self.eval(a)? {
                Gen::Vect(items, Subtype::Sequence) => out.extend(items),
                v => out.push(v),
            }
        }
        Ok(out)
    }

    /// 評価済みの引数で演算子またはコマンドを適用する。
    pub fn apply(&mut self, op: &str, mut args: Vec<Gen>) -> GiacResult<Gen> {
        let value = match (op, args.len()) {
            ("+", _) => add_all(args),
            // 行列・ベクトルを含む積は左から順に畳み込む
            ("*", _) if args.iter().any(|a| matches!(a, Gen::Vect(..))) => {
                args.into_iter().reduce(mul).unwrap_or_else(Gen::one)
            }
            ("*", _) => mul_all(args),
            ("-", 1) | ("neg", 1) => neg(args.remove(0)),
            ("-", 2) => {
                let b = args.remove(1);
                sub(args.remove(0), b)
            }
            ("/", 2) => {
                let b = args.remove(1);
                div(args.remove(0), b)
            }
            ("^", 2) => {
                let b = args.remove(1);
                pow(args.remove(0), b)
            }
            ("==" | "!=" | "<" | "<=" | ">" | ">=", 2) => {
                let b = args.remove(1);
                compare(op, args.remove(0), b)
            }
            ("=", 2) => Gen::symb("=", args),
            ("and" | "or" | "not", _) => logic(op, args),
            ("at", 2) => index(args.remove(0), args.remove(0))?,
            _ => match commands::lookup(op) {
                Some(spec) => {
                    spec.check_arity(args.len())?;
                    (spec.f)(self, args)?
                }
                None => Gen::Symb(op.to_string(), args),
            },
        };
        Ok(value)
    }
}

fn single_or_sequence(mut items: Vec<Gen>) -> Gen {
    if items.len() == 1 {
        items.remove(0)
    } else {
        Gen::Vect(items, Subtype::Sequence)
    }
}

/// `l[i]`（0 始まり）。
fn index(target: Gen, idx: Gen) -> GiacResult<Gen> {
    match (&target, idx.as_bigint().and_then(ToPrimitive::to_usize)) {
        (Gen::Vect(items, _), Some(i)) => items.get(i).cloned().ok_or_else(|| {
            GiacError::eval(
                "EVAL021",
                format!("添字 {} は範囲外です（長さ {}）", i, items.len()),
            )
        }),
        (Gen::Str(s), Some(i)) => s
            .chars()
            .nth(i)
            .map(|c| Gen::Str(c.to_string()))
            .ok_or_else(|| GiacError::eval("EVAL021", format!("添字 {} は範囲外です", i))),
        _ => Ok(Gen::symb("at", vec![target, idx])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::builtin::parser::parse_program;
    use crate::engine::builtin::printer::print;

    fn run(src: &str) -> String {
        let mut ev = Evaluator::default();
        let mut last = Gen::zero();
        for stmt in parse_program(src).unwrap() {
            last = ev.eval(stmt).unwrap();
        }
        print(&last)
    }

    #[test]
    fn arithmetic_follows_exact_rules() {
        let cases = [
            ("1/2+1/3", "5/6"),
            ("2^100", "1267650600228229401496703205376"),
            ("(1+2*i)*(1-2*i)", "5"),
            ("1.5+1", "2.5"),
            ("x+x", "2*x"),
            ("x-1-(x+1)", "-2"),
            ("3 < 4", "true"),
        ];
        for (src, want) in cases {
            assert_eq!(run(src), want, "{src}");
        }
    }

    #[test]
    fn assignment_and_purge() {
        assert_eq!(run("a:=3; a^2"), "9");
        assert_eq!(run("a:=3; purge(a); a"), "a");
    }

    #[test]
    fn unknown_functions_stay_unevaluated() {
        assert_eq!(run("foo(1,x)"), "foo(1,x)");
    }

    #[test]
    fn indexing_is_zero_based() {
        assert_eq!(run("[10,20,30][1]"), "20");
        let mut ev = Evaluator::default();
        let stmt = parse_program("[1][5]").unwrap().remove(0);
        assert_eq!(ev.eval(stmt).unwrap_err().code(), "EVAL021");
    }
}
