// パス: src/engine/builtin/parser.rs
// 役割: トークン列から未評価の式（`Gen`）を生成する再帰下降パーサ
// 意図: 字句解析結果を評価器へ直接渡せる構造へ変換する
// 関連ファイル: src/engine/builtin/lexer.rs, src/engine/builtin/eval.rs
//! 構文解析モジュール
//!
//! - 二項演算子の結合規則・優先順位は `INFIX_LEVELS` の表で管理する。
//! - 優先順位は低い順に `:=`, `or`, `and`, 比較, `+ -`, `* /`, 単項 `-`, `^`, 後置。
//! - 出力は未評価の `Gen::Symb`（`"-"`, `"/"`, `"neg"` などの構文ノードを含む）。
//! - 入れ子の深さは `MAX_NESTING` までで、超えると `PAR030` を返す。

use num_bigint::BigInt;

use super::gen::{num_neg, Gen};
use super::lexer::{error_at, lex, Token, TokenKind};
use crate::engine::Subtype;
use crate::errors::GiacError;

/// 括弧・単項演算子・冪の入れ子の上限。
const MAX_NESTING: usize = 100;

#[derive(Clone, Copy)]
enum Assoc {
    Left,
    Non,
}

struct InfixSpec {
    tokens: &'static [TokenKind],
    assoc: Assoc,
}

impl InfixSpec {
    fn contains(&self, kind: TokenKind) -> bool {
        self.tokens.contains(&kind)
    }
}

const INFIX_LEVELS: &[InfixSpec] = &[
    InfixSpec {
        tokens: &[TokenKind::OR],
        assoc: Assoc::Left,
    },
    InfixSpec {
        tokens: &[TokenKind::AND],
        assoc: Assoc::Left,
    },
    InfixSpec {
        tokens: &[
            TokenKind::EQUAL,
            TokenKind::EQ,
            TokenKind::NE,
            TokenKind::LT,
            TokenKind::LE,
            TokenKind::GT,
            TokenKind::GE,
        ],
        assoc: Assoc::Non,
    },
    InfixSpec {
        tokens: &[TokenKind::PLUS, TokenKind::MINUS],
        assoc: Assoc::Left,
    },
    InfixSpec {
        tokens: &[TokenKind::STAR, TokenKind::SLASH],
        assoc: Assoc::Left,
    },
];

fn op_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::OR => "or",
        TokenKind::AND => "and",
        TokenKind::EQUAL => "=",
        TokenKind::EQ => "==",
        TokenKind::NE => "!=",
        TokenKind::LT => "<",
        TokenKind::LE => "<=",
        TokenKind::GT => ">",
        TokenKind::GE => ">=",
        TokenKind::PLUS => "+",
        TokenKind::MINUS => "-",
        TokenKind::STAR => "*",
        TokenKind::SLASH => "/",
        _ => "^",
    }
}

/// 再帰下降パーサの進行状態。
pub(crate) struct Parser<'a> {
    src: &'a str,
    ts: Vec<Token>,
    i: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            src,
            ts: tokens,
            i: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> &Token {
        &self.ts[self.i.min(self.ts.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn pop_any(&mut self) -> Token {
        let t = self.peek().clone();
        if self.i < self.ts.len() - 1 {
            self.i += 1;
        }
        t
    }

    fn pop(&mut self, kind: TokenKind) -> Result<Token, GiacError> {
        if self.kind() != kind {
            let t = self.peek();
            return Err(error_at(
                self.src,
                "PAR001",
                format!("{:?} を期待しましたが {:?} ({})", kind, t.kind, t.value),
                t,
            ));
        }
        Ok(self.pop_any())
    }

    fn accept(&mut self, kind: TokenKind) -> bool {
        if self.kind() == kind {
            self.pop_any();
            true
        } else {
            false
        }
    }

    /// `;` 区切りの文の列を解析する。
    fn parse_program(&mut self) -> Result<Vec<Gen>, GiacError> {
        let mut stmts = Vec::new();
        loop {
            while self.accept(TokenKind::SEMI) {}
            if self.kind() == TokenKind::EOF {
                break;
            }
            stmts.push(self.parse_sequence()?);
            if self.kind() != TokenKind::EOF {
                self.pop(TokenKind::SEMI)?;
            }
        }
        if stmts.is_empty() {
            let t = self.peek();
            return Err(error_at(self.src, "PAR010", "空の入力は評価できません", t));
        }
        Ok(stmts)
    }

    /// `a, b, c` をシーケンスとしてまとめる。
    fn parse_sequence(&mut self) -> Result<Gen, GiacError> {
        let first = self.parse_assign()?;
        if self.kind() != TokenKind::COMMA {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.accept(TokenKind::COMMA) {
            items.push(self.parse_assign()?);
        }
        Ok(Gen::Vect(items, Subtype::Sequence))
    }

    fn parse_assign(&mut self) -> Result<Gen, GiacError> {
        let lhs = self.parse_infix_level(0)?;
        if self.accept(TokenKind::ASSIGN) {
            let rhs = self.parse_assign()?;
            return Ok(Gen::symb(":=", vec![lhs, rhs]));
        }
        Ok(lhs)
    }

    fn parse_infix_level(&mut self, level: usize) -> Result<Gen, GiacError> {
        if level >= INFIX_LEVELS.len() {
            return self.parse_unary();
        }
        let spec = &INFIX_LEVELS[level];
        let mut left = self.parse_infix_level(level + 1)?;
        match spec.assoc {
            Assoc::Left => {
                while spec.contains(self.kind()) {
                    let op = self.pop_any();
                    let right = self.parse_infix_level(level + 1)?;
                    left = Gen::symb(op_name(op.kind), vec![left, right]);
                }
                Ok(left)
            }
            Assoc::Non => {
                if spec.contains(self.kind()) {
                    let op = self.pop_any();
                    let right = self.parse_infix_level(level + 1)?;
                    left = Gen::symb(op_name(op.kind), vec![left, right]);
                }
                Ok(left)
            }
        }
    }

    /// 再帰はすべてここを通るので、入れ子の深さもここで数える。
    fn parse_unary(&mut self) -> Result<Gen, GiacError> {
        self.depth += 1;
        let result = if self.depth > MAX_NESTING {
            Err(error_at(
                self.src,
                "PAR030",
                format!("式の入れ子が深すぎます（上限 {MAX_NESTING}）"),
                self.peek(),
            ))
        } else {
            self.parse_unary_inner()
        };
        self.depth -= 1;
        result
    }

    fn parse_unary_inner(&mut self) -> Result<Gen, GiacError> {
        match self.kind() {
            TokenKind::MINUS => {
                self.pop_any();
                let inner = self.parse_unary()?;
                if inner.is_number() {
                    return Ok(num_neg(&inner));
                }
                Ok(Gen::symb("neg", vec![inner]))
            }
            TokenKind::PLUS => {
                self.pop_any();
                self.parse_unary()
            }
            TokenKind::NOT => {
                self.pop_any();
                let inner = self.parse_unary()?;
                Ok(Gen::symb("not", vec![inner]))
            }
            _ => self.parse_power(),
        }
    }

    /// `^` は右結合で、指数側は単項マイナスを許す（`x^-1`）。
    fn parse_power(&mut self) -> Result<Gen, GiacError> {
        let base = self.parse_postfix()?;
        if matches!(self.kind(), TokenKind::CARET | TokenKind::DBLSTAR) {
            self.pop_any();
            let exp = self.parse_unary()?;
            return Ok(Gen::symb("^", vec![base, exp]));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Gen, GiacError> {
        let mut e = self.parse_atom()?;
        loop {
            match self.kind() {
                TokenKind::BANG => {
                    self.pop_any();
                    e = Gen::symb("factorial", vec![e]);
                }
                TokenKind::LBRACK => {
                    self.pop_any();
                    let idx = self.parse_sequence()?;
                    self.pop(TokenKind::RBRACK)?;
                    e = Gen::symb("at", vec![e, idx]);
                }
                _ => return Ok(e),
            }
        }
    }

    fn parse_args(&mut self, close: TokenKind) -> Result<Vec<Gen>, GiacError> {
        let mut args = Vec::new();
        if self.accept(close) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_assign()?);
            if self.accept(TokenKind::COMMA) {
                continue;
            }
            self.pop(close)?;
            return Ok(args);
        }
    }

    fn parse_atom(&mut self) -> Result<Gen, GiacError> {
        let t = self.pop_any();
        match t.kind {
            TokenKind::INT => match t.value.parse::<BigInt>() {
                Ok(n) => Ok(Gen::Int(n)),
                Err(_) => Err(error_at(self.src, "PAR020", "整数リテラルを解釈できません", &t)),
            },
            TokenKind::FLOAT => match t.value.parse::<f64>() {
                Ok(d) => Ok(Gen::Double(d)),
                Err(_) => Err(error_at(self.src, "PAR021", "浮動小数リテラルを解釈できません", &t)),
            },
            TokenKind::STRING => Ok(Gen::Str(t.value)),
            TokenKind::IDENT => {
                if self.accept(TokenKind::LPAREN) {
                    let args = self.parse_args(TokenKind::RPAREN)?;
                    return Ok(Gen::Symb(t.value, args));
                }
                Ok(match t.value.as_str() {
                    "i" => Gen::imaginary_unit(),
                    "true" => Gen::Bool(true),
                    "false" => Gen::Bool(false),
                    _ => Gen::Idnt(t.value),
                })
            }
            TokenKind::LPAREN => {
                let inner = self.parse_sequence()?;
                self.pop(TokenKind::RPAREN)?;
                Ok(inner)
            }
            TokenKind::LBRACK => {
                let items = self.parse_args(TokenKind::RBRACK)?;
                Ok(Gen::list(items))
            }
            _ => Err(error_at(
                self.src,
                "PAR090",
                format!("予期しないトークン {:?} ({})", t.kind, t.value),
                &t,
            )),
        }
    }
}

/// ソース全体を `;` 区切りの未評価式の列へ変換する。
pub(crate) fn parse_program(src: &str) -> Result<Vec<Gen>, GiacError> {
    let tokens = lex(src)?;
    Parser::new(src, tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(src: &str) -> Gen {
        let mut v = parse_program(src).unwrap();
        assert_eq!(v.len(), 1);
        v.remove(0)
    }

    #[test]
    fn precedence_table_orders_operators() {
        // 1 + 2*x^3
        let e = one("1+2*x^3");
        let Gen::Symb(op, args) = e else { panic!("symb") };
        assert_eq!(op, "+");
        assert!(args[1].is_op("*"));
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        let e = one("-x^2");
        assert!(e.is_op("neg"));
        assert_eq!(one("-3"), Gen::int(-3));
    }

    #[test]
    fn calls_lists_and_sequences() {
        assert!(one("factor(x^2-1)").is_op("factor"));
        assert!(matches!(one("[1,2,[3]]"), Gen::Vect(ref v, Subtype::List) if v.len() == 3));
        assert!(matches!(one("1,2"), Gen::Vect(_, Subtype::Sequence)));
        assert_eq!(one("i"), Gen::imaginary_unit());
    }

    #[test]
    fn statements_split_on_semicolons() {
        let v = parse_program("a:=2; a+1;").unwrap();
        assert_eq!(v.len(), 2);
        assert!(v[0].is_op(":="));
    }

    #[test]
    fn errors_carry_codes() {
        assert_eq!(parse_program("(1+2").unwrap_err().code(), "PAR001");
        assert_eq!(parse_program("1+*2").unwrap_err().code(), "PAR090");
        assert_eq!(parse_program("  ").unwrap_err().code(), "PAR010");
    }

    #[test]
    fn deep_nesting_is_a_parse_error() {
        let ok = format!("{}x{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(one(&ok), Gen::idnt("x"));
        let deep = format!("{}x{}", "(".repeat(5000), ")".repeat(5000));
        assert_eq!(parse_program(&deep).unwrap_err().code(), "PAR030");
        let minus = format!("{}x", "-".repeat(5000));
        assert_eq!(parse_program(&minus).unwrap_err().code(), "PAR030");
        let tower = vec!["x"; 5000].join("^");
        assert_eq!(parse_program(&tower).unwrap_err().code(), "PAR030");
    }
}
