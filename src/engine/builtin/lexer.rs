// パス: src/engine/builtin/lexer.rs
// 役割: GIAC 構文の字句解析器とトークン定義を提供する
// 意図: 位置情報付きのトークン列を作り、構文エラーの行・列表示に使えるようにする
// 関連ファイル: src/engine/builtin/parser.rs, src/errors.rs
//! 字句解析モジュール
//!
//! - GIAC の式構文（演算子・関数呼び出し・リスト・文字列）をトークン列へ変換する。
//! - すべてのトークンに行・列・バイト位置を記録し、診断情報と連携させる。
//! - `//` から行末まではコメントとして読み飛ばす。

use crate::errors::{ErrorInfo, GiacError};

#[derive(Debug, Clone, PartialEq, Eq)]
/// 生成されたトークンとその位置情報を保持するレコード。
pub(crate) struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: usize,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// 字句解析で識別されるトークンの分類。
pub(crate) enum TokenKind {
    EOF,
    // 演算子・記号トークン
    ASSIGN, // `:=`
    LE,
    GE,
    EQ,
    NE,
    LT,
    GT,
    EQUAL,
    PLUS,
    MINUS,
    DBLSTAR,
    STAR,
    SLASH,
    CARET,
    BANG,
    LPAREN,
    RPAREN,
    LBRACK,
    RBRACK,
    COMMA,
    SEMI,
    // リテラル分類
    STRING,
    FLOAT,
    INT,
    IDENT,
    // キーワード分類
    AND,
    OR,
    NOT,
}

#[derive(Debug)]
/// 各行の先頭オフセット。
struct LineMap {
    starts: Vec<usize>,
}

impl LineMap {
    fn new(src: &str) -> Self {
        let mut starts = vec![0];
        for (idx, ch) in src.char_indices() {
            if ch == '\n' {
                starts.push(idx + 1);
            }
        }
        Self { starts }
    }

    /// バイト位置 → (行, 列)。
    fn locate(&self, src: &str, pos: usize) -> (usize, usize) {
        let idx = match self.starts.binary_search(&pos) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let start = self.starts[idx];
        let col = src[start..pos.min(src.len())].chars().count() + 1;
        (idx + 1, col)
    }

    /// 行番号の本文（改行なし）。
    fn line_text<'a>(&self, src: &'a str, line: usize) -> &'a str {
        let Some(&start) = line.checked_sub(1).and_then(|i| self.starts.get(i)) else {
            return "";
        };
        let end = self.starts.get(line).copied().unwrap_or(src.len());
        let slice = &src[start..end];
        slice.strip_suffix('\n').unwrap_or(slice)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_rest(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Lexer<'a> {
    src: &'a str,
    cursor: usize,
    line_map: LineMap,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            cursor: 0,
            line_map: LineMap::new(src),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, GiacError> {
        loop {
            self.consume_trivia();
            let Some(ch) = self.peek_char() else {
                break;
            };
            self.lex_token(ch)?;
        }
        self.push_slice(TokenKind::EOF, self.src.len(), self.src.len());
        Ok(self.tokens)
    }

    fn consume_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.cursor += c.len_utf8();
                }
                Some('/') if self.src[self.cursor..].starts_with("//") => {
                    let rest = &self.src[self.cursor..];
                    self.cursor += rest.find('\n').unwrap_or(rest.len());
                }
                _ => break,
            }
        }
    }

    fn lex_token(&mut self, ch: char) -> Result<(), GiacError> {
        let start = self.cursor;
        if self.try_symbol() {
            return Ok(());
        }
        if ch == '"' {
            return self.lex_string_literal();
        }
        if ch.is_ascii_digit() || (ch == '.' && self.second_is_digit()) {
            self.lex_number();
            return Ok(());
        }
        if is_ident_start(ch) {
            self.lex_identifier_or_keyword();
            return Ok(());
        }
        Err(self.err("PAR091", format!("解釈できない文字 {:?}", ch), start))
    }

    fn try_symbol(&mut self) -> bool {
        const SYMBOLS: &[(&str, TokenKind)] = &[
            (":=", TokenKind::ASSIGN),
            ("<=", TokenKind::LE),
            (">=", TokenKind::GE),
            ("==", TokenKind::EQ),
            ("!=", TokenKind::NE),
            ("**", TokenKind::DBLSTAR),
            ("&&", TokenKind::AND),
            ("||", TokenKind::OR),
            ("<", TokenKind::LT),
            (">", TokenKind::GT),
            ("=", TokenKind::EQUAL),
            ("+", TokenKind::PLUS),
            ("-", TokenKind::MINUS),
            ("*", TokenKind::STAR),
            ("/", TokenKind::SLASH),
            ("^", TokenKind::CARET),
            ("!", TokenKind::BANG),
            ("(", TokenKind::LPAREN),
            (")", TokenKind::RPAREN),
            ("[", TokenKind::LBRACK),
            ("]", TokenKind::RBRACK),
            (",", TokenKind::COMMA),
            (";", TokenKind::SEMI),
        ];
        let rest = &self.src[self.cursor..];
        for (text, kind) in SYMBOLS {
            if rest.starts_with(text) {
                let start = self.cursor;
                self.cursor += text.len();
                self.push_slice(*kind, start, self.cursor);
                return true;
            }
        }
        false
    }

    fn lex_string_literal(&mut self) -> Result<(), GiacError> {
        let start = self.cursor;
        self.cursor += 1; // 開始ダブルクォート
        let mut value = String::new();
        let mut escaped = false;
        while let Some(ch) = self.peek_char() {
            self.cursor += ch.len_utf8();
            if escaped {
                value.push(match ch {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '"' => {
                    let (line, col) = self.line_map.locate(self.src, start);
                    self.tokens.push(Token {
                        kind: TokenKind::STRING,
                        value,
                        pos: start,
                        line,
                        col,
                    });
                    return Ok(());
                }
                other => value.push(other),
            }
        }
        Err(self.err("PAR003", "文字列リテラルが閉じていません", start))
    }

    fn lex_number(&mut self) {
        let start = self.cursor;
        self.eat_digits();
        let mut is_float = false;
        if self.peek_char() == Some('.') {
            is_float = true;
            self.cursor += 1;
            self.eat_digits();
        }
        if let Some('e' | 'E') = self.peek_char() {
            let mut scan = self.cursor + 1;
            if let Some(b'+' | b'-') = self.src.as_bytes().get(scan) {
                scan += 1;
            }
            let digits = self.src[scan..]
                .bytes()
                .take_while(u8::is_ascii_digit)
                .count();
            if digits > 0 {
                is_float = true;
                self.cursor = scan + digits;
            }
        }
        let kind = if is_float {
            TokenKind::FLOAT
        } else {
            TokenKind::INT
        };
        self.push_slice(kind, start, self.cursor);
    }

    fn eat_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.cursor += 1;
            } else {
                break;
            }
        }
    }

    fn lex_identifier_or_keyword(&mut self) {
        let start = self.cursor;
        while let Some(c) = self.peek_char() {
            if is_ident_rest(c) {
                self.cursor += c.len_utf8();
            } else {
                break;
            }
        }
        let kind = match &self.src[start..self.cursor] {
            "and" => TokenKind::AND,
            "or" => TokenKind::OR,
            "not" => TokenKind::NOT,
            _ => TokenKind::IDENT,
        };
        self.push_slice(kind, start, self.cursor);
    }

    fn push_slice(&mut self, kind: TokenKind, start: usize, end: usize) {
        let (line, col) = self.line_map.locate(self.src, start);
        self.tokens.push(Token {
            kind,
            value: self.src[start..end].into(),
            pos: start,
            line,
            col,
        });
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.cursor..].chars().next()
    }

    fn second_is_digit(&self) -> bool {
        let mut it = self.src[self.cursor..].chars();
        it.next();
        it.next().is_some_and(|c| c.is_ascii_digit())
    }

    fn err(&self, code: &'static str, message: impl Into<String>, pos: usize) -> GiacError {
        let (line, col) = self.line_map.locate(self.src, pos);
        GiacError::Parse(
            ErrorInfo::at(code, message, Some(pos), Some(line), Some(col))
                .with_snippet(self.line_map.line_text(self.src, line)),
        )
    }
}

pub(crate) fn lex(src: &str) -> Result<Vec<Token>, GiacError> {
    Lexer::new(src).run()
}

/// トークン位置を指すパースエラーを作る（構文解析器と共有）。
pub(crate) fn error_at(src: &str, code: &'static str, msg: impl Into<String>, tok: &Token) -> GiacError {
    let map = LineMap::new(src);
    GiacError::Parse(
        ErrorInfo::at(code, msg, Some(tok.pos), Some(tok.line), Some(tok.col))
            .with_snippet(map.line_text(src, tok.line)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn operators_prefer_longest_match() {
        assert_eq!(
            kinds("a:=b<=c**2"),
            vec![
                TokenKind::IDENT,
                TokenKind::ASSIGN,
                TokenKind::IDENT,
                TokenKind::LE,
                TokenKind::IDENT,
                TokenKind::DBLSTAR,
                TokenKind::INT,
                TokenKind::EOF
            ]
        );
    }

    #[test]
    fn numbers_and_strings() {
        let toks = lex("1.5e3 42 \"a\\\"b\"").unwrap();
        assert_eq!(toks[0].kind, TokenKind::FLOAT);
        assert_eq!(toks[1].kind, TokenKind::INT);
        assert_eq!(toks[2].kind, TokenKind::STRING);
        assert_eq!(toks[2].value, "a\"b");
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = lex("x + \"abc").unwrap_err();
        assert_eq!(err.code(), "PAR003");
        assert_eq!(err.info().col, Some(5));
    }

    #[test]
    fn unknown_character_is_rejected() {
        let err = lex("x # y").unwrap_err();
        assert_eq!(err.code(), "PAR091");
    }
}
