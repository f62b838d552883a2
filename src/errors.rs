//! エラー型の定義（共通フォーマット: \[CODE\] メッセージ @line:col / @pos）。
//!
//! - `ErrorInfo` はコード・メッセージ・位置・候補を保持する共通レコード。
//! - `GiacError` は分類タグ（Parse / Eval / Type / Memory / Usage）ごとの列挙。
//! - エンジンは再試行の概念を持たないため、ここにリトライ情報は存在しない。

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub msg: String,
    pub pos: Option<usize>,           // バイトオフセット（任意）
    pub line: Option<usize>,          // 1-origin（任意）
    pub col: Option<usize>,           // 1-origin（任意）
    pub snippet: Option<String>,      // エラー行のスニペット（任意）
    pub suggestions: Vec<String>,     // 未知コマンド時の候補
}

impl ErrorInfo {
    pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line: None,
            col: None,
            snippet: None,
            suggestions: Vec::new(),
        }
    }
    pub fn at(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
    ) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line,
            col,
            snippet: None,
            suggestions: Vec::new(),
        }
    }
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // 1行目: ヘッダ
        match (self.line, self.col, self.pos) {
            (Some(l), Some(c), Some(p)) => write!(
                f,
                "[{}] {} @line={},col={} @pos={}",
                self.code, self.msg, l, c, p
            )?,
            (Some(l), Some(c), None) => {
                write!(f, "[{}] {} @line={},col={}", self.code, self.msg, l, c)?
            }
            (_, _, Some(p)) => write!(f, "[{}] {} @pos={}", self.code, self.msg, p)?,
            _ => write!(f, "[{}] {}", self.code, self.msg)?,
        }
        // 2行目以降: スニペット
        if let (Some(s), Some(c)) = (&self.snippet, self.col) {
            let caret = if c > 1 {
                " ".repeat(c - 1) + "^"
            } else {
                "^".to_string()
            };
            write!(f, "\n{}\n{}", s, caret)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\ndid you mean: {}", self.suggestions.join(", "))?;
        }
        Ok(())
    }
}

/// エラーの分類タグ。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Parse,
    Eval,
    Type,
    Memory,
    Usage,
}

impl ErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Parse => "parse",
            ErrorCategory::Eval => "eval",
            ErrorCategory::Type => "type",
            ErrorCategory::Memory => "memory",
            ErrorCategory::Usage => "usage",
        }
    }
}

/// 呼び出し側へ同期的に返すエラー。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GiacError {
    /// 入力構文の誤り
    #[error("{0}")]
    Parse(ErrorInfo),
    /// エンジンが呼び出しを拒否した（未知コマンド・引数個数など）
    #[error("{0}")]
    Eval(ErrorInfo),
    /// 引数を書式化できない、または要求された変換を満たせない
    #[error("{0}")]
    Type(ErrorInfo),
    /// 解放済み・null ハンドルへの操作
    #[error("{0}")]
    Memory(ErrorInfo),
    /// レジストリや設定の誤用（未知カテゴリ・不正な正規表現など）
    #[error("{0}")]
    Usage(ErrorInfo),
}

impl GiacError {
    pub fn parse(code: &'static str, msg: impl Into<String>) -> Self {
        Self::Parse(ErrorInfo::new(code, msg, None))
    }
    pub fn eval(code: &'static str, msg: impl Into<String>) -> Self {
        Self::Eval(ErrorInfo::new(code, msg, None))
    }
    pub fn type_error(code: &'static str, msg: impl Into<String>) -> Self {
        Self::Type(ErrorInfo::new(code, msg, None))
    }
    pub fn memory(code: &'static str, msg: impl Into<String>) -> Self {
        Self::Memory(ErrorInfo::new(code, msg, None))
    }
    pub fn usage(code: &'static str, msg: impl Into<String>) -> Self {
        Self::Usage(ErrorInfo::new(code, msg, None))
    }

    /// null / 解放済みハンドルの計算利用を表す定型エラー。
    pub fn released_handle() -> Self {
        Self::memory("MEM001", "解放済みまたは null のハンドルは計算に使用できません")
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GiacError::Parse(_) => ErrorCategory::Parse,
            GiacError::Eval(_) => ErrorCategory::Eval,
            GiacError::Type(_) => ErrorCategory::Type,
            GiacError::Memory(_) => ErrorCategory::Memory,
            GiacError::Usage(_) => ErrorCategory::Usage,
        }
    }

    pub fn info(&self) -> &ErrorInfo {
        match self {
            GiacError::Parse(info)
            | GiacError::Eval(info)
            | GiacError::Type(info)
            | GiacError::Memory(info)
            | GiacError::Usage(info) => info,
        }
    }

    pub fn code(&self) -> &'static str {
        self.info().code
    }

    pub fn suggestions(&self) -> &[String] {
        &self.info().suggestions
    }
}

pub type GiacResult<T> = Result<T, GiacError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_appends_suggestion_line() {
        let info = ErrorInfo::new("CMD001", "未知のコマンド: factr", None)
            .with_suggestions(vec!["factor".into(), "fact".into()]);
        assert_eq!(
            info.to_string(),
            "[CMD001] 未知のコマンド: factr\ndid you mean: factor, fact"
        );
    }

    #[test]
    fn category_and_code_follow_variant() {
        let err = GiacError::released_handle();
        assert_eq!(err.category(), ErrorCategory::Memory);
        assert_eq!(err.code(), "MEM001");
        assert_eq!(err.category().as_str(), "memory");
        assert!(err.suggestions().is_empty());
    }
}
