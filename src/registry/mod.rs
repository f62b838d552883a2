// パス: src/registry/mod.rs
// 役割: エンジンのヘルプデータから作るコマンド登録簿（存在確認・分類・検索・ヘルプ・候補提示）
// 意図: コマンド名の検証をエンジン呼び出しの前に一度だけ行い、誤字には候補を添えて返す
// 関連ファイル: src/registry/categories.rs, src/registry/suggest.rs, src/session.rs
//! コマンド登録簿
//!
//! - セッション生成時に `Engine::help_records` と静的カテゴリ表から一度だけ構築し、以後は変更しない。
//! - 名前は `BTreeMap` で保持するので、列挙・検索結果は常に名前順。
//! - `command(name)` は検証済みトークン `Command` を返し、呼び出し側はそれを使い回せる。

mod categories;
pub mod suggest;

use std::collections::BTreeMap;
use std::fmt::Write as _;

use regex::Regex;

pub use self::categories::Category;
use crate::engine::HelpRecord;
use crate::errors::{ErrorInfo, GiacError, GiacResult};

/// 候補数の既定値。
pub const DEFAULT_SUGGESTIONS: usize = 4;

/// 登録簿の 1 エントリ。構築後は不変。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEntry {
    pub name: String,
    pub category: Category,
    pub related: Vec<String>,
    pub examples: Vec<String>,
    pub description: String,
}

/// 登録簿で存在が確認済みのコマンド名。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Command {
    name: String,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CommandRegistry {
    entries: BTreeMap<String, CommandEntry>,
}

impl CommandRegistry {
    pub fn from_records(records: impl IntoIterator<Item = HelpRecord>) -> Self {
        let mut entries = BTreeMap::new();
        for record in records {
            let category = categories::category_for(&record.name);
            // 同名レコードは最初のものを採用する
            entries.entry(record.name.clone()).or_insert(CommandEntry {
                name: record.name,
                category,
                related: record.related,
                examples: record.examples,
                description: record.description,
            });
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    pub fn category_of(&self, name: &str) -> Option<Category> {
        self.get(name).map(|e| e.category)
    }

    pub fn categories(&self) -> &'static [Category] {
        &Category::ALL
    }

    /// カテゴリ名（`linear_algebra` など）に属するコマンド名の一覧。
    pub fn commands_in_category(&self, category: &str) -> GiacResult<Vec<&str>> {
        let Some(category) = Category::from_name(category) else {
            let known: Vec<&str> = Category::ALL.iter().map(|c| c.name()).collect();
            return Err(GiacError::usage(
                "REG010",
                format!("未知のカテゴリ `{category}` です（{}）", known.join(", ")),
            ));
        };
        Ok(self
            .entries
            .values()
            .filter(|e| e.category == category)
            .map(|e| e.name.as_str())
            .collect())
    }

    pub fn search_prefix(&self, prefix: &str) -> Vec<&str> {
        self.names().filter(|n| n.starts_with(prefix)).collect()
    }

    pub fn search_regex(&self, pattern: &str) -> GiacResult<Vec<&str>> {
        let re = Regex::new(pattern).map_err(|e| {
            GiacError::usage("REG020", format!("正規表現 `{pattern}` が不正です: {e}"))
        })?;
        Ok(self.names().filter(|n| re.is_match(n)).collect())
    }

    /// 名前と説明文を対象にした大文字小文字を区別しない全文検索（全語一致）。
    pub fn search_text(&self, query: &str) -> Vec<&str> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Vec::new();
        }
        self.entries
            .values()
            .filter(|e| {
                let haystack = format!("{} {}", e.name, e.description).to_lowercase();
                terms.iter().all(|t| haystack.contains(t.as_str()))
            })
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn suggest(&self, name: &str, limit: usize) -> Vec<String> {
        suggest::suggest(name, self.names(), limit)
    }

    pub fn unknown_command(&self, name: &str, limit: usize) -> GiacError {
        let suggestions = self.suggest(name, limit);
        GiacError::Eval(
            ErrorInfo::new("CMD001", format!("未知のコマンド `{name}` です"), None)
                .with_suggestions(suggestions),
        )
    }

    pub fn command(&self, name: &str) -> GiacResult<Command> {
        if self.exists(name) {
            Ok(Command {
                name: name.to_string(),
            })
        } else {
            Err(self.unknown_command(name, DEFAULT_SUGGESTIONS))
        }
    }

    pub fn help(&self, name: &str) -> GiacResult<String> {
        let entry = self
            .get(name)
            .ok_or_else(|| self.unknown_command(name, DEFAULT_SUGGESTIONS))?;
        let mut out = format!("{} [{}]\n", entry.name, entry.category);
        if !entry.description.is_empty() {
            let _ = writeln!(out, "  {}", entry.description);
        }
        if !entry.related.is_empty() {
            let _ = writeln!(out, "  related: {}", entry.related.join(", "));
        }
        if !entry.examples.is_empty() {
            out.push_str("  examples:\n");
            for ex in &entry.examples {
                let _ = writeln!(out, "    {ex}");
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, description: &str) -> HelpRecord {
        HelpRecord {
            name: name.into(),
            description: description.into(),
            related: vec![],
            examples: vec![format!("{name}(x)")],
        }
    }

    fn registry() -> CommandRegistry {
        CommandRegistry::from_records(vec![
            record("factor", "Factorisation of a polynomial."),
            record("factorial", "Factorial of an integer."),
            record("diff", "Derivative of an expression."),
            record("plot", "Plots a function."),
        ])
    }

    #[test]
    fn lookup_and_categories() {
        let reg = registry();
        assert_eq!(reg.len(), 4);
        assert!(reg.exists("diff"));
        assert_eq!(reg.category_of("diff"), Some(Category::Calculus));
        assert_eq!(reg.category_of("plot"), Some(Category::Other));
        assert_eq!(reg.commands_in_category("arithmetic").unwrap(), vec!["factorial"]);
        assert_eq!(reg.commands_in_category("nope").unwrap_err().code(), "REG010");
    }

    #[test]
    fn searching() {
        let reg = registry();
        assert_eq!(reg.search_prefix("fact"), vec!["factor", "factorial"]);
        assert_eq!(reg.search_regex("^d").unwrap(), vec!["diff"]);
        assert_eq!(reg.search_regex("(").unwrap_err().code(), "REG020");
        assert_eq!(reg.search_text("OF an"), vec!["diff", "factorial"]);
    }

    #[test]
    fn help_and_command_tokens() {
        let reg = registry();
        let help = reg.help("factor").unwrap();
        assert!(help.starts_with("factor [algebra]"));
        assert!(help.contains("factor(x)"));
        let err = reg.command("factr").unwrap_err();
        assert_eq!(err.code(), "CMD001");
        assert_eq!(err.suggestions().first().map(String::as_str), Some("factor"));
        assert_eq!(reg.command("diff").unwrap().name(), "diff");
    }
}
