// パス: src/config.rs
// 役割: セッション設定（バックエンド選択・候補数・変換方針・衝突警告）の読み込みと環境変数による上書き
// 意図: JSON ファイル・環境変数・コマンドライン引数の順に上書きできる単一の設定値を用意する
// 関連ファイル: src/session.rs, src/marshal.rs, src/bin/giac_repl.rs

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{GiacError, GiacResult};
use crate::marshal::ConversionPolicy;
use crate::registry::DEFAULT_SUGGESTIONS;

pub const BACKEND_ENV: &str = "GIAC_RS_BACKEND";
pub const MAX_SUGGESTIONS_ENV: &str = "GIAC_RS_MAX_SUGGESTIONS";

/// 利用するエンジン。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Builtin,
    Native,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Builtin => "builtin",
            Backend::Native => "native",
        }
    }
}

impl FromStr for Backend {
    type Err = GiacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(Backend::Builtin),
            "native" | "giac" => Ok(Backend::Native),
            other => Err(GiacError::usage(
                "CFG003",
                format!("未知のバックエンド `{other}` です（builtin / native）"),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub backend: Backend,
    /// 未知コマンドのエラーに添える候補の最大数。
    pub max_suggestions: usize,
    pub conversion: ConversionPolicy,
    /// Rust の予約語と衝突するコマンド名を初めて解決したときに警告する。
    pub warn_conflicts: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Builtin,
            max_suggestions: DEFAULT_SUGGESTIONS,
            conversion: ConversionPolicy::default(),
            warn_conflicts: true,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(src: &str) -> GiacResult<Self> {
        serde_json::from_str(src)
            .map_err(|e| GiacError::usage("CFG001", format!("設定 JSON を読めません: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> GiacResult<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|e| {
            GiacError::usage("CFG002", format!("{} を読めません: {e}", path.display()))
        })?;
        Self::from_json_str(&src)
    }

    /// `GIAC_RS_BACKEND` / `GIAC_RS_MAX_SUGGESTIONS` を反映する。
    pub fn with_env_overrides(self) -> GiacResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から上書きを読む（テスト用に環境変数から切り離してある）。
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> GiacResult<Self> {
        if let Some(v) = lookup(BACKEND_ENV) {
            self.backend = v.parse()?;
        }
        if let Some(v) = lookup(MAX_SUGGESTIONS_ENV) {
            self.max_suggestions = v.trim().parse().map_err(|_| {
                GiacError::usage(
                    "CFG004",
                    format!("{MAX_SUGGESTIONS_ENV} は 0 以上の整数でなければなりません: `{v}`"),
                )
            })?;
        }
        Ok(self)
    }

    pub fn to_json_string(&self) -> GiacResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GiacError::usage("CFG005", format!("設定を書き出せません: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = SessionConfig::from_json_str(r#"{"max_suggestions": 2}"#).unwrap();
        assert_eq!(cfg.max_suggestions, 2);
        assert_eq!(cfg.backend, Backend::Builtin);
        assert!(cfg.conversion.widen_integers);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = SessionConfig::from_json_str(r#"{"colour": true}"#).unwrap_err();
        assert_eq!(err.code(), "CFG001");
    }

    #[test]
    fn overrides_apply_in_order() {
        let cfg = SessionConfig::default()
            .with_overrides_from(|k| match k {
                BACKEND_ENV => Some("native".into()),
                MAX_SUGGESTIONS_ENV => Some(" 7 ".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(cfg.backend, Backend::Native);
        assert_eq!(cfg.max_suggestions, 7);
        let bad = SessionConfig::default().with_overrides_from(|k| {
            (k == MAX_SUGGESTIONS_ENV).then(|| "many".to_string())
        });
        assert_eq!(bad.unwrap_err().code(), "CFG004");
    }
}
