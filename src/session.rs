// パス: src/session.rs
// 役割: エンジン・登録簿・設定・衝突警告の状態をまとめた明示的なコンテキスト Session
// 意図: グローバル状態を持たず、呼び出し経路（評価・動的呼び出し・直接適用）をここに集約する
// 関連ファイル: src/invoke.rs, src/registry/mod.rs, src/expr.rs, src/config.rs
//! セッション
//!
//! - `Session` は `Send + Sync`。ハンドルは `Arc<EngineCell>` を持つので、セッションより長生きできる。
//! - 未知のコマンドは呼び出し文字列を組み立てる前に `CMD001` で拒否する。
//! - Rust の予約語と同名のコマンドは `host_name` で末尾に `_` を付けた名前へ写し、
//!   セッションごとに最初の 1 回だけ警告する。

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::config::{Backend, SessionConfig};
use crate::engine::builtin::BuiltinEngine;
use crate::engine::{Engine, EngineCell};
use crate::errors::{GiacError, GiacResult};
use crate::expr::GiacExpr;
use crate::invoke::{compose_call, format_arg, is_identifier, Arg};
use crate::marshal::{to_native, Native};
use crate::registry::{Command, CommandRegistry};

/// Rust の予約語・prelude 名と衝突するコマンド名。
const HOST_CONFLICTS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn", "box", "try", "Some", "None", "Ok", "Err", "Box", "Vec",
    "String", "Option", "Result", "drop",
];

pub struct Session {
    cell: Arc<EngineCell>,
    registry: CommandRegistry,
    config: SessionConfig,
    warned: Mutex<HashSet<String>>,
}

fn open_engine(backend: Backend) -> GiacResult<Box<dyn Engine>> {
    match backend {
        Backend::Builtin => Ok(Box::new(BuiltinEngine::new())),
        #[cfg(feature = "giac-native")]
        Backend::Native => Ok(Box::new(crate::engine::native::NativeEngine::new()?)),
        #[cfg(not(feature = "giac-native"))]
        Backend::Native => Err(GiacError::usage(
            "CFG010",
            "native バックエンドは feature `giac-native` 付きでビルドした場合のみ使えます",
        )),
    }
}

impl Session {
    /// 既定設定（組み込みエンジン）のセッション。
    pub fn new() -> GiacResult<Self> {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> GiacResult<Self> {
        Self::with_engine(open_engine(config.backend)?, config)
    }

    /// 任意のエンジン実装でセッションを作る。
    pub fn with_engine(engine: Box<dyn Engine>, config: SessionConfig) -> GiacResult<Self> {
        let cell = EngineCell::new(engine);
        let registry = CommandRegistry::from_records(cell.with(|e| e.help_records()));
        info!(
            target: "giac::session",
            backend = cell.backend(),
            commands = registry.len(),
            "session opened"
        );
        Ok(Self {
            cell,
            registry,
            config,
            warned: Mutex::new(HashSet::new()),
        })
    }

    pub fn backend(&self) -> &'static str {
        self.cell.backend()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// エンジン側で生存している値の数。
    pub fn live_handles(&self) -> usize {
        self.cell.with(|e| e.live_handles())
    }

    /// GIAC 構文の文字列を評価する。
    pub fn eval(&self, src: &str) -> GiacResult<GiacExpr> {
        debug!(target: "giac::invoke", src, "eval");
        let id = self.cell.with(|e| e.eval(src))?;
        Ok(GiacExpr::adopt(&self.cell, id))
    }

    /// 名前を検証済みの `Command` へ解決する。
    pub fn command(&self, name: &str) -> GiacResult<Command> {
        if !self.registry.exists(name) {
            return Err(self.registry.unknown_command(name, self.config.max_suggestions));
        }
        self.note_conflict(name);
        self.registry.command(name)
    }

    /// コマンド名と引数列から呼び出し式を組み立てて評価する。
    pub fn invoke(&self, name: &str, args: &[Arg]) -> GiacResult<GiacExpr> {
        let command = self.command(name)?;
        self.call(&command, args)
    }

    pub fn call(&self, command: &Command, args: &[Arg]) -> GiacResult<GiacExpr> {
        let call = compose_call(command.name(), args)?;
        debug!(target: "giac::invoke", call = call.as_str(), "invoke");
        let id = self.cell.with(|e| e.eval(&call))?;
        Ok(GiacExpr::adopt(&self.cell, id))
    }

    /// 既存ハンドルを文字列に戻さずに直接適用する。
    pub fn apply(&self, command: &Command, args: &[&GiacExpr]) -> GiacResult<GiacExpr> {
        debug!(target: "giac::invoke", command = command.name(), argc = args.len(), "apply");
        GiacExpr::apply_in(&self.cell, command.name(), args)
    }

    fn apply_named(&self, name: &str, args: &[&GiacExpr]) -> GiacResult<GiacExpr> {
        let command = self.command(name)?;
        self.apply(&command, args)
    }

    /// 任意の引数値をハンドルにする。
    pub fn value(&self, arg: impl Into<Arg>) -> GiacResult<GiacExpr> {
        let src = format_arg(&arg.into())?;
        self.eval(&src)
    }

    pub fn var(&self, name: &str) -> GiacResult<GiacExpr> {
        if !is_identifier(name) {
            return Err(GiacError::type_error(
                "ARG003",
                format!("`{name}` は GIAC の識別子ではありません"),
            ));
        }
        self.eval(name)
    }

    pub fn vars(&self, names: &[&str]) -> GiacResult<Vec<GiacExpr>> {
        names.iter().map(|n| self.var(n)).collect()
    }

    pub fn matrix<T: Into<Arg>>(&self, rows: Vec<Vec<T>>) -> GiacResult<GiacExpr> {
        self.value(Arg::matrix(rows))
    }

    /// 設定の変換方針でネイティブ値へ変換する。
    pub fn to_native(&self, expr: &GiacExpr) -> GiacResult<Native> {
        to_native(expr, &self.config.conversion)
    }

    pub fn suggest(&self, name: &str) -> Vec<String> {
        self.registry.suggest(name, self.config.max_suggestions)
    }

    pub fn help(&self, name: &str) -> GiacResult<String> {
        self.registry.help(name)
    }

    /// ホスト側で使う名前。予約語と衝突するものは末尾に `_` を付ける。
    pub fn host_name(&self, name: &str) -> String {
        if HOST_CONFLICTS.contains(&name) {
            self.note_conflict(name);
            format!("{name}_")
        } else {
            name.to_string()
        }
    }

    /// 衝突名を初めて見たときだけ警告する。警告したら true。
    fn note_conflict(&self, name: &str) -> bool {
        if !self.config.warn_conflicts || !HOST_CONFLICTS.contains(&name) {
            return false;
        }
        let mut warned = self.warned.lock().unwrap_or_else(PoisonError::into_inner);
        if warned.insert(name.to_string()) {
            warn!(
                target: "giac::session",
                command = name,
                host_name = format!("{name}_").as_str(),
                "command name collides with a Rust keyword"
            );
            true
        } else {
            false
        }
    }

    pub fn factor(&self, e: &GiacExpr) -> GiacResult<GiacExpr> {
        self.apply_named("factor", &[e])
    }

    pub fn expand(&self, e: &GiacExpr) -> GiacResult<GiacExpr> {
        self.apply_named("expand", &[e])
    }

    pub fn simplify(&self, e: &GiacExpr) -> GiacResult<GiacExpr> {
        self.apply_named("simplify", &[e])
    }

    pub fn diff(&self, e: &GiacExpr, var: &GiacExpr) -> GiacResult<GiacExpr> {
        self.apply_named("diff", &[e, var])
    }

    pub fn integrate(&self, e: &GiacExpr, var: &GiacExpr) -> GiacResult<GiacExpr> {
        self.apply_named("integrate", &[e, var])
    }

    pub fn solve(&self, e: &GiacExpr, var: &GiacExpr) -> GiacResult<GiacExpr> {
        self.apply_named("solve", &[e, var])
    }

    pub fn subst(&self, e: &GiacExpr, var: &GiacExpr, value: &GiacExpr) -> GiacResult<GiacExpr> {
        self.apply_named("subst", &[e, var, value])
    }

    pub fn evalf(&self, e: &GiacExpr) -> GiacResult<GiacExpr> {
        self.apply_named("evalf", &[e])
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend())
            .field("commands", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}
