// パス: src/logging.rs
// 役割: tracing-subscriber の初期化（GIAC_RS_LOG によるフィルタ指定）
// 意図: ライブラリ側はマクロを呼ぶだけにし、購読者の設置はバイナリに任せる
// 関連ファイル: src/bin/giac_repl.rs

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// フィルタを読む環境変数名。
pub const LOG_ENV: &str = "GIAC_RS_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// `GIAC_RS_LOG`（なければ `warn`）で stderr 向け fmt 購読者を設置する。
/// 既に購読者がある場合は何もしない。
pub fn init_logging() {
    init_logging_with(None);
}

/// `directive` を最優先し、次に `GIAC_RS_LOG`、最後に既定値を使う。
pub fn init_logging_with(directive: Option<&str>) {
    let filter = match directive {
        Some(d) => EnvFilter::try_new(d).ok(),
        None => EnvFilter::try_from_env(LOG_ENV).ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init();
}
