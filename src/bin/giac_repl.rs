// パス: src/bin/giac_repl.rs
// 役割: giac-repl 実行ファイルの入口（引数解析・ログ初期化・セッション生成）
// 意図: 設定ファイル・環境変数・コマンドライン引数の順に設定を重ねて REPL を起動する
// 関連ファイル: src/repl/mod.rs, src/config.rs, src/logging.rs
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use giac::config::Backend;
use giac::{GiacResult, Session, SessionConfig};

/// GIAC の対話シェル。
#[derive(Parser, Debug)]
#[command(name = "giac-repl", version, about)]
struct Cli {
    /// 利用するエンジン（builtin / native）
    #[arg(long)]
    backend: Option<Backend>,
    /// JSON 形式のセッション設定ファイル
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// 未知コマンドに添える候補の最大数
    #[arg(long, value_name = "N")]
    max_suggestions: Option<usize>,
    /// tracing のフィルタ指定（例: giac=debug）
    #[arg(long, value_name = "DIRECTIVE")]
    log: Option<String>,
    /// 対話せずに式を評価して終了する（複数指定可）
    #[arg(short = 'e', long = "eval", value_name = "EXPR")]
    eval: Vec<String>,
}

fn load_config(cli: &Cli) -> GiacResult<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_path(path)?,
        None => SessionConfig::default(),
    }
    .with_env_overrides()?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(n) = cli.max_suggestions {
        config.max_suggestions = n;
    }
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    giac::logging::init_logging_with(cli.log.as_deref());
    let session = match load_config(&cli).and_then(Session::with_config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    if cli.eval.is_empty() {
        giac::repl::run_repl(&session);
        return ExitCode::SUCCESS;
    }
    let mut status = ExitCode::SUCCESS;
    for src in &cli.eval {
        match session.eval(src) {
            Ok(value) => println!("{value}"),
            Err(e) => {
                eprintln!("{e}");
                status = ExitCode::FAILURE;
            }
        }
    }
    status
}
