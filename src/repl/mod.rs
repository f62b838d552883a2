// パス: src/repl/mod.rs
// 役割: giac-repl の対話ループを公開するモジュール
// 意図: コマンド処理と表示を分け、入口は run_repl だけにする
// 関連ファイル: src/repl/cmd.rs, src/repl/printer.rs, src/bin/giac_repl.rs
//! REPL モジュール

pub mod cmd;
mod printer;

pub use cmd::run_repl;
