// パス: src/interchange/mod.rs
// 役割: 外部の数式交換形式との変換をまとめるモジュール
// 意図: 形式ごとにサブモジュールを分け、利用側には変換関数だけを見せる
// 関連ファイル: src/interchange/mathjson.rs
//! 交換形式

pub mod mathjson;

pub use mathjson::{from_mathjson, to_mathjson};
