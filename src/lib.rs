// パス: src/lib.rs
// 役割: クレートルート。モジュールの配線と公開 API の再エクスポート
// 意図: 利用側が Session と GiacExpr を起点に全機能へ届くようにする
// 関連ファイル: src/session.rs, src/expr.rs, src/errors.rs, src/engine/mod.rs
//! giac-rs ルートモジュール
//!
//! 目的:
//! - 計算機代数システム GIAC のコマンドを Rust から動的に呼び出し、結果を Rust の型へ変換する。
//! - コマンド名の検証と誤字の候補提示をエンジン呼び出しの前に行う。
//!
//! 方針:
//! - コメント/ドキュメントは日本語、識別子は英語。
//! - エンジンは `Engine` トレイトの背後に置く。既定は純 Rust の組み込みエンジンで、
//!   feature `giac-native` で libgiac を使う。
//! - エンジンの値は `GiacExpr` が RAII で所有する。
//!
//! ```
//! # fn main() -> Result<(), giac::GiacError> {
//! let session = giac::Session::new()?;
//! let f = session.invoke("factor", &[giac::Arg::code("x^2-1")])?;
//! assert_eq!(f.to_string(), "(x-1)*(x+1)");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod expr;
pub mod interchange;
pub mod invoke;
pub mod logging;
pub mod marshal;
pub mod registry;
pub mod repl;
pub mod session;

pub use crate::config::{Backend, SessionConfig};
pub use crate::engine::{Subtype, TypeTag};
pub use crate::errors::{ErrorCategory, ErrorInfo, GiacError, GiacResult};
pub use crate::expr::GiacExpr;
pub use crate::invoke::Arg;
pub use crate::marshal::{ConversionPolicy, FromGiac, Native, NativeComplex, NativeList};
pub use crate::registry::{Category, Command, CommandEntry, CommandRegistry};
pub use crate::session::Session;
