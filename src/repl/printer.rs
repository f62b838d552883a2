// パス: src/repl/printer.rs
// 役割: REPL のヘルプ文と値・エラーの表示形式
// 意図: 対話時の出力形式を一箇所にまとめる
// 関連ファイル: src/repl/cmd.rs, src/errors.rs, src/expr.rs
//! REPL で用いるヘルプメッセージと値出力を集約したモジュール。

use std::io::{self, Write};

use crate::errors::GiacError;
use crate::expr::GiacExpr;

const HELP_TEXT: &str = concat!(
    "利用可能なコマンド:\n",
    "  :help              ヘルプ（本メッセージ）\n",
    "  :doc NAME          コマンドのヘルプ（:? NAME も可）\n",
    "  :search WORDS      名前と説明を全文検索\n",
    "  :regex PATTERN     名前を正規表現で検索\n",
    "  :cat [CATEGORY]    カテゴリ一覧／カテゴリ内のコマンド\n",
    "  :suggest NAME      似た名前のコマンド\n",
    "  :t EXPR            型タグを表示（:type も可）\n",
    "  :json EXPR         MathJSON で表示\n",
    "  :import JSON       MathJSON を読み込んで評価\n",
    "  :load PATH         GIAC ソースファイルを評価\n",
    "  :live              生存中のハンドル数\n",
    "  :quit              終了\n",
    "\n",
    "例:\n",
    "  > factor(x^2-1)         -- (x-1)*(x+1)\n",
    "  > diff(x^3,x)           -- 3*x^2\n",
    "  > :json x^2+1           -- [\"Add\",[\"Power\",\"x\",2],1]\n",
);

/// ヘルプメッセージを任意のライターへ描画する。
pub(crate) fn render_help<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(HELP_TEXT.as_bytes())
}

/// 評価結果の表示。
pub(crate) fn write_value(v: &GiacExpr) -> String {
    v.to_string()
}

pub(crate) fn write_error(e: &GiacError) -> String {
    format!("エラー: {e}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    #[test]
    fn render_help_outputs_expected_text() {
        let mut buf = Vec::new();
        render_help(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), HELP_TEXT);
    }

    #[test]
    fn values_and_errors_render_with_engine_printer() {
        let s = Session::new().unwrap();
        assert_eq!(write_value(&s.eval("x^3/3").unwrap()), "x^3/3");
        assert_eq!(write_value(&GiacExpr::null()), "<null GiacExpr>");
        let err = s.invoke("factr", &[]).unwrap_err();
        assert!(write_error(&err).starts_with("エラー: [CMD001]"));
    }
}
