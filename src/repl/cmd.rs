// パス: src/repl/cmd.rs
// 役割: REPL のコマンドループ・コマンド解釈・セッションへの橋渡し
// 意図: 入出力を抽象化して、対話ループをテストから駆動できるようにする
// 関連ファイル: src/session.rs, src/repl/printer.rs, src/interchange/mathjson.rs
//! giac-repl におけるコマンド処理を担当するモジュール。
//! 入力をコロンコマンドか GIAC 式として解釈し、`Session` へ渡す。

use std::io::{self, BufRead, Write};

use crate::interchange::mathjson;
use crate::session::Session;

use super::printer::{render_help, write_error, write_value};

/// 1 行入力の結果。
pub(crate) enum ReadResult {
    Line(String),
    Eof,
}

pub(crate) trait ReplLineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult>;
}

/// 標準入力から行を読むソース。プロンプトは端末のときだけ意味を持つ。
pub(crate) struct StdinSource<R: BufRead> {
    reader: R,
}

impl<R: BufRead> StdinSource<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> ReplLineSource for StdinSource<R> {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(ReadResult::Eof);
        }
        while line.ends_with(['\n', '\r']) {
            line.pop();
        }
        Ok(ReadResult::Line(line))
    }
}

/// セッション上で対話ループを開始する。
///
/// # Examples
/// ```no_run
/// # fn main() -> Result<(), giac::GiacError> {
/// let session = giac::Session::new()?;
/// giac::repl::run_repl(&session);
/// # Ok(())
/// # }
/// ```
pub fn run_repl(session: &Session) {
    let stdin = io::stdin();
    let mut source = StdinSource::new(stdin.lock());
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    if let Err(err) = run_repl_with(session, &mut source, &FsIo, &mut stdout, &mut stderr) {
        let _ = writeln!(stderr, "REPL 実行中にエラーが発生しました: {err}");
    }
}

pub(crate) fn run_repl_with<S, I, W, E>(
    session: &Session,
    source: &mut S,
    file_io: &I,
    out: &mut W,
    err: &mut E,
) -> io::Result<()>
where
    S: ReplLineSource,
    I: ReplIo,
    W: Write,
    E: Write,
{
    writeln!(
        out,
        "giac-repl [{}] :: {} commands :: :help でヘルプ",
        session.backend(),
        session.registry().len()
    )?;
    let mut buffer = String::new();
    'repl: loop {
        buffer.clear();
        let mut prompt = "> ";
        let input = loop {
            match source.read_line(prompt)? {
                ReadResult::Line(line) => {
                    buffer.push_str(&line);
                    buffer.push('\n');
                    if needs_more_input(&buffer) {
                        prompt = ".. ";
                        continue;
                    }
                    break buffer.trim().to_string();
                }
                ReadResult::Eof => {
                    if buffer.trim().is_empty() {
                        writeln!(out)?;
                        break 'repl;
                    }
                    break buffer.trim().to_string();
                }
            }
        };
        if input.is_empty() {
            continue;
        }
        match parse_repl_command(&input) {
            ReplCommand::Help => render_help(out)?,
            ReplCommand::Quit => break,
            other => dispatch(execute(session, other, file_io), out, err)?,
        }
    }
    Ok(())
}

fn dispatch<W: Write, E: Write>(msgs: Vec<ReplMsg>, out: &mut W, err: &mut E) -> io::Result<()> {
    for msg in msgs {
        match msg {
            ReplMsg::Out(s) => writeln!(out, "{s}")?,
            ReplMsg::Err(s) => writeln!(err, "{s}")?,
        }
    }
    Ok(())
}

/// 括弧と文字列リテラルの開きを数えて継続行が必要か判定する。
fn needs_more_input(src: &str) -> bool {
    if src.trim_start().starts_with(':') {
        return false;
    }
    let mut depth = 0i32;
    let mut in_str = false;
    let mut esc = false;
    for ch in src.chars() {
        if in_str {
            match (esc, ch) {
                (true, _) => esc = false,
                (false, '\\') => esc = true,
                (false, '"') => in_str = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            '"' => in_str = true,
            _ => {}
        }
    }
    depth > 0 || in_str
}

/// REPL の応答メッセージ。
pub(crate) enum ReplMsg {
    Out(String),
    Err(String),
}

/// `:load` 用のファイル読み込み抽象。
pub(crate) trait ReplIo {
    fn read_to_string(&self, path: &str) -> Result<String, String>;
}

pub(crate) struct FsIo;

impl ReplIo for FsIo {
    fn read_to_string(&self, path: &str) -> Result<String, String> {
        std::fs::read_to_string(path).map_err(|e| format!("エラー: ファイルを開けません: {e}"))
    }
}

/// REPL が解釈できるコマンド。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplCommand {
    /// `:help` / `:h`
    Help,
    /// `:quit` / `:q`
    Quit,
    /// `:doc NAME` でコマンドのヘルプを表示する。
    Doc(String),
    /// `:search WORDS` で名前と説明を全文検索する。
    Search(String),
    /// `:regex PATTERN` で名前を正規表現検索する。
    Regex(String),
    /// `:cat [CATEGORY]` でカテゴリ一覧またはカテゴリ内のコマンドを表示する。
    Category(Option<String>),
    /// `:suggest NAME`
    Suggest(String),
    /// `:t EXPR` で型タグを表示する。
    TypeOf(String),
    /// `:json EXPR` で MathJSON を表示する。
    Json(String),
    /// `:import JSON` で MathJSON を読み込んで評価する。
    Import(String),
    /// `:load PATH` で GIAC ソースファイルを評価する。
    Load(String),
    /// `:live` で生存中のハンドル数を表示する。
    Live,
    Eval(String),
    Invalid(String),
}

fn with_arg(s: &str, make: fn(String) -> ReplCommand, rest: &str) -> ReplCommand {
    let rest = rest.trim();
    if rest.is_empty() {
        ReplCommand::Invalid(s.to_string())
    } else {
        make(rest.to_string())
    }
}

/// 生の入力文字列を `ReplCommand` に解析する。
pub(crate) fn parse_repl_command(input: &str) -> ReplCommand {
    let s = input.trim();
    if !s.starts_with(':') {
        return ReplCommand::Eval(s.to_string());
    }
    let (head, rest) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
    match head {
        ":help" | ":h" => ReplCommand::Help,
        ":quit" | ":q" => ReplCommand::Quit,
        ":live" => ReplCommand::Live,
        ":doc" | ":?" => with_arg(s, ReplCommand::Doc, rest),
        ":search" => with_arg(s, ReplCommand::Search, rest),
        ":regex" => with_arg(s, ReplCommand::Regex, rest),
        ":suggest" => with_arg(s, ReplCommand::Suggest, rest),
        ":t" | ":type" => with_arg(s, ReplCommand::TypeOf, rest),
        ":json" => with_arg(s, ReplCommand::Json, rest),
        ":import" => with_arg(s, ReplCommand::Import, rest),
        ":load" => with_arg(s, ReplCommand::Load, rest),
        ":cat" => {
            let rest = rest.trim();
            ReplCommand::Category((!rest.is_empty()).then(|| rest.to_string()))
        }
        _ => ReplCommand::Invalid(s.to_string()),
    }
}

fn names_msg(names: Vec<&str>) -> Vec<ReplMsg> {
    if names.is_empty() {
        return vec![ReplMsg::Out("(該当なし)".into())];
    }
    vec![ReplMsg::Out(names.join(" "))]
}

fn eval_msg(session: &Session, src: &str) -> Vec<ReplMsg> {
    match session.eval(src) {
        Ok(value) => vec![ReplMsg::Out(write_value(&value))],
        Err(e) => vec![ReplMsg::Err(write_error(&e))],
    }
}

/// 解釈済みコマンドを実行し、出力メッセージを返す。
pub(crate) fn execute<I: ReplIo>(session: &Session, cmd: ReplCommand, io: &I) -> Vec<ReplMsg> {
    use ReplCommand::*;
    let registry = session.registry();
    match cmd {
        Doc(name) => match session.help(&name) {
            Ok(text) => vec![ReplMsg::Out(text.trim_end().to_string())],
            Err(e) => vec![ReplMsg::Err(write_error(&e))],
        },
        Search(query) => names_msg(registry.search_text(&query)),
        Regex(pattern) => match registry.search_regex(&pattern) {
            Ok(names) => names_msg(names),
            Err(e) => vec![ReplMsg::Err(write_error(&e))],
        },
        Category(None) => registry
            .categories()
            .iter()
            .map(|c| {
                let count = registry.commands_in_category(c.name()).map_or(0, |v| v.len());
                ReplMsg::Out(format!("  {:<16} {count}", c.name()))
            })
            .collect(),
        Category(Some(name)) => match registry.commands_in_category(&name) {
            Ok(names) => names_msg(names),
            Err(e) => vec![ReplMsg::Err(write_error(&e))],
        },
        Suggest(name) => names_msg(session.suggest(&name).iter().map(String::as_str).collect()),
        TypeOf(src) => match session.eval(&src).and_then(|v| v.type_tag()) {
            Ok((tag, subtype)) => vec![ReplMsg::Out(format!("-- {} ({subtype:?})", tag.name()))],
            Err(e) => vec![ReplMsg::Err(write_error(&e))],
        },
        Json(src) => match session.eval(&src).and_then(|v| mathjson::to_mathjson(&v)) {
            Ok(json) => vec![ReplMsg::Out(json.to_string())],
            Err(e) => vec![ReplMsg::Err(write_error(&e))],
        },
        Import(text) => match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(json) => match mathjson::from_mathjson(session, &json) {
                Ok(value) => vec![ReplMsg::Out(write_value(&value))],
                Err(e) => vec![ReplMsg::Err(write_error(&e))],
            },
            Err(e) => vec![ReplMsg::Err(format!("エラー: JSON として読めません: {e}"))],
        },
        Load(path) => match io.read_to_string(&path) {
            Ok(src) => eval_msg(session, &src),
            Err(e) => vec![ReplMsg::Err(e)],
        },
        Live => vec![ReplMsg::Out(format!("live handles: {}", session.live_handles()))],
        Eval(src) => eval_msg(session, &src),
        Help | Quit => Vec::new(),
        Invalid(s) => vec![ReplMsg::Err(format!("エラー: コマンド形式が不正です: {s}"))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lines(Vec<String>);

    impl ReplLineSource for Lines {
        fn read_line(&mut self, _prompt: &str) -> io::Result<ReadResult> {
            if self.0.is_empty() {
                Ok(ReadResult::Eof)
            } else {
                Ok(ReadResult::Line(self.0.remove(0)))
            }
        }
    }

    struct MemIo;

    impl ReplIo for MemIo {
        fn read_to_string(&self, path: &str) -> Result<String, String> {
            match path {
                "script.giac" => Ok("a:=2; a^10".into()),
                _ => Err(format!("エラー: ファイルを開けません: {path}")),
            }
        }
    }

    fn run(lines: &[&str]) -> (String, String) {
        let session = Session::new().unwrap();
        let mut source = Lines(lines.iter().map(|s| s.to_string()).collect());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        run_repl_with(&session, &mut source, &MemIo, &mut out, &mut err).unwrap();
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn needs_more_input_balances_brackets_and_strings() {
        assert!(needs_more_input("factor(x^2"));
        assert!(!needs_more_input("factor(x^2-1)"));
        assert!(needs_more_input("[1,[2"));
        assert!(needs_more_input("\"abc"));
        assert!(!needs_more_input("\"a\\\"b\""));
        assert!(!needs_more_input(":t ("));
    }

    #[test]
    fn parse_repl_command_variants() {
        assert_eq!(parse_repl_command(":help"), ReplCommand::Help);
        assert_eq!(parse_repl_command(":q"), ReplCommand::Quit);
        assert_eq!(parse_repl_command(":doc factor"), ReplCommand::Doc("factor".into()));
        assert_eq!(parse_repl_command(":cat"), ReplCommand::Category(None));
        assert_eq!(
            parse_repl_command(":cat calculus"),
            ReplCommand::Category(Some("calculus".into()))
        );
        assert_eq!(parse_repl_command(":t x+1"), ReplCommand::TypeOf("x+1".into()));
        assert_eq!(parse_repl_command(":doc"), ReplCommand::Invalid(":doc".into()));
        assert_eq!(parse_repl_command(":frob"), ReplCommand::Invalid(":frob".into()));
        assert_eq!(parse_repl_command("1+2"), ReplCommand::Eval("1+2".into()));
    }

    #[test]
    fn evaluates_lines_and_continuations() {
        let (out, err) = run(&["factor(x^2", "-1)", "diff(x^3,x)", ":q"]);
        assert!(out.contains("(x-1)*(x+1)"), "{out}");
        assert!(out.contains("3*x^2"), "{out}");
        assert!(err.is_empty(), "{err}");
    }

    #[test]
    fn reports_errors_on_stderr() {
        let (_, err) = run(&[":doc factr", "1/0+"]);
        assert!(err.contains("[CMD001]"), "{err}");
        assert!(err.contains("did you mean: factor"), "{err}");
        assert!(err.contains("[PAR"), "{err}");
    }

    #[test]
    fn introspection_commands() {
        let session = Session::new().unwrap();
        let msgs = execute(&session, ReplCommand::Json("x^2+1".into()), &MemIo);
        match msgs.as_slice() {
            [ReplMsg::Out(s)] => assert_eq!(s, r#"["Add",["Power","x",2],1]"#),
            _ => panic!("unexpected output"),
        }
        let msgs = execute(&session, ReplCommand::TypeOf("[[1,2],[3,4]]".into()), &MemIo);
        match msgs.as_slice() {
            [ReplMsg::Out(s)] => assert_eq!(s, "-- vect (Matrix)"),
            _ => panic!("unexpected output"),
        }
        let msgs = execute(&session, ReplCommand::Load("script.giac".into()), &MemIo);
        match msgs.as_slice() {
            [ReplMsg::Out(s)] => assert_eq!(s, "1024"),
            _ => panic!("unexpected output"),
        }
        let msgs = execute(&session, ReplCommand::Category(Some("nope".into())), &MemIo);
        assert!(matches!(msgs.as_slice(), [ReplMsg::Err(s)] if s.contains("REG010")));
    }
}
