// パス: tests/registry.rs
// 役割: エンジンのヘルプデータから構築した登録簿の検索・分類・候補提示を検証する
// 意図: セッションが持つ登録簿が組み込みエンジンのコマンドを漏れなく扱うことを保証する
// 関連ファイル: src/registry/mod.rs, src/registry/suggest.rs, src/registry/categories.rs
#[path = "test_support.rs"]
mod support;

use giac::registry::suggest::edit_distance;
use giac::{Category, ErrorCategory};

use support::session;

#[test]
fn suggestions_for_typos() {
    let s = session();
    assert!(s.suggest("factr").iter().any(|n| n == "factor"));
    assert!(s.suggest("intgrate").iter().any(|n| n == "integrate"));
    assert!(s.suggest("factor").is_empty());
    assert!(s.suggest("zzzzzzzzzz").is_empty());
    assert!(s.suggest("fctor").len() <= s.config().max_suggestions);
    assert_eq!(edit_distance("factr", "factor"), 1);
}

#[test]
fn categories_cover_registered_commands() {
    let s = session();
    let reg = s.registry();
    assert_eq!(reg.category_of("det"), Some(Category::LinearAlgebra));
    assert_eq!(reg.category_of("diff"), Some(Category::Calculus));
    let calculus = reg.commands_in_category("calculus").unwrap();
    assert!(calculus.contains(&"integrate"));
    assert!(calculus.windows(2).all(|w| w[0] < w[1]));
    let err = reg.commands_in_category("astrology").unwrap_err();
    assert_eq!(err.code(), "REG010");
    assert_eq!(err.category(), ErrorCategory::Usage);
    let total: usize = reg
        .categories()
        .iter()
        .map(|c| reg.commands_in_category(c.name()).unwrap().len())
        .sum();
    assert_eq!(total, reg.len());
}

#[test]
fn searches() {
    let s = session();
    let reg = s.registry();
    assert!(reg.search_prefix("fact").contains(&"factorial"));
    assert!(reg.search_regex("^i?factor$").unwrap().contains(&"ifactor"));
    assert_eq!(reg.search_regex("[").unwrap_err().code(), "REG020");
    assert!(reg.search_text("derivative").contains(&"diff"));
}

#[test]
fn help_text_lists_examples() {
    let s = session();
    let help = s.help("factor").unwrap();
    assert!(help.starts_with("factor [algebra]"), "{help}");
    assert!(help.contains("factor(x^2-1)"), "{help}");
    assert_eq!(s.help("factr").unwrap_err().code(), "CMD001");
}

#[test]
fn host_name_mangles_keywords() {
    let s = session();
    assert_eq!(s.host_name("type"), "type_");
    assert_eq!(s.host_name("mod"), "mod_");
    assert_eq!(s.host_name("diff"), "diff");
    // 予約語と同名でも登録簿にあるコマンドは呼び出せる
    assert_eq!(s.invoke("type", &[giac::Arg::Int(1)]).unwrap().to_string(), "DOM_INT");
}

#[test]
fn every_registered_name_exists_without_suggestions() {
    let s = session();
    let registry = s.registry();
    assert!(!registry.is_empty());
    for name in registry.names() {
        assert!(registry.exists(name), "{name}");
        assert!(registry.suggest(name, 4).is_empty(), "{name}");
        assert!(s.suggest(name).is_empty(), "{name}");
    }
}
