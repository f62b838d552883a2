// パス: src/registry/suggest.rs
// 役割: 未知のコマンド名に対する綴り訂正候補の計算
// 意図: 入力長に応じて許容距離を広げつつ、上限で無関係な候補を切り捨てる
// 関連ファイル: src/registry/mod.rs, src/invoke.rs

/// 文字単位の Levenshtein 距離。
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// 入力の文字数から許容する最大距離を決める（`min(1 + len/4, 3)`）。
pub fn threshold(input: &str) -> usize {
    (1 + input.chars().count() / 4).min(3)
}

/// `candidates` から `input` に近い名前を最大 `limit` 件、(距離, 名前) 順で返す。
/// 完全一致がある場合は訂正の必要がないので空を返す。
pub fn suggest<'a, I>(input: &str, candidates: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let max = threshold(input);
    let mut scored = Vec::new();
    for name in candidates {
        if name == input {
            return Vec::new();
        }
        // 長さの差だけで閾値を超えるものは計算しない
        let (n, m) = (name.chars().count(), input.chars().count());
        if n.abs_diff(m) > max {
            continue;
        }
        let d = edit_distance(input, name);
        if d <= max {
            scored.push((d, name));
        }
    }
    scored.sort();
    scored.dedup();
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(edit_distance("factor", "factor"), 0);
        assert_eq!(edit_distance("factr", "factor"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn threshold_grows_with_length_and_caps() {
        assert_eq!(threshold("ab"), 1);
        assert_eq!(threshold("factr"), 2);
        assert_eq!(threshold("averyveryverylongname"), 3);
    }

    #[test]
    fn candidates_are_ordered_by_distance_then_name() {
        let names = ["factor", "fcoeff", "factorial", "cfactor", "diff"];
        let out = suggest("factr", names, 4);
        assert_eq!(out.first().map(String::as_str), Some("factor"));
        assert!(!out.contains(&"diff".to_string()));
    }

    #[test]
    fn exact_match_suggests_nothing() {
        assert!(suggest("diff", ["diff", "dif"], 4).is_empty());
    }
}
