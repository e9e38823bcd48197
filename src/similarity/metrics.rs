//! 編集距離系の類似度指標（0〜100）

use std::collections::BTreeSet;
use strsim::normalized_levenshtein;

/// 正規化レーベンシュタイン距離による比率
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

/// 語を並べ替えてから比較（語順を無視）
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// 語の集合で比較（共通部分と差分を分けて比較し、最大値を取る）
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();

    let common = join(set_a.intersection(&set_b).copied());
    let only_a = join(set_a.difference(&set_b).copied());
    let only_b = join(set_b.difference(&set_a).copied());

    let combined_a = join([common.as_str(), only_a.as_str()].into_iter().filter(|s| !s.is_empty()));
    let combined_b = join([common.as_str(), only_b.as_str()].into_iter().filter(|s| !s.is_empty()));

    let mut best = ratio(&combined_a, &combined_b);
    if !common.is_empty() {
        best = best
            .max(ratio(&common, &combined_a))
            .max(ratio(&common, &combined_b));
    }
    best
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join<'a>(tokens: impl Iterator<Item = &'a str>) -> String {
    tokens.collect::<Vec<_>>().join(" ")
}
