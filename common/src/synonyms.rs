//! 同義語辞書モジュール
//!
//! 資材名の表記ゆれ（同義語・語順）を設定データとして管理する。
//! 業務ロジックに辞書を埋め込まず、プリセットまたはJSONで与える。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 同義語設定（JSONと相互変換可能）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynonymConfig {
    /// 同義語グループ（先頭の語が正規形）
    #[serde(default)]
    pub groups: Vec<Vec<String>>,
    /// 語順を統一する2語の組（この順序が正規形）
    #[serde(default)]
    pub word_order: Vec<[String; 2]>,
}

impl SynonymConfig {
    /// 組み込みプリセットを取得
    pub fn from_preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "electrical" | "электрика" => Some(Self::electrical_preset()),
            "none" | "empty" => Some(Self::default()),
            _ => None,
        }
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::SynonymFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// 電気資材向けプリセット
    fn electrical_preset() -> Self {
        let groups = [
            &["выключатель", "автомат"][..],
            &["светодиодный", "led"],
            &["кабель", "провод"],
            &["breaker", "switch"],
            &["cable", "wire"],
        ];
        let word_order = [
            ["кабельный", "канал"],
            ["автоматический", "выключатель"],
            ["светодиодная", "лампа"],
            ["cable", "channel"],
            ["circuit", "breaker"],
        ];

        Self {
            groups: groups
                .iter()
                .map(|g| g.iter().map(|s| s.to_string()).collect())
                .collect(),
            word_order: word_order
                .iter()
                .map(|[a, b]| [a.to_string(), b.to_string()])
                .collect(),
        }
    }

    /// 設定をマージ（後から追加した設定を末尾に追加）
    pub fn merge(&mut self, other: &SynonymConfig) {
        self.groups.extend(other.groups.iter().cloned());
        self.word_order.extend(other.word_order.iter().cloned());
    }

    /// 照合用の辞書を構築
    ///
    /// 重なり合うグループは1つに統合され、最初に登場したグループの正規形に揃う。
    /// 正規形は必ず自分自身に写るため、置換は冪等になる。
    pub fn build(&self) -> Result<SynonymTable> {
        let mut terms: HashMap<String, String> = HashMap::new();

        for group in &self.groups {
            let words: Vec<String> = group
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect();

            if words.is_empty() {
                continue;
            }
            if let Some(bad) = words.iter().find(|w| w.contains(char::is_whitespace)) {
                return Err(Error::MultiWordSynonym(bad.clone()));
            }

            // 既存グループと重なる場合はその正規形を引き継ぐ
            let canonical = words
                .iter()
                .find_map(|w| terms.get(w).cloned())
                .unwrap_or_else(|| words[0].clone());

            for word in &words {
                if let Some(previous) = terms.get(word).cloned() {
                    if previous != canonical {
                        for target in terms.values_mut() {
                            if *target == previous {
                                *target = canonical.clone();
                            }
                        }
                    }
                }
                terms.insert(word.clone(), canonical.clone());
            }
        }

        let lookup = |w: &str| -> String {
            let w = w.trim().to_lowercase();
            terms.get(&w).cloned().unwrap_or(w)
        };

        let mut word_order = HashMap::new();
        for [first, second] in &self.word_order {
            let first = lookup(first);
            let second = lookup(second);
            if first.is_empty() || second.is_empty() || first == second {
                continue;
            }
            let canonical = (first.clone(), second.clone());
            word_order
                .entry((second, first))
                .or_insert_with(|| canonical.clone());
            word_order.entry(canonical.clone()).or_insert(canonical);
        }

        Ok(SynonymTable { terms, word_order })
    }
}

/// 構築済みの同義語辞書
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    terms: HashMap<String, String>,
    word_order: HashMap<(String, String), (String, String)>,
}

impl SynonymTable {
    /// 語の正規形（辞書にない語はそのまま）
    pub fn canonical<'a>(&'a self, word: &'a str) -> &'a str {
        self.terms.get(word).map(String::as_str).unwrap_or(word)
    }

    /// 2語の組の正規順序
    pub fn canonical_pair(&self, first: &str, second: &str) -> Option<(&str, &str)> {
        self.word_order
            .get(&(first.to_string(), second.to_string()))
            .map(|(a, b)| (a.as_str(), b.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.word_order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_electrical_preset() {
        let table = SynonymConfig::from_preset("electrical").unwrap().build().unwrap();
        assert_eq!(table.canonical("автомат"), "выключатель");
        assert_eq!(table.canonical("выключатель"), "выключатель");
        assert_eq!(table.canonical("wire"), "cable");
        assert_eq!(table.canonical("щит"), "щит");
    }

    #[test]
    fn test_unknown_preset() {
        assert!(SynonymConfig::from_preset("plumbing").is_none());
    }

    #[test]
    fn test_overlapping_groups_fold_to_one_canonical() {
        let config = SynonymConfig::from_json(
            r#"{"groups": [["a", "b"], ["c", "d"], ["d", "b"]]}"#,
        )
        .unwrap();
        let table = config.build().unwrap();

        let canonical = table.canonical("a");
        for word in ["a", "b", "c", "d"] {
            assert_eq!(table.canonical(word), canonical, "word {}", word);
        }
        // 正規形は自分自身に写る
        assert_eq!(table.canonical(canonical), canonical);
    }

    #[test]
    fn test_word_order_both_directions() {
        let table = SynonymConfig::from_preset("electrical").unwrap().build().unwrap();
        assert_eq!(table.canonical_pair("канал", "кабельный"), Some(("кабельный", "канал")));
        assert_eq!(table.canonical_pair("кабельный", "канал"), Some(("кабельный", "канал")));
        assert_eq!(table.canonical_pair("кабельный", "лоток"), None);
    }

    #[test]
    fn test_word_order_uses_canonical_words() {
        let config = SynonymConfig::from_json(
            r#"{"groups": [["breaker", "switch"]], "word_order": [["circuit", "switch"]]}"#,
        )
        .unwrap();
        let table = config.build().unwrap();
        assert_eq!(table.canonical_pair("breaker", "circuit"), Some(("circuit", "breaker")));
    }

    #[test]
    fn test_multi_word_term_rejected() {
        let config = SynonymConfig::from_json(r#"{"groups": [["кабель канал", "короб"]]}"#).unwrap();
        assert!(matches!(config.build(), Err(Error::MultiWordSynonym(_))));
    }

    #[test]
    fn test_merge() {
        let mut config = SynonymConfig::from_preset("none").unwrap();
        config.merge(&SynonymConfig::from_json(r#"{"groups": [["лампа", "лампочка"]]}"#).unwrap());
        let table = config.build().unwrap();
        assert_eq!(table.canonical("лампочка"), "лампа");
    }
}
