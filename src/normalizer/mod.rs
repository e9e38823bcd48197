//! テキスト正規化モジュール
//!
//! 資材名・価格表の品名を比較可能な形に揃える。
//!
//! ## 処理フロー
//! 1. Unicode正規化（NFC）と小文字化
//! 2. 小数点・句読点の整理
//! 3. 単位表記の統一
//! 4. 同義語の置換
//! 5. 語順の統一
//!
//! 寸法の区切り文字（x / х / ×）は別の文字に畳み込まない。
//! 数値トークンの抽出（[`numeric`]）は正規化前の生テキストに対して行う。

pub mod numeric;
pub mod units;

use crate::cache::{content_hash, BoundedCache, CacheStats};
use price_matcher_common::SynonymTable;
use unicode_normalization::UnicodeNormalization;

/// 正規化キャッシュの既定容量
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// 正規化器（同義語辞書とキャッシュを保持）
#[derive(Debug)]
pub struct Normalizer {
    synonyms: SynonymTable,
    cache: BoundedCache<String, String>,
}

impl Normalizer {
    pub fn new(synonyms: SynonymTable, cache_capacity: usize) -> Self {
        Self {
            synonyms,
            cache: BoundedCache::new(cache_capacity),
        }
    }

    /// テキストを正規化（キャッシュ付き）
    pub fn normalize(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let key = content_hash(text);
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let normalized = normalize_with(text, &self.synonyms);
        self.cache.insert(key, normalized.clone());
        normalized
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(SynonymTable::default(), DEFAULT_CACHE_CAPACITY)
    }
}

/// キャッシュを使わずに正規化
pub fn normalize_with(text: &str, synonyms: &SynonymTable) -> String {
    let lowered: String = text.nfc().collect::<String>().to_lowercase();
    let cleaned = clean_punctuation(&lowered);
    let with_units = units::canonicalize_units(&cleaned);

    let mut words: Vec<&str> = with_units
        .split_whitespace()
        .map(|w| synonyms.canonical(w))
        .collect();
    canonicalize_word_order(&mut words, synonyms);

    words.join(" ")
}

/// 許可した記号以外を空白に置き換え、空白を1つに詰める
///
/// 数字に挟まれた "," は小数点として "." に、数字に挟まれていない "." は空白になる。
fn clean_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        let between_digits = i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());

        match c {
            ',' | '.' if between_digits => out.push('.'),
            '(' | ')' | '×' => out.push(c),
            c if c.is_alphanumeric() || c.is_whitespace() => out.push(c),
            _ => out.push(' '),
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 2語の組を辞書の語順に揃える（変化がなくなるまで繰り返す）
fn canonicalize_word_order<'a>(words: &mut [&'a str], synonyms: &'a SynonymTable) {
    if words.len() < 2 {
        return;
    }

    for _ in 0..words.len() {
        let mut changed = false;
        for i in 0..words.len() - 1 {
            if let Some((first, second)) = synonyms.canonical_pair(words[i], words[i + 1]) {
                if first != words[i] || second != words[i + 1] {
                    words[i] = first;
                    words[i + 1] = second;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use price_matcher_common::SynonymConfig;

    fn electrical() -> Normalizer {
        let table = SynonymConfig::from_preset("electrical").unwrap().build().unwrap();
        Normalizer::new(table, 100)
    }

    #[test]
    fn test_empty_input() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize("   \t"), "");
        assert_eq!(normalizer.normalize("---"), "");
    }

    #[test]
    fn test_case_and_whitespace() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize("  Щит   РАСПРЕДЕЛИТЕЛЬНЫЙ "), "щит распределительный");
    }

    #[test]
    fn test_decimal_comma_and_punctuation() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize("Кабель ВВГнг-LS 3x2,5"), "кабель ввгнг ls 3x2.5");
        assert_eq!(normalizer.normalize("Лампа (LED), белая."), "лампа (led) белая");
    }

    #[test]
    fn test_dimension_separator_is_preserved() {
        let normalizer = Normalizer::default();
        let latin = normalizer.normalize("Кабель 3x2.5");
        let cyrillic = normalizer.normalize("Кабель 3х2.5");
        let times = normalizer.normalize("Кабель 3×2.5");
        assert_eq!(latin, "кабель 3x2.5");
        assert_eq!(cyrillic, "кабель 3х2.5");
        assert_eq!(times, "кабель 3×2.5");
    }

    #[test]
    fn test_units() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize("Провод 2,5 кв.мм"), "провод 2.5mm2");
        assert_eq!(normalizer.normalize("Лампа 10 Вт 220В"), "лампа 10w 220v");
    }

    #[test]
    fn test_synonyms() {
        let normalizer = electrical();
        assert_eq!(normalizer.normalize("Автомат C16"), "выключатель c16");
        assert_eq!(normalizer.normalize("Wire 3x1.5"), normalizer.normalize("Cable 3x1.5"));
    }

    #[test]
    fn test_word_order() {
        let normalizer = electrical();
        assert_eq!(normalizer.normalize("Канал кабельный 25x16"), "кабельный канал 25x16");
        assert_eq!(normalizer.normalize("Кабельный канал 25x16"), "кабельный канал 25x16");
        // 同義語の置換後に語順が揃う
        assert_eq!(
            normalizer.normalize("Автомат автоматический"),
            "автоматический выключатель"
        );
    }

    #[test]
    fn test_idempotent() {
        let normalizer = electrical();
        let samples = [
            "Кабель ВВГнг-LS 3x2,5 мм2",
            "Автомат ВА47-29 1P C16 (IEK)",
            "Канал кабельный 25х16, белый",
            "Лампа светодиодная 10Вт 220В E27",
            "Провод ПВ1 2,5 кв.мм",
            "Двигатель 1,5 кВт 16 А",
            "..., 3.x.5 ,2,",
            "İstanbul ß ǅ",
            "",
        ];
        for text in samples {
            let once = normalizer.normalize(text);
            let twice = normalizer.normalize(&once);
            assert_eq!(once, twice, "input: {}", text);
        }
    }

    #[test]
    fn test_cache_hits() {
        let normalizer = Normalizer::new(SynonymTable::default(), 10);
        normalizer.normalize("Кабель 3x2.5");
        normalizer.normalize("Кабель 3x2.5");
        let stats = normalizer.cache_stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_cache_full_still_normalizes() {
        let normalizer = Normalizer::new(SynonymTable::default(), 1);
        assert_eq!(normalizer.normalize("A"), "a");
        assert_eq!(normalizer.normalize("B"), "b");
        assert_eq!(normalizer.cache_stats().entries, 1);
        assert_eq!(normalizer.cache_stats().rejected, 1);
    }
}
