//! フィールド類似度モジュール
//!
//! 品名・品番・ブランドをそれぞれ0〜100で比較する。
//! 品名の比較では数値トークンの矛盾（寸法違いなど）に減点を掛ける。

pub mod metrics;
pub mod scorer;

pub use scorer::{ScoreCache, ScoredPair, Scorer, Weights};

use crate::normalizer::numeric::numeric_compatibility;
use crate::normalizer::Normalizer;
use price_matcher_common::NumericCompatibility;
use std::sync::Arc;

/// 数値が矛盾するときの減点係数
pub const NUMERIC_PENALTY_FACTOR: f64 = 0.7;
/// 数値が矛盾するときの上限スコア
pub const NUMERIC_SCORE_CAP: f64 = 70.0;

/// 品名ブレンドの重み（ratio / token_sort / token_set）
const RATIO_WEIGHT: f64 = 0.25;
const TOKEN_SORT_WEIGHT: f64 = 0.35;
const TOKEN_SET_WEIGHT: f64 = 0.40;

const CODE_CONTAINMENT_SCORE: f64 = 85.0;
const BRAND_CONTAINMENT_SCORE: f64 = 75.0;

/// 数値の矛盾に対する減点
pub fn apply_numeric_penalty(score: f64, compatibility: NumericCompatibility) -> f64 {
    if compatibility.is_compatible() {
        score
    } else {
        (score * NUMERIC_PENALTY_FACTOR).min(NUMERIC_SCORE_CAP)
    }
}

/// フィールド比較器（正規化器を共有する）
#[derive(Debug, Clone)]
pub struct FieldComparator {
    normalizer: Arc<Normalizer>,
}

impl FieldComparator {
    pub fn new(normalizer: Arc<Normalizer>) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// 品名の類似度
    pub fn text_similarity(&self, a: &str, b: &str) -> f64 {
        self.text_similarity_with(a, b, numeric_compatibility(a, b))
    }

    /// 数値整合性を算出済みの場合の品名類似度
    pub fn text_similarity_with(&self, a: &str, b: &str, compatibility: NumericCompatibility) -> f64 {
        let norm_a = self.normalizer.normalize(a);
        let norm_b = self.normalizer.normalize(b);

        let raw = if norm_a == norm_b {
            100.0
        } else if norm_a.is_empty() || norm_b.is_empty() {
            return 0.0;
        } else {
            RATIO_WEIGHT * metrics::ratio(&norm_a, &norm_b)
                + TOKEN_SORT_WEIGHT * metrics::token_sort_ratio(&norm_a, &norm_b)
                + TOKEN_SET_WEIGHT * metrics::token_set_ratio(&norm_a, &norm_b)
        };

        apply_numeric_penalty(raw, compatibility).clamp(0.0, 100.0)
    }
}

/// 品番の類似度（大文字化・空白除去の上で比較）
pub fn code_similarity(a: &str, b: &str) -> f64 {
    let norm_a: String = a.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase();
    let norm_b: String = b.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase();

    if norm_a.is_empty() || norm_b.is_empty() {
        return 0.0;
    }
    if norm_a == norm_b {
        return 100.0;
    }
    if norm_a.contains(&norm_b) || norm_b.contains(&norm_a) {
        return CODE_CONTAINMENT_SCORE;
    }
    metrics::ratio(&norm_a, &norm_b)
}

/// ブランドの類似度（小文字化・空白整理の上で比較）
pub fn brand_similarity(a: &str, b: &str) -> f64 {
    let norm_a = a.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let norm_b = b.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();

    if norm_a.is_empty() || norm_b.is_empty() {
        return 0.0;
    }
    if norm_a == norm_b {
        return 100.0;
    }
    if norm_a.contains(&norm_b) || norm_b.contains(&norm_a) {
        return BRAND_CONTAINMENT_SCORE;
    }
    metrics::ratio(&norm_a, &norm_b)
}
