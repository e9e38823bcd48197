//! 総合スコアの算出
//!
//! 品名・品番・ブランドの類似度を、入力のあるフィールドに応じて
//! 再配分した重みで合成する。

use super::{brand_similarity, code_similarity, FieldComparator, NUMERIC_SCORE_CAP};
use crate::cache::{content_hash, BoundedCache};
use crate::normalizer::numeric::numeric_compatibility;
use price_matcher_common::{FieldSimilarities, MatchResult, Material, PriceItem, SearchHit};
use std::sync::Arc;

/// 基本の重み
pub const BASE_NAME_WEIGHT: f64 = 0.6;
pub const BASE_CODE_WEIGHT: f64 = 0.25;
pub const BASE_BRAND_WEIGHT: f64 = 0.15;
/// 欠けたフィールドの重みのうち品名に回す割合（残りはもう一方のフィールドへ）
pub const NAME_SHARE: f64 = 0.6;

/// (資材キー, 価格表キー) → スコア
///
/// キーはIDに採点対象フィールドの内容ハッシュを付けたもの。
/// IDが重複していても内容が違えば別のエントリになる。
pub type ScoreCache = BoundedCache<(String, String), ScoredPair>;

/// フィールドの重み（合計は常に1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub name: f64,
    pub code: f64,
    pub brand: f64,
}

impl Weights {
    /// 入力のあるフィールドに応じて重みを再配分
    pub fn redistribute(has_code: bool, has_brand: bool) -> Self {
        let (code, brand) = match (has_code, has_brand) {
            (true, true) => (BASE_CODE_WEIGHT, BASE_BRAND_WEIGHT),
            (false, true) => (0.0, BASE_BRAND_WEIGHT + BASE_CODE_WEIGHT * (1.0 - NAME_SHARE)),
            (true, false) => (BASE_CODE_WEIGHT + BASE_BRAND_WEIGHT * (1.0 - NAME_SHARE), 0.0),
            (false, false) => (0.0, 0.0),
        };
        Self {
            name: 1.0 - code - brand,
            code,
            brand,
        }
    }

    pub fn sum(&self) -> f64 {
        self.name + self.code + self.brand
    }
}

/// キャッシュに保存するスコア
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPair {
    pub overall_score: f64,
    pub field_similarities: FieldSimilarities,
}

/// 資材と候補の採点器
#[derive(Debug, Clone)]
pub struct Scorer {
    comparator: FieldComparator,
    cache: Option<Arc<ScoreCache>>,
}

impl Scorer {
    pub fn new(comparator: FieldComparator) -> Self {
        Self {
            comparator,
            cache: None,
        }
    }

    /// ワーカー間で共有するスコアキャッシュを設定
    pub fn with_cache(mut self, cache: Arc<ScoreCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn comparator(&self) -> &FieldComparator {
        &self.comparator
    }

    pub fn cache(&self) -> Option<&Arc<ScoreCache>> {
        self.cache.as_ref()
    }

    /// 資材と候補を採点
    pub fn score(&self, material: &Material, hit: &SearchHit) -> MatchResult {
        let key = (material_key(material), item_key(&hit.item));
        let cached = self.cache.as_ref().and_then(|cache| cache.get(&key));

        let pair = match cached {
            Some(pair) => pair,
            None => {
                let pair = self.score_pair(material, hit);
                if let Some(cache) = &self.cache {
                    cache.insert(key, pair);
                }
                pair
            }
        };

        MatchResult {
            material: material.clone(),
            price_item: hit.item.clone(),
            overall_score: pair.overall_score,
            field_similarities: pair.field_similarities,
            search_score: hit.score,
        }
    }

    fn score_pair(&self, material: &Material, hit: &SearchHit) -> ScoredPair {
        let item = &hit.item;
        let compatibility = numeric_compatibility(&material.name, &item.name);
        let name = self
            .comparator
            .text_similarity_with(&material.name, &item.name, compatibility);

        let code = match (material.code(), item.article()) {
            (Some(a), Some(b)) => Some(code_similarity(a, b)),
            _ => None,
        };
        let brand = match (material.manufacturer(), item.brand()) {
            (Some(a), Some(b)) => Some(brand_similarity(a, b)),
            _ => None,
        };

        let weights = Weights::redistribute(code.is_some(), brand.is_some());
        let mut overall = name * weights.name;
        if let Some(code) = code {
            overall += code * weights.code;
        }
        if let Some(brand) = brand {
            overall += brand * weights.brand;
        }

        if !compatibility.is_compatible() {
            overall = overall.min(NUMERIC_SCORE_CAP);
        }

        ScoredPair {
            overall_score: overall.clamp(0.0, 100.0),
            field_similarities: FieldSimilarities {
                name,
                code: code.unwrap_or(0.0),
                brand: brand.unwrap_or(0.0),
                numeric_compatibility: compatibility,
            },
        }
    }
}

fn material_key(material: &Material) -> String {
    let fields = [
        material.name.as_str(),
        material.code().unwrap_or_default(),
        material.manufacturer().unwrap_or_default(),
    ];
    format!("{}:{}", material.id, content_hash(&fields.join("\u{1f}")))
}

fn item_key(item: &PriceItem) -> String {
    let fields = [
        item.name.as_str(),
        item.article().unwrap_or_default(),
        item.brand().unwrap_or_default(),
    ];
    format!("{}:{}", item.id, content_hash(&fields.join("\u{1f}")))
}
