//! 照合結果の集計
//!
//! 照合結果マップから統計値と資材ごとのサマリを作る。

use crate::types::{MatchMap, MatchResult};
use serde::{Deserialize, Serialize};

/// 照合全体の統計
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatistics {
    pub total_materials: usize,
    pub materials_with_matches: usize,
    pub materials_without_matches: usize,
    /// 候補が見つかった資材の割合（%）
    pub match_rate: f64,
    pub total_matches: usize,
    /// 資材1件あたりの候補数
    #[serde(default)]
    pub average_matches_per_material: f64,
    pub average_score: f64,
    pub max_score: f64,
    pub min_score: f64,
}

impl MatchStatistics {
    pub fn from_results(results: &MatchMap) -> Self {
        let total_materials = results.len();
        let materials_with_matches = results.values().filter(|m| !m.is_empty()).count();
        let scores: Vec<f64> = results
            .values()
            .flatten()
            .map(|m| m.overall_score)
            .collect();
        let total_matches = scores.len();

        let mut stats = Self {
            total_materials,
            materials_with_matches,
            materials_without_matches: total_materials - materials_with_matches,
            total_matches,
            ..Default::default()
        };

        if total_materials > 0 {
            stats.match_rate = materials_with_matches as f64 / total_materials as f64 * 100.0;
            stats.average_matches_per_material = total_matches as f64 / total_materials as f64;
        }

        if !scores.is_empty() {
            stats.average_score = scores.iter().sum::<f64>() / total_matches as f64;
            stats.max_score = scores.iter().copied().fold(f64::MIN, f64::max);
            stats.min_score = scores.iter().copied().fold(f64::MAX, f64::min);
        }

        stats
    }
}

/// 資材ごとの最良候補サマリ（レポート出力用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub material_id: String,
    pub material_name: String,
    pub best_match_found: bool,
    pub best_match_score: f64,
    pub best_match_name: Option<String>,
    pub best_match_supplier: Option<String>,
    pub best_match_price: Option<f64>,
    pub best_match_currency: Option<String>,
    pub total_matches_found: usize,
}

/// 照合結果からサマリ行を作る
///
/// 候補なしの資材は名前が分からないため、`material_names`（ID→名前）で補う。
pub fn summarize<'a>(
    results: &MatchMap,
    material_names: impl Fn(&str) -> Option<&'a str>,
) -> Vec<MatchSummary> {
    results
        .iter()
        .map(|(id, matches)| match best_match(matches) {
            Some(best) => MatchSummary {
                material_id: id.clone(),
                material_name: best.material.name.clone(),
                best_match_found: true,
                best_match_score: best.overall_score,
                best_match_name: Some(best.price_item.name.clone()),
                best_match_supplier: Some(best.price_item.supplier.clone()),
                best_match_price: Some(best.price_item.price),
                best_match_currency: Some(best.price_item.currency.clone()),
                total_matches_found: matches.len(),
            },
            None => MatchSummary {
                material_id: id.clone(),
                material_name: material_names(id).unwrap_or("Unknown").to_string(),
                best_match_found: false,
                best_match_score: 0.0,
                best_match_name: None,
                best_match_supplier: None,
                best_match_price: None,
                best_match_currency: None,
                total_matches_found: 0,
            },
        })
        .collect()
}

fn best_match(matches: &[MatchResult]) -> Option<&MatchResult> {
    matches
        .iter()
        .max_by(|a, b| a.overall_score.total_cmp(&b.overall_score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldSimilarities, Material, PriceItem};

    fn result(material: &str, item: &str, score: f64) -> MatchResult {
        MatchResult {
            material: Material::new(material, format!("name {}", material)),
            price_item: PriceItem::new(item, format!("item {}", item)),
            overall_score: score,
            field_similarities: FieldSimilarities::default(),
            search_score: 1.0,
        }
    }

    #[test]
    fn test_statistics_empty() {
        let stats = MatchStatistics::from_results(&MatchMap::new());
        assert_eq!(stats, MatchStatistics::default());
    }

    #[test]
    fn test_statistics() {
        let mut results = MatchMap::new();
        results.insert("m1".into(), vec![result("m1", "p1", 90.0), result("m1", "p2", 60.0)]);
        results.insert("m2".into(), vec![result("m2", "p3", 30.0)]);
        results.insert("m3".into(), vec![]);

        let stats = MatchStatistics::from_results(&results);
        assert_eq!(stats.total_materials, 3);
        assert_eq!(stats.materials_with_matches, 2);
        assert_eq!(stats.materials_without_matches, 1);
        assert_eq!(stats.total_matches, 3);
        assert!((stats.average_score - 60.0).abs() < 1e-9);
        assert_eq!(stats.max_score, 90.0);
        assert_eq!(stats.min_score, 30.0);
        assert!((stats.match_rate - 66.666).abs() < 0.01);
        assert!((stats.average_matches_per_material - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize() {
        let mut results = MatchMap::new();
        results.insert("m1".into(), vec![result("m1", "p2", 60.0), result("m1", "p1", 95.0)]);
        results.insert("m2".into(), vec![]);

        let summary = summarize(&results, |id| if id == "m2" { Some("Щит ЩРН") } else { None });
        assert_eq!(summary.len(), 2);
        assert!(summary[0].best_match_found);
        assert_eq!(summary[0].best_match_name.as_deref(), Some("item p1"));
        assert_eq!(summary[0].total_matches_found, 2);
        assert!(!summary[1].best_match_found);
        assert_eq!(summary[1].material_name, "Щит ЩРН");
    }
}
