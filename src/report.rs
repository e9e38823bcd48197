//! 照合レポート（JSON）の保存と読み込み

use crate::batch::{BatchReport, MaterialFailure};
use crate::error::Result;
use price_matcher_common::{MatchMap, MatchStatistics, MatchSummary, Material};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 出力ファイルの中身
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    /// 作成日時（RFC 3339、ローカル時刻）
    #[serde(default)]
    pub generated_at: String,
    pub statistics: MatchStatistics,
    pub summaries: Vec<MatchSummary>,
    #[serde(default)]
    pub failures: Vec<MaterialFailure>,
    #[serde(default)]
    pub cancelled: bool,
    pub results: MatchMap,
}

impl MatchReport {
    pub fn from_batch(report: &BatchReport, materials: &[Material]) -> Self {
        Self {
            generated_at: chrono::Local::now().to_rfc3339(),
            statistics: report.statistics(),
            summaries: report.summaries(materials),
            failures: report.failures.clone(),
            cancelled: report.cancelled,
            results: report.results.clone(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// レポートを読み込む
    ///
    /// 照合結果マップだけのJSONも受け付け、統計とサマリはその場で計算する。
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if let Ok(report) = serde_json::from_str::<MatchReport>(&content) {
            return Ok(report);
        }

        let results: MatchMap = serde_json::from_str(&content)?;
        let batch = BatchReport {
            results,
            ..Default::default()
        };
        Ok(Self::from_batch(&batch, &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use price_matcher_common::{FieldSimilarities, MatchResult, PriceItem};
    use tempfile::TempDir;

    fn sample_batch() -> BatchReport {
        let material = Material::new("m1", "Кабель ВВГнг 3x2.5");
        let mut results = MatchMap::new();
        results.insert(
            "m1".to_string(),
            vec![MatchResult {
                material: material.clone(),
                price_item: PriceItem::new("p1", "Кабель ВВГнг 3x2,5"),
                overall_score: 92.0,
                field_similarities: FieldSimilarities::default(),
                search_score: 3.1,
            }],
        );
        results.insert("m2".to_string(), Vec::new());
        BatchReport {
            results,
            failures: vec![MaterialFailure {
                material_id: "m2".into(),
                material_name: "Лампа".into(),
                error: "timeout".into(),
            }],
            cancelled: false,
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("report.json");
        let materials = vec![Material::new("m1", "Кабель ВВГнг 3x2.5"), Material::new("m2", "Лампа")];

        let report = MatchReport::from_batch(&sample_batch(), &materials);
        assert_eq!(report.statistics.total_materials, 2);
        assert_eq!(report.summaries[1].material_name, "Лампа");
        assert!(chrono::DateTime::parse_from_rfc3339(&report.generated_at).is_ok());

        report.save(&path).unwrap();
        let loaded = MatchReport::load(&path).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_load_plain_result_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        let json = serde_json::to_string(&sample_batch().results).unwrap();
        std::fs::write(&path, json).unwrap();

        let loaded = MatchReport::load(&path).unwrap();
        assert_eq!(loaded.statistics.materials_with_matches, 1);
        assert_eq!(loaded.summaries[1].material_name, "Unknown");
        assert!(loaded.failures.is_empty());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(MatchReport::load(&path).is_err());
    }
}
