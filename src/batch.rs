//! 一括照合モジュール
//!
//! 固定数のワーカーで資材リストを並列に照合し、資材ID → 候補リストのマップにまとめる。
//! 1件の失敗はその資材の空の結果として記録し、バッチ全体は止めない。

use crate::cache::CacheStats;
use crate::error::{MatcherError, Result};
use crate::matcher::{MatchOptions, Matcher};
use crate::normalizer::Normalizer;
use crate::search::SearchIndex;
use crate::similarity::{FieldComparator, ScoreCache, Scorer};
use parking_lot::Mutex;
use price_matcher_common::{
    summarize, MatchMap, MatchStatistics, MatchSummary, Material, SynonymTable,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// 進捗コールバック（処理済み件数, 総件数, 資材名）
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize, &str) + Sync);

/// キャンセル通知（クローンは同じフラグを共有する）
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 一括照合オプション
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOptions {
    pub match_options: MatchOptions,
    /// ワーカー数（0は1として扱う）
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            match_options: MatchOptions::default(),
            concurrency: 4,
        }
    }
}

/// 照合に失敗した資材
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialFailure {
    pub material_id: String,
    pub material_name: String,
    pub error: String,
}

/// 一括照合の結果
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// 資材ID → 候補（スコア降順）。処理した資材はすべてキーを持つ
    pub results: MatchMap,
    pub failures: Vec<MaterialFailure>,
    /// 途中でキャンセルされた
    pub cancelled: bool,
}

impl BatchReport {
    pub fn statistics(&self) -> MatchStatistics {
        MatchStatistics::from_results(&self.results)
    }

    /// 資材ごとの最良候補
    pub fn summaries(&self, materials: &[Material]) -> Vec<MatchSummary> {
        let names: HashMap<&str, &str> = materials
            .iter()
            .map(|m| (m.id.as_str(), m.name.as_str()))
            .collect();
        summarize(&self.results, |id| names.get(id).copied())
    }
}

/// 一括照合器
#[derive(Clone)]
pub struct BatchMatcher {
    matcher: Matcher,
}

impl BatchMatcher {
    pub fn new(matcher: Matcher) -> Self {
        Self { matcher }
    }

    /// 正規化キャッシュとスコアキャッシュを持つ照合器を組み立てる
    ///
    /// キャッシュ容量0はキャッシュなし。
    pub fn with_caches(
        index: Arc<dyn SearchIndex>,
        synonyms: SynonymTable,
        normalize_cache: usize,
        score_cache: usize,
    ) -> Self {
        let normalizer = Arc::new(Normalizer::new(synonyms, normalize_cache));
        let mut scorer = Scorer::new(FieldComparator::new(normalizer));
        if score_cache > 0 {
            scorer = scorer.with_cache(Arc::new(ScoreCache::new(score_cache)));
        }
        Self::new(Matcher::new(index, scorer))
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// (正規化キャッシュ, スコアキャッシュ) の利用状況
    pub fn cache_stats(&self) -> (CacheStats, Option<CacheStats>) {
        let scorer = self.matcher.scorer();
        (
            scorer.comparator().normalizer().cache_stats(),
            scorer.cache().map(|cache| cache.stats()),
        )
    }

    /// 資材リストを並列に照合
    ///
    /// ワーカーは資材ごとにキャンセルを確認し、キャンセル後は新しい資材を取らない。
    /// 完了済みの結果はそのまま返す。
    pub fn match_all(
        &self,
        materials: &[Material],
        options: &BatchOptions,
        on_progress: ProgressFn<'_>,
        cancel: &CancelToken,
    ) -> Result<BatchReport> {
        ensure_unique_ids(materials)?;

        let concurrency = options.concurrency.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .build()
            .map_err(|e| MatcherError::ThreadPool(e.to_string()))?;

        let total = materials.len();
        let done = AtomicUsize::new(0);
        let results = Mutex::new(MatchMap::new());
        let failures = Mutex::new(Vec::new());

        tracing::info!(total, concurrency, index = self.matcher.index().name(), "一括照合を開始");

        pool.install(|| {
            materials.par_iter().for_each(|material| {
                if cancel.is_cancelled() {
                    return;
                }

                let matches = match self.matcher.match_material(material, &options.match_options) {
                    Ok(outcome) => outcome.into_results(),
                    Err(e) => {
                        tracing::warn!(material_id = %material.id, error = %e, "照合に失敗");
                        failures.lock().push(MaterialFailure {
                            material_id: material.id.clone(),
                            material_name: material.name.clone(),
                            error: e.to_string(),
                        });
                        Vec::new()
                    }
                };

                results.lock().insert(material.id.clone(), matches);
                let processed = done.fetch_add(1, Ordering::SeqCst) + 1;
                on_progress(processed, total, &material.name);
            });
        });

        let mut failures = failures.into_inner();
        failures.sort_by(|a, b| a.material_id.cmp(&b.material_id));

        let report = BatchReport {
            results: results.into_inner(),
            failures,
            cancelled: cancel.is_cancelled(),
        };

        tracing::info!(
            processed = done.load(Ordering::SeqCst),
            failures = report.failures.len(),
            cancelled = report.cancelled,
            "一括照合が終了"
        );

        Ok(report)
    }
}

/// 結果マップのキーになるため、資材IDの重複は受け付けない
fn ensure_unique_ids(materials: &[Material]) -> Result<()> {
    let mut seen = HashSet::with_capacity(materials.len());
    for material in materials {
        if !seen.insert(material.id.as_str()) {
            return Err(MatcherError::InvalidInput(format!(
                "資材IDが重複しています: {} ({})",
                material.id, material.name
            )));
        }
    }
    Ok(())
}

/// スコアが閾値以上の候補を持つ資材だけを抽出
pub fn exact_matches(report: &BatchReport, threshold: f64) -> MatchMap {
    report
        .results
        .iter()
        .filter_map(|(id, matches)| {
            let exact: Vec<_> = matches
                .iter()
                .filter(|m| m.overall_score >= threshold)
                .cloned()
                .collect();
            (!exact.is_empty()).then(|| (id.clone(), exact))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::InMemoryIndex;
    use price_matcher_common::PriceItem;

    fn no_progress(_: usize, _: usize, _: &str) {}

    fn batch_matcher() -> BatchMatcher {
        let index = Arc::new(InMemoryIndex::new(vec![
            PriceItem::new("p1", "Кабель ВВГнг 3x2.5"),
            PriceItem::new("p2", "Кабель ВВГнг 3x1.5"),
            PriceItem::new("p3", "Автомат ВА47-29 C16"),
        ]));
        BatchMatcher::with_caches(index, SynonymTable::default(), 100, 100)
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_match_all() {
        let materials = vec![
            Material::new("m1", "Кабель ВВГнг 3x2.5"),
            Material::new("m2", "Автомат ВА47-29 C16"),
            Material::new("m3", ""),
        ];
        let report = batch_matcher()
            .match_all(&materials, &BatchOptions::default(), &no_progress, &CancelToken::new())
            .unwrap();

        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results["m1"][0].price_item.id, "p1");
        assert_eq!(report.results["m2"][0].price_item.id, "p3");
        assert!(report.results["m3"].is_empty());
        assert!(report.failures.is_empty());
        assert!(!report.cancelled);

        let stats = report.statistics();
        assert_eq!(stats.total_materials, 3);
        assert_eq!(stats.materials_with_matches, 2);
    }

    #[test]
    fn test_cache_stats() {
        let matcher = batch_matcher();
        let materials = vec![Material::new("m1", "Кабель ВВГнг 3x2.5")];
        matcher
            .match_all(&materials, &BatchOptions::default(), &no_progress, &CancelToken::new())
            .unwrap();

        let (normalize, score) = matcher.cache_stats();
        assert!(normalize.entries > 0);
        assert_eq!(score.map(|s| s.entries), Some(2));
    }

    #[test]
    fn test_cancel_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let materials = vec![Material::new("m1", "Кабель")];
        let report = batch_matcher()
            .match_all(&materials, &BatchOptions::default(), &no_progress, &cancel)
            .unwrap();
        assert!(report.cancelled);
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_zero_concurrency_runs_single_worker() {
        let materials = vec![Material::new("m1", "Кабель ВВГнг 3x1.5")];
        let options = BatchOptions {
            concurrency: 0,
            ..Default::default()
        };
        let report = batch_matcher()
            .match_all(&materials, &options, &no_progress, &CancelToken::new())
            .unwrap();
        assert_eq!(report.results["m1"][0].price_item.id, "p2");
    }

    #[test]
    fn test_exact_matches() {
        let materials = vec![
            Material::new("m1", "Кабель ВВГнг 3x2.5"),
            Material::new("m2", "Кабель медный"),
        ];
        let report = batch_matcher()
            .match_all(&materials, &BatchOptions::default(), &no_progress, &CancelToken::new())
            .unwrap();

        let exact = exact_matches(&report, 95.0);
        assert_eq!(exact.len(), 1);
        assert!(exact["m1"].iter().all(|m| m.overall_score >= 95.0));
    }

    #[test]
    fn test_summaries_use_material_names() {
        let materials = vec![Material::new("m1", "Трансформатор ТМГ-1000")];
        let report = batch_matcher()
            .match_all(&materials, &BatchOptions::default(), &no_progress, &CancelToken::new())
            .unwrap();
        let summaries = report.summaries(&materials);
        assert_eq!(summaries.len(), 1);
        assert!(!summaries[0].best_match_found);
        assert_eq!(summaries[0].material_name, "Трансформатор ТМГ-1000");
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let materials = vec![
            Material::new("1", "Кабель ВВГнг 3x1.5"),
            Material::new("1", "Кабель ВВГнг 3x2.5"),
        ];
        let result = batch_matcher().match_all(
            &materials,
            &BatchOptions::default(),
            &no_progress,
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(MatcherError::InvalidInput(_))));
    }
}
