//! 資材1件の照合パイプライン
//!
//! クエリ組み立て → 検索 → 採点 → 閾値で絞り込み → 並べ替え → 上位N件

pub mod query;

pub use query::build_query;

use crate::error::Result;
use crate::search::{SearchIndex, DEFAULT_SEARCH_LIMIT};
use crate::similarity::Scorer;
use price_matcher_common::{MatchResult, Material};
use std::cmp::Ordering;
use std::sync::Arc;

/// 照合オプション
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// この値未満の候補は捨てる（0〜100）
    pub threshold: f64,
    /// 資材ごとの最大候補数
    pub max_results: usize,
    /// 検索インデックスから取得する候補数
    pub search_limit: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: 20.0,
            max_results: 10,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// 照合の結果
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// 品名が空でクエリを作れない（検索しない）
    EmptyQuery,
    /// 検索結果が0件
    NoCandidates,
    /// 採点済みの候補（閾値で絞った結果、空の場合もある）
    Matched(Vec<MatchResult>),
}

impl MatchOutcome {
    pub fn into_results(self) -> Vec<MatchResult> {
        match self {
            MatchOutcome::Matched(results) => results,
            MatchOutcome::EmptyQuery | MatchOutcome::NoCandidates => Vec::new(),
        }
    }
}

/// 照合器
#[derive(Clone)]
pub struct Matcher {
    index: Arc<dyn SearchIndex>,
    scorer: Scorer,
}

impl Matcher {
    pub fn new(index: Arc<dyn SearchIndex>, scorer: Scorer) -> Self {
        Self { index, scorer }
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn index(&self) -> &dyn SearchIndex {
        self.index.as_ref()
    }

    /// 資材1件を照合
    ///
    /// 検索インデックスのエラーはそのまま返す（リトライしない）。
    pub fn match_material(&self, material: &Material, options: &MatchOptions) -> Result<MatchOutcome> {
        let query = build_query(material);
        if query.is_empty() {
            tracing::debug!(material_id = %material.id, "品名が空のため照合しません");
            return Ok(MatchOutcome::EmptyQuery);
        }

        let hits = self.index.search(&query, options.search_limit)?;
        if hits.is_empty() {
            tracing::debug!(material_id = %material.id, %query, "候補なし");
            return Ok(MatchOutcome::NoCandidates);
        }

        let mut results: Vec<MatchResult> = hits
            .iter()
            .map(|hit| self.scorer.score(material, hit))
            .filter(|result| result.overall_score >= options.threshold)
            .collect();

        rank_results(&mut results);
        results.truncate(options.max_results);

        tracing::debug!(
            material_id = %material.id,
            candidates = hits.len(),
            matched = results.len(),
            "照合完了"
        );

        Ok(MatchOutcome::Matched(results))
    }
}

/// スコア降順、同点は検索スコア降順、さらに価格表IDの昇順
pub fn rank_results(results: &mut [MatchResult]) {
    results.sort_by(compare_results);
}

fn compare_results(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.overall_score
        .total_cmp(&a.overall_score)
        .then_with(|| b.search_score.total_cmp(&a.search_score))
        .then_with(|| a.price_item.id.cmp(&b.price_item.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatcherError;
    use crate::normalizer::Normalizer;
    use crate::search::InMemoryIndex;
    use crate::similarity::FieldComparator;
    use price_matcher_common::{FieldSimilarities, PriceItem, SearchHit};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// 呼び出し回数を数え、固定の候補を返す検索インデックス
    struct FixedIndex {
        hits: Vec<SearchHit>,
        calls: AtomicUsize,
    }

    impl SearchIndex for FixedIndex {
        fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self.hits.iter().take(limit).cloned().collect())
        }
    }

    struct BrokenIndex;

    impl SearchIndex for BrokenIndex {
        fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>> {
            Err(MatcherError::SearchUnavailable("connection refused".into()))
        }
    }

    fn scorer() -> Scorer {
        Scorer::new(FieldComparator::new(Arc::new(Normalizer::default())))
    }

    fn fixed(items: Vec<(PriceItem, f64)>) -> Arc<FixedIndex> {
        Arc::new(FixedIndex {
            hits: items.into_iter().map(|(item, score)| SearchHit { item, score }).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_empty_name_does_not_search() {
        let index = fixed(vec![(PriceItem::new("p1", "Кабель"), 1.0)]);
        let matcher = Matcher::new(index.clone(), scorer());

        let outcome = matcher
            .match_material(&Material::new("m1", "  "), &MatchOptions::default())
            .unwrap();
        assert_eq!(outcome, MatchOutcome::EmptyQuery);
        assert_eq!(index.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn test_no_candidates() {
        let matcher = Matcher::new(fixed(vec![]), scorer());
        let outcome = matcher
            .match_material(&Material::new("m1", "Кабель"), &MatchOptions::default())
            .unwrap();
        assert_eq!(outcome, MatchOutcome::NoCandidates);
        assert!(outcome.into_results().is_empty());
    }

    #[test]
    fn test_threshold_sort_and_truncate() {
        let index = fixed(vec![
            (PriceItem::new("p3", "Трансформатор ТМГ"), 9.0),
            (PriceItem::new("p2", "Кабель ВВГнг 3x2.5 белый"), 5.0),
            (PriceItem::new("p1", "Кабель ВВГнг 3x2.5"), 4.0),
        ]);
        let matcher = Matcher::new(index, scorer());
        let options = MatchOptions {
            threshold: 50.0,
            max_results: 1,
            ..Default::default()
        };

        let results = matcher
            .match_material(&Material::new("m1", "Кабель ВВГнг 3x2.5"), &options)
            .unwrap()
            .into_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].price_item.id, "p1");
        assert_eq!(results[0].overall_score, 100.0);
    }

    #[test]
    fn test_search_error_is_returned() {
        let matcher = Matcher::new(Arc::new(BrokenIndex), scorer());
        let err = matcher
            .match_material(&Material::new("m1", "Кабель"), &MatchOptions::default())
            .unwrap_err();
        assert!(matches!(err, MatcherError::SearchUnavailable(_)));
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let result = |id: &str, score: f64, search_score: f64| MatchResult {
            material: Material::new("m1", "x"),
            price_item: PriceItem::new(id, "x"),
            overall_score: score,
            field_similarities: FieldSimilarities::default(),
            search_score,
        };
        let mut results = vec![
            result("b", 80.0, 1.0),
            result("a", 80.0, 1.0),
            result("c", 80.0, 3.0),
            result("d", 90.0, 0.0),
        ];
        rank_results(&mut results);
        let ids: Vec<&str> = results.iter().map(|r| r.price_item.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "a", "b"]);
    }

    #[test]
    fn test_with_memory_index() {
        let index = Arc::new(InMemoryIndex::new(vec![
            PriceItem::new("p1", "Автомат ВА47-29 1P C16").with_brand("IEK"),
            PriceItem::new("p2", "Автомат ВА47-29 1P C25").with_brand("IEK"),
        ]));
        let matcher = Matcher::new(index, scorer());
        let material = Material::new("m1", "Автомат ВА47-29 1P C16").with_manufacturer("IEK");

        let results = matcher
            .match_material(&material, &MatchOptions::default())
            .unwrap()
            .into_results();
        assert_eq!(results[0].price_item.id, "p1");
        assert!(results.iter().all(|r| r.overall_score >= 20.0));
    }
}
