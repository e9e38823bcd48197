//! メモリ上の価格表に対するBM25検索
//!
//! 価格表ファイルを直接照合に使う場合や、テスト用の検索インデックスとして使う。

use super::SearchIndex;
use crate::error::Result;
use price_matcher_common::{PriceItem, SearchHit};
use std::collections::{BTreeSet, HashMap};

const K1: f64 = 1.5;
const B: f64 = 0.75;

#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    items: Vec<PriceItem>,
    // term -> [(文書番号, 出現回数)]
    postings: HashMap<String, Vec<(usize, u32)>>,
    doc_lengths: Vec<u32>,
    avg_doc_length: f64,
}

impl InMemoryIndex {
    pub fn new(items: Vec<PriceItem>) -> Self {
        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(items.len());

        for (doc, item) in items.iter().enumerate() {
            let tokens = tokenize(&indexed_text(item));
            doc_lengths.push(tokens.len() as u32);

            let mut term_freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *term_freqs.entry(token).or_insert(0) += 1;
            }
            for (term, tf) in term_freqs {
                postings.entry(term).or_default().push((doc, tf));
            }
        }

        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.iter().map(|&l| l as f64).sum::<f64>() / doc_lengths.len() as f64
        };

        Self {
            items,
            postings,
            doc_lengths,
            avg_doc_length,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[PriceItem] {
        &self.items
    }

    fn idf(&self, df: usize) -> f64 {
        let n = self.items.len() as f64;
        let df = df as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn term_score(&self, tf: u32, doc_len: u32, idf: f64) -> f64 {
        let tf = tf as f64;
        let norm = if self.avg_doc_length > 0.0 {
            doc_len as f64 / self.avg_doc_length
        } else {
            1.0
        };
        idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * norm))
    }
}

impl SearchIndex for InMemoryIndex {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if self.items.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let terms: BTreeSet<String> = tokenize(query).into_iter().collect();
        let mut scores: HashMap<usize, f64> = HashMap::new();

        for term in &terms {
            if let Some(docs) = self.postings.get(term) {
                let idf = self.idf(docs.len());
                for &(doc, tf) in docs {
                    *scores.entry(doc).or_insert(0.0) += self.term_score(tf, self.doc_lengths[doc], idf);
                }
            }
        }

        let mut ranked: Vec<(usize, f64)> = scores.into_iter().filter(|(_, s)| *s > 0.0).collect();
        ranked.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.items[a.0].id.cmp(&self.items[b.0].id))
        });
        ranked.truncate(limit);

        tracing::trace!(query, hits = ranked.len(), "メモリ検索");

        Ok(ranked
            .into_iter()
            .map(|(doc, score)| SearchHit {
                item: self.items[doc].clone(),
                score,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn indexed_text(item: &PriceItem) -> String {
    [
        Some(item.name.as_str()),
        item.article.as_deref(),
        item.brand.as_deref(),
        Some(item.supplier.as_str()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

/// 検索用の語分割（小文字化、数字中の "," は "." に統一）
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || (!c.is_alphanumeric() && c != '.' && c != ','))
        .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()).replace(',', "."))
        .filter(|s| s.chars().count() > 1 || s.chars().all(|c| c.is_ascii_digit()))
        .filter(|s| !s.is_empty())
        .collect()
}
