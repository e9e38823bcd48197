//! 検索インデックスモジュール
//!
//! 照合エンジンは検索インデックスをブラックボックスとして扱い、
//! 関連度順の候補リスト（最大 `limit` 件）だけを受け取る。
//!
//! - [`ElasticsearchIndex`]: Elasticsearch の `_search` API
//! - [`InMemoryIndex`]: 価格表ファイルをメモリ上でBM25検索

pub mod elasticsearch;
pub mod memory;

pub use elasticsearch::{ElasticsearchConfig, ElasticsearchIndex};
pub use memory::InMemoryIndex;

use crate::error::Result;
use price_matcher_common::SearchHit;

/// 既定の候補取得件数
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// 検索インデックスの契約
///
/// 結果は関連度の降順、件数は `limit` 以下。呼び出しによる副作用はない。
pub trait SearchIndex: Send + Sync {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;

    /// ログ表示用の名前
    fn name(&self) -> &str {
        "search-index"
    }
}

impl<T: SearchIndex + ?Sized> SearchIndex for std::sync::Arc<T> {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        (**self).search(query, limit)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
