//! Price Matcher
//!
//! 資材明細（品名・品番・メーカー）を仕入先の価格表と照合し、
//! 資材ごとに採点済みの候補リストを返す。

pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod matcher;
pub mod normalizer;
pub mod report;
pub mod search;
pub mod similarity;

pub use batch::{BatchMatcher, BatchOptions, BatchReport, CancelToken};
pub use error::{MatcherError, Result};
pub use matcher::{MatchOptions, MatchOutcome, Matcher};
pub use normalizer::Normalizer;
pub use search::{ElasticsearchIndex, InMemoryIndex, SearchIndex};
pub use similarity::{FieldComparator, Scorer};
