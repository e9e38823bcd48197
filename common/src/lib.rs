//! Price Matcher Common Library
//!
//! 照合エンジンとCLIで共有される型とユーティリティ

pub mod types;
pub mod synonyms;
pub mod stats;
pub mod error;

pub use types::{
    FieldSimilarities, MatchMap, MatchResult, Material, NumericCompatibility, PriceItem, SearchHit,
};
pub use synonyms::{SynonymConfig, SynonymTable};
pub use stats::{summarize, MatchStatistics, MatchSummary};
pub use error::{Error, Result};
