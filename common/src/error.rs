//! 同義語辞書・共有型のエラー

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("同義語ファイル {path} を読めません: {source}")]
    SynonymFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("同義語定義のJSONが不正: {0}")]
    Json(#[from] serde_json::Error),

    /// 空白を含む語（同義語は1語単位で置換するため）
    #[error("同義語は1語で指定してください: {0}")]
    MultiWordSynonym(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SynonymConfig;
    use std::path::Path;

    #[test]
    fn test_missing_synonym_file_names_path() {
        let error = SynonymConfig::from_file(Path::new("/nonexistent/synonyms.json")).unwrap_err();
        assert!(matches!(error, Error::SynonymFile { .. }));
        assert!(error.to_string().contains("/nonexistent/synonyms.json"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_broken_synonym_json() {
        let error = SynonymConfig::from_json(r#"{"groups": [["щит""#).unwrap_err();
        assert!(matches!(error, Error::Json(_)));
        assert!(error.to_string().starts_with("同義語定義のJSONが不正"));
    }

    #[test]
    fn test_multi_word_synonym_message() {
        let error = SynonymConfig::from_json(r#"{"groups": [["кабель", "силовой кабель"]]}"#)
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(error.to_string(), "同義語は1語で指定してください: силовой кабель");
    }
}
