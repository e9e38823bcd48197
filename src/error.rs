use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("検索インデックスに接続できません: {0}")]
    SearchUnavailable(String),

    #[error("入力データが不正: {0}")]
    InvalidInput(String),

    #[error("ワーカープールの作成に失敗: {0}")]
    ThreadPool(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] price_matcher_common::Error),
}

pub type Result<T> = std::result::Result<T, MatcherError>;
