use crate::batch::BatchOptions;
use crate::error::{MatcherError, Result};
use crate::matcher::MatchOptions;
use crate::normalizer::DEFAULT_CACHE_CAPACITY;
use crate::search::{ElasticsearchConfig, DEFAULT_SEARCH_LIMIT};
use price_matcher_common::{SynonymConfig, SynonymTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_ES_URL: &str = "PRICE_MATCHER_ES_URL";
const ENV_ES_PASSWORD: &str = "PRICE_MATCHER_ES_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub elasticsearch: ElasticsearchConfig,
    pub matching: MatchingConfig,
    pub synonyms: SynonymSettings,

    /// 環境変数で上書きされる前のパスワード（保存時はこちらを書く）
    #[serde(skip)]
    file_password: Option<String>,
    #[serde(skip)]
    password_from_env: bool,
}

/// 照合パラメータ
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub threshold: f64,
    pub max_results: usize,
    pub concurrency: usize,
    pub search_limit: usize,
    pub normalize_cache: usize,
    pub score_cache: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: 20.0,
            max_results: 10,
            concurrency: 4,
            search_limit: DEFAULT_SEARCH_LIMIT,
            normalize_cache: DEFAULT_CACHE_CAPACITY,
            score_cache: 100_000,
        }
    }
}

impl MatchingConfig {
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            match_options: MatchOptions {
                threshold: self.threshold,
                max_results: self.max_results,
                search_limit: self.search_limit,
            },
            concurrency: self.concurrency,
        }
    }
}

/// 同義語辞書の指定（プリセットとファイルは併用可能）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynonymSettings {
    pub preset: Option<String>,
    pub file: Option<PathBuf>,
}

impl Default for SynonymSettings {
    fn default() -> Self {
        Self {
            preset: Some("electrical".to_string()),
            file: None,
        }
    }
}

impl SynonymSettings {
    /// 設定から辞書を構築
    pub fn build(&self) -> Result<SynonymTable> {
        let mut config = match &self.preset {
            Some(name) => SynonymConfig::from_preset(name)
                .ok_or_else(|| MatcherError::Config(format!("不明な同義語プリセット: {}", name)))?,
            None => SynonymConfig::default(),
        };

        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(MatcherError::FileNotFound(path.display().to_string()));
            }
            config.merge(&SynonymConfig::from_file(path)?);
        }

        Ok(config.build()?)
    }
}

impl Config {
    /// 既定の場所から読み込む（ファイルがなければ既定値）
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// 指定ファイルから読み込む（ファイルがなければ既定値）
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // 環境変数から来た秘密情報はファイルに書かない
        let mut on_disk = self.clone();
        if self.password_from_env {
            on_disk.elasticsearch.password = self.file_password.clone();
        }

        let content = serde_json::to_string_pretty(&on_disk)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| MatcherError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("price-matcher").join("config.json"))
    }

    /// 環境変数を優先
    fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    fn apply_env_with(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(ENV_ES_URL) {
            if !url.trim().is_empty() {
                self.elasticsearch.url = url;
            }
        }
        if let Some(password) = var(ENV_ES_PASSWORD) {
            if !self.password_from_env {
                self.file_password = self.elasticsearch.password.take();
                self.password_from_env = true;
            }
            self.elasticsearch.password = Some(password);
        }
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.matching.threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(MatcherError::Config(format!(
                "threshold は0〜100で指定してください: {}",
                threshold
            )));
        }
        if self.matching.search_limit == 0 {
            return Err(MatcherError::Config("search_limit は1以上で指定してください".into()));
        }
        Ok(())
    }
}
