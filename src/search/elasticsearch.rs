//! Elasticsearch 検索クライアント
//!
//! 価格表インデックスに対して `_search` API を同期的に呼び出す。
//! リトライは行わない（失敗はそのまま `SearchUnavailable` として返す）。

use super::SearchIndex;
use crate::error::{MatcherError, Result};
use price_matcher_common::{PriceItem, SearchHit};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// 接続設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub index: String,
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: "price_list".to_string(),
            username: None,
            password: None,
            timeout_seconds: 30,
        }
    }
}

pub struct ElasticsearchIndex {
    client: Client,
    config: ElasticsearchConfig,
}

impl ElasticsearchIndex {
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .map_err(|e| MatcherError::Config(format!("HTTPクライアントの作成に失敗: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    /// `request_cache` はURLパラメータ（ボディに入れると400になる）
    fn search_url(&self) -> String {
        format!("{}/{}/_search?request_cache=true", self.base_url(), self.config.index)
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn authorize(&self, request: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_ref()),
            None => request,
        }
    }

    /// 接続確認
    pub fn ping(&self) -> Result<()> {
        let response = self
            .authorize(self.client.get(self.base_url()))
            .send()
            .map_err(|e| MatcherError::SearchUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MatcherError::SearchUnavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

impl SearchIndex for ElasticsearchIndex {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let url = self.search_url();
        let body = build_request_body(query, limit);

        let response = self
            .authorize(self.client.post(&url).json(&body))
            .send()
            .map_err(|e| MatcherError::SearchUnavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| MatcherError::SearchUnavailable(e.to_string()))?;

        if !status.is_success() {
            let detail: String = text.chars().take(200).collect();
            return Err(MatcherError::SearchUnavailable(format!("HTTP {}: {}", status, detail)));
        }

        let mut hits = parse_response(&text)?;
        hits.truncate(limit);
        tracing::debug!(query, hits = hits.len(), "Elasticsearch検索");
        Ok(hits)
    }

    fn name(&self) -> &str {
        "elasticsearch"
    }
}

/// `_search` のリクエストボディ
///
/// 品名・品番は曖昧一致、ブランド・仕入先はフレーズ一致で加点する。
pub fn build_request_body(query: &str, limit: usize) -> Value {
    json!({
        "query": {
            "bool": {
                "should": [
                    {
                        "multi_match": {
                            "query": query,
                            "fields": ["name^4", "material_name^4", "article^3", "description^2", "full_text"],
                            "type": "best_fields",
                            "fuzziness": "AUTO",
                            "boost": 2.0
                        }
                    },
                    {
                        "multi_match": {
                            "query": query,
                            "fields": ["brand^2", "category", "supplier"],
                            "type": "phrase",
                            "boost": 1.5
                        }
                    }
                ],
                "minimum_should_match": 1
            }
        },
        "size": limit
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: RawSource,
}

/// インデックス上の価格表ドキュメント（古い `material_name` フィールドにも対応）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSource {
    name: Option<String>,
    material_name: Option<String>,
    article: Option<String>,
    brand: Option<String>,
    price: Option<Value>,
    currency: Option<String>,
    supplier: Option<String>,
    class_code: Option<String>,
    unit: Option<String>,
}

impl RawHit {
    fn into_search_hit(self) -> SearchHit {
        let source = self.source;
        let name = source
            .name
            .filter(|n| !n.trim().is_empty())
            .or(source.material_name)
            .unwrap_or_default();

        let mut item = PriceItem::new(self.id, name);
        item.article = source.article;
        item.brand = source.brand;
        item.price = source.price.as_ref().and_then(parse_price).unwrap_or(0.0);
        if let Some(currency) = source.currency.filter(|c| !c.trim().is_empty()) {
            item.currency = currency;
        }
        item.supplier = source.supplier.unwrap_or_default();
        item.class_code = source.class_code;
        item.unit = source.unit;

        SearchHit {
            item,
            score: self.score.unwrap_or(0.0),
        }
    }
}

fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").replace(' ', "").parse().ok(),
        _ => None,
    }
}

/// `_search` のレスポンスを候補リストに変換
pub fn parse_response(body: &str) -> Result<Vec<SearchHit>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| MatcherError::SearchUnavailable(format!("レスポンス解析エラー: {}", e)))?;

    Ok(response
        .hits
        .hits
        .into_iter()
        .map(RawHit::into_search_hit)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "took": 3,
            "hits": {
                "total": {"value": 2},
                "hits": [
                    {"_id": "p1", "_score": 12.5, "_source": {
                        "name": "Кабель ВВГнг 3x2.5", "brand": "Кольчугино",
                        "price": 120.5, "currency": "RUB", "supplier": "ЭТМ"}},
                    {"_id": "p2", "_score": 8.0, "_source": {
                        "name": "", "material_name": "Кабель ВВГнг 3x1.5",
                        "price": "99,90", "article": "VVG-315"}}
                ]
            }
        }"#;

        let hits = parse_response(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item.id, "p1");
        assert_eq!(hits[0].score, 12.5);
        assert_eq!(hits[0].item.price, 120.5);
        assert_eq!(hits[0].item.supplier, "ЭТМ");

        assert_eq!(hits[1].item.name, "Кабель ВВГнг 3x1.5");
        assert_eq!(hits[1].item.price, 99.9);
        assert_eq!(hits[1].item.currency, "RUB");
        assert_eq!(hits[1].item.article(), Some("VVG-315"));
    }

    #[test]
    fn test_parse_response_invalid() {
        let err = parse_response("{\"error\": \"index_not_found\"}").unwrap_err();
        assert!(matches!(err, MatcherError::SearchUnavailable(_)));
    }

    #[test]
    fn test_request_body() {
        let body = build_request_body("Автомат C16", 15);
        assert_eq!(body["size"], 15);
        let should = body["query"]["bool"]["should"].as_array().unwrap();
        assert_eq!(should.len(), 2);
        assert_eq!(should[0]["multi_match"]["query"], "Автомат C16");
        assert_eq!(should[0]["multi_match"]["fuzziness"], "AUTO");
        assert_eq!(should[1]["multi_match"]["type"], "phrase");

        let top_level: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(top_level, vec!["query", "size"]);
    }

    #[test]
    fn test_request_cache_is_url_parameter() {
        let index = ElasticsearchIndex::new(ElasticsearchConfig {
            url: "http://es.local:9200/".to_string(),
            index: "prices".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(index.search_url(), "http://es.local:9200/prices/_search?request_cache=true");
    }

    #[test]
    fn test_unreachable_server() {
        let index = ElasticsearchIndex::new(ElasticsearchConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 1,
            ..Default::default()
        })
        .unwrap();

        let err = index.search("кабель", 10).unwrap_err();
        assert!(matches!(err, MatcherError::SearchUnavailable(_)));
        assert!(index.ping().is_err());
        // 空の検索語は通信しない
        assert!(index.search("  ", 10).unwrap().is_empty());
    }
}
