//! 照合の型定義
//!
//! CLIとエンジンで共有される型:
//! - Material: 照合元の資材（明細側）
//! - PriceItem: 価格表の候補
//! - MatchResult: 資材×候補の照合結果

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 照合対象の資材（明細の1行）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_code: Option<String>,   // 機器コード・品番

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,     // 製造元

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_mark: Option<String>,        // 型式

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,             // 単位

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,            // 数量

    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
}

impl Material {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.equipment_code = Some(code.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// 空白のみのコードは未入力として扱う
    pub fn code(&self) -> Option<&str> {
        non_blank(self.equipment_code.as_deref())
    }

    pub fn manufacturer(&self) -> Option<&str> {
        non_blank(self.manufacturer.as_deref())
    }
}

fn default_currency() -> String {
    "RUB".to_string()
}

/// 価格表の1行（検索インデックスから返される候補）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceItem {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,          // 品番

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,            // ブランド（製造元）

    #[serde(default)]
    pub price: f64,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub supplier: String,                 // 仕入先

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_code: Option<String>,       // 分類コード

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Default for PriceItem {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            article: None,
            brand: None,
            price: 0.0,
            currency: default_currency(),
            supplier: String::new(),
            class_code: None,
            unit: None,
        }
    }
}

impl PriceItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_article(mut self, article: impl Into<String>) -> Self {
        self.article = Some(article.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn article(&self) -> Option<&str> {
        non_blank(self.article.as_deref())
    }

    pub fn brand(&self) -> Option<&str> {
        non_blank(self.brand.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// 検索インデックスの1件（関連度スコア付き）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub item: PriceItem,
    pub score: f64,
}

/// 数値トークンの整合性（3値）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumericCompatibility {
    /// 少なくとも一方に数値トークンがない
    #[default]
    Unknown,
    Compatible,
    /// 同種のトークンで値が食い違う
    Incompatible,
}

impl NumericCompatibility {
    pub fn is_compatible(self) -> bool {
        self != NumericCompatibility::Incompatible
    }
}

/// フィールド別の類似度（0〜100、比較しなかったフィールドは0）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSimilarities {
    pub name: f64,
    pub code: f64,
    pub brand: f64,
    pub numeric_compatibility: NumericCompatibility,
}

/// 照合結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub material: Material,
    pub price_item: PriceItem,
    pub overall_score: f64,
    pub field_similarities: FieldSimilarities,
    /// 検索インデックス側の関連度（同点時の並び替えに使用）
    #[serde(default)]
    pub search_score: f64,
}

/// 資材ID → 照合結果（スコア降順）
pub type MatchMap = BTreeMap<String, Vec<MatchResult>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_blank_fields_are_absent() {
        let material = Material::new("1", "Кабель ВВГнг 3x2.5").with_code("   ");
        assert_eq!(material.code(), None);
        assert_eq!(material.manufacturer(), None);
    }

    #[test]
    fn test_price_item_deserialize_defaults() {
        let json = r#"{"id": "p1", "name": "Автомат C16", "brand": "IEK"}"#;
        let item: PriceItem = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(item.currency, "RUB");
        assert_eq!(item.brand(), Some("IEK"));
        assert_eq!(item.article(), None);
        assert_eq!(item.price, 0.0);
    }

    #[test]
    fn test_material_serialize_camel_case() {
        let material = Material::new("m1", "Лампа").with_code("LED-10");
        let json = serde_json::to_string(&material).expect("シリアライズ失敗");
        assert!(json.contains("\"equipmentCode\":\"LED-10\""));
        assert!(!json.contains("manufacturer"));
    }

    #[test]
    fn test_numeric_compatibility_is_compatible() {
        assert!(NumericCompatibility::Unknown.is_compatible());
        assert!(NumericCompatibility::Compatible.is_compatible());
        assert!(!NumericCompatibility::Incompatible.is_compatible());
    }
}
