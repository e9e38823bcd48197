//! 入力データの読み込み
//!
//! 資材明細・価格表を JSON / CSV / Excel から読み込む。
//! 表形式のファイルは見出し行から列を自動判定する。

pub mod columns;
pub mod table;

pub use columns::{ColumnMapping, ColumnRole};
pub use table::Table;

use crate::error::{MatcherError, Result};
use price_matcher_common::{Material, PriceItem};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// 資材・価格表の読み込み
pub trait DataLoader {
    fn load_materials(&self, path: &Path) -> Result<Vec<Material>>;
    fn load_price_items(&self, path: &Path) -> Result<Vec<PriceItem>>;
}

/// 拡張子から読み込み方式を選ぶ
pub fn loader_for(path: &Path) -> Result<Box<dyn DataLoader>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "json" => Ok(Box::new(JsonLoader)),
        "csv" | "xlsx" | "xlsm" | "xls" | "ods" => Ok(Box::new(TableLoader::default())),
        _ => Err(MatcherError::InvalidInput(format!(
            "対応していないファイル形式です: {}",
            path.display()
        ))),
    }
}

/// 資材明細を読み込む（形式は拡張子で判定）
pub fn load_materials(path: &Path) -> Result<Vec<Material>> {
    ensure_exists(path)?;
    let mut materials = loader_for(path)?.load_materials(path)?;
    let renamed = make_ids_unique(&mut materials);
    if renamed > 0 {
        tracing::warn!(path = %path.display(), renamed, "重複した資材IDに連番を付けました");
    }
    tracing::info!(path = %path.display(), count = materials.len(), "資材明細を読み込み");
    Ok(materials)
}

/// 価格表を読み込む（形式は拡張子で判定）
pub fn load_price_items(path: &Path) -> Result<Vec<PriceItem>> {
    ensure_exists(path)?;
    let items = loader_for(path)?.load_price_items(path)?;
    tracing::info!(path = %path.display(), count = items.len(), "価格表を読み込み");
    Ok(items)
}

/// 重複したIDに "-2", "-3" ... を付けて一意にする（先に現れた行はそのまま）
///
/// 付け替えた件数を返す。
fn make_ids_unique(materials: &mut [Material]) -> usize {
    let mut seen: HashSet<String> = HashSet::with_capacity(materials.len());
    let mut renamed = 0;

    for material in materials.iter_mut() {
        if seen.insert(material.id.clone()) {
            continue;
        }

        let mut n = 2;
        let mut candidate = format!("{}-{}", material.id, n);
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{}-{}", material.id, n);
        }
        seen.insert(candidate.clone());
        material.id = candidate;
        renamed += 1;
    }

    renamed
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(MatcherError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

/// JSON（配列、または `materials` / `items` などのキーを持つオブジェクト）
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLoader;

impl JsonLoader {
    fn load_records<T: DeserializeOwned>(&self, path: &Path, keys: &[&str]) -> Result<Vec<T>> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;

        let records = match value {
            Value::Array(records) => records,
            Value::Object(mut map) => keys
                .iter()
                .find_map(|key| match map.remove(*key) {
                    Some(Value::Array(records)) => Some(records),
                    _ => None,
                })
                .ok_or_else(|| {
                    MatcherError::InvalidInput(format!("配列が見つかりません（キー: {}）", keys.join(", ")))
                })?,
            _ => return Err(MatcherError::InvalidInput("JSONの形式が不正です".into())),
        };

        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let record = with_id(record, i + 1);
                serde_json::from_value(record).map_err(MatcherError::from)
            })
            .collect()
    }
}

impl DataLoader for JsonLoader {
    fn load_materials(&self, path: &Path) -> Result<Vec<Material>> {
        self.load_records(path, &["materials", "items", "data"])
    }

    fn load_price_items(&self, path: &Path) -> Result<Vec<PriceItem>> {
        self.load_records(path, &["price_list", "priceList", "items", "data"])
    }
}

/// IDのない（または数値IDの）レコードに文字列IDを付ける
fn with_id(mut record: Value, row_number: usize) -> Value {
    if let Value::Object(map) = &mut record {
        let id = match map.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => None,
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => Some(row_number.to_string()),
        };
        if let Some(id) = id {
            map.insert("id".to_string(), Value::String(id));
        }
    }
    record
}

/// CSV / Excel（見出し行から列を自動判定）
#[derive(Debug, Clone, Default)]
pub struct TableLoader {
    /// Excelのシート名（省略時は最初のシート）
    pub sheet: Option<String>,
}

impl TableLoader {
    fn read(&self, path: &Path) -> Result<Table> {
        let is_csv = path
            .extension()
            .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case("csv"));
        if is_csv {
            table::read_csv(path)
        } else {
            table::read_excel(path, self.sheet.as_deref())
        }
    }

    fn read_mapped(&self, path: &Path) -> Result<(Table, ColumnMapping, String)> {
        let table = self.read(path)?;
        let mapping = ColumnMapping::detect(&table.headers);
        let name_column = mapping
            .get(ColumnRole::Name)
            .map(str::to_string)
            .ok_or_else(|| MatcherError::InvalidInput(format!("品名の列が見つかりません: {}", path.display())))?;
        tracing::debug!(?mapping, "列を判定");
        Ok((table, mapping, name_column))
    }
}

impl DataLoader for TableLoader {
    fn load_materials(&self, path: &Path) -> Result<Vec<Material>> {
        let (table, mapping, name_column) = self.read_mapped(path)?;
        let text = |row: &[String], role: ColumnRole| -> Option<String> {
            mapping
                .get(role)
                .and_then(|h| table.cell(row, h))
                .map(str::to_string)
        };

        let mut materials = Vec::new();
        for (i, row) in table.rows.iter().enumerate() {
            let Some(name) = table.cell(row, &name_column) else {
                continue;
            };

            let id = text(row, ColumnRole::Id).unwrap_or_else(|| (i + 1).to_string());
            let mut material = Material::new(id, name);
            material.equipment_code = text(row, ColumnRole::EquipmentCode).or_else(|| text(row, ColumnRole::Article));
            material.manufacturer = text(row, ColumnRole::Brand);
            material.type_mark = text(row, ColumnRole::TypeMark);
            material.unit = text(row, ColumnRole::Unit);
            material.quantity = text(row, ColumnRole::Quantity).and_then(|q| parse_decimal(&q));

            // 割り当てのない列は仕様として保持
            for header in table.headers.iter().filter(|h| !h.is_empty() && !mapping.is_mapped(h)) {
                if let Some(value) = table.cell(row, header) {
                    material.specifications.insert(header.clone(), value.to_string());
                }
            }

            materials.push(material);
        }

        Ok(materials)
    }

    fn load_price_items(&self, path: &Path) -> Result<Vec<PriceItem>> {
        let (table, mapping, name_column) = self.read_mapped(path)?;
        let text = |row: &[String], role: ColumnRole| -> Option<String> {
            mapping
                .get(role)
                .and_then(|h| table.cell(row, h))
                .map(str::to_string)
        };

        let mut items = Vec::new();
        for (i, row) in table.rows.iter().enumerate() {
            let Some(name) = table.cell(row, &name_column) else {
                continue;
            };

            let id = text(row, ColumnRole::Id).unwrap_or_else(|| (i + 1).to_string());
            let mut item = PriceItem::new(id, name);
            item.article = text(row, ColumnRole::Article).or_else(|| text(row, ColumnRole::EquipmentCode));
            item.brand = text(row, ColumnRole::Brand);
            item.price = text(row, ColumnRole::Price)
                .and_then(|p| parse_decimal(&p))
                .unwrap_or(0.0);
            if let Some(currency) = text(row, ColumnRole::Currency) {
                item.currency = currency;
            }
            item.supplier = text(row, ColumnRole::Supplier).unwrap_or_default();
            item.class_code = text(row, ColumnRole::ClassCode);
            item.unit = text(row, ColumnRole::Unit);

            items.push(item);
        }

        Ok(items)
    }
}

/// "1 234,50" / "1234.5" を数値に変換
fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse().ok()
}
