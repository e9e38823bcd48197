//! 表形式データの列の自動判定
//!
//! 見出し行の文字列から、品名・品番・価格などの列を推定する。

use std::collections::HashMap;

/// 列の役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Id,
    Name,
    EquipmentCode,
    Article,
    Brand,
    TypeMark,
    Unit,
    Quantity,
    Price,
    Currency,
    Supplier,
    ClassCode,
}

impl ColumnRole {
    /// 見出しの候補（小文字）
    fn patterns(self) -> &'static [&'static str] {
        match self {
            ColumnRole::Id => &["id", "№", "номер", "item_id", "product_id", "идентификатор", "number"],
            ColumnRole::Name => &[
                "наименование",
                "название",
                "name",
                "material_name",
                "материал",
                "номенклатура",
                "товар",
                "product",
                "material",
                "item",
            ],
            ColumnRole::EquipmentCode => &[
                "код оборудования",
                "код обор",
                "equipment_code",
                "equipmentcode",
                "equipment",
                "оборудование",
            ],
            ColumnRole::Article => &["артикул", "article", "модель", "model", "sku", "part_number", "код товара", "код"],
            ColumnRole::Brand => &[
                "производитель",
                "изготовитель",
                "manufacturer",
                "бренд",
                "brand",
                "марка",
                "фирма",
            ],
            ColumnRole::TypeMark => &["тип, марка", "тип", "type_mark", "typemark", "type"],
            ColumnRole::Unit => &["ед.изм", "ед. изм", "единица измерения", "единица", "unit", "uom"],
            ColumnRole::Quantity => &["количество", "кол-во", "quantity", "qty"],
            ColumnRole::Price => &["цена", "price", "стоимость", "cost", "unit_price", "расценка"],
            ColumnRole::Currency => &["валюта", "currency"],
            ColumnRole::Supplier => &["поставщик", "supplier", "vendor", "продавец", "дилер", "контрагент"],
            ColumnRole::ClassCode => &["класс", "class_code", "classcode"],
        }
    }
}

/// 判定の優先順（先に判定した役割の列は後の役割に使わない）
const ROLE_ORDER: [ColumnRole; 12] = [
    ColumnRole::Name,
    ColumnRole::EquipmentCode,
    ColumnRole::Article,
    ColumnRole::TypeMark,
    ColumnRole::Brand,
    ColumnRole::Unit,
    ColumnRole::Quantity,
    ColumnRole::Price,
    ColumnRole::Currency,
    ColumnRole::Supplier,
    ColumnRole::ClassCode,
    ColumnRole::Id,
];

/// 部分一致を許す候補の最小文字数（"ед" などの誤検出を避ける）
const MIN_PARTIAL_LEN: usize = 4;

/// 役割 → 見出し
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    columns: HashMap<ColumnRole, String>,
}

impl ColumnMapping {
    /// 見出しから列を推定
    ///
    /// 完全一致を部分一致より優先する。
    pub fn detect(headers: &[String]) -> Self {
        let mut columns = HashMap::new();
        let mut used: Vec<&str> = Vec::new();

        for role in ROLE_ORDER {
            let available: Vec<&String> = headers
                .iter()
                .filter(|h| !h.trim().is_empty() && !used.contains(&h.as_str()))
                .collect();

            let found = find_exact(&available, role).or_else(|| find_partial(&available, role));
            if let Some(header) = found {
                used.push(header.as_str());
                columns.insert(role, header.clone());
            }
        }

        Self { columns }
    }

    pub fn get(&self, role: ColumnRole) -> Option<&str> {
        self.columns.get(&role).map(String::as_str)
    }

    /// いずれかの役割に割り当てられた見出しか
    pub fn is_mapped(&self, header: &str) -> bool {
        self.columns.values().any(|h| h == header)
    }

    pub fn has(&self, role: ColumnRole) -> bool {
        self.columns.contains_key(&role)
    }
}

fn find_exact<'a>(headers: &[&'a String], role: ColumnRole) -> Option<&'a String> {
    role.patterns().iter().find_map(|pattern| {
        headers
            .iter()
            .find(|h| h.trim().to_lowercase() == *pattern)
            .copied()
    })
}

fn find_partial<'a>(headers: &[&'a String], role: ColumnRole) -> Option<&'a String> {
    role.patterns()
        .iter()
        .filter(|pattern| pattern.chars().count() >= MIN_PARTIAL_LEN)
        .find_map(|pattern| {
            headers
                .iter()
                .find(|h| h.trim().to_lowercase().contains(pattern))
                .copied()
        })
}
