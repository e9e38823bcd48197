//! 検索クエリの組み立て

use price_matcher_common::Material;

/// 資材から検索クエリを作る
///
/// 品名に機器コード・製造元を付け足す（品名にすでに含まれる場合は省く）。
/// 品名が空の場合は空文字列を返す。
pub fn build_query(material: &Material) -> String {
    let name = material.name.trim();
    if name.is_empty() {
        return String::new();
    }

    let name_lower = name.to_lowercase();
    let mut parts = vec![name];

    for extra in [material.code(), material.manufacturer()].into_iter().flatten() {
        let extra = extra.trim();
        if !name_lower.contains(&extra.to_lowercase()) {
            parts.push(extra);
        }
    }

    parts.join(" ")
}
