//! CSV / Excel の読み込み（見出し行 + データ行）

use crate::error::{MatcherError, Result};
use calamine::{open_workbook_auto, Reader};
use std::path::Path;

/// 見出しと行データ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// 見出しに対応するセル値（空欄は `None`）
    pub fn cell<'a>(&self, row: &'a [String], header: &str) -> Option<&'a str> {
        let index = self.headers.iter().position(|h| h == header)?;
        row.get(index).map(|v| v.trim()).filter(|v| !v.is_empty())
    }
}

/// CSVを読み込む（区切り文字は "," / ";" を自動判定）
pub fn read_csv(path: &Path) -> Result<Table> {
    let content = std::fs::read_to_string(path)?;
    let content = content.trim_start_matches('\u{feff}');
    let first_line = content.lines().next().unwrap_or_default();
    let delimiter = if first_line.matches(';').count() > first_line.matches(',').count() {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| MatcherError::InvalidInput(format!("CSV見出しの解析に失敗: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| MatcherError::InvalidInput(format!("CSV解析エラー: {}", e)))?;
        let row: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();
        if row.iter().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

/// Excelの最初のシート（または指定シート）を読み込む
pub fn read_excel(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| MatcherError::InvalidInput(format!("Excelファイルを開けません: {}", e)))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| MatcherError::InvalidInput("シートがありません".into()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| MatcherError::InvalidInput(format!("シート {} の読み込みに失敗: {}", sheet_name, e)))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(row) => row.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Ok(Table::default()),
    };

    let rows = rows_iter
        .map(|row| row.iter().map(|c| c.to_string().trim().to_string()).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|v| !v.is_empty()))
        .collect();

    Ok(Table { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_csv_semicolon() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Наименование;Цена;Поставщик").unwrap();
        writeln!(file, "Кабель ВВГнг 3x2,5;120,50;ЭТМ").unwrap();
        writeln!(file, ";;").unwrap();
        writeln!(file, "Автомат C16;350;ЭТМ").unwrap();

        let table = read_csv(file.path()).unwrap();
        assert_eq!(table.headers, vec!["Наименование", "Цена", "Поставщик"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(&table.rows[0], "Цена"), Some("120,50"));
        assert_eq!(table.cell(&table.rows[1], "Наименование"), Some("Автомат C16"));
    }

    #[test]
    fn test_read_csv_comma_with_bom() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "\u{feff}id,name\n1,Лампа\n").unwrap();

        let table = read_csv(file.path()).unwrap();
        assert_eq!(table.headers, vec!["id", "name"]);
        assert_eq!(table.cell(&table.rows[0], "name"), Some("Лампа"));
        assert_eq!(table.cell(&table.rows[0], "missing"), None);
    }

    #[test]
    fn test_read_excel_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        writeln!(file, "not a workbook").unwrap();
        assert!(matches!(
            read_excel(file.path(), None),
            Err(MatcherError::InvalidInput(_))
        ));
    }
}
