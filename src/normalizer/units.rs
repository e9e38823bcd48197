//! 単位表記の統一
//!
//! 数値の直後に付く単位の綴りを1つの表記に揃える。
//! 句読点処理の後（小数点は "."、"кв.мм" は "кв мм"）のテキストを前提とする。

use regex::{Captures, Regex};

lazy_static::lazy_static! {
    // 置換の順序に意味がある（断面積の "кв мм" を kV より先に処理する）
    static ref UNIT_RULES: Vec<(Regex, &'static str)> = vec![
        (
            Regex::new(r"(\d+(?:\.\d+)?)\s*(?:мм²|мм2|mm²|mm2|кв\s*мм|sq\s*mm)").unwrap(),
            "${1}mm2",
        ),
        (Regex::new(r"(\d+(?:\.\d+)?)\s*(?:квт|kw)\b").unwrap(), "${1}kw"),
        (Regex::new(r"(\d+(?:\.\d+)?)\s*(?:ватт\w*|вт|w)\b").unwrap(), "${1}w"),
        (Regex::new(r"(\d+(?:\.\d+)?)\s*(?:кв|kv)\b").unwrap(), "${1}kv"),
    ];
    // 1文字の単位（в / а）は前置詞と見分ける必要があるため別扱い
    static ref LETTER_UNIT_RULES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(\d+(?:\.\d+)?)(\s*)(вольт\w*|в|v)\b").unwrap(), "v"),
        (Regex::new(r"(\d+(?:\.\d+)?)(\s*)(ампер\w*|а|a)\b").unwrap(), "a"),
    ];
}

/// 数値に続く表記を単位として扱ってよいか
///
/// 1文字の単位が空白を挟んで書かれ、直後に単語が続く場合は単位ではない（"1,5 в бухте"）。
pub fn is_unit_suffix(spacing: &str, unit: &str, after: &str) -> bool {
    if unit.chars().count() > 1 || spacing.is_empty() {
        return true;
    }
    after
        .trim_start()
        .chars()
        .next()
        .map_or(true, |c| !c.is_alphabetic())
}

/// 単位の綴りを正規形に置換
///
/// 入力は小文字化済みであること。
pub fn canonicalize_units(text: &str) -> String {
    let mut result = text.to_string();
    for (re, replacement) in UNIT_RULES.iter() {
        if re.is_match(&result) {
            result = re.replace_all(&result, *replacement).into_owned();
        }
    }

    for (re, suffix) in LETTER_UNIT_RULES.iter() {
        let replaced = re
            .replace_all(&result, |caps: &Captures<'_>| {
                let end = caps.get(0).map_or(result.len(), |m| m.end());
                if is_unit_suffix(&caps[2], &caps[3], &result[end..]) {
                    format!("{}{}", &caps[1], suffix)
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
        result = replaced;
    }
    result
}
