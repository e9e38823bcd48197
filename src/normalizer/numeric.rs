//! 数値トークンの抽出と整合性判定
//!
//! 寸法・定格などの数値を種類付きで抽出し、
//! 同種の値が食い違う候補を見分ける。
//! 正規化前の生テキストに対して実行する（寸法区切り文字を区別するため）。

use super::units::is_unit_suffix;
use price_matcher_common::NumericCompatibility;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

/// 千分の一単位の固定小数点値（"2,5" と "2.50" を同一視する）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(i64);

impl Quantity {
    pub fn from_f64(value: f64) -> Self {
        Quantity((value * 1000.0).round() as i64)
    }

    pub fn value(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    fn scaled(self, factor: i64) -> Self {
        Quantity(self.0.saturating_mul(factor))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// 数値トークンの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericKind {
    Size,
    Circuit,
    Power,
    Current,
    Voltage,
    Area,
}

/// 種類付きの数値トークン
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericToken {
    /// 寸法 W×H（小さい方が先）
    Size { small: Quantity, large: Quantity },
    /// 遮断器の特性・定格（C16）
    Circuit(u32),
    /// 電力（W）
    Power(Quantity),
    /// 電流（A）
    Current(Quantity),
    /// 電圧（V）
    Voltage(Quantity),
    /// 断面積（mm²）
    Area(Quantity),
}

impl NumericToken {
    pub fn kind(&self) -> NumericKind {
        match self {
            NumericToken::Size { .. } => NumericKind::Size,
            NumericToken::Circuit(_) => NumericKind::Circuit,
            NumericToken::Power(_) => NumericKind::Power,
            NumericToken::Current(_) => NumericKind::Current,
            NumericToken::Voltage(_) => NumericKind::Voltage,
            NumericToken::Area(_) => NumericKind::Area,
        }
    }

    fn size(a: Quantity, b: Quantity) -> Self {
        NumericToken::Size {
            small: a.min(b),
            large: a.max(b),
        }
    }
}

impl fmt::Display for NumericToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericToken::Size { small, large } => write!(f, "size_{}x{}", small, large),
            NumericToken::Circuit(rating) => write!(f, "circuit_c{}", rating),
            NumericToken::Power(v) => write!(f, "power_{}w", v),
            NumericToken::Current(v) => write!(f, "current_{}a", v),
            NumericToken::Voltage(v) => write!(f, "voltage_{}v", v),
            NumericToken::Area(v) => write!(f, "area_{}mm2", v),
        }
    }
}

lazy_static::lazy_static! {
    // 寸法: 3x2.5 / 3х2,5 / 3×2.5
    static ref SIZE_RE: Regex =
        Regex::new(r"(\d+(?:[.,]\d+)?)\s*[xх×]\s*(\d+(?:[.,]\d+)?)").unwrap();
    // 遮断器特性: C16 / С25
    static ref CIRCUIT_RE: Regex = Regex::new(r"\b[cс](\d{1,3})(?:a|а)?\b").unwrap();
    // 断面積: 2.5мм2 / 2,5 кв.мм / 2.5mm²
    static ref AREA_RE: Regex =
        Regex::new(r"(\d+(?:[.,]\d+)?)\s*(?:мм²|мм2|mm²|mm2|кв\.?\s*мм|sq\.?\s*mm)").unwrap();
    static ref KILOWATT_RE: Regex = Regex::new(r"(\d+(?:[.,]\d+)?)\s*(?:квт|kw)\b").unwrap();
    static ref WATT_RE: Regex = Regex::new(r"(\d+(?:[.,]\d+)?)\s*(?:ватт\w*|вт|w)\b").unwrap();
    static ref KILOVOLT_RE: Regex = Regex::new(r"(\d+(?:[.,]\d+)?)\s*(?:кв|kv)\b").unwrap();
    static ref VOLT_RE: Regex = Regex::new(r"(\d+(?:[.,]\d+)?)(\s*)(вольт\w*|в|v)\b").unwrap();
    static ref AMPERE_RE: Regex = Regex::new(r"(\d+(?:[.,]\d+)?)(\s*)(ампер\w*|а|a)\b").unwrap();
}

fn parse_number(raw: &str) -> Option<Quantity> {
    raw.replace(',', ".").parse::<f64>().ok().map(Quantity::from_f64)
}

/// テキストから数値トークンを抽出
pub fn extract_tokens(text: &str) -> BTreeSet<NumericToken> {
    let mut tokens = BTreeSet::new();
    if text.trim().is_empty() {
        return tokens;
    }

    let lower = text.to_lowercase();

    // 寸法
    for cap in SIZE_RE.captures_iter(&lower) {
        if let (Some(a), Some(b)) = (parse_number(&cap[1]), parse_number(&cap[2])) {
            tokens.insert(NumericToken::size(a, b));
        }
    }

    // 遮断器特性
    for cap in CIRCUIT_RE.captures_iter(&lower) {
        if let Ok(rating) = cap[1].parse::<u32>() {
            tokens.insert(NumericToken::Circuit(rating));
        }
    }

    // 断面積（"кв.мм" を kV と誤認しないよう、以降の走査からは除外する）
    for cap in AREA_RE.captures_iter(&lower) {
        if let Some(v) = parse_number(&cap[1]) {
            tokens.insert(NumericToken::Area(v));
        }
    }
    let rest = AREA_RE.replace_all(&lower, " ");

    let scans: [(&Regex, fn(Quantity) -> NumericToken, i64); 5] = [
        (&*KILOWATT_RE, NumericToken::Power, 1000),
        (&*WATT_RE, NumericToken::Power, 1),
        (&*KILOVOLT_RE, NumericToken::Voltage, 1000),
        (&*VOLT_RE, NumericToken::Voltage, 1),
        (&*AMPERE_RE, NumericToken::Current, 1),
    ];
    for (re, make, factor) in scans {
        for cap in re.captures_iter(&rest) {
            // 1文字単位の正規表現は (数値)(空白)(単位) の3グループを持つ
            if let (Some(spacing), Some(unit), Some(whole)) = (cap.get(2), cap.get(3), cap.get(0)) {
                if !is_unit_suffix(spacing.as_str(), unit.as_str(), &rest[whole.end()..]) {
                    continue;
                }
            }
            if let Some(v) = parse_number(&cap[1]) {
                tokens.insert(make(v.scaled(factor)));
            }
        }
    }

    tokens
}

/// テキストに数値トークンが含まれているか判定
pub fn contains_numeric(text: &str) -> bool {
    !extract_tokens(text).is_empty()
}

/// 2つのテキストの数値整合性
///
/// 矛盾する数値があるときだけ `Incompatible` とする。
/// 数値が片方にしかない場合は判断できないので `Unknown`。
pub fn numeric_compatibility(a: &str, b: &str) -> NumericCompatibility {
    compare_tokens(&extract_tokens(a), &extract_tokens(b))
}

/// 抽出済みトークン集合の整合性
pub fn compare_tokens(a: &BTreeSet<NumericToken>, b: &BTreeSet<NumericToken>) -> NumericCompatibility {
    if a.is_empty() || b.is_empty() {
        return NumericCompatibility::Unknown;
    }
    if a == b {
        return NumericCompatibility::Compatible;
    }

    let kinds_a: BTreeSet<NumericKind> = a.iter().map(NumericToken::kind).collect();
    for kind in kinds_a {
        let of_kind = |set: &BTreeSet<NumericToken>| -> BTreeSet<NumericToken> {
            set.iter().filter(|t| t.kind() == kind).copied().collect()
        };
        let in_b = of_kind(b);
        if !in_b.is_empty() && of_kind(a) != in_b {
            return NumericCompatibility::Incompatible;
        }
    }

    NumericCompatibility::Compatible
}
