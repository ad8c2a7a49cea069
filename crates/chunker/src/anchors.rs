use crate::address::CellAddress;
use crate::config::CompressorConfig;
use crate::grid::GridView;
use crate::types::{Anchor, AnchorKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FUNCTION_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z][A-Za-z0-9.]*)\s*\(").expect("function call regex"));

static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(total|subtotal|sum|revenue|sales|profit|income|expenses?|costs?|margin|balance|net|budget|forecast)\b",
    )
    .expect("label regex")
});

const LOOKUP_FUNCTIONS: &[&str] = &[
    "VLOOKUP", "HLOOKUP", "XLOOKUP", "LOOKUP", "INDEX", "MATCH", "XMATCH", "OFFSET", "INDIRECT",
    "CHOOSE",
];

const CONDITIONAL_FUNCTIONS: &[&str] = &[
    "IF", "IFS", "IFERROR", "IFNA", "SWITCH", "SUMIF", "SUMIFS", "COUNTIF", "COUNTIFS", "AVERAGEIF",
    "AVERAGEIFS", "MAXIFS", "MINIFS", "FILTER",
];

const AGGREGATION_FUNCTIONS: &[&str] = &[
    "SUM", "SUMPRODUCT", "AVERAGE", "COUNT", "COUNTA", "MIN", "MAX", "MEDIAN", "SUBTOTAL",
    "AGGREGATE", "STDEV", "VAR", "PRODUCT",
];

/// Classify a formula by the most valuable function class it calls
#[must_use]
pub fn classify_formula(formula: &str) -> Option<AnchorKind> {
    FUNCTION_CALL
        .captures_iter(formula)
        .filter_map(|caps| caps.get(1))
        .filter_map(|name| {
            let upper = name.as_str().to_ascii_uppercase();
            if LOOKUP_FUNCTIONS.contains(&upper.as_str()) {
                Some(AnchorKind::Lookup)
            } else if CONDITIONAL_FUNCTIONS.contains(&upper.as_str()) {
                Some(AnchorKind::Conditional)
            } else if AGGREGATION_FUNCTIONS.contains(&upper.as_str()) {
                Some(AnchorKind::Aggregation)
            } else {
                None
            }
        })
        .max_by_key(|kind| kind.priority())
}

/// Classify a plain value: large magnitudes and label-like text
#[must_use]
pub fn classify_value(value: &Value, large_number_threshold: f64) -> Option<AnchorKind> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.abs() >= large_number_threshold)
            .map(|_| AnchorKind::LargeNumber),
        Value::String(s) if LABEL.is_match(s) => Some(AnchorKind::Label),
        _ => None,
    }
}

/// Pick the bounded anchor list for a grid window.
///
/// Candidates are ranked by kind priority (stable, so row-major order wins
/// ties), capped, then returned in row-major order.
pub(crate) fn select_anchors(view: &GridView<'_>, config: &CompressorConfig) -> Vec<Anchor> {
    let (top, left) = view.origin();
    let mut candidates: Vec<(usize, usize, AnchorKind)> = Vec::new();

    for row in 0..view.rows() {
        for col in 0..view.cols() {
            let kind = match view.formula(row, col) {
                Some(formula) => classify_formula(formula),
                None => classify_value(view.value(row, col), config.large_number_threshold),
            };
            if let Some(kind) = kind {
                candidates.push((row, col, kind));
            }
        }
    }

    candidates.sort_by_key(|(_, _, kind)| std::cmp::Reverse(kind.priority()));
    candidates.truncate(config.max_anchors);
    candidates.sort_by_key(|(row, col, _)| (*row, *col));

    candidates
        .into_iter()
        .map(|(row, col, kind)| Anchor {
            address: CellAddress::new(top + row, left + col).to_string(),
            value: view.value(row, col).clone(),
            formula: view.formula(row, col).map(str::to_string),
            kind,
        })
        .collect()
}
