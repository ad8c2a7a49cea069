//! Cross-sheet reference scanning for formula text.
//!
//! Only sheet-qualified references are extracted; formulas are never
//! evaluated. `INDIRECT`/`OFFSET` targets built at runtime are invisible here.

use crate::address::A1Range;
use crate::types::{is_formula, range_chunk_id, sheet_chunk_id};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static STRING_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:[^"]|"")*""#).expect("string literal regex"));

static SHEET_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:'((?:[^']|'')+)'|([A-Za-z_\p{L}][A-Za-z0-9_.\p{L}]*))!(\$?[A-Za-z]{1,3}(?:\$?[0-9]+)?(?::\$?[A-Za-z]{1,3}(?:\$?[0-9]+)?)?)",
    )
    .expect("sheet reference regex")
});

/// One sheet-qualified reference found in a formula
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormulaReference {
    pub sheet: String,
    /// Normalised A1 text (no `$`), e.g. `A1:B4` or `C3`
    pub range: String,
    pub is_area: bool,
}

/// Extract every sheet-qualified reference from formula text
#[must_use]
pub fn scan_formula(formula: &str) -> Vec<FormulaReference> {
    if !is_formula(formula) {
        return Vec::new();
    }

    let stripped = STRING_LITERAL.replace_all(formula, "\"\"");
    let mut refs = Vec::new();

    for caps in SHEET_REFERENCE.captures_iter(&stripped) {
        let sheet = match (caps.get(1), caps.get(2)) {
            (Some(quoted), _) => quoted.as_str().replace("''", "'"),
            (None, Some(bare)) => bare.as_str().to_string(),
            (None, None) => continue,
        };
        let Some(raw_range) = caps.get(3) else {
            continue;
        };

        let raw_range = raw_range.as_str();
        let is_area = raw_range.contains(':');
        let reference = match A1Range::parse(raw_range) {
            Ok(range) if is_area => FormulaReference {
                sheet,
                range: range.to_string(),
                is_area: true,
            },
            Ok(range) => FormulaReference {
                sheet,
                range: range.start.to_string(),
                is_area: false,
            },
            // Whole-column references (`A:B`) still tie the sheets together.
            Err(_) => FormulaReference {
                sheet,
                range: raw_range.replace('$', "").to_ascii_uppercase(),
                is_area: false,
            },
        };
        refs.push(reference);
    }

    refs
}

/// Chunk ids referenced by a formula living on `owning_sheet`.
///
/// Every foreign sheet yields its sheet id; area references additionally
/// yield the matching range id, which usually dangles until a range with
/// the same coordinates is captured. Self-references are ignored.
#[must_use]
pub fn referenced_chunk_ids(owning_sheet: &str, formula: &str) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    for reference in scan_formula(formula) {
        if reference.sheet.eq_ignore_ascii_case(owning_sheet) {
            continue;
        }
        ids.insert(sheet_chunk_id(&reference.sheet));
        if reference.is_area {
            ids.insert(range_chunk_id(&reference.sheet, &reference.range));
        }
    }
    ids
}

/// Referenced chunk ids across a whole formula grid
#[must_use]
pub fn referenced_chunk_ids_in_grid(owning_sheet: &str, formulas: &[Vec<String>]) -> BTreeSet<String> {
    formulas
        .iter()
        .flatten()
        .filter(|f| is_formula(f))
        .flat_map(|f| referenced_chunk_ids(owning_sheet, f))
        .collect()
}
