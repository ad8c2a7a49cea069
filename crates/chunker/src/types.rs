use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::SystemTime;

/// Namespace prefix of sheet chunk ids
pub const SHEET_ID_PREFIX: &str = "Sheet:";

/// Namespace prefix of range chunk ids
pub const RANGE_ID_PREFIX: &str = "Range:";

/// Chunk id of a whole sheet: `Sheet:<name>`
#[must_use]
pub fn sheet_chunk_id(sheet: &str) -> String {
    format!("{SHEET_ID_PREFIX}{sheet}")
}

/// Chunk id of a sub-range: `Range:<sheet>!<a1-range>`
#[must_use]
pub fn range_chunk_id(sheet: &str, range: &str) -> String {
    format!("{RANGE_ID_PREFIX}{sheet}!{range}")
}

/// Prefix shared by every range id namespaced under `sheet`
#[must_use]
pub fn range_id_prefix(sheet: &str) -> String {
    format!("{RANGE_ID_PREFIX}{sheet}!")
}

/// Raw capture of one worksheet, as supplied by the host spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SheetState {
    pub name: String,
    pub values: Vec<Vec<Value>>,
    #[serde(deserialize_with = "formula_grid")]
    pub formulas: Vec<Vec<String>>,
    pub tables: Vec<TableInfo>,
    pub named_ranges: Vec<NamedRangeInfo>,
    pub charts: Vec<ChartInfo>,
    pub used_range: Option<UsedRange>,
}

impl SheetState {
    /// Create a sheet from a value grid with no formulas
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            values,
            ..Default::default()
        }
    }

    /// Builder: set formula grid
    #[must_use]
    pub fn with_formulas(mut self, formulas: Vec<Vec<String>>) -> Self {
        self.formulas = formulas;
        self
    }

    /// Builder: add table
    #[must_use]
    pub fn add_table(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.tables.push(TableInfo {
            name: Some(name.into()),
            range: Some(range.into()),
        });
        self
    }

    /// Builder: add named range
    #[must_use]
    pub fn add_named_range(mut self, name: impl Into<String>, reference: impl Into<String>) -> Self {
        self.named_ranges.push(NamedRangeInfo {
            name: name.into(),
            reference: reference.into(),
        });
        self
    }

    /// Builder: add chart
    #[must_use]
    pub fn add_chart(mut self, name: impl Into<String>) -> Self {
        self.charts.push(ChartInfo {
            name: name.into(),
            chart_type: None,
        });
        self
    }

    /// Rows x columns covered by the captured grids
    #[must_use]
    pub fn grid_dimensions(&self) -> (usize, usize) {
        let rows = self.values.len().max(self.formulas.len());
        let cols = self
            .values
            .iter()
            .map(Vec::len)
            .chain(self.formulas.iter().map(Vec::len))
            .max()
            .unwrap_or(0);
        (rows, cols)
    }

    /// Used range reported by the host, falling back to the grid dimensions
    #[must_use]
    pub fn used_dimensions(&self) -> (usize, usize) {
        match self.used_range {
            Some(used) => (used.row_count, used.column_count),
            None => self.grid_dimensions(),
        }
    }
}

/// Host formula grids hold plain values for cells without a formula;
/// anything that is not a string is treated as "no formula".
fn formula_grid<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Vec<Value>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Value::String(s) => s,
                    _ => String::new(),
                })
                .collect()
        })
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableInfo {
    pub name: Option<String>,
    pub range: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedRangeInfo {
    pub name: String,
    /// Reference text, e.g. `=Sheet1!$A$1:$B$10`
    pub reference: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartInfo {
    pub name: String,
    pub chart_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedRange {
    pub row_count: usize,
    pub column_count: usize,
}

/// True for cells that hold nothing (null or empty text)
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Plain-text rendering of a cell value
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// True when the formula text carries a formula marker
#[must_use]
pub fn is_formula(text: &str) -> bool {
    text.starts_with('=')
}

/// Scope of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Sheet,
    Range,
}

impl ChunkKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sheet => "sheet",
            Self::Range => "range",
        }
    }
}

/// Cached, fingerprinted unit of summarized sheet content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `Sheet:<name>` or `Range:<sheet>!<a1>`
    pub id: String,
    pub kind: ChunkKind,
    /// Hex digest of the payload and its source grids
    pub fingerprint: String,
    pub payload: ChunkPayload,
    /// Ids this chunk mentions; may dangle
    pub refs: BTreeSet<String>,
    pub captured_at: SystemTime,
}

impl Chunk {
    #[must_use]
    pub fn is_sheet(&self) -> bool {
        self.kind == ChunkKind::Sheet
    }

    /// Name of the sheet this chunk was taken from
    #[must_use]
    pub fn sheet_name(&self) -> &str {
        &self.payload.sheet_name
    }

    #[must_use]
    pub fn metrics(&self) -> &ChunkMetrics {
        &self.payload.metrics
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub sheet_name: String,
    pub summary: String,
    pub anchors: Vec<Anchor>,
    /// Raw values, present only for small chunks
    pub values: Option<Vec<Vec<Value>>>,
    /// Raw formulas, present only for small chunks
    pub formulas: Option<Vec<Vec<String>>>,
    pub metrics: ChunkMetrics,
    /// Chart names on the sheet (sheet chunks only)
    #[serde(default)]
    pub charts: Vec<String>,
    /// Region metadata (range chunks only)
    pub range: Option<RangeMeta>,
}

/// High-value cell kept verbatim in a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// A1 address on the owning sheet
    pub address: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    pub kind: AnchorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorKind {
    /// SUM, AVERAGE, COUNT, ...
    Aggregation,
    /// VLOOKUP, INDEX/MATCH, ...
    Lookup,
    /// IF, SUMIF, IFERROR, ...
    Conditional,
    /// Numeric value above the magnitude threshold
    LargeNumber,
    /// Text such as "Total" or "Revenue"
    Label,
}

impl AnchorKind {
    /// Selection priority (higher survives the anchor cap first)
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Lookup => 100,
            Self::Conditional => 90,
            Self::Aggregation => 80,
            Self::Label => 50,
            Self::LargeNumber => 40,
        }
    }

    #[must_use]
    pub const fn is_formula(self) -> bool {
        matches!(self, Self::Aggregation | Self::Lookup | Self::Conditional)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aggregation => "aggregation",
            Self::Lookup => "lookup",
            Self::Conditional => "conditional",
            Self::LargeNumber => "large-number",
            Self::Label => "label",
        }
    }
}

/// Counts gathered in one scan of a grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetrics {
    pub row_count: usize,
    pub column_count: usize,
    pub value_count: usize,
    pub formula_count: usize,
    pub empty_count: usize,
    #[serde(default)]
    pub table_count: usize,
    #[serde(default)]
    pub chart_count: usize,
    #[serde(default)]
    pub named_range_count: usize,
}

impl ChunkMetrics {
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.row_count * self.column_count
    }

    /// Fraction of cells holding formulas
    #[must_use]
    pub fn formula_ratio(&self) -> f32 {
        ratio(self.formula_count, self.cell_count())
    }

    /// Fraction of cells holding values
    #[must_use]
    pub fn value_ratio(&self) -> f32 {
        ratio(self.value_count, self.cell_count())
    }
}

fn ratio(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 / total as f32
    }
}

/// Region attributes carried by range chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeMeta {
    pub address: String,
    pub range_type: RangeType,
    pub name: Option<String>,
    pub importance: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RangeType {
    Table,
    NamedRange,
    FormulaRegion,
    KeyRegion,
}

impl RangeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::NamedRange => "named-range",
            Self::FormulaRegion => "formula-region",
            Self::KeyRegion => "key-region",
        }
    }
}

/// Transient output of one detection pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeInfo {
    pub sheet_name: String,
    /// A1 range without sheet prefix
    pub range: String,
    #[serde(rename = "type")]
    pub range_type: RangeType,
    pub name: Option<String>,
    /// 0-100
    pub importance: f64,
    pub row_count: usize,
    pub column_count: usize,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub ranges: Vec<RangeInfo>,
}

impl DetectionResult {
    #[must_use]
    pub fn of_type(&self, range_type: RangeType) -> Vec<&RangeInfo> {
        self.ranges
            .iter()
            .filter(|r| r.range_type == range_type)
            .collect()
    }
}
