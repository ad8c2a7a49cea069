use crate::address::{split_sheet_qualified, A1Range};
use crate::anchors::select_anchors;
use crate::compressor::fingerprint_payload;
use crate::config::{CompressorConfig, DetectorConfig};
use crate::error::{ChunkerError, Result};
use crate::grid::GridView;
use crate::references::referenced_chunk_ids_in_grid;
use crate::types::{
    is_empty_value, range_chunk_id, sheet_chunk_id, Chunk, ChunkKind, ChunkPayload,
    DetectionResult, RangeInfo, RangeMeta, RangeType, SheetState,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::time::SystemTime;

const TABLE_IMPORTANCE: f64 = 90.0;
const NAMED_RANGE_IMPORTANCE: f64 = 85.0;
const USED_RANGE_IMPORTANCE: f64 = 75.0;

static NAMED_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^=?(?:'(?:[^']|'')+'|[^'!:]+)!\$?[A-Za-z]{1,3}\$?[0-9]+:\$?[A-Za-z]{1,3}\$?[0-9]+$")
        .expect("named range regex")
});

/// Proposes sub-ranges of interest on one sheet
#[derive(Debug, Clone, Default)]
pub struct RangeDetector {
    config: DetectorConfig,
    compressor: CompressorConfig,
}

/// Boolean occupancy map with claim tracking for the rectangle search
struct DensityMap {
    rows: usize,
    cols: usize,
    filled: Vec<bool>,
    claimed: Vec<bool>,
}

/// Accepted rectangle, inclusive bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    top: usize,
    left: usize,
    bottom: usize,
    right: usize,
    filled: usize,
}

impl Region {
    const fn height(&self) -> usize {
        self.bottom - self.top + 1
    }

    const fn width(&self) -> usize {
        self.right - self.left + 1
    }

    fn density(&self) -> f64 {
        self.filled as f64 / (self.height() * self.width()) as f64
    }

    fn to_range(self) -> A1Range {
        A1Range::from_bounds(self.top, self.left, self.bottom, self.right)
    }
}

impl DensityMap {
    fn build(rows: usize, cols: usize, flag: impl Fn(usize, usize) -> bool) -> Self {
        let mut filled = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                filled.push(flag(row, col));
            }
        }
        Self {
            rows,
            cols,
            filled,
            claimed: vec![false; rows * cols],
        }
    }

    fn is_filled(&self, row: usize, col: usize) -> bool {
        self.filled[row * self.cols + col]
    }

    fn is_claimed(&self, row: usize, col: usize) -> bool {
        self.claimed[row * self.cols + col]
    }

    fn claim(&mut self, region: &Region) {
        for row in region.top..=region.bottom {
            for col in region.left..=region.right {
                self.claimed[row * self.cols + col] = true;
            }
        }
    }

    /// Filled ratio of column `col` over rows `top..=bottom`; None if any cell is claimed
    fn column_density(&self, col: usize, top: usize, bottom: usize) -> Option<f64> {
        let mut filled = 0usize;
        for row in top..=bottom {
            if self.is_claimed(row, col) {
                return None;
            }
            filled += usize::from(self.is_filled(row, col));
        }
        Some(filled as f64 / (bottom - top + 1) as f64)
    }

    /// Filled ratio of row `row` over columns `left..=right`; None if any cell is claimed
    fn row_density(&self, row: usize, left: usize, right: usize) -> Option<f64> {
        let mut filled = 0usize;
        for col in left..=right {
            if self.is_claimed(row, col) {
                return None;
            }
            filled += usize::from(self.is_filled(row, col));
        }
        Some(filled as f64 / (right - left + 1) as f64)
    }

    fn count_filled(&self, top: usize, left: usize, bottom: usize, right: usize) -> usize {
        let mut count = 0;
        for row in top..=bottom {
            for col in left..=right {
                count += usize::from(self.is_filled(row, col));
            }
        }
        count
    }

    /// Largest-rectangle expansion from every unclaimed filled seed.
    ///
    /// Grows right while the next column is dense enough within the current
    /// row span, then down while the next row is dense enough within the
    /// settled column span. Accepted regions are claimed, so regions found
    /// by one search never overlap and every seed is visited once.
    fn dense_regions(&mut self, config: &DetectorConfig) -> Vec<Region> {
        let mut regions = Vec::new();

        for row in 0..self.rows {
            for col in 0..self.cols {
                if !self.is_filled(row, col) || self.is_claimed(row, col) {
                    continue;
                }

                let mut right = col;
                while right + 1 < self.cols {
                    match self.column_density(right + 1, row, row) {
                        Some(d) if d >= config.growth_density => right += 1,
                        _ => break,
                    }
                }

                let mut bottom = row;
                while bottom + 1 < self.rows {
                    match self.row_density(bottom + 1, col, right) {
                        Some(d) if d >= config.growth_density => bottom += 1,
                        _ => break,
                    }
                }

                let region = Region {
                    top: row,
                    left: col,
                    bottom,
                    right,
                    filled: self.count_filled(row, col, bottom, right),
                };

                if region.height() >= config.min_region_rows
                    && region.width() >= config.min_region_cols
                    && region.density() >= config.min_density
                {
                    self.claim(&region);
                    regions.push(region);
                }
            }
        }

        regions
    }
}

impl RangeDetector {
    /// Create a detector, rejecting invalid thresholds
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self {
            config,
            compressor: CompressorConfig::default(),
        })
    }

    /// Builder: anchor/raw-grid limits used for range chunks
    #[must_use]
    pub fn with_compressor_config(mut self, compressor: CompressorConfig) -> Self {
        self.compressor = compressor;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Run all detection passes over one sheet.
    ///
    /// Missing or nameless sheets yield an empty result.
    #[must_use]
    pub fn detect(&self, sheet: Option<&SheetState>) -> DetectionResult {
        let Some(sheet) = sheet else {
            return DetectionResult::default();
        };
        if sheet.name.trim().is_empty() {
            log::debug!("Skipping range detection for nameless sheet");
            return DetectionResult::default();
        }

        let mut ranges = Vec::new();
        let mut counter = 0usize;

        self.detect_tables(sheet, &mut ranges);
        self.detect_named_ranges(sheet, &mut ranges);
        self.detect_formula_regions(sheet, &mut counter, &mut ranges);
        self.detect_key_regions(sheet, &mut counter, &mut ranges);

        log::debug!("Detected {} ranges on '{}'", ranges.len(), sheet.name);
        DetectionResult { ranges }
    }

    fn detect_tables(&self, sheet: &SheetState, out: &mut Vec<RangeInfo>) {
        for table in &sheet.tables {
            let (Some(name), Some(range)) = (&table.name, &table.range) else {
                continue;
            };

            let local = split_sheet_qualified(range).map_or(range.as_str(), |(_, r)| r);
            let (address, rows, cols) = match A1Range::parse(local) {
                Ok(parsed) => (parsed.to_string(), parsed.row_count(), parsed.column_count()),
                Err(e) => {
                    log::debug!("Table '{name}' has unparseable range {range:?}: {e}");
                    (local.to_string(), 0, 0)
                }
            };

            out.push(RangeInfo {
                sheet_name: sheet.name.clone(),
                range: address.clone(),
                range_type: RangeType::Table,
                name: Some(name.clone()),
                importance: TABLE_IMPORTANCE,
                row_count: rows,
                column_count: cols,
                description: format!("Table '{name}' in {} ({address})", sheet.name),
            });
        }
    }

    fn detect_named_ranges(&self, sheet: &SheetState, out: &mut Vec<RangeInfo>) {
        for named in &sheet.named_ranges {
            if !NAMED_REFERENCE.is_match(named.reference.trim()) {
                log::debug!(
                    "Skipping named range '{}' with reference {:?}",
                    named.name,
                    named.reference
                );
                continue;
            }
            let Some((target_sheet, local)) = split_sheet_qualified(&named.reference) else {
                continue;
            };
            let Ok(parsed) = A1Range::parse(local) else {
                continue;
            };

            out.push(RangeInfo {
                sheet_name: target_sheet.clone(),
                range: parsed.to_string(),
                range_type: RangeType::NamedRange,
                name: Some(named.name.clone()),
                importance: NAMED_RANGE_IMPORTANCE,
                row_count: parsed.row_count(),
                column_count: parsed.column_count(),
                description: format!("Named range '{}' -> {target_sheet}!{parsed}", named.name),
            });
        }
    }

    fn detect_formula_regions(&self, sheet: &SheetState, counter: &mut usize, out: &mut Vec<RangeInfo>) {
        let view = GridView::full(sheet);
        let mut map = DensityMap::build(view.rows(), view.cols(), |r, c| view.formula(r, c).is_some());

        for region in map.dense_regions(&self.config) {
            if region.filled < self.config.min_formula_cells {
                continue;
            }
            *counter += 1;
            let range = region.to_range();
            out.push(RangeInfo {
                sheet_name: sheet.name.clone(),
                range: range.to_string(),
                range_type: RangeType::FormulaRegion,
                name: Some(format!("{}_FormulaRegion_{counter}", sheet.name)),
                importance: (40.0 + region.filled as f64 / 2.0).min(90.0),
                row_count: region.height(),
                column_count: region.width(),
                description: format!(
                    "Formula region in {} ({range}) with {} formulas",
                    sheet.name, region.filled
                ),
            });
        }
    }

    fn detect_key_regions(&self, sheet: &SheetState, counter: &mut usize, out: &mut Vec<RangeInfo>) {
        let (used_rows, used_cols) = sheet.used_dimensions();
        if used_rows == 0 || used_cols == 0 {
            return;
        }

        let used = A1Range::from_bounds(0, 0, used_rows - 1, used_cols - 1);
        *counter += 1;
        out.push(RangeInfo {
            sheet_name: sheet.name.clone(),
            range: used.to_string(),
            range_type: RangeType::KeyRegion,
            name: Some(format!("{}_KeyRegion_{counter}", sheet.name)),
            importance: USED_RANGE_IMPORTANCE,
            row_count: used_rows,
            column_count: used_cols,
            description: format!(
                "Used range of {} ({used}), {used_rows} rows x {used_cols} columns",
                sheet.name
            ),
        });

        // The host's used range may run past the captured cells
        let view = GridView::window(sheet, &used);
        if view.rows() == 0 || view.cols() == 0 {
            return;
        }
        let scanned = A1Range::from_bounds(0, 0, view.rows() - 1, view.cols() - 1);
        let mut map = DensityMap::build(view.rows(), view.cols(), |r, c| {
            !is_empty_value(view.value(r, c))
        });

        for region in map.dense_regions(&self.config) {
            let range = region.to_range();
            if range == used || range == scanned {
                continue;
            }
            *counter += 1;
            let density = region.density();
            out.push(RangeInfo {
                sheet_name: sheet.name.clone(),
                range: range.to_string(),
                range_type: RangeType::KeyRegion,
                name: Some(format!("{}_DataRegion_{counter}", sheet.name)),
                importance: (50.0 + density * 50.0).min(95.0),
                row_count: region.height(),
                column_count: region.width(),
                description: format!(
                    "Dense data region in {} ({range}), {:.0}% filled",
                    sheet.name,
                    density * 100.0
                ),
            });
        }
    }

    /// Slice the sheet to each detected range and build one range chunk per range.
    ///
    /// A range that cannot be parsed or sliced is logged and skipped. When
    /// several ranges share an address, the first (highest-priority pass) wins.
    #[must_use]
    pub fn create_range_chunks(&self, sheet: &SheetState, detection: &DetectionResult) -> Vec<Chunk> {
        let mut seen = HashSet::new();
        let mut chunks = Vec::new();

        for info in &detection.ranges {
            match self.build_range_chunk(sheet, info) {
                Ok(chunk) => {
                    if seen.insert(chunk.id.clone()) {
                        chunks.push(chunk);
                    }
                }
                Err(e) => log::warn!(
                    "Skipping {} range {} on '{}': {e}",
                    info.range_type.as_str(),
                    info.range,
                    info.sheet_name
                ),
            }
        }

        chunks
    }

    fn build_range_chunk(&self, sheet: &SheetState, info: &RangeInfo) -> Result<Chunk> {
        if info.sheet_name != sheet.name {
            return Err(ChunkerError::ForeignRange {
                range: info.range.clone(),
                range_sheet: info.sheet_name.clone(),
                sheet: sheet.name.clone(),
            });
        }

        let range = A1Range::parse(&info.range)?;
        let (rows, cols) = sheet.grid_dimensions();
        if range.start.row >= rows || range.start.col >= cols {
            return Err(ChunkerError::invalid_range(format!(
                "{} starts outside the {rows}x{cols} grid",
                info.range
            )));
        }

        let view = GridView::window(sheet, &range);
        let metrics = view.metrics();
        let anchors = select_anchors(&view, &self.compressor);
        let carry_raw = metrics.cell_count() <= self.compressor.raw_grid_cell_limit;
        let address = range.to_string();

        let payload = ChunkPayload {
            sheet_name: sheet.name.clone(),
            summary: info.description.clone(),
            anchors,
            values: carry_raw.then(|| view.owned_values()),
            formulas: carry_raw.then(|| view.owned_formulas()),
            metrics,
            charts: Vec::new(),
            range: Some(RangeMeta {
                address: address.clone(),
                range_type: info.range_type,
                name: info.name.clone(),
                importance: info.importance,
                description: info.description.clone(),
            }),
        };

        let id = range_chunk_id(&sheet.name, &address);
        let fingerprint = fingerprint_payload(ChunkKind::Range, &id, &payload, &view)?;

        let mut refs = BTreeSet::new();
        refs.insert(sheet_chunk_id(&sheet.name));
        refs.extend(referenced_chunk_ids_in_grid(&sheet.name, &view.owned_formulas()));

        Ok(Chunk {
            id,
            kind: ChunkKind::Range,
            fingerprint,
            payload,
            refs,
            captured_at: SystemTime::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_from(rows: &[&str]) -> DensityMap {
        let grid: Vec<Vec<bool>> = rows
            .iter()
            .map(|r| r.chars().map(|c| c == '#').collect())
            .collect();
        let cols = grid.first().map_or(0, Vec::len);
        DensityMap::build(grid.len(), cols, |r, c| grid[r][c])
    }

    #[test]
    fn test_single_dense_block() {
        let mut map = map_from(&["##..", "##..", "....", "...."]);
        let regions = map.dense_regions(&DetectorConfig::default());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].to_range().to_string(), "A1:B2");
        assert_eq!(regions[0].filled, 4);
    }

    #[test]
    fn test_isolated_cell_rejected() {
        let mut map = map_from(&["#...", "....", "..#.", "...."]);
        assert!(map.dense_regions(&DetectorConfig::default()).is_empty());
    }

    #[test]
    fn test_growth_stops_at_sparse_column() {
        let mut map = map_from(&["###.#", "###..", "###.."]);
        let regions = map.dense_regions(&DetectorConfig::default());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].to_range().to_string(), "A1:C3");
    }

    #[test]
    fn test_regions_never_overlap() {
        let mut map = map_from(&["..##", "####", "##..", "##.."]);
        let regions = map.dense_regions(&DetectorConfig::default());
        for (i, a) in regions.iter().enumerate() {
            for b in regions.iter().skip(i + 1) {
                let disjoint = a.right < b.left
                    || b.right < a.left
                    || a.bottom < b.top
                    || b.bottom < a.top;
                assert!(disjoint, "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_min_size_override() {
        let config = DetectorConfig {
            min_region_rows: 3,
            ..Default::default()
        };
        let mut map = map_from(&["##", "##"]);
        assert!(map.dense_regions(&config).is_empty());
    }

    #[test]
    fn test_named_reference_pattern() {
        assert!(NAMED_REFERENCE.is_match("=Sheet1!$A$1:$B$5"));
        assert!(NAMED_REFERENCE.is_match("'My Sheet'!A1:C3"));
        assert!(!NAMED_REFERENCE.is_match("Sheet1!A1"));
        assert!(!NAMED_REFERENCE.is_match("=A1:B2"));
        assert!(!NAMED_REFERENCE.is_match("=SUM(Sheet1!A1:B2)"));
    }
}
