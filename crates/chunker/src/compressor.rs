use crate::anchors::select_anchors;
use crate::config::CompressorConfig;
use crate::error::{ChunkerError, Result};
use crate::fingerprint::Fingerprinter;
use crate::grid::GridView;
use crate::references::referenced_chunk_ids_in_grid;
use crate::types::{sheet_chunk_id, Chunk, ChunkKind, ChunkMetrics, ChunkPayload, SheetState};
use std::collections::BTreeSet;
use std::time::SystemTime;

/// Turns a captured sheet into one compact, fingerprinted chunk
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    config: CompressorConfig,
}

impl Compressor {
    /// Create a compressor, rejecting invalid configuration
    pub fn new(config: CompressorConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &CompressorConfig {
        &self.config
    }

    /// Compress one sheet.
    ///
    /// Empty and zero-size sheets produce a chunk with zero metrics.
    pub fn compress(&self, sheet: Option<&SheetState>) -> Result<Chunk> {
        let sheet = sheet.ok_or(ChunkerError::UndefinedSheet)?;
        validate_sheet(sheet)?;

        let view = GridView::full(sheet);
        let mut metrics = view.metrics();
        metrics.table_count = sheet.tables.len();
        metrics.chart_count = sheet.charts.len();
        metrics.named_range_count = sheet.named_ranges.len();

        let anchors = select_anchors(&view, &self.config);
        let summary = summarize_sheet(sheet, &metrics, anchors.len());
        let carry_raw = metrics.cell_count() <= self.config.raw_grid_cell_limit;

        let payload = ChunkPayload {
            sheet_name: sheet.name.clone(),
            summary,
            anchors,
            values: carry_raw.then(|| view.owned_values()),
            formulas: carry_raw.then(|| view.owned_formulas()),
            metrics,
            charts: sheet.charts.iter().map(|c| c.name.clone()).collect(),
            range: None,
        };

        let id = sheet_chunk_id(&sheet.name);
        let fingerprint = fingerprint_payload(ChunkKind::Sheet, &id, &payload, &view)?;
        let refs: BTreeSet<String> = referenced_chunk_ids_in_grid(&sheet.name, &sheet.formulas);

        log::debug!(
            "Compressed sheet '{}': {}x{}, {} anchors, {} refs",
            sheet.name,
            metrics.row_count,
            metrics.column_count,
            payload.anchors.len(),
            refs.len()
        );

        Ok(Chunk {
            id,
            kind: ChunkKind::Sheet,
            fingerprint,
            payload,
            refs,
            captured_at: SystemTime::now(),
        })
    }
}

fn validate_sheet(sheet: &SheetState) -> Result<()> {
    if sheet.name.trim().is_empty() {
        return Err(ChunkerError::InvalidSheet("sheet name is empty".to_string()));
    }

    if !sheet.formulas.is_empty() && sheet.formulas.len() != sheet.values.len() {
        return Err(ChunkerError::GridShapeMismatch {
            sheet: sheet.name.clone(),
            value_rows: sheet.values.len(),
            formula_rows: sheet.formulas.len(),
        });
    }

    Ok(())
}

fn summarize_sheet(sheet: &SheetState, metrics: &ChunkMetrics, anchor_count: usize) -> String {
    let mut summary = format!(
        "Sheet '{}' spans {} rows x {} columns with {} values, {} formulas and {} key anchors.",
        sheet.name,
        metrics.row_count,
        metrics.column_count,
        metrics.value_count,
        metrics.formula_count,
        anchor_count
    );

    let tables: Vec<&str> = sheet.tables.iter().filter_map(|t| t.name.as_deref()).collect();
    if !tables.is_empty() {
        summary.push_str(&format!(" Tables: {}.", tables.join(", ")));
    }
    if !sheet.charts.is_empty() {
        let charts: Vec<&str> = sheet.charts.iter().map(|c| c.name.as_str()).collect();
        summary.push_str(&format!(" Charts: {}.", charts.join(", ")));
    }

    summary
}

/// Hash the payload together with the full source window, so edits to
/// cells that are neither anchors nor carried raw still change the digest.
pub(crate) fn fingerprint_payload(
    kind: ChunkKind,
    id: &str,
    payload: &ChunkPayload,
    source: &GridView<'_>,
) -> Result<String> {
    let mut fp = Fingerprinter::new();
    fp.section("kind", kind.as_str())?;
    fp.section("id", id)?;
    fp.section("payload", payload)?;
    if payload.values.is_none() {
        fp.section("source-values", &source.owned_values())?;
    }
    if payload.formulas.is_none() {
        fp.section("source-formulas", &source.owned_formulas())?;
    }
    Ok(fp.finish())
}
