use serde::{Deserialize, Serialize};
use sheet_context_chunker::ChunkMetrics;

/// Workbook-level totals across cached sheet chunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookMetrics {
    pub total_sheets: usize,
    pub total_cells: usize,
    pub total_formulas: usize,
    pub total_tables: usize,
    pub total_charts: usize,
}

impl WorkbookMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, metrics: &ChunkMetrics) {
        self.total_sheets += 1;
        self.total_cells += metrics.cell_count();
        self.total_formulas += metrics.formula_count;
        self.total_tables += metrics.table_count;
        self.total_charts += metrics.chart_count;
    }
}
