use crate::address::A1Range;
use crate::types::{is_empty_value, is_formula, ChunkMetrics, SheetState};
use serde_json::Value;

/// Read-only rectangular window over a sheet's value and formula grids.
///
/// Windows are clipped to the captured grid, so scans cost what the data
/// costs whatever the declared address. Ragged rows read as empty.
pub(crate) struct GridView<'a> {
    values: &'a [Vec<Value>],
    formulas: &'a [Vec<String>],
    top: usize,
    left: usize,
    rows: usize,
    cols: usize,
}

static NULL: Value = Value::Null;

impl<'a> GridView<'a> {
    /// The whole captured grid
    pub fn full(sheet: &'a SheetState) -> Self {
        let (rows, cols) = sheet.grid_dimensions();
        Self {
            values: &sheet.values,
            formulas: &sheet.formulas,
            top: 0,
            left: 0,
            rows,
            cols,
        }
    }

    /// A sub-range of the grid, clipped to the captured cells
    pub fn window(sheet: &'a SheetState, range: &A1Range) -> Self {
        let (grid_rows, grid_cols) = sheet.grid_dimensions();
        Self {
            values: &sheet.values,
            formulas: &sheet.formulas,
            top: range.start.row,
            left: range.start.col,
            rows: range.row_count().min(grid_rows.saturating_sub(range.start.row)),
            cols: range.column_count().min(grid_cols.saturating_sub(range.start.col)),
        }
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    pub const fn origin(&self) -> (usize, usize) {
        (self.top, self.left)
    }

    /// Value at a window-relative position
    pub fn value(&self, row: usize, col: usize) -> &'a Value {
        self.values
            .get(self.top + row)
            .and_then(|r| r.get(self.left + col))
            .unwrap_or(&NULL)
    }

    /// Formula text at a window-relative position, only if it is a formula
    pub fn formula(&self, row: usize, col: usize) -> Option<&'a str> {
        self.formulas
            .get(self.top + row)
            .and_then(|r| r.get(self.left + col))
            .map(String::as_str)
            .filter(|f| is_formula(f))
    }

    /// Single scan computing cell counts
    pub fn metrics(&self) -> ChunkMetrics {
        let mut metrics = ChunkMetrics {
            row_count: self.rows,
            column_count: self.cols,
            ..Default::default()
        };

        for row in 0..self.rows {
            for col in 0..self.cols {
                let has_value = !is_empty_value(self.value(row, col));
                let has_formula = self.formula(row, col).is_some();
                if has_value {
                    metrics.value_count += 1;
                }
                if has_formula {
                    metrics.formula_count += 1;
                }
                if !has_value && !has_formula {
                    metrics.empty_count += 1;
                }
            }
        }

        metrics
    }

    /// Owned copy of the window's values, padded to full width
    pub fn owned_values(&self) -> Vec<Vec<Value>> {
        (0..self.rows)
            .map(|row| (0..self.cols).map(|col| self.value(row, col).clone()).collect())
            .collect()
    }

    /// Owned copy of the window's formula texts, padded with empty strings
    pub fn owned_formulas(&self) -> Vec<Vec<String>> {
        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| {
                        self.formulas
                            .get(self.top + row)
                            .and_then(|r| r.get(self.left + col))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sheet() -> SheetState {
        SheetState::new(
            "S",
            vec![
                vec![json!("Item"), json!("Cost")],
                vec![json!("a"), json!(5)],
                vec![json!("Total"), json!(5)],
            ],
        )
        .with_formulas(vec![
            vec![String::new(), String::new()],
            vec![String::new(), String::new()],
            vec![String::new(), "=SUM(B2:B2)".to_string()],
        ])
    }

    #[test]
    fn test_full_metrics() {
        let sheet = sheet();
        let metrics = GridView::full(&sheet).metrics();
        assert_eq!(metrics.row_count, 3);
        assert_eq!(metrics.column_count, 2);
        assert_eq!(metrics.value_count, 6);
        assert_eq!(metrics.formula_count, 1);
        assert_eq!(metrics.empty_count, 0);
    }

    #[test]
    fn test_window_clipped_to_grid() {
        let sheet = sheet();
        let range = A1Range::parse("B2:C4").unwrap();
        let view = GridView::window(&sheet, &range);
        assert_eq!((view.rows(), view.cols()), (2, 1));
        assert_eq!(view.value(0, 0), &json!(5));
        assert_eq!(view.formula(1, 0), Some("=SUM(B2:B2)"));

        let metrics = view.metrics();
        assert_eq!(metrics.value_count, 2);
        assert_eq!(metrics.empty_count, 0);
        assert_eq!(view.owned_formulas(), vec![vec![String::new()], vec!["=SUM(B2:B2)".to_string()]]);
    }

    #[test]
    fn test_whole_column_window_scans_data_only() {
        let sheet = sheet();
        let range = A1Range::parse("A1:T1048576").unwrap();
        let view = GridView::window(&sheet, &range);
        assert_eq!((view.rows(), view.cols()), (3, 2));
        assert_eq!(view.metrics().cell_count(), 6);
        assert_eq!(view.owned_values().len(), 3);
    }

    #[test]
    fn test_ragged_rows_read_empty() {
        let sheet = SheetState::new("R", vec![vec![json!(1), json!(2)], vec![json!(3)]]);
        let view = GridView::full(&sheet);
        assert_eq!(view.value(1, 1), &Value::Null);
        assert_eq!(view.metrics().empty_count, 1);
    }
}
