use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sheet_context_chunker::{
    DetectorConfig, RangeDetector, RangeType, SheetState, TableInfo, UsedRange,
};

/// Build a value grid from a picture: `#` is a filled cell, `.` is empty
fn grid(picture: &[&str]) -> Vec<Vec<Value>> {
    picture
        .iter()
        .map(|row| {
            row.chars()
                .map(|c| if c == '#' { json!(1) } else { Value::Null })
                .collect()
        })
        .collect()
}

fn formula_grid(picture: &[&str]) -> Vec<Vec<String>> {
    picture
        .iter()
        .map(|row| {
            row.chars()
                .map(|c| if c == '=' { "=A1+1".to_string() } else { String::new() })
                .collect()
        })
        .collect()
}

fn data_regions(sheet: &SheetState) -> Vec<sheet_context_chunker::RangeInfo> {
    let (rows, cols) = sheet.used_dimensions();
    RangeDetector::default()
        .detect(Some(sheet))
        .ranges
        .into_iter()
        .filter(|r| r.range_type == RangeType::KeyRegion)
        .filter(|r| (r.row_count, r.column_count) != (rows, cols))
        .collect()
}

#[test]
fn missing_or_nameless_sheet_yields_nothing() {
    let detector = RangeDetector::default();
    assert!(detector.detect(None).ranges.is_empty());
    assert!(detector
        .detect(Some(&SheetState::new("", grid(&["##", "##"]))))
        .ranges
        .is_empty());
}

#[test]
fn dense_two_by_two_block_is_one_region() {
    let sheet = SheetState::new("Data", grid(&["....", ".##.", ".##.", "...."]));

    let regions = data_regions(&sheet);
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].range, "B2:C3");
    assert_eq!((regions[0].row_count, regions[0].column_count), (2, 2));
    assert_eq!(regions[0].importance, 95.0);
}

#[test]
fn single_cells_and_sparse_blocks_are_never_regions() {
    let single = SheetState::new("One", grid(&["....", ".#..", "....", "...."]));
    assert!(data_regions(&single).is_empty());

    let diagonal = SheetState::new("Diag", grid(&["#...", ".#..", "..#.", "...#"]));
    assert!(data_regions(&diagonal).is_empty());
}

#[test]
fn used_range_always_reported() {
    let sheet = SheetState::new("Data", grid(&["#..", "...", "..#"]));
    let result = RangeDetector::default().detect(Some(&sheet));

    let key = result.of_type(RangeType::KeyRegion);
    assert_eq!(key.len(), 1);
    assert_eq!(key[0].range, "A1:C3");
    assert_eq!(key[0].importance, 75.0);
    assert_eq!(key[0].name.as_deref(), Some("Data_KeyRegion_1"));
}

#[test]
fn empty_sheet_reports_no_used_range() {
    let sheet = SheetState::new("Blank", vec![]);
    assert!(RangeDetector::default().detect(Some(&sheet)).ranges.is_empty());
}

#[test]
fn formula_regions_scored_by_formula_count() {
    let sheet = SheetState::new("Calc", grid(&["###", "###", "###"]))
        .with_formulas(formula_grid(&["...", ".==", ".=="]));

    let result = RangeDetector::default().detect(Some(&sheet));
    let formulas = result.of_type(RangeType::FormulaRegion);
    assert_eq!(formulas.len(), 1);
    assert_eq!(formulas[0].range, "B2:C3");
    assert_eq!(formulas[0].importance, 42.0);
    assert_eq!(formulas[0].name.as_deref(), Some("Calc_FormulaRegion_1"));
}

#[test]
fn small_formula_regions_discarded() {
    let sheet = SheetState::new("Calc", grid(&["##", "##"])).with_formulas(formula_grid(&["==", "=="]));
    let strict = DetectorConfig {
        min_formula_cells: 5,
        ..Default::default()
    };

    let detector = RangeDetector::new(strict).unwrap();
    assert!(detector
        .detect(Some(&sheet))
        .of_type(RangeType::FormulaRegion)
        .is_empty());
}

#[test]
fn tables_need_name_and_range() {
    let mut sheet = SheetState::new("Sales", grid(&["##", "##", "##"])).add_table("Orders", "Sales!A1:B3");
    sheet.tables.push(TableInfo {
        name: Some("Unplaced".to_string()),
        range: None,
    });
    sheet.tables.push(TableInfo {
        name: None,
        range: Some("A1:A2".to_string()),
    });

    let result = RangeDetector::default().detect(Some(&sheet));
    let tables = result.of_type(RangeType::Table);
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].range, "A1:B3");
    assert_eq!(tables[0].importance, 90.0);
    assert_eq!((tables[0].row_count, tables[0].column_count), (3, 2));
}

#[test]
fn malformed_named_ranges_skipped() {
    let sheet = SheetState::new("Inputs", grid(&["##", "##"]))
        .add_named_range("Rates", "=Inputs!$A$1:$B$2")
        .add_named_range("Single", "=Inputs!A1")
        .add_named_range("Broken", "#REF!");

    let result = RangeDetector::default().detect(Some(&sheet));
    let named = result.of_type(RangeType::NamedRange);
    assert_eq!(named.len(), 1);
    assert_eq!(named[0].name.as_deref(), Some("Rates"));
    assert_eq!(named[0].range, "A1:B2");
    assert_eq!(named[0].importance, 85.0);
}

#[test]
fn region_names_unique_within_pass() {
    let sheet = SheetState::new("Mix", grid(&["##..##", "##..##", "......", "##...."]))
        .with_formulas(formula_grid(&["==....", "==....", "......", "......"]));

    let result = RangeDetector::default().detect(Some(&sheet));
    let mut names: Vec<&str> = result.ranges.iter().filter_map(|r| r.name.as_deref()).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);
}

#[test]
fn range_chunks_skip_bad_ranges() {
    let sheet = SheetState::new("Sales", grid(&["##", "##"]))
        .add_table("Orders", "A1:B2")
        .add_table("Ghost", "Z100:Z200")
        .add_named_range("Elsewhere", "=Other!A1:B2");

    let detector = RangeDetector::default();
    let detection = detector.detect(Some(&sheet));
    let chunks = detector.create_range_chunks(&sheet, &detection);

    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["Range:Sales!A1:B2"]);

    let chunk = &chunks[0];
    assert!(chunk.refs.contains("Sheet:Sales"));
    let meta = chunk.payload.range.as_ref().unwrap();
    assert_eq!(meta.range_type, RangeType::Table);
    assert_eq!(meta.name.as_deref(), Some("Orders"));
    assert_eq!(chunk.metrics().value_count, 4);
    assert_eq!(chunk.payload.values.as_ref().map(Vec::len), Some(2));
}

#[test]
fn range_chunk_refs_include_foreign_sheets() {
    let sheet = SheetState::new("Report", grid(&["##", "##"]))
        .with_formulas(vec![
            vec!["=Inputs!A1".to_string(), String::new()],
            vec![String::new(), String::new()],
        ])
        .add_table("Summary", "A1:B2");

    let detector = RangeDetector::default();
    let chunks = detector.create_range_chunks(&sheet, &detector.detect(Some(&sheet)));
    assert!(chunks[0].refs.contains("Sheet:Report"));
    assert!(chunks[0].refs.contains("Sheet:Inputs"));
}

#[test]
fn whole_column_ranges_cost_only_captured_cells() {
    let mut sheet = SheetState::new("Sheet1", grid(&["##", "##"]))
        .add_named_range("Everything", "=Sheet1!$A$1:$T$1048576");
    sheet.used_range = Some(UsedRange {
        row_count: 1_048_576,
        column_count: 16_384,
    });

    let detector = RangeDetector::default();
    let detection = detector.detect(Some(&sheet));
    let chunks = detector.create_range_chunks(&sheet, &detection);

    let named = chunks
        .iter()
        .find(|c| c.id == "Range:Sheet1!A1:T1048576")
        .unwrap();
    assert_eq!(named.payload.range.as_ref().unwrap().address, "A1:T1048576");
    assert_eq!(named.metrics().cell_count(), 4);
    assert_eq!(named.metrics().value_count, 4);
    assert_eq!(named.payload.values.as_ref().map(Vec::len), Some(2));

    assert!(chunks.iter().all(|c| c.metrics().cell_count() <= 4));
    // The oversized used range is reported, but no data region duplicates the grid
    assert_eq!(detection.of_type(RangeType::KeyRegion).len(), 1);
}
