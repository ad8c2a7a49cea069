use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sheet_context_builder::{
    BuilderError, ContextConfig, MemoryWorkbook, QueryContextBuilder, QueryType,
    RelevanceRefiner, Result, WorkbookSnapshot, WorkbookSource,
};
use sheet_context_chunker::SheetState;
use sheet_context_search::{RefinementRequest, SearchError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Memory workbook that counts full captures
struct Counting {
    inner: MemoryWorkbook,
    captures: AtomicUsize,
}

impl Counting {
    fn new(snapshot: WorkbookSnapshot) -> Self {
        Self {
            inner: MemoryWorkbook::new(snapshot),
            captures: AtomicUsize::new(0),
        }
    }

    fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkbookSource for Counting {
    async fn capture_workbook_state(&self) -> Result<WorkbookSnapshot> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        self.inner.capture_workbook_state().await
    }

    async fn active_sheet_name(&self) -> Result<String> {
        self.inner.active_sheet_name().await
    }
}

struct Unreachable;

#[async_trait]
impl WorkbookSource for Unreachable {
    async fn capture_workbook_state(&self) -> Result<WorkbookSnapshot> {
        Err(BuilderError::capture("host unavailable"))
    }

    async fn active_sheet_name(&self) -> Result<String> {
        Err(BuilderError::capture("host unavailable"))
    }
}

struct Hanging;

#[async_trait]
impl RelevanceRefiner for Hanging {
    async fn refine(
        &self,
        _request: &RefinementRequest,
    ) -> std::result::Result<Vec<String>, SearchError> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(Vec::new())
    }
}

fn sheet1() -> SheetState {
    SheetState::new(
        "Sheet1",
        vec![vec![json!("Name"), json!("Qty")], vec![json!("Bolt"), json!(4)]],
    )
    .add_table("Parts", "A1:B2")
}

fn sheet2() -> SheetState {
    SheetState::new(
        "Sheet2",
        vec![
            vec![json!("Region"), json!("Sales")],
            vec![json!("North"), json!(100)],
            vec![json!("South"), json!(200)],
        ],
    )
}

fn two_sheets() -> WorkbookSnapshot {
    WorkbookSnapshot::new(vec![sheet1(), sheet2()]).with_active_sheet("Sheet1")
}

fn builder(snapshot: WorkbookSnapshot) -> QueryContextBuilder<Counting> {
    QueryContextBuilder::new(Counting::new(snapshot), ContextConfig::default()).unwrap()
}

fn sheet_names(chunks: &[sheet_context_chunker::Chunk]) -> Vec<String> {
    chunks
        .iter()
        .filter(|c| c.is_sheet())
        .map(|c| c.sheet_name().to_string())
        .collect()
}

#[tokio::test]
async fn empty_query_falls_back_to_full_workbook() {
    let mut builder = builder(two_sheets());
    let context = builder.build_context(QueryType::General, &[], "").await.unwrap();

    assert!(context.used_fallback);
    assert_eq!(sheet_names(&context.chunks), vec!["Sheet1", "Sheet2"]);
    assert_eq!(context.active_sheet, "Sheet1");
    assert_eq!(context.metrics.total_sheets, 2);
    assert_eq!(context.metrics.total_tables, 1);
    assert!(!context.is_degraded());
}

#[tokio::test]
async fn named_sheet_limits_context() {
    let mut builder = builder(two_sheets());
    let context = builder
        .build_context(QueryType::General, &[], "Summarize Sheet2")
        .await
        .unwrap();

    assert!(!context.used_fallback);
    assert_eq!(context.active_sheet, "Sheet2");
    assert!(context.chunks.iter().any(|c| c.id == "Sheet:Sheet2"));
    assert!(context.chunks.iter().all(|c| c.sheet_name() == "Sheet2"));
    // Metrics still describe the whole workbook
    assert_eq!(context.metrics.total_sheets, 2);
}

#[tokio::test]
async fn located_sheet_pulls_in_its_dependencies() {
    let sheet2 = sheet2().with_formulas(vec![
        vec![String::new(), String::new()],
        vec![String::new(), "=Rates!B1*100".to_string()],
        vec![String::new(), String::new()],
    ]);
    let rates = SheetState::new("Rates", vec![vec![json!("FX"), json!(1.1)]]);
    let snapshot = WorkbookSnapshot::new(vec![sheet1(), sheet2, rates]).with_active_sheet("Sheet1");

    let mut builder = builder(snapshot);
    let context = builder
        .build_context(QueryType::General, &[], "Summarize Sheet2")
        .await
        .unwrap();

    let mut sheets = sheet_names(&context.chunks);
    sheets.sort();
    assert_eq!(sheets, vec!["Rates", "Sheet2"]);
    assert_eq!(context.active_sheet, "Sheet2");
}

#[tokio::test]
async fn workbook_is_captured_once_until_refresh() {
    let mut builder = builder(two_sheets());
    builder.build_context(QueryType::General, &[], "").await.unwrap();
    builder
        .build_context(QueryType::Data, &[], "Sheet2 sales")
        .await
        .unwrap();
    assert_eq!(builder.source().captures(), 1);

    builder.request_refresh();
    builder.build_context(QueryType::General, &[], "").await.unwrap();
    assert_eq!(builder.source().captures(), 2);
}

#[tokio::test]
async fn changed_sheet_is_recaptured_with_its_dependents() {
    let inputs = SheetState::new("Inputs", vec![vec![json!("Rate"), json!(5)]]);
    let model = SheetState::new("Model", vec![vec![json!("Out"), json!(10)]]).with_formulas(vec![vec![
        String::new(),
        "=Inputs!B1*2".to_string(),
    ]]);
    let notes = SheetState::new("Notes", vec![vec![json!("free text")]]);
    let snapshot = WorkbookSnapshot::new(vec![inputs, model, notes]);

    let mut builder = builder(snapshot);
    builder.build_context(QueryType::General, &[], "").await.unwrap();
    let before = builder.cache().get("Sheet:Inputs").unwrap().fingerprint.clone();
    let notes_before = builder.cache().get("Sheet:Notes").unwrap().fingerprint.clone();

    builder
        .source()
        .inner
        .put_sheet(SheetState::new("Inputs", vec![vec![json!("Rate"), json!(7)]]))
        .await;
    builder.notify_sheet_changed("Inputs");

    assert_eq!(builder.stale_sheets(), vec!["Inputs", "Model"]);
    assert!(!builder.cache().has("Sheet:Inputs"));
    assert!(!builder.cache().has("Sheet:Model"));
    assert!(builder.cache().has("Sheet:Notes"));

    builder.build_context(QueryType::General, &[], "").await.unwrap();

    assert_eq!(builder.source().captures(), 2);
    assert!(builder.stale_sheets().is_empty());
    assert_ne!(builder.cache().get("Sheet:Inputs").unwrap().fingerprint, before);
    assert!(builder.cache().has("Sheet:Model"));
    assert_eq!(builder.cache().get("Sheet:Notes").unwrap().fingerprint, notes_before);
    assert!(builder
        .cache()
        .graph()
        .dependencies_of("Sheet:Model")
        .contains("Sheet:Inputs"));
}

#[tokio::test]
async fn broken_sheet_becomes_placeholder() {
    let broken = SheetState::new("Broken", vec![vec![json!(1)]])
        .with_formulas(vec![vec![String::new()], vec![String::new()]]);
    let snapshot = WorkbookSnapshot::new(vec![sheet1(), broken]);

    let mut builder = builder(snapshot);
    let context = builder.build_context(QueryType::General, &[], "").await.unwrap();

    assert_eq!(context.degraded, vec!["Broken".to_string()]);
    assert_eq!(sheet_names(&context.chunks), vec!["Broken", "Sheet1"]);

    let wire: Value = serde_json::from_str(&builder.to_wire_format(&context).unwrap()).unwrap();
    let broken = wire["sheets"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == "Broken")
        .unwrap();
    assert_eq!(broken["anchors"], json!([]));
    assert_eq!(broken["values"], json!([]));
}

#[tokio::test]
async fn every_sheet_failing_is_fatal() {
    let bad = |name: &str| {
        SheetState::new(name, vec![vec![json!(1)]])
            .with_formulas(vec![vec![String::new()], vec![String::new()]])
    };
    let mut builder = builder(WorkbookSnapshot::new(vec![bad("A"), bad("B")]));

    let err = builder
        .build_context(QueryType::General, &[], "")
        .await
        .unwrap_err();
    match err {
        BuilderError::AllSheetsFailed { failures } => assert_eq!(failures.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
    assert!(builder.cache().is_empty());
}

#[tokio::test]
async fn capture_failure_is_reported() {
    let mut builder = QueryContextBuilder::new(Unreachable, ContextConfig::default()).unwrap();
    let err = builder
        .build_context(QueryType::General, &[], "anything")
        .await
        .unwrap_err();
    assert!(matches!(err, BuilderError::Capture(_)));
}

#[tokio::test]
async fn empty_workbook_still_emits_wire_payload() {
    let mut builder = builder(WorkbookSnapshot::default());
    let context = builder.build_context(QueryType::General, &[], "").await.unwrap();
    assert!(context.chunks.is_empty());

    let wire: Value = serde_json::from_str(&builder.to_wire_format(&context).unwrap()).unwrap();
    assert_eq!(wire["sheets"].as_array().unwrap().len(), 1);
    assert_eq!(wire["_diagnostic"]["validSheetCount"], 0);
}

#[tokio::test]
async fn production_mode_omits_diagnostics() {
    let config = ContextConfig {
        production: true,
        ..Default::default()
    };
    let mut builder = QueryContextBuilder::new(Counting::new(two_sheets()), config).unwrap();
    let context = builder.build_context(QueryType::General, &[], "").await.unwrap();

    let wire: Value = serde_json::from_str(&builder.to_wire_format(&context).unwrap()).unwrap();
    assert!(wire.get("_diagnostic").is_none());
    assert_eq!(wire["activeSheet"], "Sheet1");
    assert_eq!(wire["metrics"]["totalSheets"], 2);
}

#[tokio::test(start_paused = true)]
async fn stalled_refinement_does_not_block_build() {
    let mut config = ContextConfig::default();
    config.locator.enable_model_refinement = true;
    config.locator.refinement_timeout_ms = 100;

    let mut builder = QueryContextBuilder::new(Counting::new(two_sheets()), config)
        .unwrap()
        .with_refiner(Arc::new(Hanging));
    let context = builder
        .build_context(QueryType::General, &[], "Summarize Sheet2")
        .await
        .unwrap();

    assert!(!context.used_model());
    assert_eq!(context.active_sheet, "Sheet2");
}
