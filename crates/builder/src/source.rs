use crate::error::{BuilderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sheet_context_chunker::SheetState;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// One capture of the whole workbook
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkbookSnapshot {
    pub active_sheet: Option<String>,
    pub sheets: Vec<SheetState>,
}

impl WorkbookSnapshot {
    pub fn new(sheets: Vec<SheetState>) -> Self {
        Self {
            active_sheet: None,
            sheets,
        }
    }

    #[must_use]
    pub fn with_active_sheet(mut self, name: impl Into<String>) -> Self {
        self.active_sheet = Some(name.into());
        self
    }

    /// Parse a JSON capture
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| BuilderError::capture(format!("invalid workbook JSON: {e}")))
    }
}

/// Host spreadsheet automation boundary
#[async_trait]
pub trait WorkbookSource: Send + Sync {
    /// Capture every sheet of the workbook
    async fn capture_workbook_state(&self) -> Result<WorkbookSnapshot>;

    /// Name of the sheet currently in focus
    async fn active_sheet_name(&self) -> Result<String>;
}

/// In-memory workbook whose sheets can be edited between captures
#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    snapshot: RwLock<WorkbookSnapshot>,
}

impl MemoryWorkbook {
    pub fn new(snapshot: WorkbookSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Replace the sheet with the same name, or append it
    pub async fn put_sheet(&self, sheet: SheetState) {
        let mut snapshot = self.snapshot.write().await;
        match snapshot.sheets.iter_mut().find(|s| s.name == sheet.name) {
            Some(existing) => *existing = sheet,
            None => snapshot.sheets.push(sheet),
        }
    }

    pub async fn remove_sheet(&self, name: &str) {
        self.snapshot.write().await.sheets.retain(|s| s.name != name);
    }

    pub async fn set_active_sheet(&self, name: impl Into<String>) {
        self.snapshot.write().await.active_sheet = Some(name.into());
    }
}

#[async_trait]
impl WorkbookSource for MemoryWorkbook {
    async fn capture_workbook_state(&self) -> Result<WorkbookSnapshot> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn active_sheet_name(&self) -> Result<String> {
        let snapshot = self.snapshot.read().await;
        Ok(resolve_active(&snapshot))
    }
}

/// Workbook capture stored as a JSON file, re-read on every capture
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<WorkbookSnapshot> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            BuilderError::capture(format!("cannot read {}: {e}", self.path.display()))
        })?;
        WorkbookSnapshot::from_json(&raw)
    }
}

#[async_trait]
impl WorkbookSource for JsonFileSource {
    async fn capture_workbook_state(&self) -> Result<WorkbookSnapshot> {
        let snapshot = self.read().await?;
        log::debug!(
            "Captured {} sheets from {}",
            snapshot.sheets.len(),
            self.path.display()
        );
        Ok(snapshot)
    }

    async fn active_sheet_name(&self) -> Result<String> {
        Ok(resolve_active(&self.read().await?))
    }
}

/// Declared active sheet, else the first sheet
fn resolve_active(snapshot: &WorkbookSnapshot) -> String {
    snapshot
        .active_sheet
        .clone()
        .or_else(|| snapshot.sheets.first().map(|s| s.name.clone()))
        .unwrap_or_default()
}
