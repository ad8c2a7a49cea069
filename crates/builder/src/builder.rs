use crate::config::ContextConfig;
use crate::error::{BuilderError, Result};
use crate::source::{WorkbookSnapshot, WorkbookSource};
use crate::wire::to_wire_format;
use sheet_context_cache::{MetadataCache, WorkbookMetrics};
use sheet_context_chunker::{
    sheet_chunk_id, Chunk, ChunkKind, ChunkMetrics, ChunkPayload, Compressor, Fingerprinter,
    RangeDetector, SheetState,
};
use sheet_context_search::{ChatMessage, ChunkLocator, LocateResult, QueryType, RelevanceRefiner};
use sheet_context_vector_store::EmbeddingStore;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::SystemTime;

/// Assembled context for one query
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Located chunks plus everything they depend on, or every sheet chunk on fallback
    pub chunks: Vec<Chunk>,
    /// Sheet the answer should focus on
    pub active_sheet: String,
    pub metrics: WorkbookMetrics,
    /// Raw selection, including per-chunk confidence
    pub located: LocateResult,
    /// Nothing cleared the confidence threshold; whole workbook returned
    pub used_fallback: bool,
    /// Sheets currently represented by placeholders
    pub degraded: Vec<String>,
}

impl QueryContext {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    pub const fn used_model(&self) -> bool {
        self.located.used_model
    }

    /// Sheet chunks of the context, in order
    pub fn sheet_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|c| c.is_sheet())
    }
}

/// Owns one workbook session: cache, dependency graph, embeddings and locator
pub struct QueryContextBuilder<S: WorkbookSource> {
    source: S,
    config: ContextConfig,
    compressor: Compressor,
    detector: RangeDetector,
    locator: ChunkLocator,
    cache: MetadataCache,
    embeddings: EmbeddingStore,
    active_sheet: Option<String>,
    stale: BTreeSet<String>,
    degraded: BTreeSet<String>,
    refresh_requested: bool,
}

impl<S: WorkbookSource> QueryContextBuilder<S> {
    pub fn new(source: S, config: ContextConfig) -> Result<Self> {
        config.validate()?;
        let compressor = Compressor::new(config.compressor.clone())?;
        let detector =
            RangeDetector::new(config.detector.clone())?.with_compressor_config(config.compressor.clone());
        let locator = ChunkLocator::new(config.locator.clone())?;

        Ok(Self {
            source,
            config,
            compressor,
            detector,
            locator,
            cache: MetadataCache::new(),
            embeddings: EmbeddingStore::new(),
            active_sheet: None,
            stale: BTreeSet::new(),
            degraded: BTreeSet::new(),
            refresh_requested: false,
        })
    }

    /// Builder: attach a model-assisted refinement collaborator
    #[must_use]
    pub fn with_refiner(mut self, refiner: Arc<dyn RelevanceRefiner>) -> Self {
        self.locator = self.locator.with_refiner(refiner);
        self
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    pub const fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub const fn embeddings(&self) -> &EmbeddingStore {
        &self.embeddings
    }

    pub const fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Sheets waiting to be recaptured
    pub fn stale_sheets(&self) -> Vec<String> {
        self.stale.iter().cloned().collect()
    }

    /// Force a full recapture on the next build
    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    /// Drop a sheet's chunks and everything depending on them.
    ///
    /// Every sheet that lost a chunk is recaptured on the next build.
    pub fn notify_sheet_changed(&mut self, sheet_name: &str) {
        let removed = self.cache.invalidate_for_sheet(sheet_name);
        self.stale.insert(sheet_name.to_string());
        for chunk in &removed {
            self.stale.insert(chunk.sheet_name().to_string());
        }
        let pruned = self.prune_embeddings();
        log::info!(
            "Sheet '{sheet_name}' changed: {} chunks invalidated, {pruned} embeddings pruned, {} sheets stale",
            removed.len(),
            self.stale.len()
        );
    }

    /// Populate the cache, locate relevant chunks and expand their dependencies
    pub async fn build_context(
        &mut self,
        query_type: QueryType,
        history: &[ChatMessage],
        query: &str,
    ) -> Result<QueryContext> {
        self.ensure_cache().await?;
        self.refresh_active_sheet().await;

        if let Some(active) = &self.active_sheet {
            self.locator.set_active_sheet(active.clone());
        }

        let located = self
            .locator
            .locate(&self.cache, &mut self.embeddings, query, history, query_type)
            .await;

        let host_active = self.active_sheet.clone().unwrap_or_default();
        let (chunks, active_sheet, used_fallback) = if located.is_empty() {
            log::debug!("No chunk cleared the threshold; using full workbook context");
            let chunks: Vec<Chunk> = self
                .cache
                .get_all_of_kind(ChunkKind::Sheet)
                .into_iter()
                .cloned()
                .collect();
            let active = if host_active.is_empty() {
                chunks.first().map(|c| c.sheet_name().to_string()).unwrap_or_default()
            } else {
                host_active
            };
            (chunks, active, true)
        } else {
            let chunks: Vec<Chunk> = self
                .cache
                .related_chunks(&located.chunk_ids)
                .into_iter()
                .cloned()
                .collect();
            let active = if located.details.sheets.contains(&host_active) {
                host_active
            } else {
                located.details.sheets.first().cloned().unwrap_or(host_active)
            };
            (chunks, active, false)
        };

        log::info!(
            "Built context: {} chunks, focus '{active_sheet}', fallback: {used_fallback}, model: {}",
            chunks.len(),
            located.used_model
        );

        Ok(QueryContext {
            chunks,
            active_sheet,
            metrics: self.cache.aggregate_metrics(),
            located,
            used_fallback,
            degraded: self.degraded.iter().cloned().collect(),
        })
    }

    /// Serialize a context with this session's diagnostics setting
    pub fn to_wire_format(&self, context: &QueryContext) -> Result<String> {
        to_wire_format(context, !self.config.production)
    }

    async fn ensure_cache(&mut self) -> Result<()> {
        let empty = self.cache.get_all_of_kind(ChunkKind::Sheet).is_empty();
        if self.refresh_requested || empty {
            return self.capture_all().await;
        }
        if !self.stale.is_empty() {
            return self.recapture_stale().await;
        }
        Ok(())
    }

    async fn capture_all(&mut self) -> Result<()> {
        let snapshot = self.capture().await?;

        self.cache.invalidate_all();
        self.embeddings.clear();
        self.stale.clear();
        self.degraded.clear();
        self.refresh_requested = false;
        if let Some(active) = &snapshot.active_sheet {
            self.active_sheet = Some(active.clone());
        }

        let failures = self.register_sheets(snapshot.sheets.iter().enumerate());
        if !snapshot.sheets.is_empty() && failures.len() == snapshot.sheets.len() {
            self.cache.invalidate_all();
            self.degraded.clear();
            return Err(BuilderError::AllSheetsFailed { failures });
        }

        log::info!(
            "Captured workbook: {} sheets, {} chunks, {} degraded",
            snapshot.sheets.len(),
            self.cache.len(),
            self.degraded.len()
        );
        Ok(())
    }

    async fn recapture_stale(&mut self) -> Result<()> {
        let snapshot = self.capture().await?;
        let stale = std::mem::take(&mut self.stale);

        let present: HashSet<&str> = snapshot.sheets.iter().map(|s| s.name.as_str()).collect();
        for name in &stale {
            self.cache.invalidate_for_sheet(name);
            if !present.contains(name.as_str()) {
                log::debug!("Stale sheet '{name}' no longer exists");
                self.degraded.remove(name);
            }
        }
        self.prune_embeddings();

        // Cascades may have reached sheets that were not marked stale
        let targets: Vec<(usize, &SheetState)> = snapshot
            .sheets
            .iter()
            .enumerate()
            .filter(|(i, s)| !self.cache.has(&sheet_chunk_id(&placeholder_name(s, *i))))
            .collect();

        let failures = self.register_sheets(targets.iter().copied());
        log::info!(
            "Recaptured {} stale sheets ({} failed)",
            targets.len(),
            failures.len()
        );
        Ok(())
    }

    async fn capture(&self) -> Result<WorkbookSnapshot> {
        self.source.capture_workbook_state().await
    }

    async fn refresh_active_sheet(&mut self) {
        match self.source.active_sheet_name().await {
            Ok(name) if !name.is_empty() => self.active_sheet = Some(name),
            Ok(_) => {}
            Err(e) => log::warn!("Active sheet unavailable, keeping previous: {e}"),
        }
    }

    /// Register each sheet, substituting placeholders for failures
    fn register_sheets<'a, I>(&mut self, sheets: I) -> Vec<String>
    where
        I: IntoIterator<Item = (usize, &'a SheetState)>,
    {
        let mut failures = Vec::new();
        for (index, sheet) in sheets {
            match self.register_sheet(sheet) {
                Ok(()) => {
                    self.degraded.remove(&sheet.name);
                }
                Err(e) => {
                    let name = placeholder_name(sheet, index);
                    log::warn!("Sheet '{name}' degraded to placeholder: {e}");
                    failures.push(format!("{name}: {e}"));
                    match placeholder_chunk(&name) {
                        Ok(chunk) => {
                            if let Err(e) = self.cache.add_with_dependency_analysis(chunk) {
                                log::warn!("Placeholder for '{name}' rejected: {e}");
                            }
                        }
                        Err(e) => log::warn!("Placeholder for '{name}' failed: {e}"),
                    }
                    self.degraded.insert(name);
                }
            }
        }
        failures
    }

    fn register_sheet(&mut self, sheet: &SheetState) -> Result<()> {
        let chunk = self.compressor.compress(Some(sheet))?;
        self.cache.add_with_dependency_analysis(chunk)?;

        let detection = self.detector.detect(Some(sheet));
        for chunk in self.detector.create_range_chunks(sheet, &detection) {
            let id = chunk.id.clone();
            if let Err(e) = self.cache.add_with_dependency_analysis(chunk) {
                log::warn!("Skipping range chunk {id}: {e}");
            }
        }
        Ok(())
    }

    fn prune_embeddings(&mut self) -> usize {
        let cache = &self.cache;
        self.embeddings.retain_ids(|id| cache.has(id))
    }
}

fn placeholder_name(sheet: &SheetState, index: usize) -> String {
    if sheet.name.trim().is_empty() {
        format!("Sheet{}", index + 1)
    } else {
        sheet.name.clone()
    }
}

/// Minimal stand-in for a sheet that could not be compressed
fn placeholder_chunk(sheet_name: &str) -> Result<Chunk> {
    let id = sheet_chunk_id(sheet_name);
    let payload = ChunkPayload {
        sheet_name: sheet_name.to_string(),
        summary: format!("Sheet '{sheet_name}' could not be summarized."),
        anchors: Vec::new(),
        values: None,
        formulas: None,
        metrics: ChunkMetrics::default(),
        charts: Vec::new(),
        range: None,
    };

    let mut fingerprint = Fingerprinter::new();
    fingerprint.section("placeholder", &id)?;
    fingerprint.section("payload", &payload)?;

    Ok(Chunk {
        id,
        kind: ChunkKind::Sheet,
        fingerprint: fingerprint.finish(),
        payload,
        refs: BTreeSet::new(),
        captured_at: SystemTime::now(),
    })
}
