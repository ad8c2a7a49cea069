use crate::config::LocatorConfig;
use crate::error::Result;
use crate::fusion::{query_type_boost, ScoreBreakdown, ScoreWeights};
use crate::keyword::{chunk_tokens, contains_phrase, keyword_overlap, NameMatcher, QueryTerms};
use crate::query::{ChatMessage, QueryType};
use crate::refine::{refine_with_timeout, RefinementCandidate, RefinementRequest, RelevanceRefiner};
use serde::Serialize;
use sheet_context_cache::MetadataCache;
use sheet_context_chunker::{Chunk, ChunkKind};
use sheet_context_vector_store::EmbeddingStore;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Sheets, ranges and charts touched by the located chunks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocateDetails {
    pub sheets: Vec<String>,
    /// `Sheet!A1:B2`
    pub ranges: Vec<String>,
    pub charts: Vec<String>,
}

/// Outcome of one relevance selection.
///
/// An empty `chunk_ids` means "no specific chunk identified".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocateResult {
    pub chunk_ids: Vec<String>,
    pub details: LocateDetails,
    pub confidence_scores: BTreeMap<String, f32>,
    pub used_model: bool,
}

impl LocateResult {
    pub fn is_empty(&self) -> bool {
        self.chunk_ids.is_empty()
    }
}

/// Scored candidate
#[derive(Debug, Clone)]
struct Scored<'a> {
    chunk: &'a Chunk,
    score: f32,
}

/// Picks the chunks relevant to a query
pub struct ChunkLocator {
    config: LocatorConfig,
    weights: ScoreWeights,
    active_sheet: Option<String>,
    refiner: Option<Arc<dyn RelevanceRefiner>>,
}

impl ChunkLocator {
    pub fn new(config: LocatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            weights: ScoreWeights::default(),
            active_sheet: None,
            refiner: None,
        })
    }

    /// Builder: attach the refinement collaborator
    #[must_use]
    pub fn with_refiner(mut self, refiner: Arc<dyn RelevanceRefiner>) -> Self {
        self.refiner = Some(refiner);
        self
    }

    /// Builder: override score weights
    #[must_use]
    pub const fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn set_active_sheet(&mut self, name: impl Into<String>) {
        self.active_sheet = Some(name.into());
    }

    pub fn active_sheet(&self) -> Option<&str> {
        self.active_sheet.as_deref()
    }

    pub const fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Rank cached chunks against the query and recent conversation
    pub async fn locate(
        &self,
        cache: &MetadataCache,
        embeddings: &mut EmbeddingStore,
        query: &str,
        history: &[ChatMessage],
        query_type: QueryType,
    ) -> LocateResult {
        let sheets = cache.get_all_of_kind(ChunkKind::Sheet);
        if sheets.is_empty() {
            log::debug!("No sheet chunks cached; nothing to locate");
            return LocateResult::default();
        }

        let terms = QueryTerms::new(query, history, self.config.history_window);

        if self.config.use_naive_selection {
            return self.locate_naive(cache, &sheets, &terms);
        }

        if terms.is_empty() {
            log::debug!("Query has no searchable terms");
            return LocateResult::default();
        }

        let mut candidates = sheets;
        if self.config.include_ranges {
            candidates.extend(cache.get_all_of_kind(ChunkKind::Range));
        }

        let mut ranked = self.score(&candidates, embeddings, &terms, query_type);
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut used_model = false;
        let mut selected: Vec<(String, f32)> = Vec::new();

        if self.config.enable_model_refinement {
            match self.refine(query, &ranked).await {
                Some(ids) => {
                    used_model = true;
                    let heuristic: HashMap<&str, f32> = ranked
                        .iter()
                        .map(|s| (s.chunk.id.as_str(), s.score))
                        .collect();
                    let mut seen = HashSet::new();
                    for id in ids {
                        if let Some(score) = heuristic.get(id.as_str()) {
                            if seen.insert(id.clone()) {
                                selected.push((id, score.max(self.config.min_confidence)));
                            }
                        }
                    }
                }
                None => selected = self.threshold(&ranked),
            }
        } else {
            selected = self.threshold(&ranked);
        }

        selected.truncate(self.config.max_results);
        log::debug!(
            "Located {} of {} candidates (model: {used_model})",
            selected.len(),
            ranked.len()
        );

        self.finish(cache, selected, used_model)
    }

    fn score<'a>(
        &self,
        candidates: &[&'a Chunk],
        embeddings: &mut EmbeddingStore,
        terms: &QueryTerms,
        query_type: QueryType,
    ) -> Vec<Scored<'a>> {
        let similarity: HashMap<String, f32> = embeddings
            .similar_to(&terms.text, candidates, candidates.len())
            .into_iter()
            .collect();

        let mut names = NameMatcher::new();
        let active = self.active_sheet.as_deref();

        candidates
            .iter()
            .map(|chunk| {
                let sheet_name = chunk.sheet_name();
                let breakdown = ScoreBreakdown {
                    keyword: keyword_overlap(terms, &chunk_tokens(chunk)),
                    embedding: similarity.get(&chunk.id).copied().unwrap_or(0.0),
                    exact_name: contains_phrase(&terms.text, &sheet_name.to_lowercase()),
                    fuzzy_name: names.quality(terms, sheet_name),
                    active: active == Some(sheet_name),
                    type_boost: query_type_boost(query_type, chunk.metrics()),
                    is_range: !chunk.is_sheet(),
                };
                let score = breakdown.combine(&self.weights, self.config.active_sheet_bonus);
                log::trace!("{} scored {score:.3}: {breakdown:?}", chunk.id);
                Scored { chunk, score }
            })
            .collect()
    }

    fn threshold(&self, ranked: &[Scored<'_>]) -> Vec<(String, f32)> {
        ranked
            .iter()
            .filter(|s| s.score >= self.config.min_confidence)
            .map(|s| (s.chunk.id.clone(), s.score))
            .collect()
    }

    /// Ask the collaborator; None means fall back to the heuristic ranking
    async fn refine(&self, query: &str, ranked: &[Scored<'_>]) -> Option<Vec<String>> {
        let refiner = self.refiner.as_deref()?;
        let request = RefinementRequest {
            query: query.to_string(),
            candidates: ranked
                .iter()
                .take(self.config.refinement_candidates)
                .map(|s| RefinementCandidate {
                    chunk_id: s.chunk.id.clone(),
                    sheet_name: s.chunk.sheet_name().to_string(),
                    summary: s.chunk.payload.summary.clone(),
                    heuristic_score: s.score,
                })
                .collect(),
        };
        if request.candidates.is_empty() {
            return None;
        }

        match refine_with_timeout(refiner, &request, self.config.refinement_timeout()).await {
            Ok(ids) => Some(ids),
            Err(e) => {
                log::warn!("Refinement unavailable, using heuristic ranking: {e}");
                None
            }
        }
    }

    /// Sheets named in the conversation, then the active sheet
    fn locate_naive(&self, cache: &MetadataCache, sheets: &[&Chunk], terms: &QueryTerms) -> LocateResult {
        let mut selected: Vec<(String, f32)> = sheets
            .iter()
            .filter(|c| contains_phrase(&terms.text, &c.sheet_name().to_lowercase()))
            .map(|c| (c.id.clone(), 1.0))
            .collect();

        if let Some(active) = self.active_sheet.as_deref() {
            if let Some(chunk) = sheets.iter().find(|c| c.sheet_name() == active) {
                if !selected.iter().any(|(id, _)| *id == chunk.id) {
                    selected.push((chunk.id.clone(), self.config.min_confidence));
                }
            }
        }

        selected.truncate(self.config.max_results);
        self.finish(cache, selected, false)
    }

    fn finish(&self, cache: &MetadataCache, selected: Vec<(String, f32)>, used_model: bool) -> LocateResult {
        let mut details = LocateDetails::default();
        let mut confidence_scores = BTreeMap::new();
        let mut chunk_ids = Vec::with_capacity(selected.len());

        for (id, score) in selected {
            if let Some(chunk) = cache.get(&id) {
                let sheet = chunk.sheet_name().to_string();
                if !details.sheets.contains(&sheet) {
                    details.sheets.push(sheet);
                }
                if let Some(meta) = &chunk.payload.range {
                    details.ranges.push(format!("{}!{}", chunk.sheet_name(), meta.address));
                }
            }
            confidence_scores.insert(id.clone(), score);
            chunk_ids.push(id);
        }

        for sheet in &details.sheets {
            if let Some(chunk) = cache.get(&sheet_context_chunker::sheet_chunk_id(sheet)) {
                for chart in &chunk.payload.charts {
                    if !details.charts.contains(chart) {
                        details.charts.push(chart.clone());
                    }
                }
            }
        }

        LocateResult {
            chunk_ids,
            details,
            confidence_scores,
            used_model,
        }
    }
}
