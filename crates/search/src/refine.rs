use crate::error::{Result, SearchError};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// One candidate offered to the refinement collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementCandidate {
    pub chunk_id: String,
    pub sheet_name: String,
    pub summary: String,
    pub heuristic_score: f32,
}

/// Query plus a bounded candidate list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementRequest {
    pub query: String,
    pub candidates: Vec<RefinementCandidate>,
}

/// External model-assisted relevance judgment.
///
/// Implementations return the relevant candidate ids, most relevant first.
/// Unknown ids in the answer are ignored by the caller.
#[async_trait]
pub trait RelevanceRefiner: Send + Sync {
    async fn refine(&self, request: &RefinementRequest) -> Result<Vec<String>>;
}

/// Run one refinement call bounded by `timeout`
pub async fn refine_with_timeout(
    refiner: &dyn RelevanceRefiner,
    request: &RefinementRequest,
    timeout: Duration,
) -> Result<Vec<String>> {
    match tokio::time::timeout(timeout, refiner.refine(request)).await {
        Ok(result) => result,
        Err(_) => Err(SearchError::RefinementTimeout(timeout)),
    }
}
