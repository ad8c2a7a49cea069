use crate::query::QueryType;
use serde::Serialize;
use sheet_context_chunker::ChunkMetrics;

/// Range chunks rank below sheet chunks with the same evidence
pub const RANGE_SCORE_FACTOR: f32 = 0.8;

/// Blend weights of the heuristic score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub keyword: f32,
    pub embedding: f32,
    /// Added when the sheet name appears verbatim in the conversation
    pub exact_name: f32,
    /// Multiplied by fuzzy name-match quality
    pub fuzzy_name: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            keyword: 0.5,
            embedding: 0.3,
            exact_name: 0.6,
            fuzzy_name: 0.2,
        }
    }
}

/// Evidence gathered for one candidate chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub keyword: f32,
    pub embedding: f32,
    pub exact_name: bool,
    pub fuzzy_name: f32,
    pub active: bool,
    pub type_boost: f32,
    pub is_range: bool,
}

impl ScoreBreakdown {
    /// Final confidence in [0, 1]
    #[must_use]
    pub fn combine(&self, weights: &ScoreWeights, active_bonus: f32) -> f32 {
        let name = if self.exact_name {
            weights.exact_name
        } else {
            weights.fuzzy_name * self.fuzzy_name
        };

        let mut total = weights.keyword * self.keyword
            + weights.embedding * self.embedding.max(0.0)
            + name
            + self.type_boost;
        if self.active {
            total += active_bonus;
        }
        if self.is_range {
            total *= RANGE_SCORE_FACTOR;
        }
        total.clamp(0.0, 1.0)
    }
}

/// Small nudge toward chunks matching the question's focus
#[must_use]
pub fn query_type_boost(query_type: QueryType, metrics: &ChunkMetrics) -> f32 {
    match query_type {
        QueryType::General => 0.0,
        QueryType::Formula if metrics.formula_count > 0 => 0.05 + 0.1 * metrics.formula_ratio(),
        QueryType::Data => 0.1 * metrics.value_ratio(),
        QueryType::Chart if metrics.chart_count > 0 => 0.1,
        QueryType::Formula | QueryType::Chart => 0.0,
    }
}
