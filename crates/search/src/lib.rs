//! # Sheet Context Search
//!
//! Relevance selection over cached spreadsheet chunks.
//!
//! ## Architecture
//!
//! ```text
//! query + recent chat
//!     │
//!     ├──> QueryTerms (tokens minus stopwords)
//!     │
//!     ├──> Score every sheet (and range) chunk
//!     │      ├─ keyword overlap with summary/anchors
//!     │      ├─ embedding similarity (EmbeddingStore)
//!     │      ├─ sheet name: verbatim or fuzzy (nucleo)
//!     │      ├─ active-sheet bonus, query-type boost
//!     │      └─ ranges × 0.8
//!     │
//!     ├──> Optional RelevanceRefiner (bounded by timeout, heuristic fallback)
//!     │
//!     └──> LocateResult (ids above min_confidence, details, scores)
//! ```

mod config;
mod error;
mod fusion;
mod keyword;
mod locator;
mod query;
mod refine;

pub use config::{parse_flag, LocatorConfig, MODEL_REFINEMENT_ENV, NAIVE_SELECTION_ENV};
pub use error::{Result, SearchError};
pub use fusion::{query_type_boost, ScoreBreakdown, ScoreWeights, RANGE_SCORE_FACTOR};
pub use keyword::{tokenize, QueryTerms};
pub use locator::{ChunkLocator, LocateDetails, LocateResult};
pub use query::{ChatMessage, ChatRole, QueryType};
pub use refine::{refine_with_timeout, RefinementCandidate, RefinementRequest, RelevanceRefiner};
