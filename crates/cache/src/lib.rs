//! # Sheet Context Cache
//!
//! The single source of truth for chunk state in one workbook session.
//!
//! ```text
//! add_with_dependency_analysis(chunk)
//!     ├─> DependencyGraph: refs + formula scan
//!     └─> id → Chunk store
//!
//! invalidate(ids)      removes ids + transitive dependents
//! related_chunks(ids)  returns ids + transitive dependencies (cached only)
//! aggregate_metrics()  sums sheet chunk metrics
//! ```

mod cache;
mod error;
mod stats;

pub use cache::MetadataCache;
pub use error::{CacheError, Result};
pub use stats::WorkbookMetrics;
