//! # Sheet Context Graph
//!
//! Depends-on tracking between spreadsheet chunks.
//!
//! ## Features
//!
//! - **Explicit refs** - every id in a chunk's `refs` becomes an edge
//! - **Formula scanning** - sheet-qualified references in formula text become edges
//! - **Cycle-safe closure** - transitive queries use a visited set, so circular
//!   workbook references terminate
//!
//! ## Architecture
//!
//! ```text
//! Chunk[] / formula grid
//!     │
//!     ├──> Analysis
//!     │      ├─ refs → add_dependency(chunk, ref)
//!     │      └─ Sheet!A1 mentions → add_dependency(Sheet:<owner>, ref)
//!     │
//!     └──> DependencyGraph (petgraph GraphMap over interned ids)
//!            ├─ dependencies_of / dependents_of
//!            ├─ transitive_dependencies / transitive_dependents
//!            └─ all_related
//! ```

mod builder;
mod error;
mod graph;
mod types;

pub use error::{GraphError, Result};
pub use types::{DependencyEdge, DependencyGraph};
