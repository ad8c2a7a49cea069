//! # Sheet Context Builder
//!
//! Orchestrates one workbook session: capture, compression, range detection,
//! dependency registration, relevance selection and context assembly.
//!
//! ## Pipeline
//!
//! ```text
//! WorkbookSource::capture_workbook_state()   (only when empty, stale or refresh requested)
//!     │
//!     ├──> Compressor  ──> sheet chunk   ─┐   failure → placeholder chunk
//!     ├──> RangeDetector ──> range chunks ─┤
//!     │                                    ▼
//!     │                  MetadataCache::add_with_dependency_analysis
//!     │
//! ChunkLocator::locate(query, history)
//!     │
//!     ├── nothing located ──> every sheet chunk (fallback)
//!     └── located ids ──> MetadataCache::related_chunks (seeds + dependencies)
//!     │
//!     ▼
//! QueryContext ──> to_wire_format() ──> JSON
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use sheet_context_builder::{
//!     ContextConfig, MemoryWorkbook, QueryContextBuilder, QueryType, WorkbookSnapshot,
//! };
//!
//! # async fn run() -> sheet_context_builder::Result<()> {
//! let workbook = MemoryWorkbook::new(WorkbookSnapshot::default());
//! let mut builder = QueryContextBuilder::new(workbook, ContextConfig::default())?;
//! let context = builder.build_context(QueryType::General, &[], "total revenue").await?;
//! println!("{}", builder.to_wire_format(&context)?);
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod error;
mod source;
mod wire;

pub use builder::{QueryContext, QueryContextBuilder};
pub use config::{ContextConfig, PRODUCTION_ENV};
pub use error::{BuilderError, Result};
pub use source::{JsonFileSource, MemoryWorkbook, WorkbookSnapshot, WorkbookSource};
pub use wire::to_wire_format;

pub use sheet_context_search::{ChatMessage, ChatRole, LocateResult, QueryType, RelevanceRefiner};
