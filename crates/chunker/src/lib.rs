//! # Sheet Context Chunker
//!
//! Compresses captured spreadsheet state into bounded, fingerprinted chunks
//! and proposes sub-ranges worth caching on their own.
//!
//! ## Architecture
//!
//! ```text
//! SheetState (values + formulas + tables/named ranges/charts)
//!     │
//!     ├──> Compressor
//!     │    ├─> Single-scan metrics
//!     │    ├─> Key anchors (lookup > conditional > aggregation > label > large number)
//!     │    ├─> Summary text, raw grids when small
//!     │    └─> SHA-256 fingerprint + cross-sheet refs → Chunk (kind = sheet)
//!     │
//!     └──> RangeDetector
//!          ├─> Tables, named ranges
//!          ├─> Formula-dense rectangles
//!          ├─> Used range + value-dense rectangles
//!          └─> create_range_chunks → Chunk (kind = range)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use sheet_context_chunker::{Compressor, RangeDetector, SheetState};
//!
//! let sheet = SheetState::new(
//!     "Sales",
//!     vec![
//!         vec![json!("Region"), json!("Revenue")],
//!         vec![json!("North"), json!(12_500)],
//!     ],
//! );
//!
//! let chunk = Compressor::default().compress(Some(&sheet)).unwrap();
//! assert_eq!(chunk.id, "Sheet:Sales");
//!
//! let detector = RangeDetector::default();
//! let detection = detector.detect(Some(&sheet));
//! let ranges = detector.create_range_chunks(&sheet, &detection);
//! assert!(ranges.iter().all(|r| r.refs.contains("Sheet:Sales")));
//! ```

mod address;
mod anchors;
mod compressor;
mod config;
mod detector;
mod error;
mod fingerprint;
mod grid;
mod references;
mod types;

pub use address::{column_to_letters, letters_to_column, split_sheet_qualified, A1Range, CellAddress};
pub use anchors::{classify_formula, classify_value};
pub use compressor::Compressor;
pub use config::{CompressorConfig, DetectorConfig};
pub use detector::RangeDetector;
pub use error::{ChunkerError, Result};
pub use fingerprint::Fingerprinter;
pub use references::{referenced_chunk_ids, referenced_chunk_ids_in_grid, scan_formula, FormulaReference};
pub use types::{
    display_value, is_empty_value, is_formula, range_chunk_id, range_id_prefix, sheet_chunk_id,
    Anchor, AnchorKind, ChartInfo, Chunk, ChunkKind, ChunkMetrics, ChunkPayload, DetectionResult,
    NamedRangeInfo, RangeInfo, RangeMeta, RangeType, SheetState, TableInfo, UsedRange,
    RANGE_ID_PREFIX, SHEET_ID_PREFIX,
};
