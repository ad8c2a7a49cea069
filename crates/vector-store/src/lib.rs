//! # Sheet Context Vector Store
//!
//! Reproducible chunk embeddings for relevance ranking. No trained model is
//! involved: text is feature-hashed into a fixed-size unit vector.
//!
//! ## Architecture
//!
//! ```text
//! Chunk
//!     │
//!     ├──> Template (sheet: name + summary + anchors,
//!     │              range: sheet!range + description + value preview)
//!     │
//!     ├──> HashEmbedder
//!     │      └─> Vector[128], unit norm
//!     │
//!     └──> EmbeddingStore
//!            ├─> id → record, reused while the fingerprint matches
//!            └─> similar_to(query, chunks, top_n)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use sheet_context_chunker::{Compressor, SheetState};
//! use sheet_context_vector_store::EmbeddingStore;
//!
//! let chunk = Compressor::default()
//!     .compress(Some(&SheetState::new("Sales", vec![vec![json!("Revenue")]])))
//!     .unwrap();
//!
//! let mut store = EmbeddingStore::new();
//! let ranked = store.similar_to("revenue", &[&chunk], 5);
//! assert_eq!(ranked[0].0, "Sheet:Sales");
//! ```

mod embeddings;
mod error;
mod store;
mod templates;

pub use embeddings::{cosine_similarity, HashEmbedder, DEFAULT_DIMENSION};
pub use error::{Result, VectorStoreError};
pub use store::{EmbeddingRecord, EmbeddingStore};
pub use templates::{render_chunk, MAX_RENDER_CHARS};
