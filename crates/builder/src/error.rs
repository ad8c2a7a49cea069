use sheet_context_cache::CacheError;
use sheet_context_chunker::ChunkerError;
use sheet_context_search::SearchError;
use thiserror::Error;

/// Result type for context building
pub type Result<T> = std::result::Result<T, BuilderError>;

/// Errors surfaced by the context builder
#[derive(Error, Debug)]
pub enum BuilderError {
    /// The sheet-state collaborator could not supply the workbook
    #[error("Workbook capture failed: {0}")]
    Capture(String),

    /// No captured sheet could be compressed
    #[error("All {} sheets failed to compress: {}", failures.len(), failures.join("; "))]
    AllSheetsFailed { failures: Vec<String> },

    /// Context could not be rendered to the wire format
    #[error("Wire serialization error: {0}")]
    Wire(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Chunker(#[from] ChunkerError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl BuilderError {
    /// Create a capture error
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }
}
