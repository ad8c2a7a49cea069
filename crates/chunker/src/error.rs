use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while compressing or slicing sheet state
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// No sheet state was supplied
    #[error("Undefined sheet: no sheet state provided")]
    UndefinedSheet,

    /// Sheet state is present but unusable
    #[error("Invalid sheet: {0}")]
    InvalidSheet(String),

    /// Value and formula grids disagree on their row count
    #[error("Grid shape mismatch in '{sheet}': {value_rows} value rows vs {formula_rows} formula rows")]
    GridShapeMismatch {
        sheet: String,
        value_rows: usize,
        formula_rows: usize,
    },

    /// Malformed A1 cell address
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Malformed or out-of-bounds A1 range
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Range points at a sheet other than the one being sliced
    #[error("Range {range} belongs to sheet '{range_sheet}', not '{sheet}'")]
    ForeignRange {
        range: String,
        range_sheet: String,
        sheet: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Payload could not be serialized for fingerprinting
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChunkerError {
    /// Create an invalid address error
    pub fn invalid_address(address: impl Into<String>) -> Self {
        Self::InvalidAddress(address.into())
    }

    /// Create an invalid range error
    pub fn invalid_range(range: impl Into<String>) -> Self {
        Self::InvalidRange(range.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
