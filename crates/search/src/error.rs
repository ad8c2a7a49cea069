use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    /// The refinement collaborator answered with an error
    #[error("Refinement failed: {0}")]
    Refinement(String),

    #[error("Refinement timed out after {0:?}")]
    RefinementTimeout(Duration),

    #[error("Invalid locator configuration: {0}")]
    Config(String),
}
