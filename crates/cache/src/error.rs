use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    /// Chunk id is not namespaced for its kind
    #[error("Chunk id {id:?} does not match kind '{kind}'")]
    IdKindMismatch { id: String, kind: &'static str },
}
