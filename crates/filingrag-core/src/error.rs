use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Vector index not initialized. Add chunks first.")]
    IndexNotInitialized,

    #[error("Cannot save empty index.")]
    EmptyIndex,

    #[error("Embedding dimension mismatch: index holds {expected}, batch has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index persistence failed: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, Error>;
