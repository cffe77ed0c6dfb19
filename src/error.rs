use thiserror::Error;

pub type Result<T> = core::result::Result<T, HashError>;

/// Failures of a single hashing operation.
///
/// None of these are fatal to the process; the caller may start a fresh
/// operation right away.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hash algorithm unavailable: {name}")]
    AlgorithmUnavailable { name: String },

    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("Hashing cancelled")]
    Cancelled,

    #[error("Hashing task failed: {0}")]
    Join(String),
}
