//! Error types for every collaborator seam and for the pool operations built on them.

use crate::domain::{DifficultyClass, RecordId};

/// Errors returned by a `RecordStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with the given key.
    #[error("record not found: {id}")]
    NotFound { id: RecordId },

    /// A backend-specific failure (connection, serialization, etc.).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors returned by a `BlobStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The named object does not exist. Deleting it again is a no-op for callers.
    #[error("blob not found: {name}")]
    NotFound { name: String },

    #[error("blob backend error: {0}")]
    Backend(String),
}

/// Errors from the generator and solver.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The solver found no forced mate; the generated position is defective.
    #[error("no solution found for generated puzzle")]
    Unsolvable,

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("engine transport error: {0}")]
    Transport(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Errors surfaced by pool operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("render failed: {0}")]
    Render(String),

    /// The class has no records at all. Callers present "try again later".
    #[error("no problem available for class {class}")]
    Exhausted { class: DifficultyClass },

    /// The caller-supplied deadline passed during `operation`.
    #[error("deadline exceeded during {operation}")]
    Timeout { operation: &'static str },
}

impl PoolError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, PoolError::Exhausted { .. })
    }
}
