use dstore_chunks::ChunkError;

/// Errors that abort a walk.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// A source read or sink write failed.
    #[error("chunk store error: {0}")]
    Chunk(#[from] ChunkError),

    /// The walk's [`CancelToken`](crate::CancelToken) was triggered.
    #[error("walk cancelled")]
    Cancelled,
}

impl WalkError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Convenience alias for walk results.
pub type WalkResult<T> = Result<T, WalkError>;
