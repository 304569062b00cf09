use dstore_types::Ref;

/// Errors from chunk store operations.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The requested chunk is not in the store.
    #[error("chunk not found: {0}")]
    NotFound(Ref),

    /// The backend could not be reached or failed an I/O operation.
    #[error("chunk store unavailable: {0}")]
    Unavailable(String),

    /// Chunk bytes failed to decode or did not hash to the expected ref.
    #[error("corrupt chunk {id}: {reason}")]
    Corrupt { id: Ref, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Attempted to use the null ref where a real chunk was required.
    #[error("null ref is not addressable")]
    NullRef,

    /// Wire framing failure on a remote store.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ChunkError {
    /// `true` when the failure is the backend's, not the data's.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Codec(_))
    }
}

impl From<std::io::Error> for ChunkError {
    fn from(e: std::io::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

/// Result alias for chunk store operations.
pub type ChunkResult<T> = Result<T, ChunkError>;

/// Errors from the remote wire codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("framing error: {0}")]
    FramingError(String),

    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}
