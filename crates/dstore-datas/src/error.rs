use dstore_chunks::ChunkError;
use dstore_types::Ref;
use dstore_walk::WalkError;

use crate::datastore::DataStore;

/// Errors from dataset and commit operations.
#[derive(Debug, thiserror::Error)]
pub enum DatasError {
    /// A dataset head, commit or chunk that must exist does not.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Another writer advanced the root after this snapshot was taken.
    #[error("dataset {dataset:?} was updated concurrently")]
    Conflict { dataset: String },

    /// The chunk store could not be reached.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("invalid dataset id {id:?}: {reason}")]
    InvalidDatasetId { id: String, reason: String },

    /// A chunk decoded to something other than what its position requires.
    #[error("corrupt chunk {id}: {reason}")]
    Corrupt { id: Ref, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A copy walk stopped before finishing.
    #[error("walk failed: {0}")]
    Walk(#[source] WalkError),
}

impl DatasError {
    /// `true` when re-reading the head and retrying may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

impl From<ChunkError> for DatasError {
    fn from(e: ChunkError) -> Self {
        match e {
            ChunkError::NotFound(id) => Self::not_found(format!("chunk {id}")),
            ChunkError::NullRef => Self::not_found("null ref"),
            ChunkError::Corrupt { id, reason } => Self::Corrupt { id, reason },
            ChunkError::Serialization(msg) => Self::Serialization(msg),
            other @ (ChunkError::Unavailable(_) | ChunkError::Codec(_)) => {
                Self::BackendUnavailable(other.to_string())
            }
        }
    }
}

impl From<WalkError> for DatasError {
    fn from(e: WalkError) -> Self {
        match e {
            WalkError::Chunk(inner) => inner.into(),
            other => Self::Walk(other),
        }
    }
}

/// Convenience alias for dataset results.
pub type DatasResult<T> = Result<T, DatasError>;

/// A failed commit.
///
/// `latest` is a snapshot at the backend's current root when one could be
/// read, so the caller can re-read the head and retry.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct CommitFailure {
    pub error: DatasError,
    pub latest: Option<DataStore>,
}

impl CommitFailure {
    pub fn is_conflict(&self) -> bool {
        self.error.is_conflict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_errors_map_to_dataset_errors() {
        let id = Ref::of_bytes(b"x");
        assert!(DatasError::from(ChunkError::NotFound(id)).is_not_found());
        assert!(matches!(
            DatasError::from(ChunkError::Unavailable("down".into())),
            DatasError::BackendUnavailable(_)
        ));
        assert!(matches!(
            DatasError::from(ChunkError::Corrupt { id, reason: "bad".into() }),
            DatasError::Corrupt { .. }
        ));
    }

    #[test]
    fn walk_errors_unwrap_chunk_failures() {
        let err = DatasError::from(WalkError::Chunk(ChunkError::NotFound(Ref::of_bytes(b"y"))));
        assert!(err.is_not_found());
        assert!(matches!(DatasError::from(WalkError::Cancelled), DatasError::Walk(_)));
    }

    #[test]
    fn conflict_display_names_dataset() {
        let err = DatasError::Conflict { dataset: "foo".into() };
        assert!(err.is_conflict());
        assert!(err.to_string().contains("\"foo\""));
    }
}
