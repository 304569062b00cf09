use std::sync::Arc;

use dstore_types::Ref;

use crate::chunk::Chunk;
use crate::error::{ChunkError, ChunkResult};

/// Content-addressed chunk store capability.
///
/// All implementations must satisfy these invariants:
/// - Chunks are immutable once written. The same content always produces the
///   same [`Ref`], so `put` is idempotent.
/// - Concurrent `get`/`has`/`put` are safe.
/// - `update_root` is a linearizable compare-and-swap of the single root
///   pointer.
/// - All backend errors are propagated, never silently ignored.
///
/// Callers are responsible for write order: a chunk should only be `put`
/// once every chunk in its [`Chunk::refs`] is present.
pub trait ChunkStore: Send + Sync {
    /// Read a chunk by its ref.
    ///
    /// Returns `Ok(None)` if the chunk does not exist.
    fn get(&self, id: &Ref) -> ChunkResult<Option<Chunk>>;

    /// Check whether a chunk exists in the store.
    fn has(&self, id: &Ref) -> ChunkResult<bool>;

    /// Write a chunk and return its ref. A no-op if it is already present.
    fn put(&self, chunk: &Chunk) -> ChunkResult<Ref>;

    /// The current root ref, or the null ref if no root was ever set.
    fn root(&self) -> ChunkResult<Ref>;

    /// Atomically replace the root with `current` if it still equals `last`.
    ///
    /// Returns `Ok(false)` when another writer moved the root first.
    fn update_root(&self, current: Ref, last: Ref) -> ChunkResult<bool>;

    /// Read a chunk that must exist.
    fn get_required(&self, id: &Ref) -> ChunkResult<Chunk> {
        if id.is_null() {
            return Err(ChunkError::NullRef);
        }
        self.get(id)?.ok_or(ChunkError::NotFound(*id))
    }

    /// Read several chunks.
    ///
    /// Default implementation calls `get()` for each ref. Backends may
    /// override for fewer round-trips.
    fn get_many(&self, ids: &[Ref]) -> ChunkResult<Vec<Option<Chunk>>> {
        ids.iter().map(|id| self.get(id)).collect()
    }

    /// Write several chunks in order and return their refs.
    ///
    /// Callers pass chunks leaves-first so the closure invariant holds after
    /// every individual write.
    fn put_many(&self, chunks: &[Chunk]) -> ChunkResult<Vec<Ref>> {
        chunks.iter().map(|chunk| self.put(chunk)).collect()
    }
}

impl<S: ChunkStore + ?Sized> ChunkStore for Arc<S> {
    fn get(&self, id: &Ref) -> ChunkResult<Option<Chunk>> {
        (**self).get(id)
    }

    fn has(&self, id: &Ref) -> ChunkResult<bool> {
        (**self).has(id)
    }

    fn put(&self, chunk: &Chunk) -> ChunkResult<Ref> {
        (**self).put(chunk)
    }

    fn root(&self) -> ChunkResult<Ref> {
        (**self).root()
    }

    fn update_root(&self, current: Ref, last: Ref) -> ChunkResult<bool> {
        (**self).update_root(current, last)
    }
}

impl<S: ChunkStore + ?Sized> ChunkStore for &S {
    fn get(&self, id: &Ref) -> ChunkResult<Option<Chunk>> {
        (**self).get(id)
    }

    fn has(&self, id: &Ref) -> ChunkResult<bool> {
        (**self).has(id)
    }

    fn put(&self, chunk: &Chunk) -> ChunkResult<Ref> {
        (**self).put(chunk)
    }

    fn root(&self) -> ChunkResult<Ref> {
        (**self).root()
    }

    fn update_root(&self, current: Ref, last: Ref) -> ChunkResult<bool> {
        (**self).update_root(current, last)
    }
}
