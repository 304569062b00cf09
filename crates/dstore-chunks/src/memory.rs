use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use dstore_types::Ref;

use crate::chunk::Chunk;
use crate::error::{ChunkError, ChunkResult};
use crate::traits::ChunkStore;

/// In-memory, HashMap-based chunk store.
///
/// Intended for tests and embedding. Chunks live behind a `RwLock`; the root
/// pointer has its own `Mutex` so compare-and-swap never contends with chunk
/// reads. Chunks are cloned on read/write.
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<Ref, Chunk>>,
    root: Mutex<Ref>,
}

impl MemoryChunkStore {
    /// Create a new empty store with a null root.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            root: Mutex::new(Ref::null()),
        }
    }

    /// Number of chunks currently stored.
    pub fn len(&self) -> usize {
        self.chunks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.read().expect("lock poisoned").is_empty()
    }

    /// Total size across all stored chunks.
    pub fn total_bytes(&self) -> u64 {
        self.chunks
            .read()
            .expect("lock poisoned")
            .values()
            .map(Chunk::size)
            .sum()
    }

    /// Remove every chunk and reset the root.
    pub fn clear(&self) {
        self.chunks.write().expect("lock poisoned").clear();
        *self.root.lock().expect("lock poisoned") = Ref::null();
    }

    /// Sorted list of all chunk refs in the store.
    pub fn all_refs(&self) -> Vec<Ref> {
        let map = self.chunks.read().expect("lock poisoned");
        let mut refs: Vec<Ref> = map.keys().copied().collect();
        refs.sort();
        refs
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn get(&self, id: &Ref) -> ChunkResult<Option<Chunk>> {
        let map = self.chunks.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    fn has(&self, id: &Ref) -> ChunkResult<bool> {
        let map = self.chunks.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn put(&self, chunk: &Chunk) -> ChunkResult<Ref> {
        let id = chunk.compute_ref();
        if id.is_null() {
            return Err(ChunkError::NullRef);
        }
        let mut map = self.chunks.write().expect("lock poisoned");
        // Same ref always maps to the same content.
        map.entry(id).or_insert_with(|| chunk.clone());
        Ok(id)
    }

    fn root(&self) -> ChunkResult<Ref> {
        Ok(*self.root.lock().expect("lock poisoned"))
    }

    fn update_root(&self, current: Ref, last: Ref) -> ChunkResult<bool> {
        let mut root = self.root.lock().expect("lock poisoned");
        if *root != last {
            return Ok(false);
        }
        *root = current;
        Ok(true)
    }
}

impl std::fmt::Debug for MemoryChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChunkStore")
            .field("chunk_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    // -----------------------------------------------------------------------
    // Core get / has / put
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get_blob() {
        let store = MemoryChunkStore::new();
        let chunk = Chunk::blob(b"hello world".to_vec());
        let id = store.put(&chunk).unwrap();
        assert_eq!(id, chunk.compute_ref());
        assert_eq!(store.get(&id).unwrap(), Some(chunk));
    }

    #[test]
    fn get_missing_returns_none() {
        let store = MemoryChunkStore::new();
        assert!(store.get(&Ref::of_bytes(b"missing")).unwrap().is_none());
    }

    #[test]
    fn get_required_reports_not_found() {
        let store = MemoryChunkStore::new();
        let id = Ref::of_bytes(b"missing");
        let err = store.get_required(&id).unwrap_err();
        assert!(matches!(err, ChunkError::NotFound(r) if r == id));
    }

    #[test]
    fn get_required_rejects_null() {
        let store = MemoryChunkStore::new();
        assert!(matches!(
            store.get_required(&Ref::null()),
            Err(ChunkError::NullRef)
        ));
    }

    #[test]
    fn has_tracks_presence() {
        let store = MemoryChunkStore::new();
        let chunk = Chunk::blob(b"present".to_vec());
        assert!(!store.has(&chunk.compute_ref()).unwrap());
        let id = store.put(&chunk).unwrap();
        assert!(store.has(&id).unwrap());
    }

    #[test]
    fn put_is_idempotent() {
        let store = MemoryChunkStore::new();
        let chunk = Chunk::blob(b"idempotent".to_vec());
        let id1 = store.put(&chunk).unwrap();
        let id2 = store.put(&chunk).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn put_many_and_get_many() {
        let store = MemoryChunkStore::new();
        let leaf = Chunk::blob(b"leaf".to_vec());
        let node = Chunk::value(vec![leaf.compute_ref()], b"node".to_vec());
        let ids = store.put_many(&[leaf, node]).unwrap();
        assert_eq!(store.len(), 2);

        let missing = Ref::of_bytes(b"missing");
        let got = store.get_many(&[ids[1], missing, ids[0]]).unwrap();
        assert!(got[0].is_some());
        assert!(got[1].is_none());
        assert!(got[2].is_some());
    }

    // -----------------------------------------------------------------------
    // Root compare-and-swap
    // -----------------------------------------------------------------------

    #[test]
    fn root_starts_null() {
        let store = MemoryChunkStore::new();
        assert!(store.root().unwrap().is_null());
    }

    #[test]
    fn update_root_swaps_on_match() {
        let store = MemoryChunkStore::new();
        let r1 = Ref::of_bytes(b"r1");
        assert!(store.update_root(r1, Ref::null()).unwrap());
        assert_eq!(store.root().unwrap(), r1);
    }

    #[test]
    fn update_root_rejects_stale_expectation() {
        let store = MemoryChunkStore::new();
        let r1 = Ref::of_bytes(b"r1");
        let r2 = Ref::of_bytes(b"r2");
        assert!(store.update_root(r1, Ref::null()).unwrap());
        assert!(!store.update_root(r2, Ref::null()).unwrap());
        assert_eq!(store.root().unwrap(), r1);
    }

    #[test]
    fn concurrent_root_swaps_have_one_winner() {
        let store = Arc::new(MemoryChunkStore::new());
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .update_root(Ref::of_bytes(&[i]), Ref::null())
                        .unwrap()
                })
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn len_and_total_bytes() {
        let store = MemoryChunkStore::new();
        assert!(store.is_empty());
        store.put(&Chunk::blob(b"12345".to_vec())).unwrap();
        store.put(&Chunk::blob(b"123456789".to_vec())).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_bytes(), 14);
    }

    #[test]
    fn clear_removes_chunks_and_root() {
        let store = MemoryChunkStore::new();
        let id = store.put(&Chunk::blob(b"a".to_vec())).unwrap();
        store.update_root(id, Ref::null()).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(store.root().unwrap().is_null());
    }

    #[test]
    fn all_refs_is_sorted() {
        let store = MemoryChunkStore::new();
        for data in [&b"aaa"[..], b"bbb", b"ccc"] {
            store.put(&Chunk::blob(data.to_vec())).unwrap();
        }
        let refs = store.all_refs();
        assert_eq!(refs.len(), 3);
        assert!(refs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn shared_through_arc_and_reference() {
        let store = Arc::new(MemoryChunkStore::new());
        let by_arc: &dyn ChunkStore = &store;
        let id = by_arc.put(&Chunk::blob(b"shared".to_vec())).unwrap();
        let by_ref = &*store;
        assert!(ChunkStore::has(&by_ref, &id).unwrap());
    }

    #[test]
    fn debug_format() {
        let store = MemoryChunkStore::new();
        store.put(&Chunk::blob(b"x".to_vec())).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("MemoryChunkStore"));
        assert!(debug.contains("chunk_count"));
    }
}
