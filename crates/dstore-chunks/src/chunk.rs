use dstore_crypto::ContentHasher;
use dstore_types::Ref;
use serde::{Deserialize, Serialize};

/// The kind of a chunk.
///
/// The kind selects the hash domain and lets the commit layer recognise its
/// own records. The reachability engine ignores it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkKind {
    /// Leaf data with no outgoing references.
    Blob,
    /// Interior node of a value DAG.
    Value,
    /// A commit: value root plus parent commits.
    Commit,
    /// The dataset root mapping.
    Datasets,
}

impl ChunkKind {
    fn hasher(self) -> &'static ContentHasher {
        match self {
            Self::Blob => &ContentHasher::BLOB,
            Self::Value => &ContentHasher::VALUE,
            Self::Commit => &ContentHasher::COMMIT,
            Self::Datasets => &ContentHasher::DATASETS,
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Value => write!(f, "value"),
            Self::Commit => write!(f, "commit"),
            Self::Datasets => write!(f, "datasets"),
        }
    }
}

/// An immutable chunk: kind tag, outgoing references, opaque payload.
///
/// The chunk's address is the hash of `ref count ‖ refs ‖ data` under the
/// kind's domain, so the edge list is part of the identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    kind: ChunkKind,
    refs: Vec<Ref>,
    data: Vec<u8>,
}

impl Chunk {
    /// Create a chunk from its parts.
    pub fn new(kind: ChunkKind, refs: Vec<Ref>, data: Vec<u8>) -> Self {
        Self { kind, refs, data }
    }

    /// A leaf blob with no references.
    pub fn blob(data: impl Into<Vec<u8>>) -> Self {
        Self::new(ChunkKind::Blob, Vec::new(), data.into())
    }

    /// An interior value node pointing at `refs`.
    pub fn value(refs: Vec<Ref>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(ChunkKind::Value, refs, data.into())
    }

    pub fn kind(&self) -> ChunkKind {
        self.kind
    }

    /// Outgoing DAG edges, in encoding order.
    pub fn refs(&self) -> &[Ref] {
        &self.refs
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload size plus 32 bytes per reference.
    pub fn size(&self) -> u64 {
        (self.data.len() + self.refs.len() * 32) as u64
    }

    /// Compute the content address of this chunk.
    pub fn compute_ref(&self) -> Ref {
        let count = (self.refs.len() as u64).to_le_bytes();
        let parts = std::iter::once(&count[..])
            .chain(self.refs.iter().map(|r| &r.as_bytes()[..]))
            .chain(std::iter::once(self.data.as_slice()));
        self.kind.hasher().hash_parts(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_ref_is_deterministic() {
        let chunk = Chunk::blob(b"deterministic".to_vec());
        assert_eq!(chunk.compute_ref(), chunk.compute_ref());
    }

    #[test]
    fn kinds_separate_identical_bytes() {
        let blob = Chunk::new(ChunkKind::Blob, vec![], b"same".to_vec());
        let value = Chunk::new(ChunkKind::Value, vec![], b"same".to_vec());
        let commit = Chunk::new(ChunkKind::Commit, vec![], b"same".to_vec());
        assert_ne!(blob.compute_ref(), value.compute_ref());
        assert_ne!(value.compute_ref(), commit.compute_ref());
    }

    #[test]
    fn refs_are_part_of_identity() {
        let a = Ref::of_bytes(b"a");
        let b = Ref::of_bytes(b"b");
        let ab = Chunk::value(vec![a, b], b"node".to_vec());
        let ba = Chunk::value(vec![b, a], b"node".to_vec());
        let none = Chunk::value(vec![], b"node".to_vec());
        assert_ne!(ab.compute_ref(), ba.compute_ref());
        assert_ne!(ab.compute_ref(), none.compute_ref());
    }

    #[test]
    fn ref_count_prefix_prevents_boundary_ambiguity() {
        // One ref and no data must not collide with no refs and the ref's
        // bytes as data.
        let r = Ref::of_bytes(b"edge");
        let with_ref = Chunk::value(vec![r], Vec::new());
        let as_data = Chunk::value(vec![], r.as_bytes().to_vec());
        assert_ne!(with_ref.compute_ref(), as_data.compute_ref());
    }

    #[test]
    fn computed_ref_is_never_null() {
        assert!(!Chunk::blob(Vec::new()).compute_ref().is_null());
    }

    #[test]
    fn size_counts_refs_and_payload() {
        let chunk = Chunk::value(vec![Ref::of_bytes(b"x")], b"12345".to_vec());
        assert_eq!(chunk.size(), 37);
    }

    #[test]
    fn kind_display() {
        assert_eq!(ChunkKind::Blob.to_string(), "blob");
        assert_eq!(ChunkKind::Value.to_string(), "value");
        assert_eq!(ChunkKind::Commit.to_string(), "commit");
        assert_eq!(ChunkKind::Datasets.to_string(), "datasets");
    }
}
