use dstore_types::Ref;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"dstore-commit-v1"`) that is
/// prepended to every hash computation, followed by a `:` separator.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for opaque leaf blobs.
    pub const BLOB: Self = Self {
        domain: "dstore-blob-v1",
    };
    /// Hasher for interior value chunks.
    pub const VALUE: Self = Self {
        domain: "dstore-value-v1",
    };
    /// Hasher for commit chunks.
    pub const COMMIT: Self = Self {
        domain: "dstore-commit-v1",
    };
    /// Hasher for the dataset root mapping.
    pub const DATASETS: Self = Self {
        domain: "dstore-datasets-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Ref {
        self.hash_parts([data])
    }

    /// Hash a sequence of byte slices as if they were concatenated.
    pub fn hash_parts<'a, I>(&self, parts: I) -> Ref
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(part);
        }
        Ref::from_hash(*hasher.finalize().as_bytes())
    }

}
