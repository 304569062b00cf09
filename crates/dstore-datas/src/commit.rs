use std::collections::BTreeSet;

use dstore_chunks::{Chunk, ChunkKind};
use dstore_types::Ref;

use crate::error::{DatasError, DatasResult};

/// A commit: the root of a value plus the commits it descends from.
///
/// Stored as a [`ChunkKind::Commit`] chunk whose refs are the value followed
/// by the parents in ascending order, with an empty payload. Because the
/// parents are refs, walking a commit's closure walks its whole history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Commit {
    value: Ref,
    parents: BTreeSet<Ref>,
}

impl Commit {
    pub fn new(value: Ref, parents: impl IntoIterator<Item = Ref>) -> Self {
        Self {
            value,
            parents: parents.into_iter().filter(|p| !p.is_null()).collect(),
        }
    }

    /// Placeholder returned for a dataset with no head. Never written.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_null() && self.parents.is_empty()
    }

    /// `true` for the first commit of a history.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn value(&self) -> Ref {
        self.value
    }

    pub fn parents(&self) -> &BTreeSet<Ref> {
        &self.parents
    }

    pub fn to_chunk(&self) -> Chunk {
        let mut refs = Vec::with_capacity(1 + self.parents.len());
        refs.push(self.value);
        refs.extend(self.parents.iter().copied());
        Chunk::new(ChunkKind::Commit, refs, Vec::new())
    }

    /// The ref this commit is stored under.
    pub fn id(&self) -> Ref {
        self.to_chunk().compute_ref()
    }

    /// Decode the commit stored at `id`.
    pub fn from_chunk(id: Ref, chunk: &Chunk) -> DatasResult<Self> {
        let corrupt = |reason: &str| DatasError::Corrupt {
            id,
            reason: reason.to_string(),
        };
        if chunk.kind() != ChunkKind::Commit {
            return Err(corrupt(&format!("expected commit, found {}", chunk.kind())));
        }
        let (value, parents) = chunk
            .refs()
            .split_first()
            .ok_or_else(|| corrupt("commit has no value ref"))?;
        if value.is_null() {
            return Err(corrupt("commit value is the null ref"));
        }
        if !parents.windows(2).all(|w| w[0] < w[1]) {
            return Err(corrupt("commit parents are not strictly ordered"));
        }
        if !chunk.data().is_empty() {
            return Err(corrupt("commit carries a payload"));
        }
        Ok(Self {
            value: *value,
            parents: parents.iter().copied().collect(),
        })
    }
}
