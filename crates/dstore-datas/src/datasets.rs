use std::collections::BTreeMap;

use dstore_chunks::{Chunk, ChunkKind};
use dstore_types::Ref;

use crate::error::{DatasError, DatasResult};

/// Check that `id` can name a dataset.
///
/// Names must be non-empty, free of control characters, and carry no
/// leading or trailing whitespace.
pub fn validate_dataset_id(id: &str) -> DatasResult<()> {
    let invalid = |reason: &str| {
        Err(DatasError::InvalidDatasetId {
            id: id.to_string(),
            reason: reason.to_string(),
        })
    };
    if id.is_empty() {
        return invalid("empty");
    }
    if id.chars().any(char::is_control) {
        return invalid("contains control characters");
    }
    if id.trim() != id {
        return invalid("leading or trailing whitespace");
    }
    Ok(())
}

/// Dataset name to head commit, the value a store's root points at.
///
/// Stored as a [`ChunkKind::Datasets`] chunk: refs are the heads in name
/// order, payload is the JSON array of names in the same order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetMap {
    heads: BTreeMap<String, Ref>,
}

impl DatasetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dataset: &str) -> Option<Ref> {
        self.heads.get(dataset).copied()
    }

    /// A copy of this map with `dataset` pointing at `head`.
    pub fn insert(&self, dataset: impl Into<String>, head: Ref) -> Self {
        let mut heads = self.heads.clone();
        heads.insert(dataset.into(), head);
        Self { heads }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Ref)> {
        self.heads.iter().map(|(name, head)| (name.as_str(), *head))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.heads.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    pub fn to_chunk(&self) -> DatasResult<Chunk> {
        let names: Vec<&str> = self.names().collect();
        let data =
            serde_json::to_vec(&names).map_err(|e| DatasError::Serialization(e.to_string()))?;
        Ok(Chunk::new(
            ChunkKind::Datasets,
            self.heads.values().copied().collect(),
            data,
        ))
    }

    /// Decode the map stored at `id`.
    pub fn from_chunk(id: Ref, chunk: &Chunk) -> DatasResult<Self> {
        let corrupt = |reason: String| DatasError::Corrupt { id, reason };
        if chunk.kind() != ChunkKind::Datasets {
            return Err(corrupt(format!("expected datasets, found {}", chunk.kind())));
        }
        let names: Vec<String> = serde_json::from_slice(chunk.data())
            .map_err(|e| corrupt(format!("dataset names: {e}")))?;
        if names.len() != chunk.refs().len() {
            return Err(corrupt(format!(
                "{} names for {} heads",
                names.len(),
                chunk.refs().len()
            )));
        }
        if !names.windows(2).all(|w| w[0] < w[1]) {
            return Err(corrupt("dataset names are not strictly ordered".into()));
        }
        Ok(Self {
            heads: names.into_iter().zip(chunk.refs().iter().copied()).collect(),
        })
    }
}
