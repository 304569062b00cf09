//! The [`DataStore`] snapshot facade.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info, warn};

use dstore_chunks::{Chunk, ChunkStore, ChunkTransport, RemoteChunkStore};
use dstore_types::Ref;
use dstore_walk::{CopyStats, WalkOptions};

use crate::commit::Commit;
use crate::datasets::{validate_dataset_id, DatasetMap};
use crate::error::{CommitFailure, DatasError, DatasResult};

/// Which kind of backend a [`DataStore`] was opened over.
///
/// Informational only; no operation behaves differently per flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flavor {
    Local,
    Remote,
}

/// An immutable snapshot of a chunk store at one root.
///
/// Reads see the datasets as of the snapshot, regardless of later commits
/// by anyone. [`commit`](Self::commit) returns a new snapshot and leaves
/// this one untouched.
#[derive(Clone)]
pub struct DataStore {
    store: Arc<dyn ChunkStore>,
    root: Ref,
    datasets: DatasetMap,
    flavor: Flavor,
}

impl DataStore {
    /// Open a local snapshot at the store's current root.
    pub fn new(store: Arc<dyn ChunkStore>) -> DatasResult<Self> {
        Self::open(store, Flavor::Local)
    }

    /// Open a snapshot over a transport-fronted store.
    pub fn remote<T: ChunkTransport + 'static>(store: RemoteChunkStore<T>) -> DatasResult<Self> {
        Self::open(Arc::new(store), Flavor::Remote)
    }

    fn open(store: Arc<dyn ChunkStore>, flavor: Flavor) -> DatasResult<Self> {
        let root = store.root()?;
        Self::at(store, root, flavor)
    }

    fn at(store: Arc<dyn ChunkStore>, root: Ref, flavor: Flavor) -> DatasResult<Self> {
        let datasets = if root.is_null() {
            DatasetMap::new()
        } else {
            let chunk = store.get_required(&root)?;
            DatasetMap::from_chunk(root, &chunk)?
        };
        debug!(root = %root.short_hex(), datasets = datasets.len(), ?flavor, "opened snapshot");
        Ok(Self {
            store,
            root,
            datasets,
            flavor,
        })
    }

    /// A new snapshot at the backend's current root.
    pub fn refresh(&self) -> DatasResult<Self> {
        Self::open(Arc::clone(&self.store), self.flavor)
    }

    /// The kind of backend this snapshot was opened over.
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// The root this snapshot was taken at; null for an empty store.
    pub fn root(&self) -> Ref {
        self.root
    }

    /// The backing chunk store, shared by every snapshot derived from this
    /// one. Pass it as the sink when copying into this store.
    pub fn chunk_store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    // ---------------------------------------------------------------
    // Chunk passthrough
    // ---------------------------------------------------------------

    /// Read a chunk from the backing store; `None` if it is absent.
    pub fn get(&self, id: &Ref) -> DatasResult<Option<Chunk>> {
        Ok(self.store.get(id)?)
    }

    /// Whether the backing store holds `id`.
    pub fn has(&self, id: &Ref) -> DatasResult<bool> {
        Ok(self.store.has(id)?)
    }

    /// Write a chunk. The caller writes children before parents.
    pub fn put(&self, chunk: &Chunk) -> DatasResult<Ref> {
        Ok(self.store.put(chunk)?)
    }

    // ---------------------------------------------------------------
    // Heads
    // ---------------------------------------------------------------

    /// Every dataset head as of this snapshot.
    pub fn datasets(&self) -> &DatasetMap {
        &self.datasets
    }

    /// The head commit ref of `dataset`, if it has one.
    pub fn head_ref(&self, dataset: &str) -> Option<Ref> {
        self.datasets.get(dataset)
    }

    /// The head of `dataset` and whether it exists.
    ///
    /// An absent dataset yields `(Commit::empty(), false)`.
    pub fn maybe_head(&self, dataset: &str) -> DatasResult<(Commit, bool)> {
        match self.datasets.get(dataset) {
            Some(head) => Ok((self.read_commit(head)?, true)),
            None => Ok((Commit::empty(), false)),
        }
    }

    /// The head of `dataset`; [`DatasError::NotFound`] if it has none.
    pub fn head(&self, dataset: &str) -> DatasResult<Commit> {
        match self.maybe_head(dataset)? {
            (commit, true) => Ok(commit),
            (_, false) => Err(DatasError::not_found(format!("dataset {dataset:?}"))),
        }
    }

    /// Commits of `dataset` breadth-first from the head, at most `limit`.
    pub fn history(&self, dataset: &str, limit: usize) -> DatasResult<Vec<(Ref, Commit)>> {
        let head = self
            .head_ref(dataset)
            .ok_or_else(|| DatasError::not_found(format!("dataset {dataset:?}")))?;
        let mut out = Vec::new();
        let mut seen = HashSet::from([head]);
        let mut queue = VecDeque::from([head]);
        while let Some(id) = queue.pop_front() {
            if out.len() >= limit {
                break;
            }
            let commit = self.read_commit(id)?;
            for parent in commit.parents() {
                if seen.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
            out.push((id, commit));
        }
        Ok(out)
    }

    fn read_commit(&self, id: Ref) -> DatasResult<Commit> {
        let chunk = self
            .store
            .get(&id)?
            .ok_or_else(|| DatasError::not_found(format!("commit {id}")))?;
        Commit::from_chunk(id, &chunk)
    }

    // ---------------------------------------------------------------
    // Commit
    // ---------------------------------------------------------------

    /// Make `value` the new head of `dataset`, with the current head as
    /// its parent.
    ///
    /// `value` and its closure must already be in the store. Fails with
    /// [`DatasError::Conflict`] if the head of `dataset` moved after this
    /// snapshot was taken; the failure carries the latest snapshot. Heads
    /// of other datasets committed in the meantime are kept.
    pub fn commit(&self, dataset: &str, value: Ref) -> Result<DataStore, CommitFailure> {
        self.commit_with_parents(dataset, value, [])
    }

    /// Like [`commit`](Self::commit), additionally recording
    /// `extra_parents` as parents. Each must be a stored commit.
    pub fn commit_with_parents(
        &self,
        dataset: &str,
        value: Ref,
        extra_parents: impl IntoIterator<Item = Ref>,
    ) -> Result<DataStore, CommitFailure> {
        self.try_commit(dataset, value, extra_parents)
            .map_err(|error| CommitFailure {
                error,
                latest: self.refresh().ok(),
            })
    }

    fn try_commit(
        &self,
        dataset: &str,
        value: Ref,
        extra_parents: impl IntoIterator<Item = Ref>,
    ) -> DatasResult<DataStore> {
        validate_dataset_id(dataset)?;
        if value.is_null() || !self.store.has(&value)? {
            return Err(DatasError::not_found(format!("value {value}")));
        }

        let mut parents: Vec<Ref> = self.head_ref(dataset).into_iter().collect();
        for parent in extra_parents {
            self.read_commit(parent)?;
            parents.push(parent);
        }
        let commit = Commit::new(value, parents);
        let commit_ref = self.store.put(&commit.to_chunk())?;

        let observed = self.head_ref(dataset);
        let mut base_root = self.root;
        let mut base = self.datasets.clone();
        loop {
            let datasets = base.insert(dataset, commit_ref);
            let new_root = self.store.put(&datasets.to_chunk()?)?;
            if self.store.update_root(new_root, base_root)? {
                info!(
                    dataset,
                    commit = %commit_ref.short_hex(),
                    root = %new_root.short_hex(),
                    "committed"
                );
                return Ok(DataStore {
                    store: Arc::clone(&self.store),
                    root: new_root,
                    datasets,
                    flavor: self.flavor,
                });
            }

            // The root moved. Only a new head for this dataset is a conflict.
            let current = self.refresh()?;
            if current.head_ref(dataset) != observed {
                warn!(
                    dataset,
                    snapshot = %self.root.short_hex(),
                    latest = %current.root.short_hex(),
                    "head moved since snapshot, commit rejected"
                );
                return Err(DatasError::Conflict {
                    dataset: dataset.to_string(),
                });
            }
            debug!(
                dataset,
                latest = %current.root.short_hex(),
                "other datasets moved, rebuilding root"
            );
            base_root = current.root;
            base = current.datasets;
        }
    }

    // ---------------------------------------------------------------
    // Synchronization
    // ---------------------------------------------------------------

    /// Copy from this store into `sink` everything reachable from `root`
    /// and not from `exclude`. The sink must already hold `exclude`'s
    /// closure.
    pub fn copy_reachable_excluding(
        &self,
        root: Ref,
        exclude: Ref,
        sink: &dyn ChunkStore,
        concurrency: usize,
    ) -> DatasResult<CopyStats> {
        let options = WalkOptions::new(concurrency);
        Ok(dstore_walk::copy_reachable_excluding(
            root,
            exclude,
            sink,
            self.store.as_ref(),
            &options,
        )?)
    }

    /// Copy from this store into `sink` everything reachable from `root`
    /// that the sink lacks.
    pub fn copy_missing(
        &self,
        root: Ref,
        sink: &dyn ChunkStore,
        concurrency: usize,
    ) -> DatasResult<CopyStats> {
        let options = WalkOptions::new(concurrency);
        Ok(dstore_walk::copy_missing(
            root,
            sink,
            self.store.as_ref(),
            &options,
        )?)
    }
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("root", &self.root)
            .field("flavor", &self.flavor)
            .field("datasets", &self.datasets.len())
            .finish()
    }
}
