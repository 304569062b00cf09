//! Closure walks and store-to-store copies.
//!
//! Copies share one visited table, a [`DashMap`] keyed by [`Ref`]. Claiming a
//! ref is a single `entry` call, so two workers that discover the same ref
//! through different parents never both fetch it. A claimed node holds its
//! chunk and a count of children still in flight; whoever completes the last
//! child writes the chunk to the sink and notifies the node's waiters.
//!
//! # Invariants
//!
//! - No ref is fetched or written more than once per walk.
//! - A chunk is written only after all of its children are written or pruned.
//! - A pruned ref's children are never visited.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tracing::{debug, warn};

use dstore_chunks::{Chunk, ChunkStore};
use dstore_types::Ref;

use crate::error::WalkResult;
use crate::options::{CopyStats, WalkOptions};
use crate::pool::{self, Frontier};

/// The set of refs reachable from `root` in `source`, `root` included.
///
/// The null ref has an empty closure. A missing chunk fails the walk with
/// [`ChunkError::NotFound`](dstore_chunks::ChunkError::NotFound).
pub fn reachable(
    root: Ref,
    source: &dyn ChunkStore,
    options: &WalkOptions,
) -> WalkResult<HashSet<Ref>> {
    if root.is_null() {
        return Ok(HashSet::new());
    }
    let visited: DashSet<Ref> = DashSet::new();
    pool::run(
        options.workers(),
        vec![root],
        &options.cancel,
        |id, frontier| {
            if !visited.insert(id) {
                return Ok(());
            }
            let chunk = source.get_required(&id)?;
            for child in chunk.refs().iter().filter(|r| !r.is_null()) {
                frontier.push(*child);
            }
            Ok(())
        },
    )?;
    debug!(root = %root.short_hex(), count = visited.len(), "computed closure");
    Ok(visited.into_iter().collect())
}

/// Copy every chunk reachable from `root` but not from `exclude` out of
/// `source` into `sink`.
///
/// The closure of `exclude` is computed in full first, reading from
/// `source`; the caller asserts the sink already holds it. A null `exclude`
/// excludes nothing.
pub fn copy_reachable_excluding(
    root: Ref,
    exclude: Ref,
    sink: &dyn ChunkStore,
    source: &dyn ChunkStore,
    options: &WalkOptions,
) -> WalkResult<CopyStats> {
    let excluded = reachable(exclude, source, options)?;
    let walk = CopyWalk::new(sink, source, Prune::Excluded(&excluded));
    walk.run(root, options)
}

/// Copy every chunk reachable from `root` in `source` that `sink` lacks.
///
/// A ref the sink already has is treated as the root of a complete subtree:
/// it is not fetched from `source` and its children are not visited.
pub fn copy_missing(
    root: Ref,
    sink: &dyn ChunkStore,
    source: &dyn ChunkStore,
    options: &WalkOptions,
) -> WalkResult<CopyStats> {
    let walk = CopyWalk::new(sink, source, Prune::InSink);
    walk.run(root, options)
}

enum Prune<'a> {
    Excluded(&'a HashSet<Ref>),
    InSink,
}

/// One work item: visit `id`, reached from `parent`.
struct Visit {
    id: Ref,
    parent: Option<Ref>,
}

struct Node {
    /// Held between fetch and write.
    chunk: Option<Chunk>,
    /// Children not yet written, plus one while the node is being expanded.
    outstanding: usize,
    /// Parents to notify once this node is written or pruned.
    waiters: Vec<Ref>,
    done: bool,
}

enum Claim {
    Fresh,
    Done,
    Waiting,
}

struct CopyWalk<'a> {
    sink: &'a dyn ChunkStore,
    source: &'a dyn ChunkStore,
    prune: Prune<'a>,
    nodes: DashMap<Ref, Node>,
    visited: AtomicU64,
    copied: AtomicU64,
    pruned: AtomicU64,
    bytes_copied: AtomicU64,
}

impl<'a> CopyWalk<'a> {
    fn new(sink: &'a dyn ChunkStore, source: &'a dyn ChunkStore, prune: Prune<'a>) -> Self {
        Self {
            sink,
            source,
            prune,
            nodes: DashMap::new(),
            visited: AtomicU64::new(0),
            copied: AtomicU64::new(0),
            pruned: AtomicU64::new(0),
            bytes_copied: AtomicU64::new(0),
        }
    }

    fn run(&self, root: Ref, options: &WalkOptions) -> WalkResult<CopyStats> {
        if root.is_null() {
            return Ok(CopyStats::default());
        }
        let seed = Visit {
            id: root,
            parent: None,
        };
        let result = pool::run(
            options.workers(),
            vec![seed],
            &options.cancel,
            |visit, frontier| self.visit(visit, frontier),
        );
        let stats = self.stats();
        match result {
            Ok(()) => {
                debug!(
                    root = %root.short_hex(),
                    visited = stats.visited,
                    copied = stats.copied,
                    pruned = stats.pruned,
                    bytes = stats.bytes_copied,
                    "copy complete"
                );
                Ok(stats)
            }
            Err(err) => {
                warn!(
                    root = %root.short_hex(),
                    copied = stats.copied,
                    error = %err,
                    "copy aborted"
                );
                Err(err)
            }
        }
    }

    fn stats(&self) -> CopyStats {
        CopyStats {
            visited: self.visited.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
        }
    }

    fn claim(&self, visit: &Visit) -> Claim {
        match self.nodes.entry(visit.id) {
            Entry::Occupied(mut entry) => {
                let node = entry.get_mut();
                if node.done {
                    Claim::Done
                } else {
                    node.waiters.extend(visit.parent);
                    Claim::Waiting
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Node {
                    chunk: None,
                    outstanding: 0,
                    waiters: visit.parent.into_iter().collect(),
                    done: false,
                });
                Claim::Fresh
            }
        }
    }

    fn should_prune(&self, id: &Ref) -> WalkResult<bool> {
        Ok(match self.prune {
            Prune::Excluded(excluded) => excluded.contains(id),
            Prune::InSink => self.sink.has(id)?,
        })
    }

    fn visit(&self, visit: Visit, frontier: &Frontier<'_, Visit>) -> WalkResult<()> {
        match self.claim(&visit) {
            Claim::Waiting => return Ok(()),
            Claim::Done => {
                return match visit.parent {
                    Some(parent) => self.complete(parent),
                    None => Ok(()),
                };
            }
            Claim::Fresh => {}
        }
        self.visited.fetch_add(1, Ordering::Relaxed);
        let id = visit.id;

        if self.should_prune(&id)? {
            self.pruned.fetch_add(1, Ordering::Relaxed);
            let waiters = self.mark_done(&id);
            return self.complete_all(waiters);
        }

        let chunk = self.source.get_required(&id)?;
        let children: Vec<Ref> = chunk
            .refs()
            .iter()
            .copied()
            .filter(|r| !r.is_null())
            .collect();
        if let Some(mut node) = self.nodes.get_mut(&id) {
            node.outstanding = children.len() + 1;
            node.chunk = Some(chunk);
        }
        for child in children {
            frontier.push(Visit {
                id: child,
                parent: Some(id),
            });
        }
        // Release the expansion guard.
        self.complete(id)
    }

    /// Record one finished child of `parent`, writing every node that
    /// becomes ready as a result.
    fn complete(&self, parent: Ref) -> WalkResult<()> {
        let mut stack = vec![parent];
        while let Some(id) = stack.pop() {
            let ready = match self.nodes.get_mut(&id) {
                Some(mut node) => {
                    node.outstanding -= 1;
                    if node.outstanding == 0 {
                        node.chunk.take()
                    } else {
                        None
                    }
                }
                None => None,
            };
            if let Some(chunk) = ready {
                self.sink.put(&chunk)?;
                self.copied.fetch_add(1, Ordering::Relaxed);
                self.bytes_copied.fetch_add(chunk.size(), Ordering::Relaxed);
                stack.extend(self.mark_done(&id));
            }
        }
        Ok(())
    }

    fn complete_all(&self, parents: Vec<Ref>) -> WalkResult<()> {
        for parent in parents {
            self.complete(parent)?;
        }
        Ok(())
    }

    fn mark_done(&self, id: &Ref) -> Vec<Ref> {
        match self.nodes.get_mut(id) {
            Some(mut node) => {
                node.done = true;
                std::mem::take(&mut node.waiters)
            }
            None => Vec::new(),
        }
    }
}
