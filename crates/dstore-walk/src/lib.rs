//! DAG reachability engine for dstore.
//!
//! Moves the closure of a root [`Ref`](dstore_types::Ref) from one
//! [`ChunkStore`](dstore_chunks::ChunkStore) to another without sending what
//! the destination already has:
//!
//! - [`copy_reachable_excluding`] -- copy everything reachable from `root`
//!   that is not reachable from `exclude`
//! - [`copy_missing`] -- copy everything reachable from `root` that the sink
//!   does not hold, pruning whole subtrees on the first hit
//! - [`reachable`] -- the closure of a root, read-only
//!
//! All three run on a bounded pool of scoped worker threads sharing one
//! frontier. A chunk is written to the sink only after every chunk it
//! references has been written, so the sink is closure-complete at every
//! instant, including after a failed or cancelled walk.

pub mod engine;
pub mod error;
pub mod options;
mod pool;

pub use engine::{copy_missing, copy_reachable_excluding, reachable};
pub use error::{WalkError, WalkResult};
pub use options::{CancelToken, CopyStats, WalkOptions, DEFAULT_CONCURRENCY};
