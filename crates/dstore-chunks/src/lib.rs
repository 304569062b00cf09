//! Content-addressed chunk storage for dstore.
//!
//! A chunk is an immutable `{ kind, refs, data }` record addressed by the
//! domain-separated hash of its content. The `refs` are the chunk's outgoing
//! edges; following them from a root yields the Merkle DAG of a value.
//!
//! # Capability
//!
//! Everything above this crate talks to storage only through the
//! [`ChunkStore`] trait: `get`, `has`, `put`, plus a single root pointer
//! advanced by compare-and-swap ([`ChunkStore::update_root`]).
//!
//! # Backends
//!
//! - [`MemoryChunkStore`] -- `HashMap`-based store for tests and embedding
//! - [`RemoteChunkStore`] -- forwards every call over a [`ChunkTransport`]
//!
//! # Design Rules
//!
//! 1. Chunks are immutable once written (content-addressing guarantees this).
//! 2. A chunk is only written after every chunk it references is present.
//! 3. `update_root` is the only operation that must be atomic.
//! 4. The store never interprets chunk payloads.
//! 5. All backend errors are propagated, never silently ignored.

pub mod chunk;
pub mod codec;
pub mod error;
pub mod memory;
pub mod remote;
pub mod traits;

pub use chunk::{Chunk, ChunkKind};
pub use codec::{ChunkCodec, ChunkMessage, MAX_FRAME_SIZE};
pub use error::{ChunkError, ChunkResult, CodecError};
pub use memory::MemoryChunkStore;
pub use remote::{ChunkServer, ChunkTransport, LoopbackTransport, RemoteChunkStore};
pub use traits::ChunkStore;
