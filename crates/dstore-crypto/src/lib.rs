//! Content hashing for dstore.
//!
//! Chunk addresses are domain-separated BLAKE3 digests, so a commit and a
//! blob with identical bytes never share a [`Ref`](dstore_types::Ref).
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
