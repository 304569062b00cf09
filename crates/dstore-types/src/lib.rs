//! Foundation types for dstore.
//!
//! Every chunk in a dstore is addressed by a [`Ref`]: the BLAKE3 digest of
//! its canonical encoding. All other dstore crates depend on this one.

pub mod error;
pub mod reference;

pub use error::TypeError;
pub use reference::Ref;
