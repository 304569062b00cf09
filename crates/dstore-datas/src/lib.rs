//! Versioned datasets over a content-addressed chunk store.
//!
//! A [`DataStore`] is an immutable snapshot: a chunk store paired with one
//! root [`Ref`](dstore_types::Ref). The root addresses a [`DatasetMap`]
//! naming the head [`Commit`] of every dataset. Committing writes a new
//! commit and a new map, then advances the store's root by compare-and-swap.
//! If the dataset's head moved since the snapshot, the commit fails with
//! [`DatasError::Conflict`] together with the latest snapshot, and the
//! caller decides whether to retry. Moves of other datasets are kept.
//!
//! # Key Types
//!
//! - [`DataStore`] -- snapshot facade, local or remote flavor
//! - [`Commit`] -- value root plus parent commits
//! - [`DatasetMap`] -- dataset name to head commit
//! - [`DataStoreConfig`] -- TOML configuration

pub mod commit;
pub mod config;
pub mod datasets;
pub mod datastore;
pub mod error;

pub use commit::Commit;
pub use config::{ConfigError, DataStoreConfig, StoreSection, SyncSection};
pub use datasets::{validate_dataset_id, DatasetMap};
pub use datastore::{DataStore, Flavor};
pub use error::{CommitFailure, DatasError, DatasResult};
