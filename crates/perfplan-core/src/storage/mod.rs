//! # Persistent Storage
//!
//! Disk-backed implementations of [`crate::store::ReviewStore`].

mod redb_store;

pub use redb_store::RedbStore;
