//! Caching for weather snapshots
//!
//! `snapshots` holds the in-memory keyed cache that is the single source of
//! truth for reconciled weather state; `store` persists JSON records to an
//! XDG cache directory so stale data survives restarts.

pub mod snapshots;
pub mod store;

pub use snapshots::SnapshotCache;
pub use store::{DiskStore, StoredRecord};
