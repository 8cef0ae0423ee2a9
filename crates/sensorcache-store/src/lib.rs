//! Sensorcache Store - the content cache data model
//!
//! [`CacheStore`] is a snapshot of the observation database's metadata.
//! Relations between entities are kept as symmetric two-way indices
//! ([`Relation`]) so lookups work in both directions.

pub mod relation;
pub mod store;
pub mod summary;

pub use relation::{IdSet, Relation};
pub use store::CacheStore;
pub use summary::CacheSummary;
