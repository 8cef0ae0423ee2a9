//! Sensorcache Ctrl - keeps the content cache in sync with the data source
//!
//! This crate provides:
//! - [`UpdateAction`]: incremental, parallel and complete cache updates
//! - [`CacheController`]: single-writer gate, lock-free reads and the
//!   periodic complete update scheduler
//! - The four-phase complete update pipeline ([`complete`])
//! - Incremental actions fired by transactional requests ([`actions`])
//! - The external interfaces the cache consumes ([`gateway`], [`persistence`])

pub mod action;
pub mod actions;
pub mod complete;
pub mod controller;
pub mod gateway;
pub mod persistence;

pub use action::{
    CacheUpdate, CompleteCacheUpdate, CompleteCacheUpdateFactory, ParallelUpdate, UpdateAction,
    WritableCache,
};
pub use controller::{CacheController, ControllerStats};
pub use gateway::DataSourceGateway;
pub use gateway::memory::InMemoryGateway;
pub use persistence::{CachePersistenceStrategy, JsonFilePersistence, NoOpPersistence};
