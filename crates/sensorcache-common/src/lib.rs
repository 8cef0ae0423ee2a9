//! Sensorcache Common - Shared types and utilities
//!
//! This crate provides the value types, error definitions and configuration
//! structures used by the content cache store, its controller and the admin
//! binary.

pub mod config;
pub mod error;
pub mod types;

pub use config::{CacheConfig, LoggingConfig};
pub use error::{Error, Result};
pub use types::*;
