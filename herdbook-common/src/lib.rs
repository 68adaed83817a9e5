//! # Herdbook Common Library
//!
//! Shared code for the Herdbook breeding-management services including:
//! - Common error types
//! - SQLite pool initialization and schema creation
//! - Configuration resolution (CLI > env > TOML > default)
//! - UUID column helpers

pub mod config;
pub mod db;
pub mod error;
pub mod uuid_utils;

pub use error::{Error, Result};
