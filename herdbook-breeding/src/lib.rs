//! # Herdbook Breeding Service
//!
//! Offspring lifecycle and breeding-group linkage for the Herdbook
//! platform. The domain core is:
//! - the offspring state normalizer (five coupled status dimensions),
//! - the per-group aggregate summarizer,
//! - the transactional group-to-plan linkage workflow with its
//!   append-only audit event log,
//! - the plan suggestion scorer for orphan groups.
//!
//! HTTP handlers in [`api`] are a thin surface over those operations.

pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod groups;
pub mod offspring;
pub mod server;

pub use error::{Error, Result};
