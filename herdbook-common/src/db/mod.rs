//! Database access layer
//!
//! Pool initialization and idempotent schema creation. Query modules live
//! in the service crates; this module only owns the shared schema.

pub mod init;

pub use init::{create_schema, init_database};
