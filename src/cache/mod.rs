//! Cache module - Persisted summaries under .tierdoc/
//!
//! Provides:
//! - Record types for files, directories and the codebase
//! - A locked store with per-entity or end-of-run persistence

pub mod record;
pub mod store;
