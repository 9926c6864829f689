//! tierdoc - Incremental, hierarchical summaries of a source tree
//!
//! tierdoc provides:
//! - File, directory and codebase summaries produced bottom-up
//! - A digest-keyed cache so unchanged entities are never re-summarized
//! - Structural facts for Python and Rust files via tree-sitter
//! - Token-aware map-reduce for oversized inputs
//! - Unified output format (jsonl/json/md/raw)

pub mod analyzer;
pub mod backends;
pub mod cache;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod summarizer;

pub use config::{BackendConfig, Config};
pub use engine::{DocumentationEngine, RunReport};
pub use error::{DocError, DocResult, SummarizerError};
pub use summarizer::{Summarizer, SummaryBackend};
