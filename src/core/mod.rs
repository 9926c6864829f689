//! Core module - Contains the fundamental data structures and utilities
//!
//! This module provides:
//! - Unified result model (ResultItem)
//! - Rendering functions for different output formats
//! - Path normalization and entity keys
//! - Content digests
//! - File decoding
//! - Token counting and chunking for LLM context budgeting

pub mod file_reader;
pub mod hash;
pub mod model;
pub mod paths;
pub mod render;
pub mod tokenizer;
