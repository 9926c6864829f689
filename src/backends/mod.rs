//! Backends module - Source discovery and external integrations
//!
//! Provides:
//! - scan: Source tree discovery with the ignore crate
//! - openai: OpenAI-compatible chat completion backend
//! - doctor: Environment checking

pub mod doctor;
pub mod openai;
pub mod scan;
