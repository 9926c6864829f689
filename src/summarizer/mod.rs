//! Summarizer - turns text into summaries through an external backend
//!
//! [`SummaryBackend`] is the single seam to the outside world: one prompt in,
//! one completion out. [`Summarizer`] layers the map-reduce strategy for
//! oversized input on top of it and counts every call it makes.

pub mod prompts;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::analyzer::FileFacts;
use crate::core::tokenizer::{chunk_text, count_tokens, TokenModel};
use crate::error::SummarizerError;

/// One opaque completion call
pub trait SummaryBackend: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, SummarizerError>;
}

impl<T: SummaryBackend + ?Sized> SummaryBackend for &T {
    fn complete(&self, prompt: &str) -> Result<String, SummarizerError> {
        (**self).complete(prompt)
    }
}

impl<T: SummaryBackend + ?Sized> SummaryBackend for Box<T> {
    fn complete(&self, prompt: &str) -> Result<String, SummarizerError> {
        (**self).complete(prompt)
    }
}

impl<T: SummaryBackend + ?Sized> SummaryBackend for Arc<T> {
    fn complete(&self, prompt: &str) -> Result<String, SummarizerError> {
        (**self).complete(prompt)
    }
}

pub struct Summarizer<B> {
    backend: B,
    chunk_tokens: usize,
    token_model: TokenModel,
    calls: AtomicUsize,
}

impl<B: SummaryBackend> Summarizer<B> {
    pub fn new(backend: B, chunk_tokens: usize, token_model: TokenModel) -> Self {
        Self {
            backend,
            chunk_tokens: chunk_tokens.max(1),
            token_model,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Backend calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Summarize `text`, chunking when it exceeds the token threshold.
    ///
    /// Any failed call fails the whole summary.
    pub fn summarize(&self, text: &str, label: &str) -> Result<String, SummarizerError> {
        if self.fits(text) {
            self.call(&prompts::single(label, text))
        } else {
            self.map_reduce(text, label)
        }
    }

    /// Summarize a file from its extracted facts
    pub fn summarize_facts(&self, path: &str, facts: &FileFacts) -> Result<String, SummarizerError> {
        let prompt = prompts::facts(path, facts);
        if self.fits(&prompt) {
            self.call(&prompt)
        } else {
            self.map_reduce(&prompt, prompts::FACTS_LABEL)
        }
    }

    fn fits(&self, text: &str) -> bool {
        count_tokens(text, self.token_model) <= self.chunk_tokens
    }

    fn map_reduce(&self, text: &str, label: &str) -> Result<String, SummarizerError> {
        let mut partials = Vec::new();
        for (index, chunk) in chunk_text(text, self.chunk_tokens, self.token_model).enumerate() {
            partials.push(self.call(&prompts::chunk(index, label, &chunk))?);
        }
        debug!(label, chunks = partials.len(), "reducing chunk summaries");
        self.call(&prompts::reduce(&partials))
    }

    fn call(&self, prompt: &str) -> Result<String, SummarizerError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.backend.complete(prompt)
    }
}
