//! Token counting and token-bounded chunking for context-limited summarizers
//!
//! Counting uses tiktoken (cl100k_base by default) with a fast heuristic
//! fallback. Chunking always works on real BPE tokens so that each chunk is
//! guaranteed to fit the summarizer's context budget.
//!
//! Usage:
//! ```rust
//! use tierdoc::core::tokenizer::{chunk_text, count_tokens, TokenModel};
//!
//! let tokens = count_tokens("Hello world", TokenModel::default());
//! assert!(tokens > 0);
//!
//! let chunks: Vec<String> = chunk_text("Hello world", 1, TokenModel::default()).collect();
//! assert_eq!(chunks.concat(), "Hello world");
//! ```

use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};

/// Supported token models/encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenModel {
    /// cl100k_base encoding (GPT-4, GPT-3.5-turbo, Claude 3)
    #[default]
    Cl100k,
    /// o200k_base encoding (GPT-4o native)
    O200k,
    /// Fast heuristic estimation (no BPE encoding)
    Heuristic,
}

impl TokenModel {
    /// BPE used for counting. `None` means the heuristic estimator.
    fn counting_bpe(&self) -> Option<&'static CoreBPE> {
        match self {
            TokenModel::O200k => O200K_BPE.as_ref().ok(),
            TokenModel::Cl100k => CL100K_BPE.as_ref().ok(),
            TokenModel::Heuristic => None,
        }
    }

    /// BPE used for chunking. The heuristic model has no token boundaries
    /// of its own, so it borrows cl100k_base.
    fn chunking_bpe(&self) -> Option<&'static CoreBPE> {
        match self {
            TokenModel::O200k => O200K_BPE.as_ref().ok(),
            TokenModel::Cl100k | TokenModel::Heuristic => CL100K_BPE.as_ref().ok(),
        }
    }

    /// List all available models
    pub fn available_models() -> &'static [&'static str] {
        &["cl100k", "o200k", "heuristic"]
    }
}

impl fmt::Display for TokenModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenModel::Cl100k => "cl100k",
            TokenModel::O200k => "o200k",
            TokenModel::Heuristic => "heuristic",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for TokenModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cl100k" | "cl100k_base" | "default" | "gpt4" | "gpt-4" | "claude" => {
                Ok(TokenModel::Cl100k)
            }
            "o200k" | "o200k_base" | "gpt4o" | "gpt-4o" => Ok(TokenModel::O200k),
            "heuristic" | "fast" | "estimate" => Ok(TokenModel::Heuristic),
            _ => Err(format!(
                "Unknown tokenizer: {}. Available: {}",
                s,
                TokenModel::available_models().join(", ")
            )),
        }
    }
}

// Lazy-initialized BPE encodings (loaded once on first use)
static CL100K_BPE: Lazy<Result<CoreBPE, String>> =
    Lazy::new(|| cl100k_base().map_err(|e| format!("Failed to load cl100k_base: {}", e)));

static O200K_BPE: Lazy<Result<CoreBPE, String>> =
    Lazy::new(|| o200k_base().map_err(|e| format!("Failed to load o200k_base: {}", e)));

/// Check if a tiktoken encoding can be loaded
///
/// Returns (available, error_message)
pub fn check_tiktoken_model(model: TokenModel) -> (bool, Option<String>) {
    let loaded = match model {
        TokenModel::Heuristic => return (true, None),
        TokenModel::O200k => &*O200K_BPE,
        TokenModel::Cl100k => &*CL100K_BPE,
    };
    match loaded {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.clone())),
    }
}

/// Count tokens in text using the specified model
pub fn count_tokens(text: &str, model: TokenModel) -> usize {
    if text.is_empty() {
        return 0;
    }

    match model.counting_bpe() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => estimate_tokens_heuristic(text),
    }
}

/// Estimate tokens using a fast heuristic (no BPE encoding)
///
/// - ASCII text: ~4 characters per token
/// - Code symbols: ~2 characters per token
/// - CJK characters: ~1.5 characters per token
/// - Other Unicode: ~2 characters per token
pub fn estimate_tokens_heuristic(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let mut ascii_chars = 0usize;
    let mut cjk_chars = 0usize;
    let mut other_unicode = 0usize;
    let mut whitespace = 0usize;
    let mut code_symbols = 0usize;

    for c in text.chars() {
        if c.is_ascii_whitespace() {
            whitespace += 1;
        } else if c.is_ascii() {
            if c.is_ascii_punctuation() {
                code_symbols += 1;
            } else {
                ascii_chars += 1;
            }
        } else if is_cjk_char(c) {
            cjk_chars += 1;
        } else {
            other_unicode += 1;
        }
    }

    let ascii_tokens = (ascii_chars + whitespace).div_ceil(4);
    let symbol_tokens = code_symbols.div_ceil(2);
    let cjk_tokens = (cjk_chars * 2).div_ceil(3);
    let other_tokens = other_unicode.div_ceil(2);

    ascii_tokens + symbol_tokens + cjk_tokens + other_tokens
}

/// Check if a character is CJK (Chinese/Japanese/Korean)
#[inline]
fn is_cjk_char(c: char) -> bool {
    let cp = c as u32;
    (0x4E00..=0x9FFF).contains(&cp)      // CJK Unified Ideographs
        || (0x3400..=0x4DBF).contains(&cp)  // CJK Extension A
        || (0x3000..=0x303F).contains(&cp)  // CJK Symbols and Punctuation
        || (0x3040..=0x309F).contains(&cp)  // Hiragana
        || (0x30A0..=0x30FF).contains(&cp)  // Katakana
        || (0xAC00..=0xD7AF).contains(&cp)  // Hangul Syllables
        || (0xFF00..=0xFFEF).contains(&cp) // Fullwidth Forms
}

/// Lazy sequence of token-bounded text chunks.
///
/// Produced by [`chunk_text`]. Cloning restarts nothing: each clone continues
/// from where the original stood, and calling [`chunk_text`] again with the
/// same arguments reproduces the same chunks from the beginning.
#[derive(Clone)]
pub struct TokenChunks {
    inner: ChunkSource,
    emitted_any: bool,
}

#[derive(Clone)]
enum ChunkSource {
    Bpe {
        bpe: &'static CoreBPE,
        tokens: Arc<Vec<u32>>,
        pos: usize,
        max_tokens: usize,
    },
    /// Fallback when no BPE could be loaded: char-bounded slices
    Chars {
        text: Arc<str>,
        pos: usize,
        max_chars: usize,
    },
}

/// Split `text` into chunks of at most `max_tokens` tokens each.
///
/// Chunks follow token boundaries and never split a UTF-8 character, so
/// concatenating them reproduces `text` exactly. Text at or under the limit
/// (including the empty string) yields exactly one chunk.
pub fn chunk_text(text: &str, max_tokens: usize, model: TokenModel) -> TokenChunks {
    let max_tokens = max_tokens.max(1);
    let inner = match model.chunking_bpe() {
        Some(bpe) => ChunkSource::Bpe {
            bpe,
            tokens: Arc::new(bpe.encode_with_special_tokens(text)),
            pos: 0,
            max_tokens,
        },
        None => ChunkSource::Chars {
            text: Arc::from(text),
            pos: 0,
            max_chars: max_tokens,
        },
    };
    TokenChunks {
        inner,
        emitted_any: false,
    }
}

impl Iterator for TokenChunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let chunk = match &mut self.inner {
            ChunkSource::Bpe {
                bpe,
                tokens,
                pos,
                max_tokens,
            } => next_bpe_chunk(bpe, tokens, pos, *max_tokens),
            ChunkSource::Chars {
                text,
                pos,
                max_chars,
            } => next_char_chunk(text, pos, *max_chars),
        };

        match chunk {
            Some(c) => {
                self.emitted_any = true;
                Some(c)
            }
            // Empty input still yields a single (empty) chunk
            None if !self.emitted_any => {
                self.emitted_any = true;
                Some(String::new())
            }
            None => None,
        }
    }
}

fn next_bpe_chunk(
    bpe: &CoreBPE,
    tokens: &[u32],
    pos: &mut usize,
    max_tokens: usize,
) -> Option<String> {
    if *pos >= tokens.len() {
        return None;
    }

    let start = *pos;
    let limit = (start + max_tokens).min(tokens.len());

    // Shrink until the slice ends on a character boundary
    let mut end = limit;
    while end > start + 1 {
        if let Ok(text) = bpe.decode(tokens[start..end].to_vec()) {
            *pos = end;
            return Some(text);
        }
        end -= 1;
    }

    // A single token holding a partial character: grow until it completes.
    // Only reachable with tiny limits; the bound is exceeded by as few tokens
    // as the encoding allows.
    let mut end = start + 1;
    while end <= tokens.len() {
        if let Ok(text) = bpe.decode(tokens[start..end].to_vec()) {
            *pos = end;
            return Some(text);
        }
        end += 1;
    }

    // Undecodable tail; give up on the rest rather than loop forever
    *pos = tokens.len();
    None
}

fn next_char_chunk(text: &str, pos: &mut usize, max_chars: usize) -> Option<String> {
    if *pos >= text.len() {
        return None;
    }
    let rest = &text[*pos..];
    let end = rest
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    *pos += end;
    Some(rest[..end].to_string())
}
