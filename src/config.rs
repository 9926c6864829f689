//! Run configuration
//!
//! The CLI folds its flags and environment variables into a [`Config`];
//! library users build one with [`Config::new`] and adjust fields directly.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::store::PersistPolicy;
use crate::core::paths::{default_cache_path, default_output_path, STATE_DIR};
use crate::core::tokenizer::TokenModel;
use crate::error::{DocError, DocResult};

/// Token threshold above which text is summarized chunk by chunk
pub const DEFAULT_CHUNK_TOKENS: usize = 32_000;

/// Default request timeout for summarizer calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_MODEL: &str = "gpt-4o";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_TEMPERATURE: f64 = 0.7;

pub const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are an expert in generating complete and concise documentation of code.";

/// Directory names never descended into
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".venv",
    "venv",
    "node_modules",
    "__pycache__",
    ".git",
    ".idea",
    ".vscode",
    ".pytest_cache",
    "target",
    STATE_DIR,
];

/// Settings for the remote summarizer
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub system_message: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Everything a documentation run needs to know
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the source tree
    pub root: PathBuf,

    /// Location of the persisted cache
    pub cache_path: PathBuf,

    /// Location of the rendered codebase document
    pub output_path: PathBuf,

    /// Directory names skipped entirely while walking
    pub exclude_dirs: BTreeSet<String>,

    /// File extensions to summarize; `None` selects every recognised language
    pub extensions: Option<BTreeSet<String>>,

    /// Honour .gitignore and friends
    pub respect_ignore_files: bool,

    /// Summarize structured facts instead of raw text where possible
    pub use_ast: bool,

    /// Map-reduce threshold, in tokens
    pub chunk_tokens: usize,

    /// Tokenizer used for counting and chunking
    pub token_model: TokenModel,

    /// When to write the cache to disk
    pub persist: PersistPolicy,

    /// Worker threads for the `parallel` feature (`None` = rayon default)
    pub jobs: Option<usize>,
}

impl Config {
    /// Defaults for a tree rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            cache_path: default_cache_path(&root),
            output_path: default_output_path(&root),
            root,
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            extensions: None,
            respect_ignore_files: true,
            use_ast: true,
            chunk_tokens: DEFAULT_CHUNK_TOKENS,
            token_model: TokenModel::default(),
            persist: PersistPolicy::PerEntity,
            jobs: None,
        }
    }

    /// Add directory names to the exclusion set
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dirs.extend(names.into_iter().map(Into::into));
        self
    }

    /// Restrict summarized files to the given extensions (without dots)
    pub fn with_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = exts
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self.extensions = if set.is_empty() { None } else { Some(set) };
        self
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.contains(name)
    }

    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> DocResult<()> {
        if !self.root.is_dir() {
            return Err(DocError::Config(format!(
                "root is not a directory: {}",
                self.root.display()
            )));
        }
        if self.chunk_tokens == 0 {
            return Err(DocError::Config("chunk size must be positive".to_string()));
        }
        if self.jobs == Some(0) {
            return Err(DocError::Config("jobs must be positive".to_string()));
        }
        if self.cache_path.is_dir() {
            return Err(DocError::Config(format!(
                "cache path is a directory: {}",
                self.cache_path.display()
            )));
        }
        Ok(())
    }
}
