//! CLI module - Command-line interface definitions and handlers

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tierdoc::backends::doctor::doctor_results;
use tierdoc::backends::openai::OpenAiBackend;
use tierdoc::cache::store::{CacheStore, PersistPolicy};
use tierdoc::config::{
    BackendConfig, Config, DEFAULT_BASE_URL, DEFAULT_CHUNK_TOKENS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE,
};
use tierdoc::core::file_reader::truncate_at_char_boundary;
use tierdoc::core::model::{ResultItem, ResultSet, Status};
use tierdoc::core::paths::state_dir;
use tierdoc::core::render::{OutputFormat, RenderConfig, Renderer};
use tierdoc::core::tokenizer::TokenModel;
use tierdoc::engine::{self, plan_result_set, DocumentationEngine};
use tierdoc::error::DocError;

/// Excerpts longer than this are cut in command output
const EXCERPT_LIMIT: usize = 400;

/// tierdoc - incremental file, directory and codebase summaries of a source tree.
#[derive(Parser, Debug)]
#[command(name = "tierdoc")]
#[command(
    author,
    version,
    about,
    long_about = r#"tierdoc summarizes a source tree bottom-up through an LLM and caches every
summary under .tierdoc/, keyed by content digest. Unchanged files, directories
and the codebase as a whole are never summarized twice.

Each command prints a ResultSet in the selected format (default: jsonl).

Output formats:
- jsonl: one JSON object per line (best for piping into tools/LLMs)
- json: a single JSON array
- md: human-friendly Markdown
- raw: excerpts only (unstable; intended for debugging)

Examples:
    tierdoc status
    tierdoc build --model gpt-4o-mini
    tierdoc --root ../service build --exclude fixtures --ext py,rs
    tierdoc doctor
"#
)]
pub struct Cli {
    /// Root directory of the source tree.
    #[arg(
        long,
        global = true,
        default_value = ".",
        value_name = "ROOT",
        long_help = "Root directory of the source tree (defaults to the current directory).\n\n\
All entity keys emitted in results are relative to this root, and the default cache\n\
location lives under ROOT/.tierdoc/."
    )]
    pub root: PathBuf,

    /// Output format (jsonl/json/md/raw).
    #[arg(
        long,
        global = true,
        default_value = "jsonl",
        value_name = "FORMAT",
        long_help = "Select the output format for ResultSet.\n\n\
Supported values:\n\
- jsonl (default)\n\
- json\n\
- md (markdown)\n\
- raw\n\n\
Tip: Prefer jsonl when you want stable, line-oriented output for piping and prompts."
    )]
    pub format: String,

    /// Quiet mode (errors only on stderr).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Only log errors to stderr. Results are still printed to stdout.\n\
RUST_LOG, when set, takes precedence."
    )]
    pub quiet: bool,

    /// Verbose mode (more diagnostics).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Log every reused and regenerated entity to stderr. This is intended for\n\
debugging; RUST_LOG, when set, takes precedence."
    )]
    pub verbose: bool,

    /// Pretty-print JSON/JSONL output with indentation.
    #[arg(
        long,
        global = true,
        long_help = "Pretty-print JSON and JSONL output with indentation for human readability.\n\n\
This is useful when manually inspecting results. Has no effect on md/raw formats."
    )]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bring every summary up to date and write the codebase document.
    #[command(
        long_about = "Summarize stale files, then stale directories, then the codebase, reusing\n\
every cached summary whose digest still matches. On success the codebase summary\n\
is written to --output (default ROOT/docs.md).\n\n\
A failed file does not stop its siblings, but its directory and the codebase are\n\
left untouched and the command exits with an error.\n\n\
Examples:\n\
  tierdoc build\n\
  tierdoc build --base-url http://localhost:8000/v1 --model local\n\
  tierdoc build --no-ast --chunk-tokens 8000\n"
    )]
    Build {
        #[command(flatten)]
        tree: TreeArgs,

        #[command(flatten)]
        backend: BackendArgs,

        /// Where to write the codebase document.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Token threshold above which text is chunked.
        #[arg(long, default_value_t = DEFAULT_CHUNK_TOKENS, value_name = "N")]
        chunk_tokens: usize,

        /// Tokenizer used for counting and chunking (cl100k/o200k/heuristic).
        #[arg(long, default_value = "cl100k", value_name = "MODEL")]
        tokenizer: String,

        /// Summarize raw file text instead of extracted structure.
        #[arg(
            long,
            long_help = "Skip tree-sitter analysis and always send raw file text.\n\n\
By default Python and Rust files are described by their declarations,\n\
imports and module docstring."
        )]
        no_ast: bool,

        /// Number of worker threads (requires the 'parallel' feature).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,

        /// Persist the cache once at the end instead of after every entity.
        #[arg(long)]
        save_at_end: bool,
    },

    /// Report which entities are fresh and which the next build would regenerate.
    #[command(
        long_about = "Recompute every digest and compare it with the cache. No summarizer\n\
call is made and nothing is written.\n\n\
Examples:\n\
  tierdoc status\n\
  tierdoc status --format md\n"
    )]
    Status {
        #[command(flatten)]
        tree: TreeArgs,
    },

    /// Delete the .tierdoc state directory.
    #[command(long_about = "Remove ROOT/.tierdoc/ and everything in it, forcing the next build\n\
to regenerate every summary.\n\n\
Example:\n\
  tierdoc clear\n")]
    Clear,

    /// Check the tokenizer, grammars, API settings and cache directory.
    #[command(
        long_about = "Check whether the pieces a build needs are available: tokenizer data,\n\
tree-sitter grammars, API key, base URL, and a writable cache directory.\n\n\
Example:\n\
  tierdoc doctor\n"
    )]
    Doctor {
        #[command(flatten)]
        backend: BackendArgs,

        /// Tokenizer to check (cl100k/o200k/heuristic).
        #[arg(long, default_value = "cl100k", value_name = "MODEL")]
        tokenizer: String,
    },
}

/// Which files take part and where the cache lives
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Cache file location.
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Extra directory names to skip (comma-separated).
    #[arg(
        long,
        value_name = "NAMES",
        value_delimiter = ',',
        long_help = "Directory names to skip at any depth, in addition to the defaults\n\
(.git, node_modules, target, venv, __pycache__ and similar).\n\n\
Example: --exclude fixtures,generated"
    )]
    pub exclude: Vec<String>,

    /// Only summarize files with these extensions (comma-separated).
    #[arg(
        long,
        value_name = "EXTS",
        value_delimiter = ',',
        long_help = "Only summarize files with these extensions (without the dot).\n\n\
If omitted, every file in a recognised programming language is included."
    )]
    pub ext: Vec<String>,

    /// Disable .gitignore and other ignore rules.
    #[arg(long)]
    pub no_ignore: bool,
}

/// Summarizer endpoint settings
#[derive(Args, Debug)]
pub struct BackendArgs {
    /// Chat model name.
    #[arg(long, env = "TIERDOC_MODEL", default_value = DEFAULT_MODEL, value_name = "MODEL")]
    pub model: String,

    /// OpenAI-compatible API base URL.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL, value_name = "URL")]
    pub base_url: String,

    /// API key sent as a bearer token.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 120, value_name = "SECS")]
    pub timeout_secs: u64,

    /// Sampling temperature.
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE, value_name = "T")]
    pub temperature: f64,
}

impl TreeArgs {
    fn config(&self, root: &Path) -> Config {
        let mut config = Config::new(root).exclude(&self.exclude);
        if !self.ext.is_empty() {
            config = config.with_extensions(&self.ext);
        }
        if let Some(cache) = &self.cache {
            config.cache_path = cache.clone();
        }
        config.respect_ignore_files = !self.no_ignore;
        config
    }
}

impl BackendArgs {
    fn config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone().filter(|k| !k.is_empty()),
            model: self.model.clone(),
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
            ..BackendConfig::default()
        }
    }
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let format: OutputFormat = cli.format.parse().unwrap_or_default();
    let renderer = Renderer::with_config(RenderConfig::with_pretty(format, cli.pretty));

    // Get absolute root path
    let root = cli.root.canonicalize().unwrap_or(cli.root);

    match cli.command {
        Commands::Build {
            tree,
            backend,
            output,
            chunk_tokens,
            tokenizer,
            no_ast,
            jobs,
            save_at_end,
        } => {
            let mut config = tree.config(&root);
            if let Some(output) = output {
                config.output_path = output;
            }
            config.chunk_tokens = chunk_tokens;
            config.token_model = parse_tokenizer(&tokenizer)?;
            config.use_ast = !no_ast;
            config.jobs = jobs;
            if save_at_end {
                config.persist = PersistPolicy::EndOfRun;
            }
            run_build(config, backend.config(), &renderer)
        }

        Commands::Status { tree } => run_status(&tree.config(&root), &renderer),

        Commands::Clear => run_clear(&root, &renderer),

        Commands::Doctor { backend, tokenizer } => {
            run_doctor(&root, parse_tokenizer(&tokenizer)?, &backend.config(), &renderer)
        }
    }
}

fn parse_tokenizer(name: &str) -> Result<TokenModel> {
    name.parse::<TokenModel>().map_err(anyhow::Error::msg)
}

fn run_build(config: Config, backend: BackendConfig, renderer: &Renderer) -> Result<()> {
    let backend = OpenAiBackend::new(backend)?;
    let engine = DocumentationEngine::new(config, backend)?;
    let report = engine.run()?;

    print_results(renderer, truncate_excerpts(report.to_result_set()))?;

    if !report.is_complete() {
        bail!(DocError::Incomplete {
            failed: report.failed_keys(),
        });
    }
    let path = engine.write_document(&report)?;
    tracing::info!(
        path = %path.display(),
        calls = report.calls,
        "build complete"
    );
    Ok(())
}

fn run_status(config: &Config, renderer: &Renderer) -> Result<()> {
    let statuses = engine::plan(config)?;
    print_results(renderer, plan_result_set(&statuses))
}

fn run_clear(root: &Path, renderer: &Renderer) -> Result<()> {
    let dir = state_dir(root);
    let removed = CacheStore::clear(&dir)?;

    let mut result_set = ResultSet::new();
    result_set.push(
        ResultItem::directory(dir.to_string_lossy())
            .with_status(Status::Ok)
            .with_data(serde_json::json!({ "removed": removed })),
    );
    print_results(renderer, result_set)
}

fn run_doctor(
    root: &Path,
    token_model: TokenModel,
    backend: &BackendConfig,
    renderer: &Renderer,
) -> Result<()> {
    let result_set = doctor_results(root, token_model, backend);
    let failed = result_set.has_errors();
    print_results(renderer, result_set)?;

    if failed {
        tracing::warn!("some required checks failed");
    }
    Ok(())
}

fn truncate_excerpts(result_set: ResultSet) -> ResultSet {
    result_set
        .into_iter()
        .map(|mut item| {
            if let Some(excerpt) = item.excerpt.take() {
                let cut = truncate_at_char_boundary(&excerpt, EXCERPT_LIMIT);
                item.meta.truncated = cut.len() < excerpt.len();
                item.excerpt = Some(cut.to_string());
            }
            item
        })
        .collect()
}

fn print_results(renderer: &Renderer, result_set: ResultSet) -> Result<()> {
    let stdout = std::io::stdout();
    renderer
        .render_to(&result_set, stdout.lock())
        .context("failed to write results")
}
