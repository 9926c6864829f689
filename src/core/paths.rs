//! Path normalization utilities
//!
//! Cache keys are paths relative to the run root, always using '/' as
//! separator. The root directory itself is keyed as ".".

use std::path::{Path, PathBuf};

/// Name of the per-project state directory
pub const STATE_DIR: &str = ".tierdoc";

/// Default cache file name inside the state directory
pub const CACHE_FILE: &str = "summary_cache.json";

/// Default output document name (written under the root)
pub const OUTPUT_FILE: &str = "docs.md";

/// Key used for the root directory
pub const ROOT_KEY: &str = ".";

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Cache key for a file or directory under `root`
pub fn entity_key(path: &Path, root: &Path) -> Option<String> {
    make_relative(path, root).map(|rel| if rel.is_empty() { ROOT_KEY.to_string() } else { rel })
}

/// Get the state directory for a given root
pub fn state_dir(root: &Path) -> PathBuf {
    root.join(STATE_DIR)
}

/// Default cache file location for a given root
pub fn default_cache_path(root: &Path) -> PathBuf {
    state_dir(root).join(CACHE_FILE)
}

/// Default output document location for a given root
pub fn default_output_path(root: &Path) -> PathBuf {
    root.join(OUTPUT_FILE)
}
