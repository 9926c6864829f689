//! Source tree discovery
//!
//! Uses the ignore crate for traversal. Produces, for every directory that
//! holds at least one selected file, the sorted list of its immediate files.
//! The tool's own cache and output files are never selected.

use ignore::WalkBuilder;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::analyzer::Language;
use crate::config::Config;
use crate::core::paths::entity_key;

/// A file selected for summarization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Entity key, relative to the root
    pub key: String,
    pub path: PathBuf,
    pub language: Language,
}

/// Directories (by key) mapped to their immediate source files
#[derive(Debug, Clone, Default)]
pub struct SourceTree {
    dirs: BTreeMap<String, Vec<SourceFile>>,
}

impl SourceTree {
    /// Directory keys with their files, both in key order
    pub fn dirs(&self) -> impl Iterator<Item = (&str, &[SourceFile])> {
        self.dirs.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.dirs.values().flatten()
    }

    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    pub fn file_count(&self) -> usize {
        self.dirs.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

/// Walk `config.root`, honouring exclusions, extensions and ignore files
pub fn scan_tree(config: &Config) -> SourceTree {
    let root = config.root.as_path();
    let respect = config.respect_ignore_files;
    let filter_config = config.clone();
    let generated = Generated::new(config);

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .ignore(respect)
        .parents(respect)
        .git_ignore(respect)
        .git_global(respect)
        .git_exclude(respect)
        .sort_by_file_name(|a, b| a.cmp(b));

    builder.filter_entry(move |entry| {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir || entry.depth() == 0 {
            return true;
        }
        entry
            .file_name()
            .to_str()
            .map(|name| !filter_config.is_excluded_dir(name))
            .unwrap_or(true)
    });

    let mut tree = SourceTree::default();
    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let path = entry.path();
        let language = Language::from_path(path);
        if !is_selected(path, language, config.extensions.as_ref()) {
            continue;
        }
        if generated.contains(path) {
            debug!(path = %path.display(), "skipping generated file");
            continue;
        }

        let Some(parent) = path.parent() else {
            continue;
        };
        let (Some(key), Some(dir_key)) = (entity_key(path, root), entity_key(parent, root)) else {
            continue;
        };

        tree.dirs.entry(dir_key).or_default().push(SourceFile {
            key,
            path: path.to_path_buf(),
            language,
        });
    }

    for files in tree.dirs.values_mut() {
        files.sort_by(|a, b| a.key.cmp(&b.key));
    }

    debug!(
        dirs = tree.dir_count(),
        files = tree.file_count(),
        "scanned source tree"
    );
    tree
}

/// Files this tool writes into the tree it reads
struct Generated {
    paths: Vec<PathBuf>,
}

impl Generated {
    fn new(config: &Config) -> Self {
        let mut paths = Vec::new();
        for path in [&config.cache_path, &config.output_path] {
            if let Ok(canonical) = fs::canonicalize(path) {
                paths.push(canonical);
            }
            paths.push(path.clone());
        }
        Self { paths }
    }

    fn contains(&self, path: &Path) -> bool {
        if self.paths.iter().any(|p| p == path) {
            return true;
        }
        // Only pay for canonicalize when the file name could match
        let name = path.file_name();
        if !self.paths.iter().any(|p| p.file_name() == name) {
            return false;
        }
        fs::canonicalize(path)
            .map(|c| self.paths.contains(&c))
            .unwrap_or(false)
    }
}

fn is_selected(path: &Path, language: Language, extensions: Option<&BTreeSet<String>>) -> bool {
    match extensions {
        Some(exts) => path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| exts.contains(&e.to_lowercase()))
            .unwrap_or(false),
        None => language.is_known(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x = 1\n").unwrap();
    }

    fn layout(tree: &SourceTree) -> Vec<(String, Vec<String>)> {
        tree.dirs()
            .map(|(dir, files)| {
                (
                    dir.to_string(),
                    files.iter().map(|f| f.key.clone()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_scan_empty_dir() {
        let temp = tempdir().unwrap();
        let tree = scan_tree(&Config::new(temp.path()));
        assert!(tree.is_empty());
        assert_eq!(tree.file_count(), 0);
    }

    #[test]
    fn test_scan_groups_by_immediate_parent() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "main.py");
        touch(temp.path(), "pkg/b.py");
        touch(temp.path(), "pkg/a.py");
        touch(temp.path(), "pkg/sub/c.rs");
        touch(temp.path(), "pkg/README.md");
        fs::create_dir_all(temp.path().join("empty")).unwrap();

        let tree = scan_tree(&Config::new(temp.path()));
        assert_eq!(
            layout(&tree),
            vec![
                (".".to_string(), vec!["main.py".to_string()]),
                (
                    "pkg".to_string(),
                    vec!["pkg/a.py".to_string(), "pkg/b.py".to_string()]
                ),
                ("pkg/sub".to_string(), vec!["pkg/sub/c.rs".to_string()]),
            ]
        );
        assert_eq!(tree.files().next().unwrap().language, Language::Python);
    }

    #[test]
    fn test_scan_skips_excluded_and_hidden() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "app.py");
        touch(temp.path(), "node_modules/lib/index.js");
        touch(temp.path(), "venv/site.py");
        touch(temp.path(), ".hidden/x.py");
        touch(temp.path(), "vendor/dep.py");

        let config = Config::new(temp.path()).exclude(["vendor"]);
        let tree = scan_tree(&config);
        let keys: Vec<&str> = tree.files().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["app.py"]);
    }

    #[test]
    fn test_scan_never_selects_own_output_or_cache() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "app.py");
        touch(temp.path(), "docs.md");
        touch(temp.path(), "state/cache.json");
        touch(temp.path(), "notes.md");

        let mut config = Config::new(temp.path()).with_extensions(["py", "md", "json"]);
        config.cache_path = temp.path().join("state/cache.json");
        let tree = scan_tree(&config);
        let keys: Vec<&str> = tree.files().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["app.py", "notes.md"]);
    }

    #[test]
    fn test_scan_extension_filter() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "a.py");
        touch(temp.path(), "b.rs");
        touch(temp.path(), "notes.txt");

        let config = Config::new(temp.path()).with_extensions(["rs", "txt"]);
        let tree = scan_tree(&config);
        let keys: Vec<&str> = tree.files().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["b.rs", "notes.txt"]);
    }
}
