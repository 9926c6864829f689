//! Documentation engine - bottom-up, digest-keyed summarization
//!
//! Files are summarized first, then each directory from its files'
//! summaries, then the codebase from the directory summaries. Before any
//! backend call the entity's digest is recomputed and compared with the
//! cached one; a match reuses the stored summary verbatim.
//!
//! A failed file never stops its siblings. Its directory is reported as
//! failed instead of being summarized from partial input, and the codebase
//! is skipped whenever anything below it failed.

mod report;

pub use report::{
    plan_result_set, Action, EntityFailure, EntityOutcome, EntityStatus, RunReport, CODEBASE_KEY,
};

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::analyzer::analyze;
use crate::backends::scan::{scan_tree, SourceFile, SourceTree};
use crate::cache::record::{Cache, Record, Scope};
use crate::cache::store::{CacheStore, PersistPolicy};
use crate::config::Config;
use crate::core::file_reader::{read_bytes, SourceText};
use crate::core::hash::{combine, digest, digest_file, Digest};
use crate::error::{DocError, DocResult, SummarizerError};
use crate::summarizer::{prompts, Summarizer, SummaryBackend};

/// Files and summary of one directory
struct DirectoryRun {
    outcomes: Vec<EntityOutcome>,
    failures: Vec<EntityFailure>,
    /// Present when the directory itself was summarized
    directory: Option<EntityOutcome>,
}

pub struct DocumentationEngine<B> {
    config: Config,
    summarizer: Summarizer<B>,
    store: CacheStore,
}

impl<B: SummaryBackend> DocumentationEngine<B> {
    /// Validate the configuration and open the cache
    pub fn new(config: Config, backend: B) -> DocResult<Self> {
        config.validate()?;
        let store = CacheStore::open(&config.cache_path, config.persist)?;
        let summarizer = Summarizer::new(backend, config.chunk_tokens, config.token_model);
        Ok(Self {
            config,
            summarizer,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn summarizer(&self) -> &Summarizer<B> {
        &self.summarizer
    }

    pub fn cache(&self) -> Cache {
        self.store.snapshot()
    }

    /// Bring every entity up to date. Failures are collected, not returned.
    pub fn run(&self) -> DocResult<RunReport> {
        let calls_before = self.summarizer.calls();
        let tree = scan_tree(&self.config);
        info!(
            root = %self.config.root.display(),
            dirs = tree.dir_count(),
            files = tree.file_count(),
            "starting documentation run"
        );

        let mut report = RunReport::default();
        let mut directories = Vec::new();
        for run in self.run_directories(&tree)? {
            report.outcomes.extend(run.outcomes);
            report.failures.extend(run.failures);
            directories.extend(run.directory);
        }

        if !report.is_complete() {
            warn!(
                failed = report.failures.len(),
                "skipping codebase summary after failures"
            );
        } else if !directories.is_empty() {
            match self.summarize_codebase(&directories) {
                Ok(outcome) => directories.push(outcome),
                Err(error) => report.failures.push(EntityFailure {
                    scope: Scope::Codebase,
                    key: CODEBASE_KEY.to_string(),
                    error,
                }),
            }
        }
        report.outcomes.extend(directories);

        if self.config.persist == PersistPolicy::EndOfRun {
            self.store.save()?;
        }

        report.calls = self.summarizer.calls() - calls_before;
        info!(
            generated = report.count(Action::Generated),
            reused = report.count(Action::Reused),
            failed = report.failures.len(),
            calls = report.calls,
            "documentation run finished"
        );
        Ok(report)
    }

    /// Run, require completeness, then write the codebase document
    pub fn build_documentation(&self) -> DocResult<RunReport> {
        let report = self.run()?;
        if !report.is_complete() {
            return Err(DocError::Incomplete {
                failed: report.failed_keys(),
            });
        }
        self.write_document(&report)?;
        Ok(report)
    }

    /// Write the codebase summary of a complete run to the output path
    pub fn write_document(&self, report: &RunReport) -> DocResult<PathBuf> {
        if !report.is_complete() {
            return Err(DocError::Incomplete {
                failed: report.failed_keys(),
            });
        }
        let summary = report.codebase_summary().ok_or_else(|| {
            DocError::Config(format!(
                "no source files found under {}",
                self.config.root.display()
            ))
        })?;

        let path = self.config.output_path.clone();
        let to_err = |source| DocError::Output {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(to_err)?;
        }
        let mut content = summary.to_string();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        fs::write(&path, content).map_err(to_err)?;
        info!(path = %path.display(), "documentation written");
        Ok(path)
    }

    /// Freshness of every entity, without any backend call
    pub fn plan(&self) -> DocResult<Vec<EntityStatus>> {
        Ok(plan_with(&self.config, &self.store.snapshot()))
    }

    #[cfg(not(feature = "parallel"))]
    fn run_directories(&self, tree: &SourceTree) -> DocResult<Vec<DirectoryRun>> {
        Ok(tree
            .dirs()
            .map(|(key, files)| self.run_directory(key, files))
            .collect())
    }

    #[cfg(feature = "parallel")]
    fn run_directories(&self, tree: &SourceTree) -> DocResult<Vec<DirectoryRun>> {
        use rayon::prelude::*;

        let dirs: Vec<(&str, &[SourceFile])> = tree.dirs().collect();
        let work = || {
            dirs.par_iter()
                .map(|(key, files)| self.run_directory(key, files))
                .collect::<Vec<_>>()
        };
        match self.config.jobs {
            Some(jobs) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .build()
                    .map_err(|e| DocError::Config(format!("cannot start worker pool: {}", e)))?;
                Ok(pool.install(work))
            }
            None => Ok(work()),
        }
    }

    fn run_directory(&self, key: &str, files: &[SourceFile]) -> DirectoryRun {
        let mut run = DirectoryRun {
            outcomes: Vec::new(),
            failures: Vec::new(),
            directory: None,
        };

        for (file, result) in files.iter().zip(self.summarize_files(files)) {
            match result {
                Ok(outcome) => run.outcomes.push(outcome),
                Err(error) => {
                    warn!(file = %file.key, %error, "file summary failed");
                    run.failures.push(EntityFailure {
                        scope: Scope::File,
                        key: file.key.clone(),
                        error,
                    });
                }
            }
        }

        let result = if run.failures.is_empty() {
            self.summarize_directory(key, &run.outcomes)
        } else {
            Err(DocError::ChildrenFailed {
                entity: key.to_string(),
                failed: run.failures.len(),
            })
        };

        match result {
            Ok(outcome) => run.directory = Some(outcome),
            Err(error) => {
                warn!(dir = key, %error, "directory summary failed");
                run.failures.push(EntityFailure {
                    scope: Scope::Directory,
                    key: key.to_string(),
                    error,
                });
            }
        }
        run
    }

    #[cfg(not(feature = "parallel"))]
    fn summarize_files(&self, files: &[SourceFile]) -> Vec<DocResult<EntityOutcome>> {
        files.iter().map(|f| self.summarize_file(f)).collect()
    }

    #[cfg(feature = "parallel")]
    fn summarize_files(&self, files: &[SourceFile]) -> Vec<DocResult<EntityOutcome>> {
        use rayon::prelude::*;

        files.par_iter().map(|f| self.summarize_file(f)).collect()
    }

    fn summarize_file(&self, file: &SourceFile) -> DocResult<EntityOutcome> {
        let bytes = read_bytes(&file.path).map_err(|e| DocError::io(&file.path, e))?;
        let current = digest(&bytes);

        self.reuse_or_generate(Scope::File, &file.key, current, || {
            let source = SourceText::decode(&bytes);
            self.file_summary(file, &source)
        })
    }

    fn file_summary(&self, file: &SourceFile, source: &SourceText) -> Result<String, SummarizerError> {
        if source.lossy && !source.binary {
            debug!(file = %file.key, "invalid UTF-8 replaced before summarizing");
        }
        if self.config.use_ast
            && file.language.has_analyzer()
            && !source.binary
            && !source.is_blank()
        {
            match analyze(&source.text, file.language) {
                Ok(facts) => return self.summarizer.summarize_facts(&file.key, &facts),
                Err(reason) => {
                    debug!(file = %file.key, %reason, "analysis failed, summarizing raw text")
                }
            }
        }
        self.summarizer.summarize(&source.text, prompts::FILE_LABEL)
    }

    fn summarize_directory(&self, key: &str, files: &[EntityOutcome]) -> DocResult<EntityOutcome> {
        let current = combine(files.iter().map(|f| &f.digest));

        self.reuse_or_generate(Scope::Directory, key, current, || {
            let input = files
                .iter()
                .map(|f| prompts::file_entry(&f.key, &f.summary))
                .collect::<Vec<_>>()
                .join("\n");
            self.summarizer.summarize(&input, prompts::DIRECTORY_LABEL)
        })
    }

    fn summarize_codebase(&self, directories: &[EntityOutcome]) -> DocResult<EntityOutcome> {
        let current = combine(directories.iter().map(|d| &d.digest));

        self.reuse_or_generate(Scope::Codebase, CODEBASE_KEY, current, || {
            let input = directories
                .iter()
                .map(|d| prompts::directory_entry(&d.key, &d.summary))
                .collect::<Vec<_>>()
                .join("\n");
            self.summarizer.summarize(&input, prompts::CODEBASE_LABEL)
        })
    }

    /// Reuse a fresh cached record, or generate and store a new one
    fn reuse_or_generate(
        &self,
        scope: Scope,
        key: &str,
        current: Digest,
        generate: impl FnOnce() -> Result<String, SummarizerError>,
    ) -> DocResult<EntityOutcome> {
        if let Some(record) = self.store.get(scope, key) {
            if record.is_fresh(&current) {
                debug!(%scope, key, "reusing cached summary");
                return Ok(EntityOutcome {
                    scope,
                    key: key.to_string(),
                    digest: current,
                    action: Action::Reused,
                    summary: record.summary,
                });
            }
        }

        let summary = generate().map_err(|source| DocError::Summarizer {
            entity: key.to_string(),
            source,
        })?;
        self.store
            .put(scope, key, Record::new(current.clone(), summary.clone()))?;
        info!(%scope, key, digest = current.short(), "generated summary");

        Ok(EntityOutcome {
            scope,
            key: key.to_string(),
            digest: current,
            action: Action::Generated,
            summary,
        })
    }
}

/// Freshness of every entity under `config.root` against the cache at
/// `config.cache_path`. Reads only; never creates the cache directory.
pub fn plan(config: &Config) -> DocResult<Vec<EntityStatus>> {
    config.validate()?;
    let cache = CacheStore::load(&config.cache_path);
    Ok(plan_with(config, &cache))
}

fn plan_with(config: &Config, cache: &Cache) -> Vec<EntityStatus> {
    let tree = scan_tree(config);
    let mut statuses = Vec::new();
    // a digest that cannot be computed leaves every ancestor without one
    let mut dir_digests: Option<Vec<Digest>> = Some(Vec::new());

    for (dir_key, files) in tree.dirs() {
        let file_statuses: Vec<EntityStatus> = files
            .iter()
            .map(|file| match digest_file(&file.path) {
                Ok(d) => status_for(cache, Scope::File, &file.key, Some(d)),
                Err(e) => EntityStatus {
                    scope: Scope::File,
                    key: file.key.clone(),
                    digest: None,
                    fresh: false,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        let file_digests: Option<Vec<Digest>> =
            file_statuses.iter().map(|s| s.digest.clone()).collect();
        let dir_digest = file_digests.map(|list| combine(&list));
        statuses.extend(file_statuses);

        dir_digests = match (dir_digests, &dir_digest) {
            (Some(mut list), Some(d)) => {
                list.push(d.clone());
                Some(list)
            }
            _ => None,
        };
        statuses.push(status_for(cache, Scope::Directory, dir_key, dir_digest));
    }

    if !tree.is_empty() {
        let codebase_digest = dir_digests.map(|list| combine(&list));
        statuses.push(status_for(cache, Scope::Codebase, CODEBASE_KEY, codebase_digest));
    }
    statuses
}

fn status_for(cache: &Cache, scope: Scope, key: &str, digest: Option<Digest>) -> EntityStatus {
    let fresh = match (&digest, cache.get(scope, key)) {
        (Some(current), Some(record)) => record.is_fresh(current),
        _ => false,
    };
    EntityStatus {
        scope,
        key: key.to_string(),
        digest,
        fresh,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Language;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Numbered {
        prompts: Mutex<Vec<String>>,
    }

    impl SummaryBackend for Numbered {
        fn complete(&self, prompt: &str) -> Result<String, SummarizerError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            Ok(format!("summary #{}", prompts.len()))
        }
    }

    #[test]
    fn test_directory_input_format() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.py"), "x = 1\n").unwrap();
        fs::write(temp.path().join("b.py"), "y = 2\n").unwrap();

        let engine = DocumentationEngine::new(Config::new(temp.path()), Numbered::default()).unwrap();
        engine.run().unwrap();

        let prompts = engine.summarizer().backend().prompts.lock().unwrap();
        assert_eq!(prompts.len(), 4);
        assert_eq!(
            prompts[2],
            "Summarize the following directory summaries:\n\
             FILE: a.py\nSUMMARY:\nsummary #1\n\n\
             FILE: b.py\nSUMMARY:\nsummary #2\n"
        );
        assert_eq!(
            prompts[3],
            "Summarize the following codebase:\nDIR: .\nSUMMARY:\nsummary #3\n"
        );
    }

    #[test]
    fn test_plan_reports_stale_then_fresh() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.py"), "x = 1\n").unwrap();
        let config = Config::new(temp.path());

        let before = plan(&config).unwrap();
        assert_eq!(before.len(), 3);
        assert!(before.iter().all(|s| !s.fresh));
        assert!(!config.cache_path.parent().unwrap().exists());

        let engine = DocumentationEngine::new(config.clone(), Numbered::default()).unwrap();
        engine.run().unwrap();
        let after = engine.plan().unwrap();
        assert!(after.iter().all(|s| s.fresh));
        assert_eq!(engine.summarizer().calls(), 3);
    }

    #[test]
    fn test_unreadable_file_spares_siblings_not_parent() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.py"), "x = 1\n").unwrap();
        let files = [
            SourceFile {
                key: "a.py".to_string(),
                path: temp.path().join("a.py"),
                language: Language::Python,
            },
            SourceFile {
                key: "missing.py".to_string(),
                path: temp.path().join("missing.py"),
                language: Language::Python,
            },
        ];

        let engine = DocumentationEngine::new(Config::new(temp.path()), Numbered::default()).unwrap();
        let run = engine.run_directory(".", &files);

        assert_eq!(run.outcomes.len(), 1);
        assert_eq!(run.outcomes[0].key, "a.py");
        assert_eq!(run.outcomes[0].action, Action::Generated);
        assert!(engine.store.get(Scope::File, "a.py").is_some());

        assert_eq!(run.failures.len(), 2);
        assert_eq!(run.failures[0].key, "missing.py");
        assert!(matches!(run.failures[0].error, DocError::Io { .. }));
        assert_eq!(run.failures[1].key, ".");
        assert!(matches!(
            run.failures[1].error,
            DocError::ChildrenFailed { failed: 1, .. }
        ));
        assert!(run.directory.is_none());
        assert!(engine.store.get(Scope::Directory, ".").is_none());
        assert_eq!(engine.summarizer().calls(), 1);
    }

    #[test]
    fn test_empty_tree_has_no_document() {
        let temp = tempdir().unwrap();
        let engine = DocumentationEngine::new(Config::new(temp.path()), Numbered::default()).unwrap();
        let report = engine.run().unwrap();
        assert!(report.is_complete());
        assert!(report.outcomes.is_empty());
        assert!(matches!(engine.write_document(&report), Err(DocError::Config(_))));
    }
}
