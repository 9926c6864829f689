//! Cache store - load, query and persist the summary cache
//!
//! The store owns the in-memory [`Cache`] behind a mutex so that parallel
//! workers serialize their updates. Disk writes happen outside that mutex
//! from a snapshot, one writer at a time. Loading never fails: a missing or
//! corrupt file degrades to an empty cache.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::cache::record::{Cache, Record, Scope};
use crate::error::{DocError, DocResult};

/// When the store writes itself to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistPolicy {
    /// After every successful `put`
    #[default]
    PerEntity,
    /// Only on an explicit `save`
    EndOfRun,
}

pub struct CacheStore {
    path: PathBuf,
    policy: PersistPolicy,
    cache: Mutex<Cache>,
    /// Bumped under the cache mutex on every `put`
    version: AtomicU64,
    /// Last version written to disk; held for the duration of a write
    persisted: Mutex<u64>,
}

impl CacheStore {
    /// Read a cache file, returning an empty cache if it is absent or unusable
    pub fn load(path: &Path) -> Cache {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no cache yet");
                return Cache::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache unreadable, starting empty");
                return Cache::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(cache) => cache,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache corrupt, starting empty");
                Cache::default()
            }
        }
    }

    /// Prepare the cache location and load whatever is there
    pub fn open(path: impl Into<PathBuf>, policy: PersistPolicy) -> DocResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                DocError::Config(format!(
                    "cannot create cache directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let cache = Self::load(&path);
        Ok(Self::with_cache(path, policy, cache))
    }

    /// Wrap an already-loaded cache
    pub fn with_cache(path: impl Into<PathBuf>, policy: PersistPolicy, cache: Cache) -> Self {
        Self {
            path: path.into(),
            policy,
            cache: Mutex::new(cache),
            version: AtomicU64::new(0),
            persisted: Mutex::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        // A panicking writer cannot leave a half-inserted record behind
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, scope: Scope, key: &str) -> Option<Record> {
        self.lock().get(scope, key)
    }

    /// Insert or overwrite a record, persisting immediately under `PerEntity`
    pub fn put(&self, scope: Scope, key: &str, record: Record) -> DocResult<()> {
        let version = {
            let mut cache = self.lock();
            cache.put(scope, key, record);
            self.version.fetch_add(1, Ordering::SeqCst) + 1
        };
        if self.policy == PersistPolicy::PerEntity {
            self.flush(Some(version))?;
        }
        Ok(())
    }

    /// Write the current cache to disk
    pub fn save(&self) -> DocResult<()> {
        self.flush(None)
    }

    /// Persist a snapshot without holding the cache mutex during I/O.
    ///
    /// With `needed`, the write is skipped when a concurrent writer already
    /// flushed a version at least that new.
    fn flush(&self, needed: Option<u64>) -> DocResult<()> {
        let mut persisted = self
            .persisted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if needed.is_some_and(|v| *persisted >= v) {
            return Ok(());
        }
        let (snapshot, version) = {
            let cache = self.lock();
            (cache.clone(), self.version.load(Ordering::SeqCst))
        };
        write_cache(&self.path, &snapshot)?;
        *persisted = version;
        Ok(())
    }

    /// Copy of the current in-memory cache
    pub fn snapshot(&self) -> Cache {
        self.lock().clone()
    }

    /// Remove a state directory and everything in it
    pub fn clear(dir: &Path) -> DocResult<bool> {
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(dir).map_err(|source| DocError::CacheWrite {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(true)
    }
}

/// Pretty JSON via a temp file + rename, so readers never see a torn write
fn write_cache(path: &Path, cache: &Cache) -> DocResult<()> {
    let to_err = |source| DocError::CacheWrite {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(cache)
        .map_err(|e| to_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    let tmp = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp).map_err(to_err)?;
    file.write_all(json.as_bytes()).map_err(to_err)?;
    file.write_all(b"\n").map_err(to_err)?;
    file.sync_all().map_err(to_err)?;
    drop(file);
    fs::rename(&tmp, path).map_err(to_err)?;
    Ok(())
}
