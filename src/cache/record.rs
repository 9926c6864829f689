//! Cache records and the persisted three-scope layout

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::hash::Digest;

/// Which level of the hierarchy a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    File,
    Directory,
    Codebase,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::File => "file",
            Scope::Directory => "directory",
            Scope::Codebase => "codebase",
        };
        write!(f, "{}", name)
    }
}

/// A digest plus the summary produced for it, independent of scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub digest: Digest,
    pub summary: String,
}

impl Record {
    pub fn new(digest: Digest, summary: impl Into<String>) -> Self {
        Self {
            digest,
            summary: summary.into(),
        }
    }

    /// Fresh iff the stored digest matches the recomputed one
    pub fn is_fresh(&self, current: &Digest) -> bool {
        &self.digest == current
    }
}

/// Per-file entry as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub hash: Digest,
    pub summary: String,
}

/// Per-directory entry as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub dir_hash: Digest,
    pub summary: String,
}

/// Whole-codebase entry as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseRecord {
    pub hash: Digest,
    pub summary: String,
}

impl From<FileRecord> for Record {
    fn from(r: FileRecord) -> Self {
        Record::new(r.hash, r.summary)
    }
}

impl From<DirectoryRecord> for Record {
    fn from(r: DirectoryRecord) -> Self {
        Record::new(r.dir_hash, r.summary)
    }
}

impl From<CodebaseRecord> for Record {
    fn from(r: CodebaseRecord) -> Self {
        Record::new(r.hash, r.summary)
    }
}

/// The whole persisted cache.
///
/// Maps are ordered so identical caches serialize to identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cache {
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,

    #[serde(default)]
    pub directories: BTreeMap<String, DirectoryRecord>,

    /// `{}` on disk when no codebase summary exists yet
    #[serde(
        default,
        serialize_with = "serialize_codebase",
        deserialize_with = "deserialize_codebase"
    )]
    pub codebase: Option<CodebaseRecord>,
}

impl Cache {
    pub fn get(&self, scope: Scope, key: &str) -> Option<Record> {
        match scope {
            Scope::File => self.files.get(key).cloned().map(Record::from),
            Scope::Directory => self.directories.get(key).cloned().map(Record::from),
            Scope::Codebase => self.codebase.clone().map(Record::from),
        }
    }

    /// Insert or overwrite. The codebase scope ignores `key`.
    pub fn put(&mut self, scope: Scope, key: &str, record: Record) {
        match scope {
            Scope::File => {
                self.files.insert(
                    key.to_string(),
                    FileRecord {
                        hash: record.digest,
                        summary: record.summary,
                    },
                );
            }
            Scope::Directory => {
                self.directories.insert(
                    key.to_string(),
                    DirectoryRecord {
                        dir_hash: record.digest,
                        summary: record.summary,
                    },
                );
            }
            Scope::Codebase => {
                self.codebase = Some(CodebaseRecord {
                    hash: record.digest,
                    summary: record.summary,
                });
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty() && self.codebase.is_none()
    }
}

/// Codebase slot on disk: both fields present, or an empty object
#[derive(Serialize, Deserialize, Default)]
struct CodebaseSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hash: Option<Digest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

fn serialize_codebase<S>(value: &Option<CodebaseRecord>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let slot = match value {
        Some(r) => CodebaseSlot {
            hash: Some(r.hash.clone()),
            summary: Some(r.summary.clone()),
        },
        None => CodebaseSlot::default(),
    };
    slot.serialize(serializer)
}

fn deserialize_codebase<'de, D>(deserializer: D) -> Result<Option<CodebaseRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let slot = Option::<CodebaseSlot>::deserialize(deserializer)?.unwrap_or_default();
    Ok(match (slot.hash, slot.summary) {
        (Some(hash), Some(summary)) => Some(CodebaseRecord { hash, summary }),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::digest;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_schema_field_names() {
        let mut cache = Cache::default();
        cache.put(Scope::File, "pkg/a.py", Record::new(digest(b"a"), "A"));
        cache.put(Scope::Directory, "pkg", Record::new(digest(b"d"), "D"));
        cache.put(Scope::Codebase, "", Record::new(digest(b"c"), "C"));

        let value = serde_json::to_value(&cache).unwrap();
        assert_eq!(value["files"]["pkg/a.py"]["hash"], digest(b"a").as_str());
        assert_eq!(value["files"]["pkg/a.py"]["summary"], "A");
        assert_eq!(value["directories"]["pkg"]["dir_hash"], digest(b"d").as_str());
        assert_eq!(value["codebase"]["hash"], digest(b"c").as_str());
        assert_eq!(value["codebase"]["summary"], "C");
    }

    #[test]
    fn test_empty_codebase_is_empty_object() {
        let cache = Cache::default();
        let json = serde_json::to_string(&cache).unwrap();
        assert_eq!(json, r#"{"files":{},"directories":{},"codebase":{}}"#);

        let back: Cache = serde_json::from_str(&json).unwrap();
        assert!(back.codebase.is_none());
        assert!(back.is_empty());
    }

    #[test]
    fn test_missing_sections_default() {
        let cache: Cache = serde_json::from_str(r#"{"files":{}}"#).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_put_overwrite() {
        let mut cache = Cache::default();
        cache.put(Scope::File, "a.py", Record::new(digest(b"1"), "old"));
        cache.put(Scope::File, "a.py", Record::new(digest(b"2"), "new"));

        let record = cache.get(Scope::File, "a.py").unwrap();
        assert_eq!(record.summary, "new");
        assert!(record.is_fresh(&digest(b"2")));
        assert!(!record.is_fresh(&digest(b"1")));
        assert!(cache.get(Scope::Directory, "a.py").is_none());
    }

    #[test]
    fn test_codebase_ignores_key() {
        let mut cache = Cache::default();
        cache.put(Scope::Codebase, "whatever", Record::new(digest(b"c"), "C"));
        assert_eq!(cache.get(Scope::Codebase, "other").unwrap().summary, "C");
    }
}
