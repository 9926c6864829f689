//! Unified Result Model
//!
//! Every command maps its outcome to this model before rendering output.

use serde::{Deserialize, Serialize};

/// The kind of result item. Ordering puts the hierarchy bottom-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    File,
    Directory,
    Codebase,
    Check,
    Error,
}

/// What happened to (or would happen to) an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Cached summary reused without a call
    Reused,
    /// Summary regenerated during this run
    Generated,
    /// Would be regenerated by the next build
    Stale,
    /// Cached summary matches current content
    Fresh,
    /// Could not be summarized
    Failed,
    /// Environment check passed
    Ok,
}

/// Metadata for a result item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    /// Content digest (file) or combined digest (directory, codebase)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// File size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Whether the excerpt was truncated
    #[serde(default)]
    pub truncated: bool,
}

/// Error information for a result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemError {
    pub code: String,
    pub message: String,
}

impl ItemError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::error::DocError> for ItemError {
    fn from(err: &crate::error::DocError) -> Self {
        ItemError::new(err.code(), err.to_string())
    }
}

/// The unified result item that all commands produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    pub kind: Kind,

    /// Entity key (path relative to root, '/' separated) or check name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// Summary text or check message (may be truncated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    /// Structured payload, embedded as-is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    pub meta: Meta,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ItemError>,
}

impl ResultItem {
    fn with_kind(kind: Kind, path: Option<String>) -> Self {
        Self {
            kind,
            path,
            status: None,
            excerpt: None,
            data: None,
            meta: Meta::default(),
            errors: Vec::new(),
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::with_kind(Kind::File, Some(path.into()))
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self::with_kind(Kind::Directory, Some(path.into()))
    }

    pub fn codebase() -> Self {
        Self::with_kind(Kind::Codebase, None)
    }

    /// Environment check result, named by what was checked
    pub fn check(name: impl Into<String>) -> Self {
        Self::with_kind(Kind::Check, Some(name.into()))
    }

    pub fn error(error: ItemError) -> Self {
        let mut item = Self::with_kind(Kind::Error, None);
        item.status = Some(Status::Failed);
        item.errors.push(error);
        item
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.meta.digest = Some(digest.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, error: ItemError) -> Self {
        self.errors.push(error);
        self
    }
}

/// Result set containing multiple result items
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub items: Vec<ResultItem>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: ResultItem) {
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ResultItem>) {
        self.items.extend(items);
    }

    /// Sort by kind (files, directories, codebase, ...) then path
    pub fn sort(&mut self) {
        self.items
            .sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.path.cmp(&b.path)));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items
            .iter()
            .any(|i| i.kind == Kind::Error || !i.errors.is_empty())
    }
}

impl IntoIterator for ResultSet {
    type Item = ResultItem;
    type IntoIter = std::vec::IntoIter<ResultItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<ResultItem> for ResultSet {
    fn from_iter<T: IntoIterator<Item = ResultItem>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
