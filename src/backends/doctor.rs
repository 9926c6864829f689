//! Doctor - environment checks before a documentation run

use std::path::Path;

use crate::analyzer::{analyze, Language};
use crate::config::BackendConfig;
use crate::core::model::{ItemError, ResultItem, ResultSet, Status};
use crate::core::paths::state_dir;
use crate::core::tokenizer::{check_tiktoken_model, TokenModel};

/// Outcome of one check
#[derive(Debug, Clone)]
pub struct CheckStatus {
    pub name: String,
    pub passed: bool,
    pub required: bool,
    pub detail: String,
    pub notes: Option<String>,
}

impl CheckStatus {
    pub fn to_result_item(&self) -> ResultItem {
        let required = if self.required { "required" } else { "optional" };
        let mut message = format!("{} ({}) - {}", self.name, required, self.detail);
        if let Some(notes) = &self.notes {
            message.push_str(&format!("\n  Note: {}", notes));
        }

        let mut item = ResultItem::check(&self.name)
            .with_status(if self.passed { Status::Ok } else { Status::Failed })
            .with_excerpt(message);

        if !self.passed && self.required {
            item.errors.push(ItemError::new(
                "CHECK_FAILED",
                format!("{} is required but unavailable", self.name),
            ));
        }
        item
    }
}

/// Run every check for a run rooted at `root`
pub fn check_environment(root: &Path, token_model: TokenModel, backend: &BackendConfig) -> Vec<CheckStatus> {
    let mut checks = Vec::new();

    let (loaded, error) = check_tiktoken_model(token_model);
    checks.push(CheckStatus {
        name: "tokenizer".to_string(),
        passed: loaded,
        required: true,
        detail: error.unwrap_or_else(|| format!("{} loaded", token_model)),
        notes: None,
    });

    for language in [Language::Python, Language::Rust] {
        let parsed = analyze("", language);
        checks.push(CheckStatus {
            name: format!("grammar-{}", language),
            passed: parsed.is_ok(),
            required: false,
            detail: match parsed {
                Ok(_) => "tree-sitter grammar loaded".to_string(),
                Err(e) => e.to_string(),
            },
            notes: Some("Files fall back to raw-text summaries without it".to_string()),
        });
    }

    checks.push(CheckStatus {
        name: "api-key".to_string(),
        passed: backend.api_key.as_deref().is_some_and(|k| !k.is_empty()),
        required: false,
        detail: if backend.api_key.is_some() {
            "set".to_string()
        } else {
            "not set".to_string()
        },
        notes: Some("Set OPENAI_API_KEY or pass --api-key; local servers may not need one".to_string()),
    });

    let url_ok = backend.base_url.starts_with("http://") || backend.base_url.starts_with("https://");
    checks.push(CheckStatus {
        name: "base-url".to_string(),
        passed: url_ok,
        required: true,
        detail: backend.base_url.clone(),
        notes: None,
    });

    checks.push(check_state_dir(root));
    checks
}

fn check_state_dir(root: &Path) -> CheckStatus {
    let dir = state_dir(root);
    let (passed, detail) = if !root.is_dir() {
        (false, format!("root is not a directory: {}", root.display()))
    } else if dir.exists() {
        let writable = std::fs::metadata(&dir)
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false);
        (writable, format!("{} exists", dir.display()))
    } else {
        let root_writable = std::fs::metadata(root)
            .map(|m| !m.permissions().readonly())
            .unwrap_or(false);
        (root_writable, format!("{} will be created", dir.display()))
    };

    CheckStatus {
        name: "cache-dir".to_string(),
        passed,
        required: true,
        detail,
        notes: None,
    }
}

/// Checks rendered as a result set
pub fn doctor_results(root: &Path, token_model: TokenModel, backend: &BackendConfig) -> ResultSet {
    check_environment(root, token_model, backend)
        .iter()
        .map(CheckStatus::to_result_item)
        .collect()
}
