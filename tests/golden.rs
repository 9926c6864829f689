//! Golden tests for tierdoc
//!
//! These tests verify that command outputs over the sample project match
//! known-good structure and values. Golden tests ensure:
//! - Output format stability across versions
//! - Stable entity keys, ordering and digests
//! - No unexpected regressions in output structure

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;

/// Get the path to the fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get the path to the sample project
fn sample_project() -> PathBuf {
    fixtures_dir().join("sample_project")
}

/// Create a command for running the tierdoc binary
fn tierdoc_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tierdoc"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Status of the sample project, with a cache path that never exists so
/// the fixture is never written to
fn status_cmd() -> Command {
    let mut cmd = tierdoc_cmd();
    cmd.arg("--root")
        .arg(sample_project())
        .arg("status")
        .arg("--cache")
        .arg(fixtures_dir().join("missing").join("summary_cache.json"));
    cmd
}

/// Parse JSONL output into a vector of JSON values
fn parse_jsonl(output: &str) -> Vec<Value> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str::<Value>(l).ok())
        .collect()
}

fn digest_of<'a>(items: &'a [Value], kind: &str, path: &str) -> Option<&'a str> {
    items
        .iter()
        .find(|v| {
            v.get("kind").and_then(|k| k.as_str()) == Some(kind)
                && v.get("path").and_then(|p| p.as_str()).unwrap_or("") == path
        })
        .and_then(|v| v.pointer("/meta/digest"))
        .and_then(|d| d.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Status Tests ====================

    #[test]
    fn golden_status_structure() {
        let output = status_cmd().output().expect("failed to execute");
        let stdout = String::from_utf8_lossy(&output.stdout);
        let items = parse_jsonl(&stdout);

        // 3 files, 2 directories, 1 codebase; README.md is not source
        assert_eq!(items.len(), 6, "Expected 6 entities");

        let keys: Vec<(&str, &str)> = items
            .iter()
            .map(|v| {
                (
                    v.get("kind").and_then(|k| k.as_str()).unwrap(),
                    v.get("path").and_then(|p| p.as_str()).unwrap_or(""),
                )
            })
            .collect();

        assert_eq!(
            keys,
            vec![
                ("file", "main.py"),
                ("file", "pkg/models.py"),
                ("file", "pkg/util.rs"),
                ("directory", "."),
                ("directory", "pkg"),
                ("codebase", ""),
            ],
            "Entities should be sorted bottom-up, then by key"
        );

        for item in &items {
            assert_eq!(item.get("status").and_then(|v| v.as_str()), Some("stale"));
            let meta = item.get("meta").expect("meta required");
            let digest = meta.get("digest").and_then(|d| d.as_str()).unwrap();
            assert_eq!(digest.len(), 64, "digests are hex SHA-256");
            assert!(meta.get("truncated").is_some(), "truncated should be present");
        }
    }

    #[test]
    fn golden_status_digests() {
        let output = status_cmd().output().expect("failed to execute");
        let stdout = String::from_utf8_lossy(&output.stdout);
        let items = parse_jsonl(&stdout);

        assert_eq!(
            digest_of(&items, "file", "main.py"),
            Some("d49a412f997af31e19595ea01ad268638de6a2c640b89c4b478432fcafc4d7e9")
        );
        assert_eq!(
            digest_of(&items, "file", "pkg/util.rs"),
            Some("2a53ade6d1f91634005c2345ad056cad971dca32466b94fd412cf87a36944a17")
        );
        assert_eq!(
            digest_of(&items, "directory", "pkg"),
            Some("2739038d5d0f8f4615f41d02cc5c52845511ea550b6a2fbad362303f0428e61b")
        );
    }

    #[test]
    fn golden_status_is_deterministic() {
        let first = status_cmd().output().expect("failed to execute");
        let second = status_cmd().output().expect("failed to execute");
        assert_eq!(first.stdout, second.stdout);
    }

    // ==================== Format Tests ====================

    #[test]
    fn golden_status_json_format() {
        let output = status_cmd()
            .arg("--format")
            .arg("json")
            .output()
            .expect("failed to execute");
        let stdout = String::from_utf8_lossy(&output.stdout);

        let parsed: Value = serde_json::from_str(&stdout).expect("valid json");
        let array = parsed.as_array().expect("json output is an array");
        assert_eq!(array.len(), 6);
    }

    #[test]
    fn golden_status_markdown_format() {
        status_cmd()
            .arg("--format")
            .arg("md")
            .assert()
            .success()
            .stdout(predicate::str::contains("## Codebase"))
            .stdout(predicate::str::contains("## Directories"))
            .stdout(predicate::str::contains("## Files"))
            .stdout(predicate::str::contains("### `pkg/models.py` (stale)"));
    }

    #[test]
    fn golden_status_ext_filter() {
        let output = status_cmd()
            .arg("--ext")
            .arg("rs")
            .output()
            .expect("failed to execute");
        let stdout = String::from_utf8_lossy(&output.stdout);
        let items = parse_jsonl(&stdout);

        let paths: Vec<&str> = items
            .iter()
            .filter_map(|v| v.get("path").and_then(|p| p.as_str()))
            .collect();
        assert_eq!(paths, vec!["pkg/util.rs", "pkg"]);
    }

    // ==================== Doctor Tests ====================

    #[test]
    fn golden_doctor_check_names() {
        let output = tierdoc_cmd()
            .arg("--root")
            .arg(sample_project())
            .arg("doctor")
            .arg("--tokenizer")
            .arg("heuristic")
            .output()
            .expect("failed to execute");
        let stdout = String::from_utf8_lossy(&output.stdout);
        let items = parse_jsonl(&stdout);

        let names: Vec<&str> = items
            .iter()
            .filter_map(|v| v.get("path").and_then(|p| p.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                "tokenizer",
                "grammar-python",
                "grammar-rust",
                "api-key",
                "base-url",
                "cache-dir"
            ]
        );
    }
}
