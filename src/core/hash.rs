//! Content digests and order-independent digest combination
//!
//! Every cache record is keyed by a `Digest`. File digests depend on the
//! file bytes only; directory and codebase digests are folds of their
//! children's digests via [`combine`].

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Read buffer size for streaming file digests
const READ_BUF_SIZE: usize = 8 * 1024;

/// A SHA-256 fingerprint rendered as 64 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for logs and human-facing output
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Digest {
    fn from(s: String) -> Self {
        Digest(s)
    }
}

impl PartialEq<str> for Digest {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Compute the digest of a byte slice
pub fn digest(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest(format!("{:x}", hasher.finalize()))
}

/// Compute the digest of a file's content, streaming it from disk
pub fn digest_file(path: &Path) -> std::io::Result<Digest> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_BUF_SIZE];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(Digest(format!("{:x}", hasher.finalize())))
}

/// Fold several digests into one.
///
/// Inputs are sorted before concatenation, so the caller's ordering never
/// affects the result. `combine` of nothing is the digest of the empty string.
pub fn combine<'a, I>(digests: I) -> Digest
where
    I: IntoIterator<Item = &'a Digest>,
{
    let mut parts: Vec<&str> = digests.into_iter().map(Digest::as_str).collect();
    parts.sort_unstable();
    digest(parts.concat().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_digest_known_value() {
        // sha256("hello world")
        assert_eq!(
            digest(b"hello world").as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(digest(b"").as_str().len(), 64);
    }

    #[test]
    fn test_digest_is_lowercase_hex() {
        // sha256("abc"); bytes below 0x10 keep their leading zero
        let d = digest(b"abc");
        assert_eq!(
            d.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(d
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_digest_file_matches_digest_bytes() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a.py");
        let content = "x = 1\n".repeat(5000);
        std::fs::write(&path, &content).unwrap();

        assert_eq!(digest_file(&path).unwrap(), digest(content.as_bytes()));
    }

    #[test]
    fn test_digest_ignores_path() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("one.rs"), "fn main() {}").unwrap();
        std::fs::write(temp.path().join("two.rs"), "fn main() {}").unwrap();

        assert_eq!(
            digest_file(&temp.path().join("one.rs")).unwrap(),
            digest_file(&temp.path().join("two.rs")).unwrap()
        );
    }

    #[test]
    fn test_combine_order_independent() {
        let a = digest(b"a");
        let b = digest(b"b");
        assert_eq!(combine([&a, &b]), combine([&b, &a]));
    }

    #[test]
    fn test_combine_membership_sensitive() {
        let a = digest(b"a");
        let b = digest(b"b");
        let c = digest(b"c");
        assert_ne!(combine([&a, &b]), combine([&a, &b, &c]));
        assert_ne!(combine([&a, &b]), combine([&a]));
        assert_ne!(combine([&a, &b]), combine([&a, &c]));
    }

    #[test]
    fn test_combine_empty_is_constant() {
        let empty: Vec<Digest> = Vec::new();
        assert_eq!(combine(&empty), digest(b""));
        assert_eq!(combine(&empty), combine(std::iter::empty::<&Digest>()));
    }

    #[test]
    fn test_short() {
        let d = digest(b"abc");
        assert_eq!(d.short().len(), 12);
        assert!(d.as_str().starts_with(d.short()));
    }
}
