//! Cache key types and filename derivation.

use crate::models::ImageKind;
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref ILLEGAL_CHARS: Regex = Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Sanitizes a card name (or any string) into something safe for a filename.
pub fn safe_filename(name: &str) -> String {
    let replaced = ILLEGAL_CHARS.replace_all(name, "_");
    let collapsed = WHITESPACE.replace_all(&replaced, " ");
    let trimmed = collapsed.trim();
    trimmed.chars().take(180).collect()
}

/// Filename stem for one card: sanitized name plus a short content hash so
/// names that sanitize to the same string still get distinct cache files.
pub fn cache_key(item: &str) -> String {
    let digest = Sha256::digest(item.as_bytes());
    let mut hash = String::with_capacity(10);
    for byte in digest.iter().take(5) {
        hash.push_str(&format!("{:02x}", byte));
    }
    format!("{}_{}", safe_filename(item), hash)
}

/// Identity of one metadata cache entry: the card plus the filter signature
/// that produced its printing list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub item: String,
    pub signature: String,
}

impl CacheKey {
    pub fn new(item: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            signature: signature.into(),
        }
    }

    /// Metadata cache filename for this key.
    pub fn meta_file_name(&self) -> String {
        format!("{}__{}.json", cache_key(&self.item), self.signature)
    }
}

/// Identity of one cached image: a metadata key plus size and position.
///
/// Images are keyed by list position rather than URL; position is stable for
/// a given (item, signature) result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageCacheKey {
    pub key: CacheKey,
    pub kind: ImageKind,
    pub index: usize,
}

impl ImageCacheKey {
    pub fn new(key: CacheKey, kind: ImageKind, index: usize) -> Self {
        Self { key, kind, index }
    }

    /// Image cache filename (relative to the kind subdirectory).
    pub fn file_name(&self) -> String {
        format!(
            "{}__{}__{}.img",
            cache_key(&self.key.item),
            self.key.signature,
            self.index
        )
    }
}
