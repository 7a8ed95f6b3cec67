//! Persistent cache for printing metadata and image bytes.
//!
//! Layout under the project cache root:
//!   meta/              JSON printing lists
//!   images/small/      thumbnail bytes
//!   images/normal/     preview bytes
//!
//! Writes are best-effort: a failed write is logged and swallowed and the only
//! consequence is a future cache miss. Unreadable or corrupt entries read as
//! absent, which triggers a fresh fetch.

use crate::cache::keys::{CacheKey, ImageCacheKey};
use crate::models::{ImageKind, Printing};
use std::path::{Path, PathBuf};

pub struct DiskCache {
    meta_dir: PathBuf,
    small_dir: PathBuf,
    normal_dir: PathBuf,
}

impl DiskCache {
    /// Create a cache rooted at `root`, creating the subtree if needed.
    pub fn new(root: &Path) -> Self {
        let meta_dir = root.join("meta");
        let small_dir = root.join("images").join(ImageKind::Small.dir_name());
        let normal_dir = root.join("images").join(ImageKind::Normal.dir_name());

        for dir in [&meta_dir, &small_dir, &normal_dir] {
            if let Err(e) = std::fs::create_dir_all(dir) {
                log::warn!("Failed to create cache directory {:?}: {}", dir, e);
            }
        }
        log::info!("Disk cache root: {:?}", root);

        Self {
            meta_dir,
            small_dir,
            normal_dir,
        }
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.meta_dir.join(key.meta_file_name())
    }

    fn image_path(&self, key: &ImageCacheKey) -> PathBuf {
        let base = match key.kind {
            ImageKind::Small => &self.small_dir,
            ImageKind::Normal => &self.normal_dir,
        };
        base.join(key.file_name())
    }

    /// Get a cached printing list, or None on miss or corrupt entry.
    pub fn get_meta(&self, key: &CacheKey) -> Option<Vec<Printing>> {
        let path = self.meta_path(key);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(printings) => {
                log::debug!("Meta cache hit for {}/{}", key.item, key.signature);
                Some(printings)
            }
            Err(e) => {
                log::warn!(
                    "Corrupt meta cache entry for {}/{}, treating as miss: {}",
                    key.item,
                    key.signature,
                    e
                );
                None
            }
        }
    }

    /// Store a printing list. Failures are logged and swallowed.
    pub fn put_meta(&self, key: &CacheKey, printings: &[Printing]) {
        let path = self.meta_path(key);
        match serde_json::to_string(printings) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::warn!(
                        "Failed to write meta cache for {}/{}: {}",
                        key.item,
                        key.signature,
                        e
                    );
                }
            }
            Err(e) => {
                log::warn!(
                    "Failed to serialize printings for {}/{}: {}",
                    key.item,
                    key.signature,
                    e
                );
            }
        }
    }

    pub fn contains_image(&self, key: &ImageCacheKey) -> bool {
        self.image_path(key).exists()
    }

    /// Get cached image bytes, or None on miss.
    pub fn get_image(&self, key: &ImageCacheKey) -> Option<Vec<u8>> {
        std::fs::read(self.image_path(key)).ok()
    }

    /// Store image bytes. Failures are logged and swallowed.
    pub fn put_image(&self, key: &ImageCacheKey, bytes: &[u8]) {
        let path = self.image_path(key);
        if let Err(e) = std::fs::write(&path, bytes) {
            log::warn!(
                "Failed to write {} image cache for {}/{} [{}]: {}",
                key.kind.dir_name(),
                key.key.item,
                key.key.signature,
                key.index,
                e
            );
        }
    }
}
