//! Disk cache for printing metadata and card images.
//!
//! Entries are content-addressed by deterministic filenames; file presence is
//! the existence check and there is no separate index or eviction.

mod disk;
mod keys;

pub use disk::DiskCache;
pub use keys::{cache_key, safe_filename, CacheKey, ImageCacheKey};
