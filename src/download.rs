//! Batch download of selected card images to a destination directory.
//!
//! Runs as a single job on the download pool: items are processed in order,
//! existing destination files are skipped (idempotent resume), a cancellation
//! flag is checked between items, and one failed item aborts the whole batch
//! with a single terminal error.

use crate::cache::safe_filename;
use crate::dispatch::{Delivery, ResultDispatcher};
use crate::fetch::ByteFetcher;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One resolved selection to download.
#[derive(Debug, Clone)]
pub struct DownloadItem {
    /// Display name; sanitized into the destination filename.
    pub name: String,
    /// Full-quality image URL (png preferred by the caller).
    pub url: String,
    /// Extension matching the URL's format, e.g. "png" or "jpg".
    pub ext: String,
    /// How many copies to write; copies beyond the first get " (n)" suffixes.
    pub copies: u32,
}

impl DownloadItem {
    /// Destination paths for every copy of this item.
    pub fn dest_paths(&self, dir: &Path) -> Vec<PathBuf> {
        (1..=self.copies.max(1))
            .map(|copy| {
                let suffix = if self.copies > 1 {
                    format!(" ({})", copy)
                } else {
                    String::new()
                };
                dir.join(format!(
                    "{}{}.{}",
                    safe_filename(&self.name),
                    suffix,
                    self.ext
                ))
            })
            .collect()
    }
}

/// The download-pool job body. Sequential by design: the pool has one worker,
/// so writes into the destination directory never interleave.
pub fn run_download_batch(
    items: Vec<DownloadItem>,
    dest: PathBuf,
    fetcher: Arc<dyn ByteFetcher>,
    dispatcher: Arc<ResultDispatcher>,
    cancel: Arc<AtomicBool>,
    timeout: Duration,
) {
    let total = items.len();
    log::info!("Download started: {} items -> {:?}", total, dest);

    if let Err(e) = std::fs::create_dir_all(&dest) {
        log::error!("Failed to create download directory {:?}: {}", dest, e);
        dispatcher.deliver(0, Delivery::DownloadFailed { error: e.into() });
        return;
    }

    let mut cancelled = false;
    for (i, item) in items.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            log::info!("Download cancelled after {} of {} items", i, total);
            cancelled = true;
            break;
        }

        let missing: Vec<PathBuf> = item
            .dest_paths(&dest)
            .into_iter()
            .filter(|p| !p.exists())
            .collect();

        if missing.is_empty() {
            log::debug!("Skipping {}: all copies already downloaded", item.name);
        } else {
            let bytes = match fetcher.fetch_bytes(&item.url, timeout) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::error!("Download failed at {}: {}", item.name, e);
                    dispatcher.deliver(0, Delivery::DownloadFailed { error: e });
                    return;
                }
            };
            for path in &missing {
                if let Err(e) = std::fs::write(path, &bytes) {
                    log::error!("Failed to write {:?}: {}", path, e);
                    dispatcher.deliver(0, Delivery::DownloadFailed { error: e.into() });
                    return;
                }
            }
        }

        dispatcher.deliver(
            0,
            Delivery::DownloadProgress {
                completed: i + 1,
                total,
            },
        );
    }

    log::info!("Download finished ({} items, cancelled={})", total, cancelled);
    dispatcher.deliver(
        0,
        Delivery::DownloadFinished {
            dest,
            cancelled,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_copy_path_has_no_suffix() {
        let item = DownloadItem {
            name: "Lightning Bolt [LEA 161]".to_string(),
            url: "https://img/bolt.png".to_string(),
            ext: "png".to_string(),
            copies: 1,
        };
        let paths = item.dest_paths(Path::new("/out"));
        assert_eq!(paths, vec![PathBuf::from("/out/Lightning Bolt [LEA 161].png")]);
    }

    #[test]
    fn copies_get_numbered_suffixes() {
        let item = DownloadItem {
            name: "Forest".to_string(),
            url: "https://img/forest.jpg".to_string(),
            ext: "jpg".to_string(),
            copies: 3,
        };
        let paths = item.dest_paths(Path::new("/out"));
        assert_eq!(paths.len(), 3);
        assert!(paths[0].ends_with("Forest (1).jpg"));
        assert!(paths[2].ends_with("Forest (3).jpg"));
    }

    #[test]
    fn illegal_name_characters_are_sanitized() {
        let item = DownloadItem {
            name: "Who/What?".to_string(),
            url: "https://img/x.png".to_string(),
            ext: "png".to_string(),
            copies: 1,
        };
        let paths = item.dest_paths(Path::new("/out"));
        assert_eq!(paths[0].file_name().unwrap(), "Who_What_.png");
    }
}
