//! Tunables for the fetch/cache layer.

use std::time::Duration;

/// Pool sizes, timeouts and heuristics, with defaults sized so background work
/// can never crowd out interactive image loads.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Metadata fetch workers (lower priority than images).
    pub meta_workers: usize,
    /// Interactive image fetch workers.
    pub image_workers: usize,
    /// Cache-warming workers.
    pub preload_workers: usize,
    /// Batch download workers. One, so file writes into a single destination
    /// directory never interleave and progress stays deterministic.
    pub download_workers: usize,

    /// Minimum spacing between Scryfall API calls.
    pub min_api_interval: Duration,
    pub meta_timeout: Duration,
    pub image_timeout: Duration,
    pub download_timeout: Duration,
    pub preload_small_timeout: Duration,
    pub preload_normal_timeout: Duration,

    /// A filtered result below this count (but non-empty) triggers the
    /// auto-relax re-fetch with no filter.
    pub auto_relax_threshold: usize,
    /// Next-card thumbnails warmed by `prefetch_card`.
    pub preload_thumbs: usize,
    /// Next-card full previews warmed by `prefetch_card`.
    pub preload_big: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            meta_workers: 2,
            image_workers: 4,
            preload_workers: 2,
            download_workers: 1,
            min_api_interval: Duration::from_millis(120),
            meta_timeout: Duration::from_secs(30),
            image_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(90),
            preload_small_timeout: Duration::from_secs(25),
            preload_normal_timeout: Duration::from_secs(40),
            auto_relax_threshold: 5,
            preload_thumbs: 30,
            preload_big: 2,
        }
    }
}
