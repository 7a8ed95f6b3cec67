//! Ties the fetch/cache layer together: decides memory-hit, disk-hit,
//! dedupe-decline or pool submission for every request, and owns all shared
//! state. The presentation layer calls the methods here from its own thread
//! and drains the delivery channel; it never blocks on network or disk.

use crate::cache::{CacheKey, DiskCache, ImageCacheKey};
use crate::config::FetchConfig;
use crate::dispatch::{Delivery, OverrideState, ResultDispatcher};
use crate::download::{run_download_batch, DownloadItem};
use crate::error::FetchError;
use crate::fetch::{ByteFetcher, MetadataFetcher};
use crate::filters::{FilterConfig, SIG_ALL};
use crate::models::{ImageKind, Printing};
use crate::pools::{PoolClass, WorkerPools};
use crate::registry::{FetchKey, FetchKeyRegistry};
use crate::token::{GenerationTokens, ResultClass};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Outcome of an `ensure_metadata` call, decided synchronously.
#[derive(Debug, Clone)]
pub enum MetaStatus {
    /// The printing list is resolved (memory or disk); no fetch was needed.
    Ready(Arc<Vec<Printing>>),
    /// A fetch is outstanding (just submitted, or already in flight); the
    /// result arrives on the delivery channel.
    Pending,
}

pub struct Orchestrator {
    cfg: FetchConfig,
    pools: WorkerPools,
    cache: Arc<DiskCache>,
    registry: Arc<FetchKeyRegistry>,
    tokens: Arc<GenerationTokens>,
    overrides: Arc<Mutex<OverrideState>>,
    dispatcher: Arc<ResultDispatcher>,
    /// Resolved printing lists, held for the life of the process. Unbounded;
    /// card catalogs are small.
    meta_by_key: Arc<Mutex<HashMap<CacheKey, Arc<Vec<Printing>>>>>,
    fetcher: Arc<dyn MetadataFetcher>,
    bytes: Arc<dyn ByteFetcher>,
    download_cancel: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Build the orchestrator with its cache rooted at `cache_root`. Returns
    /// the receiver the consumer drains for deliveries.
    pub fn new(
        cache_root: &Path,
        fetcher: Arc<dyn MetadataFetcher>,
        bytes: Arc<dyn ByteFetcher>,
        cfg: FetchConfig,
    ) -> std::io::Result<(Self, UnboundedReceiver<Delivery>)> {
        let pools = WorkerPools::new(&cfg)?;
        let tokens = Arc::new(GenerationTokens::new());
        let overrides = Arc::new(Mutex::new(OverrideState::default()));
        let (dispatcher, rx) = ResultDispatcher::new(tokens.clone(), overrides.clone());
        Ok((
            Self {
                cfg,
                pools,
                cache: Arc::new(DiskCache::new(cache_root)),
                registry: Arc::new(FetchKeyRegistry::new()),
                tokens,
                overrides,
                dispatcher: Arc::new(dispatcher),
                meta_by_key: Arc::new(Mutex::new(HashMap::new())),
                fetcher,
                bytes,
                download_cancel: Arc::new(AtomicBool::new(false)),
            },
            rx,
        ))
    }

    // ---------------- context / tokens ----------------

    /// Tell the dispatcher what the consumer is displaying. Call on every
    /// navigation and filter change; invalidates all outstanding image work.
    pub fn set_context(&self, item: &str, filters: &FilterConfig) {
        self.dispatcher.set_context(item, &filters.signature());
        self.tokens.bump_all();
    }

    /// Invalidate outstanding work for one result class (e.g. the thumb strip
    /// after a structural rebuild).
    pub fn bump(&self, class: ResultClass) -> u64 {
        self.tokens.bump(class)
    }

    pub fn bump_all(&self) {
        self.tokens.bump_all();
    }

    /// Toggle the per-item "all printings" override. Returns the new state.
    /// Turning it off also clears the auto-relaxed mark so the filter applies
    /// again.
    pub fn toggle_all_prints(&self, item: &str) -> bool {
        let enabled = {
            let mut ov = self.overrides.lock().expect("override state poisoned");
            if ov.all_prints.remove(item) {
                ov.auto_relaxed.remove(item);
                false
            } else {
                ov.all_prints.insert(item.to_string());
                true
            }
        };
        self.tokens.bump_all();
        enabled
    }

    pub fn is_all_prints(&self, item: &str) -> bool {
        self.overrides
            .lock()
            .expect("override state poisoned")
            .all_prints
            .contains(item)
    }

    pub fn is_auto_relaxed(&self, item: &str) -> bool {
        self.overrides
            .lock()
            .expect("override state poisoned")
            .auto_relaxed
            .contains(item)
    }

    /// The signature results for `item` resolve under right now: "ALL" when
    /// the item is in all-prints mode, else the filter signature.
    pub fn effective_signature(&self, item: &str, filters: &FilterConfig) -> String {
        if self.is_all_prints(item) {
            SIG_ALL.to_string()
        } else {
            filters.signature()
        }
    }

    // ---------------- metadata ----------------

    /// Idempotent: resolve the printing list for `(item, effective signature)`.
    ///
    /// Memory hit and disk hit return `Ready` synchronously. Otherwise a
    /// fetch is submitted to the meta pool unless one is already in flight
    /// for the same key, and the result arrives as a `MetaReady`/`MetaFailed`
    /// delivery. `query` is the raw search query for the item (exact-name or
    /// token query); the fetcher owns its syntax.
    pub fn ensure_metadata(&self, item: &str, query: &str, filters: &FilterConfig) -> MetaStatus {
        let all_prints = self.is_all_prints(item);
        let signature = if all_prints {
            SIG_ALL.to_string()
        } else {
            filters.signature()
        };
        let key = CacheKey::new(item, signature.clone());

        if let Some(printings) = self.meta_by_key.lock().expect("meta map poisoned").get(&key) {
            return MetaStatus::Ready(printings.clone());
        }

        if let Some(printings) = self.cache.get_meta(&key) {
            let printings = Arc::new(printings);
            self.meta_by_key
                .lock()
                .expect("meta map poisoned")
                .insert(key, printings.clone());
            return MetaStatus::Ready(printings);
        }

        let Some(guard) = self.registry.try_begin(FetchKey::Meta(key.clone())) else {
            // A prior submission will populate memory; the next refresh sees it.
            return MetaStatus::Pending;
        };

        let item = item.to_string();
        let query = query.to_string();
        let filters = if all_prints { None } else { Some(*filters) };
        let fetcher = self.fetcher.clone();
        let cache = self.cache.clone();
        let overrides = self.overrides.clone();
        let meta_by_key = self.meta_by_key.clone();
        let dispatcher = self.dispatcher.clone();
        let threshold = self.cfg.auto_relax_threshold;

        log::debug!("Fetching printings for item={} sig={}", item, signature);
        self.pools.spawn(PoolClass::Meta, move || {
            let mut printings = match fetcher.fetch_printings(&query, filters.as_ref()) {
                Ok(printings) => printings,
                Err(error) => {
                    log::error!("Metadata fetch failed for {}: {}", item, error);
                    drop(guard);
                    dispatcher.deliver(
                        0,
                        Delivery::MetaFailed {
                            item,
                            signature,
                            error,
                        },
                    );
                    return;
                }
            };

            // Auto-relax: a narrowing filter that leaves almost nothing gets
            // dropped for this item, for the rest of the session.
            let mut signature = signature;
            let mut auto_relaxed = false;
            if let Some(f) = filters.as_ref() {
                if f.narrows() && !printings.is_empty() && printings.len() < threshold {
                    log::info!(
                        "Only {} filtered printings for {}, retrying unfiltered",
                        printings.len(),
                        item
                    );
                    match fetcher.fetch_printings(&query, None) {
                        Ok(all) if !all.is_empty() => {
                            printings = all;
                            signature = SIG_ALL.to_string();
                            auto_relaxed = true;
                        }
                        Ok(_) => {}
                        Err(error) => {
                            log::error!("Unfiltered re-fetch failed for {}: {}", item, error);
                            drop(guard);
                            dispatcher.deliver(
                                0,
                                Delivery::MetaFailed {
                                    item,
                                    signature,
                                    error,
                                },
                            );
                            return;
                        }
                    }
                }
            }

            let printings = Arc::new(printings);
            let final_key = CacheKey::new(item.clone(), signature.clone());
            cache.put_meta(&final_key, &printings);
            if auto_relaxed {
                let mut ov = overrides.lock().expect("override state poisoned");
                ov.all_prints.insert(item.clone());
                ov.auto_relaxed.insert(item.clone());
            }
            meta_by_key
                .lock()
                .expect("meta map poisoned")
                .insert(final_key, printings.clone());
            drop(guard);
            dispatcher.deliver(
                0,
                Delivery::MetaReady {
                    item,
                    signature,
                    printings,
                    auto_relaxed,
                },
            );
        });

        MetaStatus::Pending
    }

    // ---------------- images ----------------

    /// Idempotent: deliver the image at `index` of the current printing list.
    ///
    /// The generation token for `class` is captured here, at submission time.
    /// Cache hits are delivered synchronously; misses go to the image pool
    /// unless the same key is already being fetched.
    pub fn load_image(
        &self,
        class: ResultClass,
        kind: ImageKind,
        item: &str,
        signature: &str,
        index: usize,
        url: &str,
    ) {
        if url.is_empty() {
            return;
        }
        let token = self.tokens.current(class);
        let key = ImageCacheKey::new(CacheKey::new(item, signature), kind, index);

        if let Some(bytes) = self.cache.get_image(&key) {
            match image::guess_format(&bytes) {
                Ok(_) => {
                    self.dispatcher.deliver(
                        token,
                        Delivery::ImageReady {
                            class,
                            kind,
                            item: item.to_string(),
                            signature: signature.to_string(),
                            index,
                            bytes: Arc::new(bytes),
                        },
                    );
                    return;
                }
                Err(e) => {
                    // Corrupt cache entry: treat as a miss and re-fetch.
                    log::warn!("Cached image for {:?} does not decode: {}", key, e);
                }
            }
        }

        let Some(guard) = self.registry.try_begin(FetchKey::Image(key.clone())) else {
            return;
        };

        let item = item.to_string();
        let signature = signature.to_string();
        let url = url.to_string();
        let fetcher = self.bytes.clone();
        let cache = self.cache.clone();
        let dispatcher = self.dispatcher.clone();
        let timeout = self.cfg.image_timeout;

        self.pools.spawn(PoolClass::Image, move || {
            match fetcher.fetch_bytes(&url, timeout) {
                Ok(bytes) => {
                    cache.put_image(&key, &bytes);
                    match image::guess_format(&bytes) {
                        Ok(_) => dispatcher.deliver(
                            token,
                            Delivery::ImageReady {
                                class,
                                kind,
                                item,
                                signature,
                                index,
                                bytes: Arc::new(bytes),
                            },
                        ),
                        Err(e) => dispatcher.deliver(
                            token,
                            Delivery::ImageFailed {
                                class,
                                kind,
                                item,
                                signature,
                                index,
                                error: FetchError::Decode(e.to_string()),
                            },
                        ),
                    }
                }
                Err(error) => {
                    log::error!("Image fetch failed for {}: {}", url, error);
                    dispatcher.deliver(
                        token,
                        Delivery::ImageFailed {
                            class,
                            kind,
                            item,
                            signature,
                            index,
                            error,
                        },
                    );
                }
            }
            drop(guard);
        });
    }

    // ---------------- prefetch (cache warming) ----------------

    /// Fire-and-forget: warm the disk cache for one image. No delivery, no
    /// token bookkeeping; skips entirely if already cached or in flight.
    pub fn prefetch(&self, kind: ImageKind, item: &str, signature: &str, index: usize, url: &str) {
        if url.is_empty() {
            return;
        }
        let key = ImageCacheKey::new(CacheKey::new(item, signature), kind, index);
        if self.cache.contains_image(&key) {
            return;
        }
        let url = url.to_string();
        let fetcher = self.bytes.clone();
        let cache = self.cache.clone();
        let registry = self.registry.clone();
        let timeout = match kind {
            ImageKind::Small => self.cfg.preload_small_timeout,
            ImageKind::Normal => self.cfg.preload_normal_timeout,
        };
        self.pools.spawn(PoolClass::Preload, move || {
            warm_image(&cache, &registry, fetcher.as_ref(), key, &url, timeout);
        });
    }

    /// Warm the cache for a neighbouring card (typically the next one in the
    /// deck) using only already-cached metadata: the first few thumbnails and
    /// big previews. If its metadata is not cached yet, does nothing.
    pub fn prefetch_card(&self, item: &str, filters: &FilterConfig) {
        let signature = self.effective_signature(item, filters);
        let key = CacheKey::new(item, signature);
        let cache = self.cache.clone();
        let registry = self.registry.clone();
        let fetcher = self.bytes.clone();
        let thumbs = self.cfg.preload_thumbs;
        let big = self.cfg.preload_big;
        let small_timeout = self.cfg.preload_small_timeout;
        let normal_timeout = self.cfg.preload_normal_timeout;

        self.pools.spawn(PoolClass::Preload, move || {
            let Some(printings) = cache.get_meta(&key) else {
                return;
            };
            for (i, p) in printings.iter().take(thumbs).enumerate() {
                let ikey = ImageCacheKey::new(key.clone(), ImageKind::Small, i);
                warm_image(
                    &cache,
                    &registry,
                    fetcher.as_ref(),
                    ikey,
                    &p.image_small,
                    small_timeout,
                );
            }
            for (i, p) in printings.iter().take(big).enumerate() {
                let ikey = ImageCacheKey::new(key.clone(), ImageKind::Normal, i);
                warm_image(
                    &cache,
                    &registry,
                    fetcher.as_ref(),
                    ikey,
                    &p.image_normal,
                    normal_timeout,
                );
            }
        });
    }

    // ---------------- downloads ----------------

    /// Queue a batch download. Progress and the terminal outcome arrive as
    /// ungated deliveries. The download pool has one worker, so batches are
    /// serialized.
    pub fn download_batch(&self, items: Vec<DownloadItem>, dest: &Path) {
        self.download_cancel.store(false, Ordering::SeqCst);
        let dest = dest.to_path_buf();
        let fetcher = self.bytes.clone();
        let dispatcher = self.dispatcher.clone();
        let cancel = self.download_cancel.clone();
        let timeout = self.cfg.download_timeout;
        self.pools.spawn(PoolClass::Download, move || {
            run_download_batch(items, dest, fetcher, dispatcher, cancel, timeout);
        });
    }

    /// Cooperative: the running batch stops before its next item.
    pub fn cancel_download(&self) {
        self.download_cancel.store(true, Ordering::SeqCst);
    }

    // ---------------- lifecycle ----------------

    /// Stop accepting work and give running jobs a grace period to drain.
    pub fn shutdown(self, grace: Duration) {
        self.pools.shutdown(grace);
    }
}

/// Cache-warming body shared by `prefetch` and `prefetch_card`. Re-checks the
/// cache under the in-flight guard; failures are logged and swallowed, the
/// next interactive load will retry.
fn warm_image(
    cache: &DiskCache,
    registry: &FetchKeyRegistry,
    fetcher: &dyn ByteFetcher,
    key: ImageCacheKey,
    url: &str,
    timeout: Duration,
) {
    if url.is_empty() || cache.contains_image(&key) {
        return;
    }
    let Some(_guard) = registry.try_begin(FetchKey::Image(key.clone())) else {
        return;
    };
    match fetcher.fetch_bytes(url, timeout) {
        Ok(bytes) => cache.put_image(&key, &bytes),
        Err(e) => log::debug!("Prefetch failed for {:?}: {}", key, e),
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
