//! Bounded worker pools for background fetch work.
//!
//! Four concurrency domains share one owned tokio runtime; each domain is a
//! semaphore so one class of work cannot starve another. Jobs are blocking
//! closures (network and disk I/O) run on the blocking thread pool once a
//! permit is held, so submission never blocks the caller and the submission
//! queue is unbounded.

use crate::config::FetchConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;

/// Which concurrency domain a job runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolClass {
    Meta,
    Image,
    Preload,
    Download,
}

pub struct WorkerPools {
    runtime: Runtime,
    meta: Arc<Semaphore>,
    image: Arc<Semaphore>,
    preload: Arc<Semaphore>,
    download: Arc<Semaphore>,
}

impl WorkerPools {
    pub fn new(cfg: &FetchConfig) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("art-picker-pool")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            meta: Arc::new(Semaphore::new(cfg.meta_workers)),
            image: Arc::new(Semaphore::new(cfg.image_workers)),
            preload: Arc::new(Semaphore::new(cfg.preload_workers)),
            download: Arc::new(Semaphore::new(cfg.download_workers)),
        })
    }

    fn semaphore(&self, class: PoolClass) -> &Arc<Semaphore> {
        match class {
            PoolClass::Meta => &self.meta,
            PoolClass::Image => &self.image,
            PoolClass::Preload => &self.preload,
            PoolClass::Download => &self.download,
        }
    }

    /// Queue a blocking job in the given domain. Returns immediately; the job
    /// runs once a permit for its class is free. Jobs queued when the pools
    /// are shutting down are dropped without running.
    pub fn spawn<F>(&self, class: PoolClass, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let semaphore = self.semaphore(class).clone();
        self.runtime.spawn(async move {
            // acquire fails only after close(), i.e. during shutdown
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };
            let _ = tokio::task::spawn_blocking(job).await;
        });
    }

    /// Stop accepting new work and give running jobs `grace` to drain.
    ///
    /// Queued-but-not-started jobs are abandoned; running jobs are never
    /// interrupted mid-write, they either finish within the grace period or
    /// are detached with the runtime.
    pub fn shutdown(self, grace: Duration) {
        self.meta.close();
        self.image.close();
        self.preload.close();
        self.download.close();
        self.runtime.shutdown_timeout(grace);
    }
}
