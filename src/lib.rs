pub mod api;
pub mod cache;
pub mod config;
pub mod decklist;
pub mod dispatch;
pub mod download;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod limiter;
pub mod models;
pub mod orchestrator;
pub mod pools;
pub mod registry;
pub mod token;

// Re-export commonly used items
pub use api::{exact_name_query, ScryfallClient};
pub use cache::{cache_key, safe_filename, CacheKey, DiskCache, ImageCacheKey};
pub use config::FetchConfig;
pub use decklist::{build_deck, DeckEntry};
pub use dispatch::{Delivery, ResultDispatcher};
pub use download::DownloadItem;
pub use error::{FetchError, FetchResult};
pub use fetch::{ByteFetcher, MetadataFetcher};
pub use filters::{FilterConfig, SIG_ALL};
pub use models::{ImageKind, Printing, PrintingsFingerprint};
pub use orchestrator::{MetaStatus, Orchestrator};
pub use token::ResultClass;
