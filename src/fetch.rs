//! Collaborator contracts for the actual network I/O.
//!
//! The orchestrator never talks to Scryfall directly; it drives these traits.
//! Implementations must be safe to call concurrently from different workers.

use crate::error::FetchResult;
use crate::filters::FilterConfig;
use crate::models::Printing;
use std::time::Duration;

/// Fetches the full printing list for a query, applying API rate limiting
/// internally. `filters` of None means "all printings, no filter terms".
pub trait MetadataFetcher: Send + Sync + 'static {
    fn fetch_printings(
        &self,
        query: &str,
        filters: Option<&FilterConfig>,
    ) -> FetchResult<Vec<Printing>>;
}

/// Fetches raw bytes from an image URL. Not rate limited; image hosting does
/// not require it.
pub trait ByteFetcher: Send + Sync + 'static {
    fn fetch_bytes(&self, url: &str, timeout: Duration) -> FetchResult<Vec<u8>>;
}
