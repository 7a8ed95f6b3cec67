//! API client for Scryfall.

pub mod scryfall;

// Re-exports for public API convenience
#[allow(unused_imports)]
pub use scryfall::{exact_name_query, ScryfallClient};
