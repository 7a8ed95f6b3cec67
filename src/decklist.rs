//! Decklist and token-query parsing.
//!
//! Accepts the common plain-text decklist shapes: optional leading quantity
//! ("4 Forest", "4x Forest"), comment lines starting with `#` or `//`, and
//! trailing set hints like "(2XM)" which are stripped. Token queries are free
//! Scryfall queries, one per line, prefixed with `type:token` if missing.

use crate::api::exact_name_query;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref QTY: Regex = Regex::new(r"(?i)^\s*(\d+)\s*x?\s+(.+?)\s*$").unwrap();
    static ref SET_HINT: Regex = Regex::new(r"\s*\([A-Z0-9]{2,6}\)\s*$").unwrap();
}

/// One card or token query the picker will resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckEntry {
    /// Display name, also the cache identity.
    pub name: String,
    /// Full Scryfall search query for this entry.
    pub query: String,
    pub quantity: u32,
}

/// Parse `(quantity, card name)` pairs out of a decklist.
pub fn parse_deck_quantities(text: &str) -> Vec<(u32, String)> {
    let mut out = Vec::new();
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        let (qty, name) = match QTY.captures(line) {
            Some(caps) => (
                caps[1].parse::<u32>().unwrap_or(1),
                caps[2].trim().to_string(),
            ),
            None => (1, line.to_string()),
        };
        let name = SET_HINT.replace(&name, "").trim().to_string();
        if !name.is_empty() {
            out.push((qty.max(1), name));
        }
    }
    out
}

/// Parse free-form token queries, one per line, ensuring each is scoped to
/// token cards.
pub fn parse_token_queries(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        if line.to_lowercase().contains("type:token") {
            out.push(line.to_string());
        } else {
            out.push(format!("type:token {}", line));
        }
    }
    out
}

/// Build the ordered entry list for a project: deduplicated cards with summed
/// quantities, then the token queries.
pub fn build_deck(deck_text: &str, token_text: &str) -> Vec<DeckEntry> {
    let mut entries: Vec<DeckEntry> = Vec::new();
    for (quantity, name) in parse_deck_quantities(deck_text) {
        if let Some(existing) = entries.iter_mut().find(|e| e.name == name) {
            existing.quantity += quantity;
        } else {
            entries.push(DeckEntry {
                query: exact_name_query(&name),
                name,
                quantity,
            });
        }
    }
    for (i, query) in parse_token_queries(token_text).into_iter().enumerate() {
        entries.push(DeckEntry {
            name: format!("Token Query {}: {}", i + 1, query),
            query,
            quantity: 1,
        });
    }
    entries
}
