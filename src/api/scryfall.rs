//! Scryfall search and image client.
//!
//! Search requests go through the rate limiter and follow pagination until the
//! full printing list is collected. Image requests hit the image CDN and are
//! not rate limited.

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};
use crate::fetch::{ByteFetcher, MetadataFetcher};
use crate::filters::{Border, FilterConfig, FrameEdition, FrameEffect, Stamp};
use crate::limiter::RateLimiter;
use crate::models::Printing;
use serde::Deserialize;
use std::time::Duration;

pub const SCRYFALL_API: &str = "https://api.scryfall.com";
const USER_AGENT: &str = "mtg-art-picker/1.0";

/// Exact-name search query for a card, e.g. `!"Lightning Bolt"`.
pub fn exact_name_query(name: &str) -> String {
    format!("!\"{}\"", name)
}

/// One page of a Scryfall search response
#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<ScryfallCard>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_page: Option<String>,
}

/// Scryfall card response, reduced to what the picker needs
#[derive(Debug, Deserialize, Clone)]
pub struct ScryfallCard {
    pub set: String,
    pub set_name: String,
    pub collector_number: String,
    #[serde(default)]
    pub released_at: Option<String>,
    #[serde(default)]
    pub scryfall_uri: Option<String>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    /// For double-faced cards, images are in card_faces
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ImageUris {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
    pub png: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CardFace {
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

impl ScryfallCard {
    /// Convert to a `Printing`, falling back through the available image
    /// sizes. Cards with no usable image at all (art series placeholders and
    /// the like) map to None and are dropped from results.
    pub fn into_printing(self) -> Option<Printing> {
        let uris = match self.image_uris {
            Some(uris) => uris,
            None => self
                .card_faces
                .and_then(|faces| faces.into_iter().next())
                .and_then(|face| face.image_uris)?,
        };
        let ImageUris {
            small,
            normal,
            large,
            png,
        } = uris;

        let small_url = small.or_else(|| normal.clone());
        let normal_url = normal
            .or_else(|| large.clone())
            .or_else(|| small_url.clone());
        let small_url = small_url.or_else(|| normal_url.clone());
        let (image_small, image_normal) = match (small_url, normal_url) {
            (Some(s), Some(n)) => (s, n),
            _ => return None,
        };

        Some(Printing {
            set_code: self.set,
            set_name: self.set_name,
            collector_number: self.collector_number,
            released_at: self.released_at.unwrap_or_default(),
            scryfall_uri: self.scryfall_uri.unwrap_or_default(),
            image_small,
            image_normal,
            image_png: png,
            image_large: large,
        })
    }
}

/// Scryfall API error response
#[derive(Debug, Deserialize)]
struct ScryfallError {
    pub code: String,
    pub details: String,
}

/// Scryfall search query terms for a filter configuration. Order is fixed so
/// identical configs produce identical queries.
fn filter_terms(filters: &FilterConfig) -> Vec<&'static str> {
    let mut terms = Vec::new();
    match filters.border {
        Border::Any => {}
        Border::Borderless => terms.push("border:borderless"),
        Border::Black => terms.push("border:black"),
        Border::White => terms.push("border:white"),
        Border::Silver => terms.push("border:silver"),
    }
    match filters.frame_edition {
        FrameEdition::Any => {}
        FrameEdition::Y1993 => terms.push("frame:1993"),
        FrameEdition::Y1997 => terms.push("frame:1997"),
        FrameEdition::Y2003 => terms.push("frame:2003"),
        FrameEdition::Y2015 => terms.push("frame:2015"),
        FrameEdition::Future => terms.push("frame:future"),
    }
    match filters.frame_effect {
        FrameEffect::Any => {}
        FrameEffect::Legendary => terms.push("frame:legendary"),
        FrameEffect::Colorshifted => terms.push("frame:colorshifted"),
        FrameEffect::Tombstone => terms.push("frame:tombstone"),
        FrameEffect::Enchantment => terms.push("frame:enchantment"),
    }
    if filters.is_full {
        terms.push("is:full");
    }
    if filters.is_hires {
        terms.push("is:hires");
    }
    if filters.is_default {
        terms.push("is:default");
    }
    if filters.is_atypical {
        terms.push("is:atypical");
    }
    if filters.exclude_ub {
        terms.push("not:universesbeyond");
    }
    match filters.stamp {
        Stamp::Any => {}
        Stamp::Oval => terms.push("stamp:oval"),
        Stamp::Acorn => terms.push("stamp:acorn"),
        Stamp::Triangle => terms.push("stamp:triangle"),
        Stamp::Arena => terms.push("stamp:arena"),
    }
    terms
}

pub struct ScryfallClient {
    base_url: String,
    client: reqwest::blocking::Client,
    limiter: RateLimiter,
    meta_timeout: Duration,
}

impl ScryfallClient {
    pub fn new(cfg: &FetchConfig) -> Self {
        Self::with_base_url(SCRYFALL_API, cfg)
    }

    /// Client against a custom base URL (tests point this at a mock server).
    pub fn with_base_url(base_url: &str, cfg: &FetchConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
            limiter: RateLimiter::new(cfg.min_api_interval),
            meta_timeout: cfg.meta_timeout,
        }
    }

    /// Run one search and collect all pages. A 404 means zero matches, not an
    /// error.
    fn search_printings(
        &self,
        query: &str,
        filters: Option<&FilterConfig>,
    ) -> FetchResult<Vec<Printing>> {
        let mut q = query.to_string();
        if let Some(f) = filters {
            for term in filter_terms(f) {
                q.push(' ');
                q.push_str(term);
            }
        }
        log::debug!("Searching printings: {}", q);

        let mut printings = Vec::new();
        let mut next_page: Option<String> = None;
        loop {
            self.limiter.wait();
            let request = match &next_page {
                Some(url) => self.client.get(url),
                None => self
                    .client
                    .get(format!("{}/cards/search", self.base_url))
                    .query(&[
                        ("q", q.as_str()),
                        ("unique", "prints"),
                        ("order", "released"),
                        ("dir", "desc"),
                    ]),
            };
            let response = request
                .header("User-Agent", USER_AGENT)
                .timeout(self.meta_timeout)
                .send()?;

            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                break;
            }
            if !status.is_success() {
                return Err(match response.json::<ScryfallError>() {
                    Ok(error) => FetchError::Api {
                        code: error.code,
                        details: error.details,
                    },
                    Err(_) => FetchError::HttpStatus(status),
                });
            }

            let page: SearchPage = response.json()?;
            printings.extend(page.data.into_iter().filter_map(ScryfallCard::into_printing));
            match (page.has_more, page.next_page) {
                (true, Some(url)) => next_page = Some(url),
                _ => break,
            }
        }

        log::debug!("{} printings for query '{}'", printings.len(), q);
        Ok(printings)
    }
}

impl MetadataFetcher for ScryfallClient {
    fn fetch_printings(
        &self,
        query: &str,
        filters: Option<&FilterConfig>,
    ) -> FetchResult<Vec<Printing>> {
        // Borderless preference: try the borderless-only query first and fall
        // back to the unrestricted one when it matches nothing.
        if let Some(f) = filters {
            if f.prefer_borderless && f.border == Border::Any {
                let preferred = FilterConfig {
                    border: Border::Borderless,
                    ..*f
                };
                let hits = self.search_printings(query, Some(&preferred))?;
                if !hits.is_empty() {
                    return Ok(hits);
                }
            }
        }
        self.search_printings(query, filters)
    }
}

impl ByteFetcher for ScryfallClient {
    fn fetch_bytes(&self, url: &str, timeout: Duration) -> FetchResult<Vec<u8>> {
        log::debug!("Fetching image: {}", url);
        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .timeout(timeout)
            .send()?;

        if response.status().is_success() {
            Ok(response.bytes()?.to_vec())
        } else {
            Err(FetchError::HttpStatus(response.status()))
        }
    }
}

#[cfg(test)]
#[path = "scryfall_tests.rs"]
mod tests;
