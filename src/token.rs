//! Generation tokens: cheap staleness control for asynchronous results.
//!
//! One monotonically increasing counter per result class. Every job captures
//! the current token at submission; the dispatcher re-reads it at delivery and
//! silently drops results whose token no longer matches. In-flight fetches are
//! allowed to run to completion (they still warm the cache), only their
//! delivery is gated. No hard cancellation anywhere.

use std::sync::atomic::{AtomicU64, Ordering};

/// The class of result a token guards. Each class invalidates independently:
/// resizing the thumb strip must not discard an in-flight primary image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    /// The big preview of the current card.
    PrimaryImage,
    /// The thumbnail strip of the current card.
    ThumbStrip,
}

pub const ALL_CLASSES: [ResultClass; 2] = [ResultClass::PrimaryImage, ResultClass::ThumbStrip];

#[derive(Default)]
pub struct GenerationTokens {
    primary: AtomicU64,
    thumbs: AtomicU64,
}

impl GenerationTokens {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, class: ResultClass) -> &AtomicU64 {
        match class {
            ResultClass::PrimaryImage => &self.primary,
            ResultClass::ThumbStrip => &self.thumbs,
        }
    }

    /// Invalidate all outstanding work for a class. Returns the new token.
    pub fn bump(&self, class: ResultClass) -> u64 {
        self.counter(class).fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn bump_all(&self) {
        for class in ALL_CLASSES {
            self.bump(class);
        }
    }

    pub fn current(&self, class: ResultClass) -> u64 {
        self.counter(class).load(Ordering::SeqCst)
    }
}
