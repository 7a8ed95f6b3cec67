//! Delivery of completed work to the single active consumer.
//!
//! Workers hand every result to the dispatcher; the dispatcher is the only
//! place staleness is enforced. A result is forwarded to the consumer channel
//! only if its item and effective signature still match the active view
//! context, and (for image results) its generation token is still current.
//! Everything else is dropped silently: a fresher fetch supersedes it, or the
//! context is gone and the result is simply irrelevant.

use crate::error::FetchError;
use crate::models::{ImageKind, Printing};
use crate::token::{GenerationTokens, ResultClass};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// A completed unit of work, as drained by the consumer.
#[derive(Debug)]
pub enum Delivery {
    MetaReady {
        item: String,
        signature: String,
        printings: Arc<Vec<Printing>>,
        /// True when a too-narrow filter was dropped for this card; the
        /// effective signature is then "ALL" for the rest of the session.
        auto_relaxed: bool,
    },
    MetaFailed {
        item: String,
        signature: String,
        error: FetchError,
    },
    ImageReady {
        class: ResultClass,
        kind: ImageKind,
        item: String,
        signature: String,
        index: usize,
        bytes: Arc<Vec<u8>>,
    },
    ImageFailed {
        class: ResultClass,
        kind: ImageKind,
        item: String,
        signature: String,
        index: usize,
        error: FetchError,
    },
    DownloadProgress {
        completed: usize,
        total: usize,
    },
    DownloadFinished {
        dest: PathBuf,
        cancelled: bool,
    },
    DownloadFailed {
        error: FetchError,
    },
}

/// Per-item "show all printings" state, shared between the orchestrator
/// (which mutates it) and the dispatcher (which resolves effective
/// signatures from it).
#[derive(Default)]
pub struct OverrideState {
    /// Cards whose effective signature is "ALL" regardless of filters.
    pub all_prints: HashSet<String>,
    /// Subset of the above that got there via auto-relax, for UI hints.
    pub auto_relaxed: HashSet<String>,
}

impl Delivery {
    /// Compact description for logs. Never includes image payloads.
    fn summary(&self) -> String {
        match self {
            Delivery::MetaReady {
                item,
                signature,
                printings,
                ..
            } => format!("MetaReady {}/{} ({} printings)", item, signature, printings.len()),
            Delivery::MetaFailed {
                item,
                signature,
                error,
            } => format!("MetaFailed {}/{}: {}", item, signature, error),
            Delivery::ImageReady {
                kind,
                item,
                signature,
                index,
                bytes,
                ..
            } => format!(
                "ImageReady {} {}/{} [{}] ({} bytes)",
                kind.dir_name(),
                item,
                signature,
                index,
                bytes.len()
            ),
            Delivery::ImageFailed {
                kind,
                item,
                signature,
                index,
                error,
                ..
            } => format!(
                "ImageFailed {} {}/{} [{}]: {}",
                kind.dir_name(),
                item,
                signature,
                index,
                error
            ),
            Delivery::DownloadProgress { completed, total } => {
                format!("DownloadProgress {}/{}", completed, total)
            }
            Delivery::DownloadFinished { cancelled, .. } => {
                format!("DownloadFinished (cancelled={})", cancelled)
            }
            Delivery::DownloadFailed { error } => format!("DownloadFailed: {}", error),
        }
    }
}

struct ViewContext {
    item: String,
    filter_sig: String,
}

pub struct ResultDispatcher {
    tx: UnboundedSender<Delivery>,
    tokens: Arc<GenerationTokens>,
    overrides: Arc<Mutex<OverrideState>>,
    context: Mutex<Option<ViewContext>>,
}

impl ResultDispatcher {
    /// Returns the dispatcher and the receiver the consumer drains on its own
    /// thread (`try_recv` per frame, or `blocking_recv` in a loop).
    pub fn new(
        tokens: Arc<GenerationTokens>,
        overrides: Arc<Mutex<OverrideState>>,
    ) -> (Self, UnboundedReceiver<Delivery>) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                tx,
                tokens,
                overrides,
                context: Mutex::new(None),
            },
            rx,
        )
    }

    /// Set what the consumer is displaying: the current item and the
    /// signature of the active (global) filter configuration.
    pub fn set_context(&self, item: &str, filter_sig: &str) {
        let mut ctx = self.context.lock().expect("context poisoned");
        *ctx = Some(ViewContext {
            item: item.to_string(),
            filter_sig: filter_sig.to_string(),
        });
    }

    /// The signature under which results for `item` are currently valid:
    /// "ALL" if the item is in all-prints mode, else the active filter
    /// signature.
    pub fn effective_signature(&self, item: &str) -> Option<String> {
        let overrides = self.overrides.lock().expect("override state poisoned");
        if overrides.all_prints.contains(item) {
            return Some(crate::filters::SIG_ALL.to_string());
        }
        drop(overrides);
        let ctx = self.context.lock().expect("context poisoned");
        ctx.as_ref().map(|c| c.filter_sig.clone())
    }

    fn matches_context(&self, item: &str, signature: &str) -> bool {
        {
            let ctx = self.context.lock().expect("context poisoned");
            match ctx.as_ref() {
                Some(c) if c.item == item => {}
                _ => return false,
            }
        }
        self.effective_signature(item).as_deref() == Some(signature)
    }

    /// Validate and forward one result. Metadata results are gated on the
    /// view context; image results additionally on their captured token.
    /// Download results pass through ungated.
    pub fn deliver(&self, token: u64, delivery: Delivery) {
        let valid = match &delivery {
            Delivery::MetaReady {
                item, signature, ..
            }
            | Delivery::MetaFailed {
                item, signature, ..
            } => self.matches_context(item, signature),
            Delivery::ImageReady {
                class,
                item,
                signature,
                ..
            }
            | Delivery::ImageFailed {
                class,
                item,
                signature,
                ..
            } => self.tokens.current(*class) == token && self.matches_context(item, signature),
            Delivery::DownloadProgress { .. }
            | Delivery::DownloadFinished { .. }
            | Delivery::DownloadFailed { .. } => true,
        };

        if !valid {
            log::debug!("Discarding stale delivery: {}", delivery.summary());
            return;
        }
        // Send fails only when the consumer is gone; nothing left to notify.
        let _ = self.tx.send(delivery);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::SIG_ALL;

    fn setup() -> (
        ResultDispatcher,
        UnboundedReceiver<Delivery>,
        Arc<GenerationTokens>,
        Arc<Mutex<OverrideState>>,
    ) {
        let tokens = Arc::new(GenerationTokens::new());
        let overrides = Arc::new(Mutex::new(OverrideState::default()));
        let (dispatcher, rx) = ResultDispatcher::new(tokens.clone(), overrides.clone());
        (dispatcher, rx, tokens, overrides)
    }

    fn meta_ready(item: &str, sig: &str) -> Delivery {
        Delivery::MetaReady {
            item: item.to_string(),
            signature: sig.to_string(),
            printings: Arc::new(vec![]),
            auto_relaxed: false,
        }
    }

    fn image_ready(item: &str, sig: &str, class: ResultClass) -> Delivery {
        Delivery::ImageReady {
            class,
            kind: ImageKind::Normal,
            item: item.to_string(),
            signature: sig.to_string(),
            index: 0,
            bytes: Arc::new(vec![0xFF, 0xD8]),
        }
    }

    #[test]
    fn no_context_means_no_delivery() {
        let (dispatcher, mut rx, ..) = setup();
        dispatcher.deliver(0, meta_ready("Lightning Bolt", "sig1"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn matching_meta_is_forwarded() {
        let (dispatcher, mut rx, ..) = setup();
        dispatcher.set_context("Lightning Bolt", "sig1");
        dispatcher.deliver(0, meta_ready("Lightning Bolt", "sig1"));
        assert!(matches!(rx.try_recv().unwrap(), Delivery::MetaReady { .. }));
    }

    #[test]
    fn meta_for_other_item_or_signature_is_dropped() {
        let (dispatcher, mut rx, ..) = setup();
        dispatcher.set_context("Lightning Bolt", "sig1");
        dispatcher.deliver(0, meta_ready("Counterspell", "sig1"));
        dispatcher.deliver(0, meta_ready("Lightning Bolt", "sig2"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn override_changes_effective_signature() {
        let (dispatcher, mut rx, _, overrides) = setup();
        dispatcher.set_context("Lightning Bolt", "sig1");
        overrides
            .lock()
            .unwrap()
            .all_prints
            .insert("Lightning Bolt".to_string());

        // the filtered result is now stale, the ALL result is current
        dispatcher.deliver(0, meta_ready("Lightning Bolt", "sig1"));
        assert!(rx.try_recv().is_err());
        dispatcher.deliver(0, meta_ready("Lightning Bolt", SIG_ALL));
        assert!(matches!(rx.try_recv().unwrap(), Delivery::MetaReady { .. }));
    }

    #[test]
    fn stale_image_token_is_dropped() {
        let (dispatcher, mut rx, tokens, _) = setup();
        dispatcher.set_context("Lightning Bolt", "sig1");

        let captured = tokens.current(ResultClass::PrimaryImage);
        tokens.bump(ResultClass::PrimaryImage);
        dispatcher.deliver(
            captured,
            image_ready("Lightning Bolt", "sig1", ResultClass::PrimaryImage),
        );
        assert!(rx.try_recv().is_err());

        let fresh = tokens.current(ResultClass::PrimaryImage);
        dispatcher.deliver(
            fresh,
            image_ready("Lightning Bolt", "sig1", ResultClass::PrimaryImage),
        );
        assert!(matches!(rx.try_recv().unwrap(), Delivery::ImageReady { .. }));
    }

    #[test]
    fn thumb_bump_does_not_invalidate_primary() {
        let (dispatcher, mut rx, tokens, _) = setup();
        dispatcher.set_context("Lightning Bolt", "sig1");

        let captured = tokens.current(ResultClass::PrimaryImage);
        tokens.bump(ResultClass::ThumbStrip);
        dispatcher.deliver(
            captured,
            image_ready("Lightning Bolt", "sig1", ResultClass::PrimaryImage),
        );
        assert!(matches!(rx.try_recv().unwrap(), Delivery::ImageReady { .. }));
    }

    #[test]
    fn image_summary_reports_length_not_payload() {
        let delivery = Delivery::ImageReady {
            class: ResultClass::PrimaryImage,
            kind: ImageKind::Normal,
            item: "Lightning Bolt".to_string(),
            signature: "sig1".to_string(),
            index: 2,
            bytes: Arc::new(vec![0xAB; 4096]),
        };
        let summary = delivery.summary();
        assert!(summary.contains("Lightning Bolt"));
        assert!(summary.contains("[2]"));
        assert!(summary.contains("4096 bytes"));
        // the byte vector itself must not be formatted into the log line
        assert!(summary.len() < 120, "summary too long: {}", summary);
    }

    #[test]
    fn download_results_bypass_validation() {
        let (dispatcher, mut rx, ..) = setup();
        dispatcher.deliver(
            999,
            Delivery::DownloadProgress {
                completed: 1,
                total: 3,
            },
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            Delivery::DownloadProgress { .. }
        ));
    }
}
