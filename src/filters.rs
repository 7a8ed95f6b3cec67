//! Printing filter configuration and its stable cache signature.
//!
//! The signature is part of every cache key: two different filter setups for
//! the same card are different cache entries on purpose.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Reserved signature meaning "no filter applied / all printings".
pub const SIG_ALL: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Border {
    #[default]
    Any,
    Borderless,
    Black,
    White,
    Silver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameEdition {
    #[default]
    Any,
    #[serde(rename = "1993")]
    Y1993,
    #[serde(rename = "1997")]
    Y1997,
    #[serde(rename = "2003")]
    Y2003,
    #[serde(rename = "2015")]
    Y2015,
    Future,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameEffect {
    #[default]
    Any,
    Legendary,
    Colorshifted,
    Tombstone,
    Enchantment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stamp {
    #[default]
    Any,
    Oval,
    Acorn,
    Triangle,
    Arena,
}

/// Active printing filters for a project.
///
/// A fixed struct rather than a free-form map so the signature hash is stable
/// across runs and field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub prefer_borderless: bool,
    pub border: Border,
    pub frame_edition: FrameEdition,
    pub frame_effect: FrameEffect,
    pub is_full: bool,
    pub is_hires: bool,
    pub is_default: bool,
    pub is_atypical: bool,
    pub exclude_ub: bool,
    pub stamp: Stamp,
}

impl FilterConfig {
    /// Stable 10-hex-char signature used in cache keys.
    pub fn signature(&self) -> String {
        let blob = serde_json::to_string(self).expect("FilterConfig serializes");
        let digest = Sha256::digest(blob.as_bytes());
        let mut sig = String::with_capacity(10);
        for byte in digest.iter().take(5) {
            sig.push_str(&format!("{:02x}", byte));
        }
        sig
    }

    /// True if this config actually constrains the printing query.
    ///
    /// An all-default config produces no query terms, so fetching it filtered
    /// and unfiltered is the same request; auto-relax only applies when this
    /// returns true. `prefer_borderless` is a fallback preference, not a
    /// constraint.
    pub fn narrows(&self) -> bool {
        self.border != Border::Any
            || self.frame_edition != FrameEdition::Any
            || self.frame_effect != FrameEffect::Any
            || self.stamp != Stamp::Any
            || self.is_full
            || self.is_hires
            || self.is_default
            || self.is_atypical
            || self.exclude_ub
    }
}
