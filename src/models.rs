//! Core data types shared across the fetch/cache layer.

use serde::{Deserialize, Serialize};

/// One concrete printing of a card, as returned by a metadata fetch.
///
/// Immutable once constructed; printing lists are cached and shared as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Printing {
    pub set_code: String,
    pub set_name: String,
    pub collector_number: String,
    pub released_at: String,
    pub scryfall_uri: String,
    pub image_small: String,
    pub image_normal: String,
    #[serde(default)]
    pub image_png: Option<String>,
    #[serde(default)]
    pub image_large: Option<String>,
}

impl Printing {
    /// Best URL for a full-quality download: png if available, else large.
    pub fn download_url(&self) -> Option<&str> {
        self.download_target().map(|(url, _)| url)
    }

    /// Download URL paired with the file extension matching its format.
    pub fn download_target(&self) -> Option<(&str, &'static str)> {
        if let Some(png) = self.image_png.as_deref() {
            return Some((png, "png"));
        }
        self.image_large.as_deref().map(|large| (large, "jpg"))
    }
}

/// Which cached image size a request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Small,
    Normal,
}

impl ImageKind {
    /// Subdirectory name under the image cache root.
    pub fn dir_name(self) -> &'static str {
        match self {
            ImageKind::Small => "small",
            ImageKind::Normal => "normal",
        }
    }
}

/// Cheap structural fingerprint of a printing list.
///
/// The consumer compares fingerprints to decide whether the displayed thumb
/// strip changed shape (and the thumb-strip token must bump). Deliberately not
/// a deep equality check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrintingsFingerprint {
    pub count: usize,
    pub first: Option<(String, String)>,
    pub last: Option<(String, String)>,
}

impl PrintingsFingerprint {
    pub fn of(printings: &[Printing]) -> Self {
        let ends = |p: &Printing| (p.set_code.clone(), p.collector_number.clone());
        Self {
            count: printings.len(),
            first: printings.first().map(ends),
            last: printings.last().map(ends),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printing(set: &str, cn: &str) -> Printing {
        Printing {
            set_code: set.to_string(),
            set_name: "Test Set".to_string(),
            collector_number: cn.to_string(),
            released_at: "2020-01-01".to_string(),
            scryfall_uri: "https://scryfall.com/card/x".to_string(),
            image_small: "https://img/small.jpg".to_string(),
            image_normal: "https://img/normal.jpg".to_string(),
            image_png: None,
            image_large: Some("https://img/large.jpg".to_string()),
        }
    }

    #[test]
    fn download_url_prefers_png() {
        let mut p = printing("lea", "161");
        assert_eq!(p.download_url(), Some("https://img/large.jpg"));
        p.image_png = Some("https://img/card.png".to_string());
        assert_eq!(p.download_url(), Some("https://img/card.png"));
        p.image_large = None;
        p.image_png = None;
        assert_eq!(p.download_url(), None);
    }

    #[test]
    fn download_target_extension_follows_chosen_url() {
        let mut p = printing("lea", "161");
        // large jpg only, even if the URL mentions png elsewhere
        p.image_large = Some("https://img/large.jpg?from=card.png".to_string());
        assert_eq!(
            p.download_target(),
            Some(("https://img/large.jpg?from=card.png", "jpg"))
        );
        p.image_png = Some("https://img/card.png".to_string());
        assert_eq!(p.download_target(), Some(("https://img/card.png", "png")));
        p.image_png = None;
        p.image_large = None;
        assert_eq!(p.download_target(), None);
    }

    #[test]
    fn fingerprint_detects_structural_change() {
        let a = vec![printing("lea", "1"), printing("lea", "2")];
        let b = vec![printing("lea", "1"), printing("lea", "2")];
        let c = vec![printing("lea", "1"), printing("m10", "2")];
        assert_eq!(PrintingsFingerprint::of(&a), PrintingsFingerprint::of(&b));
        assert_ne!(PrintingsFingerprint::of(&a), PrintingsFingerprint::of(&c));
        assert_ne!(
            PrintingsFingerprint::of(&a),
            PrintingsFingerprint::of(&a[..1])
        );
    }

    #[test]
    fn printing_serde_round_trip() {
        let p = printing("hou", "45");
        let json = serde_json::to_string(&p).unwrap();
        let back: Printing = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
