//! Aspect-ratio buckets supported by the image model.
//!
//! Uploaded photos come in arbitrary sizes, but the model only accepts a
//! handful of output ratios. [`AspectRatio::classify`] snaps pixel dimensions
//! to the closest supported bucket.

use serde::Serialize;
use std::fmt;

/// One of the five output ratios the image model understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "9:16")]
    Portrait9x16,
}

impl AspectRatio {
    /// All buckets in comparison order. Ties resolve to the earlier entry.
    pub const ALL: [AspectRatio; 5] = [
        Self::Square,
        Self::Landscape4x3,
        Self::Portrait3x4,
        Self::Landscape16x9,
        Self::Portrait9x16,
    ];

    /// Returns the ratio as sent to the model (e.g. `"16:9"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape4x3 => "4:3",
            Self::Portrait3x4 => "3:4",
            Self::Landscape16x9 => "16:9",
            Self::Portrait9x16 => "9:16",
        }
    }

    /// Canonical width / height value of the bucket.
    pub fn value(&self) -> f64 {
        match self {
            Self::Square => 1.0,
            Self::Landscape4x3 => 4.0 / 3.0,
            Self::Portrait3x4 => 3.0 / 4.0,
            Self::Landscape16x9 => 16.0 / 9.0,
            Self::Portrait9x16 => 9.0 / 16.0,
        }
    }

    /// Picks the bucket whose canonical ratio is closest to `width / height`.
    ///
    /// Degenerate dimensions produce a non-finite ratio; no bucket then beats
    /// the first one, so the result is [`AspectRatio::Square`].
    pub fn classify(width: u32, height: u32) -> Self {
        let ratio = width as f64 / height as f64;

        Self::ALL
            .into_iter()
            .reduce(|prev, curr| {
                if (curr.value() - ratio).abs() < (prev.value() - ratio).abs() {
                    curr
                } else {
                    prev
                }
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
