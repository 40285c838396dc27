//! Hat palette and the instruction sent to the image model.

use crate::error::AppError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Colours offered for the hat.
///
/// The prompt value is the display name; the hex code only drives swatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum HatColor {
    #[default]
    Red,
    Green,
    Blue,
    Gold,
    Pink,
    Purple,
}

impl HatColor {
    pub const ALL: [HatColor; 6] = [
        Self::Red,
        Self::Green,
        Self::Blue,
        Self::Gold,
        Self::Pink,
        Self::Purple,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Green => "Green",
            Self::Blue => "Blue",
            Self::Gold => "Gold",
            Self::Pink => "Pink",
            Self::Purple => "Purple",
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            Self::Red => "#D42426",
            Self::Green => "#165B33",
            Self::Blue => "#2563EB",
            Self::Gold => "#F59E0B",
            Self::Pink => "#EC4899",
            Self::Purple => "#9333EA",
        }
    }

    /// Swatch colour as RGB bytes.
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Self::Red => [0xD4, 0x24, 0x26],
            Self::Green => [0x16, 0x5B, 0x33],
            Self::Blue => [0x25, 0x63, 0xEB],
            Self::Gold => [0xF5, 0x9E, 0x0B],
            Self::Pink => [0xEC, 0x48, 0x99],
            Self::Purple => [0x93, 0x33, 0xEA],
        }
    }

    /// The value substituted into the prompt.
    pub fn prompt_value(&self) -> &'static str {
        self.name()
    }
}

impl fmt::Display for HatColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HatColor {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::UnknownColor(wanted.to_string()))
    }
}

/// Builds the fixed editing instruction for the given colour.
pub fn hat_prompt(color: HatColor) -> String {
    format!(
        "Detect all faces and characters in the image. Add a festive {} and white Christmas hat to each of them. \
         The hats must strictly follow the artistic style (e.g., photorealistic, oil painting, cartoon, sketch) and lighting of the original image. \
         Adjust the angle, size, and perspective of the hats to match the head pose of each subject naturally, including side profiles and tilted heads. \
         Ensure the hats look like they are physically sitting on the heads. \
         CRITICAL: Do not change the facial features, identity of the persons, or the background environment. Only add the hats.",
        color.prompt_value()
    )
}
