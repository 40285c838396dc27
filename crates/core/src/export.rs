//! Getting a finished image out of the app: download and share.

use crate::error::{AppError, Result};
use crate::gemini::GeneratedImage;
use crate::hat::HatColor;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Shown when the host offers no way to share.
pub const SHARE_UNSUPPORTED_NOTICE: &str =
    "Sharing isn't supported on this device, but you can still download the image!";

/// File name for a download: `merry-style-christmas-<color>-<timestamp>.<ext>`.
pub fn download_file_name(color: HatColor, image: &GeneratedImage, timestamp_ms: u128) -> String {
    format!(
        "merry-style-christmas-{}-{}.{}",
        color.name().to_lowercase(),
        timestamp_ms,
        image.extension()
    )
}

/// Milliseconds since the Unix epoch.
pub fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Writes the image into `dir` and returns the full path.
pub fn save_download(image: &GeneratedImage, color: HatColor, dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    let path = dir.join(download_file_name(color, image, timestamp_millis()));
    fs::write(&path, &image.data)?;
    tracing::info!(path = %path.display(), "saved download");
    Ok(path)
}

/// What happened when the user pressed share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    /// No share capability on this host; carries the notice for the user.
    Unsupported(&'static str),
    /// The host refused; already logged.
    Failed(String),
}

/// A place the finished image can be handed to.
pub trait ShareTarget {
    /// `Ok(false)` means the capability is not available here.
    fn share(&mut self, image: &GeneratedImage) -> Result<bool>;
}

/// Shares through the system clipboard.
#[derive(Default)]
pub struct ClipboardShare;

impl ShareTarget for ClipboardShare {
    fn share(&mut self, image: &GeneratedImage) -> Result<bool> {
        let mut clipboard = match arboard::Clipboard::new() {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(error = %e, "clipboard unavailable");
                return Ok(false);
            }
        };

        let rgba = image::load_from_memory(&image.data)
            .map_err(|e| AppError::image(format!("Failed to decode result: {}", e)))?
            .to_rgba8();

        clipboard
            .set_image(arboard::ImageData {
                width: rgba.width() as usize,
                height: rgba.height() as usize,
                bytes: Cow::Owned(rgba.into_raw()),
            })
            .map_err(|e| AppError::ui(format!("Failed to copy image: {}", e)))?;

        Ok(true)
    }
}

/// Shares `image` and folds every failure into a [`ShareOutcome`].
pub fn share_image(target: &mut impl ShareTarget, image: &GeneratedImage) -> ShareOutcome {
    match target.share(image) {
        Ok(true) => ShareOutcome::Shared,
        Ok(false) => ShareOutcome::Unsupported(SHARE_UNSUPPORTED_NOTICE),
        Err(e) => {
            tracing::warn!(error = %e, "share failed");
            ShareOutcome::Failed(e.to_string())
        }
    }
}
