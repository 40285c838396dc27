//! Error types for the merry-style-core library.
//!
//! This module provides granular error variants for different failure modes,
//! enabling precise error handling and user-friendly error messages.

use thiserror::Error;

/// Errors that can occur within the merry-style-core library.
///
/// Each variant represents a specific failure mode with contextual information
/// to help diagnose and handle errors appropriately.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The selected file does not declare an `image/*` media type.
    #[error("Please upload an image file (got {0})")]
    UnsupportedMediaType(String),

    /// Image decoding or encoding failed.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// Transport or service failure, shown to the user verbatim.
    #[error("{0}")]
    GeminiApi(String),

    /// The model answered but no candidate carried inline image data.
    #[error(
        "No image data returned from the model. It might have refused the request due to safety filters or failed to generate."
    )]
    NoImageReturned,

    /// A hat colour name that is not in the palette.
    #[error("Unknown hat color: {0}")]
    UnknownColor(String),

    /// UI-related errors (rendering, window management).
    #[error("UI error: {0}")]
    Ui(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an image processing error with the given message.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageProcessing(msg.into())
    }

    /// Creates a Gemini API error with the given message.
    pub fn gemini(msg: impl Into<String>) -> Self {
        Self::GeminiApi(msg.into())
    }

    /// Creates a UI error with the given message.
    pub fn ui(msg: impl Into<String>) -> Self {
        Self::Ui(msg.into())
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_image_message_is_descriptive() {
        let msg = AppError::NoImageReturned.to_string();
        assert!(msg.starts_with("No image data returned from the model"));
        assert!(msg.contains("safety filters"));
    }

    #[test]
    fn test_helpers_pick_variant() {
        assert!(matches!(AppError::gemini("boom"), AppError::GeminiApi(m) if m == "boom"));
        assert!(matches!(AppError::image("bad"), AppError::ImageProcessing(_)));
        assert!(AppError::config("missing").to_string().contains("missing"));
    }

    #[test]
    fn test_gemini_error_is_shown_verbatim() {
        assert_eq!(AppError::gemini("quota exceeded").to_string(), "quota exceeded");
    }

    #[test]
    fn test_unsupported_media_type_mentions_type() {
        let err = AppError::UnsupportedMediaType("text/plain".into());
        assert!(err.to_string().contains("text/plain"));
    }
}
