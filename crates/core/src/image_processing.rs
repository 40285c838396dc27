//! Image ingestion and encoding utilities.
//!
//! This module turns a user-selected file into the data-URL form the rest of
//! the application works with, and handles the base64 plumbing between that
//! form and raw bytes.
//!
//! # Media types
//!
//! The declared media type is taken from the file extension, the way a
//! browser labels a picked file. When the extension is missing or is not a
//! known image format, the file header is sniffed instead. Anything that does
//! not resolve to `image/*` is rejected before the full file is read.

use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{ImageFormat, ImageReader};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

/// Media type reported for files that do not look like images.
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Enough leading bytes for every magic number `image` recognises.
const SNIFF_LEN: u64 = 64;

/// An ingested image, ready to be stored in the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    /// `data:<mime>;base64,<payload>`
    pub data_url: String,
    /// Declared media type, always `image/*`.
    pub mime_type: String,
    /// Pixel dimensions when the header could be read.
    pub dimensions: Option<(u32, u32)>,
}

impl ImageUpload {
    /// The base64 payload without the data-URL prefix.
    pub fn base64_payload(&self) -> &str {
        ImageProcessor::strip_data_url_prefix(&self.data_url)
    }

    /// Decodes the payload back into raw bytes.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        ImageProcessor::decode_base64(self.base64_payload())
    }
}

/// Image ingestion utilities.
///
/// This struct provides static methods for preparing user images before
/// they are handed to the session and the Gemini API.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Reads an image file from disk and ingests it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnsupportedMediaType`] if the declared type is not
    /// an image. Returns [`AppError::Io`] if the file cannot be read.
    pub fn load_file(path: &Path) -> Result<ImageUpload> {
        let (bytes, mime_type) = Self::read_image_file(path)?;
        Self::from_bytes(&bytes, &mime_type)
    }

    /// Reads a file and settles its media type, rejecting non-images.
    ///
    /// Non-images are rejected before the whole file is read.
    pub fn read_image_file(path: &Path) -> Result<(Vec<u8>, String)> {
        let mime_type = Self::media_type_of(path)?;
        Self::validate_media_type(&mime_type)?;
        Ok((fs::read(path)?, mime_type))
    }

    /// Media type of the file at `path`: the extension when it names an image
    /// format, otherwise whatever the header looks like.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the header has to be sniffed and the file
    /// cannot be opened.
    pub fn media_type_of(path: &Path) -> Result<String> {
        if let Some(mime) = Self::declared_mime_type(path) {
            return Ok(mime);
        }
        let mut header = Vec::new();
        fs::File::open(path)?
            .take(SNIFF_LEN)
            .read_to_end(&mut header)?;
        Ok(Self::sniff_mime_type(&header))
    }

    /// Ingests raw bytes with a caller-declared media type.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnsupportedMediaType`] if `mime_type` does not start
    /// with `image/`.
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Result<ImageUpload> {
        Self::validate_media_type(mime_type)?;

        let dimensions = Self::probe_dimensions(bytes);
        if dimensions.is_none() {
            tracing::warn!(mime_type, "could not read image dimensions");
        }

        Ok(ImageUpload {
            data_url: Self::to_data_url(mime_type, bytes),
            mime_type: mime_type.to_string(),
            dimensions,
        })
    }

    /// Checks that a media type names an image.
    pub fn validate_media_type(mime_type: &str) -> Result<()> {
        if mime_type.starts_with("image/") {
            Ok(())
        } else {
            Err(AppError::UnsupportedMediaType(mime_type.to_string()))
        }
    }

    /// Media type implied by the file extension.
    ///
    /// Returns `None` when the extension is missing or not a known image
    /// format, so the caller can fall back to sniffing.
    pub fn declared_mime_type(path: &Path) -> Option<String> {
        ImageFormat::from_path(path)
            .ok()
            .map(|f| f.to_mime_type().to_string())
    }

    /// Guesses a media type from magic bytes.
    pub fn sniff_mime_type(bytes: &[u8]) -> String {
        image::guess_format(bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or(UNKNOWN_MEDIA_TYPE)
            .to_string()
    }

    /// Reads pixel dimensions from the image header without a full decode.
    pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }

    /// Wraps raw bytes in a base64 data URL.
    pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
        format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
    }

    /// Removes a leading `data:<type>;base64,` prefix if present.
    pub fn strip_data_url_prefix(data: &str) -> &str {
        if !data.starts_with("data:") {
            return data;
        }
        match data.find(";base64,") {
            Some(idx) => &data[idx + ";base64,".len()..],
            None => data,
        }
    }

    /// Decodes a base64 payload (with or without data-URL prefix).
    pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
        BASE64
            .decode(Self::strip_data_url_prefix(data).trim())
            .map_err(|e| AppError::image(format!("Invalid base64 image data: {}", e)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::DynamicImage;
    use std::io::Write;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_from_bytes_builds_data_url_and_dimensions() {
        let bytes = png_bytes(1200, 800);
        let upload = ImageProcessor::from_bytes(&bytes, "image/png").unwrap();

        assert!(upload.data_url.starts_with("data:image/png;base64,"));
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.dimensions, Some((1200, 800)));
        assert_eq!(upload.bytes().unwrap(), bytes);
    }

    #[test]
    fn test_from_bytes_rejects_non_image() {
        let err = ImageProcessor::from_bytes(b"hello", "text/plain").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(m) if m == "text/plain"));
    }

    #[test]
    fn test_unreadable_header_keeps_upload() {
        let upload = ImageProcessor::from_bytes(b"not really a png", "image/png").unwrap();
        assert_eq!(upload.dimensions, None);
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(
            ImageProcessor::strip_data_url_prefix("data:image/jpeg;base64,AAAA"),
            "AAAA"
        );
        assert_eq!(ImageProcessor::strip_data_url_prefix("AAAA"), "AAAA");
        assert_eq!(
            ImageProcessor::strip_data_url_prefix("data:image/heic;base64,QUJD"),
            "QUJD"
        );
    }

    #[test]
    fn test_declared_mime_type_from_extension() {
        assert_eq!(
            ImageProcessor::declared_mime_type(Path::new("me.jpg")).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(ImageProcessor::declared_mime_type(Path::new("notes.txt")), None);
        assert_eq!(ImageProcessor::declared_mime_type(Path::new("photo")), None);
    }

    #[test]
    fn test_load_file_rejects_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "milk, eggs, tinsel").unwrap();

        let err = ImageProcessor::load_file(&path).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(m) if m == UNKNOWN_MEDIA_TYPE));
    }

    #[test]
    fn test_load_file_sniffs_extensionless_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portrait");
        fs::File::create(&path)
            .unwrap()
            .write_all(&png_bytes(30, 40))
            .unwrap();

        let upload = ImageProcessor::load_file(&path).unwrap();
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.dimensions, Some((30, 40)));
    }

    #[test]
    fn test_load_file_sniffs_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portrait.heic");
        fs::write(&path, png_bytes(40, 30)).unwrap();

        let upload = ImageProcessor::load_file(&path).unwrap();
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.dimensions, Some((40, 30)));
    }

    #[test]
    fn test_media_type_of_missing_file() {
        assert_eq!(
            ImageProcessor::media_type_of(Path::new("/definitely/missing/me.png")).unwrap(),
            "image/png"
        );
        assert!(matches!(
            ImageProcessor::media_type_of(Path::new("/definitely/missing/notes")),
            Err(AppError::Io(_))
        ));
    }

    #[test]
    fn test_decode_base64_reports_garbage() {
        assert!(matches!(
            ImageProcessor::decode_base64("***"),
            Err(AppError::ImageProcessing(_))
        ));
    }
}
