//! Session state machine.
//!
//! The session follows a small lifecycle:
//! `Idle` -> `Uploading` -> `Idle` | `Error` (file read)
//! `Idle` -> `Generating` -> `Success` | `Error` -> `Idle` (try again / new image)
//!
//! [`SessionState`] is a plain value; every transition consumes it and
//! returns the next state. [`SessionController`] owns the current value and
//! adds the in-flight guard: only one generation may run at a time, and a
//! result is only applied if it belongs to the current request.

use crate::aspect_ratio::AspectRatio;
use crate::error::{AppError, Result};
use crate::gemini::{GeneratedImage, HatRenderer, HatRequest};
use crate::hat::HatColor;
use crate::image_processing::{ImageProcessor, ImageUpload};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Idle,
    Uploading,
    Generating,
    Success,
    Error,
}

/// Snapshot of everything the user has picked and received so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    lifecycle: Lifecycle,
    original: Option<ImageUpload>,
    generated: Option<GeneratedImage>,
    aspect_ratio: AspectRatio,
    color: HatColor,
    error: Option<String>,
}

impl SessionState {
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn original(&self) -> Option<&ImageUpload> {
        self.original.as_ref()
    }

    /// The generated image, only while the session is in `Success`.
    pub fn result(&self) -> Option<&GeneratedImage> {
        match self.lifecycle {
            Lifecycle::Success => self.generated.as_ref(),
            _ => None,
        }
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn color(&self) -> HatColor {
        self.color
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Builds the model request for the current image, if there is one.
    pub fn request(&self) -> Option<HatRequest> {
        self.original.as_ref().map(|image| HatRequest {
            image_base64: image.data_url.clone(),
            mime_type: image.mime_type.clone(),
            aspect_ratio: self.aspect_ratio,
            color: self.color,
        })
    }

    pub fn uploading(self) -> Self {
        Self {
            lifecycle: Lifecycle::Uploading,
            ..self
        }
    }

    /// A new image replaces the old one and wipes any previous outcome.
    ///
    /// The ratio is only re-classified when the dimensions are known.
    pub fn with_image(self, upload: ImageUpload) -> Self {
        let aspect_ratio = match upload.dimensions {
            Some((w, h)) => AspectRatio::classify(w, h),
            None => self.aspect_ratio,
        };
        Self {
            lifecycle: Lifecycle::Idle,
            original: Some(upload),
            generated: None,
            aspect_ratio,
            error: None,
            ..self
        }
    }

    pub fn upload_failed(self, message: impl Into<String>) -> Self {
        Self {
            lifecycle: Lifecycle::Error,
            error: Some(message.into()),
            ..self
        }
    }

    /// Drops the image and result, and puts the colour back to the default.
    pub fn cleared(self) -> Self {
        Self {
            lifecycle: Lifecycle::Idle,
            original: None,
            generated: None,
            color: HatColor::default(),
            error: None,
            ..self
        }
    }

    pub fn with_color(self, color: HatColor) -> Self {
        Self { color, ..self }
    }

    pub fn with_aspect_ratio(self, aspect_ratio: AspectRatio) -> Self {
        Self {
            aspect_ratio,
            ..self
        }
    }

    pub fn generating(self) -> Self {
        Self {
            lifecycle: Lifecycle::Generating,
            error: None,
            ..self
        }
    }

    pub fn succeeded(self, image: GeneratedImage) -> Self {
        Self {
            lifecycle: Lifecycle::Success,
            generated: Some(image),
            error: None,
            ..self
        }
    }

    pub fn failed(self, message: impl Into<String>) -> Self {
        Self {
            lifecycle: Lifecycle::Error,
            generated: None,
            error: Some(message.into()),
            ..self
        }
    }

    /// "Try again": back to `Idle` with the same image and settings.
    pub fn reset_result(self) -> Self {
        Self {
            lifecycle: Lifecycle::Idle,
            generated: None,
            error: None,
            ..self
        }
    }
}

/// Handle for one outstanding generation.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    id: u64,
    request: HatRequest,
}

impl GenerationTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &HatRequest {
        &self.request
    }
}

/// Single owner of the session state.
#[derive(Debug, Default)]
pub struct SessionController {
    state: SessionState,
    next_ticket: u64,
    in_flight: Option<u64>,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight.is_some()
    }

    fn apply(&mut self, transition: impl FnOnce(SessionState) -> SessionState) {
        let before = self.state.lifecycle;
        self.state = transition(std::mem::take(&mut self.state));
        if before != self.state.lifecycle {
            tracing::debug!(from = ?before, to = ?self.state.lifecycle, "session transition");
        }
    }

    pub fn begin_upload(&mut self) {
        if self.is_generating() {
            tracing::debug!("upload ignored while generating");
            return;
        }
        self.apply(SessionState::uploading);
    }

    /// Stores a freshly ingested image. Any in-flight request is abandoned.
    pub fn select_image(&mut self, upload: ImageUpload) {
        self.in_flight = None;
        self.apply(|s| s.with_image(upload));
        tracing::debug!(aspect_ratio = %self.state.aspect_ratio, "image selected");
    }

    pub fn fail_upload(&mut self, message: impl Into<String>) {
        if self.state.lifecycle != Lifecycle::Uploading {
            return;
        }
        self.apply(|s| s.upload_failed(message));
    }

    pub fn clear_image(&mut self) {
        self.in_flight = None;
        self.apply(SessionState::cleared);
    }

    pub fn select_color(&mut self, color: HatColor) {
        self.apply(|s| s.with_color(color));
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.apply(|s| s.with_aspect_ratio(aspect_ratio));
    }

    /// Moves to `Generating` and hands out a ticket for the request.
    ///
    /// Returns `None`, leaving the state untouched, when there is no image or
    /// a generation is already running.
    pub fn begin_generation(&mut self) -> Option<GenerationTicket> {
        if self.is_generating() {
            tracing::debug!("generation already in flight");
            return None;
        }
        let request = self.state.request()?;

        self.next_ticket += 1;
        let id = self.next_ticket;
        self.in_flight = Some(id);
        self.apply(SessionState::generating);

        Some(GenerationTicket { id, request })
    }

    /// Applies a finished generation. Returns `false` for stale tickets.
    pub fn complete_generation(&mut self, ticket_id: u64, result: Result<GeneratedImage>) -> bool {
        if self.in_flight != Some(ticket_id) {
            tracing::warn!(ticket_id, "discarding result of superseded generation");
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(image) => self.apply(|s| s.succeeded(image)),
            Err(e) => {
                let message = e.to_string();
                self.apply(|s| s.failed(message));
            }
        }
        true
    }

    /// "Try again" from `Success` or `Error`.
    pub fn retry(&mut self) {
        if matches!(self.state.lifecycle, Lifecycle::Success | Lifecycle::Error) {
            self.apply(SessionState::reset_result);
        }
    }
}

/// Reads `path` into the session.
///
/// A file whose media type is not an image is rejected with the session
/// untouched. Once the type checks out the session moves to `Uploading`, and a
/// read failure from there lands in `Error` before being returned.
pub fn ingest_file(controller: &mut SessionController, path: &Path) -> Result<()> {
    let mime_type = ImageProcessor::media_type_of(path)?;
    ImageProcessor::validate_media_type(&mime_type)?;

    controller.begin_upload();
    match fs::read(path) {
        Ok(bytes) => store_upload(controller, &bytes, &mime_type),
        Err(e) => {
            let e = AppError::from(e);
            tracing::warn!(path = %path.display(), error = %e, "upload failed");
            controller.fail_upload(e.to_string());
            Err(e)
        }
    }
}

/// Stores in-memory image bytes (e.g. a dropped file) in the session.
pub fn ingest_bytes(controller: &mut SessionController, bytes: &[u8], mime_type: &str) -> Result<()> {
    ImageProcessor::validate_media_type(mime_type)?;

    controller.begin_upload();
    store_upload(controller, bytes, mime_type)
}

fn store_upload(controller: &mut SessionController, bytes: &[u8], mime_type: &str) -> Result<()> {
    match ImageProcessor::from_bytes(bytes, mime_type) {
        Ok(upload) => {
            controller.select_image(upload);
            Ok(())
        }
        Err(e) => {
            controller.fail_upload(e.to_string());
            Err(e)
        }
    }
}

/// Runs one generation to completion against `renderer`.
///
/// Returns the resulting lifecycle, or `None` when nothing was started.
pub async fn run_generation<R: HatRenderer>(
    controller: &mut SessionController,
    renderer: &R,
) -> Option<Lifecycle> {
    let ticket = controller.begin_generation()?;
    let result = renderer.render_hat(ticket.request()).await;
    controller.complete_generation(ticket.id(), result);
    Some(controller.state().lifecycle())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn upload(dimensions: Option<(u32, u32)>) -> ImageUpload {
        ImageUpload {
            data_url: "data:image/png;base64,QUJD".to_string(),
            mime_type: "image/png".to_string(),
            dimensions,
        }
    }

    fn result_image() -> GeneratedImage {
        GeneratedImage {
            data: vec![1, 2, 3],
            mime_type: "image/png".to_string(),
        }
    }

    struct CountingRenderer {
        calls: Cell<usize>,
    }

    impl HatRenderer for CountingRenderer {
        async fn render_hat(&self, _request: &HatRequest) -> Result<GeneratedImage> {
            self.calls.set(self.calls.get() + 1);
            Ok(result_image())
        }
    }

    #[test]
    fn test_select_image_classifies_and_resets() {
        let mut controller = SessionController::new();
        controller.select_image(upload(Some((1080, 1920))));
        let ticket = controller.begin_generation().unwrap();
        controller.complete_generation(ticket.id(), Err(AppError::NoImageReturned));
        assert_eq!(controller.state().lifecycle(), Lifecycle::Error);

        controller.select_image(upload(Some((1024, 768))));
        let state = controller.state();
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
        assert_eq!(state.error(), None);
        assert_eq!(state.result(), None);
        assert_eq!(state.aspect_ratio(), AspectRatio::Landscape4x3);
    }

    #[test]
    fn test_unknown_dimensions_keep_previous_ratio() {
        let mut controller = SessionController::new();
        controller.select_image(upload(Some((1920, 1080))));
        controller.select_image(upload(None));
        assert_eq!(controller.state().aspect_ratio(), AspectRatio::Landscape16x9);
    }

    #[test]
    fn test_clear_resets_color() {
        let mut controller = SessionController::new();
        controller.select_image(upload(None));
        controller.select_color(HatColor::Purple);
        controller.clear_image();

        let state = controller.state();
        assert_eq!(state.color(), HatColor::Red);
        assert!(state.original().is_none());
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
    }

    #[test]
    fn test_generate_without_image_is_noop() {
        let mut controller = SessionController::new();
        let before = controller.state().clone();
        assert!(controller.begin_generation().is_none());
        assert_eq!(controller.state(), &before);
    }

    #[test]
    fn test_second_begin_while_generating_is_rejected() {
        let mut controller = SessionController::new();
        controller.select_image(upload(None));
        let first = controller.begin_generation().unwrap();
        assert!(controller.begin_generation().is_none());
        assert_eq!(controller.state().lifecycle(), Lifecycle::Generating);

        assert!(controller.complete_generation(first.id(), Ok(result_image())));
        assert_eq!(controller.state().lifecycle(), Lifecycle::Success);
        assert_eq!(controller.state().result(), Some(&result_image()));
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let mut controller = SessionController::new();
        controller.select_image(upload(None));
        let stale = controller.begin_generation().unwrap();

        controller.select_image(upload(Some((500, 500))));
        assert!(!controller.complete_generation(stale.id(), Ok(result_image())));
        assert_eq!(controller.state().lifecycle(), Lifecycle::Idle);
        assert_eq!(controller.state().result(), None);
    }

    #[test]
    fn test_failure_stores_message() {
        let mut controller = SessionController::new();
        controller.select_image(upload(None));
        let ticket = controller.begin_generation().unwrap();
        controller.complete_generation(ticket.id(), Err(AppError::gemini("quota exceeded")));

        let state = controller.state();
        assert_eq!(state.lifecycle(), Lifecycle::Error);
        assert!(state.error().unwrap().contains("quota exceeded"));
    }

    #[test]
    fn test_retry_keeps_image_and_color() {
        let mut controller = SessionController::new();
        controller.select_image(upload(None));
        controller.select_color(HatColor::Gold);
        let ticket = controller.begin_generation().unwrap();
        controller.complete_generation(ticket.id(), Ok(result_image()));

        controller.retry();
        let state = controller.state();
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
        assert!(state.original().is_some());
        assert_eq!(state.color(), HatColor::Gold);
        assert_eq!(state.result(), None);
    }

    #[test]
    fn test_upload_failure_only_from_uploading() {
        let mut controller = SessionController::new();
        controller.fail_upload("disk on fire");
        assert_eq!(controller.state().lifecycle(), Lifecycle::Idle);

        controller.begin_upload();
        assert_eq!(controller.state().lifecycle(), Lifecycle::Uploading);
        controller.fail_upload("disk on fire");
        assert_eq!(controller.state().lifecycle(), Lifecycle::Error);
        assert_eq!(controller.state().error(), Some("disk on fire"));
    }

    #[test]
    fn test_rejected_file_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("holiday-list.txt");
        fs::write(&notes, "cards, lights, ribbon").unwrap();

        let mut controller = SessionController::new();
        controller.select_image(upload(Some((1920, 1080))));
        controller.select_color(HatColor::Green);
        let before = controller.state().clone();

        let err = ingest_file(&mut controller, &notes).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
        assert_eq!(controller.state(), &before);

        let err = ingest_bytes(&mut controller, b"%PDF-1.7", "application/pdf").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
        assert_eq!(controller.state(), &before);
    }

    #[test]
    fn test_unreadable_image_file_ends_in_error() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("folder.png");
        fs::create_dir(&folder).unwrap();

        let mut controller = SessionController::new();
        let err = ingest_file(&mut controller, &folder).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));

        let state = controller.state();
        assert_eq!(state.lifecycle(), Lifecycle::Error);
        assert_eq!(state.error(), Some(err.to_string().as_str()));
        assert!(state.original().is_none());
    }

    #[test]
    fn test_missing_image_file_ends_in_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = SessionController::new();

        assert!(ingest_file(&mut controller, &dir.path().join("gone.jpg")).is_err());
        assert_eq!(controller.state().lifecycle(), Lifecycle::Error);
        assert!(controller.state().error().unwrap().starts_with("IO error"));
    }

    #[test]
    fn test_ingest_file_recovers_after_failed_upload() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("wide.png");
        fs::write(&photo, crate::image_processing::tests::png_bytes(1920, 1080)).unwrap();

        let mut controller = SessionController::new();
        let _ = ingest_file(&mut controller, &dir.path().join("gone.png"));
        assert_eq!(controller.state().lifecycle(), Lifecycle::Error);

        ingest_file(&mut controller, &photo).unwrap();
        let state = controller.state();
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
        assert_eq!(state.error(), None);
        assert_eq!(state.aspect_ratio(), AspectRatio::Landscape16x9);
    }

    #[test]
    fn test_ingest_bytes_selects_image() {
        let mut controller = SessionController::new();
        let png = crate::image_processing::tests::png_bytes(1080, 1920);
        ingest_bytes(&mut controller, &png, "image/png").unwrap();

        let state = controller.state();
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
        assert_eq!(state.aspect_ratio(), AspectRatio::Portrait9x16);
        assert_eq!(state.original().unwrap().mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_run_generation_calls_renderer_once() {
        let renderer = CountingRenderer {
            calls: Cell::new(0),
        };
        let mut controller = SessionController::new();

        assert_eq!(run_generation(&mut controller, &renderer).await, None);
        assert_eq!(renderer.calls.get(), 0);

        controller.select_image(upload(Some((800, 600))));
        assert_eq!(
            run_generation(&mut controller, &renderer).await,
            Some(Lifecycle::Success)
        );
        assert_eq!(renderer.calls.get(), 1);
    }
}
