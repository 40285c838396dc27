//! MerryStyle Core Library
//!
//! This library provides the core functionality for MerryStyle, a tool that
//! asks Google's Gemini image model to put a festive hat on every face in a
//! photo.
//!
//! # Overview
//!
//! The library handles:
//!
//! - **Ingestion**: file validation and data-URL encoding via [`image_processing`]
//! - **Aspect ratios**: snapping photo dimensions to a supported bucket via [`aspect_ratio`]
//! - **Session**: the idle / generating / success / error lifecycle via [`session`]
//! - **AI Integration**: the Gemini image-editing request via [`gemini`]
//! - **Export**: downloads and clipboard sharing via [`export`]
//! - **User Interface**: the desktop editor via [`ui`]
//!
//! # Quick Start
//!
//! ```ignore
//! use merry_style_core::{HatColor, MerryStyle};
//!
//! let app = MerryStyle::new()?;
//! let mut session = app.open("portrait.jpg".as_ref())?;
//! session.select_color(HatColor::Gold);
//! let lifecycle = app.generate(&mut session).await;
//! ```
//!
//! # Module Structure
//!
//! - [`aspect_ratio`]: Supported output ratios and classification
//! - [`config`]: Configuration loading and management
//! - [`error`]: Error types and result aliases
//! - [`export`]: Download naming and sharing
//! - [`gemini`]: Gemini client and the [`HatRenderer`] seam
//! - [`hat`]: Hat palette and prompt
//! - [`image_processing`]: Ingestion and base64 helpers
//! - [`session`]: State machine and controller
//! - [`ui`]: Editor window

pub mod aspect_ratio;
pub mod config;
pub mod error;
pub mod export;
pub mod gemini;
pub mod hat;
pub mod image_processing;
pub mod session;
pub mod ui;

// Re-export primary types for convenience
pub use aspect_ratio::AspectRatio;
pub use config::Config;
pub use error::{AppError, Result};
pub use gemini::{GeminiClient, GeneratedImage, HatRenderer, HatRequest};
pub use hat::HatColor;
pub use image_processing::{ImageProcessor, ImageUpload};
pub use session::{Lifecycle, SessionController, SessionState};

use std::path::{Path, PathBuf};

/// Main entry point for MerryStyle.
///
/// This struct provides a facade over the subsystems: it owns the
/// configuration and the Gemini client, and drives sessions through them.
pub struct MerryStyle {
    config: Config,
    client: GeminiClient,
}

impl MerryStyle {
    /// Creates a new instance from environment configuration.
    ///
    /// Loads configuration from environment variables (including `.env` files).
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::load()?)
    }

    /// Creates an instance with custom configuration.
    ///
    /// Use this when you need to override environment-based configuration,
    /// such as specifying a different model or API key.
    pub fn with_config(config: Config) -> Result<Self> {
        let client = GeminiClient::new(&config)?;
        Ok(Self { config, client })
    }

    /// Starts a session with the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnsupportedMediaType`] for non-image files and
    /// [`AppError::Io`] when the file cannot be read.
    pub fn open(&self, path: &Path) -> Result<SessionController> {
        let mut controller = SessionController::new();
        session::ingest_file(&mut controller, path)?;
        Ok(controller)
    }

    /// Runs one generation for `session` against Gemini.
    ///
    /// Returns `None` if the session has no image or is already generating.
    pub async fn generate(&self, session: &mut SessionController) -> Option<Lifecycle> {
        session::run_generation(session, &self.client).await
    }

    /// Opens the editor window on `session`.
    pub fn run_editor(&self, session: SessionController, output_dir: PathBuf) -> Result<()> {
        ui::run_editor(self.config.clone(), session, output_dir)
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the Gemini client.
    pub fn client(&self) -> &GeminiClient {
        &self.client
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
/// This loads `.env` files if present.
pub fn init() {
    let _ = dotenvy::dotenv();
}
