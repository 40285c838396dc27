//! Desktop editor for merry-style.
//!
//! This module provides a small window where the user picks a photo, a hat
//! colour, runs the generation and then downloads or shares the result.
//!
//! # Architecture
//!
//! The UI is split into focused submodules:
//! - [`state`]: Channel events and notices
//! - [`rendering`]: Preview scaling and swatch drawing
//! - [`editor`]: Main application logic
//!
//! # Usage
//!
//! ```ignore
//! use merry_style_core::{ui, Config, SessionController};
//!
//! let config = Config::load()?;
//! ui::run_editor(config, SessionController::new(), ".".into())?;
//! ```

mod editor;
mod rendering;
mod state;

// Public API exports
pub use editor::HatEditor;
pub use rendering::fit_size;
pub use state::Notice;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::session::SessionController;
use eframe::egui;
use std::path::PathBuf;

/// Opens the editor window and blocks until it is closed.
///
/// # Arguments
/// * `config` - Application configuration with API key and model
/// * `controller` - Session to start from; may already contain an image
/// * `output_dir` - Directory downloads are written to
///
/// # Errors
/// Returns [`AppError::Ui`] if the window cannot be created.
pub fn run_editor(config: Config, controller: SessionController, output_dir: PathBuf) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("MerryStyle")
            .with_inner_size([1100.0, 720.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "MerryStyle",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(HatEditor::new(config, controller, output_dir)) as Box<dyn eframe::App>)
        }),
    )
    .map_err(|e| AppError::ui(format!("Failed to run UI: {}", e)))
}
