//! Events and transient UI state.
//!
//! The session itself lives in [`crate::session`]; this module only holds
//! what the window needs on top of it.

use crate::error::Result;
use crate::gemini::GeneratedImage;

/// Events received from the background generation thread.
///
/// These are sent through a channel from the async Gemini task to the UI
/// thread, tagged with the ticket they answer.
pub(crate) enum GenerationEvent {
    Finished {
        ticket_id: u64,
        result: Result<GeneratedImage>,
    },
}

/// A one-line message shown under the upload panel.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    /// Neutral feedback (saved file, copied to clipboard).
    Info(String),
    /// Something the user tried did not work (rejected file, share refused).
    Warning(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(t) | Notice::Warning(t) => t,
        }
    }
}
