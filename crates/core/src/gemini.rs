//! Gemini image-editing client.
//!
//! The hosted model is treated as an opaque collaborator: one request goes
//! out carrying the photo and the hat instruction, with the output aspect
//! ratio pinned in the image generation config, and the first inline image
//! that comes back is the result. [`HatRenderer`] is the seam the rest of the
//! crate talks to, so tests can swap in a fake.

use crate::aspect_ratio::AspectRatio;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::hat::{hat_prompt, HatColor};
use crate::image_processing::ImageProcessor;
use gemini_rust::generation::ImageConfig;
use gemini_rust::{Blob, Content, ContentBuilder, Gemini, Message, Part, Role};

/// Media type assumed when the model omits one.
const DEFAULT_RESULT_MIME: &str = "image/png";

/// Everything needed to ask for one hat edit.
#[derive(Debug, Clone, PartialEq)]
pub struct HatRequest {
    /// Base64 image, optionally still wrapped in a data URL.
    pub image_base64: String,
    pub mime_type: String,
    pub aspect_ratio: AspectRatio,
    pub color: HatColor,
}

/// An image returned by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl GeneratedImage {
    /// File extension derived from the media subtype, `png` when absent.
    pub fn extension(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, sub)| sub)
            .filter(|sub| !sub.is_empty())
            .unwrap_or("png")
    }

    pub fn to_data_url(&self) -> String {
        ImageProcessor::to_data_url(&self.mime_type, &self.data)
    }
}

/// Something that can put a hat on a photo.
#[allow(async_fn_in_trait)]
pub trait HatRenderer {
    async fn render_hat(&self, request: &HatRequest) -> Result<GeneratedImage>;
}

pub struct GeminiClient {
    client: Gemini,
    model_name: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        // Explicit base URL avoids a BadScheme error in the client
        let base_url = url::Url::parse("https://generativelanguage.googleapis.com/v1beta/")
            .map_err(|e| AppError::Config(format!("Invalid base URL: {}", e)))?;

        let model_name = if config.model_name.starts_with("models/") {
            config.model_name.clone()
        } else {
            format!("models/{}", config.model_name)
        };
        let model_url = format!("https://generativelanguage.googleapis.com/v1beta/{}", model_name);

        let client = Gemini::with_model_and_base_url(&config.gemini_api_key, model_url, base_url)
            .map_err(|e| AppError::Config(format!("Failed to create Gemini client: {}", e)))?;

        Ok(Self {
            client,
            model_name,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Prepares the generation call for `request` without sending it.
    pub fn content_builder(&self, request: &HatRequest) -> ContentBuilder {
        self.client
            .generate_content()
            .with_messages(vec![build_message(request)])
            .with_image_config(image_config(request.aspect_ratio))
    }
}

impl HatRenderer for GeminiClient {
    async fn render_hat(&self, request: &HatRequest) -> Result<GeneratedImage> {
        tracing::info!(
            model = %self.model_name,
            color = %request.color,
            aspect_ratio = %request.aspect_ratio,
            "requesting hat edit"
        );

        let response = self
            .content_builder(request)
            .execute()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Gemini request failed");
                AppError::gemini(e.to_string())
            })?;

        let parts = response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.as_deref());

        let image = extract_generated_image(parts)?;
        tracing::info!(mime_type = %image.mime_type, bytes = image.data.len(), "hat edit received");
        Ok(image)
    }
}

/// Output shape for the edited image.
pub fn image_config(aspect_ratio: AspectRatio) -> ImageConfig {
    ImageConfig {
        aspect_ratio: Some(aspect_ratio.as_str().to_string()),
        image_size: None,
    }
}

/// Builds the single user message: image, then instruction.
pub fn build_message(request: &HatRequest) -> Message {
    let image_part = Part::InlineData {
        inline_data: Blob {
            mime_type: request.mime_type.clone(),
            data: ImageProcessor::strip_data_url_prefix(&request.image_base64).to_string(),
        },
        media_resolution: None,
    };

    let prompt_part = Part::Text {
        text: hat_prompt(request.color),
        thought: None,
        thought_signature: None,
    };

    Message {
        role: Role::User,
        content: Content {
            role: Some(Role::User),
            parts: Some(vec![image_part, prompt_part]),
        },
    }
}

/// Takes the first part carrying inline image data.
///
/// `parts` are the content parts of the first candidate, `None` when the
/// response had no candidates.
pub fn extract_generated_image(parts: Option<&[Part]>) -> Result<GeneratedImage> {
    let blob = parts
        .unwrap_or_default()
        .iter()
        .find_map(|part| match part {
            Part::InlineData { inline_data, .. } if !inline_data.data.is_empty() => Some(inline_data),
            _ => None,
        })
        .ok_or(AppError::NoImageReturned)?;

    let mime_type = if blob.mime_type.is_empty() {
        DEFAULT_RESULT_MIME.to_string()
    } else {
        blob.mime_type.clone()
    };

    Ok(GeneratedImage {
        data: ImageProcessor::decode_base64(&blob.data)?,
        mime_type,
    })
}
