use std::env;
use crate::error::{AppError, Result};
use dotenvy::dotenv;

/// Model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub model_name: String
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .map_err(|_| AppError::Config("GEMINI_API_KEY must be set in environment or .env file".to_string()))?;

        let model_name = env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Self::builder()
            .with_api_key(api_key)
            .with_model(model_name)
            .build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builds a [`Config`] without touching the environment.
#[derive(Default)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    model: Option<String>,
}

impl ConfigBuilder {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn build(self) -> Result<Config> {
        let gemini_api_key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::config("API key must not be empty"))?;

        let model_name = self
            .model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Config {
            gemini_api_key,
            model_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_model() {
        let config = Config::builder().with_api_key("key").build().unwrap();
        assert_eq!(config.gemini_api_key, "key");
        assert_eq!(config.model_name, DEFAULT_MODEL);
    }

    #[test]
    fn test_builder_rejects_blank_key() {
        let err = Config::builder().with_api_key("   ").build().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_builder_keeps_model_override() {
        let config = Config::builder()
            .with_api_key("key")
            .with_model("gemini-3-pro-image-preview")
            .build()
            .unwrap();
        assert_eq!(config.model_name, "gemini-3-pro-image-preview");
    }
}
