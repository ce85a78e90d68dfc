//! services/api/src/adapters/layout_llm.rs
//!
//! This module contains the adapter for the floor-plan image model.
//! It implements the `LayoutGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat, ImageSize},
    Client,
};
use async_trait::async_trait;
use buildestimate_core::ports::{LayoutGenerationService, PortError, PortResult};

/// An adapter that implements `LayoutGenerationService` using an OpenAI-compatible image API.
#[derive(Clone)]
pub struct OpenAiLayoutAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiLayoutAdapter {
    /// Creates a new `OpenAiLayoutAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Picks the supported size closest to the requested aspect ratio.
pub fn size_for_aspect_ratio(aspect_ratio: &str) -> ImageSize {
    let ratio = aspect_ratio
        .split_once(':')
        .and_then(|(w, h)| Some((w.trim().parse::<f64>().ok()?, h.trim().parse::<f64>().ok()?)))
        .filter(|(_, h)| *h > 0.0)
        .map(|(w, h)| w / h)
        .unwrap_or(1.0);

    if ratio > 1.2 {
        ImageSize::S1792x1024
    } else if ratio < 0.8 {
        ImageSize::S1024x1792
    } else {
        ImageSize::S1024x1024
    }
}

/// Wraps base64 image bytes as a displayable data URL.
pub fn to_data_url(b64: &str) -> String {
    format!("data:image/png;base64,{}", b64)
}

#[async_trait]
impl LayoutGenerationService for OpenAiLayoutAdapter {
    async fn generate_layout(&self, prompt: &str, aspect_ratio: &str) -> PortResult<String> {
        let request = CreateImageRequestArgs::default()
            .prompt(prompt)
            .model(ImageModel::Other(self.model.clone()))
            .n(1)
            .size(size_for_aspect_ratio(aspect_ratio))
            .response_format(ImageResponseFormat::B64Json)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .images()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let image = response.data.into_iter().next().ok_or_else(|| {
            PortError::Unexpected("Layout model returned no images.".to_string())
        })?;

        match image.as_ref() {
            Image::B64Json { b64_json, .. } if !b64_json.is_empty() => Ok(to_data_url(b64_json)),
            Image::Url { url, .. } if !url.is_empty() => Ok(url.clone()),
            _ => Err(PortError::Unexpected(
                "Layout model returned an empty image.".to_string(),
            )),
        }
    }
}
