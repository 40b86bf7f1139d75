//! HTTP client for the Gemini image model.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::types::{
    ApiErrorResponse, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Modality, Part,
};
use super::{GenerationError, GenerationRequest, ImageGenerator};
use crate::config::Config;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP client for the `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.gemini_url, &config.api_key, &config.model)
    }

    /// Create with explicit configuration.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model_path
        )
    }

    /// Build the wire request: reference images first, then the instruction.
    fn build_body(request: &GenerationRequest) -> GenerateContentRequest {
        let mut parts: Vec<Part> = request
            .references()
            .iter()
            .map(|r| Part::inline(&r.mime_type, &r.data))
            .collect();
        parts.push(Part::text(request.instruction()));

        GenerateContentRequest {
            contents: vec![Content { role: None, parts }],
            generation_config: GenerationConfig {
                response_modalities: vec![Modality::Image],
            },
        }
    }

    /// Handle response, converting HTTP errors to GenerationError.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);

        match status {
            StatusCode::BAD_REQUEST => Err(GenerationError::BadRequest(message)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GenerationError::Unauthorized),
            _ => Err(GenerationError::Service(format!("{}: {}", status, message))),
        }
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = Self::build_body(request);

        tracing::debug!(
            model = %self.model,
            references = request.references().len(),
            "Requesting image"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let response = self.handle_response(response).await?;

        match response.first_image() {
            Some(image) => Ok(image.to_string()),
            None => {
                if let Some(reason) = response.block_reason() {
                    tracing::warn!("Image request blocked: {}", reason);
                }
                Err(GenerationError::NoImage)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_prefixes_model_path() {
        let client = GeminiClient::new("http://localhost:9000/v1beta/", "key", "gemini-2.5-flash-image");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash-image:generateContent"
        );

        let client = GeminiClient::new("http://localhost:9000/v1beta", "key", "models/custom");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1beta/models/custom:generateContent"
        );
    }

    #[test]
    fn debug_output_hides_the_api_key() {
        let client = GeminiClient::new("http://localhost:9000/v1beta", "secret-key-123", "model");

        let debug = format!("{:?}", client);

        assert!(!debug.contains("secret-key-123"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("http://localhost:9000/v1beta"));
    }
}
