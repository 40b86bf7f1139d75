//! Image generation service.
//!
//! [`ImageGenerator`] is the seam between the orchestrator and the outside
//! world. [`GeminiClient`] is the production implementation; tests substitute
//! scripted generators.

mod client;
pub mod types;

pub use client::GeminiClient;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Character, CharacterId};

/// Image generation errors.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Please select at least one character reference and upload an image for it.")]
    NoReferences,

    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized: check GEMINI_API_KEY")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("No image was generated. The model may have refused the request due to safety settings.")]
    NoImage,
}

/// A reference image attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterReference {
    pub character_id: CharacterId,
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

/// A validated request: one prompt plus at least one reference image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    prompt: String,
    references: Vec<CharacterReference>,
}

impl GenerationRequest {
    /// Build a request from the characters that are selected and carry an image.
    ///
    /// Fails with [`GenerationError::NoReferences`] when none qualify, before
    /// anything is sent.
    pub fn new<'a>(
        prompt: impl Into<String>,
        characters: impl IntoIterator<Item = &'a Character>,
    ) -> Result<Self, GenerationError> {
        let references: Vec<CharacterReference> = characters
            .into_iter()
            .filter(|c| c.is_ready())
            .filter_map(|c| {
                let image = c.image()?;
                let data = c.image_base64()?;
                Some(CharacterReference {
                    character_id: c.id(),
                    mime_type: image.mime_type.clone(),
                    data: data.to_string(),
                })
            })
            .collect();

        if references.is_empty() {
            return Err(GenerationError::NoReferences);
        }

        Ok(Self {
            prompt: prompt.into(),
            references,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn references(&self) -> &[CharacterReference] {
        &self.references
    }

    pub fn character_ids(&self) -> Vec<CharacterId> {
        self.references.iter().map(|r| r.character_id).collect()
    }

    /// The instruction actually sent to the model: the user's prompt plus
    /// guidance naming each reference character.
    pub fn instruction(&self) -> String {
        let names = self
            .references
            .iter()
            .map(|r| format!("Character {}", r.character_id))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{}. Please use the provided image(s) as reference for {}. Maintain their appearance and style consistently.",
            self.prompt, names
        )
    }
}

/// Generates one image for a prompt and its reference images.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the generated image as base64.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
