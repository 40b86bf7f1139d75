use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::character::CharacterId;

/// An image produced by a successful generation call.
///
/// `id` is the id of the prompt that produced it. Regenerating or editing
/// replaces the entry in place under the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub id: Uuid,
    pub prompt: String,
    /// Base64-encoded PNG returned by the service.
    pub image_base64: String,
    pub characters_used: Vec<CharacterId>,
    pub created_at: DateTime<Utc>,
}

/// Result of one generation attempt within a batch, keyed by prompt id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded(GeneratedImage),
    Failed {
        id: Uuid,
        prompt: String,
        error: String,
    },
}

impl Outcome {
    /// Id of the prompt this outcome belongs to.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Succeeded(image) => image.id,
            Self::Failed { id, .. } => *id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn image(&self) -> Option<&GeneratedImage> {
        match self {
            Self::Succeeded(image) => Some(image),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}
