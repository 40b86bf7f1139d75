use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum number of prompt rows kept in the editor.
pub const MIN_PROMPTS: usize = 1;

/// Maximum number of prompts in one batch; also bounds request fan-out.
pub const MAX_PROMPTS: usize = 10;

/// One free-text instruction describing a single desired image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptItem {
    pub id: Uuid,
    pub text: String,
}

impl PromptItem {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            text: String::new(),
        }
    }

    pub fn with_text(id: Uuid, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Output framing chosen in the editor.
///
/// The current image model always renders 1:1 and ignores this value, so it is
/// kept as a user preference only and never sent with a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Standard,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
            Self::Standard => "4:3",
        }
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            "1:1" => Ok(Self::Square),
            "4:3" => Ok(Self::Standard),
            other => Err(format!(
                "Invalid aspect ratio '{}'. Must be: 16:9, 9:16, 1:1, or 4:3",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn blank_prompt_ignores_whitespace() {
        let prompt = PromptItem::with_text(Uuid::new_v4(), "  \n\t ");
        assert!(prompt.is_blank());
        assert!(!PromptItem::with_text(Uuid::new_v4(), " a cat ").is_blank());
    }

    #[test]
    fn aspect_ratio_parses_every_label() {
        for ratio in [
            AspectRatio::Landscape,
            AspectRatio::Portrait,
            AspectRatio::Square,
            AspectRatio::Standard,
        ] {
            assert_eq!(AspectRatio::from_str(ratio.as_str()), Ok(ratio));
        }
        assert!(AspectRatio::from_str("21:9").is_err());
    }

    #[test]
    fn aspect_ratio_serializes_as_label() {
        let json = serde_json::to_string(&AspectRatio::Landscape).unwrap();
        assert_eq!(json, "\"16:9\"");
        assert_eq!(AspectRatio::default(), AspectRatio::Square);
    }
}
