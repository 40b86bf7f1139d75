//! Process configuration, resolved once at startup from environment variables:
//! - `GEMINI_API_KEY` (or `API_KEY`) - service credential, required
//! - `STORY_STUDIO_GEMINI_URL` - API base URL (default: `https://generativelanguage.googleapis.com/v1beta`)
//! - `STORY_STUDIO_MODEL` - image model (default: `gemini-2.5-flash-image`)
//! - `STORY_STUDIO_DOWNLOAD_DIR` - where downloads are written (default: the user's download directory)

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_KEY environment variable not set")]
    MissingApiKey,
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub gemini_url: String,
    pub model: String,
    pub download_dir: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("gemini_url", &self.gemini_url)
            .field("model", &self.model)
            .field("download_dir", &self.download_dir)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = non_empty("GEMINI_API_KEY")
            .or_else(|| non_empty("API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        let gemini_url = non_empty("STORY_STUDIO_GEMINI_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string());

        let model = non_empty("STORY_STUDIO_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let download_dir = non_empty("STORY_STUDIO_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            api_key,
            gemini_url,
            model,
            download_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let result = Config::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let result = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "   ")]));
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn falls_back_to_api_key_variable() {
        let config = Config::from_lookup(lookup(&[("API_KEY", "legacy")])).unwrap();
        assert_eq!(config.api_key, "legacy");
        assert_eq!(config.gemini_url, DEFAULT_GEMINI_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "key"),
            ("API_KEY", "ignored"),
            ("STORY_STUDIO_GEMINI_URL", "http://127.0.0.1:9000/v1beta/"),
            ("STORY_STUDIO_MODEL", "test-model"),
            ("STORY_STUDIO_DOWNLOAD_DIR", "/tmp/story"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "key");
        assert_eq!(config.gemini_url, "http://127.0.0.1:9000/v1beta");
        assert_eq!(config.model, "test-model");
        assert_eq!(config.download_dir, PathBuf::from("/tmp/story"));
    }

    #[test]
    fn debug_output_hides_the_api_key() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "secret-key-123")])).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-key-123"));
        assert!(debug.contains(DEFAULT_MODEL));
    }
}
