//! Batch generation: one service call per prompt, fired together and joined.
//!
//! A failing call is converted into [`Outcome::Failed`] inside its own future,
//! so it never cancels or delays its siblings. There is no retry and no
//! cancellation; every call runs to completion before [`run_batch`] returns.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;

use crate::gemini::{GenerationError, GenerationRequest, ImageGenerator};
use crate::models::{Character, GeneratedImage, Outcome, PromptItem};

/// Generate one image per prompt, concurrently.
///
/// `prompts` must already exclude blank entries and `characters` must already
/// be limited to selected characters with an image. Returns exactly one
/// outcome per prompt, in input order.
pub async fn run_batch(
    generator: &dyn ImageGenerator,
    prompts: &[PromptItem],
    characters: &[Character],
) -> Vec<Outcome> {
    let characters_used: Vec<_> = characters.iter().map(Character::id).collect();

    tracing::info!(
        prompts = prompts.len(),
        characters = characters.len(),
        "Starting batch generation"
    );

    let calls = prompts.iter().map(|prompt| {
        let characters_used = characters_used.clone();
        async move {
            match generate(generator, &prompt.text, characters).await {
                Ok(image_base64) => Outcome::Succeeded(GeneratedImage {
                    id: prompt.id,
                    prompt: prompt.text.clone(),
                    image_base64,
                    characters_used,
                    created_at: Utc::now(),
                }),
                Err(e) => {
                    tracing::warn!(prompt_id = %prompt.id, "Generation failed: {}", e);
                    Outcome::Failed {
                        id: prompt.id,
                        prompt: prompt.text.clone(),
                        error: e.to_string(),
                    }
                }
            }
        }
    });

    let outcomes = join_all(calls).await;

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    tracing::info!(
        succeeded = outcomes.len() - failed,
        failed,
        "Batch generation finished"
    );

    outcomes
}

/// Generate a fresh image for an existing result, keeping its prompt.
///
/// The references are the current characters listed in
/// `image.characters_used`. On failure the caller keeps the old image.
pub async fn regenerate(
    generator: &dyn ImageGenerator,
    image: &GeneratedImage,
    characters: &[Character],
) -> Result<GeneratedImage, GenerationError> {
    replace(generator, image, image.prompt.clone(), characters).await
}

/// Like [`regenerate`], but with a new prompt that replaces the old one.
///
/// A prompt that is blank after trimming is rejected without calling the service.
pub async fn edit_and_regenerate(
    generator: &dyn ImageGenerator,
    image: &GeneratedImage,
    new_prompt: &str,
    characters: &[Character],
) -> Result<GeneratedImage, GenerationError> {
    if new_prompt.trim().is_empty() {
        return Err(GenerationError::EmptyPrompt);
    }
    replace(generator, image, new_prompt.to_string(), characters).await
}

async fn replace(
    generator: &dyn ImageGenerator,
    image: &GeneratedImage,
    prompt: String,
    characters: &[Character],
) -> Result<GeneratedImage, GenerationError> {
    let references = characters
        .iter()
        .filter(|c| image.characters_used.contains(&c.id()));

    let request = GenerationRequest::new(prompt.as_str(), references)?;
    let image_base64 = generator.generate(&request).await?;

    Ok(GeneratedImage {
        id: image.id,
        prompt,
        image_base64,
        characters_used: image.characters_used.clone(),
        created_at: advance(image.created_at),
    })
}

async fn generate(
    generator: &dyn ImageGenerator,
    prompt: &str,
    characters: &[Character],
) -> Result<String, GenerationError> {
    let request = GenerationRequest::new(prompt, characters)?;
    generator.generate(&request).await
}

/// The current time, or just after `previous` if the clock has not moved past it.
fn advance(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_strictly_forward() {
        let future = Utc::now() + Duration::hours(1);
        assert!(advance(future) > future);

        let past = Utc::now() - Duration::hours(1);
        assert!(advance(past) > past);
    }
}
