//! Shared test fixtures: a scripted image generator and state builders.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use story_studio::gemini::{GenerationError, GenerationRequest, ImageGenerator};
use story_studio::models::*;
use story_studio::state::{Action, AppState};
use uuid::Uuid;

/// Fails any prompt containing `fail`; otherwise returns the base64 of
/// `image-<n>` where `n` counts calls starting at 1. Records every request.
#[derive(Default)]
pub struct ScriptedGenerator {
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());

        // Give sibling calls a chance to interleave
        tokio::task::yield_now().await;

        if request.prompt().contains("fail") {
            return Err(GenerationError::Service(format!(
                "500 Internal Server Error: refused '{}'",
                request.prompt()
            )));
        }
        Ok(story_studio::archive::encode_file(
            format!("image-{}", n).as_bytes(),
        ))
    }
}

/// A tiny PNG-like payload for uploads.
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 1, 2, 3]
}

pub fn character_with_image(id: CharacterId) -> Character {
    let mut character = Character::new(id);
    character.attach_image(ReferenceImage::new(png_bytes(), "image/png"));
    character
}

pub fn prompts(texts: &[&str]) -> Vec<PromptItem> {
    texts
        .iter()
        .map(|t| PromptItem::with_text(Uuid::new_v4(), *t))
        .collect()
}

/// State with the given characters uploaded and the given prompts filled in.
pub fn state_with(characters: &[CharacterId], texts: &[&str]) -> AppState {
    let mut state = AppState::default();
    for &id in characters {
        state
            .apply(Action::AttachImage {
                id,
                image: ReferenceImage::new(png_bytes(), "image/png"),
            })
            .unwrap();
    }
    for (i, text) in texts.iter().enumerate() {
        if i > 0 {
            state.apply(Action::AddPrompt { id: Uuid::new_v4() }).unwrap();
        }
        let id = state.prompts().last().unwrap().id;
        state
            .apply(Action::UpdatePrompt {
                id,
                text: text.to_string(),
            })
            .unwrap();
    }
    state
}
