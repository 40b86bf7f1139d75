use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Action, AppState, StudioError, VALIDATION_MESSAGE};
use crate::archive;
use crate::gemini::ImageGenerator;
use crate::orchestrator;

/// Shared handle to the application state and the image service.
///
/// The state lock is never held while a generation call is in flight, so
/// snapshots stay available (showing `loading`) during a batch.
#[derive(Clone)]
pub struct Studio {
    state: Arc<Mutex<AppState>>,
    generator: Arc<dyn ImageGenerator>,
}

impl Studio {
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self::with_state(generator, AppState::default())
    }

    pub fn with_state(generator: Arc<dyn ImageGenerator>, state: AppState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            generator,
        }
    }

    pub async fn snapshot(&self) -> AppState {
        self.state.lock().await.clone()
    }

    /// Apply a synchronous action and return the resulting state.
    pub async fn dispatch(&self, action: Action) -> Result<AppState, StudioError> {
        let mut state = self.state.lock().await;
        state.apply(action)?;
        Ok(state.clone())
    }

    /// Append an empty prompt row with a fresh id.
    pub async fn add_prompt(&self) -> Result<AppState, StudioError> {
        self.dispatch(Action::AddPrompt { id: Uuid::new_v4() }).await
    }

    /// Run the whole batch and replace the results with its successes.
    ///
    /// Validation failures make no service call, leave an error in the state
    /// and return [`StudioError::Validation`]. Per-prompt failures are not an
    /// `Err`: they are summarised in the returned state's `error`.
    pub async fn generate_all(&self) -> Result<AppState, StudioError> {
        let (prompts, characters) = {
            let mut state = self.state.lock().await;
            state.apply(Action::BatchStarted)?;

            let prompts = state.runnable_prompts();
            let characters = state.ready_characters();
            if prompts.is_empty() || characters.is_empty() {
                tracing::warn!("Batch rejected: {}", VALIDATION_MESSAGE);
                state.apply(Action::ValidationFailed(VALIDATION_MESSAGE.to_string()))?;
                return Err(StudioError::Validation(VALIDATION_MESSAGE.to_string()));
            }
            (prompts, characters)
        };

        let outcomes = orchestrator::run_batch(self.generator.as_ref(), &prompts, &characters).await;

        self.finish(Action::BatchFinished(outcomes)).await
    }

    /// Regenerate one result with its existing prompt.
    ///
    /// On failure the previous image stays in place and the error is recorded.
    pub async fn regenerate(&self, id: Uuid) -> Result<AppState, StudioError> {
        let (image, characters) = {
            let mut state = self.state.lock().await;
            let image = state.result(id).cloned().ok_or(StudioError::ResultNotFound(id))?;
            state.apply(Action::RegenerationStarted)?;
            (image, state.characters().to_vec())
        };

        let action =
            match orchestrator::regenerate(self.generator.as_ref(), &image, &characters).await {
                Ok(replacement) => Action::ImageReplaced(replacement),
                Err(e) => {
                    tracing::warn!(result_id = %id, "Regeneration failed: {}", e);
                    Action::GenerationFailed(format!("Failed to regenerate image: {}", e))
                }
            };

        self.finish(action).await
    }

    /// Regenerate the result being edited using the draft prompt.
    ///
    /// A blank draft is a no-op. Otherwise the edit modal is closed afterwards,
    /// whether the call succeeded or not.
    pub async fn submit_edit(&self) -> Result<AppState, StudioError> {
        let (image, prompt, characters) = {
            let mut state = self.state.lock().await;
            let draft = state.editing().cloned().ok_or(StudioError::NotEditing)?;
            if draft.text.trim().is_empty() {
                return Ok(state.clone());
            }
            let image = state
                .result(draft.image_id)
                .cloned()
                .ok_or(StudioError::ResultNotFound(draft.image_id))?;
            state.apply(Action::RegenerationStarted)?;
            (image, draft.text, state.characters().to_vec())
        };

        let outcome = orchestrator::edit_and_regenerate(
            self.generator.as_ref(),
            &image,
            &prompt,
            &characters,
        )
        .await;

        let action = match outcome {
            Ok(replacement) => Action::ImageReplaced(replacement),
            Err(e) => {
                tracing::warn!(result_id = %image.id, "Edit regeneration failed: {}", e);
                Action::GenerationFailed(format!(
                    "Failed to regenerate image with new prompt: {}",
                    e
                ))
            }
        };

        let finished = self.finish(action).await;
        let closed = self.dispatch(Action::CloseEdit).await?;
        finished.map(|_| closed)
    }

    /// Apply the action that ends a generation.
    ///
    /// If it is rejected, e.g. the result was removed while the call was in
    /// flight, the phase still returns to idle with the error recorded.
    async fn finish(&self, action: Action) -> Result<AppState, StudioError> {
        let mut state = self.state.lock().await;
        if let Err(e) = state.apply(action) {
            tracing::warn!("Generation result discarded: {}", e);
            state.apply(Action::GenerationFailed(e.to_string()))?;
            return Err(e);
        }
        Ok(state.clone())
    }

    /// File name and PNG bytes for one result.
    pub async fn download(&self, id: Uuid) -> Result<(String, Vec<u8>), StudioError> {
        let state = self.state.lock().await;
        let index = state.result_index(id).ok_or(StudioError::ResultNotFound(id))?;
        let image = &state.results()[index];

        let file_name = archive::download_file_name(index, archive::local_date(&image.created_at));
        let bytes = archive::decode(&image.image_base64)?;
        Ok((file_name, bytes))
    }

    /// File name and ZIP bytes for all results.
    pub async fn archive(&self) -> Result<(String, Vec<u8>), StudioError> {
        let results = self.state.lock().await.results().to_vec();
        if results.is_empty() {
            return Err(StudioError::NoResults);
        }

        let bytes = archive::bundle(&results)?;
        Ok((archive::archive_file_name(archive::today()), bytes))
    }
}
