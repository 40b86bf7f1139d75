//! Application state container.
//!
//! [`AppState`] owns every entity. It only changes through [`AppState::apply`],
//! which takes one [`Action`] at a time; a rejected action leaves the state
//! untouched. [`Studio`] wraps the state for async use and turns user actions
//! that need the image service into orchestrator calls.

mod studio;

pub use studio::Studio;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::archive::ArchiveError;
use crate::models::*;

/// Surfaced when a batch has no usable prompt or no usable character.
pub const VALIDATION_MESSAGE: &str =
    "Please provide at least one prompt and select one character with an uploaded image.";

/// Errors from user actions on the state container.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("{0}")]
    Validation(String),

    #[error("Character {0} not found")]
    CharacterNotFound(CharacterId),

    #[error("Character {0} has no image to select")]
    CharacterWithoutImage(CharacterId),

    #[error("Prompt {0} not found")]
    PromptNotFound(Uuid),

    #[error("Result {0} not found")]
    ResultNotFound(Uuid),

    #[error("At most {} prompts are allowed", MAX_PROMPTS)]
    TooManyPrompts,

    #[error("At least {} prompt is required", MIN_PROMPTS)]
    TooFewPrompts,

    #[error("No image is being edited")]
    NotEditing,

    #[error("No images to download")]
    NoResults,

    #[error("A generation is already in progress")]
    Busy,

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Generation lifecycle. `Idle` covers the with-results and with-error cases;
/// those are told apart by `results` and `error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
}

/// The edit modal: which result is open and the draft prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditDraft {
    pub image_id: Uuid,
    pub text: String,
}

/// Every user-visible state change.
#[derive(Debug, Clone)]
pub enum Action {
    AttachImage { id: CharacterId, image: ReferenceImage },
    ClearImage { id: CharacterId },
    SelectCharacter { id: CharacterId, selected: bool },
    SetAspectRatio(AspectRatio),
    AddPrompt { id: Uuid },
    RemovePrompt { id: Uuid },
    UpdatePrompt { id: Uuid, text: String },
    /// A full batch starts: results and error are cleared.
    BatchStarted,
    /// A single-image regeneration starts: results are kept.
    RegenerationStarted,
    ValidationFailed(String),
    BatchFinished(Vec<Outcome>),
    ImageReplaced(GeneratedImage),
    GenerationFailed(String),
    OpenPreview { id: Uuid },
    ClosePreview,
    BeginEdit { id: Uuid },
    UpdateEditDraft { text: String },
    CloseEdit,
    DismissError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppState {
    characters: Vec<Character>,
    aspect_ratio: AspectRatio,
    prompts: Vec<PromptItem>,
    results: Vec<GeneratedImage>,
    phase: Phase,
    error: Option<String>,
    preview: Option<Uuid>,
    editing: Option<EditDraft>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Uuid::new_v4())
    }
}

impl AppState {
    /// Four empty character slots and one empty prompt.
    pub fn new(first_prompt_id: Uuid) -> Self {
        Self {
            characters: Character::slots(),
            aspect_ratio: AspectRatio::default(),
            prompts: vec![PromptItem::new(first_prompt_id)],
            results: Vec::new(),
            phase: Phase::Idle,
            error: None,
            preview: None,
            editing: None,
        }
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| c.id() == id)
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn prompts(&self) -> &[PromptItem] {
        &self.prompts
    }

    pub fn results(&self) -> &[GeneratedImage] {
        &self.results
    }

    pub fn result(&self, id: Uuid) -> Option<&GeneratedImage> {
        self.results.iter().find(|r| r.id == id)
    }

    /// Zero-based position of a result, used for download naming.
    pub fn result_index(&self, id: Uuid) -> Option<usize> {
        self.results.iter().position(|r| r.id == id)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The result shown in the preview modal, if any.
    pub fn preview(&self) -> Option<&GeneratedImage> {
        self.preview.and_then(|id| self.result(id))
    }

    pub fn editing(&self) -> Option<&EditDraft> {
        self.editing.as_ref()
    }

    /// Prompts with non-blank text.
    pub fn runnable_prompts(&self) -> Vec<PromptItem> {
        self.prompts.iter().filter(|p| !p.is_blank()).cloned().collect()
    }

    /// Characters that are selected and carry an image.
    pub fn ready_characters(&self) -> Vec<Character> {
        self.characters
            .iter()
            .filter(|c| c.is_ready())
            .cloned()
            .collect()
    }

    /// Whether a batch would pass validation right now.
    pub fn can_generate(&self) -> bool {
        !self.is_loading()
            && self.prompts.iter().any(|p| !p.is_blank())
            && self.characters.iter().any(Character::is_ready)
    }

    /// Apply one action. On error nothing has changed.
    pub fn apply(&mut self, action: Action) -> Result<(), StudioError> {
        match action {
            Action::AttachImage { id, image } => {
                self.character_mut(id)?.attach_image(image);
            }
            Action::ClearImage { id } => {
                self.character_mut(id)?.clear_image();
            }
            Action::SelectCharacter { id, selected } => {
                if !self.character_mut(id)?.set_selected(selected) {
                    return Err(StudioError::CharacterWithoutImage(id));
                }
            }
            Action::SetAspectRatio(ratio) => {
                self.aspect_ratio = ratio;
            }
            Action::AddPrompt { id } => {
                if self.prompts.len() >= MAX_PROMPTS {
                    return Err(StudioError::TooManyPrompts);
                }
                self.prompts.push(PromptItem::new(id));
            }
            Action::RemovePrompt { id } => {
                let index = self
                    .prompts
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or(StudioError::PromptNotFound(id))?;
                if self.prompts.len() <= MIN_PROMPTS {
                    return Err(StudioError::TooFewPrompts);
                }
                self.prompts.remove(index);
            }
            Action::UpdatePrompt { id, text } => {
                let prompt = self
                    .prompts
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(StudioError::PromptNotFound(id))?;
                prompt.text = text;
            }
            Action::BatchStarted => {
                self.start()?;
                self.results.clear();
                self.preview = None;
                self.editing = None;
            }
            Action::RegenerationStarted => {
                self.start()?;
            }
            Action::ValidationFailed(message) => {
                self.phase = Phase::Idle;
                self.error = Some(message);
            }
            Action::BatchFinished(outcomes) => {
                let total_failed = outcomes.iter().filter(|o| !o.is_success()).count();
                let first_error = outcomes.iter().find_map(Outcome::error).map(str::to_string);

                self.results = outcomes
                    .into_iter()
                    .filter_map(|o| match o {
                        Outcome::Succeeded(image) => Some(image),
                        Outcome::Failed { .. } => None,
                    })
                    .collect();

                if let Some(first_error) = first_error {
                    self.error = Some(format!(
                        "Failed to generate {} image(s). Please check your prompts or try again. Error: {}",
                        total_failed, first_error
                    ));
                }
                self.phase = Phase::Idle;
            }
            Action::ImageReplaced(image) => {
                let slot = self
                    .results
                    .iter_mut()
                    .find(|r| r.id == image.id)
                    .ok_or(StudioError::ResultNotFound(image.id))?;
                *slot = image;
                self.phase = Phase::Idle;
            }
            Action::GenerationFailed(message) => {
                self.error = Some(message);
                self.phase = Phase::Idle;
            }
            Action::OpenPreview { id } => {
                self.result(id).ok_or(StudioError::ResultNotFound(id))?;
                self.preview = Some(id);
            }
            Action::ClosePreview => {
                self.preview = None;
            }
            Action::BeginEdit { id } => {
                let image = self.result(id).ok_or(StudioError::ResultNotFound(id))?;
                self.editing = Some(EditDraft {
                    image_id: id,
                    text: image.prompt.clone(),
                });
            }
            Action::UpdateEditDraft { text } => {
                let draft = self.editing.as_mut().ok_or(StudioError::NotEditing)?;
                draft.text = text;
            }
            Action::CloseEdit => {
                self.editing = None;
            }
            Action::DismissError => {
                self.error = None;
            }
        }
        Ok(())
    }

    fn character_mut(&mut self, id: CharacterId) -> Result<&mut Character, StudioError> {
        self.characters
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or(StudioError::CharacterNotFound(id))
    }

    fn start(&mut self) -> Result<(), StudioError> {
        if self.is_loading() {
            return Err(StudioError::Busy);
        }
        self.phase = Phase::Loading;
        self.error = None;
        Ok(())
    }
}
