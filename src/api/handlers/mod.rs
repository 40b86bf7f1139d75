use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::*;
use crate::state::{Action, AppState, Studio, StudioError};

// ============================================================
// Request Types
// ============================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct SelectCharacterRequest {
    pub selected: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AspectRatioRequest {
    pub aspect_ratio: AspectRatio,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TextRequest {
    pub text: String,
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map a state-container error to a status and a user-facing message.
fn studio_error(e: StudioError) -> (StatusCode, String) {
    let status = match &e {
        StudioError::Validation(_)
        | StudioError::CharacterWithoutImage(_)
        | StudioError::TooManyPrompts
        | StudioError::TooFewPrompts
        | StudioError::NotEditing
        | StudioError::NoResults => StatusCode::BAD_REQUEST,
        StudioError::CharacterNotFound(_)
        | StudioError::PromptNotFound(_)
        | StudioError::ResultNotFound(_) => StatusCode::NOT_FOUND,
        StudioError::Busy => StatusCode::CONFLICT,
        StudioError::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let msg = e.to_string();
    if status.is_server_error() {
        tracing::error!("Internal error: {}", msg);
    } else {
        tracing::warn!("Rejected action: {}", msg);
    }
    (status, msg)
}

fn respond(result: Result<AppState, StudioError>) -> ApiResult<Json<AppState>> {
    result.map(Json).map_err(studio_error)
}

/// A file download response.
fn attachment(content_type: &str, file_name: &str, bytes: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
}

// ============================================================
// Health & State
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn get_state(State(studio): State<Studio>) -> Json<AppState> {
    Json(studio.snapshot().await)
}

pub async fn dismiss_error(State(studio): State<Studio>) -> ApiResult<Json<AppState>> {
    respond(studio.dispatch(Action::DismissError).await)
}

// ============================================================
// Characters
// ============================================================

pub async fn upload_character_image(
    State(studio): State<Studio>,
    Path(id): Path<CharacterId>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<AppState>> {
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
        .filter(|m| m.starts_with("image/"))
        .ok_or((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected an image/* Content-Type".to_string(),
        ))?;

    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Image body is empty".to_string()));
    }

    tracing::info!("Character {} image uploaded ({}, {} bytes)", id, mime_type, body.len());

    respond(
        studio
            .dispatch(Action::AttachImage {
                id,
                image: ReferenceImage::new(body.to_vec(), mime_type),
            })
            .await,
    )
}

pub async fn clear_character_image(
    State(studio): State<Studio>,
    Path(id): Path<CharacterId>,
) -> ApiResult<Json<AppState>> {
    respond(studio.dispatch(Action::ClearImage { id }).await)
}

pub async fn select_character(
    State(studio): State<Studio>,
    Path(id): Path<CharacterId>,
    Json(input): Json<SelectCharacterRequest>,
) -> ApiResult<Json<AppState>> {
    respond(
        studio
            .dispatch(Action::SelectCharacter {
                id,
                selected: input.selected,
            })
            .await,
    )
}

pub async fn set_aspect_ratio(
    State(studio): State<Studio>,
    Json(input): Json<AspectRatioRequest>,
) -> ApiResult<Json<AppState>> {
    tracing::debug!("Aspect ratio set to {}", input.aspect_ratio.as_str());
    respond(studio.dispatch(Action::SetAspectRatio(input.aspect_ratio)).await)
}

// ============================================================
// Prompts
// ============================================================

pub async fn add_prompt(
    State(studio): State<Studio>,
) -> ApiResult<(StatusCode, Json<AppState>)> {
    studio
        .add_prompt()
        .await
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(studio_error)
}

pub async fn update_prompt(
    State(studio): State<Studio>,
    Path(id): Path<Uuid>,
    Json(input): Json<TextRequest>,
) -> ApiResult<Json<AppState>> {
    respond(
        studio
            .dispatch(Action::UpdatePrompt {
                id,
                text: input.text,
            })
            .await,
    )
}

pub async fn remove_prompt(
    State(studio): State<Studio>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AppState>> {
    respond(studio.dispatch(Action::RemovePrompt { id }).await)
}

// ============================================================
// Generation
// ============================================================

pub async fn generate_all(State(studio): State<Studio>) -> ApiResult<Json<AppState>> {
    respond(studio.generate_all().await)
}

pub async fn regenerate(
    State(studio): State<Studio>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AppState>> {
    respond(studio.regenerate(id).await)
}

pub async fn open_preview(
    State(studio): State<Studio>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AppState>> {
    respond(studio.dispatch(Action::OpenPreview { id }).await)
}

pub async fn close_preview(State(studio): State<Studio>) -> ApiResult<Json<AppState>> {
    respond(studio.dispatch(Action::ClosePreview).await)
}

// ============================================================
// Edit
// ============================================================

pub async fn begin_edit(
    State(studio): State<Studio>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AppState>> {
    respond(studio.dispatch(Action::BeginEdit { id }).await)
}

pub async fn update_edit_draft(
    State(studio): State<Studio>,
    Json(input): Json<TextRequest>,
) -> ApiResult<Json<AppState>> {
    respond(studio.dispatch(Action::UpdateEditDraft { text: input.text }).await)
}

pub async fn close_edit(State(studio): State<Studio>) -> ApiResult<Json<AppState>> {
    respond(studio.dispatch(Action::CloseEdit).await)
}

pub async fn submit_edit(State(studio): State<Studio>) -> ApiResult<Json<AppState>> {
    respond(studio.submit_edit().await)
}

// ============================================================
// Downloads
// ============================================================

pub async fn download_result(
    State(studio): State<Studio>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (file_name, bytes) = studio.download(id).await.map_err(studio_error)?;
    Ok(attachment("image/png", &file_name, bytes))
}

pub async fn download_archive(State(studio): State<Studio>) -> ApiResult<impl IntoResponse> {
    let (file_name, bytes) = studio.archive().await.map_err(studio_error)?;
    tracing::info!("Serving archive {} ({} bytes)", file_name, bytes.len());
    Ok(attachment("application/zip", &file_name, bytes))
}
