mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::Studio;

/// Largest accepted character upload.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn create_router(studio: Studio) -> Router {
    let api = Router::new()
        // State
        .route("/state", get(handlers::get_state))
        .route("/error", delete(handlers::dismiss_error))
        // Characters
        .route("/characters/{id}/image", put(handlers::upload_character_image))
        .route("/characters/{id}/image", delete(handlers::clear_character_image))
        .route("/characters/{id}/selected", put(handlers::select_character))
        .route("/aspect-ratio", put(handlers::set_aspect_ratio))
        // Prompts
        .route("/prompts", post(handlers::add_prompt))
        .route("/prompts/{id}", put(handlers::update_prompt))
        .route("/prompts/{id}", delete(handlers::remove_prompt))
        // Generation
        .route("/generate", post(handlers::generate_all))
        .route("/results/archive", get(handlers::download_archive))
        .route("/results/{id}/regenerate", post(handlers::regenerate))
        .route("/results/{id}/download", get(handlers::download_result))
        .route("/results/{id}/preview", post(handlers::open_preview))
        .route("/preview", delete(handlers::close_preview))
        // Edit modal
        .route("/results/{id}/edit", post(handlers::begin_edit))
        .route("/edit", put(handlers::update_edit_draft))
        .route("/edit", delete(handlers::close_edit))
        .route("/edit/submit", post(handlers::submit_edit))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(studio)
}
