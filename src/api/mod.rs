use axum::{
    Json, Router,
    extract::State,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod media;
pub mod types;

pub use error::ApiError;
pub use types::{
    AddMediaRequest, ApiResponse, EpisodeDto, LibraryQuery, MediaDto, ModalDto, SearchQuery,
    SearchResultDto, SeasonDto, SyncResultDto, ToggleResultDto, UpdateDetailsRequest,
    UpdateStatusRequest,
};

pub use crate::scheduler::AppState;

async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<&'static str>> {
    match state.store.ping().await {
        Ok(()) => Json(ApiResponse::success("ok")),
        Err(e) => Json(ApiResponse::error(format!("database unreachable: {e}"))),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .server
        .cors_allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };

    let api_router = Router::new()
        .route("/health", get(health))
        .route("/search", get(media::search))
        .route("/library", get(media::list_library))
        .route("/media", post(media::add_media))
        .route("/media/{kind}/{id}/modal", get(media::get_modal))
        .route("/media/{id}/sync", post(media::sync_media))
        .route("/media/{id}/toggle", post(media::toggle_show))
        .route(
            "/media/{id}/seasons/{season}/toggle",
            post(media::toggle_season),
        )
        .route(
            "/media/{id}/seasons/{season}/episodes/{episode}/toggle",
            post(media::toggle_episode),
        )
        .route("/media/{id}/status", put(media::update_status))
        .route("/media/{id}", put(media::update_details))
        .route("/media/{id}/anime", post(media::toggle_anime))
        .route("/media/{id}", delete(media::remove_media))
        .with_state(state);

    Router::new()
        .nest("/api", api_router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
