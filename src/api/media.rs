use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::{
    AddMediaRequest, ApiError, ApiResponse, AppState, LibraryQuery, MediaDto, ModalDto,
    SearchQuery, SearchResultDto, SyncResultDto, ToggleResultDto, UpdateDetailsRequest,
    UpdateStatusRequest,
};
use crate::models::media::MediaKind;
use crate::services::tracker::{DetailsUpdate, ToggleScope};

fn parse_kind(raw: &str) -> Result<MediaKind, ApiError> {
    raw.parse().map_err(ApiError::validation)
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<SearchResultDto>>>, ApiError> {
    let results = state.tracker.search_catalog(&query.q).await?;
    Ok(Json(ApiResponse::success(
        results.into_iter().map(Into::into).collect(),
    )))
}

pub async fn list_library(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LibraryQuery>,
) -> Result<Json<ApiResponse<Vec<MediaDto>>>, ApiError> {
    let filter = query
        .filter
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(ApiError::validation)?;

    let records = state
        .tracker
        .list_library(filter, query.search.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(
        records.into_iter().map(Into::into).collect(),
    )))
}

pub async fn add_media(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddMediaRequest>,
) -> Result<Json<ApiResponse<MediaDto>>, ApiError> {
    if request.tmdb_id <= 0 {
        return Err(ApiError::validation("tmdb_id must be positive"));
    }

    let record = state
        .tracker
        .add_to_library(
            request.tmdb_id,
            request.media_type,
            request.status,
            request.is_anime,
        )
        .await?;

    Ok(Json(ApiResponse::success(record.into())))
}

pub async fn get_modal(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, i32)>,
) -> Result<Json<ApiResponse<ModalDto>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let view = state.tracker.modal_view(id, kind).await?;
    Ok(Json(ApiResponse::success(view.into())))
}

pub async fn sync_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SyncResultDto>>, ApiError> {
    let report = state.tracker.sync_media(id).await?;
    Ok(Json(ApiResponse::success(report.into())))
}

pub async fn toggle_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ToggleResultDto>>, ApiError> {
    let outcome = state.tracker.toggle_watched(id, ToggleScope::Show).await?;
    Ok(Json(ApiResponse::success(outcome.into())))
}

pub async fn toggle_season(
    State(state): State<Arc<AppState>>,
    Path((id, season)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<ToggleResultDto>>, ApiError> {
    let outcome = state
        .tracker
        .toggle_watched(id, ToggleScope::Season { season })
        .await?;
    Ok(Json(ApiResponse::success(outcome.into())))
}

pub async fn toggle_episode(
    State(state): State<Arc<AppState>>,
    Path((id, season, episode)): Path<(i32, i32, i32)>,
) -> Result<Json<ApiResponse<ToggleResultDto>>, ApiError> {
    let outcome = state
        .tracker
        .toggle_watched(id, ToggleScope::Episode { season, episode })
        .await?;
    Ok(Json(ApiResponse::success(outcome.into())))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<MediaDto>>, ApiError> {
    let record = state.tracker.set_status(id, request.status).await?;
    Ok(Json(ApiResponse::success(record.into())))
}

pub async fn update_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateDetailsRequest>,
) -> Result<Json<ApiResponse<MediaDto>>, ApiError> {
    let record = state
        .tracker
        .update_details(
            id,
            DetailsUpdate {
                status: request.status,
                rating: request.rating,
                notes: request.notes,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(record.into())))
}

pub async fn toggle_anime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MediaDto>>, ApiError> {
    let record = state.tracker.toggle_anime(id).await?;
    Ok(Json(ApiResponse::success(record.into())))
}

pub async fn remove_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.tracker.remove(id).await?;
    Ok(Json(ApiResponse::success(())))
}
