use serde::{Deserialize, Serialize};

use crate::clients::tmdb::{CatalogEpisode, CatalogSearchResult, CatalogSeason};
use crate::models::media::{EpisodeEntry, MediaKind, MediaRecord, SeasonEntry, WatchStatus};
use crate::services::tracker::{ModalView, SyncReport, ToggleOutcome};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResultDto {
    pub tmdb_id: i32,
    pub media_type: MediaKind,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: f32,
    pub vote_count: i32,
    pub popularity: f32,
}

impl From<CatalogSearchResult> for SearchResultDto {
    fn from(hit: CatalogSearchResult) -> Self {
        Self {
            tmdb_id: hit.tmdb_id,
            media_type: hit.kind,
            title: hit.title,
            overview: hit.overview,
            poster_path: hit.poster_path,
            release_date: hit.release_date,
            vote_average: hit.vote_average,
            vote_count: hit.vote_count,
            popularity: hit.popularity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MediaDto {
    pub tmdb_id: i32,
    pub media_type: MediaKind,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub is_anime: bool,
    pub status: WatchStatus,
    pub progress: i32,
    pub total_episodes: i32,
    pub rating: f32,
    pub notes: Option<String>,
    pub vote_average: f32,
    pub vote_count: i32,
    pub popularity: f32,
    pub added_at: String,
    pub last_synced_at: Option<String>,
}

impl From<MediaRecord> for MediaDto {
    fn from(record: MediaRecord) -> Self {
        Self {
            tmdb_id: record.tmdb_id,
            media_type: record.kind,
            title: record.title,
            overview: record.overview,
            poster_path: record.poster_path,
            release_date: record.release_date,
            is_anime: record.is_anime,
            status: record.status,
            progress: record.progress,
            total_episodes: record.total_episodes,
            rating: record.rating,
            notes: record.notes,
            vote_average: record.vote_average,
            vote_count: record.vote_count,
            popularity: record.popularity,
            added_at: record.added_at,
            last_synced_at: record.last_synced_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SeasonDto {
    pub season_number: i32,
    pub name: String,
    pub overview: String,
    pub air_date: Option<String>,
    pub episode_count: i32,
    pub poster_path: Option<String>,
}

impl From<SeasonEntry> for SeasonDto {
    fn from(s: SeasonEntry) -> Self {
        Self {
            season_number: s.season_number,
            name: s.name,
            overview: s.overview,
            air_date: s.air_date,
            episode_count: s.episode_count,
            poster_path: s.poster_path,
        }
    }
}

impl From<CatalogSeason> for SeasonDto {
    fn from(s: CatalogSeason) -> Self {
        Self {
            season_number: s.season_number,
            name: s.name,
            overview: s.overview,
            air_date: s.air_date,
            episode_count: s.episode_count,
            poster_path: s.poster_path,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeDto {
    pub season_number: i32,
    pub episode_number: i32,
    pub name: String,
    pub overview: String,
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
    pub still_path: Option<String>,
    pub vote_average: f32,
    pub watched: bool,
    pub watched_at: Option<String>,
}

impl From<EpisodeEntry> for EpisodeDto {
    fn from(ep: EpisodeEntry) -> Self {
        Self {
            season_number: ep.season_number,
            episode_number: ep.episode_number,
            name: ep.name,
            overview: ep.overview,
            air_date: ep.air_date,
            runtime: ep.runtime,
            still_path: ep.still_path,
            vote_average: ep.vote_average,
            watched: ep.watched,
            watched_at: ep.watched_at,
        }
    }
}

/// Untracked episodes carry catalog metadata but no watched state.
pub fn preview_episode_dto(season_number: i32, ep: CatalogEpisode) -> EpisodeDto {
    EpisodeDto {
        season_number,
        episode_number: ep.episode_number,
        name: ep.name,
        overview: ep.overview,
        air_date: ep.air_date,
        runtime: ep.runtime,
        still_path: ep.still_path,
        vote_average: ep.vote_average,
        watched: false,
        watched_at: None,
    }
}

/// Detail view payload for both tracked titles and catalog previews.
#[derive(Debug, Serialize)]
pub struct ModalDto {
    pub tracked: bool,
    pub media: MediaDto,
    pub seasons: Vec<SeasonDto>,
    pub focused_season: i32,
    pub episodes: Vec<EpisodeDto>,
    pub all_episodes: Vec<EpisodeDto>,
}

impl From<ModalView> for ModalDto {
    fn from(view: ModalView) -> Self {
        match view {
            ModalView::Tracked(modal) => Self {
                tracked: true,
                media: modal.record.into(),
                seasons: modal.seasons.into_iter().map(Into::into).collect(),
                focused_season: modal.focused_season,
                episodes: modal.episodes.into_iter().map(Into::into).collect(),
                all_episodes: modal.all_episodes.into_iter().map(Into::into).collect(),
            },
            ModalView::Preview(modal) => {
                let details = modal.details;
                let focused_season = details
                    .seasons
                    .first()
                    .map_or(1, |s| s.season_number);
                let episodes: Vec<EpisodeDto> = modal
                    .episodes
                    .into_iter()
                    .map(|ep| preview_episode_dto(focused_season, ep))
                    .collect();
                Self {
                    tracked: false,
                    media: MediaDto {
                        tmdb_id: details.tmdb_id,
                        media_type: details.kind,
                        title: details.title,
                        overview: details.overview,
                        poster_path: details.poster_path,
                        release_date: details.release_date,
                        is_anime: false,
                        status: WatchStatus::Planned,
                        progress: 0,
                        total_episodes: 0,
                        rating: 0.0,
                        notes: None,
                        vote_average: details.vote_average,
                        vote_count: details.vote_count,
                        popularity: details.popularity,
                        added_at: String::new(),
                        last_synced_at: None,
                    },
                    seasons: details.seasons.into_iter().map(Into::into).collect(),
                    focused_season,
                    episodes: episodes.clone(),
                    all_episodes: episodes,
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToggleResultDto {
    pub watched: bool,
    pub affected: u64,
    pub progress: i32,
    pub status: WatchStatus,
}

impl From<ToggleOutcome> for ToggleResultDto {
    fn from(outcome: ToggleOutcome) -> Self {
        Self {
            watched: outcome.watched,
            affected: outcome.affected,
            progress: outcome.progress,
            status: outcome.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SyncResultDto {
    pub tmdb_id: i32,
    pub total_episodes: i32,
    pub progress: i32,
    pub failed_seasons: Vec<i32>,
}

impl From<SyncReport> for SyncResultDto {
    fn from(report: SyncReport) -> Self {
        Self {
            tmdb_id: report.tmdb_id,
            total_episodes: report.total_episodes,
            progress: report.progress,
            failed_seasons: report.failed_seasons,
        }
    }
}

// ========== Requests ==========

#[derive(Debug, Deserialize)]
pub struct AddMediaRequest {
    pub tmdb_id: i32,
    pub media_type: MediaKind,
    #[serde(default)]
    pub status: Option<WatchStatus>,
    #[serde(default)]
    pub is_anime: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: WatchStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDetailsRequest {
    #[serde(default)]
    pub status: Option<WatchStatus>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}
