//! Domain service for watch tracking operations.
//!
//! Handlers go through this trait rather than touching the store, so the
//! reconciliation and toggle logic stays testable against a scripted
//! catalog.

use crate::clients::tmdb::{CatalogDetails, CatalogEpisode, CatalogSearchResult, ClientError};
use crate::models::media::{EpisodeEntry, MediaKind, MediaRecord, SeasonEntry, WatchStatus};
use serde::Serialize;
use thiserror::Error;

/// Domain errors for tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("title not found: {0}")]
    NotFound(i32),

    #[error("catalog error: {0}")]
    Upstream(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid toggle scope: {0}")]
    InvalidScope(String),

    #[error("no eligible episodes in scope")]
    NoEligibleEpisodes,

    #[error("title already tracked: {0}")]
    AlreadyTracked(i32),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for TrackerError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for TrackerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl TrackerError {
    pub fn from_client(err: ClientError, tmdb_id: i32) -> Self {
        match err {
            ClientError::NotFound => Self::NotFound(tmdb_id),
            ClientError::Unavailable(msg) => Self::Upstream(msg),
        }
    }
}

/// Target of a bulk watched toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleScope {
    Show,
    Season { season: i32 },
    Episode { season: i32, episode: i32 },
}

impl ToggleScope {
    /// Season and episode numbers start at 1. Specials are not stored,
    /// so season 0 is never a valid target.
    pub fn validate(self) -> Result<(), TrackerError> {
        match self {
            Self::Show => Ok(()),
            Self::Season { season } if season > 0 => Ok(()),
            Self::Season { season } => Err(TrackerError::InvalidScope(format!(
                "season must be positive, got {season}"
            ))),
            Self::Episode { season, episode } if season > 0 && episode > 0 => Ok(()),
            Self::Episode { season, episode } => Err(TrackerError::InvalidScope(format!(
                "season/episode must be positive, got s{season}e{episode}"
            ))),
        }
    }

    pub const fn season(self) -> Option<i32> {
        match self {
            Self::Show => None,
            Self::Season { season } | Self::Episode { season, .. } => Some(season),
        }
    }

    pub const fn episode(self) -> Option<i32> {
        match self {
            Self::Show | Self::Season { .. } => None,
            Self::Episode { episode, .. } => Some(episode),
        }
    }
}

/// What a toggle did: direction, reach, and the recomputed aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleOutcome {
    pub watched: bool,
    pub affected: u64,
    pub progress: i32,
    pub status: WatchStatus,
}

/// Result of reconciling one title against the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub tmdb_id: i32,
    pub total_episodes: i32,
    pub progress: i32,
    /// Seasons whose episode fetch failed; their cached episodes are
    /// kept as-is.
    pub failed_seasons: Vec<i32>,
}

/// Library list filter. Anime variants narrow by the user-set flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryFilter {
    Tv,
    Movie,
    AnimeTv,
    AnimeMovie,
}

impl std::str::FromStr for LibraryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tv" => Ok(Self::Tv),
            "movie" => Ok(Self::Movie),
            "anime-tv" => Ok(Self::AnimeTv),
            "anime-movie" => Ok(Self::AnimeMovie),
            other => Err(format!("invalid library filter: {other}")),
        }
    }
}

impl LibraryFilter {
    pub fn matches(self, record: &MediaRecord) -> bool {
        match self {
            Self::Tv => record.kind == MediaKind::Tv && !record.is_anime,
            Self::Movie => record.kind == MediaKind::Movie && !record.is_anime,
            Self::AnimeTv => record.kind == MediaKind::Tv && record.is_anime,
            Self::AnimeMovie => record.kind == MediaKind::Movie && record.is_anime,
        }
    }
}

/// Detail view for a tracked title.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedModal {
    pub record: MediaRecord,
    pub seasons: Vec<SeasonEntry>,
    /// Season of the most recently watched episode, falling back to 1.
    pub focused_season: i32,
    pub episodes: Vec<EpisodeEntry>,
    pub all_episodes: Vec<EpisodeEntry>,
}

/// Detail view for a title not yet in the library, straight from the
/// catalog.
#[derive(Debug, Clone)]
pub struct PreviewModal {
    pub details: CatalogDetails,
    pub episodes: Vec<CatalogEpisode>,
}

#[derive(Debug, Clone)]
pub enum ModalView {
    Tracked(Box<TrackedModal>),
    Preview(Box<PreviewModal>),
}

/// User-editable tracking fields, all optional.
#[derive(Debug, Clone, Default)]
pub struct DetailsUpdate {
    pub status: Option<WatchStatus>,
    pub rating: Option<f32>,
    pub notes: Option<String>,
}

#[async_trait::async_trait]
pub trait TrackerService: Send + Sync {
    /// Searches the catalog. Results are not persisted.
    async fn search_catalog(
        &self,
        query: &str,
    ) -> Result<Vec<CatalogSearchResult>, TrackerError>;

    /// Tracks a new title, fetching its metadata and (for TV) its full
    /// season/episode tree.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::AlreadyTracked`] if the title is in the library
    /// - [`TrackerError::NotFound`] if the catalog has no such title
    async fn add_to_library(
        &self,
        tmdb_id: i32,
        kind: MediaKind,
        status: Option<WatchStatus>,
        is_anime: bool,
    ) -> Result<MediaRecord, TrackerError>;

    /// Reconciles one tracked title against the catalog. Watched state
    /// survives; catalog-owned metadata is refreshed.
    async fn sync_media(&self, tmdb_id: i32) -> Result<SyncReport, TrackerError>;

    /// Flips the watched flag for every eligible episode in scope.
    /// All-watched scopes unwatch; anything less marks everything
    /// watched.
    async fn toggle_watched(
        &self,
        tmdb_id: i32,
        scope: ToggleScope,
    ) -> Result<ToggleOutcome, TrackerError>;

    /// Sets the tracking status directly, rewriting episode watched
    /// state for completed/planned as needed.
    async fn set_status(
        &self,
        tmdb_id: i32,
        status: WatchStatus,
    ) -> Result<MediaRecord, TrackerError>;

    /// Partial update of status, rating, and notes.
    async fn update_details(
        &self,
        tmdb_id: i32,
        update: DetailsUpdate,
    ) -> Result<MediaRecord, TrackerError>;

    /// Flips the user-set anime flag.
    async fn toggle_anime(&self, tmdb_id: i32) -> Result<MediaRecord, TrackerError>;

    /// Hard delete of a title and its seasons and episodes.
    async fn remove(&self, tmdb_id: i32) -> Result<(), TrackerError>;

    /// Library listing, filtered and ordered by recency of activity.
    async fn list_library(
        &self,
        filter: Option<LibraryFilter>,
        search: Option<&str>,
    ) -> Result<Vec<MediaRecord>, TrackerError>;

    /// Detail view: the tracked record when present, otherwise a
    /// catalog preview.
    async fn modal_view(&self, tmdb_id: i32, kind: MediaKind)
        -> Result<ModalView, TrackerError>;
}

/// Derives a tracking status from watch progress. Never produces or
/// replaces "dropped"; that status is user-set only.
#[must_use]
pub fn derive_status(current: WatchStatus, progress: i32, aired: i32) -> WatchStatus {
    if current == WatchStatus::Dropped {
        return WatchStatus::Dropped;
    }
    if progress == 0 {
        return WatchStatus::Planned;
    }
    if aired > 0 && progress >= aired {
        return WatchStatus::Completed;
    }
    WatchStatus::Watching
}

/// Whether a sync timestamp is old enough to warrant a refresh. A
/// missing or unparseable timestamp always counts as stale.
#[must_use]
pub fn is_stale(last_synced_at: Option<&str>, max_age: chrono::Duration) -> bool {
    let Some(raw) = last_synced_at else {
        return true;
    };
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => chrono::Utc::now().signed_duration_since(ts) > max_age,
        Err(_) => true,
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn today_utc() -> String {
    chrono::Utc::now().date_naive().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_status_zero_progress_is_planned() {
        assert_eq!(
            derive_status(WatchStatus::Watching, 0, 12),
            WatchStatus::Planned
        );
        assert_eq!(
            derive_status(WatchStatus::Completed, 0, 0),
            WatchStatus::Planned
        );
    }

    #[test]
    fn derive_status_caught_up_is_completed() {
        assert_eq!(
            derive_status(WatchStatus::Watching, 12, 12),
            WatchStatus::Completed
        );
        assert_eq!(
            derive_status(WatchStatus::Planned, 15, 12),
            WatchStatus::Completed
        );
    }

    #[test]
    fn derive_status_partial_progress_is_watching() {
        assert_eq!(
            derive_status(WatchStatus::Planned, 3, 12),
            WatchStatus::Watching
        );
    }

    #[test]
    fn derive_status_nothing_aired_yet_is_watching() {
        // Progress with zero aired episodes can happen right after a
        // catalog correction; never report completed in that case.
        assert_eq!(
            derive_status(WatchStatus::Watching, 2, 0),
            WatchStatus::Watching
        );
    }

    #[test]
    fn derive_status_never_clears_dropped() {
        assert_eq!(
            derive_status(WatchStatus::Dropped, 12, 12),
            WatchStatus::Dropped
        );
        assert_eq!(derive_status(WatchStatus::Dropped, 0, 12), WatchStatus::Dropped);
    }

    #[test]
    fn staleness_of_missing_or_bad_timestamps() {
        assert!(is_stale(None, chrono::Duration::hours(48)));
        assert!(is_stale(Some("garbage"), chrono::Duration::hours(48)));
    }

    #[test]
    fn staleness_by_age() {
        let old = (chrono::Utc::now() - chrono::Duration::hours(72)).to_rfc3339();
        let fresh = chrono::Utc::now().to_rfc3339();
        assert!(is_stale(Some(&old), chrono::Duration::hours(48)));
        assert!(!is_stale(Some(&fresh), chrono::Duration::hours(48)));
    }

    #[test]
    fn toggle_scope_validation() {
        assert!(ToggleScope::Show.validate().is_ok());
        assert!(ToggleScope::Season { season: 1 }.validate().is_ok());
        assert!(ToggleScope::Season { season: 0 }.validate().is_err());
        assert!(ToggleScope::Episode { season: 1, episode: 1 }.validate().is_ok());
        assert!(ToggleScope::Episode { season: 1, episode: 0 }.validate().is_err());
        assert!(ToggleScope::Episode { season: -1, episode: 3 }.validate().is_err());
    }

    #[test]
    fn library_filter_matching() {
        let mut record = MediaRecord {
            tmdb_id: 1,
            kind: MediaKind::Tv,
            title: "x".to_string(),
            overview: String::new(),
            poster_path: None,
            release_date: None,
            is_anime: false,
            status: WatchStatus::Planned,
            progress: 0,
            total_episodes: 0,
            rating: 0.0,
            notes: None,
            vote_average: 0.0,
            vote_count: 0,
            popularity: 0.0,
            added_at: String::new(),
            last_synced_at: None,
        };

        assert!(LibraryFilter::Tv.matches(&record));
        assert!(!LibraryFilter::AnimeTv.matches(&record));

        record.is_anime = true;
        assert!(LibraryFilter::AnimeTv.matches(&record));
        assert!(!LibraryFilter::Tv.matches(&record));
    }
}
