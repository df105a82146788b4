use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Media kind as known to the catalog: a movie or a TV show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "tv" => Ok(Self::Tv),
            other => Err(format!("invalid media kind: {other}")),
        }
    }
}

/// Tracking status of a title. "dropped" is exclusively user-set and is
/// never produced or replaced by automatic derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    Planned,
    Watching,
    Completed,
    Dropped,
}

impl WatchStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Watching => "watching",
            Self::Completed => "completed",
            Self::Dropped => "dropped",
        }
    }
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(Self::Planned),
            "watching" => Ok(Self::Watching),
            "completed" => Ok(Self::Completed),
            "dropped" => Ok(Self::Dropped),
            other => Err(format!("invalid status: {other}")),
        }
    }
}

/// A tracked title with its user-owned tracking fields and cached
/// catalog metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRecord {
    pub tmdb_id: i32,
    pub kind: MediaKind,
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

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonEntry {
    pub tmdb_id: i32,
    pub season_number: i32,
    pub name: String,
    pub overview: String,
    pub air_date: Option<String>,
    pub episode_count: i32,
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeEntry {
    pub tmdb_id: i32,
    pub season_number: i32,
    pub episode_number: i32,
    pub name: String,
    pub overview: String,
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
    pub still_path: Option<String>,
    pub vote_average: f32,
    pub vote_count: i32,
    pub watched: bool,
    pub watched_at: Option<String>,
}

impl EpisodeEntry {
    /// An episode counts as aired when its air date is known and not in
    /// the future. Episodes without an air date are treated as unaired
    /// for aggregate purposes.
    #[must_use]
    pub fn is_aired(&self, today: &str) -> bool {
        self.air_date.as_deref().is_some_and(|d| d <= today)
    }
}
