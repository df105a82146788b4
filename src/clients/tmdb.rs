use crate::models::media::MediaKind;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const TMDB_API: &str = "https://api.themoviedb.org/3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("title not found in catalog")]
    NotFound,
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// A search hit as the catalog reports it, before the title is tracked.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSearchResult {
    pub tmdb_id: i32,
    pub kind: MediaKind,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: f32,
    pub vote_count: i32,
    pub popularity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogDetails {
    pub tmdb_id: i32,
    pub kind: MediaKind,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: f32,
    pub vote_count: i32,
    pub popularity: f32,
    /// Regular seasons only; the catalog's specials season never makes
    /// it past the client.
    pub seasons: Vec<CatalogSeason>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSeason {
    pub season_number: i32,
    pub name: String,
    pub overview: String,
    pub air_date: Option<String>,
    pub episode_count: i32,
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEpisode {
    pub episode_number: i32,
    pub name: String,
    pub overview: String,
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
    pub still_path: Option<String>,
    pub vote_average: f32,
    pub vote_count: i32,
}

/// Upstream catalog the tracker reconciles against.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<CatalogSearchResult>, ClientError>;

    async fn details(&self, kind: MediaKind, tmdb_id: i32)
        -> Result<CatalogDetails, ClientError>;

    async fn season_episodes(
        &self,
        tmdb_id: i32,
        season_number: i32,
    ) -> Result<Vec<CatalogEpisode>, ClientError>;
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: i32,
    media_type: Option<String>,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    vote_count: i32,
    #[serde(default)]
    popularity: f32,
}

#[derive(Debug, Deserialize)]
struct MovieDetails {
    id: i32,
    title: String,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    vote_count: i32,
    #[serde(default)]
    popularity: f32,
}

#[derive(Debug, Deserialize)]
struct TvDetails {
    id: i32,
    name: String,
    overview: Option<String>,
    poster_path: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    vote_count: i32,
    #[serde(default)]
    popularity: f32,
    #[serde(default)]
    seasons: Vec<TvSeason>,
}

#[derive(Debug, Deserialize)]
struct TvSeason {
    season_number: i32,
    name: Option<String>,
    overview: Option<String>,
    air_date: Option<String>,
    #[serde(default)]
    episode_count: i32,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeasonDetails {
    #[serde(default)]
    episodes: Vec<TvEpisode>,
}

#[derive(Debug, Deserialize)]
struct TvEpisode {
    episode_number: i32,
    name: Option<String>,
    overview: Option<String>,
    air_date: Option<String>,
    runtime: Option<i32>,
    still_path: Option<String>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    vote_count: i32,
}

/// `YYYY-MM-DD` or nothing. The catalog sends empty strings and the
/// occasional malformed date; both become None.
fn normalize_date(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .ok()
        .map(|_| raw)
}

// ============================================================================
// Client
// ============================================================================

#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TmdbClient {
    pub fn new(token: &str) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: TMDB_API.to_string(),
            token: token.to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Unavailable(format!(
                "TMDB API error: {status} - {body}"
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CatalogClient for TmdbClient {
    async fn search(&self, query: &str) -> Result<Vec<CatalogSearchResult>, ClientError> {
        let path = format!(
            "/search/multi?query={}&include_adult=false",
            urlencoding::encode(query)
        );
        let response: SearchResponse = self.get_json(&path).await?;

        Ok(response
            .results
            .into_iter()
            .filter_map(|hit| {
                let kind = match hit.media_type.as_deref() {
                    Some("movie") => MediaKind::Movie,
                    Some("tv") => MediaKind::Tv,
                    _ => return None,
                };
                let title = match kind {
                    MediaKind::Movie => hit.title,
                    MediaKind::Tv => hit.name,
                }?;
                let release_date = match kind {
                    MediaKind::Movie => hit.release_date,
                    MediaKind::Tv => hit.first_air_date,
                };
                Some(CatalogSearchResult {
                    tmdb_id: hit.id,
                    kind,
                    title,
                    overview: hit.overview.unwrap_or_default(),
                    poster_path: hit.poster_path,
                    release_date: normalize_date(release_date),
                    vote_average: hit.vote_average,
                    vote_count: hit.vote_count,
                    popularity: hit.popularity,
                })
            })
            .collect())
    }

    async fn details(
        &self,
        kind: MediaKind,
        tmdb_id: i32,
    ) -> Result<CatalogDetails, ClientError> {
        match kind {
            MediaKind::Movie => {
                let movie: MovieDetails = self.get_json(&format!("/movie/{tmdb_id}")).await?;
                Ok(CatalogDetails {
                    tmdb_id: movie.id,
                    kind,
                    title: movie.title,
                    overview: movie.overview.unwrap_or_default(),
                    poster_path: movie.poster_path,
                    release_date: normalize_date(movie.release_date),
                    vote_average: movie.vote_average,
                    vote_count: movie.vote_count,
                    popularity: movie.popularity,
                    seasons: Vec::new(),
                })
            }
            MediaKind::Tv => {
                let tv: TvDetails = self.get_json(&format!("/tv/{tmdb_id}")).await?;
                let seasons = tv
                    .seasons
                    .into_iter()
                    .filter(|s| s.season_number > 0)
                    .map(|s| CatalogSeason {
                        season_number: s.season_number,
                        name: s.name.unwrap_or_default(),
                        overview: s.overview.unwrap_or_default(),
                        air_date: normalize_date(s.air_date),
                        episode_count: s.episode_count,
                        poster_path: s.poster_path,
                    })
                    .collect();
                Ok(CatalogDetails {
                    tmdb_id: tv.id,
                    kind,
                    title: tv.name,
                    overview: tv.overview.unwrap_or_default(),
                    poster_path: tv.poster_path,
                    release_date: normalize_date(tv.first_air_date),
                    vote_average: tv.vote_average,
                    vote_count: tv.vote_count,
                    popularity: tv.popularity,
                    seasons,
                })
            }
        }
    }

    async fn season_episodes(
        &self,
        tmdb_id: i32,
        season_number: i32,
    ) -> Result<Vec<CatalogEpisode>, ClientError> {
        let season: SeasonDetails = self
            .get_json(&format!("/tv/{tmdb_id}/season/{season_number}"))
            .await?;

        Ok(season
            .episodes
            .into_iter()
            .map(|ep| CatalogEpisode {
                episode_number: ep.episode_number,
                name: ep.name.unwrap_or_default(),
                overview: ep.overview.unwrap_or_default(),
                air_date: normalize_date(ep.air_date),
                runtime: ep.runtime,
                still_path: ep.still_path,
                vote_average: ep.vote_average,
                vote_count: ep.vote_count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_date_accepts_valid_dates() {
        assert_eq!(
            normalize_date(Some("2024-03-15".to_string())),
            Some("2024-03-15".to_string())
        );
    }

    #[test]
    fn normalize_date_rejects_empty_and_malformed() {
        assert_eq!(normalize_date(Some(String::new())), None);
        assert_eq!(normalize_date(Some("not-a-date".to_string())), None);
        assert_eq!(normalize_date(Some("2024-13-40".to_string())), None);
        assert_eq!(normalize_date(None), None);
    }
}
