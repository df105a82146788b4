use crate::clients::tmdb::{CatalogDetails, CatalogEpisode, CatalogSeason};
use crate::models::media::{EpisodeEntry, MediaRecord, SeasonEntry, WatchStatus};
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn media_repo(&self) -> repositories::media::MediaRepository {
        repositories::media::MediaRepository::new(self.conn.clone())
    }

    fn season_repo(&self) -> repositories::season::SeasonRepository {
        repositories::season::SeasonRepository::new(self.conn.clone())
    }

    fn episode_repo(&self) -> repositories::episode::EpisodeRepository {
        repositories::episode::EpisodeRepository::new(self.conn.clone())
    }

    // ========== Media ==========

    pub async fn add_media(&self, record: &MediaRecord) -> Result<()> {
        self.media_repo().insert(record).await
    }

    pub async fn get_media(&self, tmdb_id: i32) -> Result<Option<MediaRecord>> {
        self.media_repo().get(tmdb_id).await
    }

    pub async fn media_exists(&self, tmdb_id: i32) -> Result<bool> {
        self.media_repo().exists(tmdb_id).await
    }

    pub async fn list_media(&self) -> Result<Vec<MediaRecord>> {
        self.media_repo().list_all().await
    }

    pub async fn list_media_by_statuses(
        &self,
        statuses: &[WatchStatus],
    ) -> Result<Vec<MediaRecord>> {
        self.media_repo().list_by_statuses(statuses).await
    }

    pub async fn update_media_catalog(
        &self,
        tmdb_id: i32,
        details: &CatalogDetails,
    ) -> Result<()> {
        self.media_repo().update_catalog(tmdb_id, details).await
    }

    pub async fn set_media_status(&self, tmdb_id: i32, status: WatchStatus) -> Result<()> {
        self.media_repo().set_status(tmdb_id, status).await
    }

    pub async fn set_media_progress(
        &self,
        tmdb_id: i32,
        progress: i32,
        status: WatchStatus,
    ) -> Result<()> {
        self.media_repo().set_progress(tmdb_id, progress, status).await
    }

    pub async fn set_media_total_episodes(&self, tmdb_id: i32, total: i32) -> Result<()> {
        self.media_repo().set_total_episodes(tmdb_id, total).await
    }

    pub async fn touch_media_synced(&self, tmdb_id: i32, timestamp: &str) -> Result<()> {
        self.media_repo().touch_last_synced(tmdb_id, timestamp).await
    }

    pub async fn update_media_details(
        &self,
        tmdb_id: i32,
        status: Option<WatchStatus>,
        rating: Option<f32>,
        notes: Option<String>,
    ) -> Result<()> {
        self.media_repo()
            .update_details(tmdb_id, status, rating, notes)
            .await
    }

    pub async fn set_media_anime(&self, tmdb_id: i32, is_anime: bool) -> Result<()> {
        self.media_repo().set_anime(tmdb_id, is_anime).await
    }

    pub async fn remove_media(&self, tmdb_id: i32) -> Result<bool> {
        self.media_repo().remove(tmdb_id).await
    }

    // ========== Seasons ==========

    pub async fn upsert_seasons(&self, tmdb_id: i32, seasons: &[CatalogSeason]) -> Result<()> {
        self.season_repo().upsert_many(tmdb_id, seasons).await
    }

    pub async fn get_seasons(&self, tmdb_id: i32) -> Result<Vec<SeasonEntry>> {
        self.season_repo().list_for_media(tmdb_id).await
    }

    // ========== Episodes ==========

    pub async fn upsert_episodes(
        &self,
        tmdb_id: i32,
        season_number: i32,
        episodes: &[CatalogEpisode],
    ) -> Result<()> {
        self.episode_repo()
            .upsert_many(tmdb_id, season_number, episodes)
            .await
    }

    pub async fn get_episodes(&self, tmdb_id: i32) -> Result<Vec<EpisodeEntry>> {
        self.episode_repo().list_for_media(tmdb_id).await
    }

    pub async fn get_season_episodes(
        &self,
        tmdb_id: i32,
        season_number: i32,
    ) -> Result<Vec<EpisodeEntry>> {
        self.episode_repo()
            .list_for_season(tmdb_id, season_number)
            .await
    }

    pub async fn count_watched_episodes(&self, tmdb_id: i32) -> Result<i32> {
        self.episode_repo().count_watched(tmdb_id).await
    }

    pub async fn count_aired_episodes(&self, tmdb_id: i32, today: &str) -> Result<i32> {
        self.episode_repo().count_aired(tmdb_id, today).await
    }

    pub async fn list_eligible_episodes(
        &self,
        tmdb_id: i32,
        season: Option<i32>,
        number: Option<i32>,
        today: &str,
    ) -> Result<Vec<EpisodeEntry>> {
        self.episode_repo()
            .list_eligible(tmdb_id, season, number, today)
            .await
    }

    pub async fn set_episodes_watched(
        &self,
        tmdb_id: i32,
        season: Option<i32>,
        number: Option<i32>,
        today: &str,
        watched: bool,
        watched_at: Option<&str>,
    ) -> Result<u64> {
        self.episode_repo()
            .set_watched_eligible(tmdb_id, season, number, today, watched, watched_at)
            .await
    }

    pub async fn mark_aired_episodes_watched(
        &self,
        tmdb_id: i32,
        now: &str,
        today: &str,
    ) -> Result<()> {
        self.episode_repo()
            .mark_aired_watched(tmdb_id, now, today)
            .await
    }

    pub async fn reset_watched_episodes(&self, tmdb_id: i32) -> Result<()> {
        self.episode_repo().reset_watched(tmdb_id).await
    }

    pub async fn last_watched_season(&self, tmdb_id: i32) -> Result<Option<i32>> {
        self.episode_repo().last_watched_season(tmdb_id).await
    }

    pub async fn latest_watched_map(&self) -> Result<HashMap<i32, String>> {
        self.episode_repo().latest_watched_map().await
    }
}
