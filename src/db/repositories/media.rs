use crate::clients::tmdb::CatalogDetails;
use crate::entities::{episode, media, prelude::*, season};
use crate::models::media::{MediaRecord, WatchStatus};
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::info;

pub struct MediaRepository {
    conn: DatabaseConnection,
}

impl MediaRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: media::Model) -> Result<MediaRecord> {
        Ok(MediaRecord {
            tmdb_id: model.tmdb_id,
            kind: model.kind.parse().map_err(anyhow::Error::msg)?,
            title: model.title,
            overview: model.overview,
            poster_path: model.poster_path,
            release_date: model.release_date,
            is_anime: model.is_anime,
            status: model.status.parse().map_err(anyhow::Error::msg)?,
            progress: model.progress,
            total_episodes: model.total_episodes,
            rating: model.rating,
            notes: model.notes,
            vote_average: model.vote_average,
            vote_count: model.vote_count,
            popularity: model.popularity,
            added_at: model.added_at,
            last_synced_at: model.last_synced_at,
        })
    }

    pub async fn insert(&self, record: &MediaRecord) -> Result<()> {
        let active_model = media::ActiveModel {
            tmdb_id: Set(record.tmdb_id),
            kind: Set(record.kind.as_str().to_string()),
            title: Set(record.title.clone()),
            overview: Set(record.overview.clone()),
            poster_path: Set(record.poster_path.clone()),
            release_date: Set(record.release_date.clone()),
            is_anime: Set(record.is_anime),
            status: Set(record.status.as_str().to_string()),
            progress: Set(record.progress),
            total_episodes: Set(record.total_episodes),
            rating: Set(record.rating),
            notes: Set(record.notes.clone()),
            vote_average: Set(record.vote_average),
            vote_count: Set(record.vote_count),
            popularity: Set(record.popularity),
            added_at: Set(record.added_at.clone()),
            last_synced_at: Set(record.last_synced_at.clone()),
        };

        Media::insert(active_model).exec(&self.conn).await?;

        info!("Tracked new title: {} ({})", record.title, record.tmdb_id);
        Ok(())
    }

    pub async fn get(&self, tmdb_id: i32) -> Result<Option<MediaRecord>> {
        let result = Media::find_by_id(tmdb_id).one(&self.conn).await?;
        result.map(Self::map_model).transpose()
    }

    pub async fn exists(&self, tmdb_id: i32) -> Result<bool> {
        Ok(Media::find_by_id(tmdb_id).one(&self.conn).await?.is_some())
    }

    pub async fn list_all(&self) -> Result<Vec<MediaRecord>> {
        let rows = Media::find()
            .order_by_asc(media::Column::Title)
            .all(&self.conn)
            .await?;

        rows.into_iter().map(Self::map_model).collect()
    }

    pub async fn list_by_statuses(&self, statuses: &[WatchStatus]) -> Result<Vec<MediaRecord>> {
        let names: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let rows = Media::find()
            .filter(media::Column::Status.is_in(names))
            .order_by_asc(media::Column::Title)
            .all(&self.conn)
            .await?;

        rows.into_iter().map(Self::map_model).collect()
    }

    /// Overwrite the catalog-owned columns from a fresh details fetch.
    /// Tracking columns are untouched.
    pub async fn update_catalog(&self, tmdb_id: i32, details: &CatalogDetails) -> Result<()> {
        let active_model = media::ActiveModel {
            tmdb_id: Set(tmdb_id),
            title: Set(details.title.clone()),
            overview: Set(details.overview.clone()),
            poster_path: Set(details.poster_path.clone()),
            release_date: Set(details.release_date.clone()),
            vote_average: Set(details.vote_average),
            vote_count: Set(details.vote_count),
            popularity: Set(details.popularity),
            ..Default::default()
        };

        Media::update(active_model).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn set_status(&self, tmdb_id: i32, status: WatchStatus) -> Result<()> {
        Media::update_many()
            .col_expr(
                media::Column::Status,
                sea_orm::sea_query::Expr::value(status.as_str()),
            )
            .filter(media::Column::TmdbId.eq(tmdb_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn set_progress(
        &self,
        tmdb_id: i32,
        progress: i32,
        status: WatchStatus,
    ) -> Result<()> {
        Media::update_many()
            .col_expr(
                media::Column::Progress,
                sea_orm::sea_query::Expr::value(progress),
            )
            .col_expr(
                media::Column::Status,
                sea_orm::sea_query::Expr::value(status.as_str()),
            )
            .filter(media::Column::TmdbId.eq(tmdb_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn set_total_episodes(&self, tmdb_id: i32, total: i32) -> Result<()> {
        Media::update_many()
            .col_expr(
                media::Column::TotalEpisodes,
                sea_orm::sea_query::Expr::value(total),
            )
            .filter(media::Column::TmdbId.eq(tmdb_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn touch_last_synced(&self, tmdb_id: i32, timestamp: &str) -> Result<()> {
        Media::update_many()
            .col_expr(
                media::Column::LastSyncedAt,
                sea_orm::sea_query::Expr::value(timestamp),
            )
            .filter(media::Column::TmdbId.eq(tmdb_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn update_details(
        &self,
        tmdb_id: i32,
        status: Option<WatchStatus>,
        rating: Option<f32>,
        notes: Option<String>,
    ) -> Result<()> {
        if status.is_none() && rating.is_none() && notes.is_none() {
            return Ok(());
        }

        let mut update = Media::update_many();
        if let Some(status) = status {
            update = update.col_expr(
                media::Column::Status,
                sea_orm::sea_query::Expr::value(status.as_str()),
            );
        }
        if let Some(rating) = rating {
            update = update.col_expr(
                media::Column::Rating,
                sea_orm::sea_query::Expr::value(rating),
            );
        }
        if let Some(notes) = notes {
            update = update.col_expr(
                media::Column::Notes,
                sea_orm::sea_query::Expr::value(notes),
            );
        }
        update
            .filter(media::Column::TmdbId.eq(tmdb_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn set_anime(&self, tmdb_id: i32, is_anime: bool) -> Result<()> {
        Media::update_many()
            .col_expr(
                media::Column::IsAnime,
                sea_orm::sea_query::Expr::value(is_anime),
            )
            .filter(media::Column::TmdbId.eq(tmdb_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Hard delete of a title and everything hanging off it.
    pub async fn remove(&self, tmdb_id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        episode::Entity::delete_many()
            .filter(episode::Column::TmdbId.eq(tmdb_id))
            .exec(&txn)
            .await?;

        season::Entity::delete_many()
            .filter(season::Column::TmdbId.eq(tmdb_id))
            .exec(&txn)
            .await?;

        let result = Media::delete_by_id(tmdb_id).exec(&txn).await?;

        txn.commit().await?;

        let removed = result.rows_affected > 0;
        if removed {
            info!("Removed tracked title: {}", tmdb_id);
        }
        Ok(removed)
    }
}
