use crate::clients::tmdb::CatalogEpisode;
use crate::entities::{episode, prelude::*};
use crate::models::media::EpisodeEntry;
use anyhow::Result;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;

/// Repository for episode metadata and watched-state operations.
pub struct EpisodeRepository {
    conn: DatabaseConnection,
}

impl EpisodeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: episode::Model) -> EpisodeEntry {
        EpisodeEntry {
            tmdb_id: model.tmdb_id,
            season_number: model.season_number,
            episode_number: model.episode_number,
            name: model.name,
            overview: model.overview,
            air_date: model.air_date,
            runtime: model.runtime,
            still_path: model.still_path,
            vote_average: model.vote_average,
            vote_count: model.vote_count,
            watched: model.watched,
            watched_at: model.watched_at,
        }
    }

    /// An episode is toggle-eligible when its air date is unknown or not
    /// in the future.
    fn eligible_condition(today: &str) -> Condition {
        Condition::any()
            .add(episode::Column::AirDate.is_null())
            .add(episode::Column::AirDate.lte(today))
    }

    fn scope_filter(tmdb_id: i32, season: Option<i32>, number: Option<i32>) -> Condition {
        let mut cond = Condition::all().add(episode::Column::TmdbId.eq(tmdb_id));
        if let Some(season) = season {
            cond = cond.add(episode::Column::SeasonNumber.eq(season));
        }
        if let Some(number) = number {
            cond = cond.add(episode::Column::EpisodeNumber.eq(number));
        }
        cond
    }

    /// Insert-or-refresh episode metadata by natural key. The watched
    /// flag and timestamp are never touched by a refresh.
    pub async fn upsert_many(
        &self,
        tmdb_id: i32,
        season_number: i32,
        episodes: &[CatalogEpisode],
    ) -> Result<()> {
        if episodes.is_empty() {
            return Ok(());
        }

        let active_models: Vec<episode::ActiveModel> = episodes
            .iter()
            .map(|ep| episode::ActiveModel {
                tmdb_id: Set(tmdb_id),
                season_number: Set(season_number),
                episode_number: Set(ep.episode_number),
                name: Set(ep.name.clone()),
                overview: Set(ep.overview.clone()),
                air_date: Set(ep.air_date.clone()),
                runtime: Set(ep.runtime),
                still_path: Set(ep.still_path.clone()),
                vote_average: Set(ep.vote_average),
                vote_count: Set(ep.vote_count),
                watched: Set(false),
                watched_at: Set(None),
            })
            .collect();

        Episode::insert_many(active_models)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    episode::Column::TmdbId,
                    episode::Column::SeasonNumber,
                    episode::Column::EpisodeNumber,
                ])
                .update_columns([
                    episode::Column::Name,
                    episode::Column::Overview,
                    episode::Column::AirDate,
                    episode::Column::Runtime,
                    episode::Column::StillPath,
                    episode::Column::VoteAverage,
                    episode::Column::VoteCount,
                ])
                .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn list_for_media(&self, tmdb_id: i32) -> Result<Vec<EpisodeEntry>> {
        let rows = Episode::find()
            .filter(episode::Column::TmdbId.eq(tmdb_id))
            .order_by_asc(episode::Column::SeasonNumber)
            .order_by_asc(episode::Column::EpisodeNumber)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn list_for_season(
        &self,
        tmdb_id: i32,
        season_number: i32,
    ) -> Result<Vec<EpisodeEntry>> {
        let rows = Episode::find()
            .filter(episode::Column::TmdbId.eq(tmdb_id))
            .filter(episode::Column::SeasonNumber.eq(season_number))
            .order_by_asc(episode::Column::EpisodeNumber)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn count_watched(&self, tmdb_id: i32) -> Result<i32> {
        let count = Episode::find()
            .filter(episode::Column::TmdbId.eq(tmdb_id))
            .filter(episode::Column::Watched.eq(true))
            .count(&self.conn)
            .await?;

        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }

    /// Episodes whose air date is known and not in the future. Undated
    /// episodes do not count as aired.
    pub async fn count_aired(&self, tmdb_id: i32, today: &str) -> Result<i32> {
        let count = Episode::find()
            .filter(episode::Column::TmdbId.eq(tmdb_id))
            .filter(episode::Column::AirDate.is_not_null())
            .filter(episode::Column::AirDate.lte(today))
            .count(&self.conn)
            .await?;

        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }

    pub async fn list_eligible(
        &self,
        tmdb_id: i32,
        season: Option<i32>,
        number: Option<i32>,
        today: &str,
    ) -> Result<Vec<EpisodeEntry>> {
        let rows = Episode::find()
            .filter(Self::scope_filter(tmdb_id, season, number))
            .filter(Self::eligible_condition(today))
            .order_by_asc(episode::Column::SeasonNumber)
            .order_by_asc(episode::Column::EpisodeNumber)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Flip the watched flag for every eligible episode in the scope in
    /// one statement. `watched_at` follows the flag: a single shared
    /// timestamp when marking, NULL when unmarking.
    pub async fn set_watched_eligible(
        &self,
        tmdb_id: i32,
        season: Option<i32>,
        number: Option<i32>,
        today: &str,
        watched: bool,
        watched_at: Option<&str>,
    ) -> Result<u64> {
        let result = Episode::update_many()
            .col_expr(episode::Column::Watched, Expr::value(watched))
            .col_expr(
                episode::Column::WatchedAt,
                Expr::value(watched_at.map(str::to_owned)),
            )
            .filter(Self::scope_filter(tmdb_id, season, number))
            .filter(Self::eligible_condition(today))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    /// Mark every aired, not-yet-watched episode as watched. Episodes
    /// already watched keep their original timestamp.
    pub async fn mark_aired_watched(&self, tmdb_id: i32, now: &str, today: &str) -> Result<()> {
        Episode::update_many()
            .col_expr(episode::Column::Watched, Expr::value(true))
            .col_expr(episode::Column::WatchedAt, Expr::value(now))
            .filter(episode::Column::TmdbId.eq(tmdb_id))
            .filter(episode::Column::Watched.eq(false))
            .filter(episode::Column::AirDate.is_not_null())
            .filter(episode::Column::AirDate.lte(today))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn reset_watched(&self, tmdb_id: i32) -> Result<()> {
        Episode::update_many()
            .col_expr(episode::Column::Watched, Expr::value(false))
            .col_expr(episode::Column::WatchedAt, Expr::value(Option::<String>::None))
            .filter(episode::Column::TmdbId.eq(tmdb_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Season of the most recently watched episode, if any.
    pub async fn last_watched_season(&self, tmdb_id: i32) -> Result<Option<i32>> {
        let row = Episode::find()
            .filter(episode::Column::TmdbId.eq(tmdb_id))
            .filter(episode::Column::Watched.eq(true))
            .order_by_desc(episode::Column::WatchedAt)
            .one(&self.conn)
            .await?;

        Ok(row.map(|m| m.season_number))
    }

    /// Most recent watched timestamp per title, for library ordering.
    pub async fn latest_watched_map(&self) -> Result<HashMap<i32, String>> {
        let rows: Vec<(i32, Option<String>)> = Episode::find()
            .select_only()
            .column(episode::Column::TmdbId)
            .column_as(episode::Column::WatchedAt.max(), "latest")
            .filter(episode::Column::Watched.eq(true))
            .group_by(episode::Column::TmdbId)
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, latest)| latest.map(|ts| (id, ts)))
            .collect())
    }

}
