use crate::clients::tmdb::CatalogSeason;
use crate::entities::{prelude::*, season};
use crate::models::media::SeasonEntry;
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

pub struct SeasonRepository {
    conn: DatabaseConnection,
}

impl SeasonRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: season::Model) -> SeasonEntry {
        SeasonEntry {
            tmdb_id: model.tmdb_id,
            season_number: model.season_number,
            name: model.name,
            overview: model.overview,
            air_date: model.air_date,
            episode_count: model.episode_count,
            poster_path: model.poster_path,
        }
    }

    /// Insert-or-refresh season metadata by natural key. Specials
    /// (season 0) are skipped before this point.
    pub async fn upsert_many(&self, tmdb_id: i32, seasons: &[CatalogSeason]) -> Result<()> {
        if seasons.is_empty() {
            return Ok(());
        }

        let active_models: Vec<season::ActiveModel> = seasons
            .iter()
            .map(|s| season::ActiveModel {
                tmdb_id: Set(tmdb_id),
                season_number: Set(s.season_number),
                name: Set(s.name.clone()),
                overview: Set(s.overview.clone()),
                air_date: Set(s.air_date.clone()),
                episode_count: Set(s.episode_count),
                poster_path: Set(s.poster_path.clone()),
            })
            .collect();

        Season::insert_many(active_models)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    season::Column::TmdbId,
                    season::Column::SeasonNumber,
                ])
                .update_columns([
                    season::Column::Name,
                    season::Column::Overview,
                    season::Column::AirDate,
                    season::Column::EpisodeCount,
                    season::Column::PosterPath,
                ])
                .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn list_for_media(&self, tmdb_id: i32) -> Result<Vec<SeasonEntry>> {
        let rows = Season::find()
            .filter(season::Column::TmdbId.eq(tmdb_id))
            .order_by_asc(season::Column::SeasonNumber)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

}
