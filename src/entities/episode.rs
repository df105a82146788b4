use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "episodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tmdb_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub season_number: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub episode_number: i32,
    pub name: String,
    pub overview: String,
    /// `YYYY-MM-DD`; compares correctly as text in SQL predicates.
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
    pub still_path: Option<String>,
    pub vote_average: f32,
    pub vote_count: i32,
    pub watched: bool,
    /// RFC3339. Set iff `watched` is true.
    pub watched_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::media::Entity",
        from = "Column::TmdbId",
        to = "super::media::Column::TmdbId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Media,
}

impl Related<super::media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Media.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
