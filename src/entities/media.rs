use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "media")]
pub struct Model {
    /// TMDB catalog id. Natural key, never autoincremented.
    #[sea_orm(primary_key, auto_increment = false)]
    pub tmdb_id: i32,
    pub kind: String,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    /// `YYYY-MM-DD`, absent when the catalog has no date.
    pub release_date: Option<String>,
    pub is_anime: bool,
    pub status: String,
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::season::Entity")]
    Season,
    #[sea_orm(has_many = "super::episode::Entity")]
    Episode,
}

impl Related<super::season::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Season.def()
    }
}

impl Related<super::episode::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Episode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
