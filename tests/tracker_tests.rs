//! End-to-end tracker flows against a scripted catalog and a throwaway
//! sqlite database.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use watcharr::clients::tmdb::{
    CatalogClient, CatalogDetails, CatalogEpisode, CatalogSearchResult, CatalogSeason, ClientError,
};
use watcharr::db::Store;
use watcharr::models::media::{MediaKind, WatchStatus};
use watcharr::services::tracker::{ModalView, ToggleScope, TrackerError, TrackerService};
use watcharr::services::SeaOrmTrackerService;

// ============================================================================
// Scripted catalog
// ============================================================================

#[derive(Default)]
struct ScriptedCatalog {
    details: Mutex<HashMap<(MediaKind, i32), CatalogDetails>>,
    episodes: Mutex<HashMap<(i32, i32), Vec<CatalogEpisode>>>,
    failing_seasons: Mutex<HashSet<(i32, i32)>>,
}

impl ScriptedCatalog {
    fn set_details(&self, details: CatalogDetails) {
        self.details
            .lock()
            .unwrap()
            .insert((details.kind, details.tmdb_id), details);
    }

    fn set_episodes(&self, tmdb_id: i32, season: i32, episodes: Vec<CatalogEpisode>) {
        self.episodes
            .lock()
            .unwrap()
            .insert((tmdb_id, season), episodes);
    }

    fn fail_season(&self, tmdb_id: i32, season: i32) {
        self.failing_seasons
            .lock()
            .unwrap()
            .insert((tmdb_id, season));
    }
}

#[async_trait]
impl CatalogClient for ScriptedCatalog {
    async fn search(&self, _query: &str) -> Result<Vec<CatalogSearchResult>, ClientError> {
        Ok(Vec::new())
    }

    async fn details(
        &self,
        kind: MediaKind,
        tmdb_id: i32,
    ) -> Result<CatalogDetails, ClientError> {
        self.details
            .lock()
            .unwrap()
            .get(&(kind, tmdb_id))
            .cloned()
            .ok_or(ClientError::NotFound)
    }

    async fn season_episodes(
        &self,
        tmdb_id: i32,
        season_number: i32,
    ) -> Result<Vec<CatalogEpisode>, ClientError> {
        if self
            .failing_seasons
            .lock()
            .unwrap()
            .contains(&(tmdb_id, season_number))
        {
            return Err(ClientError::Unavailable("scripted outage".to_string()));
        }
        Ok(self
            .episodes
            .lock()
            .unwrap()
            .get(&(tmdb_id, season_number))
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn date_offset(days: i64) -> String {
    (chrono::Utc::now().date_naive() + chrono::Duration::days(days)).to_string()
}

fn tv_details(tmdb_id: i32, title: &str, season_episode_counts: &[(i32, i32)]) -> CatalogDetails {
    CatalogDetails {
        tmdb_id,
        kind: MediaKind::Tv,
        title: title.to_string(),
        overview: format!("{title} overview"),
        poster_path: Some("/poster.jpg".to_string()),
        release_date: Some("2020-01-01".to_string()),
        vote_average: 8.1,
        vote_count: 1200,
        popularity: 45.0,
        seasons: season_episode_counts
            .iter()
            .map(|&(number, count)| CatalogSeason {
                season_number: number,
                name: format!("Season {number}"),
                overview: String::new(),
                air_date: Some("2020-01-01".to_string()),
                episode_count: count,
                poster_path: None,
            })
            .collect(),
    }
}

fn movie_details(tmdb_id: i32, title: &str) -> CatalogDetails {
    CatalogDetails {
        tmdb_id,
        kind: MediaKind::Movie,
        title: title.to_string(),
        overview: format!("{title} overview"),
        poster_path: None,
        release_date: Some("2019-06-01".to_string()),
        vote_average: 7.0,
        vote_count: 800,
        popularity: 12.0,
        seasons: Vec::new(),
    }
}

fn ep(number: i32, air_date: Option<String>) -> CatalogEpisode {
    CatalogEpisode {
        episode_number: number,
        name: format!("Episode {number}"),
        overview: String::new(),
        air_date,
        runtime: Some(42),
        still_path: None,
        vote_average: 7.5,
        vote_count: 50,
    }
}

async fn test_setup() -> (Arc<ScriptedCatalog>, Store, SeaOrmTrackerService) {
    let db_path =
        std::env::temp_dir().join(format!("watcharr-test-{}.db", uuid::Uuid::new_v4()));
    let store = Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to open test store");

    let catalog = Arc::new(ScriptedCatalog::default());
    let tracker = SeaOrmTrackerService::new(store.clone(), catalog.clone());
    (catalog, store, tracker)
}

/// A fully aired 2-season show: 3 + 2 episodes, all in the past.
async fn seed_aired_show(catalog: &ScriptedCatalog, tmdb_id: i32) {
    catalog.set_details(tv_details(tmdb_id, "Aired Show", &[(1, 3), (2, 2)]));
    catalog.set_episodes(
        tmdb_id,
        1,
        vec![
            ep(1, Some(date_offset(-30))),
            ep(2, Some(date_offset(-23))),
            ep(3, Some(date_offset(-16))),
        ],
    );
    catalog.set_episodes(
        tmdb_id,
        2,
        vec![ep(1, Some(date_offset(-9))), ep(2, Some(date_offset(-2)))],
    );
}

// ============================================================================
// Add / sync
// ============================================================================

#[tokio::test]
async fn add_tv_show_populates_tree() {
    let (catalog, store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 100).await;

    let record = tracker
        .add_to_library(100, MediaKind::Tv, None, false)
        .await
        .unwrap();

    assert_eq!(record.status, WatchStatus::Planned);
    assert_eq!(record.progress, 0);
    assert_eq!(record.total_episodes, 5);
    assert!(record.last_synced_at.is_some());

    let seasons = store.get_seasons(100).await.unwrap();
    assert_eq!(seasons.len(), 2);

    let episodes = store.get_episodes(100).await.unwrap();
    assert_eq!(episodes.len(), 5);
    assert!(episodes.iter().all(|e| !e.watched && e.watched_at.is_none()));
}

#[tokio::test]
async fn add_duplicate_is_a_conflict() {
    let (catalog, _store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 100).await;

    tracker
        .add_to_library(100, MediaKind::Tv, None, false)
        .await
        .unwrap();

    let err = tracker
        .add_to_library(100, MediaKind::Tv, None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::AlreadyTracked(100)));
}

#[tokio::test]
async fn add_unknown_title_is_not_found() {
    let (_catalog, _store, tracker) = test_setup().await;

    let err = tracker
        .add_to_library(404, MediaKind::Tv, None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(404)));
}

#[tokio::test]
async fn add_as_completed_marks_only_aired_episodes() {
    let (catalog, store, tracker) = test_setup().await;
    catalog.set_details(tv_details(200, "Airing Show", &[(1, 3)]));
    catalog.set_episodes(
        200,
        1,
        vec![
            ep(1, Some(date_offset(-14))),
            ep(2, Some(date_offset(-7))),
            ep(3, Some(date_offset(7))),
        ],
    );

    let record = tracker
        .add_to_library(200, MediaKind::Tv, Some(WatchStatus::Completed), false)
        .await
        .unwrap();

    assert_eq!(record.status, WatchStatus::Completed);
    assert_eq!(record.progress, 2);

    let episodes = store.get_episodes(200).await.unwrap();
    let future_ep = episodes.iter().find(|e| e.episode_number == 3).unwrap();
    assert!(!future_ep.watched);
    assert!(
        episodes
            .iter()
            .filter(|e| e.watched)
            .all(|e| e.watched_at.is_some())
    );
}

#[tokio::test]
async fn sync_refreshes_metadata_but_preserves_watched_state() {
    let (catalog, store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 300).await;

    tracker
        .add_to_library(300, MediaKind::Tv, None, false)
        .await
        .unwrap();
    tracker
        .toggle_watched(300, ToggleScope::Episode { season: 1, episode: 2 })
        .await
        .unwrap();

    // The catalog renames an episode and the show itself.
    let mut details = tv_details(300, "Aired Show (Remastered)", &[(1, 3), (2, 2)]);
    details.vote_average = 9.0;
    catalog.set_details(details);
    catalog.set_episodes(
        300,
        1,
        vec![
            ep(1, Some(date_offset(-30))),
            CatalogEpisode {
                name: "The One With The New Title".to_string(),
                ..ep(2, Some(date_offset(-23)))
            },
            ep(3, Some(date_offset(-16))),
        ],
    );

    let report = tracker.sync_media(300).await.unwrap();
    assert_eq!(report.total_episodes, 5);
    assert_eq!(report.progress, 1);
    assert!(report.failed_seasons.is_empty());

    let record = store.get_media(300).await.unwrap().unwrap();
    assert_eq!(record.title, "Aired Show (Remastered)");
    assert_eq!(record.status, WatchStatus::Watching);

    let episodes = store.get_season_episodes(300, 1).await.unwrap();
    let renamed = episodes.iter().find(|e| e.episode_number == 2).unwrap();
    assert_eq!(renamed.name, "The One With The New Title");
    assert!(renamed.watched);
    assert!(renamed.watched_at.is_some());

    // Syncing again changes nothing.
    let report = tracker.sync_media(300).await.unwrap();
    assert_eq!(report.progress, 1);
    let record = store.get_media(300).await.unwrap().unwrap();
    assert_eq!(record.progress, 1);
}

#[tokio::test]
async fn sync_survives_a_failing_season() {
    let (catalog, store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 310).await;

    tracker
        .add_to_library(310, MediaKind::Tv, None, false)
        .await
        .unwrap();

    catalog.fail_season(310, 2);
    let report = tracker.sync_media(310).await.unwrap();

    assert_eq!(report.failed_seasons, vec![2]);
    // The total follows the catalog's season counts, not what happened
    // to get fetched.
    assert_eq!(report.total_episodes, 5);
    // Cached episodes for the failed season are kept.
    assert_eq!(store.get_season_episodes(310, 2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn total_episodes_comes_from_season_counts_not_fetched_rows() {
    let (catalog, store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 320).await;

    // Season 2's episode fetch fails from the very first sync, so its
    // episode rows never materialize locally.
    catalog.fail_season(320, 2);

    let record = tracker
        .add_to_library(320, MediaKind::Tv, None, false)
        .await
        .unwrap();

    assert_eq!(record.total_episodes, 5);
    assert_eq!(store.get_episodes(320).await.unwrap().len(), 3);
}

// ============================================================================
// Toggles
// ============================================================================

#[tokio::test]
async fn episode_toggle_is_symmetric() {
    let (catalog, store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 400).await;
    tracker
        .add_to_library(400, MediaKind::Tv, None, false)
        .await
        .unwrap();

    let scope = ToggleScope::Episode { season: 1, episode: 1 };

    let outcome = tracker.toggle_watched(400, scope).await.unwrap();
    assert!(outcome.watched);
    assert_eq!(outcome.affected, 1);
    assert_eq!(outcome.progress, 1);
    assert_eq!(outcome.status, WatchStatus::Watching);

    let outcome = tracker.toggle_watched(400, scope).await.unwrap();
    assert!(!outcome.watched);
    assert_eq!(outcome.progress, 0);
    assert_eq!(outcome.status, WatchStatus::Planned);

    let episodes = store.get_season_episodes(400, 1).await.unwrap();
    assert!(episodes.iter().all(|e| !e.watched && e.watched_at.is_none()));
}

#[tokio::test]
async fn season_toggle_fills_partial_then_clears() {
    let (catalog, _store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 410).await;
    tracker
        .add_to_library(410, MediaKind::Tv, None, false)
        .await
        .unwrap();

    tracker
        .toggle_watched(410, ToggleScope::Episode { season: 1, episode: 1 })
        .await
        .unwrap();

    // Partially watched season: toggle marks the rest watched.
    let outcome = tracker
        .toggle_watched(410, ToggleScope::Season { season: 1 })
        .await
        .unwrap();
    assert!(outcome.watched);
    assert_eq!(outcome.progress, 3);

    // Fully watched season: toggle clears it.
    let outcome = tracker
        .toggle_watched(410, ToggleScope::Season { season: 1 })
        .await
        .unwrap();
    assert!(!outcome.watched);
    assert_eq!(outcome.progress, 0);
}

#[tokio::test]
async fn show_toggle_skips_future_but_includes_undated() {
    let (catalog, store, tracker) = test_setup().await;
    catalog.set_details(tv_details(420, "Mixed Air Dates", &[(1, 4)]));
    catalog.set_episodes(
        420,
        1,
        vec![
            ep(1, Some(date_offset(-10))),
            ep(2, Some(date_offset(-3))),
            ep(3, Some(date_offset(10))),
            ep(4, None),
        ],
    );
    tracker
        .add_to_library(420, MediaKind::Tv, None, false)
        .await
        .unwrap();

    let outcome = tracker
        .toggle_watched(420, ToggleScope::Show)
        .await
        .unwrap();
    assert!(outcome.watched);
    assert_eq!(outcome.affected, 3);
    assert_eq!(outcome.progress, 3);

    let episodes = store.get_season_episodes(420, 1).await.unwrap();
    let future_ep = episodes.iter().find(|e| e.episode_number == 3).unwrap();
    assert!(!future_ep.watched);
    let undated = episodes.iter().find(|e| e.episode_number == 4).unwrap();
    assert!(undated.watched);
}

#[tokio::test]
async fn toggle_rejects_empty_scope_and_bad_numbers() {
    let (catalog, _store, tracker) = test_setup().await;
    catalog.set_details(tv_details(430, "Unaired Show", &[(1, 2)]));
    catalog.set_episodes(
        430,
        1,
        vec![ep(1, Some(date_offset(5))), ep(2, Some(date_offset(12)))],
    );
    tracker
        .add_to_library(430, MediaKind::Tv, None, false)
        .await
        .unwrap();

    let err = tracker
        .toggle_watched(430, ToggleScope::Show)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::NoEligibleEpisodes));

    let err = tracker
        .toggle_watched(430, ToggleScope::Season { season: 0 })
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidScope(_)));
}

#[tokio::test]
async fn movie_toggle_flips_between_completed_and_planned() {
    let (catalog, _store, tracker) = test_setup().await;
    catalog.set_details(movie_details(440, "Some Movie"));

    tracker
        .add_to_library(440, MediaKind::Movie, None, false)
        .await
        .unwrap();

    let outcome = tracker
        .toggle_watched(440, ToggleScope::Show)
        .await
        .unwrap();
    assert!(outcome.watched);
    assert_eq!(outcome.progress, 1);
    assert_eq!(outcome.status, WatchStatus::Completed);

    let outcome = tracker
        .toggle_watched(440, ToggleScope::Show)
        .await
        .unwrap();
    assert!(!outcome.watched);
    assert_eq!(outcome.status, WatchStatus::Planned);

    let err = tracker
        .toggle_watched(440, ToggleScope::Season { season: 1 })
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidScope(_)));
}

#[tokio::test]
async fn dropped_status_survives_toggles() {
    let (catalog, _store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 450).await;
    tracker
        .add_to_library(450, MediaKind::Tv, None, false)
        .await
        .unwrap();

    tracker
        .set_status(450, WatchStatus::Dropped)
        .await
        .unwrap();

    let outcome = tracker
        .toggle_watched(450, ToggleScope::Episode { season: 1, episode: 1 })
        .await
        .unwrap();
    assert_eq!(outcome.progress, 1);
    assert_eq!(outcome.status, WatchStatus::Dropped);
}

// ============================================================================
// Status and details
// ============================================================================

#[tokio::test]
async fn set_status_completed_marks_aired_and_keeps_old_timestamps() {
    let (catalog, store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 500).await;
    tracker
        .add_to_library(500, MediaKind::Tv, None, false)
        .await
        .unwrap();

    tracker
        .toggle_watched(500, ToggleScope::Episode { season: 1, episode: 1 })
        .await
        .unwrap();
    let before = store.get_season_episodes(500, 1).await.unwrap();
    let original_ts = before
        .iter()
        .find(|e| e.episode_number == 1)
        .unwrap()
        .watched_at
        .clone();

    let record = tracker
        .set_status(500, WatchStatus::Completed)
        .await
        .unwrap();
    assert_eq!(record.status, WatchStatus::Completed);
    assert_eq!(record.progress, 5);

    let after = store.get_season_episodes(500, 1).await.unwrap();
    assert!(after.iter().all(|e| e.watched));
    assert_eq!(
        after
            .iter()
            .find(|e| e.episode_number == 1)
            .unwrap()
            .watched_at,
        original_ts
    );
}

#[tokio::test]
async fn set_status_planned_rewinds_everything() {
    let (catalog, store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 510).await;
    tracker
        .add_to_library(510, MediaKind::Tv, Some(WatchStatus::Completed), false)
        .await
        .unwrap();

    let record = tracker
        .set_status(510, WatchStatus::Planned)
        .await
        .unwrap();
    assert_eq!(record.status, WatchStatus::Planned);
    assert_eq!(record.progress, 0);

    let episodes = store.get_episodes(510).await.unwrap();
    assert!(episodes.iter().all(|e| !e.watched && e.watched_at.is_none()));
}

#[tokio::test]
async fn update_details_validates_rating() {
    let (catalog, _store, tracker) = test_setup().await;
    catalog.set_details(movie_details(520, "Rated Movie"));
    tracker
        .add_to_library(520, MediaKind::Movie, None, false)
        .await
        .unwrap();

    let err = tracker
        .update_details(
            520,
            watcharr::services::tracker::DetailsUpdate {
                rating: Some(11.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidInput(_)));

    let record = tracker
        .update_details(
            520,
            watcharr::services::tracker::DetailsUpdate {
                rating: Some(8.5),
                notes: Some("rewatch with friends".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!((record.rating - 8.5).abs() < f32::EPSILON);
    assert_eq!(record.notes.as_deref(), Some("rewatch with friends"));
}

#[tokio::test]
async fn toggle_anime_flips_flag() {
    let (catalog, _store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 530).await;
    tracker
        .add_to_library(530, MediaKind::Tv, None, false)
        .await
        .unwrap();

    let record = tracker.toggle_anime(530).await.unwrap();
    assert!(record.is_anime);
    let record = tracker.toggle_anime(530).await.unwrap();
    assert!(!record.is_anime);
}

// ============================================================================
// Remove / library / modal
// ============================================================================

#[tokio::test]
async fn remove_deletes_the_whole_family() {
    let (catalog, store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 600).await;
    tracker
        .add_to_library(600, MediaKind::Tv, None, false)
        .await
        .unwrap();

    tracker.remove(600).await.unwrap();

    assert!(store.get_media(600).await.unwrap().is_none());
    assert!(store.get_seasons(600).await.unwrap().is_empty());
    assert!(store.get_episodes(600).await.unwrap().is_empty());

    let err = tracker.remove(600).await.unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(600)));
}

#[tokio::test]
async fn library_orders_by_activity_and_filters() {
    let (catalog, _store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 700).await;
    catalog.set_details(tv_details(701, "Anime Show", &[(1, 2)]));
    catalog.set_episodes(
        701,
        1,
        vec![ep(1, Some(date_offset(-5))), ep(2, Some(date_offset(-1)))],
    );

    tracker
        .add_to_library(700, MediaKind::Tv, None, false)
        .await
        .unwrap();
    tracker
        .add_to_library(701, MediaKind::Tv, None, true)
        .await
        .unwrap();

    // 700 was added first, but watching an episode bumps it to the top.
    tracker
        .toggle_watched(700, ToggleScope::Episode { season: 1, episode: 1 })
        .await
        .unwrap();

    let records = tracker.list_library(None, None).await.unwrap();
    assert_eq!(records[0].tmdb_id, 700);

    let anime_only = tracker
        .list_library(Some("anime-tv".parse().unwrap()), None)
        .await
        .unwrap();
    assert_eq!(anime_only.len(), 1);
    assert_eq!(anime_only[0].tmdb_id, 701);

    let searched = tracker.list_library(None, Some("anime")).await.unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].tmdb_id, 701);
}

#[tokio::test]
async fn modal_focuses_last_watched_season() {
    let (catalog, _store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 800).await;
    tracker
        .add_to_library(800, MediaKind::Tv, None, false)
        .await
        .unwrap();

    tracker
        .toggle_watched(800, ToggleScope::Episode { season: 2, episode: 1 })
        .await
        .unwrap();

    let view = tracker.modal_view(800, MediaKind::Tv).await.unwrap();
    let ModalView::Tracked(modal) = view else {
        panic!("expected tracked modal");
    };
    assert_eq!(modal.focused_season, 2);
    assert_eq!(modal.episodes.len(), 2);
    assert_eq!(modal.all_episodes.len(), 5);
    assert_eq!(modal.seasons.len(), 2);
}

#[tokio::test]
async fn modal_for_untracked_title_is_a_preview() {
    let (catalog, store, tracker) = test_setup().await;
    seed_aired_show(&catalog, 810).await;

    let view = tracker.modal_view(810, MediaKind::Tv).await.unwrap();
    let ModalView::Preview(modal) = view else {
        panic!("expected preview modal");
    };
    assert_eq!(modal.details.title, "Aired Show");
    assert_eq!(modal.episodes.len(), 3);

    // Nothing got persisted along the way.
    assert!(store.get_media(810).await.unwrap().is_none());
}
