//! Smoke tests for the HTTP surface: real router, real sqlite, scripted
//! catalog.

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use watcharr::Config;
use watcharr::api;
use watcharr::clients::tmdb::{
    CatalogClient, CatalogDetails, CatalogEpisode, CatalogSearchResult, CatalogSeason, ClientError,
};
use watcharr::db::Store;
use watcharr::models::media::MediaKind;
use watcharr::scheduler::AppState;
use watcharr::services::SeaOrmTrackerService;
use watcharr::services::tracker::TrackerService;

#[derive(Default)]
struct ScriptedCatalog {
    details: Mutex<HashMap<(MediaKind, i32), CatalogDetails>>,
    episodes: Mutex<HashMap<(i32, i32), Vec<CatalogEpisode>>>,
}

#[async_trait]
impl CatalogClient for ScriptedCatalog {
    async fn search(&self, query: &str) -> Result<Vec<CatalogSearchResult>, ClientError> {
        Ok(self
            .details
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.title.to_lowercase().contains(&query.to_lowercase()))
            .map(|d| CatalogSearchResult {
                tmdb_id: d.tmdb_id,
                kind: d.kind,
                title: d.title.clone(),
                overview: d.overview.clone(),
                poster_path: d.poster_path.clone(),
                release_date: d.release_date.clone(),
                vote_average: d.vote_average,
                vote_count: d.vote_count,
                popularity: d.popularity,
            })
            .collect())
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
        Ok(self
            .episodes
            .lock()
            .unwrap()
            .get(&(tmdb_id, season_number))
            .cloned()
            .unwrap_or_default())
    }
}

async fn spawn_app() -> Router {
    let db_path = std::env::temp_dir().join(format!("watcharr-api-{}.db", uuid::Uuid::new_v4()));
    let store = Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to open test store");

    let catalog = Arc::new(ScriptedCatalog::default());
    catalog.details.lock().unwrap().insert(
        (MediaKind::Tv, 1396),
        CatalogDetails {
            tmdb_id: 1396,
            kind: MediaKind::Tv,
            title: "Breaking Point".to_string(),
            overview: "A chemistry teacher.".to_string(),
            poster_path: None,
            release_date: Some("2008-01-20".to_string()),
            vote_average: 8.9,
            vote_count: 10000,
            popularity: 300.0,
            seasons: vec![CatalogSeason {
                season_number: 1,
                name: "Season 1".to_string(),
                overview: String::new(),
                air_date: Some("2008-01-20".to_string()),
                episode_count: 2,
                poster_path: None,
            }],
        },
    );
    catalog.episodes.lock().unwrap().insert(
        (1396, 1),
        vec![
            CatalogEpisode {
                episode_number: 1,
                name: "Pilot".to_string(),
                overview: String::new(),
                air_date: Some("2008-01-20".to_string()),
                runtime: Some(58),
                still_path: None,
                vote_average: 8.0,
                vote_count: 200,
            },
            CatalogEpisode {
                episode_number: 2,
                name: "Cat's in the Bag".to_string(),
                overview: String::new(),
                air_date: Some("2008-01-27".to_string()),
                runtime: Some(48),
                still_path: None,
                vote_average: 8.1,
                vote_count: 180,
            },
        ],
    );

    let tracker: Arc<dyn TrackerService> = Arc::new(SeaOrmTrackerService::new(
        store.clone(),
        catalog.clone() as Arc<dyn CatalogClient>,
    ));

    let state = Arc::new(AppState::with_parts(
        Config::default(),
        store,
        catalog,
        tracker,
    ));
    api::router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = spawn_app().await;

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"], json!("ok"));
}

#[tokio::test]
async fn library_starts_empty() {
    let app = spawn_app().await;

    let response = app.oneshot(get("/api/library")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn add_then_toggle_then_remove_roundtrip() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/media",
            json!({"tmdb_id": 1396, "media_type": "tv"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["tmdb_id"], json!(1396));
    assert_eq!(body["data"]["status"], json!("planned"));
    assert_eq!(body["data"]["total_episodes"], json!(2));

    // Adding again conflicts.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/media",
            json!({"tmdb_id": 1396, "media_type": "tv"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/media/1396/seasons/1/episodes/1/toggle",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["watched"], json!(true));
    assert_eq!(body["data"]["progress"], json!(1));
    assert_eq!(body["data"]["status"], json!("watching"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/media/1396")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/library")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn search_endpoint_requires_query() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/search?q=breaking"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["tmdb_id"], json!(1396));

    let response = app.oneshot(get("/api/search?q=%20")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn modal_for_untracked_title_previews_catalog() {
    let app = spawn_app().await;

    let response = app.oneshot(get("/api/media/tv/1396/modal")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["tracked"], json!(false));
    assert_eq!(body["data"]["media"]["title"], json!("Breaking Point"));
    assert_eq!(body["data"]["episodes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_title_maps_to_404() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/media/999/sync", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/media/999/status",
            json!({"status": "watching"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_inputs_map_to_400() {
    let app = spawn_app().await;

    // Unknown kind segment.
    let response = app
        .clone()
        .oneshot(get("/api/media/album/1396/modal"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown library filter.
    let response = app
        .clone()
        .oneshot(get("/api/library?filter=books"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Non-positive id.
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/media",
            json!({"tmdb_id": 0, "media_type": "tv"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
