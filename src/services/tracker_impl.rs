use crate::clients::tmdb::{CatalogClient, CatalogSearchResult, ClientError};
use crate::db::Store;
use crate::models::media::{MediaKind, MediaRecord, WatchStatus};
use crate::services::tracker::{
    DetailsUpdate, LibraryFilter, ModalView, PreviewModal, SyncReport, ToggleOutcome, ToggleScope,
    TrackedModal, TrackerError, TrackerService, derive_status, is_stale, now_rfc3339, today_utc,
};
use std::sync::Arc;
use tracing::{info, warn};

/// How old a title's last sync may get before opening its detail view
/// triggers a refresh.
const MODAL_REFRESH_AGE_HOURS: i64 = 24;

/// Total episode count as the catalog reports it, summed over the
/// season headers. Stays correct even when an episode fetch failed and
/// some episode rows are missing locally.
fn season_episode_sum(seasons: &[crate::clients::tmdb::CatalogSeason]) -> i32 {
    seasons.iter().map(|s| s.episode_count).sum()
}

/// `SeaORM`-backed implementation of [`TrackerService`].
pub struct SeaOrmTrackerService {
    store: Store,
    catalog: Arc<dyn CatalogClient>,
}

impl SeaOrmTrackerService {
    #[must_use]
    pub fn new(store: Store, catalog: Arc<dyn CatalogClient>) -> Self {
        Self { store, catalog }
    }

    async fn require_media(&self, tmdb_id: i32) -> Result<MediaRecord, TrackerError> {
        self.store
            .get_media(tmdb_id)
            .await?
            .ok_or(TrackerError::NotFound(tmdb_id))
    }

    /// Recomputes progress and status from episode rows and writes the
    /// pair back. Returns the new aggregates. `today` is the caller's
    /// date snapshot so eligibility and recomputation agree within one
    /// operation.
    async fn refresh_aggregates(
        &self,
        tmdb_id: i32,
        current: WatchStatus,
        today: &str,
    ) -> Result<(i32, WatchStatus), TrackerError> {
        let progress = self.store.count_watched_episodes(tmdb_id).await?;
        let aired = self.store.count_aired_episodes(tmdb_id, today).await?;
        let status = derive_status(current, progress, aired);
        self.store
            .set_media_progress(tmdb_id, progress, status)
            .await?;
        Ok((progress, status))
    }

    /// Pulls the season/episode tree for a show. Season fetch failures
    /// are collected, not fatal; already-cached episodes stay.
    async fn sync_episode_tree(
        &self,
        tmdb_id: i32,
        seasons: &[crate::clients::tmdb::CatalogSeason],
    ) -> Result<Vec<i32>, TrackerError> {
        self.store.upsert_seasons(tmdb_id, seasons).await?;

        let mut failed_seasons = Vec::new();
        for season in seasons {
            match self
                .catalog
                .season_episodes(tmdb_id, season.season_number)
                .await
            {
                Ok(episodes) => {
                    self.store
                        .upsert_episodes(tmdb_id, season.season_number, &episodes)
                        .await?;
                }
                Err(err) => {
                    warn!(
                        "Episode fetch failed for {} season {}: {}",
                        tmdb_id, season.season_number, err
                    );
                    failed_seasons.push(season.season_number);
                }
            }
        }
        Ok(failed_seasons)
    }
}

#[async_trait::async_trait]
impl TrackerService for SeaOrmTrackerService {
    async fn search_catalog(
        &self,
        query: &str,
    ) -> Result<Vec<CatalogSearchResult>, TrackerError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TrackerError::InvalidInput(
                "search query must not be empty".to_string(),
            ));
        }

        match self.catalog.search(query).await {
            Ok(results) => Ok(results),
            Err(ClientError::NotFound) => Ok(Vec::new()),
            Err(ClientError::Unavailable(msg)) => Err(TrackerError::Upstream(msg)),
        }
    }

    async fn add_to_library(
        &self,
        tmdb_id: i32,
        kind: MediaKind,
        status: Option<WatchStatus>,
        is_anime: bool,
    ) -> Result<MediaRecord, TrackerError> {
        if self.store.media_exists(tmdb_id).await? {
            return Err(TrackerError::AlreadyTracked(tmdb_id));
        }

        let details = self
            .catalog
            .details(kind, tmdb_id)
            .await
            .map_err(|e| TrackerError::from_client(e, tmdb_id))?;

        let seed_status = status.unwrap_or(WatchStatus::Planned);
        let now = now_rfc3339();
        let today = today_utc();

        let record = MediaRecord {
            tmdb_id,
            kind,
            title: details.title.clone(),
            overview: details.overview.clone(),
            poster_path: details.poster_path.clone(),
            release_date: details.release_date.clone(),
            is_anime,
            status: seed_status,
            progress: 0,
            total_episodes: if kind == MediaKind::Movie { 1 } else { 0 },
            rating: 0.0,
            notes: None,
            vote_average: details.vote_average,
            vote_count: details.vote_count,
            popularity: details.popularity,
            added_at: now.clone(),
            last_synced_at: None,
        };
        self.store.add_media(&record).await?;

        match kind {
            MediaKind::Movie => {
                if seed_status == WatchStatus::Completed {
                    self.store
                        .set_media_progress(tmdb_id, 1, WatchStatus::Completed)
                        .await?;
                }
            }
            MediaKind::Tv => {
                let failed = self.sync_episode_tree(tmdb_id, &details.seasons).await?;
                if !failed.is_empty() {
                    warn!(
                        "Tracked {} with {} season(s) missing episodes",
                        tmdb_id,
                        failed.len()
                    );
                }

                if seed_status == WatchStatus::Completed {
                    self.store
                        .mark_aired_episodes_watched(tmdb_id, &now, &today)
                        .await?;
                }

                let total = season_episode_sum(&details.seasons);
                self.store.set_media_total_episodes(tmdb_id, total).await?;

                let progress = self.store.count_watched_episodes(tmdb_id).await?;
                // The seed status is the user's word; only progress is
                // recomputed here.
                self.store
                    .set_media_progress(tmdb_id, progress, seed_status)
                    .await?;
            }
        }

        self.store.touch_media_synced(tmdb_id, &now).await?;

        info!("Added {} {} to library", kind, tmdb_id);
        self.require_media(tmdb_id).await
    }

    async fn sync_media(&self, tmdb_id: i32) -> Result<SyncReport, TrackerError> {
        let record = self.require_media(tmdb_id).await?;

        let details = self
            .catalog
            .details(record.kind, tmdb_id)
            .await
            .map_err(|e| TrackerError::from_client(e, tmdb_id))?;

        self.store.update_media_catalog(tmdb_id, &details).await?;

        let report = match record.kind {
            MediaKind::Movie => SyncReport {
                tmdb_id,
                total_episodes: record.total_episodes,
                progress: record.progress,
                failed_seasons: Vec::new(),
            },
            MediaKind::Tv => {
                let failed_seasons = self.sync_episode_tree(tmdb_id, &details.seasons).await?;

                let total = season_episode_sum(&details.seasons);
                self.store.set_media_total_episodes(tmdb_id, total).await?;

                let (progress, _) = self
                    .refresh_aggregates(tmdb_id, record.status, &today_utc())
                    .await?;

                SyncReport {
                    tmdb_id,
                    total_episodes: total,
                    progress,
                    failed_seasons,
                }
            }
        };

        self.store
            .touch_media_synced(tmdb_id, &now_rfc3339())
            .await?;

        info!(
            "Synced {}: {} episodes, progress {}",
            tmdb_id, report.total_episodes, report.progress
        );
        Ok(report)
    }

    async fn toggle_watched(
        &self,
        tmdb_id: i32,
        scope: ToggleScope,
    ) -> Result<ToggleOutcome, TrackerError> {
        scope.validate()?;
        let record = self.require_media(tmdb_id).await?;

        if record.kind == MediaKind::Movie {
            if scope != ToggleScope::Show {
                return Err(TrackerError::InvalidScope(
                    "movies have no seasons or episodes".to_string(),
                ));
            }
            let watched = record.progress == 0;
            let progress = i32::from(watched);
            let status = if watched {
                WatchStatus::Completed
            } else {
                WatchStatus::Planned
            };
            let status = if record.status == WatchStatus::Dropped {
                WatchStatus::Dropped
            } else {
                status
            };
            self.store
                .set_media_progress(tmdb_id, progress, status)
                .await?;
            return Ok(ToggleOutcome {
                watched,
                affected: 1,
                progress,
                status,
            });
        }

        let today = today_utc();
        let eligible = self
            .store
            .list_eligible_episodes(tmdb_id, scope.season(), scope.episode(), &today)
            .await?;
        if eligible.is_empty() {
            return Err(TrackerError::NoEligibleEpisodes);
        }

        // A fully-watched scope flips to unwatched; anything less marks
        // the whole scope watched.
        let watched = !eligible.iter().all(|ep| ep.watched);
        let now = now_rfc3339();
        let watched_at = watched.then_some(now.as_str());

        let affected = self
            .store
            .set_episodes_watched(
                tmdb_id,
                scope.season(),
                scope.episode(),
                &today,
                watched,
                watched_at,
            )
            .await?;

        let (progress, status) = self
            .refresh_aggregates(tmdb_id, record.status, &today)
            .await?;

        Ok(ToggleOutcome {
            watched,
            affected,
            progress,
            status,
        })
    }

    async fn set_status(
        &self,
        tmdb_id: i32,
        status: WatchStatus,
    ) -> Result<MediaRecord, TrackerError> {
        let record = self.require_media(tmdb_id).await?;

        match status {
            WatchStatus::Completed => {
                let progress = match record.kind {
                    MediaKind::Movie => 1,
                    MediaKind::Tv => {
                        let now = now_rfc3339();
                        let today = today_utc();
                        self.store
                            .mark_aired_episodes_watched(tmdb_id, &now, &today)
                            .await?;
                        self.store.count_watched_episodes(tmdb_id).await?
                    }
                };
                self.store
                    .set_media_progress(tmdb_id, progress, WatchStatus::Completed)
                    .await?;
            }
            WatchStatus::Planned => {
                if record.kind == MediaKind::Tv {
                    self.store.reset_watched_episodes(tmdb_id).await?;
                }
                self.store
                    .set_media_progress(tmdb_id, 0, WatchStatus::Planned)
                    .await?;
            }
            WatchStatus::Watching | WatchStatus::Dropped => {
                self.store.set_media_status(tmdb_id, status).await?;
            }
        }

        self.require_media(tmdb_id).await
    }

    async fn update_details(
        &self,
        tmdb_id: i32,
        update: DetailsUpdate,
    ) -> Result<MediaRecord, TrackerError> {
        self.require_media(tmdb_id).await?;

        if let Some(rating) = update.rating {
            if !(0.0..=10.0).contains(&rating) {
                return Err(TrackerError::InvalidInput(format!(
                    "rating must be between 0 and 10, got {rating}"
                )));
            }
        }

        self.store
            .update_media_details(tmdb_id, update.status, update.rating, update.notes)
            .await?;

        self.require_media(tmdb_id).await
    }

    async fn toggle_anime(&self, tmdb_id: i32) -> Result<MediaRecord, TrackerError> {
        let record = self.require_media(tmdb_id).await?;
        self.store
            .set_media_anime(tmdb_id, !record.is_anime)
            .await?;
        self.require_media(tmdb_id).await
    }

    async fn remove(&self, tmdb_id: i32) -> Result<(), TrackerError> {
        if self.store.remove_media(tmdb_id).await? {
            Ok(())
        } else {
            Err(TrackerError::NotFound(tmdb_id))
        }
    }

    async fn list_library(
        &self,
        filter: Option<LibraryFilter>,
        search: Option<&str>,
    ) -> Result<Vec<MediaRecord>, TrackerError> {
        let mut records = self.store.list_media().await?;

        if let Some(filter) = filter {
            records.retain(|r| filter.matches(r));
        }
        if let Some(search) = search {
            let needle = search.to_lowercase();
            records.retain(|r| r.title.to_lowercase().contains(&needle));
        }

        // Most recently touched first: last watched episode if any,
        // otherwise when the title was added.
        let latest = self.store.latest_watched_map().await?;
        records.sort_by(|a, b| {
            let key_a = latest.get(&a.tmdb_id).unwrap_or(&a.added_at);
            let key_b = latest.get(&b.tmdb_id).unwrap_or(&b.added_at);
            key_b.cmp(key_a)
        });

        Ok(records)
    }

    async fn modal_view(
        &self,
        tmdb_id: i32,
        kind: MediaKind,
    ) -> Result<ModalView, TrackerError> {
        let Some(record) = self.store.get_media(tmdb_id).await? else {
            // Untracked title: serve a catalog preview without
            // persisting anything.
            let details = self
                .catalog
                .details(kind, tmdb_id)
                .await
                .map_err(|e| TrackerError::from_client(e, tmdb_id))?;

            let episodes = match details.seasons.first() {
                Some(first) => self
                    .catalog
                    .season_episodes(tmdb_id, first.season_number)
                    .await
                    .unwrap_or_else(|err| {
                        warn!("Preview episode fetch failed for {}: {}", tmdb_id, err);
                        Vec::new()
                    }),
                None => Vec::new(),
            };

            return Ok(ModalView::Preview(Box::new(PreviewModal {
                details,
                episodes,
            })));
        };

        // Opportunistic refresh when the cached copy has gone stale.
        // The view is served either way.
        if record.kind == MediaKind::Tv
            && is_stale(
                record.last_synced_at.as_deref(),
                chrono::Duration::hours(MODAL_REFRESH_AGE_HOURS),
            )
        {
            if let Err(err) = self.sync_media(tmdb_id).await {
                warn!("Stale refresh failed for {}: {}", tmdb_id, err);
            }
        }

        let record = self.require_media(tmdb_id).await?;
        let seasons = self.store.get_seasons(tmdb_id).await?;
        let all_episodes = self.store.get_episodes(tmdb_id).await?;

        let focused_season = self
            .store
            .last_watched_season(tmdb_id)
            .await?
            .unwrap_or(1);
        let episodes = all_episodes
            .iter()
            .filter(|ep| ep.season_number == focused_season)
            .cloned()
            .collect();

        Ok(ModalView::Tracked(Box::new(TrackedModal {
            record,
            seasons,
            focused_season,
            episodes,
            all_episodes,
        })))
    }
}
