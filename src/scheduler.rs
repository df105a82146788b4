use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

use crate::clients::tmdb::{CatalogClient, TmdbClient};
use crate::config::{Config, SchedulerConfig};
use crate::db::Store;
use crate::models::media::WatchStatus;
use crate::services::tracker::is_stale;
use crate::services::{SeaOrmTrackerService, TrackerService};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub catalog: Arc<dyn CatalogClient>,
    pub tracker: Arc<dyn TrackerService>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let catalog: Arc<dyn CatalogClient> = Arc::new(TmdbClient::new(&config.tmdb.api_token)?);
        let tracker: Arc<dyn TrackerService> = Arc::new(SeaOrmTrackerService::new(
            store.clone(),
            Arc::clone(&catalog),
        ));

        Ok(Self {
            config,
            store,
            catalog,
            tracker,
        })
    }

    #[must_use]
    pub fn with_parts(
        config: Config,
        store: Store,
        catalog: Arc<dyn CatalogClient>,
        tracker: Arc<dyn TrackerService>,
    ) -> Self {
        Self {
            config,
            store,
            catalog,
            tracker,
        }
    }
}

/// Background staleness sweep: periodically re-syncs titles the user is
/// still likely to care about.
pub struct Scheduler {
    state: Arc<RwLock<AppState>>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    pub fn new(state: Arc<RwLock<AppState>>, config: SchedulerConfig) -> Self {
        Self {
            state,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);
        let stale_after = self.config.stale_after_hours;
        let delay_ms = self.config.request_delay_ms;

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let state = Arc::clone(&state);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                if let Err(e) = sweep_stale_media(state, stale_after, delay_ms).await {
                    error!("Scheduled sync sweep failed: {}", e);
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_hours = self.config.sweep_interval_hours;
        let stale_after = self.config.stale_after_hours;
        let delay_ms = self.config.request_delay_ms;

        info!("Scheduler running every {} hours", interval_hours);

        let mut sweep_interval = interval(Duration::from_secs(u64::from(interval_hours) * 3600));

        loop {
            sweep_interval.tick().await;
            if !*self.running.read().await {
                break;
            }
            if let Err(e) = sweep_stale_media(Arc::clone(&self.state), stale_after, delay_ms).await
            {
                error!("Scheduled sync sweep failed: {}", e);
            }
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn run_once(&self) -> Result<()> {
        info!("Running manual sync sweep...");
        sweep_stale_media(
            Arc::clone(&self.state),
            self.config.stale_after_hours,
            self.config.request_delay_ms,
        )
        .await
    }
}

/// One pass over the library: titles in planned or watching whose last
/// sync is older than the threshold get re-synced. Per-title failures
/// are logged and skipped.
async fn sweep_stale_media(
    state: Arc<RwLock<AppState>>,
    stale_after_hours: u32,
    delay_ms: u64,
) -> Result<()> {
    let state = state.read().await.clone();
    let max_age = chrono::Duration::hours(i64::from(stale_after_hours));

    let candidates = state
        .store
        .list_media_by_statuses(&[WatchStatus::Planned, WatchStatus::Watching])
        .await?;

    let stale: Vec<_> = candidates
        .into_iter()
        .filter(|r| is_stale(r.last_synced_at.as_deref(), max_age))
        .collect();

    if stale.is_empty() {
        debug!("Sync sweep: nothing stale");
        return Ok(());
    }

    info!("Sync sweep: {} stale title(s)", stale.len());

    for record in stale {
        match state.tracker.sync_media(record.tmdb_id).await {
            Ok(report) => {
                if !report.failed_seasons.is_empty() {
                    warn!(
                        "Sweep synced {} with {} failed season(s)",
                        record.tmdb_id,
                        report.failed_seasons.len()
                    );
                }
            }
            Err(e) => {
                warn!("Sweep sync failed for {}: {}", record.title, e);
            }
        }

        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    info!("Sync sweep complete");
    Ok(())
}
