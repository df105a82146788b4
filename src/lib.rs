pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod scheduler;
pub mod services;

use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;

pub use config::Config;
use models::media::MediaKind;
use scheduler::{AppState, Scheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "daemon" | "-d" | "--daemon" => {
            config.validate()?;
            run_daemon(config).await
        }

        "sweep" | "check" => {
            config.validate()?;
            run_single_sweep(config).await
        }

        "add" | "a" => {
            config.validate()?;
            if args.len() < 3 {
                println!("Usage: watcharr add <tmdb_id> [tv|movie]");
                println!("Example: watcharr add 1396 tv");
                return Ok(());
            }
            let id_str = &args[2];
            let kind_str = args.get(3).map_or("tv", String::as_str);
            cmd_add_media(&config, id_str, kind_str).await
        }

        "list" | "ls" | "l" => cmd_list_library(&config).await,

        "remove" | "rm" | "r" => {
            if args.len() < 3 {
                println!("Usage: watcharr remove <tmdb_id>");
                println!("Use 'watcharr list' to see IDs");
                return Ok(());
            }
            let id_str = &args[2];
            cmd_remove_media(&config, id_str).await
        }

        "search" | "s" => {
            config.validate()?;
            if args.len() < 3 {
                println!("Usage: watcharr search <query>");
                return Ok(());
            }
            let query = args[2..].join(" ");
            cmd_search(&config, &query).await
        }

        "sync" => {
            config.validate()?;
            if args.len() < 3 {
                println!("Usage: watcharr sync <tmdb_id>");
                return Ok(());
            }
            let id_str = &args[2];
            cmd_sync_media(&config, id_str).await
        }

        "init" | "--init" => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Set tmdb.api_token in config.toml and run again.");
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        unknown => {
            println!("Unknown command: {}", unknown);
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Watcharr - Personal Watch Tracker");
    println!("Tracks movies and TV shows against the TMDB catalog");
    println!();
    println!("USAGE:");
    println!("  watcharr <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  add <id> [kind]   Track a TMDB title (kind: tv or movie, default tv)");
    println!("  list, ls          List tracked titles");
    println!("  remove, rm <id>   Stop tracking a title");
    println!("  search <query>    Search the catalog without tracking");
    println!("  sync <id>         Re-sync one title against the catalog");
    println!("  sweep             Run a single staleness sweep");
    println!("  daemon            Run the web API with the background scheduler");
    println!("  init              Create default config file");
    println!("  help              Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  watcharr add 1396 tv       # Track a show by TMDB id");
    println!("  watcharr search \"Alien\"    # Search the catalog");
    println!("  watcharr daemon            # Start the service");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to set the TMDB token, scheduler, and server port.");
}

async fn run_daemon(config: Config) -> anyhow::Result<()> {
    info!(
        "Watcharr v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let state = Arc::new(AppState::new(config.clone()).await?);

    let scheduler_state = Arc::new(RwLock::new((*state).clone()));
    let scheduler = Scheduler::new(Arc::clone(&scheduler_state), config.scheduler.clone());

    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("Scheduler error: {}", e);
        }
    });

    let server_handle: Option<tokio::task::JoinHandle<()>> = if config.server.enabled {
        let port = config.server.port;
        info!("Starting Web API on port {}", port);

        let app = api::router(Arc::clone(&state));
        let addr = format!("0.0.0.0:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        Some(tokio::spawn(async move {
            info!("Web Server running at http://0.0.0.0:{}", port);
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler_handle.abort();
    if let Some(handle) = server_handle {
        handle.abort();
    }
    info!("Daemon stopped");

    Ok(())
}

async fn run_single_sweep(config: Config) -> anyhow::Result<()> {
    info!("Running single sweep...");

    let state = Arc::new(RwLock::new(AppState::new(config.clone()).await?));
    let scheduler = Scheduler::new(Arc::clone(&state), config.scheduler.clone());

    scheduler.run_once().await?;

    info!("Sweep complete");
    Ok(())
}

fn parse_tmdb_id(id_str: &str) -> Option<i32> {
    match id_str.parse::<i32>() {
        Ok(id) if id > 0 => Some(id),
        _ => {
            println!("Invalid TMDB id: {}", id_str);
            None
        }
    }
}

async fn cmd_add_media(config: &Config, id_str: &str, kind_str: &str) -> anyhow::Result<()> {
    let Some(tmdb_id) = parse_tmdb_id(id_str) else {
        return Ok(());
    };
    let kind: MediaKind = match kind_str.parse() {
        Ok(kind) => kind,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };

    let state = AppState::new(config.clone()).await?;
    match state.tracker.add_to_library(tmdb_id, kind, None, false).await {
        Ok(record) => {
            println!(
                "✓ Tracking {} ({}) - {} episodes",
                record.title, record.tmdb_id, record.total_episodes
            );
        }
        Err(e) => {
            println!("Failed to add: {}", e);
        }
    }
    Ok(())
}

async fn cmd_list_library(config: &Config) -> anyhow::Result<()> {
    let state = AppState::new(config.clone()).await?;
    let records = state.tracker.list_library(None, None).await?;

    if records.is_empty() {
        println!("Nothing tracked yet. Use 'watcharr add <tmdb_id>'.");
        return Ok(());
    }

    println!("Tracked titles:");
    println!("{:-<70}", "");
    for record in records {
        let progress = match record.kind {
            MediaKind::Movie => record.status.to_string(),
            MediaKind::Tv => format!(
                "{}/{} ({})",
                record.progress, record.total_episodes, record.status
            ),
        };
        println!(
            "{:>8}  {:<6} {:<40} {}",
            record.tmdb_id,
            record.kind.to_string(),
            record.title,
            progress
        );
    }
    Ok(())
}

async fn cmd_remove_media(config: &Config, id_str: &str) -> anyhow::Result<()> {
    let Some(tmdb_id) = parse_tmdb_id(id_str) else {
        return Ok(());
    };

    let state = AppState::new(config.clone()).await?;
    match state.tracker.remove(tmdb_id).await {
        Ok(()) => println!("✓ Removed {}", tmdb_id),
        Err(e) => println!("Failed to remove: {}", e),
    }
    Ok(())
}

async fn cmd_search(config: &Config, query: &str) -> anyhow::Result<()> {
    let state = AppState::new(config.clone()).await?;
    let results = state.tracker.search_catalog(query).await?;

    if results.is_empty() {
        println!("No titles found matching '{}'", query);
        return Ok(());
    }

    println!("Search Results:");
    println!("{:-<70}", "");
    for hit in results.iter().take(10) {
        let year = hit
            .release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .unwrap_or("????");
        println!(
            "{:>8}  {:<6} {} ({})",
            hit.tmdb_id,
            hit.kind.to_string(),
            hit.title,
            year
        );
    }
    Ok(())
}

async fn cmd_sync_media(config: &Config, id_str: &str) -> anyhow::Result<()> {
    let Some(tmdb_id) = parse_tmdb_id(id_str) else {
        return Ok(());
    };

    let state = AppState::new(config.clone()).await?;
    match state.tracker.sync_media(tmdb_id).await {
        Ok(report) => {
            println!(
                "✓ Synced {}: {} episodes, progress {}",
                report.tmdb_id, report.total_episodes, report.progress
            );
            if !report.failed_seasons.is_empty() {
                println!("  Failed seasons: {:?}", report.failed_seasons);
            }
        }
        Err(e) => println!("Sync failed: {}", e),
    }
    Ok(())
}
