//! Mutual fund data service: syncs fund listings, NAV history and returns
//! from the PulseDB partner API into an embedded store and serves them over
//! HTTP.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub mod api;
pub mod core;
pub mod history;
pub mod jobs;
pub mod providers;
pub mod store;
pub mod sync;

use crate::core::config::AppConfig;
use crate::history::HistoryService;
use crate::providers::{FundDataSource, PulseDbClient};
use crate::store::FundStore;
use crate::sync::SyncPipeline;

pub enum AppCommand {
    /// Run the HTTP server with the daily sync job.
    Serve,
    /// Run one sync and exit.
    Sync { limit: Option<usize> },
    /// Write a default config file.
    Setup,
}

pub async fn run_command(command: AppCommand, config_path: Option<PathBuf>) -> Result<()> {
    if let AppCommand::Setup = command {
        return setup(config_path);
    }

    let config = load_config(config_path)?;
    let store = Arc::new(FundStore::open(config.data_path()?)?);
    let client: Arc<dyn FundDataSource> = Arc::new(PulseDbClient::new(
        &config.provider.base_url,
        &config.provider.partner,
        &config.provider.key,
    ));
    let pipeline = Arc::new(SyncPipeline::new(
        Arc::clone(&client),
        Arc::clone(&store),
        config.sync.amcs.clone(),
    ));

    match command {
        AppCommand::Serve => serve(config, store, client, pipeline).await,
        AppCommand::Sync { limit } => {
            let limit = limit.unwrap_or(config.sync.default_limit);
            pipeline.sync_categories().await?;
            let report = pipeline.sync_funds(limit).await?;
            println!(
                "Synced {} funds ({} failed) in {:.1}s",
                report.synced, report.failed, report.duration_secs
            );
            Ok(())
        }
        AppCommand::Setup => unreachable!(),
    }
}

async fn serve(
    config: AppConfig,
    store: Arc<FundStore>,
    client: Arc<dyn FundDataSource>,
    pipeline: Arc<SyncPipeline>,
) -> Result<()> {
    let history = Arc::new(HistoryService::new(client));
    history.spawn_sweepers();

    let (hour, minute) = config.sync.daily_at_utc()?;
    jobs::spawn_daily_sync(
        Arc::clone(&pipeline),
        hour,
        minute,
        config.sync.default_limit,
    );

    let state = api::AppState {
        store,
        history,
        sync: pipeline,
        default_sync_limit: config.sync.default_limit,
    };
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{addr}");
    axum::serve(listener, app).await.context("Server exited")?;
    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => {
            let default_path = AppConfig::default_config_path()?;
            if default_path.exists() {
                AppConfig::load()
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}

/// Writes a default config file for the user to fill in, refusing to
/// overwrite an existing one.
fn setup(config_path: Option<PathBuf>) -> Result<()> {
    let path = match config_path {
        Some(path) => path,
        None => AppConfig::default_config_path()?,
    };
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(&AppConfig::default())?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    println!("Set provider.partner and provider.key before syncing.");
    Ok(())
}
