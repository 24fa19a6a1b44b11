use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use readnest_server::background_jobs::{
    create_scheduler,
    jobs::{AuditLogCleanupJob, FacetAffinityJob, FacetRecommendationJob, ShelfTrendsJob},
    HookEvent, JobContext,
};
use readnest_server::catalog_store::{CatalogStore, FacetKind, SqliteCatalogStore};
use readnest_server::config::{AppConfig, CliConfig, FileConfig};
use readnest_server::derived_store::{DerivedStore, SqliteDerivedStore};
use readnest_server::server_store::{ServerStore, SqliteServerStore};
use readnest_server::user_store::{SqliteUserStore, UserStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the SQLite database files.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to an optional TOML config file. TOML values override CLI.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Default log level when LOG_LEVEL is not set.
    #[clap(long)]
    pub log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        log_level: cli_args.log_level,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let default_directive = config
        .log_level
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_directive)
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "readnest-server {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    info!("Opening SQLite databases in {:?}...", config.db_dir);
    let catalog_store: Arc<dyn CatalogStore> =
        Arc::new(SqliteCatalogStore::new(config.catalog_db_path())?);
    let user_store: Arc<dyn UserStore> = Arc::new(SqliteUserStore::new(config.user_db_path())?);
    let derived_store: Arc<dyn DerivedStore> =
        Arc::new(SqliteDerivedStore::new(config.derived_db_path())?);
    let server_store: Arc<dyn ServerStore> =
        Arc::new(SqliteServerStore::new(config.server_db_path())?);

    info!(
        "Catalog holds {} books, {} registered readers",
        catalog_store.get_books_count(),
        user_store.get_users_count()
    );

    let shutdown_token = tokio_util::sync::CancellationToken::new();
    let (_hook_sender, hook_receiver) = tokio::sync::mpsc::channel::<HookEvent>(100);

    let job_context = JobContext::new(
        shutdown_token.child_token(),
        catalog_store,
        user_store,
        derived_store,
        Arc::clone(&server_store),
    );

    let (mut scheduler, _handle) = create_scheduler(
        server_store,
        hook_receiver,
        shutdown_token.clone(),
        job_context,
    );

    for kind in [FacetKind::Tag, FacetKind::Category, FacetKind::Author] {
        scheduler
            .register_job(Arc::new(FacetAffinityJob::new(kind, &config.pipeline)))
            .await;
    }
    for kind in [FacetKind::Tag, FacetKind::Category] {
        scheduler
            .register_job(Arc::new(FacetRecommendationJob::new(kind, &config.pipeline)))
            .await;
    }
    scheduler
        .register_job(Arc::new(ShelfTrendsJob::new(&config.pipeline)))
        .await;
    scheduler
        .register_job(Arc::new(AuditLogCleanupJob::new(&config.background_jobs)))
        .await;

    let scheduler_task = tokio::spawn(async move {
        scheduler.run().await;
    });

    info!("Scheduler running, press Ctrl+C to shut down");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    shutdown_token.cancel();
    scheduler_task
        .await
        .context("Scheduler task failed during shutdown")?;

    Ok(())
}
