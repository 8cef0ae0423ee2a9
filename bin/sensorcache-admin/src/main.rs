//! Sensorcache Admin - Administrative tool for the content cache
//!
//! Builds the cache from a JSON fixture of the data source and inspects or
//! updates it. `serve` keeps the controller and its scheduler running until
//! Ctrl-C.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use sensorcache_common::{CacheConfig, LoggingConfig};
use sensorcache_ctrl::actions::{ResultTemplateDeletion, SensorDeletion};
use sensorcache_ctrl::complete::InitialCacheUpdateFactory;
use sensorcache_ctrl::{
    CacheController, CachePersistenceStrategy, DataSourceGateway, InMemoryGateway,
    JsonFilePersistence, NoOpPersistence, UpdateAction,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sensorcache-admin")]
#[command(about = "Sensor observation content cache admin tool")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "sensorcache.toml")]
    config: PathBuf,

    /// JSON fixture served as the data source
    #[arg(short, long, env = "SENSORCACHE_FIXTURE")]
    fixture: PathBuf,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Concurrent tasks of the complete update
    #[arg(long)]
    thread_count: Option<usize>,

    /// Seconds between complete updates (0 disables them)
    #[arg(long)]
    update_interval: Option<u64>,

    /// Cache snapshot file
    #[arg(long)]
    persist: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print entity counts and global extents
    Summary,
    /// Print the whole cache as JSON
    Dump,
    /// Rebuild the cache from the data source
    Reload,
    /// Remove a deleted sensor from the cache
    DeleteSensor {
        /// Procedure identifier
        procedure: String,
    },
    /// Remove result templates from the cache
    DeleteTemplate {
        #[arg(required = true)]
        templates: Vec<String>,
    },
    /// Keep the cache running with periodic updates until Ctrl-C
    Serve,
}

/// Configuration file structure
#[derive(Debug, Default, Deserialize)]
struct Config {
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    persistence: PersistenceConfig,
}

#[derive(Debug, Default, Deserialize)]
struct PersistenceConfig {
    #[serde(default)]
    path: Option<PathBuf>,
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let config_str = std::fs::read_to_string(path)?;
    toml::from_str(&config_str)
        .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))
}

/// Command line values take precedence over the file
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    if let Some(thread_count) = args.thread_count {
        config.cache.thread_count = thread_count;
    }
    if let Some(interval) = args.update_interval {
        config.cache.update_interval_secs = interval;
    }
    if args.persist.is_some() {
        config.persistence.path.clone_from(&args.persist);
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct Report {
    summary: sensorcache_store::CacheSummary,
    stats: sensorcache_ctrl::ControllerStats,
}

fn print_summary(controller: &CacheController) -> Result<()> {
    print_json(&Report {
        summary: controller.get_cache().summary(),
        stats: controller.stats(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args);
    init_logging(&config.logging);

    info!("Config file: {}", args.config.display());
    info!("Fixture: {}", args.fixture.display());

    let fixture = std::fs::read_to_string(&args.fixture)
        .map_err(|e| anyhow!("Failed to read fixture {}: {}", args.fixture.display(), e))?;
    let gateway: Arc<dyn DataSourceGateway> = Arc::new(InMemoryGateway::from_json(&fixture)?);

    let persistence: Arc<dyn CachePersistenceStrategy> = match &config.persistence.path {
        Some(path) => {
            info!("Cache snapshot: {}", path.display());
            Arc::new(JsonFilePersistence::new(path))
        }
        None => Arc::new(NoOpPersistence),
    };

    let default_locale = config.cache.default_locale.clone();
    let factory = InitialCacheUpdateFactory::new(Arc::clone(&gateway), &config.cache);
    let controller =
        Arc::new(CacheController::new(config.cache, factory)?.with_persistence(persistence));
    controller.init().await?;

    match args.command {
        Commands::Summary => print_summary(&controller)?,
        Commands::Dump => print_json(controller.get_cache().as_ref())?,
        Commands::Reload => {
            controller.update_complete().await?;
            print_summary(&controller)?;
        }
        Commands::DeleteSensor { procedure } => {
            let deletion = SensorDeletion::new(procedure, Arc::clone(&gateway), default_locale)?;
            controller.update(UpdateAction::incremental(deletion)).await?;
            print_summary(&controller)?;
        }
        Commands::DeleteTemplate { templates } => {
            let deletion = ResultTemplateDeletion::new(templates)?;
            controller.update(UpdateAction::incremental(deletion)).await?;
            print_summary(&controller)?;
        }
        Commands::Serve => {
            info!("Cache ready, press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
        }
    }

    controller.close().await?;
    Ok(())
}
