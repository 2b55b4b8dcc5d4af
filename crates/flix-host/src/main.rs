//! `flix-sw`: drive the FahadFlix offline worker from the command line.
//!
//! ## Usage
//!
//! ```bash
//! # Pre-cache the app shell
//! flix-sw --config flix.json install
//!
//! # Fetch through the worker with the network switched off
//! flix-sw --offline fetch http://localhost:8080/ http://localhost:8080/catalog.json
//!
//! # Inspect what is cached
//! flix-sw caches
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flix_common::{init_logging, LogConfig, LogFormat};
use flix_host::{HostConfig, HostEvent, WorkerHost};
use flix_net::{HttpNetwork, OfflineNetwork};
use flix_sw::{CachePolicy, CacheStore, Destination, DiskCacheStorage, Network, Request};
use http::Method;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

#[derive(Parser)]
#[command(name = "flix-sw")]
#[command(about = "Offline caching worker for the FahadFlix web app", version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory (overrides the config file)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Treat the network as unreachable
    #[arg(long, global = true)]
    offline: bool,

    /// Log format: pretty, compact or json
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pre-cache the app shell and print the install report
    Install,

    /// Install, activate and print the activation report
    Activate,

    /// Fetch URLs through the worker
    Fetch {
        /// URLs to fetch
        #[arg(required = true)]
        urls: Vec<Url>,
        /// Send as top-level navigations
        #[arg(long)]
        navigate: bool,
        /// Destination hint (document, video, image, ...)
        #[arg(long)]
        destination: Option<String>,
        /// Request method
        #[arg(long, default_value = "GET")]
        method: Method,
    },

    /// List cache namespaces and their entries
    Caches,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LogConfig::from_verbosity(cli.verbose).with_format(cli.log_format));

    let mut config = match &cli.config {
        Some(path) => HostConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HostConfig::default(),
    };
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = Some(dir);
    }

    let cache_dir = config.cache_dir();
    debug!(cache_dir = %cache_dir.display(), "Opening cache storage");
    let storage: Arc<dyn CacheStore> = Arc::new(
        DiskCacheStorage::open_at(&cache_dir)
            .await
            .with_context(|| format!("opening cache storage at {}", cache_dir.display()))?,
    );

    let network: Arc<dyn Network> = if cli.offline {
        Arc::new(OfflineNetwork)
    } else {
        Arc::new(HttpNetwork::new(config.loader_config()).context("building HTTP client")?)
    };

    let policy = Arc::new(CachePolicy::new(
        config.worker.clone(),
        storage,
        network.clone(),
    ));
    let (host, events) = WorkerHost::new(config.worker.origin.clone(), policy.clone(), network);

    match cli.command {
        Commands::Install => {
            let report = host.install().await?;
            print_json(&report)?;
        }
        Commands::Activate => {
            let (_, activate) = host.start().await?;
            if let Some(report) = activate {
                print_json(&report)?;
            }
        }
        Commands::Fetch {
            urls,
            navigate,
            destination,
            method,
        } => {
            host.start().await?;
            for url in urls {
                let mut request = if navigate {
                    Request::navigate(url.clone())
                } else {
                    Request::get(url.clone())
                };
                request = request.with_method(method.clone());
                if let Some(hint) = &destination {
                    request = request.with_destination(Destination::parse(hint));
                }

                match host.fetch(request).await {
                    Ok(response) => println!(
                        "{} {} {:?} {} bytes",
                        url,
                        response.status,
                        response.source,
                        response.body().len()
                    ),
                    Err(e) => {
                        warn!(url = %url, category = e.category(), error = %e, "Fetch failed");
                        println!("{url} {} error: {e}", e.category());
                    }
                }
            }
            print_json(&policy.stats())?;
        }
        Commands::Caches => list_caches(policy.storage().as_ref()).await?,
    }

    log_events(events);
    Ok(())
}

async fn list_caches(storage: &dyn CacheStore) -> Result<()> {
    for namespace in storage.keys().await? {
        println!("{namespace}");
        for key in storage.entries(&namespace).await? {
            println!("  {key}");
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn log_events(mut events: mpsc::UnboundedReceiver<HostEvent>) {
    while let Ok(event) = events.try_recv() {
        debug!(?event, "Host event");
    }
}
