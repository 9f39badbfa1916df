//! earshot - command-line front end for the earshot playback core
//!
//! Inspects persisted state (recents, play history, documents tree) and probes
//! stream URLs through the prefetch queue. Audio output itself needs a platform
//! transport and is not driven from here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use earshot_common::config::{StorageRoots, TomlConfig};
use earshot_common::MediaItem;
use earshot_fs::{Directory, FileSystem};
use earshot_player::{AssetQueue, HttpAssetLoader, PlayStatistics, StatisticsConfig};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for earshot
#[derive(Parser, Debug)]
#[command(name = "earshot")]
#[command(about = "Streaming audio player core")]
#[command(version)]
struct Args {
    /// Configuration file (default: ~/.config/earshot/config.toml)
    #[arg(short, long, env = "EARSHOT_CONFIG")]
    config: Option<PathBuf>,

    /// Documents root, overriding the config file and EARSHOT_DOCUMENTS
    #[arg(short, long)]
    documents: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print recently played items, most recent first
    Recents,

    /// Print the play history, oldest first
    History {
        /// Only print the last N plays
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Load URLs through the prefetch queue and report which are playable
    Probe {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// List folders and files under a documents subdirectory
    Ls {
        /// Path relative to the documents root
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing
    let level = &config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("earshot={level},earshot_fs={level},earshot_player={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let roots = StorageRoots::resolve(args.documents.as_deref(), &config);
    info!("Documents root: {}", roots.documents.display());
    debug!("Cache root: {}", roots.cache.display());

    let fs = FileSystem::new(roots);

    match args.command {
        Command::Recents => {
            let stats = PlayStatistics::load(fs, StatisticsConfig::from(&config))
                .await
                .context("Failed to load recents")?;
            for item in stats.recents().await {
                println!("{:<24} {:<8} {}  <{}>", item.id, item.kind, item.title, item.url);
            }
        }
        Command::History { limit } => {
            let stats = PlayStatistics::load(fs, StatisticsConfig::from(&config))
                .await
                .context("Failed to load statistics")?;
            let history = stats.history().await.context("Failed to read play history")?;
            let skip = limit.map_or(0, |limit| history.len().saturating_sub(limit));
            for record in history.iter().skip(skip) {
                println!(
                    "{}  {:<8} {:<24} {}",
                    record.started_at.format("%Y-%m-%d %H:%M:%S"),
                    record.kind,
                    record.item_id,
                    record.title
                );
            }
        }
        Command::Probe { urls } => {
            let timeout = Duration::from_secs(config.player.probe_timeout_secs);
            probe(urls, timeout).await?;
        }
        Command::Ls { path } => {
            let directory = Directory::documents(path.unwrap_or_default());
            for folder in fs.list_subdirectories(&directory).await? {
                let size = fs.directory_size(&folder).await?;
                let name = folder.name().unwrap_or_default();
                println!("{:>10}  {}/", size, name);
            }
            for file in fs.list_files(&directory).await? {
                println!("{:>10}  {}", file.size().await, file.name());
            }
        }
    }

    Ok(())
}

/// Run URLs through the prefetch queue and print outcomes in readiness order
async fn probe(urls: Vec<String>, timeout: Duration) -> Result<()> {
    let loader = HttpAssetLoader::new(timeout).context("Failed to build HTTP client")?;
    let queue = AssetQueue::new(Arc::new(loader));
    let mut ready = queue.subscribe_ready();
    let mut failures = queue.subscribe_failures();

    let items: Vec<_> = urls
        .iter()
        .map(|url| Arc::new(MediaItem::stream(url.clone(), url.clone(), url.clone())))
        .collect();
    let total = items.len();
    let deadline = batch_deadline(timeout, total)
        .with_context(|| format!("Too many URLs ({total}) for a {timeout:?} timeout"))?;
    queue.add(items);

    let mut outcomes = 0;
    let finished = tokio::time::timeout(deadline, async {
        while outcomes < total {
            tokio::select! {
                Some(asset) = ready.recv() => {
                    if let Some(asset) = asset {
                        println!("ready   {}", asset.asset.item.url);
                        outcomes += 1;
                    }
                }
                Some(failure) = failures.recv() => {
                    if let Some(failure) = failure {
                        println!("failed  {}  ({})", failure.item.url, failure.error);
                        outcomes += 1;
                    }
                }
                else => break,
            }
        }
    })
    .await;

    if finished.is_err() {
        anyhow::bail!("Timed out after {:?} waiting for {} probe(s)", deadline, total - outcomes);
    }
    Ok(())
}

/// Upper bound for `count` sequential loads, each bounded by `timeout`, plus one spare
fn batch_deadline(timeout: Duration, count: usize) -> Option<Duration> {
    let loads = u32::try_from(count).ok()?.checked_add(1)?;
    timeout.checked_mul(loads)
}
