//! index-settings
//!
//! Opens an index from its metadata file, prints its effective settings, and
//! optionally follows the file, applying each change as a settings update.

use anyhow::{Context, Result};
use clap::Parser;
use index_settings::cli::{Cli, Command, OutputFormat, render_text, settings_report};
use index_settings::settings::ConfigPaths;
use index_settings::watcher::{WatcherConfig, start_metadata_watcher};
use index_settings::{IndexMetadata, IndexSettings, IndexSettingsError, SettingsListener};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn open_index(index: &Path, node: Option<PathBuf>) -> Result<IndexSettings> {
    let node_settings = ConfigPaths::discover(node).load_node_settings()?;
    let metadata = IndexMetadata::load(index)?;
    open_with_listeners(metadata, node_settings, [])
}

fn open_with_listeners(
    metadata: IndexMetadata,
    node_settings: index_settings::Settings,
    listeners: impl IntoIterator<Item = SettingsListener>,
) -> Result<IndexSettings> {
    let name = metadata.index().to_string();
    IndexSettings::new(metadata, node_settings, listeners)
        .with_context(|| format!("Failed to open index [{name}]"))
}

fn show(index: &Path, node: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let settings = open_index(index, node)?;
    match format {
        OutputFormat::Text => print!("{}", render_text(&settings)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&settings_report(&settings))?)
        }
    }
    Ok(())
}

async fn watch(index: &Path, node: Option<PathBuf>, debounce_ms: u64) -> Result<()> {
    let node_settings = ConfigPaths::discover(node).load_node_settings()?;
    let metadata = IndexMetadata::load(index)?;
    let reporter = SettingsListener::new("report", |settings| {
        info!(settings = settings.len(), "listener received updated settings");
        Ok(())
    });
    let settings = open_with_listeners(metadata, node_settings, [reporter])?;
    info!(
        index = settings.index(),
        refresh_interval = %settings.refresh_interval(),
        durability = %settings.translog_durability(),
        "index opened"
    );

    let config = WatcherConfig {
        debounce_duration: Duration::from_millis(debounce_ms),
    };
    let mut handle = start_metadata_watcher(index, config)?;

    loop {
        tokio::select! {
            event = handle.wait_for_change() => {
                let Some(event) = event else {
                    warn!("Metadata watcher stopped");
                    break;
                };
                if !event.requires_reload() {
                    continue;
                }
                let metadata = match IndexMetadata::load(index) {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!("Ignoring unreadable index metadata: {:#}", e);
                        continue;
                    }
                };
                match settings.apply_update(metadata) {
                    Ok(true) => info!(
                        refresh_interval = %settings.refresh_interval(),
                        durability = %settings.translog_durability(),
                        flush_threshold_size = %settings.flush_threshold_size(),
                        "settings updated"
                    ),
                    Ok(false) => info!("settings unchanged"),
                    Err(IndexSettingsError::IdentityMismatch(e)) => {
                        error!(field = e.field(), "rejected settings update: {}", e)
                    }
                    Err(e) => error!("rejected settings update: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }
    handle.stop().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    match cli.command {
        Command::Show {
            index,
            node,
            format,
        } => show(&index, node, format),
        Command::Watch {
            index,
            node,
            debounce_ms,
        } => watch(&index, node, debounce_ms).await,
    }
}
