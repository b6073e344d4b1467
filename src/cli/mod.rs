//! CLI command definitions for index-settings
//!
//! `show` prints the effective settings of an index; `watch` keeps an
//! [`IndexSettings`] open and applies every change to its metadata file.

use crate::index::{IndexSettings, MergePolicy};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use std::fmt::Write;
use std::path::PathBuf;

/// Output format for `show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable (default)
    #[default]
    Text,
    /// JSON object
    Json,
}

/// Inspect and follow the live settings of an index
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the effective settings of an index
    Show {
        /// Index metadata file (YAML or JSON)
        index: PathBuf,

        /// Node settings file (overrides $INDEX_SETTINGS_NODE_CONFIG)
        #[arg(short, long)]
        node: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Apply every change to the index metadata file as a settings update
    Watch {
        /// Index metadata file (YAML or JSON)
        index: PathBuf,

        /// Node settings file (overrides $INDEX_SETTINGS_NODE_CONFIG)
        #[arg(short, long)]
        node: Option<PathBuf>,

        /// Milliseconds to coalesce rapid file changes
        #[arg(long, default_value_t = 500)]
        debounce_ms: u64,
    },
}

/// The typed view of an index's settings as a JSON object.
pub fn settings_report(settings: &IndexSettings) -> Value {
    let scheduler = settings.merge_scheduler();
    let merge_policy = match settings.merge_policy() {
        MergePolicy::NoMerge => json!("none"),
        MergePolicy::Tiered(tiered) => json!({
            "no_cfs_ratio": tiered.no_cfs_ratio,
            "expunge_deletes_allowed": tiered.expunge_deletes_allowed,
            "floor_segment": tiered.floor_segment.to_string(),
            "max_merge_at_once": tiered.max_merge_at_once,
            "max_merge_at_once_explicit": tiered.max_merge_at_once_explicit,
            "max_merged_segment": tiered.max_merged_segment.to_string(),
            "segments_per_tier": tiered.segments_per_tier,
            "reclaim_deletes_weight": tiered.reclaim_deletes_weight,
        }),
    };
    json!({
        "index": settings.index(),
        "uuid": settings.uuid(),
        "version_created": settings.index_version_created().to_string(),
        "number_of_shards": settings.number_of_shards(),
        "number_of_replicas": settings.number_of_replicas(),
        "node_name": settings.node_name(),
        "translog": {
            "durability": settings.translog_durability(),
            "sync_interval": settings.translog_sync_interval().to_string(),
            "flush_threshold_size": settings.flush_threshold_size().to_string(),
        },
        "refresh_interval": settings.refresh_interval().to_string(),
        "gc_deletes": settings.gc_deletes().to_string(),
        "flush_on_close": settings.is_flush_on_close(),
        "shared_filesystem": settings.is_on_shared_filesystem(),
        "merge": {
            "scheduler": {
                "max_thread_count": scheduler.max_thread_count,
                "max_merge_count": scheduler.max_merge_count,
                "auto_throttle": scheduler.auto_throttle,
            },
            "policy": merge_policy,
        },
        "settings": &*settings.settings(),
    })
}

/// Render `show` output as plain text.
pub fn render_text(settings: &IndexSettings) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "index {} (uuid {}, created {})",
        settings.index(),
        settings.uuid(),
        settings.index_version_created()
    );
    let _ = writeln!(out, "  durability:           {}", settings.translog_durability());
    let _ = writeln!(out, "  sync_interval:        {}", settings.translog_sync_interval());
    let _ = writeln!(out, "  refresh_interval:     {}", settings.refresh_interval());
    let _ = writeln!(out, "  flush_threshold_size: {}", settings.flush_threshold_size());
    let _ = writeln!(out, "  gc_deletes:           {}", settings.gc_deletes());
    let scheduler = settings.merge_scheduler();
    let _ = writeln!(
        out,
        "  merge scheduler:      threads={} merges={} auto_throttle={}",
        scheduler.max_thread_count, scheduler.max_merge_count, scheduler.auto_throttle
    );
    let _ = writeln!(out);
    for (key, value) in settings.settings().iter() {
        let _ = writeln!(out, "{key}: {value}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexMetadata;
    use crate::settings::Settings;

    fn open() -> IndexSettings {
        let metadata = IndexMetadata::new(
            "logs",
            Settings::builder()
                .put("index.version.created", 2_000_099)
                .put("index.uuid", "abc")
                .put("index.refresh_interval", "30s")
                .build(),
        );
        IndexSettings::new(metadata, Settings::empty(), []).unwrap()
    }

    #[test]
    fn test_cli_parses_show() {
        let cli = Cli::try_parse_from(["index-settings", "show", "idx.yaml", "--format", "json"])
            .unwrap();
        match cli.command {
            Command::Show { index, node, format } => {
                assert_eq!(index, PathBuf::from("idx.yaml"));
                assert!(node.is_none());
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.log, "2");
    }

    #[test]
    fn test_cli_parses_watch_defaults() {
        let cli = Cli::try_parse_from(["index-settings", "-v", "watch", "idx.yaml"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Watch { debounce_ms, .. } => assert_eq!(debounce_ms, 500),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_report_contains_typed_values() {
        let report = settings_report(&open());
        assert_eq!(report["index"], "logs");
        assert_eq!(report["version_created"], "2.0.0");
        assert_eq!(report["refresh_interval"], "30s");
        assert_eq!(report["translog"]["durability"], "REQUEST");
        assert_eq!(report["settings"]["index.uuid"], "abc");
    }

    #[test]
    fn test_text_lists_raw_settings() {
        let text = render_text(&open());
        assert!(text.starts_with("index logs (uuid abc, created 2.0.0)"));
        assert!(text.contains("index.refresh_interval: 30s"));
    }
}
