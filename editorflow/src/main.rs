//! editorflow - editor keystroke aggregation.
//!
//! # Commands
//!
//! - `editorflow replay [FILE]`: Replay a recorded host session and print bus events
//! - `editorflow classify <JSON>`: Classify a single edit delta
//!
//! Logs go to stderr; stdout only carries JSON output.
//!
//! # Environment Variables
//!
//! See the [`config`](editorflow::config) module for available configuration options.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use editorflow::classifier::classify;
use editorflow::config::Config;
use editorflow::replay::{replay, replay_live, ReplayOptions, ReplaySummary};
use editorflow::types::RawEditDelta;

/// editorflow - editor keystroke aggregation.
///
/// Turns raw editor change notifications into per-minute, per-file
/// keystroke statistics.
#[derive(Parser, Debug)]
#[command(name = "editorflow")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    EDITORFLOW_WINDOW_MS          Aggregation window in milliseconds (default: 60000)
    EDITORFLOW_WORKSPACE_FOLDERS  Comma-separated workspace roots
    EDITORFLOW_CHANNEL_CAPACITY   Live service channel capacity (default: 1000)
    RUST_LOG                      Log filter (default: info)

EXAMPLES:
    # Replay a recorded session, printing only finished windows
    editorflow replay session.jsonl --kpm-only

    # Pipe events through the live service
    tail -f events.jsonl | editorflow replay --live

    # Classify one edit
    editorflow classify '{\"rangeStartLine\":0,\"rangeEndLine\":0,\"rangeLength\":0,\"insertedText\":\"a\"}'
")]
struct Cli {
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSON Lines host session.
    ///
    /// Reads one host event per line from FILE (or stdin when FILE is absent
    /// or `-`) and prints every published bus event as one JSON line.
    Replay {
        /// Input file; `-` or absent reads stdin.
        file: Option<PathBuf>,

        /// Only print finished aggregation windows.
        #[arg(long)]
        kpm_only: bool,

        /// Override the aggregation window length in milliseconds.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        window_ms: Option<u64>,

        /// Run through the async service on the system clock, ignoring `ts`.
        #[arg(long)]
        live: bool,
    },

    /// Classify one raw edit delta given as JSON.
    Classify {
        /// A `RawEditDelta` object.
        delta: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match cli.command {
        Command::Replay {
            file,
            kpm_only,
            window_ms,
            live,
        } => run_replay(file.as_deref(), kpm_only, window_ms, live),
        Command::Classify { delta } => run_classify(&delta),
    }
}

fn run_replay(
    file: Option<&Path>,
    kpm_only: bool,
    window_ms: Option<u64>,
    live: bool,
) -> Result<()> {
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(ms) = window_ms {
        config = config.with_window_duration(Duration::from_millis(ms));
    }
    let options = ReplayOptions { config, kpm_only };
    let file = file.filter(|path| *path != Path::new("-"));

    debug!(file = ?file, live, "Starting replay");

    let summary: ReplaySummary = if live {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;
        runtime.block_on(async {
            match file {
                Some(path) => {
                    let input = tokio::fs::File::open(path)
                        .await
                        .with_context(|| format!("Failed to open {}", path.display()))?;
                    replay_live(tokio::io::BufReader::new(input), io::stdout(), &options)
                        .await
                        .context("Live replay failed")
                }
                None => replay_live(
                    tokio::io::BufReader::new(tokio::io::stdin()),
                    io::stdout(),
                    &options,
                )
                .await
                .context("Live replay failed"),
            }
        })?
    } else {
        match file {
            Some(path) => {
                let input = File::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                replay(BufReader::new(input), io::stdout().lock(), &options)
                    .context("Replay failed")?
            }
            None => replay(io::stdin().lock(), io::stdout().lock(), &options)
                .context("Replay failed")?,
        }
    };

    if summary.skipped > 0 {
        eprintln!("Skipped {} malformed line(s)", summary.skipped);
    }
    Ok(())
}

fn run_classify(delta: &str) -> Result<()> {
    let delta: RawEditDelta =
        serde_json::from_str(delta).context("Failed to parse edit delta JSON")?;
    let classification = classify(&delta);

    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &classification)
        .context("Failed to write classification")?;
    writeln!(stdout)?;
    Ok(())
}

/// Initializes the logging subsystem on stderr.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
