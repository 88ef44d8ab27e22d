//! Segment destination replay tool.
//!
//! Reads Segment messages from a file or stdin, runs each one through the
//! destination handlers and publishes to the collector.

mod replay;

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use destination_core::{AppConfig, Settings};
use destination_segment::{DryRunPublisher, EventDispatcher, HttpPublisher};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "segment-destination")]
#[command(about = "Replay Segment events into an experimentation collector")]
#[command(version)]
struct Cli {
    /// Destination settings JSON file (overrides config)
    #[arg(long, env = "SEGMENT_DESTINATION__SETTINGS_PATH")]
    settings: Option<PathBuf>,

    /// Events file; reads stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Log payloads instead of publishing them
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Records go to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "segment_destination=info,destination_segment=info".into()),
        )
        .json()
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(path) = cli.settings {
        config.settings_path = path;
    }
    config.dry_run |= cli.dry_run;

    let mut settings = Settings::from_file(&config.settings_path).with_context(|| {
        format!("reading settings from {}", config.settings_path.display())
    })?;
    settings.apply_overrides(&config);
    settings.validate()?;

    info!(
        collector = %settings.context_url(),
        environment = %settings.environment,
        dry_run = config.dry_run,
        "Configuration loaded"
    );

    let reader: Box<dyn Read> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let events = replay::read_events(reader).context("parsing input events")?;
    info!(events = events.len(), "Replaying events");

    let stdout = io::stdout().lock();
    let summary = if config.dry_run {
        let dispatcher = EventDispatcher::new(DryRunPublisher);
        replay::run(&dispatcher, &settings, events, stdout).await?
    } else {
        let dispatcher = EventDispatcher::new(HttpPublisher::new());
        replay::run(&dispatcher, &settings, events, stdout).await?
    };

    info!(
        published = summary.published,
        skipped = summary.skipped,
        failed = summary.failed,
        "Replay finished"
    );

    if summary.failed > 0 {
        anyhow::bail!("{} event(s) failed", summary.failed);
    }
    Ok(())
}
