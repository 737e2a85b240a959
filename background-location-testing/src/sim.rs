use std::path::{Path, PathBuf};

use background_location::{AccuracyTier, ServiceSettings};
use clap::{Parser, ValueEnum};
use location_sim_shared::{SimOutput, parse_script, prelude::*, run_script};
use log::{LevelFilter, info};
use tokio::sync::mpsc;

#[derive(Parser)]
/// Replay a script of method calls and raw fixes against the location service and print what
/// the app layer would receive, one JSON object per line
struct Cli {
    /// Path to the JSON-lines script to replay
    script: PathBuf,

    /// JSON file with service settings (interval_millis, default_accuracy, default_distance_filter)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Accuracy tiers the simulated platform can't provide
    #[arg(long, value_enum)]
    unsupported: Vec<AccuracyTierValue>,

    /// Actually wait out `wait` steps instead of skipping through them
    #[arg(long)]
    realtime: bool,

    /// Log every throttling decision
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum AccuracyTierValue {
    Best,
    NearestTenMeters,
    HundredMeters,
    Reduced,
}

impl From<AccuracyTierValue> for AccuracyTier {
    fn from(value: AccuracyTierValue) -> Self {
        match value {
            AccuracyTierValue::Best => AccuracyTier::Best,
            AccuracyTierValue::NearestTenMeters => AccuracyTier::NearestTenMeters,
            AccuracyTierValue::HundredMeters => AccuracyTier::HundredMeters,
            AccuracyTierValue::Reduced => AccuracyTier::Reduced,
        }
    }
}

async fn read_settings(path: &Path) -> Result<ServiceSettings> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    serde_json::from_str(&raw).context("Failed to parse settings")
}

fn print_output(output: &SimOutput) -> Result {
    let line = serde_json::to_string(output).context("Failed to serialize output")?;
    println!("{line}");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let cli = Cli::parse();

    colog::default_builder()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    if !cli.realtime {
        tokio::time::pause();
    }

    let settings = match &cli.settings {
        Some(path) => read_settings(path).await?,
        None => ServiceSettings::default(),
    };

    let script = tokio::fs::read_to_string(&cli.script)
        .await
        .with_context(|| format!("Failed to read script {}", cli.script.display()))?;
    let steps = parse_script(&script)?;

    info!("Replaying {} steps", steps.len());

    let unsupported = cli.unsupported.into_iter().map(Into::into).collect();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let run = run_script(steps, settings, unsupported, tx);
    tokio::pin!(run);

    let service = loop {
        tokio::select! {
            service = &mut run => break service,
            Some(output) = rx.recv() => print_output(&output)?,
        }
    };

    while let Ok(output) = rx.try_recv() {
        print_output(&output)?;
    }

    if service.is_running().await {
        info!("Script ended with the service still running");
    }

    Ok(())
}
