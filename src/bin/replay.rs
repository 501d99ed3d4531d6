use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use jolt_recorder_rs::replay::{load_events, replay};
use jolt_recorder_rs::RecorderConfig;

#[derive(Parser, Debug)]
#[command(about = "Replay recorded sensor events through a fresh flight recorder session")]
struct Args {
    /// Path to events_*.jsonl[.gz]
    #[arg(long)]
    events: PathBuf,

    /// JSON config file (defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Manual incident marker timestamp in ms (repeatable)
    #[arg(long = "mark-at")]
    mark_at: Vec<i64>,

    /// Override the jolt threshold in m/s^2
    #[arg(long)]
    jolt_threshold: Option<f64>,

    /// Print a JSON export instead of the plain log
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RecorderConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RecorderConfig::default(),
    };
    if let Some(threshold) = args.jolt_threshold {
        config.jolt_threshold = threshold;
    }

    let events = load_events(&args.events)
        .with_context(|| format!("reading events from {}", args.events.display()))?;
    let export = replay(config, &events, &args.mark_at)?;

    if args.json {
        println!("{}", export.to_json()?);
    } else {
        for line in &export.log {
            println!("{}", line);
        }
        eprintln!(
            "[replay] {} events, {} jolts, {} dumps",
            events.len(),
            export.status.stats.jolts_detected,
            export.status.stats.dumps_written
        );
    }

    Ok(())
}
