use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep_until, Duration, Instant};

use jolt_recorder_rs::export::{self, drain_log, open_log_writer};
use jolt_recorder_rs::sensors::{self, SensorEvent, SourceOptions};
use jolt_recorder_rs::status::current_timestamp_ms;
use jolt_recorder_rs::{apply_event, ChannelSink, LogSink, RecorderConfig, RecordingSession};

#[derive(Parser, Debug)]
#[command(name = "jolt_recorder")]
#[command(about = "Sensor flight recorder - dumps the last seconds of motion data on hard jolts", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Output directory
    #[arg(long, default_value = "jolt_recorder_sessions")]
    output_dir: PathBuf,

    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Flight recorder window in milliseconds
    #[arg(long)]
    window_ms: Option<i64>,

    /// Jolt threshold in m/s^2 (gravity included)
    #[arg(long)]
    jolt_threshold: Option<f64>,

    /// Minimum milliseconds between jolt dumps
    #[arg(long)]
    jolt_cooldown_ms: Option<i64>,

    /// Motion/orientation sampling period in milliseconds
    #[arg(long, default_value = "20")]
    sample_period_ms: u64,

    /// Never call termux-sensor, always synthesize data
    #[arg(long)]
    synthetic: bool,

    /// Inject a synthetic spike every N motion samples (0 = never)
    #[arg(long, default_value = "0")]
    spike_every: u64,

    /// Gzip the log file
    #[arg(long)]
    gzip: bool,

    /// Also write raw events as JSON lines for the replay tool
    #[arg(long)]
    record_events: bool,
}

enum Command {
    Mark,
    Status,
    Log,
    Quit,
}

fn load_config(args: &Args) -> Result<RecorderConfig> {
    let mut config = match &args.config {
        Some(path) => RecorderConfig::from_json_file(path)?,
        None => RecorderConfig::default(),
    };
    if let Some(window_ms) = args.window_ms {
        config.window_ms = window_ms;
    }
    if let Some(threshold) = args.jolt_threshold {
        config.jolt_threshold = threshold;
    }
    if let Some(cooldown) = args.jolt_cooldown_ms {
        config.jolt_cooldown_ms = cooldown;
    }
    config.validate()?;
    Ok(config)
}

/// Blocking stdin reader on its own thread so it never holds up runtime shutdown.
fn spawn_stdin_commands(tx: mpsc::Sender<Command>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let command = match line.trim() {
                "m" | "mark" => Command::Mark,
                "s" | "status" => Command::Status,
                "l" | "log" => Command::Log,
                "q" | "quit" => Command::Quit,
                "" => continue,
                other => {
                    log::warn!("Unknown command '{}' (m = mark, s = status, l = log, q = quit)", other);
                    continue;
                }
            };
            if tx.blocking_send(command).is_err() {
                break;
            }
        }
    });
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = load_config(&args)?;

    log::info!("Jolt Recorder starting");
    log::info!("  Duration: {} seconds (0=continuous)", args.duration);
    log::info!("  Window: {}ms", config.window_ms);
    log::info!(
        "  Jolt: > {:.1} m/s², cooldown {}ms",
        config.jolt_threshold,
        config.jolt_cooldown_ms
    );
    log::info!("  Output Dir: {}", args.output_dir.display());

    std::fs::create_dir_all(&args.output_dir)?;

    // Log writer thread
    let started = Utc::now();
    let log_path = args
        .output_dir
        .join(export::log_file_name(started, args.gzip));
    let (log_tx, log_rx) = crossbeam::channel::unbounded();
    let writer = open_log_writer(&log_path, args.gzip)?;
    let writer_handle = std::thread::spawn(move || drain_log(log_rx, writer));

    let mut event_file = if args.record_events {
        let path = args.output_dir.join(format!(
            "events_{}.jsonl",
            started.format("%Y%m%d_%H%M%S")
        ));
        log::info!("Recording raw events to {}", path.display());
        Some(BufWriter::new(File::create(path)?))
    } else {
        None
    };

    let tail_lines = config.log_tail_lines;
    let mut session = RecordingSession::new(config, ChannelSink::new(log_tx, tail_lines))?;

    if !args.synthetic {
        for check in sensors::system_check() {
            let level = if check.available {
                log::Level::Info
            } else {
                log::Level::Warn
            };
            session.sink_mut().append_line(level, &check.describe());
        }
    }

    // Sensor tasks feed the main loop, which alone owns the session
    let (event_tx, mut event_rx) = mpsc::channel::<SensorEvent>(500);
    let options = SourceOptions {
        synthetic_only: args.synthetic,
        spike_every: args.spike_every,
    };
    let period = Duration::from_millis(args.sample_period_ms.max(1));
    let _motion_handle = tokio::spawn(sensors::motion_loop(event_tx.clone(), period, options));
    let _orientation_handle =
        tokio::spawn(sensors::orientation_loop(event_tx.clone(), period, options));
    let _position_handle = tokio::spawn(sensors::position_loop(
        event_tx.clone(),
        Duration::from_secs(5),
        options,
    ));
    drop(event_tx);

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(8);
    spawn_stdin_commands(cmd_tx);

    session.start(current_timestamp_ms())?;
    log::info!(
        "Recording to {} (m = mark incident, s = status, l = log, q = quit)",
        log_path.display()
    );

    let deadline = (args.duration > 0).then(|| Instant::now() + Duration::from_secs(args.duration));
    let status_path = args.output_dir.join("live_status.json");
    let mut status_tick = interval(Duration::from_secs(2));

    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else {
                    log::warn!("All sensor loops ended");
                    break;
                };
                if let Some(out) = event_file.as_mut() {
                    serde_json::to_writer(&mut *out, &event)?;
                    out.write_all(b"\n")?;
                }
                if let Some(jolt) = apply_event(&mut session, &event) {
                    println!("Jolt detected: {:.1} m/s², flight recorder dumped", jolt.magnitude);
                }
            }
            Some(command) = cmd_rx.recv() => match command {
                Command::Mark => {
                    let summary = session.mark_incident(current_timestamp_ms())?;
                    println!("Incident marked, {} samples dumped", summary.samples);
                }
                Command::Status => {
                    println!("{}", session.status(current_timestamp_ms()).summary());
                }
                Command::Log => {
                    println!("{}", session.sink().tail());
                }
                Command::Quit => {
                    log::info!("Stop requested");
                    break;
                }
            },
            _ = status_tick.tick() => {
                let now = current_timestamp_ms();
                session.check_sensors(now);
                if let Err(e) = session.status(now).save(&status_path) {
                    log::warn!("Failed to write {}: {}", status_path.display(), e);
                }
            }
            _ = wait_for_deadline(deadline) => {
                log::info!("Duration reached, stopping...");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping...");
                break;
            }
        }
    }

    // Final save
    let now = current_timestamp_ms();
    let final_status = session.status(now);
    session.stop(now)?;
    final_status.save(args.output_dir.join("status_final.json"))?;

    if let Some(mut out) = event_file {
        out.flush()?;
    }

    let sink = session.into_sink();
    let dropped = sink.dropped();
    drop(sink);
    let lines = writer_handle
        .join()
        .map_err(|_| anyhow!("log writer thread panicked"))??;

    println!("\n=== Final Stats ===");
    println!("{}", final_status.summary());
    println!(
        "Motion samples: {}, orientation samples: {}, skipped: {}",
        final_status.stats.motion_samples,
        final_status.stats.orientation_samples,
        final_status.stats.skipped_samples
    );
    println!("Log: {} lines written to {}", lines, log_path.display());
    if dropped > 0 {
        println!("Warning: {} log lines were not persisted", dropped);
    }

    Ok(())
}
