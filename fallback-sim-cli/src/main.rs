// Fallback Sim - Command-line runner
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # fallback-sim
//!
//! Generates a simulated sensor run, classifies every sample and logs the
//! fallback events to SQLite.
//!
//! ## Usage
//!
//! ```bash
//! # 72 h at 5 min, events to fallback_events.db, samples to CSV
//! fallback-sim --seed 42
//!
//! # Longer run that reaches the dry-out window, fresh event table
//! fallback-sim --hours 96 --fresh --db events.db
//!
//! # Re-log an existing sample file
//! fallback-sim --replay simulated_sensor_data.csv --db events.db
//! ```

use clap::Parser;
use fallback_sim::{
    parse_start_time, Classifier, EventLogger, EventStore, FallbackError, MemoryStore, Pipeline,
    RunSummary, SampleReader, SampleWriter, SignalGenerator, SimulationConfig, SqliteStore,
};
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Environmental sensor fallback simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file (flags below override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated duration in hours
    #[arg(long)]
    hours: Option<f64>,

    /// Sampling interval in minutes
    #[arg(short, long)]
    interval: Option<u32>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// First timestamp (YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    start: Option<String>,

    /// Probability of a missing moisture reading
    #[arg(long)]
    dropout: Option<f64>,

    /// SQLite file for fallback events
    #[arg(long)]
    db: Option<PathBuf>,

    /// Keep events in memory only
    #[arg(long, conflicts_with = "db")]
    no_db: bool,

    /// CSV file for generated samples
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Do not write generated samples
    #[arg(long, conflicts_with = "csv")]
    no_csv: bool,

    /// Classify and log an existing CSV file instead of generating
    #[arg(long, conflicts_with_all = ["hours", "interval", "seed", "start", "dropout"])]
    replay: Option<PathBuf>,

    /// Empty the event table before logging
    #[arg(long)]
    fresh: bool,

    /// Generator threads
    #[arg(short, long, default_value = "1")]
    threads: usize,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("fallback-sim v{}", env!("CARGO_PKG_VERSION"));

    match run(&args) {
        Ok(summary) => {
            if args.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => warn!("Cannot render summary: {}", e),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Merge the configuration file (if any) with command-line overrides.
fn build_config(args: &Args) -> Result<SimulationConfig, FallbackError> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };

    let generator = &mut config.generator;
    if let Some(hours) = args.hours {
        generator.duration_hours = hours;
    }
    if let Some(interval) = args.interval {
        generator.interval_minutes = interval;
    }
    if let Some(seed) = args.seed {
        generator.seed = Some(seed);
    }
    if let Some(start) = &args.start {
        generator.start_time = parse_start_time(start)?;
    }
    if let Some(dropout) = args.dropout {
        generator.moisture_dropout_probability = dropout;
    }

    if args.no_db {
        config.database_path = None;
    } else if let Some(db) = &args.db {
        config.database_path = Some(db.clone());
    }
    if args.no_csv || args.replay.is_some() {
        config.csv_path = None;
    } else if let Some(csv) = &args.csv {
        config.csv_path = Some(csv.clone());
    }
    if args.fresh {
        config.truncate_before_run = true;
    }

    Ok(config)
}

fn run(args: &Args) -> Result<RunSummary, FallbackError> {
    let config = build_config(args)?;
    if args.replay.is_none() {
        config.validate()?;
    }

    match &config.database_path {
        Some(path) => {
            info!("Logging fallback events to {}", path.display());
            execute(SqliteStore::open(path)?, &config, args)
        }
        None => {
            info!("Logging fallback events in memory");
            execute(MemoryStore::new(), &config, args)
        }
    }
}

/// Where samples come from.
enum Source {
    Generate {
        generator: SignalGenerator,
        csv: Option<(PathBuf, SampleWriter<File>)>,
    },
    Replay(PathBuf, SampleReader<File>),
}

/// Open every input and output file before any event is truncated.
fn open_source(config: &SimulationConfig, args: &Args) -> Result<Source, FallbackError> {
    if let Some(path) = &args.replay {
        let reader = SampleReader::open(path)?;
        return Ok(Source::Replay(path.clone(), reader));
    }

    let generator = SignalGenerator::new(config.generator.clone())?;
    let csv = match &config.csv_path {
        Some(path) => Some((path.clone(), SampleWriter::create(path)?)),
        None => None,
    };
    Ok(Source::Generate { generator, csv })
}

fn execute<S: EventStore>(
    store: S,
    config: &SimulationConfig,
    args: &Args,
) -> Result<RunSummary, FallbackError> {
    let source = open_source(config, args)?;

    let mut logger = EventLogger::new(store)?;
    if config.truncate_before_run {
        logger.truncate()?;
    }
    let mut pipeline = Pipeline::new(Classifier::with_config(config.classifier.clone()), logger);
    let threads = args.threads.max(1);

    let summary = match source {
        Source::Replay(path, reader) => {
            info!("Replaying {}", path.display());
            pipeline.replay(reader)?
        }
        Source::Generate { generator, csv } => {
            info!(
                "Generating {} samples (seed {}, {} thread(s))",
                generator.sample_count(),
                generator.seed(),
                threads
            );

            match csv {
                Some((path, mut writer)) => {
                    let summary = if threads > 1 {
                        pipeline.run_parallel_with_csv(&generator, threads, &mut writer)?
                    } else {
                        pipeline.run_with_csv(&generator, &mut writer)?
                    };
                    let rows = writer.finish()?;
                    info!("Wrote {} samples to {}", rows, path.display());
                    summary
                }
                None if threads > 1 => pipeline.run_parallel(&generator, threads)?,
                None => pipeline.run(&generator)?,
            }
        }
    };

    for warning in &summary.skipped {
        warn!("Skipped {}", warning);
    }

    let logger = pipeline.into_logger();
    let report = logger.audit()?;
    info!(
        "{} samples, {} flagged, {} events logged, {} rows audited",
        summary.samples, summary.flagged, summary.inserted, report.checked
    );
    if !report.is_intact() {
        warn!("Checksum mismatch on rows {:?}", report.corrupted);
    }
    logger.close()?;

    Ok(summary)
}
