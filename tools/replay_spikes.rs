// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Spike Replay Tool

Replays a recorded spike trace through the learning engine and prints every
programming command as one JSON object per line.

Usage:
  cargo run --bin replay_spikes -- --config synaplast.toml --trace spikes.csv [--seed-wiring] [--debug-all]

Trace format: `chip,core,neuron,timestamp_us` per line, `WRAP` for a timestamp
overflow, `#` for comments.
*/

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use synaplast::observability::{self, CrateDebugFlags, LoggingConfig};
use synaplast::plasticity::{EngineConfig, LearningEngine, PipelineEvent};
use synaplast::{config, trace};

/// Replay a spike trace through the synaplast learning engine
#[derive(Parser, Debug)]
#[command(name = "replay_spikes", version, author, long_about = None,
          after_help = observability::debug_flags_help())]
struct Args {
    /// Configuration file (default: SYNAPLAST_CONFIG_PATH or ./synaplast.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Spike trace to replay
    #[arg(short, long)]
    trace: PathBuf,

    /// Randomly wire the declared projections before replaying
    #[arg(long, default_value_t = false)]
    seed_wiring: bool,

    /// Events per batch (0 = whole trace in one batch)
    #[arg(long, default_value_t = 0)]
    batch_size: usize,

    /// Write commands here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override a configuration value, e.g. `--set learning_rate=0.5`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

fn is_debug_flag(arg: &str) -> bool {
    arg.starts_with("--debug-")
}

fn parse_overrides(raw: &[String]) -> Result<HashMap<String, String>> {
    raw.iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => Ok((key.trim().to_string(), value.trim().to_string())),
            None => bail!("override '{}' is not KEY=VALUE", entry),
        })
        .collect()
}

fn logging_config(loaded: &config::LoggingConfig) -> LoggingConfig {
    LoggingConfig {
        level: loaded.level.clone(),
        file_logging: loaded.file_logging,
        log_dir: loaded.log_dir.clone(),
        retention_days: loaded.retention_days,
        retention_runs: loaded.retention_runs,
        ..LoggingConfig::default()
    }
}

fn write_commands(engine: &mut LearningEngine, out: &mut impl Write) -> Result<usize> {
    let commands = engine.drain_commands();
    for command in &commands {
        serde_json::to_writer(&mut *out, command)?;
        out.write_all(b"\n")?;
    }
    Ok(commands.len())
}

fn main() -> Result<()> {
    // --debug-* flags are handled by the observability crate, not clap
    let flags: CrateDebugFlags = observability::parse_debug_flags();
    let args = Args::parse_from(std::env::args().filter(|a| !is_debug_flag(a)));
    let overrides = parse_overrides(&args.overrides)?;

    let loaded = config::load_config(args.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")?;

    let logging = logging_config(&loaded.logging);
    #[cfg(feature = "file-logging")]
    let _guard = if logging.file_logging {
        Some(observability::init_logging(&flags, &logging)?)
    } else {
        observability::init_console_logging(&flags, &logging)?;
        None
    };
    #[cfg(not(feature = "file-logging"))]
    observability::init_console_logging(&flags, &logging)?;

    let engine_config = EngineConfig::try_from(&loaded).context("Invalid engine configuration")?;
    let mut engine = LearningEngine::new(engine_config).context("Failed to build learning engine")?;

    let events = trace::read_trace(&args.trace)
        .with_context(|| format!("Failed to read trace {}", args.trace.display()))?;
    let spikes = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::Spike(_)))
        .count();
    tracing::info!(target: "replay",
        "[REPLAY] {} events ({} spikes) from {}",
        events.len(), spikes, args.trace.display()
    );

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut written = 0usize;
    if args.seed_wiring {
        let wired = engine.seed_connectivity()?;
        tracing::info!(target: "replay", "[REPLAY] Initial wiring created {} synapses", wired);
        written += write_commands(&mut engine, &mut out)?;
    }

    let batch_size = if args.batch_size == 0 {
        events.len().max(1)
    } else {
        args.batch_size
    };
    for batch in events.chunks(batch_size) {
        engine.process_batch(batch);
        written += write_commands(&mut engine, &mut out)?;
    }
    out.flush()?;

    let stats = engine.stats();
    tracing::info!(target: "replay",
        "[REPLAY] Done: {} commands, {} synapses in table",
        written,
        engine.table().len()
    );
    eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
