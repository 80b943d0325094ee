//! Console runner: loads a compiled module from disk, runs it, and prints
//! the final report.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bfrun_core::{RunConfig, RunReport};
use bfrun_host::{HostBridge, InputCursor, OutputSink, Runtime, RuntimeConfig};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Compiled WASM module to run
    module: PathBuf,

    /// Exported entry point to invoke
    #[arg(short, long, default_value = "main")]
    entry: String,

    /// Input string served to the guest, one byte per read
    #[arg(short, long, default_value = "")]
    input: String,

    /// Abort the guest call after this many milliseconds. Without it a
    /// non-terminating guest blocks forever.
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Print the final report as a single JSON object instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = RunConfig {
        entry_point: cli.entry.clone(),
        input: cli.input.clone().into_bytes(),
        deadline_ms: cli.deadline_ms,
        ..RunConfig::default()
    };

    let wasm_bytes = fs::read(&cli.module)
        .with_context(|| format!("failed to read module {}", cli.module.display()))?;
    info!(
        module = %cli.module.display(),
        entry = %config.entry_point,
        "loaded module artifact"
    );

    let runtime = Runtime::new(RuntimeConfig {
        initial_pages: config.initial_pages,
        deadline: config.deadline_ms.map(Duration::from_millis),
    })?;

    // In text mode guest output streams to stdout as it is emitted; in JSON
    // mode it is buffered and included in the report instead.
    let sink = if cli.json {
        OutputSink::buffered()
    } else {
        OutputSink::with_echo(Box::new(std::io::stdout()))
    };
    let bridge = HostBridge::new(InputCursor::new(config.input.clone()), sink);

    let mut instance = runtime.instantiate(&wasm_bytes, bridge)?;

    if !cli.json {
        println!("BF module begin");
        println!("Input: {}", cli.input);
    }

    let result = instance.run(&config.entry_point)?;
    let report = RunReport::new(result, instance.output(), &instance.memory_prefix());

    if cli.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        // Guest output already reached stdout through the sink's echo.
        println!("BF module finished");
        println!("Pointer: {}", report.value);
        println!("Memory slice: {}", format_slice(&report.memory_prefix));
    }

    Ok(())
}

fn format_slice(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
