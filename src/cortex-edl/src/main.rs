//! Cortex EDL - command-line runner.
//!
//! Runs one script against a directory tree and prints the report. The
//! registers file, when given, is read before the run and rewritten after,
//! so `_saved_N` text from a failed run can be replayed by the next one.

use anyhow::{Context, Result};
use clap::Parser;
use cortex_edl::{EdlError, LocalFileIo, Registers, RunOptions, run_script_with_options};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "cortex-edl", version, about = "Run an EDL edit script")]
struct Cli {
    /// Script file, or `-` to read it from stdin.
    script: String,

    /// Directory that script paths are relative to.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// JSON file holding registers between runs.
    #[arg(long)]
    registers: Option<PathBuf>,

    /// TOML file with run options.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compute the edits without writing any file.
    #[arg(long)]
    dry_run: bool,

    /// Print the outcome as JSON.
    #[arg(long)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::new("cortex_edl=debug")
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let script = read_script(&cli.script)?;

    let mut options = match &cli.config {
        Some(path) => RunOptions::load(path)?,
        None => RunOptions::default(),
    };
    options.dry_run |= cli.dry_run;

    let registers = match &cli.registers {
        Some(path) => load_registers(path)?,
        None => None,
    };

    let io = LocalFileIo::new(&cli.root);
    let outcome = match run_script_with_options(&script, &io, registers, options).await {
        Ok(outcome) => outcome,
        Err(EdlError::Aborted {
            line,
            message,
            trace,
        }) => {
            eprintln!("Script aborted at line {line}: {message}");
            for entry in trace {
                eprintln!("  {:>4}: {}  -> {}", entry.line, entry.command, entry.snippet);
            }
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if cli.json {
        println!("{}", outcome.to_json()?);
    } else {
        print!("{}", outcome.format_report());
    }

    if let Some(path) = &cli.registers {
        save_registers(path, &outcome.registers)?;
        info!(path = %path.display(), count = outcome.registers.len(), "Saved registers");
    }

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn read_script(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut script = String::new();
        std::io::stdin()
            .read_to_string(&mut script)
            .context("Failed to read script from stdin")?;
        return Ok(script);
    }
    std::fs::read_to_string(arg).with_context(|| format!("Failed to read script {arg}"))
}

fn load_registers(path: &Path) -> Result<Option<Registers>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read registers file {}", path.display()))?;
    let registers = serde_json::from_str(&content)
        .with_context(|| format!("Invalid registers file {}", path.display()))?;
    Ok(Some(registers))
}

fn save_registers(path: &Path, registers: &Registers) -> Result<()> {
    let json = serde_json::to_string_pretty(registers)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write registers file {}", path.display()))
}
