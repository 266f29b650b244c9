//! rcexpand CLI - expand #include / #define templates to stdout

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use rcexpand::{FixSuggestion, FsLoader, PreprocError, Preprocessor};

#[derive(Parser)]
#[command(name = "rcexpand")]
#[command(about = "Expand #include and #define directives in config templates")]
#[command(version)]
struct Cli {
    /// Root template file
    file: String,

    /// Print the resolved definitions instead of the document (exits with status 1)
    #[arg(long)]
    debug: bool,

    /// Format of the --debug dump
    #[arg(long, value_enum, default_value_t = DumpFormat::Text)]
    format: DumpFormat,

    /// Resolve file names relative to this directory
    #[arg(short = 'C', long)]
    directory: Option<PathBuf>,

    /// Log pipeline steps to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DumpFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            report(&anyhow::Error::new(usage_error(&e)));
            return ExitCode::FAILURE;
        }
        Err(e) => {
            // --help / --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
    };

    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(status) => status,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "rcexpand=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let loader = match &cli.directory {
        Some(dir) => FsLoader::with_base_dir(dir),
        None => FsLoader::new(),
    };
    let expansion = Preprocessor::new(loader).expand_file(&cli.file)?;

    if cli.debug {
        let dump = match cli.format {
            DumpFormat::Text => expansion.table.render_aligned(),
            DumpFormat::Json => {
                let mut json = expansion
                    .table
                    .to_json()
                    .context("Failed to serialize definitions")?;
                json.push('\n');
                json
            }
        };
        write_stdout(&dump)?;
        // The dump replaces the document and always reports failure
        return Ok(ExitCode::FAILURE);
    }

    write_stdout(&expansion.text)?;
    Ok(ExitCode::SUCCESS)
}

fn write_stdout(text: &str) -> Result<(), PreprocError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn usage_error(err: &clap::Error) -> PreprocError {
    let rendered = err.render().to_string();
    // First paragraph only; the usage block follows a blank line
    let message = rendered
        .lines()
        .take_while(|line| !line.trim().is_empty())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
        .trim_start_matches("error: ")
        .to_string();
    PreprocError::Usage { message }
}

fn report(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);
    if let Some(suggestion) = err
        .downcast_ref::<PreprocError>()
        .and_then(|e| e.fix_suggestion())
    {
        eprintln!("  {} {}", "Fix:".yellow(), suggestion);
    }
}
