//! # csc CLI entry point
//!
//! Parses arguments, initializes tracing, and dispatches to subcommand
//! handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use csc_cli::classify::{run_classify, ClassifyArgs};
use csc_cli::validate::{run_validate, ValidateArgs};
use csc_cli::webhook::{run_webhook, WebhookArgs};

/// Controlled substance compliance toolkit.
///
/// Validates transactions against licences, classifications and threshold
/// rules, and signs or verifies webhook payloads.
#[derive(Parser, Debug)]
#[command(name = "csc", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a transaction against a reference bundle.
    Validate(ValidateArgs),

    /// Resolve a substance's classification as of a date.
    Classify(ClassifyArgs),

    /// Sign or verify webhook payloads.
    Webhook(WebhookArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let result = match &cli.command {
        Commands::Validate(args) => run_validate(args),
        Commands::Classify(args) => run_classify(args),
        Commands::Webhook(args) => run_webhook(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
