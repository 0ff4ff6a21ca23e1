//! # geox CLI entry point
//!
//! Parses command-line arguments, installs the log subscriber, and
//! dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use geox_cli::evaluate::{run_evaluate, EvaluateArgs};
use geox_cli::lifecycle::{run_lifecycle, LifecycleArgs};
use geox_cli::validate::{run_validate_ruleset, ValidateRulesetArgs};

/// GEOX control plane toolchain.
///
/// Admits rulesets, evaluates them into control verdicts, and computes the
/// problem state governance index.
#[derive(Parser, Debug)]
#[command(name = "geox", version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging. Repeat for more (-v, -vv, -vvv). Ignored when
    /// RUST_LOG is set.
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
    /// Resolve and admit a ruleset file; exit 0 only when APPLIED.
    ValidateRuleset(ValidateRulesetArgs),

    /// Evaluate a ruleset file against an input document.
    Evaluate(EvaluateArgs),

    /// Compute ACTIVE/SUPERSEDED/EXPIRED/FROZEN rows for problem states.
    Lifecycle(LifecycleArgs),
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let result = match &cli.command {
        Commands::ValidateRuleset(args) => run_validate_ruleset(args),
        Commands::Evaluate(args) => run_evaluate(args),
        Commands::Lifecycle(args) => run_lifecycle(args),
    };
    exit_code(result)
}

/// Handler status passes through; an error is logged once and exits 2.
fn exit_code(result: anyhow::Result<u8>) -> ExitCode {
    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
