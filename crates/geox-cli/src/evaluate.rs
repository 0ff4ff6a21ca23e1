//! # evaluate Subcommand
//!
//! Evaluates one ruleset file against an input document shaped like
//! `{subjectRef, window, action_code, problemState, uncertaintyEnvelope,
//! permissionSet}` and prints `{verdict, ruleset_status}`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use geox_harness::{evaluate, EvaluateInput, EvaluateResult};

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Ruleset JSON file.
    #[arg(long)]
    pub ruleset: PathBuf,

    /// Evaluation input JSON file.
    #[arg(long)]
    pub input: PathBuf,

    /// YAML constitution tables replacing the v0 taxonomy and input paths.
    #[arg(long)]
    pub constitution: Option<PathBuf>,
}

pub fn evaluate_file(args: &EvaluateArgs) -> Result<EvaluateResult> {
    let constitution = crate::load_constitution(args.constitution.as_deref())?;
    let input: EvaluateInput = crate::read_json(&args.input, "evaluation input")?;
    evaluate(&args.ruleset, &input, &constitution)
        .with_context(|| format!("evaluating ruleset: {}", args.ruleset.display()))
}

pub fn run_evaluate(args: &EvaluateArgs) -> Result<u8> {
    let result = evaluate_file(args)?;
    crate::print_json(&result)?;
    Ok(0)
}
