//! # validate-ruleset Subcommand
//!
//! Prints `{"status", "ruleset_ref", "error_code"?}` for one ruleset file.
//! Exit code 0 only for `APPLIED`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use geox_control::RulesetStatus;
use geox_harness::{load_ruleset, LoadSummary};

#[derive(Args, Debug)]
pub struct ValidateRulesetArgs {
    /// Ruleset JSON file.
    pub file: PathBuf,

    /// YAML constitution tables replacing the v0 taxonomy and input paths.
    #[arg(long)]
    pub constitution: Option<PathBuf>,
}

pub fn validate_ruleset(args: &ValidateRulesetArgs) -> Result<LoadSummary> {
    let constitution = crate::load_constitution(args.constitution.as_deref())?;
    Ok(load_ruleset(&args.file, &constitution)?.summary())
}

pub fn run_validate_ruleset(args: &ValidateRulesetArgs) -> Result<u8> {
    let summary = validate_ruleset(args)?;
    crate::print_json(&summary)?;
    Ok(match summary.status {
        RulesetStatus::Applied => 0,
        RulesetStatus::Missing | RulesetStatus::Invalid => 1,
    })
}
