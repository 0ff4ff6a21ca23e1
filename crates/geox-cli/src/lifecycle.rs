//! # lifecycle Subcommand
//!
//! Reads `{problem_states, asOfTs, constants, frozen_ids?}` and prints the
//! index rows.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use geox_lifecycle::{compute_index, ComputeIndexInput, IndexRow};

#[derive(Args, Debug)]
pub struct LifecycleArgs {
    /// Lifecycle input JSON file.
    #[arg(long)]
    pub input: PathBuf,
}

pub fn lifecycle_rows(args: &LifecycleArgs) -> Result<Vec<IndexRow>> {
    let input: ComputeIndexInput = crate::read_json(&args.input, "lifecycle input")?;
    compute_index(&input).context("computing problem state index")
}

pub fn run_lifecycle(args: &LifecycleArgs) -> Result<u8> {
    let rows = lifecycle_rows(args)?;
    crate::print_json(&rows)?;
    Ok(0)
}
