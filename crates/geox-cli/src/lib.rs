//! # geox-cli — GEOX Control Plane Command-Line Interface
//!
//! ## Subcommands
//!
//! - `validate-ruleset`: resolve and admit one ruleset file
//! - `evaluate`: evaluate a ruleset file against a JSON input document
//! - `lifecycle`: compute the problem state governance index
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from handlers; handlers delegate to the
//!   domain crates.
//! - Command output is JSON on stdout. Logs go to stderr.

pub mod evaluate;
pub mod lifecycle;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use geox_control::Constitution;

/// The v0 constitution, or the YAML tables at `path` when given.
pub fn load_constitution(path: Option<&Path>) -> Result<Constitution> {
    let Some(path) = path else {
        return Ok(Constitution::v0());
    };
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("reading constitution: {}", path.display()))?;
    let constitution = Constitution::from_yaml_str(&yaml)
        .with_context(|| format!("parsing constitution: {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded constitution tables");
    Ok(constitution)
}

/// Read and parse a JSON document.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {what}: {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {what}: {}", path.display()))
}

pub(crate) fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{out}");
    Ok(())
}
