use std::path::PathBuf;

use thiserror::Error;

use geox_control::{KernelError, VerdictContractError};

/// Failures that escape the harness. `MISSING` and `INVALID` rulesets are
/// not among them; those become `UNDETERMINED` verdicts.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The ruleset file exists but could not be read.
    #[error("failed to read ruleset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The kernel refused to evaluate an admitted ruleset.
    #[error("kernel refused evaluation: {0}")]
    Kernel(#[from] KernelError),

    /// The assembled verdict broke the verdict contract.
    #[error("verdict contract violated: {0}")]
    Contract(#[from] VerdictContractError),
}
