//! Unified error types for the branch-flow workspace
//!
//! Every library crate reports failures through [`BfmError`]. The variants
//! follow the failure classes of the pipeline:
//!
//! - [`BfmError::Data`]: malformed input tables or a topology that is not a tree
//! - [`BfmError::Config`]: invalid bases, unknown solver names, bad options
//! - [`BfmError::Solve`]: the conic engine stopped without an optimal point
//!
//! # Example
//!
//! ```ignore
//! use bfm_core::{BfmError, BfmResult};
//!
//! fn check_base(s_base: f64) -> BfmResult<()> {
//!     if s_base <= 0.0 {
//!         return Err(BfmError::Config(format!("S_base must be positive, got {s_base}")));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all branch-flow operations.
#[derive(Error, Debug)]
pub enum BfmError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cell or record could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed tables or a network that violates the radial invariant
    #[error("Data error: {0}")]
    Data(String),

    /// Zero or negative bases, unknown solver names, inconsistent options
    #[error("Configuration error: {0}")]
    Config(String),

    /// Solver terminated without an optimal or feasible point
    #[error("Solve error: {0}")]
    Solve(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using BfmError.
pub type BfmResult<T> = Result<T, BfmError>;

impl From<anyhow::Error> for BfmError {
    fn from(err: anyhow::Error) -> Self {
        BfmError::Other(err.to_string())
    }
}

impl From<String> for BfmError {
    fn from(s: String) -> Self {
        BfmError::Other(s)
    }
}

impl From<&str> for BfmError {
    fn from(s: &str) -> Self {
        BfmError::Other(s.to_string())
    }
}
