//! Non-fatal issues collected while loading and normalizing network data.
//!
//! Missing load cells, buses absent from the bus table and branch records
//! listed downstream-to-upstream do not stop a run, but they are recorded
//! here so a caller can audit what was defaulted.
//!
//! # Example
//!
//! ```
//! use bfm_core::diagnostics::{Diagnostics, DEFAULTED_CELL};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_at_line(DEFAULTED_CELL, "p is empty, using 0", 3);
//! diag.add_warning_with_entity("topology", "re-oriented to 1-4", "Branch 4-1");
//!
//! assert_eq!(diag.count_in(DEFAULTED_CELL), 1);
//! assert_eq!(diag.summary(), "2 warning(s), 1 defaulted cell(s)");
//! ```

use serde::Serialize;

/// Category used for NaN / empty cells replaced by zero.
pub const DEFAULTED_CELL: &str = "defaulted";
/// Category used for buses that carry no row in the bus table.
pub const MISSING_BUS: &str = "missing-bus";
/// Category used for re-oriented or otherwise suspicious branch records.
pub const TOPOLOGY: &str = "topology";

/// A single warning. Anything fatal is a [`BfmError`](crate::BfmError) instead.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    /// Category for grouping (e.g., "defaulted", "topology")
    pub category: String,
    pub message: String,
    /// 1-based data row for table-driven issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Optional entity reference (e.g., "Bus 14", "Branch 1-2")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
            line: None,
            entity: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[warning:{}] {}", self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for one load / build pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning_at_line(&mut self, category: &str, message: &str, line: usize) {
        self.issues
            .push(DiagnosticIssue::new(category, message).with_line(line));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(category, message).with_entity(entity));
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len()
    }

    /// Number of issues filed under `category`.
    pub fn count_in(&self, category: &str) -> usize {
        self.issues.iter().filter(|i| i.category == category).count()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Append all issues from another pass
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn summary(&self) -> String {
        format!(
            "{} warning(s), {} defaulted cell(s)",
            self.warning_count(),
            self.count_in(DEFAULTED_CELL)
        )
    }
}
