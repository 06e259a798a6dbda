//! Conic engine selection.
//!
//! [`SolverKind`] is the user-facing name of an engine; [`SolverRegistry`]
//! maps engine ids to backend instances.

use super::backends::{ClarabelBackend, ConicBackend};
use bfm_core::BfmError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Clarabel,
}

const AVAILABLE_SOLVERS: &[&str] = &["clarabel"];

impl SolverKind {
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_SOLVERS
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Clarabel => "clarabel",
        }
    }

    pub fn build_backend(&self) -> Arc<dyn ConicBackend> {
        match self {
            SolverKind::Clarabel => Arc::new(ClarabelBackend),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolverKind {
    type Err = BfmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "clarabel" | "socp" | "default" => Ok(SolverKind::Clarabel),
            _ => Err(BfmError::Config(format!(
                "unknown solver '{}'; supported values: {}",
                value,
                SolverKind::available().join(", ")
            ))),
        }
    }
}

/// Backends by id.
#[derive(Default)]
pub struct SolverRegistry {
    backends: HashMap<String, Arc<dyn ConicBackend>>,
}

impl SolverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in backend.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_backend(SolverKind::Clarabel.build_backend());
        registry
    }

    pub fn register_backend(&mut self, backend: Arc<dyn ConicBackend>) {
        self.backends.insert(backend.id().to_string(), backend);
    }

    pub fn get_backend(&self, id: &str) -> Option<Arc<dyn ConicBackend>> {
        self.backends.get(id).cloned()
    }

    /// Ids of registered backends that are usable right now, sorted.
    pub fn list_backends(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .backends
            .iter()
            .filter(|(_, b)| b.is_available())
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Look up the backend for `kind`, failing if it is missing or unavailable.
    pub fn resolve(&self, kind: SolverKind) -> Result<Arc<dyn ConicBackend>, BfmError> {
        match self.backends.get(kind.as_str()) {
            Some(backend) if backend.is_available() => Ok(backend.clone()),
            Some(_) => Err(BfmError::Solve(format!(
                "solver '{kind}' is registered but not available"
            ))),
            None => Err(BfmError::Config(format!(
                "solver '{kind}' is not registered; registered: {}",
                self.list_backends().join(", ")
            ))),
        }
    }
}
