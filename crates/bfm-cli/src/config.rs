//! Run configuration loaded from TOML.
//!
//! ```toml
//! s_base = 100000.0
//! v_base = 13.8
//! solver = "clarabel"
//! periods = 1
//! print_output = false
//! conic_form = "branch-flow"
//! connectivity = "branch-list"
//! output_dir = "outputs"
//!
//! [solver_settings]
//! max_iter = 200
//! tol_feas = 1e-8
//! ```

use crate::cli::ModelArgs;
use anyhow::{Context, Result};
use bfm_algo::{ConicForm, ModelOptions, SolverKind, SolverSettings};
use bfm_core::{BfmError, BfmResult, ConnectivityRule};
use bfm_io::{LoadConvention, LoadOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Base apparent power (VA)
    #[serde(default = "default_s_base")]
    pub s_base: f64,
    /// Base voltage (kV)
    #[serde(default = "default_v_base")]
    pub v_base: f64,
    #[serde(default = "default_solver")]
    pub solver: String,
    #[serde(default = "default_periods")]
    pub periods: usize,
    #[serde(default)]
    pub print_output: bool,
    #[serde(default = "default_objective_weight")]
    pub objective_weight: f64,
    #[serde(default)]
    pub conic_form: ConicForm,
    #[serde(default)]
    pub connectivity: ConnectivityRule,
    #[serde(default)]
    pub load_convention: LoadConvention,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// trace, debug, info, warn, error
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub solver_settings: SolverSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            s_base: default_s_base(),
            v_base: default_v_base(),
            solver: default_solver(),
            periods: default_periods(),
            print_output: false,
            objective_weight: default_objective_weight(),
            conic_form: ConicForm::default(),
            connectivity: ConnectivityRule::default(),
            load_convention: LoadConvention::default(),
            output_dir: default_output_dir(),
            log_level: None,
            solver_settings: SolverSettings::default(),
        }
    }
}

fn default_s_base() -> f64 {
    100e3
}

fn default_v_base() -> f64 {
    13.8
}

fn default_solver() -> String {
    "clarabel".to_string()
}

fn default_periods() -> usize {
    1
}

fn default_objective_weight() -> f64 {
    10.0
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

impl RunConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(contents).context("parsing run configuration")?;
        Ok(config)
    }

    /// Read `path`, or return the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("in {}", path.display()))
    }

    /// Apply command-line overrides on top of the file values.
    pub fn apply_overrides(&mut self, args: &ModelArgs) -> BfmResult<()> {
        if let Some(s_base) = args.s_base {
            self.s_base = s_base;
        }
        if let Some(v_base) = args.v_base {
            self.v_base = v_base;
        }
        if let Some(solver) = &args.solver {
            self.solver = solver.clone();
        }
        if let Some(periods) = args.periods {
            self.periods = periods;
        }
        if let Some(form) = &args.conic_form {
            self.conic_form = form.parse()?;
        }
        if let Some(weight) = args.objective_weight {
            self.objective_weight = weight;
        }
        if let Some(rule) = &args.connectivity {
            self.connectivity = rule.parse()?;
        }
        if let Some(convention) = &args.load_convention {
            self.load_convention = convention.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> BfmResult<()> {
        if !self.s_base.is_finite() || self.s_base <= 0.0 {
            return Err(BfmError::Config(format!(
                "s_base must be positive and finite, got {}",
                self.s_base
            )));
        }
        if !self.v_base.is_finite() || self.v_base <= 0.0 {
            return Err(BfmError::Config(format!(
                "v_base must be positive and finite, got {}",
                self.v_base
            )));
        }
        self.solver_kind()?;
        self.model_options().validate()?;
        if let Some(level) = &self.log_level {
            level.parse::<tracing::Level>().map_err(|_| {
                BfmError::Config(format!("unknown log level '{level}'"))
            })?;
        }
        Ok(())
    }

    pub fn solver_kind(&self) -> BfmResult<SolverKind> {
        self.solver.parse()
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            s_base: self.s_base,
            v_base: self.v_base,
            connectivity: self.connectivity,
            load_convention: self.load_convention,
        }
    }

    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            periods: self.periods,
            conic_form: self.conic_form,
            objective_weight: self.objective_weight,
            ..ModelOptions::default()
        }
    }

    pub fn log_level(&self) -> Option<tracing::Level> {
        self.log_level.as_deref().and_then(|l| l.parse().ok())
    }
}
