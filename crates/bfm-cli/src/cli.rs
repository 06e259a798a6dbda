use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bfm", author, version, about = "Branch-flow SOCP for radial distribution feeders", long_about = None)]
pub struct Cli {
    /// Set the logging level (overrides `log_level` in the config file; default: info)
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build, solve and export the branch-flow model
    Run {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        model: ModelArgs,
        /// Print the per-period physical tables to stdout
        #[arg(long)]
        print_output: bool,
        /// Directory for resolution.txt and output.json
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: Option<PathBuf>,
    },
    /// Load the tables and check the radial topology without solving
    Validate {
        #[command(flatten)]
        input: InputArgs,
        /// Base apparent power in VA
        #[arg(long)]
        s_base: Option<f64>,
        /// Base voltage in kV
        #[arg(long)]
        v_base: Option<f64>,
        /// Connectivity rule: branch-list or nonzero-resistance
        #[arg(long)]
        connectivity: Option<String>,
        /// Also print the Cx, R and X matrices in bus order
        #[arg(long)]
        matrices: bool,
    },
    /// Build the model and write its human-readable dump without solving
    Dump {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        model: ModelArgs,
        /// Directory for resolution.txt
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: Option<PathBuf>,
    },
}

impl Commands {
    pub fn input(&self) -> &InputArgs {
        match self {
            Commands::Run { input, .. }
            | Commands::Validate { input, .. }
            | Commands::Dump { input, .. } => input,
        }
    }
}

/// Input tables shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Branch table CSV: from, to, r [Ω], x [Ω] [, b]
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub branches: PathBuf,
    /// Bus table CSV: bus, p [W], q [var], pgen_max [W], qgen_max [var]
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub buses: PathBuf,
    /// Optional load profile CSV: period, bus, p [W], q [var]
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub profile: Option<PathBuf>,
    /// TOML run configuration; flags override its values
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

/// Model and solver overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Base apparent power in VA
    #[arg(long)]
    pub s_base: Option<f64>,
    /// Base voltage in kV
    #[arg(long)]
    pub v_base: Option<f64>,
    /// Conic engine name (clarabel)
    #[arg(long)]
    pub solver: Option<String>,
    /// Number of independent periods
    #[arg(long)]
    pub periods: Option<usize>,
    /// Conic form: branch-flow or loss-ratio
    #[arg(long)]
    pub conic_form: Option<String>,
    /// Weight on generation in the branch-flow objective
    #[arg(long)]
    pub objective_weight: Option<f64>,
    /// Connectivity rule: branch-list or nonzero-resistance
    #[arg(long)]
    pub connectivity: Option<String>,
    /// Sign convention of the load columns: injection or demand
    #[arg(long)]
    pub load_convention: Option<String>,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
