use std::path::Path;

use anyhow::Result;
use bfm_algo::BranchFlowSolver;
use bfm_io::{prepare_output_dir, write_json, write_text};
use tracing::info;

use bfm_cli::cli::{InputArgs, ModelArgs};
use bfm_cli::RunConfig;

use crate::commands::load_inputs;

pub fn handle(
    input: &InputArgs,
    model_args: &ModelArgs,
    print_output: bool,
    out: Option<&Path>,
) -> Result<()> {
    let mut config = RunConfig::load(input.config.as_deref())?;
    config.apply_overrides(model_args)?;
    config.print_output |= print_output;
    if let Some(out) = out {
        config.output_dir = out.to_path_buf();
    }
    config.validate()?;

    let inputs = load_inputs(input, &config)?;
    let solver = BranchFlowSolver::new()
        .with_solver(config.solver_kind()?)
        .with_settings(config.solver_settings.clone())
        .with_options(config.model_options());

    let model = solver.build_model(&inputs.network, inputs.profile.as_ref())?;
    let (resolution_path, output_path) = prepare_output_dir(&config.output_dir)?;
    write_text(&resolution_path, &model)?;
    info!("model written to {}", resolution_path.display());

    let solution = solver.solve_model(&inputs.network, &model)?;
    write_json(&output_path, &solution)?;

    if solution.converged {
        println!(
            "converged! status: {}, objective: {:.6}, iterations: {}",
            solution.status, solution.objective_value, solution.iterations
        );
    } else {
        println!(
            "did not converge: {} after {} iterations",
            solution.status, solution.iterations
        );
    }
    if config.print_output {
        print!("{solution}");
    }
    println!("results written to {}", output_path.display());
    Ok(())
}
