use std::path::Path;

use anyhow::Result;
use bfm_algo::BranchFlowModel;
use bfm_io::{prepare_output_dir, write_text};

use bfm_cli::cli::{InputArgs, ModelArgs};
use bfm_cli::RunConfig;

use crate::commands::load_inputs;

pub fn handle(input: &InputArgs, model_args: &ModelArgs, out: Option<&Path>) -> Result<()> {
    let mut config = RunConfig::load(input.config.as_deref())?;
    config.apply_overrides(model_args)?;
    if let Some(out) = out {
        config.output_dir = out.to_path_buf();
    }
    config.validate()?;

    let inputs = load_inputs(input, &config)?;
    let model = BranchFlowModel::build(
        &inputs.network,
        inputs.profile.as_ref(),
        &config.model_options(),
    )?;
    let (resolution_path, _) = prepare_output_dir(&config.output_dir)?;
    write_text(&resolution_path, &model)?;
    println!(
        "{} variables, {} constraints written to {}",
        model.variables().len(),
        model.constraints().len(),
        resolution_path.display()
    );
    Ok(())
}
