use anyhow::Result;

use bfm_cli::cli::{InputArgs, ModelArgs};
use bfm_cli::RunConfig;
use bfm_core::Network;

use crate::commands::load_inputs;

pub fn handle(
    input: &InputArgs,
    s_base: Option<f64>,
    v_base: Option<f64>,
    connectivity: Option<&str>,
    matrices: bool,
) -> Result<()> {
    let mut config = RunConfig::load(input.config.as_deref())?;
    config.apply_overrides(&ModelArgs {
        s_base,
        v_base,
        connectivity: connectivity.map(str::to_string),
        ..ModelArgs::default()
    })?;
    config.validate()?;

    let inputs = load_inputs(input, &config)?;
    let network = &inputs.network;
    let tree = network.tree();
    let leaves = network
        .node_ids()
        .filter(|&bus| tree.is_leaf(bus))
        .count();
    let depth = network
        .node_ids()
        .map(|bus| tree.depth(bus))
        .max()
        .unwrap_or(0);

    println!(
        "valid radial feeder: {} buses, {} branches, root {}, {} leaves, depth {}",
        network.nodes().len(),
        network.branches().len(),
        tree.root(),
        leaves,
        depth
    );
    println!("{}", inputs.diagnostics.summary());
    for issue in &inputs.diagnostics.issues {
        println!("  {issue}");
    }
    if matrices {
        print_matrices(network);
    }
    Ok(())
}

fn print_matrices(network: &Network) {
    let ids: Vec<String> = network.node_ids().map(|bus| bus.to_string()).collect();
    println!("buses: {}", ids.join(" "));

    println!("Cx:");
    for row in network.connectivity_matrix() {
        let cells: Vec<String> = row.iter().map(u8::to_string).collect();
        println!("  {}", cells.join(" "));
    }
    for (name, matrix) in [
        ("R", network.resistance_matrix()),
        ("X", network.reactance_matrix()),
    ] {
        println!("{name} [pu], {} stored entries:", matrix.nnz());
        for row in matrix.to_dense() {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
            println!("  {}", cells.join(" "));
        }
    }
}
