pub mod dump;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use bfm_cli::cli::InputArgs;
use bfm_cli::RunConfig;
use bfm_core::{Diagnostics, LoadProfile, Network};
use bfm_io::{load_profile_csv, NetworkData};
use tracing::{info, warn};

/// Validated network, its diagnostics and the optional load profile.
pub struct Inputs {
    pub network: Network,
    pub diagnostics: Diagnostics,
    pub profile: Option<LoadProfile>,
}

pub fn load_inputs(input: &InputArgs, config: &RunConfig) -> Result<Inputs> {
    let data = NetworkData::from_csv(&input.branches, &input.buses, &config.load_options())
        .with_context(|| {
            format!(
                "loading feeder from {} and {}",
                input.branches.display(),
                input.buses.display()
            )
        })?;
    let (network, mut diagnostics) = data.into_parts();

    let profile = match &input.profile {
        Some(path) => {
            let profile = load_profile_csv(
                path,
                network.base(),
                config.load_convention,
                &mut diagnostics,
            )
            .with_context(|| format!("loading profile {}", path.display()))?;
            profile
                .validate(&network)
                .with_context(|| format!("checking profile {}", path.display()))?;
            if let Some(last) = profile.periods().last() {
                if last >= config.periods {
                    warn!(
                        last_period = last,
                        periods = config.periods,
                        "profile has entries beyond the configured periods; they are ignored"
                    );
                }
            }
            Some(profile)
        }
        None => None,
    };

    info!(
        buses = network.nodes().len(),
        branches = network.branches().len(),
        "{}",
        diagnostics.summary()
    );
    Ok(Inputs {
        network,
        diagnostics,
        profile,
    })
}
