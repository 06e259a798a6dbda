use anyhow::Result;
use bfm_cli::{
    cli::{Cli, Commands},
    RunConfig,
};
use clap::Parser;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file is reported by the command itself.
    let file_level = RunConfig::load(cli.command.input().config.as_deref())
        .ok()
        .and_then(|config| config.log_level());
    let level = cli
        .log_level
        .or(file_level)
        .unwrap_or(tracing::Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let result = match &cli.command {
        Commands::Run {
            input,
            model,
            print_output,
            out,
        } => commands::run::handle(input, model, *print_output, out.as_deref()),
        Commands::Validate {
            input,
            s_base,
            v_base,
            connectivity,
            matrices,
        } => commands::validate::handle(
            input,
            *s_base,
            *v_base,
            connectivity.as_deref(),
            *matrices,
        ),
        Commands::Dump { input, model, out } => {
            commands::dump::handle(input, model, out.as_deref())
        }
    };

    if let Err(e) = &result {
        error!("{e:#}");
    }
    result
}
