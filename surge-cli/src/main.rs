use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::info;

mod cli;
mod commands;
mod summary;

use cli::{Cli, Commands, ConfigCommands};
use commands::{
    handle_config_generate, handle_config_show, handle_config_validate, load_config, run_command, RunOverrides,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    // Commands that must work without a valid configuration get plain logging
    match &command {
        Commands::Validate
        | Commands::Config {
            config_cmd: ConfigCommands::Generate { .. },
        } => {
            surge_logging::init_simple_tracing(cli.log_level.as_deref().unwrap_or("warn"))?;
        }
        _ => {}
    }

    match command {
        Commands::Validate => handle_config_validate(cli.config.as_ref()),
        Commands::Config {
            config_cmd: ConfigCommands::Generate { output, force },
        } => handle_config_generate(&output, force),
        Commands::Config {
            config_cmd: ConfigCommands::Show { format },
        } => {
            let config = load_config(cli.config.as_ref())?;
            surge_logging::init_logging_from_config(&config.logging, cli.log_level.as_deref())?;
            handle_config_show(&config, &format)
        }
        Commands::Run {
            base_url,
            output,
            format,
            no_summary,
        } => {
            let config = load_config(cli.config.as_ref())?;
            surge_logging::init_logging_from_config(&config.logging, cli.log_level.as_deref())?;
            info!("Surge CLI starting");

            run_command(
                config,
                RunOverrides {
                    base_url,
                    output,
                    format,
                    no_summary,
                },
            )
            .await
        }
    }
}
