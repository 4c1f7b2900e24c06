mod cli;
mod commands;

use clap::Parser;
use miette::Result;
use shared::config::SubmitterConfig;
use shared::logging::initialize_console_and_file_logging;
use tracing::debug;

use crate::cli::{CLIArgs, CLICommand};

fn main() -> Result<()> {
    let args = CLIArgs::parse();

    let _guard = initialize_console_and_file_logging(args.log_file_path.as_ref())?;

    let config = match &args.config_file_path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration file.");
            SubmitterConfig::load_from_file(path)?
        }
        None => SubmitterConfig::default(),
    };

    let mut stdout = std::io::stdout().lock();

    match args.command {
        CLICommand::Package(package_args) => commands::package(package_args, &config, &mut stdout),
        CLICommand::Frames(frames_args) => commands::frames(frames_args, &mut stdout),
        CLICommand::ShowConfig => commands::show_config(&config, &mut stdout),
    }
}
