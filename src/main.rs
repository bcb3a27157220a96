use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lightgrok::cli::CliApp;
use lightgrok::cli_types::{Cli, Commands};
use lightgrok::LightgrokConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so search output stays pipeable
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config = LightgrokConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(index_root) = cli.index_root {
        config.index.root = index_root;
    }

    let app = CliApp::new(config, cli.verbose)?;
    match cli.command {
        Commands::Index(args) => app.index(args),
        Commands::Search(args) => app.search(args),
        Commands::Locate(args) => app.locate(args),
        Commands::Config => app.show_config(),
    }
}
