mod cli;
mod service;

use bulk_verify_core::core::config::load_config_file;
use bulk_verify_core::{Config, ConfigBuilder};
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .init();
}

fn build_config(cli: &Cli) -> bulk_verify_core::Result<Config> {
    let file = load_config_file(cli.config.as_deref())?;
    ConfigBuilder::new()
        .with_file(file)
        .api_base_url(cli.api_url.clone())
        .api_token(cli.api_token.clone())
        .request_timeout(cli.timeout)
        .max_retries(cli.max_retries)
        .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli)?;
    tracing::info!(
        "Using verification service at {} (config: {})",
        config.api_base_url,
        config.loaded_config_path.as_deref().unwrap_or("defaults")
    );

    match cli.command {
        Command::Verify(args) => service::runner::run_verify(&config, args).await,
        Command::Credits => service::runner::show_credits(&config).await,
    }
}
