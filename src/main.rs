use std::process::ExitCode;

use clap::Parser;
use orbis_gateway::adapter::inbound::cli::output::{self, OutputConfig};
use orbis_gateway::adapter::inbound::cli::{dispatch, Cli, Outcome};
use orbis_gateway::application::Gateway;
use orbis_gateway::infrastructure::config::Config;
use tracing::{debug, error};

/// Some input was unresolved or missing remotely.
const EXIT_PARTIAL: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    let loaded = if cli.config.exists() {
        Config::load(&cli.config)
    } else {
        Config::parse_toml("")
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            output::error(&format!("Failed to load config: {e}"));
            return ExitCode::FAILURE;
        }
    };
    config.init_logging();
    debug!(config = %cli.config.display(), "Configuration loaded");

    let gateway = match Gateway::open(&config) {
        Ok(gateway) => gateway,
        Err(e) => {
            output::error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let result = dispatch(&gateway, cli.command).await;
    gateway.close();

    match result {
        Ok(Outcome::Complete) => ExitCode::SUCCESS,
        Ok(Outcome::Partial) => ExitCode::from(EXIT_PARTIAL),
        Err(e) => {
            error!(error = %e, kind = ?e.kind(), "Command failed");
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
