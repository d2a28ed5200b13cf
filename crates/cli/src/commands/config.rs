use clap::Subcommand;
use oracle_core::config::AppConfig;
use std::path::Path;

use super::utils::{print_error, print_info, print_success, CliError, CliResult};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        #[arg(short, long, default_value = "config/oracle.toml")]
        file: String,
    },

    /// Show the effective configuration with file and environment layers applied
    Show {
        #[arg(short, long, default_value = "config/oracle.toml")]
        file: String,

        /// Show upstream API keys instead of redacting them
        #[arg(long)]
        show_sensitive: bool,
    },
}

pub fn handle_config_command(command: ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Validate { file } => validate_config(&file),
        ConfigCommands::Show { file, show_sensitive } => show_config(&file, show_sensitive),
    }
}

fn validate_config(file: &str) -> CliResult<()> {
    if !Path::new(file).exists() {
        print_error(&format!("Configuration file not found: {file}"));
        return Err(CliError::Config(format!("File not found: {file}")));
    }

    print_info(&format!("Loading configuration from {file}..."));
    let config = AppConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))?;
    config.validate().map_err(CliError::Config)?;

    print_success("Configuration is valid!");
    println!("Configuration Summary:");
    println!(
        "  Consensus: {} validators, threshold {}",
        config.consensus.validators, config.consensus.quorum_threshold
    );
    println!(
        "  Sources: {} price, {} weather, {} news",
        config.sources.price.len(),
        config.sources.weather.len(),
        config.sources.news.len()
    );
    println!("  Price range: ({}, {})", config.validation.price_floor, config.validation.price_ceiling);
    Ok(())
}

fn show_config(file: &str, show_sensitive: bool) -> CliResult<()> {
    let mut config = AppConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))?;
    if !show_sensitive {
        redact(&mut config);
    }

    let rendered = toml::to_string_pretty(&config).map_err(|e| CliError::General(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn redact(config: &mut AppConfig) {
    for key in [&mut config.proxy_server.coingecko_api_key, &mut config.proxy_server.binance_api_key]
    {
        if key.is_some() {
            *key = Some("<redacted>".to_string());
        }
    }
}
