use clap::{Parser, Subcommand};
use oracle_core::{
    config::AppConfig,
    state::{JsonFileStore, StateStore},
    OracleContract,
};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::{
    handle_config_command, handle_contract_command, utils::CliError, ConfigCommands,
    ContractCommands,
};

#[derive(Parser)]
#[command(name = "oracle-cli")]
#[command(about = "Run oracle contract calls against a local state file")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Contract state file; created on first save
    #[arg(long, env = "ORACLE_STATE", default_value = "oracle-state.json", global = true)]
    state: String,

    /// Configuration file (defaults to `ORACLE_CONFIG`, then config/oracle.toml)
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),

    #[command(flatten)]
    Contract(ContractCommands),
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,oracle_core={}", config.logging.level))
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(config_command) => {
            handle_config_command(config_command)?;
        }

        Commands::Contract(contract_command) => {
            let config = match &cli.config {
                Some(path) => AppConfig::from_file(path),
                None => AppConfig::load(),
            }
            .map_err(|e| CliError::Config(e.to_string()))?;
            config.validate().map_err(CliError::Config)?;

            init_logging(&config);

            let store = JsonFileStore::new(&cli.state);
            let state = store.load().await?;
            let mut contract = OracleContract::with_http(&config, state)?;

            handle_contract_command(contract_command, &mut contract, &store).await?;
        }
    }

    Ok(())
}
