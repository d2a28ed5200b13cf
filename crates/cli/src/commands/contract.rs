use clap::{Args, Subcommand};
use oracle_core::{
    consensus::RoundReport, state::StateStore, CompositeRequest, OracleContract, PriceFlavor,
};

use super::utils::{print_error, print_info, print_json, print_success, CliResult};

#[derive(Subcommand)]
pub enum ContractCommands {
    /// Show every stored field
    Status,

    /// Show the stored price, source and symbol
    Price,

    /// Show credential rotation bookkeeping (never the keys themselves)
    Keys,

    /// Store an encoded API key for the rotating-key flavor
    AddKey {
        /// Key as stored; base64 unless `sources.rotation.encoding` says otherwise
        encoded: String,
    },

    /// Advance the active API key by one
    Rotate,

    /// Set the off-chain proxy base URL
    SetProxy { url: String },

    /// Run one price round
    UpdatePrice(UpdatePriceArgs),

    /// Run one composite round: price, weather and headline count
    UpdateAll(UpdateAllArgs),
}

#[derive(Args)]
pub struct UpdatePriceArgs {
    /// price-feed, rotating-key or proxy
    #[arg(long, default_value = "price-feed")]
    pub flavor: PriceFlavor,

    #[arg(long, default_value = "ETH")]
    pub symbol: String,
}

#[derive(Args)]
pub struct UpdateAllArgs {
    #[arg(long, default_value = "London")]
    pub city: String,

    #[arg(long, default_value = "51.5074", allow_hyphen_values = true)]
    pub lat: String,

    #[arg(long, default_value = "-0.1278", allow_hyphen_values = true)]
    pub lon: String,

    /// Maximum headlines counted
    #[arg(long, default_value = "10")]
    pub news_limit: u32,
}

impl From<UpdateAllArgs> for CompositeRequest {
    fn from(args: UpdateAllArgs) -> Self {
        Self { city: args.city, latitude: args.lat, longitude: args.lon, news_limit: args.news_limit }
    }
}

/// Runs one contract call and saves state afterwards, even when the call
/// failed, so rotation bookkeeping from a failed round is kept.
pub async fn handle_contract_command(
    command: ContractCommands,
    contract: &mut OracleContract,
    store: &dyn StateStore,
) -> CliResult<()> {
    let outcome = run(command, contract).await;
    store.save(contract.state()).await?;

    if let Err(err) = &outcome {
        print_error(&err.to_string());
    }
    outcome
}

async fn run(command: ContractCommands, contract: &mut OracleContract) -> CliResult<()> {
    match command {
        ContractCommands::Status => print_json(&contract.status()),
        ContractCommands::Price => print_json(&contract.price()),
        ContractCommands::Keys => print_json(&contract.key_status()),
        ContractCommands::AddKey { encoded } => {
            let index = contract.add_credential(&encoded)?;
            print_success(&format!("Stored key {index}"));
            Ok(())
        }
        ContractCommands::Rotate => {
            let index = contract.rotate()?;
            print_success(&format!("Active key is now {index}"));
            Ok(())
        }
        ContractCommands::SetProxy { url } => {
            contract.set_proxy_url(&url)?;
            print_success(&format!("Proxy URL set to {}", contract.state().proxy_url));
            Ok(())
        }
        ContractCommands::UpdatePrice(args) => {
            print_info(&format!("Running {} round for {}...", args.flavor, args.symbol));
            let report = contract.update_price(args.flavor, &args.symbol).await?;
            report_round(&report)
        }
        ContractCommands::UpdateAll(args) => {
            print_info(&format!("Running composite round for {}...", args.city));
            let report = contract.update_all(args.into()).await?;
            report_round(&report)
        }
    }
}

fn report_round(report: &RoundReport) -> CliResult<()> {
    print_success(&format!(
        "Round {} committed ({}/{} validators agreed)",
        report.round, report.decision.accepted, report.decision.total
    ));
    print_json(report)
}
