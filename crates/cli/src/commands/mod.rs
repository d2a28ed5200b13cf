pub mod config;
pub mod contract;
pub mod utils;

pub use config::{handle_config_command, ConfigCommands};
pub use contract::{handle_contract_command, ContractCommands};
