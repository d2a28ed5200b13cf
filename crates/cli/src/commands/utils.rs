use oracle_core::{OracleError, StoreError};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    Config(String),
    State(String),
    /// A contract call that failed; the state file is still saved.
    Round(String),
    General(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::State(msg) => write!(f, "State error: {msg}"),
            Self::Round(msg) => write!(f, "Round failed: {msg}"),
            Self::General(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<StoreError> for CliError {
    fn from(error: StoreError) -> Self {
        Self::State(error.to_string())
    }
}

impl From<OracleError> for CliError {
    fn from(error: OracleError) -> Self {
        match error {
            OracleError::Configuration(msg) => Self::Config(msg),
            other => Self::Round(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::General(error.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

pub fn print_success(message: &str) {
    println!("[SUCCESS] {message}");
}

pub fn print_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn print_info(message: &str) {
    println!("[INFO] {message}");
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
