//! Error types for the wallet agent

use crate::amount::AmountError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration validation failed:\n{}", .0.join("\n"))]
    ConfigInvalid(Vec<String>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid extracted content: {0}")]
    InvalidContent(String),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Chain RPC error: {0}")]
    Network(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transaction was not executed: {0}")]
    NotExecuted(String),

    #[error("Timed out after {}s waiting for finalization", .0.as_secs())]
    Timeout(Duration),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Wallet session error: {0}")]
    WalletSession(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<subxt::Error> for Error {
    fn from(err: subxt::Error) -> Self {
        Error::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
