//! Configuration for the wallet agent
//!
//! Settings come from the agent runtime first and the process environment
//! second (after `.env` is loaded by the CLI). Everything is validated up
//! front so actions never start with a half-configured wallet.

pub mod rpc;

use crate::address::is_valid_address;
use crate::wallet::AgentKeypair;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

// Re-export RPC config
pub use rpc::RpcConfig;

/// Network selection environment variable name
pub const NETWORK_ENV: &str = "WALLET_NETWORK";
pub const FINALIZATION_TIMEOUT_ENV: &str = "WALLET_FINALIZATION_TIMEOUT_SECS";
pub const DISPATCH_ERROR_IS_FAILURE_ENV: &str = "WALLET_DISPATCH_ERROR_IS_FAILURE";
pub const AUDIT_LOG_ENV: &str = "WALLET_AUDIT_LOG";
pub const MODEL_API_URL_ENV: &str = "MODEL_API_URL";
pub const MODEL_API_KEY_ENV: &str = "MODEL_API_KEY";
pub const MODEL_NAME_ENV: &str = "MODEL_NAME";

const DEFAULT_FINALIZATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Source of runtime settings (the agent runtime's character settings)
pub trait Settings: Send + Sync {
    fn get_setting(&self, key: &str) -> Option<String>;
}

impl Settings for HashMap<String, String> {
    fn get_setting(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Settings backed only by the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSettings;

impl Settings for EnvSettings {
    fn get_setting(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Runtime settings that defer to the process environment for missing keys
#[derive(Debug, Clone, Default)]
pub struct EnvFallback<S>(pub S);

impl<S: Settings> Settings for EnvFallback<S> {
    fn get_setting(&self, key: &str) -> Option<String> {
        self.0
            .get_setting(key)
            .or_else(|| EnvSettings.get_setting(key))
    }
}

/// Blank values count as missing.
pub(crate) fn lookup(settings: &dyn Settings, key: &str) -> Option<String> {
    settings
        .get_setting(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Supported networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    #[default]
    Vara,
    VaraTestnet,
    Polkadot,
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Vara, Network::VaraTestnet, Network::Polkadot];

    pub fn name(&self) -> &'static str {
        match self {
            Network::Vara => "vara",
            Network::VaraTestnet => "vara-testnet",
            Network::Polkadot => "polkadot",
        }
    }

    pub fn ss58_prefix(&self) -> u16 {
        match self {
            Network::Vara | Network::VaraTestnet => 137,
            Network::Polkadot => 0,
        }
    }

    /// Token symbol used when the node does not report one
    pub fn default_symbol(&self) -> &'static str {
        match self {
            Network::Vara => "VARA",
            Network::VaraTestnet => "TVARA",
            Network::Polkadot => "DOT",
        }
    }

    fn seed_var(&self) -> &'static str {
        match self {
            Network::Vara | Network::VaraTestnet => "VARA_SEED",
            Network::Polkadot => "POLKADOT_SEED",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Network::Vara | Network::VaraTestnet => "Vara",
            Network::Polkadot => "Polkadot",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "vara" | "vara-mainnet" => Ok(Network::Vara),
            "vara-testnet" | "testnet" => Ok(Network::VaraTestnet),
            "polkadot" | "dot" => Ok(Network::Polkadot),
            other => Err(Error::Config(format!(
                "unknown network '{}' (expected vara, vara-testnet or polkadot)",
                other
            ))),
        }
    }
}

/// OpenAI-compatible model endpoint used for structured extraction
#[derive(Debug, Clone, Serialize)]
pub struct ModelSettings {
    pub api_url: String,
    #[serde(skip)]
    pub api_key: Option<SecretString>,
    pub model: String,
}

/// Main configuration
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub network: Network,
    /// Secret URI of the agent account
    #[serde(skip)]
    pub seed: SecretString,
    /// Declared agent address (required for Polkadot)
    pub address: Option<String>,
    /// WebSocket RPC endpoint for `network`
    pub rpc_url: String,
    /// Bound on the wait for finalization; `None` waits indefinitely
    pub finalization_timeout_secs: Option<u64>,
    /// Report finalized-but-failed transfers as action failures
    pub dispatch_error_is_failure: bool,
    /// Path to audit log file
    pub audit_log_path: Option<PathBuf>,
    pub model: Option<ModelSettings>,
}

impl Config {
    /// Resolve and validate configuration, aggregating every problem found.
    pub fn from_settings(settings: &dyn Settings) -> Result<Self> {
        let mut errors = Vec::new();

        let network = match lookup(settings, NETWORK_ENV) {
            Some(value) => value.parse().unwrap_or_else(|e: Error| {
                errors.push(format!("{}: {}", NETWORK_ENV, strip_prefix(&e)));
                Network::default()
            }),
            None => Network::default(),
        };

        let seed_var = network.seed_var();
        let seed = match lookup(settings, seed_var) {
            Some(seed) => {
                let seed = SecretString::from(seed);
                if AgentKeypair::from_seed(&seed).is_err() {
                    errors.push(format!("{}: not a valid seed phrase or secret URI", seed_var));
                }
                Some(seed)
            }
            None => {
                errors.push(format!(
                    "{}: {} account seed phrase is required",
                    seed_var,
                    network.display_name()
                ));
                None
            }
        };

        let address = lookup(settings, "POLKADOT_ADDRESS");
        match (&address, network) {
            (None, Network::Polkadot) => {
                errors.push("POLKADOT_ADDRESS: Polkadot address is required".to_string())
            }
            (Some(addr), _) if !is_valid_address(addr) => {
                errors.push("POLKADOT_ADDRESS: not a valid account address".to_string())
            }
            _ => {}
        }

        let rpc_config = RpcConfig::from_settings(settings);
        let rpc_url = rpc_config.get(network).unwrap_or_default().to_string();
        if !is_websocket_url(&rpc_url) {
            errors.push(format!(
                "{}: must be a ws:// or wss:// URL",
                RpcConfig::env_var(network)
            ));
        }

        let finalization_timeout_secs = match lookup(settings, FINALIZATION_TIMEOUT_ENV) {
            None => Some(DEFAULT_FINALIZATION_TIMEOUT_SECS),
            Some(value) => match value.parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(secs),
                Err(_) => {
                    errors.push(format!(
                        "{}: expected a number of seconds, got '{}'",
                        FINALIZATION_TIMEOUT_ENV, value
                    ));
                    None
                }
            },
        };

        let dispatch_error_is_failure = match lookup(settings, DISPATCH_ERROR_IS_FAILURE_ENV) {
            None => false,
            Some(value) => parse_bool(&value).unwrap_or_else(|| {
                errors.push(format!(
                    "{}: expected true or false, got '{}'",
                    DISPATCH_ERROR_IS_FAILURE_ENV, value
                ));
                false
            }),
        };

        let audit_log_path = lookup(settings, AUDIT_LOG_ENV).map(PathBuf::from);

        let model = lookup(settings, MODEL_API_URL_ENV).map(|api_url| ModelSettings {
            api_url,
            api_key: lookup(settings, MODEL_API_KEY_ENV).map(SecretString::from),
            model: lookup(settings, MODEL_NAME_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        });

        match seed {
            Some(seed) if errors.is_empty() => Ok(Self {
                network,
                seed,
                address,
                rpc_url,
                finalization_timeout_secs,
                dispatch_error_is_failure,
                audit_log_path,
                model,
            }),
            _ => Err(Error::ConfigInvalid(errors)),
        }
    }

    pub fn finalization_timeout(&self) -> Option<Duration> {
        self.finalization_timeout_secs.map(Duration::from_secs)
    }

    /// Derive the agent keypair from the configured seed
    pub fn keypair(&self) -> Result<AgentKeypair> {
        AgentKeypair::from_seed(&self.seed)
    }
}

fn is_websocket_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "ws" | "wss"))
        .unwrap_or(false)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn strip_prefix(err: &Error) -> String {
    match err {
        Error::Config(msg) => msg.clone(),
        other => other.to_string(),
    }
}
