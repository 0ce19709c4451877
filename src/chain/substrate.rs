//! Substrate RPC session with dynamic metadata decoding.
//!
//! Works against any Substrate runtime exposing `System::Account` and
//! `Balances::transfer_keep_alive` (Vara, Vara testnet, Polkadot).

use super::{ChainConnector, ChainSession, DispatchFailure, TokenInfo, TransferResult};
use crate::config::Network;
use crate::wallet::AgentKeypair;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::dynamic::Value;
use subxt::error::DispatchError;
use subxt::ext::scale_value::At;
use subxt::tx::TxStatus;
use subxt::utils::AccountId32;
use subxt::{OnlineClient, PolkadotConfig};
use tracing::{debug, instrument};

/// Opens a new WebSocket connection for every session.
#[derive(Debug, Clone, Copy)]
pub struct SubxtConnector {
    default_symbol: &'static str,
}

impl SubxtConnector {
    pub fn new(network: Network) -> Self {
        Self {
            default_symbol: network.default_symbol(),
        }
    }
}

#[async_trait]
impl ChainConnector for SubxtConnector {
    #[instrument(skip_all, fields(url = %endpoint))]
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn ChainSession>> {
        debug!("Connecting to node");
        let session = SubxtSession::connect(endpoint, self.default_symbol).await?;
        debug!("Connected successfully");
        Ok(Box::new(session))
    }
}

/// Live connection to a Substrate node
pub struct SubxtSession {
    client: OnlineClient<PolkadotConfig>,
    rpc: LegacyRpcMethods<PolkadotConfig>,
    default_symbol: &'static str,
}

impl SubxtSession {
    pub async fn connect(endpoint: &str, default_symbol: &'static str) -> Result<Self> {
        let rpc_client = RpcClient::from_url(endpoint)
            .await
            .map_err(|e| Error::Network(format!("Connection to {} failed: {}", endpoint, e)))?;
        let client = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc_client.clone()).await?;
        let rpc = LegacyRpcMethods::<PolkadotConfig>::new(rpc_client);

        Ok(Self {
            client,
            rpc,
            default_symbol,
        })
    }
}

#[async_trait]
impl ChainSession for SubxtSession {
    async fn token_info(&self) -> Result<TokenInfo> {
        let properties = self.rpc.system_properties().await?;
        token_info_from(&properties, self.default_symbol)
    }

    async fn free_balance(&self, account: &AccountId32) -> Result<u128> {
        let key = vec![Value::from_bytes(account.0)];
        let query = subxt::dynamic::storage("System", "Account", key);
        let entry = self
            .client
            .storage()
            .at_latest()
            .await?
            .fetch(&query)
            .await?;

        let Some(entry) = entry else {
            return Ok(0);
        };

        let value = entry
            .to_value()
            .map_err(|e| Error::Network(format!("Cannot decode System.Account: {}", e)))?;
        value
            .at("data")
            .at("free")
            .and_then(|free| free.as_u128())
            .ok_or_else(|| Error::Network("Unexpected System.Account layout".to_string()))
    }

    async fn transfer_keep_alive(
        &self,
        signer: &AgentKeypair,
        dest: &AccountId32,
        value: u128,
    ) -> Result<TransferResult> {
        let call = subxt::dynamic::tx(
            "Balances",
            "transfer_keep_alive",
            vec![
                Value::unnamed_variant("Id", [Value::from_bytes(dest.0)]),
                Value::u128(value),
            ],
        );

        // The default params resolve the nonce via `system_accountNextIndex`,
        // which counts pending pool transactions from the same account.
        let mut progress = self
            .client
            .tx()
            .sign_and_submit_then_watch_default(&call, signer)
            .await?;
        let transaction_hash = progress.extrinsic_hash();

        while let Some(status) = progress.next().await {
            match status? {
                TxStatus::InFinalizedBlock(in_block) => {
                    let block_hash = in_block.block_hash();
                    let dispatch_error = match in_block.wait_for_success().await {
                        Ok(_events) => None,
                        Err(subxt::Error::Runtime(err)) => Some(describe_dispatch_error(err)),
                        Err(e) => return Err(e.into()),
                    };

                    return Ok(TransferResult {
                        transaction_hash,
                        block_hash,
                        dispatch_error,
                    });
                }
                TxStatus::Error { message }
                | TxStatus::Invalid { message }
                | TxStatus::Dropped { message } => {
                    return Err(Error::NotExecuted(message));
                }
                TxStatus::Validated => debug!("Tx status: validated"),
                TxStatus::Broadcasted { num_peers } => {
                    debug!(num_peers, "Tx status: broadcasted")
                }
                TxStatus::InBestBlock(in_block) => {
                    debug!(block_hash = ?in_block.block_hash(), "Tx status: in best block")
                }
                TxStatus::NoLongerInBestBlock => debug!("Tx status: no longer in best block"),
            }
        }

        Err(Error::Network(
            "Transaction status subscription ended before finalization".to_string(),
        ))
    }
}

/// Read decimals and symbol from `system_properties`.
fn token_info_from(
    properties: &Map<String, JsonValue>,
    default_symbol: &str,
) -> Result<TokenInfo> {
    let decimals = properties
        .get("tokenDecimals")
        .and_then(first_u64)
        .ok_or_else(|| Error::Network("Node did not report tokenDecimals".to_string()))?;
    let decimals = u32::try_from(decimals)
        .map_err(|_| Error::Network(format!("Node reported tokenDecimals {}", decimals)))?;
    let symbol = properties
        .get("tokenSymbol")
        .and_then(first_str)
        .unwrap_or(default_symbol)
        .to_string();

    Ok(TokenInfo { symbol, decimals })
}

fn describe_dispatch_error(err: DispatchError) -> DispatchFailure {
    match err {
        DispatchError::Module(module_error) => match module_error.details() {
            Ok(details) => DispatchFailure::Module {
                section: details.pallet.name().to_string(),
                name: details.variant.name.clone(),
                docs: details.variant.docs.clone(),
            },
            Err(_) => DispatchFailure::Other(module_error.to_string()),
        },
        other => DispatchFailure::Other(other.to_string()),
    }
}

/// `system_properties` fields are either scalars or per-token arrays.
fn first_u64(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Array(items) => items.first().and_then(JsonValue::as_u64),
        other => other.as_u64(),
    }
}

fn first_str(value: &JsonValue) -> Option<&str> {
    match value {
        JsonValue::Array(items) => items.first().and_then(JsonValue::as_str),
        other => other.as_str(),
    }
}
