//! Wallet plugin
//!
//! Wires configuration and collaborators into the action set, resolves
//! actions by name or simile, and audits every dispatch.

use crate::actions::{
    Action, ActionResponse, Callback, LookupBalanceAction, SignMessageAction, TransferAction,
    TransferKind, WalletConnectAction, WalletConnector,
};
use crate::address::parse_account;
use crate::audit::AuditLog;
use crate::chain::{ChainConnector, ChainEndpoint, TransferSubmitter};
use crate::config::{Config, Network};
use crate::extract::{ObjectGenerator, State};
use crate::wallet::AgentKeypair;
use crate::{Error, Result};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

/// External collaborators the plugin depends on
pub struct PluginDeps {
    pub generator: Arc<dyn ObjectGenerator>,
    pub connector: Arc<dyn ChainConnector>,
    /// Enables `CONNECT_WALLET` and wallet-backed signing when present
    pub wallet_connector: Option<Arc<dyn WalletConnector>>,
}

pub struct WalletPlugin {
    network: Network,
    keypair: Arc<AgentKeypair>,
    send: Arc<TransferAction>,
    airdrop: Arc<TransferAction>,
    balance: Arc<LookupBalanceAction>,
    sign: Arc<SignMessageAction>,
    actions: Vec<Arc<dyn Action>>,
    audit: Option<AuditLog>,
}

impl WalletPlugin {
    pub fn new(config: &Config, deps: PluginDeps) -> Result<Self> {
        let keypair = Arc::new(config.keypair()?);

        if let Some(declared) = &config.address {
            if parse_account(declared)? != keypair.account_id() {
                warn!(
                    declared = %declared,
                    derived = %keypair.address(config.network.ss58_prefix()),
                    "Configured address does not match the seed's account"
                );
            }
        }

        let endpoint = ChainEndpoint::new(deps.connector, config.rpc_url.clone());
        let submitter = Arc::new(
            TransferSubmitter::new(endpoint.clone())
                .with_finalization_timeout(config.finalization_timeout()),
        );

        let transfer = |kind| {
            Arc::new(
                TransferAction::new(
                    kind,
                    deps.generator.clone(),
                    submitter.clone(),
                    keypair.clone(),
                )
                .with_dispatch_error_as_failure(config.dispatch_error_is_failure),
            )
        };
        let send = transfer(TransferKind::Send);
        let airdrop = transfer(TransferKind::Airdrop);

        let balance = Arc::new(LookupBalanceAction::new(deps.generator.clone(), endpoint));

        let mut sign =
            SignMessageAction::new(deps.generator.clone(), keypair.clone(), config.network);
        if let Some(wallet) = &deps.wallet_connector {
            sign = sign.with_wallet(wallet.clone());
        }
        let sign = Arc::new(sign);

        let mut actions: Vec<Arc<dyn Action>> = vec![
            send.clone(),
            airdrop.clone(),
            balance.clone(),
            sign.clone(),
        ];
        if let Some(wallet) = deps.wallet_connector {
            actions.push(Arc::new(WalletConnectAction::new(wallet, config.network)));
        }

        info!(
            network = config.network.name(),
            address = %keypair.address(config.network.ss58_prefix()),
            rpc_url = %config.rpc_url,
            actions = actions.len(),
            "Wallet plugin ready"
        );

        Ok(Self {
            network: config.network,
            keypair,
            send,
            airdrop,
            balance,
            sign,
            actions,
            audit: config.audit_log_path.clone().map(AuditLog::new),
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// The agent account's address on the configured network
    pub fn address(&self) -> String {
        self.keypair.address(self.network.ss58_prefix())
    }

    pub fn transfer_action(&self, kind: TransferKind) -> &TransferAction {
        match kind {
            TransferKind::Send => &self.send,
            TransferKind::Airdrop => &self.airdrop,
        }
    }

    pub fn balance_action(&self) -> &LookupBalanceAction {
        &self.balance
    }

    pub fn sign_action(&self) -> &SignMessageAction {
        &self.sign
    }

    pub fn actions(&self) -> impl Iterator<Item = &dyn Action> {
        self.actions.iter().map(|a| a.as_ref())
    }

    /// Resolve by action name or simile, ignoring case
    pub fn find(&self, name: &str) -> Option<&dyn Action> {
        self.actions()
            .find(|a| {
                a.name().eq_ignore_ascii_case(name)
                    || a.similes().iter().any(|s| s.eq_ignore_ascii_case(name))
            })
    }

    /// Run the named action against `state`, auditing the invocation.
    pub async fn dispatch(
        &self,
        name: &str,
        state: &State,
        callback: Callback<'_>,
    ) -> Result<bool> {
        let action = self
            .find(name)
            .ok_or_else(|| Error::UnknownAction(name.to_string()))?;

        let invocation_id = match &self.audit {
            Some(audit) => Some(audit.record_start(action.name(), state.last_text()).await),
            None => None,
        };

        let captured: Mutex<Option<ActionResponse>> = Mutex::new(None);
        let capture = |response: ActionResponse| {
            if let Ok(mut slot) = captured.lock() {
                *slot = Some(response.clone());
            }
            if let Some(callback) = callback {
                callback(response);
            }
        };

        let start = Instant::now();
        let success = action.handle(state, Some(&capture)).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(action = action.name(), success, duration_ms, "Action finished");

        if let (Some(audit), Some(id)) = (&self.audit, invocation_id) {
            let response = captured
                .lock()
                .ok()
                .and_then(|mut slot| slot.take())
                .and_then(|r| serde_json::to_value(r).ok());
            audit
                .record_complete(&id, action.name(), success, response, duration_ms)
                .await;
        }

        Ok(success)
    }
}
