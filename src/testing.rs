//! In-memory collaborators for unit tests

use crate::actions::{ActionResponse, WalletConnector, WalletSession};
use crate::chain::{ChainConnector, ChainSession, DispatchFailure, TokenInfo, TransferResult};
use crate::config::Network;
use crate::extract::ObjectGenerator;
use crate::wallet::AgentKeypair;
use crate::{Error, Result};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subxt::utils::{AccountId32, H256};

pub const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

pub fn alice_account() -> AccountId32 {
    crate::address::parse_account(ALICE).unwrap()
}

pub fn bob_keypair() -> AgentKeypair {
    AgentKeypair::from_seed(&SecretString::from("//Bob".to_string())).unwrap()
}

/// Collects every response an action reports
#[derive(Clone, Default)]
pub struct Replies(Arc<Mutex<Vec<ActionResponse>>>);

impl Replies {
    pub fn callback(&self) -> impl Fn(ActionResponse) + Send + Sync + 'static {
        let inner = self.0.clone();
        move |response| inner.lock().unwrap().push(response)
    }

    pub fn all(&self) -> Vec<ActionResponse> {
        self.0.lock().unwrap().clone()
    }

    /// The single response an invocation is expected to produce
    pub fn only(&self) -> ActionResponse {
        let all = self.all();
        assert_eq!(all.len(), 1, "expected exactly one response, got {all:?}");
        all[0].clone()
    }
}

#[derive(Default)]
struct ChainState {
    decimals: u32,
    balances: HashMap<[u8; 32], u128>,
    submissions: Vec<(AccountId32, u128)>,
    connections: usize,
    dispatch_error: Option<DispatchFailure>,
    pool_rejection: Option<String>,
    stalled: bool,
    failing_balances: bool,
    failing_connect: bool,
}

/// Fake node: transfers credit the destination and finalize immediately
#[derive(Clone, Default)]
pub struct MockChain {
    state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    pub fn new(decimals: u32) -> Self {
        let chain = Self::default();
        chain.state.lock().unwrap().decimals = decimals;
        chain
    }

    pub fn with_balance(self, account: AccountId32, free: u128) -> Self {
        self.state.lock().unwrap().balances.insert(account.0, free);
        self
    }

    pub fn with_dispatch_error(self, failure: DispatchFailure) -> Self {
        self.state.lock().unwrap().dispatch_error = Some(failure);
        self
    }

    pub fn with_pool_rejection(self, message: &str) -> Self {
        self.state.lock().unwrap().pool_rejection = Some(message.to_string());
        self
    }

    pub fn with_stalled_finalization(self) -> Self {
        self.state.lock().unwrap().stalled = true;
        self
    }

    pub fn with_failing_balance_queries(self) -> Self {
        self.state.lock().unwrap().failing_balances = true;
        self
    }

    pub fn with_failing_connection(self) -> Self {
        self.state.lock().unwrap().failing_connect = true;
        self
    }

    pub fn submissions(&self) -> Vec<(AccountId32, u128)> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn balance_of(&self, account: &AccountId32) -> u128 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&account.0)
            .copied()
            .unwrap_or(0)
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }
}

#[async_trait]
impl ChainConnector for MockChain {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn ChainSession>> {
        let mut state = self.state.lock().unwrap();
        if state.failing_connect {
            return Err(Error::Network(format!("Connection to {} refused", endpoint)));
        }
        state.connections += 1;
        Ok(Box::new(MockSession {
            state: self.state.clone(),
        }))
    }
}

struct MockSession {
    state: Arc<Mutex<ChainState>>,
}

#[async_trait]
impl ChainSession for MockSession {
    async fn token_info(&self) -> Result<TokenInfo> {
        Ok(TokenInfo {
            symbol: "VARA".to_string(),
            decimals: self.state.lock().unwrap().decimals,
        })
    }

    async fn free_balance(&self, account: &AccountId32) -> Result<u128> {
        let state = self.state.lock().unwrap();
        if state.failing_balances {
            return Err(Error::Network("storage query failed".to_string()));
        }
        Ok(state.balances.get(&account.0).copied().unwrap_or(0))
    }

    async fn transfer_keep_alive(
        &self,
        _signer: &AgentKeypair,
        dest: &AccountId32,
        value: u128,
    ) -> Result<TransferResult> {
        let stalled = self.state.lock().unwrap().stalled;
        if stalled {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.pool_rejection {
            return Err(Error::NotExecuted(message.clone()));
        }

        state.submissions.push((dest.clone(), value));
        let n = state.submissions.len() as u64;
        if state.dispatch_error.is_none() {
            *state.balances.entry(dest.0).or_insert(0) += value;
        }

        Ok(TransferResult {
            transaction_hash: H256::from_low_u64_be(n),
            block_hash: H256::from_low_u64_be(1000 + n),
            dispatch_error: state.dispatch_error.clone(),
        })
    }
}

/// Model stand-in returning a canned object
pub struct MockGenerator {
    reply: std::result::Result<Value, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn returning(reply: Value) -> Self {
        Self {
            reply: Ok(reply),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectGenerator for MockGenerator {
    async fn generate_object(&self, prompt: &str, _schema: &Value) -> Result<Value> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(Error::Model)
    }
}

/// External wallet stand-in that signs with a local keypair
pub struct MockWalletConnector {
    session: Mutex<Option<WalletSession>>,
    keypair: AgentKeypair,
}

impl MockWalletConnector {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
            keypair: AgentKeypair::from_seed(&SecretString::from("//Charlie".to_string()))
                .unwrap(),
        }
    }

    pub fn wallet_address(&self) -> String {
        self.keypair.address(Network::Vara.ss58_prefix())
    }
}

#[async_trait]
impl WalletConnector for MockWalletConnector {
    async fn pair(&self, network: Network) -> Result<WalletSession> {
        let session = WalletSession {
            topic: "mock-topic".to_string(),
            uri: format!("wc:mock-topic@2?relay-protocol=irn&chain={}", network.name()),
            accounts: vec![self.wallet_address()],
        };
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn active_session(&self) -> Option<WalletSession> {
        self.session.lock().unwrap().clone()
    }

    async fn sign_message(
        &self,
        _session: &WalletSession,
        _address: &str,
        message: &str,
    ) -> Result<String> {
        Ok(format!(
            "0x{}",
            hex::encode(self.keypair.sign_message(message.as_bytes()))
        ))
    }
}
