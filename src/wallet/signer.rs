//! Seed-derived sr25519 keypair
//!
//! SECURITY: This is the ONLY place where the secret seed is used.
//! - The seed is held as a `SecretString` until the pair is derived
//! - The pair is never serialized
//! - Debug output redacts the pair

use crate::address::encode_address;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use sp_core::{sr25519, Pair};
use subxt::tx::Signer;
use subxt::utils::{AccountId32, MultiAddress, MultiSignature};
use subxt::PolkadotConfig;

const BYTES_PREFIX: &[u8] = b"<Bytes>";
const BYTES_SUFFIX: &[u8] = b"</Bytes>";

/// Keypair for the agent's own funded account
#[derive(Clone)]
pub struct AgentKeypair {
    pair: sr25519::Pair,
}

impl AgentKeypair {
    /// Derive from a secret URI: mnemonic, raw hex seed, or dev path such as `//Alice`
    pub fn from_seed(seed: &SecretString) -> Result<Self> {
        let pair = sr25519::Pair::from_string(seed.expose_secret(), None)
            .map_err(|e| Error::Signing(format!("Invalid seed phrase: {:?}", e)))?;
        Ok(Self { pair })
    }

    pub fn account_id(&self) -> AccountId32 {
        AccountId32(self.pair.public().0)
    }

    /// SS58 address for the given network prefix
    pub fn address(&self, ss58_prefix: u16) -> String {
        encode_address(&self.account_id(), ss58_prefix)
    }

    /// Sign an arbitrary message the way browser wallets do for `signRaw`:
    /// the payload is wrapped in `<Bytes>..</Bytes>` before signing.
    pub fn sign_message(&self, message: &[u8]) -> [u8; 64] {
        self.pair.sign(&wrap_bytes(message)).0
    }

    /// Verify a signature produced by [`AgentKeypair::sign_message`]
    pub fn verify_message(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        let signature = sr25519::Signature::from_raw(*signature);
        sr25519::Pair::verify(&signature, wrap_bytes(message), &self.pair.public())
    }
}

fn wrap_bytes(message: &[u8]) -> Vec<u8> {
    if message.starts_with(BYTES_PREFIX) && message.ends_with(BYTES_SUFFIX) {
        return message.to_vec();
    }
    let mut wrapped = Vec::with_capacity(message.len() + BYTES_PREFIX.len() + BYTES_SUFFIX.len());
    wrapped.extend_from_slice(BYTES_PREFIX);
    wrapped.extend_from_slice(message);
    wrapped.extend_from_slice(BYTES_SUFFIX);
    wrapped
}

impl Signer<PolkadotConfig> for AgentKeypair {
    fn account_id(&self) -> AccountId32 {
        AgentKeypair::account_id(self)
    }

    fn address(&self) -> MultiAddress<AccountId32, ()> {
        MultiAddress::Id(AgentKeypair::account_id(self))
    }

    fn sign(&self, signer_payload: &[u8]) -> MultiSignature {
        MultiSignature::Sr25519(self.pair.sign(signer_payload).0)
    }
}

// Implement Debug manually to avoid exposing the pair
impl std::fmt::Debug for AgentKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentKeypair")
            .field("account", &self.address(42))
            .field("pair", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AgentKeypair {
        AgentKeypair::from_seed(&SecretString::from("//Alice".to_string())).unwrap()
    }

    #[test]
    fn test_keypair_from_dev_seed() {
        assert_eq!(
            alice().address(42),
            "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"
        );
    }

    #[test]
    fn test_invalid_seed_is_rejected() {
        let err = AgentKeypair::from_seed(&SecretString::from("not a seed".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
    }

    #[test]
    fn test_sign_message_verifies() {
        let keypair = alice();
        let signature = keypair.sign_message(b"hello vara");
        assert!(keypair.verify_message(b"hello vara", &signature));
        assert!(!keypair.verify_message(b"hello polkadot", &signature));
    }

    #[test]
    fn test_pre_wrapped_message_is_not_wrapped_twice() {
        assert_eq!(wrap_bytes(b"<Bytes>hi</Bytes>"), b"<Bytes>hi</Bytes>".to_vec());
        assert_eq!(wrap_bytes(b"hi"), b"<Bytes>hi</Bytes>".to_vec());
    }

    #[test]
    fn test_debug_redacts_pair() {
        let debug_str = format!("{:?}", alice());
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("Alice"));
    }
}
