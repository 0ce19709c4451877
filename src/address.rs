//! Account address validation and encoding
//!
//! Accepts the two forms users paste into chat: a `0x`-prefixed 32-byte
//! public key, or an SS58 string for any network prefix.

use crate::{Error, Result};
use sp_core::crypto::{AccountId32 as SpAccountId32, Ss58AddressFormat, Ss58Codec};
use subxt::utils::AccountId32;

/// Check whether `address` decodes to an account id and re-encodes cleanly.
pub fn is_valid_address(address: &str) -> bool {
    parse_account(address).is_ok()
}

/// Decode an address into the 32-byte account id used on-chain.
pub fn parse_account(address: &str) -> Result<AccountId32> {
    let address = address.trim();

    let raw: [u8; 32] = if let Some(hex_part) = address.strip_prefix("0x") {
        let bytes = hex::decode(hex_part)
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", address, e)))?;
        bytes.try_into().map_err(|bytes: Vec<u8>| {
            Error::InvalidAddress(format!(
                "{}: expected 32 bytes, got {}",
                address,
                bytes.len()
            ))
        })?
    } else {
        let (account, _format) = SpAccountId32::from_ss58check_with_version(address)
            .map_err(|e| Error::InvalidAddress(format!("{}: {:?}", address, e)))?;
        account.into()
    };

    // Round trip through the generic SS58 encoding
    let reencoded = SpAccountId32::from(raw).to_ss58check();
    SpAccountId32::from_ss58check(&reencoded)
        .map_err(|e| Error::InvalidAddress(format!("{}: {:?}", address, e)))?;

    Ok(AccountId32(raw))
}

/// Encode an account id for a network's SS58 prefix.
pub fn encode_address(account: &AccountId32, ss58_prefix: u16) -> String {
    SpAccountId32::from(account.0)
        .to_ss58check_with_version(Ss58AddressFormat::custom(ss58_prefix))
}
