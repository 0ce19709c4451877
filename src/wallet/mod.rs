//! Agent wallet management
//!
//! This module handles the seed-derived keypair and message signing.
//! The secret seed NEVER leaves this module and is NEVER logged.

mod signer;

pub use signer::AgentKeypair;
