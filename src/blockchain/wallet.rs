//! Wallet management and transaction signing.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "CHAIN_REACTION_PRIVATE_KEY";

/// Bring a raw private key into the `0x`-prefixed form the signer expects.
///
/// Only whitespace is trimmed and the prefix added; the key material itself
/// is untouched. Whether it is a valid key is left to [`Wallet`].
pub fn normalize_private_key(raw: &str) -> BlockchainResult<String> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(BlockchainError::Wallet("Private key is required".to_string()));
    }
    if key.starts_with("0x") || key.starts_with("0X") {
        Ok(format!("0x{}", &key[2..]))
    } else {
        Ok(format!("0x{}", key))
    }
}

/// Read the private key from `CHAIN_REACTION_PRIVATE_KEY`.
pub fn private_key_from_env() -> BlockchainResult<String> {
    std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
        BlockchainError::Wallet(format!(
            "Environment variable {} not set",
            PRIVATE_KEY_ENV_VAR
        ))
    })
}

/// Signing wallet bound to one chain.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for EIP-155 replay protection
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let normalized = normalize_private_key(private_key_hex)?;

        let signer: PrivateKeySigner = normalized[2..]
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;
        let signer = signer.with_chain_id(Some(chain_id));

        tracing::debug!(
            address = %signer.address(),
            chain_id = chain_id,
            "Wallet loaded"
        );

        Ok(Self { signer, chain_id })
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the chain ID this wallet is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Network wallet used to sign transaction requests.
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}
