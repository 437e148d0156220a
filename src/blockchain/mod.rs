//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key)
//!     → wallet.rs (key normalization, signer)
//!     → client.rs (RPC connection with timeouts, NetworkClient impl)
//!     → transaction.rs (gas policy, build, sign)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Signed payments are broadcast once, never re-sent

pub mod client;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{EvmClient, EvmClientFactory};
pub use types::{BlockchainError, BlockchainResult, ChainId};
pub use wallet::Wallet;
