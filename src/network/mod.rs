//! Network client capability.
//!
//! Every network a transfer is replayed on sits behind [`NetworkClient`].
//! Sessions never reach for a concrete RPC stack; they receive a client from
//! a [`ClientFactory`] when they initialize, which lets the whole core run
//! against scripted stubs.

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::Serialize;

use crate::blockchain::types::BlockchainResult;
use crate::config::NetworkConfig;

/// A signed, ready-to-broadcast payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTx {
    pub to: Address,
    /// Amount in base units.
    pub value: U256,
    pub nonce: u64,
    pub gas_limit: u64,
    /// Hash of the signed payload.
    pub hash: String,
    /// EIP-2718 encoded signed transaction.
    pub raw: Bytes,
}

/// Acknowledgement of a broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTx {
    pub hash: String,
}

/// Record of a transaction included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub hash: String,
    pub from: Address,
    pub to: Option<Address>,
    pub block_number: Option<u64>,
    /// False when the transaction was included but reverted.
    pub success: bool,
}

/// Capability interface over one network's RPC endpoint.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Open the RPC connection.
    async fn connect(&mut self) -> BlockchainResult<()>;

    /// Load the signing key. Requires a prior `connect`.
    async fn connect_wallet(&mut self, private_key: &str) -> BlockchainResult<()>;

    /// Address of the loaded wallet, if any.
    fn address(&self) -> Option<Address>;

    /// Native balance of `address`, in base units.
    async fn balance(&self, address: Address) -> BlockchainResult<U256>;

    /// Build and sign a native transfer of `value` base units to `to`.
    async fn prepare_payment(&self, to: Address, value: U256) -> BlockchainResult<PreparedTx>;

    /// Broadcast a prepared transaction.
    async fn submit(&self, tx: &PreparedTx) -> BlockchainResult<SubmittedTx>;

    /// Fetch the receipt for `hash`. `None` while the transaction is pending.
    async fn receipt(&self, hash: &str) -> BlockchainResult<Option<Receipt>>;
}

/// Creates the client a session will own.
pub trait ClientFactory: Send + Sync {
    fn create(&self, network: &NetworkConfig) -> Box<dyn NetworkClient>;
}

impl<F> ClientFactory for F
where
    F: Fn(&NetworkConfig) -> Box<dyn NetworkClient> + Send + Sync,
{
    fn create(&self, network: &NetworkConfig) -> Box<dyn NetworkClient> {
        self(network)
    }
}

#[cfg(test)]
pub(crate) mod testing;
