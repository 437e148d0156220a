//! EVM network client over alloy HTTP providers.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint (plus failovers) and verify the chain
//! - Query chain state (balances, nonces, gas price, receipts)
//! - Sign and broadcast native payments
//! - Handle timeouts and network errors gracefully

use std::future::Future;
use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::transaction::{apply_gas_policy, sign_payment, PaymentParams};
use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId};
use crate::blockchain::wallet::Wallet;
use crate::config::{NetworkConfig, RpcConfig};
use crate::network::{ClientFactory, NetworkClient, PreparedTx, Receipt, SubmittedTx};

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// RPC client for one EVM network, with failover for read calls.
pub struct EvmClient {
    network: NetworkConfig,
    rpc: RpcConfig,
    /// Primary provider first, then failovers. Empty until `connect`.
    providers: Vec<SharedProvider>,
    wallet: Option<Wallet>,
}

impl EvmClient {
    /// Create an unconnected client. No I/O happens until `connect`.
    pub fn new(network: NetworkConfig, rpc: RpcConfig) -> Self {
        Self {
            network,
            rpc,
            providers: Vec::new(),
            wallet: None,
        }
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.read("get_chain_id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.network.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.network.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Run a read call against each provider in turn until one answers.
    async fn read<T, E, F, Fut>(&self, op: &'static str, call: F) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if self.providers.is_empty() {
            return Err(BlockchainError::NotConnected("call connect first"));
        }

        let mut last_error = None;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.rpc.timeout(), call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(
                        network = %self.network.name,
                        provider_idx = i,
                        op,
                        error = %e,
                        "RPC error, trying next provider"
                    );
                    last_error = Some(BlockchainError::Rpc(format!("{} failed: {}", op, e)));
                }
                Err(_) => {
                    tracing::warn!(
                        network = %self.network.name,
                        provider_idx = i,
                        op,
                        "RPC timeout, trying next provider"
                    );
                    last_error = Some(BlockchainError::Timeout(self.rpc.timeout_secs));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| BlockchainError::Rpc(format!("All RPC providers failed: {}", op))))
    }

    fn wallet(&self) -> BlockchainResult<&Wallet> {
        self.wallet
            .as_ref()
            .ok_or(BlockchainError::NotConnected("call connect_wallet first"))
    }
}

#[async_trait]
impl NetworkClient for EvmClient {
    async fn connect(&mut self) -> BlockchainResult<()> {
        let mut providers = Vec::new();

        let primary_url: url::Url = self.network.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", self.network.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as SharedProvider);

        for url_str in &self.network.failover_urls {
            match url_str.parse::<url::Url>() {
                Ok(url) => providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as SharedProvider),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        self.providers = providers;

        if let Err(e) = self.verify_chain_id().await {
            self.providers.clear();
            return Err(e);
        }

        tracing::info!(
            network = %self.network.name,
            rpc_url = %self.network.rpc_url,
            chain_id = self.network.chain_id,
            "RPC client connected"
        );
        Ok(())
    }

    async fn connect_wallet(&mut self, private_key: &str) -> BlockchainResult<()> {
        if self.providers.is_empty() {
            return Err(BlockchainError::NotConnected("call connect first"));
        }
        self.wallet = Some(Wallet::from_private_key(private_key, self.network.chain_id)?);
        Ok(())
    }

    fn address(&self) -> Option<Address> {
        self.wallet.as_ref().map(Wallet::address)
    }

    async fn balance(&self, address: Address) -> BlockchainResult<U256> {
        self.read("get_balance", |p| async move { p.get_balance(address).await })
            .await
    }

    async fn prepare_payment(&self, to: Address, value: U256) -> BlockchainResult<PreparedTx> {
        let wallet = self.wallet()?;
        let from = wallet.address();

        let nonce = self
            .read("get_transaction_count", |p| async move {
                p.get_transaction_count(from).pending().await
            })
            .await?;
        let gas_price = self
            .read("get_gas_price", |p| async move { p.get_gas_price().await })
            .await?;
        let gas_price = apply_gas_policy(gas_price, &self.rpc)?;

        let params = PaymentParams {
            to,
            value,
            nonce,
            gas_price,
            gas_limit: self.rpc.gas_limit,
        };
        let (hash, raw) = sign_payment(wallet, &params).await?;

        tracing::debug!(
            network = %self.network.name,
            tx_hash = %hash,
            nonce,
            gas_price,
            "Payment prepared"
        );

        Ok(PreparedTx {
            to,
            value,
            nonce,
            gas_limit: params.gas_limit,
            hash: hash.to_string(),
            raw,
        })
    }

    async fn submit(&self, tx: &PreparedTx) -> BlockchainResult<SubmittedTx> {
        // Broadcast through the primary only; a broadcast is never repeated.
        let provider = self
            .providers
            .first()
            .ok_or(BlockchainError::NotConnected("call connect first"))?;

        let pending = timeout(self.rpc.timeout(), provider.send_raw_transaction(&tx.raw))
            .await
            .map_err(|_| BlockchainError::Timeout(self.rpc.timeout_secs))?
            .map_err(|e| BlockchainError::Rpc(format!("send_raw_transaction failed: {}", e)))?;

        Ok(SubmittedTx {
            hash: pending.tx_hash().to_string(),
        })
    }

    async fn receipt(&self, hash: &str) -> BlockchainResult<Option<Receipt>> {
        let tx_hash: TxHash = hash
            .parse()
            .map_err(|_| BlockchainError::InvalidHash(hash.to_string()))?;

        let receipt = self
            .read("get_transaction_receipt", |p| async move {
                p.get_transaction_receipt(tx_hash).await
            })
            .await?;

        Ok(receipt.map(|r| Receipt {
            hash: r.transaction_hash.to_string(),
            from: r.from,
            to: r.to,
            block_number: r.block_number,
            success: r.status(),
        }))
    }
}

impl std::fmt::Debug for EvmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmClient")
            .field("network", &self.network.name)
            .field("rpc_url", &self.network.rpc_url)
            .field("chain_id", &self.network.chain_id)
            .field("connected", &!self.providers.is_empty())
            .field("wallet", &self.address())
            .finish()
    }
}

/// Builds unconnected [`EvmClient`]s sharing one RPC configuration.
#[derive(Debug, Clone, Default)]
pub struct EvmClientFactory {
    rpc: RpcConfig,
}

impl EvmClientFactory {
    pub fn new(rpc: RpcConfig) -> Self {
        Self { rpc }
    }
}

impl ClientFactory for EvmClientFactory {
    fn create(&self, network: &NetworkConfig) -> Box<dyn NetworkClient> {
        Box::new(EvmClient::new(network.clone(), self.rpc.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn test_client() -> EvmClient {
        EvmClient::new(
            NetworkConfig::new("Anvil", "http://127.0.0.1:1", 31337),
            RpcConfig {
                timeout_secs: 1,
                ..RpcConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_calls_before_connect_fail() {
        let client = test_client();
        let result = client.balance(Address::ZERO).await;
        assert!(matches!(result, Err(BlockchainError::NotConnected(_))));
        assert!(client.address().is_none());
    }

    #[tokio::test]
    async fn test_wallet_requires_connection() {
        let mut client = test_client();
        let result = client.connect_wallet(TEST_PRIVATE_KEY).await;
        assert!(matches!(result, Err(BlockchainError::NotConnected(_))));
    }

    #[tokio::test]
    async fn test_connect_unreachable_fails() {
        let mut client = test_client();
        assert!(client.connect().await.is_err());
        // A failed connect leaves no providers behind.
        assert!(matches!(
            client.balance(Address::ZERO).await,
            Err(BlockchainError::NotConnected(_))
        ));
    }

    #[tokio::test]
    async fn test_receipt_rejects_malformed_hash() {
        let client = test_client();
        let result = client.receipt("0x1234").await;
        assert!(matches!(result, Err(BlockchainError::InvalidHash(_))));
    }

    #[test]
    fn test_factory_creates_unconnected_client() {
        let factory = EvmClientFactory::default();
        let client = factory.create(&NetworkConfig::new("Anvil", "http://127.0.0.1:8545", 31337));
        assert!(client.address().is_none());
    }
}
