//! Per-network chain reaction sessions.
//!
//! # Lifecycle
//! ```text
//! Uninitialized → Connecting → Ready ──send──→ Pending ──confirm──→ Success
//!                      │                          │                    │
//!                      └──→ Failed ←──────────────┘          (re-sendable)
//! ```
//!
//! A session owns its client exclusively and never shares state with its
//! siblings. Its address is fixed once set; a different key needs a new
//! session.

pub mod poller;

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::normalize_private_key;
use crate::config::NetworkConfig;
use crate::error::ReactionError;
use crate::network::{ClientFactory, NetworkClient, Receipt};
use crate::observability::metrics;
use crate::transfer::{format_amount, parse_amount, Balance, TransferRequest, TransferResult};

pub use poller::ConfirmationPoller;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionStatus {
    Uninitialized,
    Connecting,
    Ready,
    Pending,
    Success,
    Failed,
}

impl SessionStatus {
    /// Whether a new send may start from this status.
    pub fn can_send(self) -> bool {
        matches!(self, Self::Ready | Self::Success)
    }

    fn is_connected(self) -> bool {
        matches!(self, Self::Ready | Self::Pending | Self::Success)
    }
}

/// A wallet session on one network.
pub struct ChainReaction {
    config: NetworkConfig,
    factory: Arc<dyn ClientFactory>,
    client: Option<Box<dyn NetworkClient>>,
    address: Option<Address>,
    status: SessionStatus,
    last_balance: Option<Balance>,
}

impl ChainReaction {
    /// Create an uninitialized session. The client is created on `initialize`.
    pub fn new(config: NetworkConfig, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            config,
            factory,
            client: None,
            address: None,
            status: SessionStatus::Uninitialized,
            last_balance: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    /// Most recent balance snapshot of the session's own address.
    pub fn last_balance(&self) -> Option<&Balance> {
        self.last_balance.as_ref()
    }

    /// Connect to the network and load the wallet.
    ///
    /// Failures leave the session `Failed`. The follow-up balance snapshot is
    /// best effort and never fails the call.
    pub async fn initialize(&mut self, private_key: &str) -> Result<Address, ReactionError> {
        if self.address.is_some() {
            return Err(ReactionError::AlreadyInitialized {
                network: self.config.name.clone(),
            });
        }

        self.status = SessionStatus::Connecting;
        tracing::info!(
            network = %self.config.name,
            rpc_url = %self.config.rpc_url,
            "Initializing session"
        );

        let (client, address) = match self.open_client(private_key).await {
            Ok(opened) => opened,
            Err(cause) => {
                self.status = SessionStatus::Failed;
                metrics::record_initialization(&self.config.name, false);
                tracing::error!(network = %self.config.name, error = %cause, "Initialization failed");
                return Err(ReactionError::Initialization {
                    network: self.config.name.clone(),
                    cause,
                });
            }
        };

        self.client = Some(client);
        self.address = Some(address);
        self.status = SessionStatus::Ready;
        metrics::record_initialization(&self.config.name, true);
        tracing::info!(network = %self.config.name, address = %address, "Session ready");

        if let Err(e) = self.refresh_balance().await {
            tracing::warn!(network = %self.config.name, error = %e, "Initial balance unavailable");
        }

        Ok(address)
    }

    async fn open_client(&self, private_key: &str) -> BlockchainResult<(Box<dyn NetworkClient>, Address)> {
        let key = normalize_private_key(private_key)?;

        let mut client = self.factory.create(&self.config);
        client.connect().await?;
        client.connect_wallet(&key).await?;

        let address = client
            .address()
            .ok_or_else(|| BlockchainError::Wallet("wallet reported no address".to_string()))?;
        Ok((client, address))
    }

    /// Current balance of `address`, formatted to six fractional digits.
    pub async fn balance(&self, address: Address) -> Result<Balance, ReactionError> {
        let client = self.connected_client().ok_or_else(|| ReactionError::BalanceQuery {
            network: self.config.name.clone(),
            cause: BlockchainError::NotConnected("session not ready"),
        })?;

        let raw = client
            .balance(address)
            .await
            .map_err(|cause| ReactionError::BalanceQuery {
                network: self.config.name.clone(),
                cause,
            })?;
        Ok(self.to_balance(raw))
    }

    /// Re-read the session's own balance and keep it as the latest snapshot.
    pub async fn refresh_balance(&mut self) -> Result<Balance, ReactionError> {
        let address = self.address.ok_or_else(|| self.not_ready("initialized"))?;
        let balance = self.balance(address).await?;
        tracing::info!(network = %self.config.name, balance = %balance, "Balance");
        self.last_balance = Some(balance.clone());
        Ok(balance)
    }

    /// Submit the transfer. Does not wait for confirmation.
    ///
    /// The sender's balance is checked first; when it cannot cover the amount
    /// nothing is submitted. Every failure past the status check leaves the
    /// session Failed.
    pub async fn send(&mut self, request: &TransferRequest) -> Result<TransferResult, ReactionError> {
        if !self.status.can_send() {
            return Err(self.not_ready("Ready or Success"));
        }
        self.status = SessionStatus::Pending;
        let outcome = match parse_amount(request.amount(), self.config.decimals) {
            Ok(value) => self.submit(request, value).await,
            Err(cause) => Err(ReactionError::InvalidAmount {
                network: self.config.name.clone(),
                cause,
            }),
        };
        match outcome {
            Ok(result) => Ok(result),
            Err(e) => {
                self.status = SessionStatus::Failed;
                metrics::record_transfer(&self.config.name, e.kind());
                tracing::error!(network = %self.config.name, error = %e, "Send failed");
                Err(e)
            }
        }
    }

    async fn submit(&self, request: &TransferRequest, value: U256) -> Result<TransferResult, ReactionError> {
        let network = &self.config.name;
        let (client, from) = match (self.client.as_deref(), self.address) {
            (Some(client), Some(from)) => (client, from),
            _ => return Err(self.not_ready("initialized")),
        };

        let available = client
            .balance(from)
            .await
            .map_err(|cause| ReactionError::BalanceQuery {
                network: network.clone(),
                cause,
            })?;
        if available < value {
            return Err(ReactionError::InsufficientFunds {
                network: network.clone(),
                have: format_amount(available, self.config.decimals),
                need: request.amount().to_string(),
            });
        }

        tracing::info!(
            network = %network,
            to = %request.recipient(),
            amount = request.amount(),
            symbol = %self.config.symbol,
            "Sending transaction"
        );

        let submission = |cause| ReactionError::Submission {
            network: network.clone(),
            cause,
        };
        let prepared = client
            .prepare_payment(request.recipient(), value)
            .await
            .map_err(submission)?;
        let submitted = client.submit(&prepared).await.map_err(submission)?;

        tracing::info!(network = %network, tx_hash = %submitted.hash, "Transaction sent");

        Ok(TransferResult {
            network: network.clone(),
            hash: submitted.hash,
            from,
            recipient: request.recipient(),
            amount: request.amount().to_string(),
            confirmed_block: None,
            status: SessionStatus::Pending,
        })
    }

    /// Wait for a pending transfer to resolve and record the outcome on both
    /// the session and `result`.
    pub async fn confirm(
        &mut self,
        poller: &ConfirmationPoller,
        result: &mut TransferResult,
        cancel: &CancellationToken,
    ) -> Result<Receipt, ReactionError> {
        if self.status != SessionStatus::Pending {
            return Err(self.not_ready("Pending"));
        }
        let client = self.client.as_deref().ok_or_else(|| self.not_ready("initialized"))?;

        let outcome = poller.wait(client, &self.config.name, &result.hash, cancel).await;
        let outcome = match outcome {
            Ok(receipt) if !receipt.success => Err(ReactionError::Reverted {
                network: self.config.name.clone(),
                hash: result.hash.clone(),
                block: receipt.block_number,
            }),
            other => other,
        };

        match outcome {
            Ok(receipt) => {
                self.status = SessionStatus::Success;
                result.status = SessionStatus::Success;
                result.confirmed_block = receipt.block_number;
                metrics::record_transfer(&self.config.name, "success");
                Ok(receipt)
            }
            Err(e) => {
                self.status = SessionStatus::Failed;
                result.status = SessionStatus::Failed;
                if let ReactionError::Reverted { block, .. } = &e {
                    result.confirmed_block = *block;
                }
                metrics::record_transfer(&self.config.name, e.kind());
                tracing::error!(network = %self.config.name, tx_hash = %result.hash, error = %e, "Confirmation failed");
                Err(e)
            }
        }
    }

    /// Mark the session failed from outside, e.g. when a run is cancelled
    /// before its send starts.
    pub(crate) fn mark_failed(&mut self) {
        self.status = SessionStatus::Failed;
    }

    fn connected_client(&self) -> Option<&dyn NetworkClient> {
        if self.status.is_connected() {
            self.client.as_deref()
        } else {
            None
        }
    }

    fn to_balance(&self, raw: U256) -> Balance {
        Balance::new(raw, self.config.decimals, &self.config.symbol)
    }

    fn not_ready(&self, expected: &'static str) -> ReactionError {
        ReactionError::NotReady {
            network: self.config.name.clone(),
            status: self.status,
            expected,
        }
    }
}

impl std::fmt::Debug for ChainReaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainReaction")
            .field("network", &self.config.name)
            .field("chain_id", &self.config.chain_id)
            .field("status", &self.status)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
