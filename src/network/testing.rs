//! Scripted network client for unit tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::network::{NetworkClient, PreparedTx, Receipt, SubmittedTx};

pub(crate) const SENDER: Address = Address::repeat_byte(0xaa);
pub(crate) const TX_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub connect: AtomicU32,
    pub connect_wallet: AtomicU32,
    pub balance: AtomicU32,
    pub prepare: AtomicU32,
    pub submit: AtomicU32,
    pub receipt: AtomicU32,
}

/// What the client answers.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    pub balance: U256,
    pub fail_connect: bool,
    pub fail_balance: bool,
    pub fail_submit: bool,
    pub submitted_hash: String,
    /// Receipt queries that error before any other answer.
    pub failing_polls: u32,
    /// Receipt queries answering "pending" after the failing ones.
    pub pending_polls: u32,
    pub reverted: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            balance: U256::from(1_000_000_000_000_000_000u64),
            fail_connect: false,
            fail_balance: false,
            fail_submit: false,
            submitted_hash: TX_HASH.to_string(),
            failing_polls: 0,
            pending_polls: 0,
            reverted: false,
        }
    }
}

pub(crate) struct ScriptedClient {
    script: Script,
    calls: Arc<Calls>,
    address: Option<Address>,
}

impl ScriptedClient {
    pub fn new(script: Script) -> (Self, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        (
            Self {
                script,
                calls: calls.clone(),
                address: None,
            },
            calls,
        )
    }
}

#[async_trait]
impl NetworkClient for ScriptedClient {
    async fn connect(&mut self) -> BlockchainResult<()> {
        self.calls.connect.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_connect {
            return Err(BlockchainError::Rpc("connection refused".to_string()));
        }
        Ok(())
    }

    async fn connect_wallet(&mut self, private_key: &str) -> BlockchainResult<()> {
        self.calls.connect_wallet.fetch_add(1, Ordering::SeqCst);
        if !private_key.starts_with("0x") {
            return Err(BlockchainError::Wallet("expected 0x prefix".to_string()));
        }
        self.address = Some(SENDER);
        Ok(())
    }

    fn address(&self) -> Option<Address> {
        self.address
    }

    async fn balance(&self, _address: Address) -> BlockchainResult<U256> {
        self.calls.balance.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_balance {
            return Err(BlockchainError::Timeout(10));
        }
        Ok(self.script.balance)
    }

    async fn prepare_payment(&self, to: Address, value: U256) -> BlockchainResult<PreparedTx> {
        self.calls.prepare.fetch_add(1, Ordering::SeqCst);
        Ok(PreparedTx {
            to,
            value,
            nonce: 0,
            gas_limit: 21_000,
            hash: self.script.submitted_hash.clone(),
            raw: Bytes::from_static(&[0x01]),
        })
    }

    async fn submit(&self, tx: &PreparedTx) -> BlockchainResult<SubmittedTx> {
        self.calls.submit.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_submit {
            return Err(BlockchainError::Rpc("nonce too low".to_string()));
        }
        Ok(SubmittedTx {
            hash: tx.hash.clone(),
        })
    }

    async fn receipt(&self, hash: &str) -> BlockchainResult<Option<Receipt>> {
        let n = self.calls.receipt.fetch_add(1, Ordering::SeqCst);
        if n < self.script.failing_polls {
            return Err(BlockchainError::Rpc("bad gateway".to_string()));
        }
        if n < self.script.failing_polls.saturating_add(self.script.pending_polls) {
            return Ok(None);
        }
        Ok(Some(Receipt {
            hash: hash.to_string(),
            from: SENDER,
            to: None,
            block_number: Some(42),
            success: !self.script.reverted,
        }))
    }
}
