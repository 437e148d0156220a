//! Shared stub networks for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use chain_reaction::blockchain::{BlockchainError, BlockchainResult};
use chain_reaction::config::NetworkConfig;
use chain_reaction::network::{ClientFactory, NetworkClient, PreparedTx, Receipt, SubmittedTx};

pub const PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const RECIPIENT: &str = "0xb2fe5d749254211c83e20120dC3731FEC57Fc784";
pub const SENDER: Address = Address::repeat_byte(0x5e);

/// One ether in wei.
pub const ONE_ETH: u128 = 1_000_000_000_000_000_000;

/// How a stub network behaves.
#[derive(Debug, Clone)]
pub struct Behavior {
    pub balance: U256,
    pub fail_connect: bool,
    pub fail_submit: bool,
    /// Receipt queries answering "pending" before the receipt appears.
    pub pending_polls: u32,
    pub reverted: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            balance: U256::from(ONE_ETH),
            fail_connect: false,
            fail_submit: false,
            pending_polls: 0,
            reverted: false,
        }
    }
}

/// Per-network call counters.
#[derive(Debug, Default)]
pub struct Counters {
    pub connect: AtomicU32,
    pub balance: AtomicU32,
    pub prepare: AtomicU32,
    pub submit: AtomicU32,
    pub receipt: AtomicU32,
}

impl Counters {
    /// Calls made after initialization: anything that spends or polls.
    pub fn send_phase_calls(&self) -> u32 {
        self.prepare.load(Ordering::SeqCst)
            + self.submit.load(Ordering::SeqCst)
            + self.receipt.load(Ordering::SeqCst)
    }
}

/// Factory handing out stub clients and keeping their counters.
#[derive(Default)]
pub struct StubFactory {
    behaviors: HashMap<String, Behavior>,
    counters: Mutex<HashMap<String, Arc<Counters>>>,
    /// Every submit, as `"<network>"`, in call order.
    submissions: Arc<Mutex<Vec<String>>>,
}

impl StubFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, network: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(network.to_string(), behavior);
        self
    }

    /// Counters of the most recent client created for `network`.
    pub fn counters(&self, network: &str) -> Arc<Counters> {
        self.counters
            .lock()
            .unwrap()
            .get(network)
            .cloned()
            .unwrap_or_default()
    }

    pub fn submissions(&self) -> Vec<String> {
        self.submissions.lock().unwrap().clone()
    }
}

impl ClientFactory for StubFactory {
    fn create(&self, network: &NetworkConfig) -> Box<dyn NetworkClient> {
        let counters = Arc::new(Counters::default());
        self.counters
            .lock()
            .unwrap()
            .insert(network.name.clone(), counters.clone());

        Box::new(StubClient {
            network: network.name.clone(),
            behavior: self.behaviors.get(&network.name).cloned().unwrap_or_default(),
            counters,
            submissions: self.submissions.clone(),
            address: None,
        })
    }
}

struct StubClient {
    network: String,
    behavior: Behavior,
    counters: Arc<Counters>,
    submissions: Arc<Mutex<Vec<String>>>,
    address: Option<Address>,
}

#[async_trait]
impl NetworkClient for StubClient {
    async fn connect(&mut self) -> BlockchainResult<()> {
        self.counters.connect.fetch_add(1, Ordering::SeqCst);
        if self.behavior.fail_connect {
            return Err(BlockchainError::Rpc(format!("{} unreachable", self.network)));
        }
        Ok(())
    }

    async fn connect_wallet(&mut self, _private_key: &str) -> BlockchainResult<()> {
        self.address = Some(SENDER);
        Ok(())
    }

    fn address(&self) -> Option<Address> {
        self.address
    }

    async fn balance(&self, _address: Address) -> BlockchainResult<U256> {
        self.counters.balance.fetch_add(1, Ordering::SeqCst);
        Ok(self.behavior.balance)
    }

    async fn prepare_payment(&self, to: Address, value: U256) -> BlockchainResult<PreparedTx> {
        let n = self.counters.prepare.fetch_add(1, Ordering::SeqCst);
        Ok(PreparedTx {
            to,
            value,
            nonce: n as u64,
            gas_limit: 21_000,
            hash: format!("0x{:064x}", n + 1),
            raw: Bytes::from_static(&[0x02]),
        })
    }

    async fn submit(&self, tx: &PreparedTx) -> BlockchainResult<SubmittedTx> {
        self.counters.submit.fetch_add(1, Ordering::SeqCst);
        self.submissions.lock().unwrap().push(self.network.clone());
        if self.behavior.fail_submit {
            return Err(BlockchainError::Rpc("replacement transaction underpriced".to_string()));
        }
        Ok(SubmittedTx {
            hash: tx.hash.clone(),
        })
    }

    async fn receipt(&self, hash: &str) -> BlockchainResult<Option<Receipt>> {
        let n = self.counters.receipt.fetch_add(1, Ordering::SeqCst);
        if n < self.behavior.pending_polls {
            return Ok(None);
        }
        Ok(Some(Receipt {
            hash: hash.to_string(),
            from: SENDER,
            to: None,
            block_number: Some(100 + n as u64),
            success: !self.behavior.reverted,
        }))
    }
}
