//! Confirmation polling.
//!
//! # Responsibilities
//! - Resolve a submitted hash to a receipt without busy-looping
//! - Retry on both "still pending" and RPC errors with the same fixed delay
//! - Stop on the optional ceiling or when the run is cancelled

use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::ConfirmationConfig;
use crate::error::ReactionError;
use crate::network::{NetworkClient, Receipt};
use crate::observability::metrics;

/// Polls a network for a transaction receipt at a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPoller {
    interval: Duration,
    ceiling: Option<Duration>,
}

impl Default for ConfirmationPoller {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, None)
    }
}

impl ConfirmationPoller {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    /// `ceiling` bounds the whole wait; `None` waits until cancelled.
    pub fn new(interval: Duration, ceiling: Option<Duration>) -> Self {
        Self { interval, ceiling }
    }

    pub fn from_config(config: &ConfirmationConfig) -> Self {
        Self::new(config.poll_interval(), config.ceiling())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ceiling(&self) -> Option<Duration> {
        self.ceiling
    }

    /// Wait until `hash` has a receipt on `network`.
    ///
    /// An empty hash fails immediately without querying the network.
    pub async fn wait(
        &self,
        client: &dyn NetworkClient,
        network: &str,
        hash: &str,
        cancel: &CancellationToken,
    ) -> Result<Receipt, ReactionError> {
        if hash.trim().is_empty() {
            return Err(ReactionError::InvalidHash {
                network: network.to_string(),
            });
        }

        let started = Instant::now();
        let polling = self.poll(client, network, hash);
        let bounded = async {
            match self.ceiling {
                Some(ceiling) => timeout(ceiling, polling).await.map_err(|_| ceiling),
                None => Ok(polling.await),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(network, tx_hash = hash, "Confirmation wait cancelled");
                Err(ReactionError::Cancelled {
                    network: network.to_string(),
                    hash: Some(hash.to_string()),
                })
            }
            result = bounded => match result {
                Ok(receipt) => {
                    metrics::record_confirmation_latency(network, started.elapsed());
                    Ok(receipt)
                }
                Err(waited) => {
                    tracing::warn!(network, tx_hash = hash, waited = ?waited, "Confirmation timed out");
                    Err(ReactionError::ConfirmationTimeout {
                        network: network.to_string(),
                        hash: hash.to_string(),
                        waited,
                    })
                }
            },
        }
    }

    async fn poll(&self, client: &dyn NetworkClient, network: &str, hash: &str) -> Receipt {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            metrics::record_poll_attempt(network);

            match client.receipt(hash).await {
                Ok(Some(receipt)) => {
                    tracing::info!(
                        network,
                        tx_hash = %receipt.hash,
                        from = %receipt.from,
                        block_number = ?receipt.block_number,
                        attempt,
                        "Transaction confirmed"
                    );
                    return receipt;
                }
                Ok(None) => {
                    tracing::debug!(network, tx_hash = hash, attempt, "Transaction pending");
                }
                Err(e) => {
                    tracing::warn!(network, tx_hash = hash, attempt, error = %e, "Receipt query failed, retrying");
                }
            }

            sleep(self.interval).await;
        }
    }
}
