//! Error types for sessions and orchestration.
//!
//! Every failure that happens on a network carries that network's name so
//! callers can match on the kind instead of parsing messages.

use std::time::Duration;

use thiserror::Error;

use crate::blockchain::types::BlockchainError;
use crate::reaction::SessionStatus;
use crate::transfer::TransferResult;

/// A transfer request rejected before touching any network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("invalid recipient address '{0}'")]
    InvalidRecipient(String),

    #[error("invalid amount '{amount}': {reason}")]
    InvalidAmount { amount: String, reason: String },
}

/// Errors raised by a chain reaction session or the orchestrator.
#[derive(Debug, Error)]
pub enum ReactionError {
    /// Connecting or loading the wallet failed. Not retried.
    #[error("[{network}] initialization failed: {cause}")]
    Initialization {
        network: String,
        #[source]
        cause: BlockchainError,
    },

    /// The session already holds an address; a new key needs a new session.
    #[error("[{network}] session already initialized")]
    AlreadyInitialized { network: String },

    #[error("[{network}] balance query failed: {cause}")]
    BalanceQuery {
        network: String,
        #[source]
        cause: BlockchainError,
    },

    /// The session is not in a state that allows the operation.
    #[error("[{network}] session is {status:?}, expected {expected}")]
    NotReady {
        network: String,
        status: SessionStatus,
        expected: &'static str,
    },

    /// The amount cannot be expressed in this network's currency.
    #[error("[{network}] {cause}")]
    InvalidAmount {
        network: String,
        #[source]
        cause: RequestError,
    },

    /// Detected locally; nothing was submitted.
    #[error("[{network}] insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        network: String,
        have: String,
        need: String,
    },

    /// Preparing or broadcasting the payment failed. Whether it reached the
    /// chain is unknown.
    #[error("[{network}] submission failed: {cause}")]
    Submission {
        network: String,
        #[source]
        cause: BlockchainError,
    },

    #[error("[{network}] cannot wait for confirmation: transaction hash is empty")]
    InvalidHash { network: String },

    /// Included on chain but reverted.
    #[error("[{network}] transaction {hash} reverted in block {block:?}")]
    Reverted {
        network: String,
        hash: String,
        block: Option<u64>,
    },

    #[error("[{network}] transaction {hash} not confirmed after {waited:?}")]
    ConfirmationTimeout {
        network: String,
        hash: String,
        waited: Duration,
    },

    /// The run was cancelled; `hash` is set when a transaction was in flight.
    #[error("[{network}] cancelled")]
    Cancelled { network: String, hash: Option<String> },

    #[error("invalid transfer request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("orchestrator not initialized")]
    NotInitialized,

    /// An earlier run was dropped mid-flight. `pending` lists the networks
    /// whose transaction outcome is unknown; they are now Failed.
    #[error("previous transfer run was interrupted; outcome unknown on {pending:?}")]
    RunInterrupted { pending: Vec<String> },

    #[error("no network is ready to send")]
    NoReadySessions,
}

impl ReactionError {
    /// Name of the network that produced the error, if any.
    pub fn network(&self) -> Option<&str> {
        match self {
            Self::Initialization { network, .. }
            | Self::AlreadyInitialized { network }
            | Self::BalanceQuery { network, .. }
            | Self::NotReady { network, .. }
            | Self::InvalidAmount { network, .. }
            | Self::InsufficientFunds { network, .. }
            | Self::Submission { network, .. }
            | Self::InvalidHash { network }
            | Self::Reverted { network, .. }
            | Self::ConfirmationTimeout { network, .. }
            | Self::Cancelled { network, .. } => Some(network),
            Self::InvalidRequest(_)
            | Self::NotInitialized
            | Self::RunInterrupted { .. }
            | Self::NoReadySessions => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initialization { .. } => "initialization",
            Self::AlreadyInitialized { .. } => "already_initialized",
            Self::BalanceQuery { .. } => "balance_query",
            Self::NotReady { .. } => "not_ready",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::Submission { .. } => "submission",
            Self::InvalidHash { .. } => "invalid_hash",
            Self::Reverted { .. } => "reverted",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotInitialized => "not_initialized",
            Self::RunInterrupted { .. } => "run_interrupted",
            Self::NoReadySessions => "no_ready_sessions",
        }
    }
}

/// A transfer run that stopped early.
///
/// `completed` holds the results of every network that succeeded before
/// `error` was raised, in configuration order.
#[derive(Debug, Error)]
#[error("transfer run aborted after {} completed network(s): {error}", .completed.len())]
pub struct RunFailure {
    pub completed: Vec<TransferResult>,
    #[source]
    pub error: ReactionError,
}
