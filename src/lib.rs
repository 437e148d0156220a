//! Chain Reaction: replay one native-currency transfer across several EVM networks.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   private key   │              ReactionOrchestrator             │
//!   ──────────────┼─▶ initialize_all ──▶ ChainReaction (per net)  │
//!                 │                        │                      │
//!   recipient,    │                        ▼                      │
//!   amount        │   run_transfer ──▶ send ──▶ ConfirmationPoller│
//!   ──────────────┼─▶  (sequential,       │                       │
//!                 │   stop at first       ▼                       │
//!                 │   failure)       NetworkClient ──────────────┼──▶ RPC
//!                 └──────────────────────────────────────────────┘
//! ```

pub mod blockchain;
pub mod config;
pub mod error;
pub mod network;
pub mod observability;
pub mod orchestrator;
pub mod reaction;
pub mod transfer;

pub use blockchain::EvmClientFactory;
pub use config::ReactionConfig;
pub use error::{ReactionError, RequestError, RunFailure};
pub use network::{ClientFactory, NetworkClient};
pub use orchestrator::{InitReport, ReactionOrchestrator, RunState};
pub use reaction::{ChainReaction, ConfirmationPoller, SessionStatus};
pub use transfer::{TransferRequest, TransferResult};
