//! Multi-network transfer orchestration.
//!
//! # Data Flow
//! ```text
//! initialize_all(key)
//!     → every session initializes concurrently; failures are recorded, not fatal
//! run_transfer(recipient, amount)
//!     → request validated once
//!     → for each Ready session, in configuration order:
//!           send → confirm → next
//!     → first failure stops the run; later networks are never touched
//! ```
//!
//! # Design Decisions
//! - Sends are strictly sequential: one key, one in-flight transaction at a time
//! - No rollback: a partial run is a valid terminal state and is reported as such
//! - A new `initialize_all` builds new sessions instead of mutating old ones

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::validation::validate_networks;
use crate::config::{ConfigError, NetworkConfig};
use crate::error::{ReactionError, RunFailure};
use crate::network::ClientFactory;
use crate::reaction::{ChainReaction, ConfirmationPoller, SessionStatus};
use crate::transfer::{Balance, TransferRequest, TransferResult};

/// Where the orchestrator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    NotStarted,
    Initializing,
    Ready,
    Sending,
    Completed,
    Aborted,
}

/// Outcome of `initialize_all`.
#[derive(Debug, Default)]
pub struct InitReport {
    /// Networks that reached Ready, in configuration order.
    pub ready: Vec<String>,
    /// One error per network that failed, in configuration order.
    pub failures: Vec<ReactionError>,
}

impl InitReport {
    pub fn all_ready(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Read-only view of a session for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub network: String,
    pub chain_id: u64,
    pub status: SessionStatus,
    pub address: Option<String>,
    pub balance: Option<Balance>,
}

/// Drives an ordered set of chain reactions through a transfer.
pub struct ReactionOrchestrator {
    networks: Vec<NetworkConfig>,
    factory: Arc<dyn ClientFactory>,
    poller: ConfirmationPoller,
    sessions: Vec<ChainReaction>,
    state: RunState,
    results: Vec<TransferResult>,
}

impl ReactionOrchestrator {
    /// Create an orchestrator with one uninitialized session per network.
    ///
    /// The list must be non-empty with unique names.
    pub fn new(
        networks: Vec<NetworkConfig>,
        factory: Arc<dyn ClientFactory>,
        poller: ConfirmationPoller,
    ) -> Result<Self, ConfigError> {
        validate_networks(&networks).map_err(ConfigError::Validation)?;

        let mut orchestrator = Self {
            networks,
            factory,
            poller,
            sessions: Vec::new(),
            state: RunState::NotStarted,
            results: Vec::new(),
        };
        orchestrator.sessions = orchestrator.fresh_sessions();
        Ok(orchestrator)
    }

    fn fresh_sessions(&self) -> Vec<ChainReaction> {
        self.networks
            .iter()
            .map(|network| ChainReaction::new(network.clone(), self.factory.clone()))
            .collect()
    }

    /// Initialize every network independently.
    ///
    /// A failing network does not block its siblings; only the networks
    /// that reach Ready take part in later transfers.
    pub async fn initialize_all(&mut self, private_key: &str) -> InitReport {
        self.sessions = self.fresh_sessions();
        self.results.clear();
        self.state = RunState::Initializing;

        tracing::info!(networks = self.sessions.len(), "Initializing networks");

        let outcomes = join_all(
            self.sessions
                .iter_mut()
                .map(|session| session.initialize(private_key)),
        )
        .await;

        let mut report = InitReport::default();
        for (session, outcome) in self.sessions.iter().zip(outcomes) {
            match outcome {
                Ok(_) => report.ready.push(session.name().to_string()),
                Err(e) => report.failures.push(e),
            }
        }

        self.state = if report.ready.is_empty() {
            RunState::Aborted
        } else {
            RunState::Ready
        };

        tracing::info!(
            ready = report.ready.len(),
            failed = report.failures.len(),
            "Initialization finished"
        );
        report
    }

    /// Send `amount` to `recipient` on every ready network, one after the
    /// other, stopping at the first failure.
    pub async fn run_transfer(
        &mut self,
        recipient: &str,
        amount: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TransferResult>, RunFailure> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("transfer_run", %run_id);
        self.run(recipient, amount, cancel).instrument(span).await
    }

    async fn run(
        &mut self,
        recipient: &str,
        amount: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TransferResult>, RunFailure> {
        let request = match TransferRequest::new(recipient, amount) {
            Ok(request) => request,
            Err(e) => {
                return Err(RunFailure {
                    completed: Vec::new(),
                    error: e.into(),
                })
            }
        };

        match self.state {
            RunState::Ready | RunState::Completed | RunState::Aborted => {}
            RunState::Sending => {
                return Err(RunFailure {
                    completed: Vec::new(),
                    error: self.recover_interrupted(),
                })
            }
            _ => {
                return Err(RunFailure {
                    completed: Vec::new(),
                    error: ReactionError::NotInitialized,
                })
            }
        }
        if !self.sessions.iter().any(|s| s.status().can_send()) {
            return Err(RunFailure {
                completed: Vec::new(),
                error: ReactionError::NoReadySessions,
            });
        }

        self.results.clear();
        self.state = RunState::Sending;
        tracing::info!(
            recipient = %request.recipient(),
            amount = request.amount(),
            "Starting transfer run"
        );

        if let Err(e) = self.send_each(&request, cancel).await {
            return Err(self.abort(e));
        }

        self.state = RunState::Completed;
        tracing::info!(
            completed = self.results.len(),
            all_succeeded = self.all_succeeded(),
            "Transfer run completed"
        );
        Ok(self.results.clone())
    }

    async fn send_each(
        &mut self,
        request: &TransferRequest,
        cancel: &CancellationToken,
    ) -> Result<(), ReactionError> {
        for session in self.sessions.iter_mut() {
            if !session.status().can_send() {
                tracing::info!(network = session.name(), status = ?session.status(), "Skipping network");
                continue;
            }

            if cancel.is_cancelled() {
                session.mark_failed();
                return Err(ReactionError::Cancelled {
                    network: session.name().to_string(),
                    hash: None,
                });
            }

            let mut result = session.send(request).await?;
            session.confirm(&self.poller, &mut result, cancel).await?;

            if let Err(e) = session.refresh_balance().await {
                tracing::warn!(network = session.name(), error = %e, "Balance refresh failed");
            }
            self.results.push(result);
        }
        Ok(())
    }

    /// `run_transfer` holds `&mut self`, so finding `Sending` here means the
    /// previous run's future was dropped, typically by a caller deadline.
    /// Sessions it left Pending may or may not have broadcast.
    fn recover_interrupted(&mut self) -> ReactionError {
        let mut pending = Vec::new();
        for session in self.sessions.iter_mut() {
            if session.status() == SessionStatus::Pending {
                session.mark_failed();
                pending.push(session.name().to_string());
            }
        }
        self.state = RunState::Aborted;
        tracing::warn!(pending = ?pending, "Previous transfer run was interrupted");
        ReactionError::RunInterrupted { pending }
    }

    fn abort(&mut self, error: ReactionError) -> RunFailure {
        self.state = RunState::Aborted;
        tracing::error!(
            network = error.network().unwrap_or("-"),
            completed = self.results.len(),
            error = %error,
            "Transfer run aborted"
        );
        RunFailure {
            completed: self.results.clone(),
            error,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Results of the latest run, in configuration order.
    pub fn results(&self) -> &[TransferResult] {
        &self.results
    }

    /// True iff every configured network reached Success.
    pub fn all_succeeded(&self) -> bool {
        self.sessions
            .iter()
            .all(|s| s.status() == SessionStatus::Success)
    }

    pub fn session(&self, name: &str) -> Option<&ChainReaction> {
        self.sessions.iter().find(|s| s.name() == name)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &ChainReaction> {
        self.sessions.iter()
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        self.sessions
            .iter()
            .map(|s| SessionSnapshot {
                network: s.name().to_string(),
                chain_id: s.config().chain_id,
                status: s.status(),
                address: s.address().map(|a| a.to_checksum(None)),
                balance: s.last_balance().cloned(),
            })
            .collect()
    }
}

impl std::fmt::Debug for ReactionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionOrchestrator")
            .field("state", &self.state)
            .field("sessions", &self.sessions)
            .field("results", &self.results.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::testing::{Script, ScriptedClient};
    use crate::network::NetworkClient;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const RECIPIENT: &str = "0xb2fe5d749254211c83e20120dC3731FEC57Fc784";

    fn factory() -> Arc<dyn ClientFactory> {
        Arc::new(|network: &NetworkConfig| -> Box<dyn NetworkClient> {
            let script = Script {
                fail_connect: network.name == "down",
                pending_polls: if network.name == "slow" { u32::MAX } else { 0 },
                ..Script::default()
            };
            Box::new(ScriptedClient::new(script).0)
        })
    }

    fn networks(names: &[&str]) -> Vec<NetworkConfig> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| NetworkConfig::new(*name, "http://localhost:8545", i as u64 + 1))
            .collect()
    }

    fn orchestrator(names: &[&str]) -> ReactionOrchestrator {
        ReactionOrchestrator::new(networks(names), factory(), ConfirmationPoller::default()).unwrap()
    }

    #[test]
    fn test_new_rejects_empty_and_duplicate_networks() {
        let poller = ConfirmationPoller::default();
        assert!(ReactionOrchestrator::new(Vec::new(), factory(), poller).is_err());
        assert!(ReactionOrchestrator::new(networks(&["A", "A"]), factory(), poller).is_err());
    }

    #[test]
    fn test_new_sessions_start_uninitialized() {
        let orchestrator = orchestrator(&["A", "B"]);
        assert_eq!(orchestrator.state(), RunState::NotStarted);
        assert!(orchestrator
            .sessions()
            .all(|s| s.status() == SessionStatus::Uninitialized));
        assert!(!orchestrator.all_succeeded());
    }

    #[tokio::test]
    async fn test_run_before_initialize() {
        let mut orchestrator = orchestrator(&["A"]);
        let failure = orchestrator
            .run_transfer(RECIPIENT, "0.01", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(failure.error, ReactionError::NotInitialized));
    }

    #[tokio::test]
    async fn test_initialize_all_partial_readiness() {
        let mut orchestrator = orchestrator(&["A", "down", "C"]);
        let report = orchestrator.initialize_all(KEY).await;

        assert_eq!(report.ready, vec!["A".to_string(), "C".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].network(), Some("down"));
        assert!(!report.all_ready());
        assert_eq!(orchestrator.state(), RunState::Ready);
        assert_eq!(
            orchestrator.session("down").unwrap().status(),
            SessionStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_initialize_all_nothing_ready() {
        let mut orchestrator = orchestrator(&["down"]);
        let report = orchestrator.initialize_all(KEY).await;
        assert!(report.ready.is_empty());
        assert_eq!(orchestrator.state(), RunState::Aborted);

        let failure = orchestrator
            .run_transfer(RECIPIENT, "0.01", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(failure.error, ReactionError::NoReadySessions));
    }

    #[tokio::test]
    async fn test_invalid_request_touches_no_session() {
        let mut orchestrator = orchestrator(&["A"]);
        orchestrator.initialize_all(KEY).await;

        let failure = orchestrator
            .run_transfer("0x1234", "0.01", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(failure.error, ReactionError::InvalidRequest(_)));
        assert_eq!(orchestrator.session("A").unwrap().status(), SessionStatus::Ready);
        assert_eq!(orchestrator.state(), RunState::Ready);
    }

    #[tokio::test]
    async fn test_failed_network_is_skipped_when_sending() {
        let mut orchestrator = orchestrator(&["A", "down", "C"]);
        orchestrator.initialize_all(KEY).await;

        let results = orchestrator
            .run_transfer(RECIPIENT, "0.01", &CancellationToken::new())
            .await
            .unwrap();

        let names: Vec<_> = results.iter().map(|r| r.network.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(orchestrator.state(), RunState::Completed);
        assert!(!orchestrator.all_succeeded());
    }

    #[tokio::test]
    async fn test_cancelled_run_stops_before_sending() {
        let mut orchestrator = orchestrator(&["A", "B"]);
        orchestrator.initialize_all(KEY).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let failure = orchestrator
            .run_transfer(RECIPIENT, "0.01", &cancel)
            .await
            .unwrap_err();

        assert!(failure.completed.is_empty());
        assert!(matches!(failure.error, ReactionError::Cancelled { ref network, .. } if network == "A"));
        assert_eq!(orchestrator.state(), RunState::Aborted);
        assert_eq!(orchestrator.session("B").unwrap().status(), SessionStatus::Ready);
    }

    #[tokio::test]
    async fn test_reinitialize_builds_new_sessions() {
        let mut orchestrator = orchestrator(&["A"]);
        orchestrator.initialize_all(KEY).await;
        orchestrator
            .run_transfer(RECIPIENT, "0.01", &CancellationToken::new())
            .await
            .unwrap();
        assert!(orchestrator.all_succeeded());

        orchestrator.initialize_all(KEY).await;
        assert_eq!(orchestrator.session("A").unwrap().status(), SessionStatus::Ready);
        assert!(orchestrator.results().is_empty());
    }

    #[tokio::test]
    async fn test_snapshots_report_address_and_balance() {
        let mut orchestrator = orchestrator(&["A"]);
        orchestrator.initialize_all(KEY).await;

        let snapshots = orchestrator.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].status, SessionStatus::Ready);
        assert!(snapshots[0].address.is_some());
        assert_eq!(snapshots[0].balance.as_ref().unwrap().formatted, "1.000000");
    }

    #[tokio::test]
    async fn test_amount_too_precise_fails_session_and_stops_run() {
        let mut list = networks(&["A", "B"]);
        list[0].decimals = 6;
        let mut orchestrator =
            ReactionOrchestrator::new(list, factory(), ConfirmationPoller::default()).unwrap();
        orchestrator.initialize_all(KEY).await;

        let failure = orchestrator
            .run_transfer(RECIPIENT, "0.0000001", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(failure.completed.is_empty());
        assert!(matches!(failure.error, ReactionError::InvalidAmount { ref network, .. } if network == "A"));
        assert_eq!(orchestrator.state(), RunState::Aborted);
        assert_eq!(orchestrator.session("A").unwrap().status(), SessionStatus::Failed);
        assert_eq!(orchestrator.session("B").unwrap().status(), SessionStatus::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_is_reported_as_interrupted() {
        let mut orchestrator = orchestrator(&["slow", "B"]);
        orchestrator.initialize_all(KEY).await;

        let cancel = CancellationToken::new();
        let deadline = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            orchestrator.run_transfer(RECIPIENT, "0.01", &cancel),
        )
        .await;
        assert!(deadline.is_err());
        assert_eq!(orchestrator.state(), RunState::Sending);

        let failure = orchestrator
            .run_transfer(RECIPIENT, "0.01", &cancel)
            .await
            .unwrap_err();
        match failure.error {
            ReactionError::RunInterrupted { pending } => assert_eq!(pending, vec!["slow"]),
            other => panic!("expected interrupted run, got {:?}", other),
        }
        assert_eq!(orchestrator.state(), RunState::Aborted);
        assert_eq!(orchestrator.session("slow").unwrap().status(), SessionStatus::Failed);

        // The next run proceeds over the sessions that are still sendable.
        let results = orchestrator
            .run_transfer(RECIPIENT, "0.01", &cancel)
            .await
            .unwrap();
        let names: Vec<_> = results.iter().map(|r| r.network.as_str()).collect();
        assert_eq!(names, vec!["B"]);
    }
}
