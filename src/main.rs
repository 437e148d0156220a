//! Chain Reaction CLI.
//!
//! Loads the network list, reads the signing key from the environment and
//! replays one transfer on every network that comes up.
//!
//! ```text
//! chain-reaction [--config FILE] networks
//! chain-reaction [--config FILE] balances
//! chain-reaction [--config FILE] send --recipient 0x... --amount 0.01 [--json]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use chain_reaction::blockchain::wallet::private_key_from_env;
use chain_reaction::config::validation::validate_config;
use chain_reaction::config::{load_config, ConfigError};
use chain_reaction::observability::{logging, metrics};
use chain_reaction::orchestrator::InitReport;
use chain_reaction::{
    ConfirmationPoller, EvmClientFactory, ReactionConfig, ReactionOrchestrator, TransferResult,
};

#[derive(Parser)]
#[command(name = "chain-reaction")]
#[command(about = "Send the same native transfer across several EVM networks", long_about = None)]
struct Cli {
    /// TOML configuration file; the built-in testnets are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured networks
    Networks,
    /// Initialize every network and show the wallet balance on each
    Balances,
    /// Send `amount` to `recipient` on every ready network, in order
    Send {
        #[arg(short, long)]
        recipient: String,

        #[arg(short, long)]
        amount: String,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct RunReport<'a> {
    completed: &'a [TransferResult],
    all_succeeded: bool,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let config = ReactionConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(networks = config.networks.len(), "chain-reaction v0.1.0 starting");

    if !config.observability.metrics_address.is_empty() {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command {
        Commands::Networks => {
            for network in &config.networks {
                println!(
                    "{:<24} chain {:<10} {:<6} {}",
                    network.name, network.chain_id, network.symbol, network.rpc_url
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Balances => {
            let mut orchestrator = build_orchestrator(&config)?;
            let report = orchestrator.initialize_all(&private_key_from_env()?).await;
            print_init_report(&report);

            for snapshot in orchestrator.snapshots() {
                let balance = snapshot
                    .balance
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24} {:<14} {:<44} {}",
                    snapshot.network,
                    format!("{:?}", snapshot.status),
                    snapshot.address.as_deref().unwrap_or("-"),
                    balance
                );
            }
            Ok(exit_code(report.all_ready()))
        }
        Commands::Send {
            recipient,
            amount,
            json,
        } => {
            let mut orchestrator = build_orchestrator(&config)?;
            let report = orchestrator.initialize_all(&private_key_from_env()?).await;
            if !json {
                print_init_report(&report);
            }

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, cancelling transfer run");
                    trigger.cancel();
                }
            });

            let outcome = orchestrator.run_transfer(&recipient, &amount, &cancel).await;
            let (completed, error) = match &outcome {
                Ok(results) => (results.as_slice(), None),
                Err(failure) => (failure.completed.as_slice(), Some(failure.error.to_string())),
            };
            let all_succeeded = orchestrator.all_succeeded();

            if json {
                let report = RunReport {
                    completed,
                    all_succeeded,
                    error,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for result in completed {
                    println!(
                        "{:<24} {:?} {} block {}",
                        result.network,
                        result.status,
                        result.hash,
                        result
                            .confirmed_block
                            .map(|b| b.to_string())
                            .unwrap_or_else(|| "-".to_string())
                    );
                }
                match &error {
                    Some(e) => eprintln!("Run stopped: {}", e),
                    None if all_succeeded => println!("All networks succeeded"),
                    None => println!("Run finished; some networks were not ready"),
                }
            }

            Ok(exit_code(all_succeeded))
        }
    }
}

fn build_orchestrator(config: &ReactionConfig) -> Result<ReactionOrchestrator, ConfigError> {
    let factory = Arc::new(EvmClientFactory::new(config.rpc.clone()));
    ReactionOrchestrator::new(
        config.networks.clone(),
        factory,
        ConfirmationPoller::from_config(&config.confirmation),
    )
}

fn print_init_report(report: &InitReport) {
    for name in &report.ready {
        println!("ready    {}", name);
    }
    for failure in &report.failures {
        eprintln!("failed   {}", failure);
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
