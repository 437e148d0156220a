//! Payment building and signing.
//!
//! # Responsibilities
//! - Apply the gas price policy (multiplier, ceiling)
//! - Build native transfers with the fixed gas budget
//! - Sign into a broadcastable EIP-2718 payload

use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Wallet;
use crate::config::RpcConfig;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Fields of a native transfer, before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentParams {
    pub to: Address,
    pub value: U256,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
}

/// Check the node's gas price against the configured ceiling and apply the
/// safety multiplier.
pub fn apply_gas_policy(gas_price: u128, rpc: &RpcConfig) -> BlockchainResult<u128> {
    let gas_price_gwei = gas_price / WEI_PER_GWEI;
    if gas_price_gwei > rpc.max_gas_price_gwei as u128 {
        return Err(BlockchainError::GasPriceTooHigh {
            current_gwei: gas_price_gwei as u64,
            max_gwei: rpc.max_gas_price_gwei,
        });
    }

    Ok((gas_price as f64 * rpc.gas_price_multiplier) as u128)
}

/// Build the unsigned transaction request for a payment.
pub fn payment_request(wallet: &Wallet, params: &PaymentParams) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(wallet.address())
        .with_to(params.to)
        .with_value(params.value)
        .with_nonce(params.nonce)
        .with_gas_price(params.gas_price)
        .with_gas_limit(params.gas_limit)
        .with_chain_id(wallet.chain_id())
}

/// Sign a payment, returning its hash and raw encoding.
pub async fn sign_payment(wallet: &Wallet, params: &PaymentParams) -> BlockchainResult<(TxHash, Bytes)> {
    let request = payment_request(wallet, params);
    let envelope: TxEnvelope = request
        .build(&wallet.ethereum_wallet())
        .await
        .map_err(|e| BlockchainError::Signing(e.to_string()))?;

    let hash = *envelope.tx_hash();
    let raw = Bytes::from(envelope.encoded_2718());
    Ok((hash, raw))
}
