//! Transfer requests, per-network results and amount handling.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::utils::{parse_units, ParseUnits};
use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::error::RequestError;
use crate::reaction::SessionStatus;

/// Fractional digits shown for balances.
pub const DISPLAY_DECIMALS: u8 = 6;

/// Precision used to validate a request before it reaches any network.
const REQUEST_DECIMALS: u8 = 18;

/// A transfer to replay on every ready network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    recipient: Address,
    amount: String,
    created_at: u64,
}

impl TransferRequest {
    /// Validate a recipient and a decimal amount.
    pub fn new(recipient: &str, amount: &str) -> Result<Self, RequestError> {
        let recipient = parse_recipient(recipient)?;
        let amount = amount.trim();
        parse_amount(amount, REQUEST_DECIMALS)?;

        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Ok(Self {
            recipient,
            amount: amount.to_string(),
            created_at,
        })
    }

    pub fn recipient(&self) -> Address {
        self.recipient
    }

    /// The amount as a decimal string, in whole units of the native currency.
    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// Creation time, seconds since the Unix epoch.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }
}

/// Parse a `0x`-prefixed hex address.
///
/// All-lowercase and all-uppercase input is accepted as is; mixed case must
/// carry a valid EIP-55 checksum.
pub fn parse_recipient(raw: &str) -> Result<Address, RequestError> {
    let raw = raw.trim();
    let invalid = || RequestError::InvalidRecipient(raw.to_string());

    let hex = raw.strip_prefix("0x").ok_or_else(invalid)?;
    if hex.len() != 40 {
        return Err(invalid());
    }

    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        Address::parse_checksummed(raw, None).map_err(|_| invalid())
    } else {
        Address::from_str(raw).map_err(|_| invalid())
    }
}

/// Parse a positive decimal amount into base units.
///
/// More fractional digits than `decimals` is an error, never a truncation.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, RequestError> {
    let invalid = |reason: &str| RequestError::InvalidAmount {
        amount: amount.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(invalid("amount is required"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("amount must be positive"));
    }
    if let Some((_, fraction)) = trimmed.split_once('.') {
        if fraction.len() > decimals as usize {
            return Err(invalid(&format!("too many decimal places (max {})", decimals)));
        }
    }

    let value = match parse_units(trimmed, decimals) {
        Ok(ParseUnits::U256(value)) => value,
        Ok(ParseUnits::I256(_)) => return Err(invalid("amount must be positive")),
        Err(e) => return Err(invalid(&e.to_string())),
    };
    if value.is_zero() {
        return Err(invalid("amount must be positive"));
    }
    Ok(value)
}

/// Render base units with [`DISPLAY_DECIMALS`] fractional digits, rounding
/// half up.
pub fn format_amount(value: U256, decimals: u8) -> String {
    let ten = U256::from(10u8);
    let display = U256::from(DISPLAY_DECIMALS);
    let decimals = U256::from(decimals);

    let scaled = if decimals >= display {
        let step = ten.pow(decimals - display);
        let half = step / U256::from(2u8);
        (value + half) / step
    } else {
        value * ten.pow(display - decimals)
    };

    let unit = ten.pow(display);
    format!(
        "{}.{:0>width$}",
        scaled / unit,
        (scaled % unit).to_string(),
        width = DISPLAY_DECIMALS as usize
    )
}

/// A balance snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// Raw amount in base units.
    pub base_units: U256,
    /// Fixed-precision rendering.
    pub formatted: String,
    pub symbol: String,
}

impl Balance {
    pub fn new(base_units: U256, decimals: u8, symbol: &str) -> Self {
        Self {
            base_units,
            formatted: format_amount(base_units, decimals),
            symbol: symbol.to_string(),
        }
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.formatted, self.symbol)
    }
}

/// Outcome of one network's transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    pub network: String,
    /// Hash returned by the network on submission.
    pub hash: String,
    pub from: Address,
    pub recipient: Address,
    pub amount: String,
    /// Block that included the transaction, once confirmed.
    pub confirmed_block: Option<u64>,
    pub status: SessionStatus,
}
