//! Chain-specific types and error definitions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::units;

/// Errors that can occur during SDK operations.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// RPC connection or request failed.
    #[error("Network error: {0}")]
    Network(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Address is not valid SS58.
    #[error("Invalid Creditcoin address: {0}")]
    InvalidAddress(String),

    /// Amount is negative, zero where not allowed, or not representable.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Sender cannot cover amount plus fee.
    #[error(
        "Insufficient balance: available {} CTC, required {} CTC",
        units::from_planck(*available),
        units::from_planck(*required)
    )]
    InsufficientBalance { available: u128, required: u128 },

    /// Extrinsic was rejected or failed on-chain.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Invalid mnemonic, secret key or derivation error.
    #[error("Keypair error: {0}")]
    Keypair(String),

    /// Chain data did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Requested block or entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// SDK misconfiguration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ChainError {
    /// Transient failures that may succeed on another attempt or endpoint.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChainError::Network(_) | ChainError::Timeout(_))
    }
}

/// Result type for SDK operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Raw account data as stored by `System.Account`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountData {
    pub nonce: u64,
    pub free: u128,
    pub reserved: u128,
    /// `frozen`, or `misc_frozen + fee_frozen` on older runtimes.
    pub locked: u128,
}

/// Balance of an address in planck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub address: String,
    /// Free balance.
    pub balance: u128,
    pub locked: u128,
    pub reserved: u128,
    pub nonce: u64,
}

impl Balance {
    pub fn from_account_data(address: impl Into<String>, data: AccountData) -> Self {
        Self {
            address: address.into(),
            balance: data.free,
            locked: data.locked,
            reserved: data.reserved,
            nonce: data.nonce,
        }
    }

    /// Free plus reserved.
    pub fn total(&self) -> u128 {
        self.balance.saturating_add(self.reserved)
    }

    /// Free balance not held by locks.
    pub fn transferable(&self) -> u128 {
        self.balance.saturating_sub(self.locked)
    }

    pub fn balance_ctc(&self) -> Decimal {
        units::from_planck(self.balance)
    }

    pub fn locked_ctc(&self) -> Decimal {
        units::from_planck(self.locked)
    }

    pub fn reserved_ctc(&self) -> Decimal {
        units::from_planck(self.reserved)
    }

    pub fn total_ctc(&self) -> Decimal {
        units::from_planck(self.total())
    }
}

/// Information about a Creditcoin address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    /// Free plus reserved, in planck.
    pub balance: u128,
    pub locked_balance: u128,
    pub nonce: u64,
    /// Approximated by the account nonce.
    pub transaction_count: u64,
}

/// How long a submission waits before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitFor {
    /// Return once the node accepted the extrinsic into its pool.
    Submitted,
    /// Return once the extrinsic is in a best block.
    #[default]
    InBlock,
    /// Return once the including block is finalized.
    Finalized,
}

/// Inclusion status of a submitted extrinsic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionStatus {
    Submitted,
    InBlock,
    Finalized,
}

/// Result of a successful submission as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedExtrinsic {
    pub tx_hash: String,
    pub block_hash: Option<String>,
    pub block_number: Option<u64>,
    pub status: InclusionStatus,
    /// `Pallet.Event` names emitted by the extrinsic.
    pub events: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Receipt returned to callers after a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: String,
    pub block_hash: Option<String>,
    pub block_number: Option<u64>,
    pub status: InclusionStatus,
    /// Fee in planck.
    pub fee: u128,
    pub events: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl TransactionReceipt {
    pub fn new(submitted: SubmittedExtrinsic, fee: u128) -> Self {
        Self {
            tx_hash: submitted.tx_hash,
            block_hash: submitted.block_hash,
            block_number: submitted.block_number,
            status: submitted.status,
            fee,
            events: submitted.events,
            timestamp: submitted.timestamp,
        }
    }

    pub fn fee_ctc(&self) -> Decimal {
        units::from_planck(self.fee)
    }
}

/// Block header summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub state_root: String,
    pub extrinsics_root: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub validator: Option<String>,
    pub transaction_count: usize,
}

/// Properties reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainProperties {
    pub chain: String,
    pub runtime_version: u32,
    pub token_symbol: Option<String>,
    pub token_decimals: Option<u32>,
    pub ss58_format: Option<u16>,
}

/// Network statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub current_block: u64,
    pub finalized_block: u64,
    pub active_validators: usize,
    /// Seconds.
    pub average_block_time: f64,
    pub chain: String,
    pub network_version: String,
    pub token_symbol: String,
    pub token_decimals: u32,
    pub ss58_format: u16,
}

/// A `Balances.Transfer` event observed in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub tx_hash: String,
    pub from: [u8; 32],
    pub to: [u8; 32],
    pub amount: u128,
    /// Fee paid by the including extrinsic, when the runtime reports it.
    pub fee: u128,
    pub success: bool,
}

/// A transfer involving a given address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub block_number: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub from_address: String,
    pub to_address: String,
    pub value: u128,
    pub fee: u128,
    pub status: String,
    pub method: Option<String>,
}
