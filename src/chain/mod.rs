//! Chain access subsystem.
//!
//! # Data Flow
//! ```text
//! SDK operation
//!     → client.rs (ChainClient: timeout, retry, failover, metrics)
//!     → backend.rs (ChainBackend trait)
//!     → substrate.rs (subxt over JSON-RPC)
//!     → decode.rs (dynamic values → SDK models)
//! ```
//!
//! # Design Decisions
//! - Calls and storage are addressed by name and encoded against live metadata
//! - Amounts stay in planck (`u128`) until they reach a caller
//! - The backend trait keeps SDK logic testable without a node

pub mod backend;
pub mod client;
pub mod decode;
pub mod substrate;
pub mod types;
pub mod units;

pub use backend::{ChainBackend, RawBlock, RuntimeCall, StorageEntry};
pub use client::ChainClient;
pub use substrate::SubstrateBackend;
pub use types::{
    AccountData, AddressInfo, Balance, BlockInfo, ChainError, ChainProperties, ChainResult,
    InclusionStatus, NetworkStats, SubmittedExtrinsic, Transaction, TransactionReceipt,
    TransferEvent, WaitFor,
};

/// Dynamic SCALE values used by `RuntimeCall` and `StorageEntry`.
pub use subxt::ext::scale_value;
