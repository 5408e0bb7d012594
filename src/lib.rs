//! Creditcoin SDK
//!
//! Client library for the Creditcoin network, built on `subxt`.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!   Application ──────▶│              CreditcoinClient                 │
//!                      │   accounts · balances · transfers · queries   │
//!                      │                     │                         │
//!                      │          ┌──────────┴──────────┐              │
//!                      │          ▼                     ▼              │
//!                      │   ┌─────────────┐     ┌─────────────────┐     │
//!                      │   │   account   │     │   marketplace   │     │
//!                      │   │ sr25519/SS58│     │ ask · bid · deal│     │
//!                      │   └─────────────┘     └────────┬────────┘     │
//!                      │                                ▼              │
//!                      │   ┌────────────────────────────────────────┐  │
//!                      │   │ ChainClient (timeout/retry/failover)    │  │
//!                      │   │   └─ ChainBackend ── SubstrateBackend ──┼──┼──▶ Node
//!                      │   └────────────────────────────────────────┘  │
//!                      │                                               │
//!                      │   config · observability · resilience         │
//!                      └──────────────────────────────────────────────┘
//! ```

// Domain
pub mod account;
pub mod chain;
pub mod client;
pub mod marketplace;

// Cross-cutting
pub mod config;
pub mod observability;
pub mod resilience;

pub use account::Account;
pub use chain::types::{
    AddressInfo, Balance, BlockInfo, ChainError, ChainResult, NetworkStats, Transaction,
    TransactionReceipt, WaitFor,
};
pub use client::CreditcoinClient;
pub use config::SdkConfig;
pub use marketplace::{CreditMarketplace, DealStatus, LoanTerms, OrderStatus, OrderType};
