//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the SDK.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::account::DEFAULT_SS58_FORMAT;
use crate::chain::types::WaitFor;

/// Public Creditcoin mainnet endpoint.
pub const MAINNET_URL: &str = "wss://mainnet.creditcoin.network/ws";

/// Root configuration for the SDK.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct SdkConfig {
    /// Node connection and chain settings.
    pub network: NetworkConfig,

    /// Retry configuration for read operations.
    pub retries: RetryConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Credit marketplace settings.
    pub marketplace: MarketplaceConfig,
}

/// Node connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// WebSocket or HTTP URL of the primary node.
    pub url: String,

    /// Nodes tried in order when the primary fails.
    pub failover_urls: Vec<String>,

    /// SS58 network prefix used to render addresses.
    pub ss58_format: u16,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum concurrent queries in bulk operations.
    pub bulk_concurrency: usize,

    /// `Balances` call used by transfers.
    pub transfer_call: String,

    /// How long submissions wait before returning.
    pub wait_for: WaitFor,

    /// Number of recent blocks scanned for an address' transfers.
    pub history_scan_depth: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            url: MAINNET_URL.to_string(),
            failover_urls: Vec::new(),
            ss58_format: DEFAULT_SS58_FORMAT,
            timeout_secs: 30,
            bulk_concurrency: 8,
            transfer_call: "transfer_keep_alive".to_string(),
            wait_for: WaitFor::InBlock,
            history_scan_depth: 100,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Credit marketplace configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Pallet holding the order book.
    pub pallet: String,

    /// Order lifetime in blocks when the caller does not give one (~24h at 6s blocks).
    pub default_expiry_blocks: u32,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            pallet: "Credit".to_string(),
            default_expiry_blocks: 14_400,
        }
    }
}
