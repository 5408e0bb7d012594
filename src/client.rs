//! Creditcoin client façade.
//!
//! # Responsibilities
//! - Account creation and import
//! - Balance, address, block and network queries
//! - Transfers with fee estimation and balance checks
//! - Access to the credit marketplace

use futures_util::stream::{self, StreamExt};
use rust_decimal::Decimal;
use subxt::ext::scale_value::Value;

use crate::account::{ss58, Account};
use crate::chain::backend::RuntimeCall;
use crate::chain::client::ChainClient;
use crate::chain::types::{
    AddressInfo, Balance, BlockInfo, ChainError, ChainResult, NetworkStats, Transaction,
    TransactionReceipt,
};
use crate::chain::units;
use crate::config::validation::validate_config;
use crate::config::SdkConfig;
use crate::marketplace::CreditMarketplace;

/// Target block time, used when it cannot be measured.
pub const TARGET_BLOCK_TIME_SECS: f64 = 6.0;

/// Blocks spanned when measuring the average block time.
const BLOCK_TIME_WINDOW: u64 = 10;

fn millis_to_datetime(ms: u64) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp_millis(i64::try_from(ms).ok()?)
}

/// Client for the Creditcoin network.
#[derive(Debug, Clone)]
pub struct CreditcoinClient {
    chain: ChainClient,
    config: SdkConfig,
}

impl CreditcoinClient {
    /// Validate the configuration and connect to the configured nodes.
    pub async fn connect(config: SdkConfig) -> ChainResult<Self> {
        validate_config(&config).map_err(|errors| {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ChainError::Configuration(joined.join(", "))
        })?;

        let chain = ChainClient::connect(&config).await?;
        tracing::info!(url = %config.network.url, "Connected to Creditcoin network");
        Ok(Self { chain, config })
    }

    /// Connect to a single node with default settings.
    pub async fn connect_url(url: &str) -> ChainResult<Self> {
        let mut config = SdkConfig::default();
        config.network.url = url.to_string();
        Self::connect(config).await
    }

    /// Wrap an existing chain client.
    pub fn with_chain(chain: ChainClient, config: SdkConfig) -> Self {
        Self { chain, config }
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn chain(&self) -> &ChainClient {
        &self.chain
    }

    fn ss58_format(&self) -> u16 {
        self.config.network.ss58_format
    }

    // --- Accounts ---

    /// Generate a new account with a fresh mnemonic.
    pub fn create_account(&self, word_count: usize) -> ChainResult<Account> {
        let account = Account::generate(word_count, self.ss58_format())?;
        tracing::info!(address = %account.address(), "Created new account");
        Ok(account)
    }

    pub fn import_account_from_mnemonic(&self, mnemonic: &str) -> ChainResult<Account> {
        Account::from_mnemonic(mnemonic, self.ss58_format())
    }

    /// Import a 32-byte hex secret key, with or without `0x`.
    pub fn import_account_from_private_key(&self, secret_hex: &str) -> ChainResult<Account> {
        Account::from_secret_key_hex(secret_hex, self.ss58_format())
    }

    /// Import a secret URI such as `//Alice` or `<phrase>//hard/soft`.
    pub fn import_account_from_uri(&self, uri: &str) -> ChainResult<Account> {
        Account::from_uri(uri, self.ss58_format())
    }

    pub fn validate_address(&self, address: &str) -> bool {
        ss58::is_valid_address(address)
    }

    // --- Balances ---

    /// Balance of an address; zero for accounts that do not exist yet.
    pub async fn get_balance(&self, address: &str) -> ChainResult<Balance> {
        let key = ss58::decode_public_key(address)?;
        let data = self.chain.account_data(&key).await?.unwrap_or_default();
        Ok(Balance::from_account_data(address, data))
    }

    /// Balances of many addresses, queried concurrently.
    ///
    /// Results keep the input order; each address carries its own outcome.
    pub async fn get_balances_bulk<S: AsRef<str>>(
        &self,
        addresses: &[S],
    ) -> Vec<(String, ChainResult<Balance>)> {
        let concurrency = self.config.network.bulk_concurrency.max(1);
        stream::iter(addresses.iter().map(|a| a.as_ref().to_string()))
            .map(|address| async move {
                let result = self.get_balance(&address).await;
                (address, result)
            })
            .buffered(concurrency)
            .collect()
            .await
    }

    pub async fn get_address_info(&self, address: &str) -> ChainResult<AddressInfo> {
        let balance = self.get_balance(address).await?;
        Ok(AddressInfo {
            address: balance.address.clone(),
            balance: balance.total(),
            locked_balance: balance.locked,
            nonce: balance.nonce,
            transaction_count: balance.nonce,
        })
    }

    // --- Transfers ---

    fn transfer_call(&self, to: &str, planck: u128) -> ChainResult<RuntimeCall> {
        let dest = ss58::decode_public_key(to)?;
        Ok(
            RuntimeCall::new("Balances", self.config.network.transfer_call.as_str())
                .arg("dest", Value::unnamed_variant("Id", [Value::from_bytes(dest)]))
                .arg("value", Value::u128(planck)),
        )
    }

    /// Fee in planck for transferring `amount` CTC.
    pub async fn get_transfer_fee_estimate(
        &self,
        from: &Account,
        to: &str,
        amount: Decimal,
    ) -> ChainResult<u128> {
        let call = self.transfer_call(to, units::to_planck(amount)?)?;
        self.chain.estimate_fee(&call, from.keypair()).await
    }

    /// Transfer `amount` CTC.
    ///
    /// Fails with `InsufficientBalance` before submitting when the sender's
    /// transferable balance does not cover amount plus fee.
    pub async fn transfer(
        &self,
        from: &Account,
        to: &str,
        amount: Decimal,
    ) -> ChainResult<TransactionReceipt> {
        let planck = units::to_planck(amount)?;
        if planck == 0 {
            return Err(ChainError::InvalidAmount(
                "transfer amount must be greater than zero".to_string(),
            ));
        }
        let call = self.transfer_call(to, planck)?;

        let fee = self.chain.estimate_fee(&call, from.keypair()).await?;
        let balance = self.get_balance(from.address()).await?;
        let required = planck
            .checked_add(fee)
            .ok_or_else(|| ChainError::InvalidAmount("amount plus fee overflows".to_string()))?;

        if balance.transferable() < required {
            return Err(ChainError::InsufficientBalance {
                available: balance.transferable(),
                required,
            });
        }

        let submitted = self
            .chain
            .submit(&call, from.keypair(), self.config.network.wait_for)
            .await?;

        tracing::info!(
            from = %from.address(),
            to = %to,
            amount = %units::format_ctc(planck),
            fee = %units::format_ctc(fee),
            tx_hash = %submitted.tx_hash,
            "Transfer submitted"
        );
        Ok(TransactionReceipt::new(submitted, fee))
    }

    // --- Blocks & network ---

    /// Block by number, or the best block.
    pub async fn get_block_info(&self, number: Option<u64>) -> ChainResult<BlockInfo> {
        let block = self.chain.block(number).await?;

        let validator = match block.author {
            Some(hint) => match self.chain.validators(Some(block.number)).await {
                Ok(validators) => hint
                    .resolve(&validators)
                    .and_then(|key| ss58::encode(key, self.ss58_format()).ok()),
                Err(e) => {
                    tracing::debug!(block = block.number, error = %e, "Validator set unavailable");
                    None
                }
            },
            None => None,
        };

        Ok(BlockInfo {
            number: block.number,
            hash: block.hash,
            parent_hash: block.parent_hash,
            state_root: block.state_root,
            extrinsics_root: block.extrinsics_root,
            timestamp: block.timestamp_ms.and_then(millis_to_datetime),
            validator,
            transaction_count: block.extrinsic_count,
        })
    }

    pub async fn get_network_stats(&self) -> ChainResult<NetworkStats> {
        let best = self.chain.block(None).await?;
        let finalized = self.chain.finalized_block_number().await?;
        let validators = self.chain.validators(None).await?;
        let properties = self.chain.properties().await?;

        let average_block_time = self.average_block_time(best.number, best.timestamp_ms).await;

        Ok(NetworkStats {
            current_block: best.number,
            finalized_block: finalized,
            active_validators: validators.len(),
            average_block_time,
            chain: properties.chain,
            network_version: properties.runtime_version.to_string(),
            token_symbol: properties
                .token_symbol
                .unwrap_or_else(|| units::SYMBOL.to_string()),
            token_decimals: properties.token_decimals.unwrap_or(units::DECIMALS),
            ss58_format: properties.ss58_format.unwrap_or(self.ss58_format()),
        })
    }

    /// Seconds per block over the last window, or the target block time.
    async fn average_block_time(&self, best: u64, best_ms: Option<u64>) -> f64 {
        let (Some(best_ms), Some(start)) = (best_ms, best.checked_sub(BLOCK_TIME_WINDOW)) else {
            return TARGET_BLOCK_TIME_SECS;
        };
        match self.chain.block(Some(start)).await {
            Ok(earlier) => match earlier.timestamp_ms {
                Some(start_ms) if best_ms > start_ms => {
                    (best_ms - start_ms) as f64 / 1000.0 / BLOCK_TIME_WINDOW as f64
                }
                _ => TARGET_BLOCK_TIME_SECS,
            },
            Err(e) => {
                tracing::debug!(error = %e, "Falling back to target block time");
                TARGET_BLOCK_TIME_SECS
            }
        }
    }

    /// Transfers sent or received by `address`, newest first.
    ///
    /// Scans back from the best block over `network.history_scan_depth` blocks.
    pub async fn get_transactions_by_address(
        &self,
        address: &str,
        limit: usize,
    ) -> ChainResult<Vec<Transaction>> {
        let key = ss58::decode_public_key(address)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let best = self.chain.block(None).await?.number;
        let depth = self.config.network.history_scan_depth.max(1);
        let oldest = best.saturating_sub(depth - 1);
        let format = self.ss58_format();
        let mut transactions = Vec::new();

        for number in (oldest..=best).rev() {
            let matching: Vec<_> = self
                .chain
                .transfers_in_block(number)
                .await?
                .into_iter()
                .filter(|t| t.from == key || t.to == key)
                .collect();
            if matching.is_empty() {
                continue;
            }

            let timestamp = self
                .chain
                .block(Some(number))
                .await?
                .timestamp_ms
                .and_then(millis_to_datetime);

            for transfer in matching {
                transactions.push(Transaction {
                    hash: transfer.tx_hash,
                    block_number: number,
                    timestamp,
                    from_address: ss58::encode(&transfer.from, format)?,
                    to_address: ss58::encode(&transfer.to, format)?,
                    value: transfer.amount,
                    fee: transfer.fee,
                    status: (if transfer.success { "success" } else { "failed" }).to_string(),
                    method: Some("Balances.Transfer".to_string()),
                });
                if transactions.len() >= limit {
                    return Ok(transactions);
                }
            }
        }

        tracing::debug!(
            address = %address,
            scanned = best - oldest + 1,
            found = transactions.len(),
            "Transaction history scan finished"
        );
        Ok(transactions)
    }

    // --- Marketplace ---

    pub fn marketplace(&self) -> CreditMarketplace<'_> {
        CreditMarketplace::new(&self.chain, &self.config.marketplace)
    }

    /// Check node connectivity, recording backend health.
    pub async fn is_healthy(&self) -> bool {
        self.chain.is_healthy().await
    }

    /// Drop this handle's backends.
    ///
    /// Connections close once the last clone of the client is dropped; this
    /// is the same as dropping the client, with a log line.
    pub fn close(self) {
        let endpoints: Vec<String> = self.chain.endpoints().into_iter().map(String::from).collect();
        drop(self.chain);
        tracing::info!(endpoints = ?endpoints, "Closed Creditcoin client");
    }
}
