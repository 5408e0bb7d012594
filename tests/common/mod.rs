//! Shared utilities for integration tests.
//!
//! `MockBackend` is an in-memory chain: accounts, a linear block history,
//! storage maps and transfer events are set up with builder methods, and every
//! submitted call is recorded for inspection.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use subxt_signer::sr25519::Keypair;

use creditcoin_sdk::chain::decode::AuthorHint;
use creditcoin_sdk::chain::{
    AccountData, ChainBackend, ChainClient, ChainError, ChainProperties, ChainResult,
    InclusionStatus, RawBlock, RuntimeCall, StorageEntry, SubmittedExtrinsic, TransferEvent,
    WaitFor,
};
use creditcoin_sdk::config::{NetworkConfig, SdkConfig};
use creditcoin_sdk::resilience::RetryPolicy;
use creditcoin_sdk::{Account, CreditcoinClient};

pub const ONE_CTC: u128 = 1_000_000_000_000_000_000;

pub const ALICE_ADDRESS: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
pub const BOB_ADDRESS: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";

pub const ALICE_KEY: [u8; 32] = [
    0xd4, 0x35, 0x93, 0xc7, 0x15, 0xfd, 0xd3, 0x1c, 0x61, 0x14, 0x1a, 0xbd, 0x04, 0xa9, 0x9f, 0xd6,
    0x82, 0x2c, 0x85, 0x58, 0x85, 0x4c, 0xcd, 0xe3, 0x9a, 0x56, 0x84, 0xe7, 0xa5, 0x6d, 0xa2, 0x7d,
];
pub const BOB_KEY: [u8; 32] = [
    0x8e, 0xaf, 0x04, 0x15, 0x16, 0x87, 0x73, 0x63, 0x26, 0xc9, 0xfe, 0xa1, 0x7e, 0x25, 0xfc, 0x52,
    0x87, 0x61, 0x36, 0x93, 0xc9, 0x12, 0x90, 0x9c, 0xb2, 0x26, 0xaa, 0x47, 0x94, 0xf2, 0x6a, 0x48,
];

/// Fee every estimate returns unless overridden.
pub const DEFAULT_FEE: u128 = ONE_CTC / 100;

/// Timestamp of block 0.
pub const GENESIS_MS: u64 = 1_700_000_000_000;

pub fn alice() -> Account {
    Account::from_uri("//Alice", 42).unwrap()
}

pub fn bob() -> Account {
    Account::from_uri("//Bob", 42).unwrap()
}

pub struct MockBackend {
    endpoint: String,
    accounts: HashMap<[u8; 32], AccountData>,
    blocks: Vec<RawBlock>,
    validators: Vec<[u8; 32]>,
    properties: ChainProperties,
    storage: HashMap<(String, String), Vec<StorageEntry>>,
    transfers: HashMap<u64, Vec<TransferEvent>>,
    fee: u128,
    submit_error: Option<ChainError>,
    /// Reads fail with a network error while this is positive.
    failing_reads: AtomicU32,
    reads: AtomicU32,
    submitted: Mutex<Vec<(RuntimeCall, WaitFor)>>,
}

impl MockBackend {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            accounts: HashMap::new(),
            blocks: Vec::new(),
            validators: vec![ALICE_KEY, BOB_KEY],
            properties: ChainProperties {
                chain: "Creditcoin Testnet".to_string(),
                runtime_version: 300,
                token_symbol: Some("CTC".to_string()),
                token_decimals: Some(18),
                ss58_format: Some(42),
            },
            storage: HashMap::new(),
            transfers: HashMap::new(),
            fee: DEFAULT_FEE,
            submit_error: None,
            failing_reads: AtomicU32::new(0),
            reads: AtomicU32::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_account(mut self, key: [u8; 32], data: AccountData) -> Self {
        self.accounts.insert(key, data);
        self
    }

    pub fn with_free_balance(self, key: [u8; 32], free: u128) -> Self {
        self.with_account(
            key,
            AccountData {
                nonce: 0,
                free,
                reserved: 0,
                locked: 0,
            },
        )
    }

    /// Blocks `0..=best`, `block_time_ms` apart, authored round-robin by the validators.
    pub fn with_blocks(mut self, best: u64, block_time_ms: u64) -> Self {
        self.blocks = (0..=best)
            .map(|n| RawBlock {
                number: n,
                hash: format!("0x{:064x}", n + 1),
                parent_hash: format!("0x{:064x}", n),
                state_root: format!("0x{:064x}", 0xaa00 + n),
                extrinsics_root: format!("0x{:064x}", 0xbb00 + n),
                extrinsic_count: 2,
                timestamp_ms: Some(GENESIS_MS + n * block_time_ms),
                author: Some(AuthorHint::Index((n % 2) as u32)),
            })
            .collect();
        self
    }

    pub fn with_storage(mut self, pallet: &str, entry: &str, entries: Vec<StorageEntry>) -> Self {
        self.storage
            .insert((pallet.to_string(), entry.to_string()), entries);
        self
    }

    pub fn with_transfer(mut self, block: u64, event: TransferEvent) -> Self {
        self.transfers.entry(block).or_default().push(event);
        self
    }

    pub fn with_fee(mut self, fee: u128) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_submit_error(mut self, error: ChainError) -> Self {
        self.submit_error = Some(error);
        self
    }

    /// Fail the next `n` reads with a network error.
    pub fn with_failing_reads(self, n: u32) -> Self {
        self.failing_reads.store(n, Ordering::SeqCst);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn submitted(&self) -> Vec<(RuntimeCall, WaitFor)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    fn read(&self) -> ChainResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_reads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_reads.store(remaining - 1, Ordering::SeqCst);
            return Err(ChainError::Network(format!("{} unavailable", self.endpoint)));
        }
        Ok(())
    }

    fn best(&self) -> ChainResult<&RawBlock> {
        self.blocks
            .last()
            .ok_or_else(|| ChainError::NotFound("best block".to_string()))
    }
}

#[async_trait]
impl ChainBackend for MockBackend {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn account_data(&self, account: &[u8; 32]) -> ChainResult<Option<AccountData>> {
        self.read()?;
        Ok(self.accounts.get(account).copied())
    }

    async fn block(&self, number: Option<u64>) -> ChainResult<RawBlock> {
        self.read()?;
        match number {
            None => self.best().cloned(),
            Some(n) => self
                .blocks
                .get(n as usize)
                .cloned()
                .ok_or_else(|| ChainError::NotFound(format!("block {}", n))),
        }
    }

    async fn finalized_block_number(&self) -> ChainResult<u64> {
        self.read()?;
        Ok(self.best()?.number.saturating_sub(2))
    }

    async fn validators(&self, _number: Option<u64>) -> ChainResult<Vec<[u8; 32]>> {
        self.read()?;
        Ok(self.validators.clone())
    }

    async fn properties(&self) -> ChainResult<ChainProperties> {
        self.read()?;
        Ok(self.properties.clone())
    }

    async fn storage_entries(&self, pallet: &str, entry: &str) -> ChainResult<Vec<StorageEntry>> {
        self.read()?;
        Ok(self
            .storage
            .get(&(pallet.to_string(), entry.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn transfers_in_block(&self, number: u64) -> ChainResult<Vec<TransferEvent>> {
        self.read()?;
        Ok(self.transfers.get(&number).cloned().unwrap_or_default())
    }

    async fn estimate_fee(&self, _call: &RuntimeCall, _signer: &Keypair) -> ChainResult<u128> {
        self.read()?;
        Ok(self.fee)
    }

    async fn submit(
        &self,
        call: &RuntimeCall,
        _signer: &Keypair,
        wait: WaitFor,
    ) -> ChainResult<SubmittedExtrinsic> {
        if let Some(error) = &self.submit_error {
            return Err(error.clone());
        }

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push((call.clone(), wait));
        let tx_hash = format!("0x{:064x}", 0xf000 + submitted.len());

        let (status, block) = match wait {
            WaitFor::Submitted => (InclusionStatus::Submitted, None),
            WaitFor::InBlock => (InclusionStatus::InBlock, self.blocks.last()),
            WaitFor::Finalized => (InclusionStatus::Finalized, self.blocks.last()),
        };

        Ok(SubmittedExtrinsic {
            tx_hash,
            block_hash: block.map(|b| b.hash.clone()),
            block_number: block.map(|b| b.number),
            status,
            events: vec![
                format!("{}.Executed", call.pallet),
                "System.ExtrinsicSuccess".to_string(),
            ],
            timestamp: None,
        })
    }
}

pub fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 1,
        max_delay_ms: 2,
    }
}

/// Client over the given backends, in priority order.
pub fn client_with(backends: Vec<Arc<MockBackend>>) -> CreditcoinClient {
    client_with_config(backends, SdkConfig::default())
}

pub fn client_with_config(backends: Vec<Arc<MockBackend>>, config: SdkConfig) -> CreditcoinClient {
    let backends = backends
        .into_iter()
        .map(|b| b as Arc<dyn ChainBackend>)
        .collect();
    let network = NetworkConfig {
        timeout_secs: 5,
        ..config.network.clone()
    };
    let chain = ChainClient::from_backends(backends, network, fast_retries()).unwrap();
    CreditcoinClient::with_chain(chain, config)
}
