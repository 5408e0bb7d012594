//! Seam between the SDK and the chain-client library.

use async_trait::async_trait;
use subxt::ext::scale_value::{Composite, Value};
use subxt_signer::sr25519::Keypair;

use crate::chain::decode::{self, AuthorHint};
use crate::chain::types::{
    AccountData, ChainError, ChainProperties, ChainResult, SubmittedExtrinsic, TransferEvent,
    WaitFor,
};

/// A runtime call composed by name, encoded by the backend against live metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeCall {
    pub pallet: String,
    pub function: String,
    pub fields: Vec<(String, Value)>,
}

impl RuntimeCall {
    pub fn new(pallet: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            pallet: pallet.into(),
            function: function.into(),
            fields: Vec::new(),
        }
    }

    /// Append a named argument.
    pub fn arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    /// `Pallet.function`, for logs and metrics.
    pub fn name(&self) -> String {
        format!("{}.{}", self.pallet, self.function)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn to_composite(&self) -> Composite<()> {
        Composite::Named(self.fields.clone())
    }
}

/// One entry of a storage map.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageEntry {
    /// Raw key bytes after the pallet and entry prefixes, hasher output included.
    pub key: Vec<u8>,
    /// Decoded map keys, one per hasher.
    pub keys: Vec<Value>,
    pub value: Value,
}

impl StorageEntry {
    /// `0x`-prefixed hex of the raw key suffix, for logs.
    pub fn key_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.key))
    }

    /// Identifier of the entry, built from the decoded keys.
    ///
    /// This is the text calls taking the key accept back, see
    /// [`decode::id_value`](crate::chain::decode::id_value).
    pub fn id(&self) -> ChainResult<String> {
        decode::join_ids(&self.keys)
            .ok_or_else(|| ChainError::Decode(format!("undecodable storage key {}", self.key_hex())))
    }
}

/// Header-level view of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub state_root: String,
    pub extrinsics_root: String,
    pub extrinsic_count: usize,
    /// `Timestamp.Now` in milliseconds.
    pub timestamp_ms: Option<u64>,
    pub author: Option<AuthorHint>,
}

/// Operations the SDK needs from a chain-client library.
///
/// Block numbers are `None` for the best block. Account ids are raw public keys.
#[async_trait]
pub trait ChainBackend: Send + Sync {
    /// Endpoint URL, for logs.
    fn endpoint(&self) -> &str;

    /// `System.Account` for the given account, `None` if it does not exist.
    async fn account_data(&self, account: &[u8; 32]) -> ChainResult<Option<AccountData>>;

    async fn block(&self, number: Option<u64>) -> ChainResult<RawBlock>;

    async fn finalized_block_number(&self) -> ChainResult<u64>;

    /// `Session.Validators` at the given block.
    async fn validators(&self, number: Option<u64>) -> ChainResult<Vec<[u8; 32]>>;

    async fn properties(&self) -> ChainResult<ChainProperties>;

    /// Every entry of a storage map at the best block.
    async fn storage_entries(&self, pallet: &str, entry: &str) -> ChainResult<Vec<StorageEntry>>;

    /// `Balances.Transfer` events of a block.
    async fn transfers_in_block(&self, number: u64) -> ChainResult<Vec<TransferEvent>>;

    /// Partial fee the call would pay if signed by `signer`.
    async fn estimate_fee(&self, call: &RuntimeCall, signer: &Keypair) -> ChainResult<u128>;

    /// Sign, submit and wait as requested.
    async fn submit(
        &self,
        call: &RuntimeCall,
        signer: &Keypair,
        wait: WaitFor,
    ) -> ChainResult<SubmittedExtrinsic>;
}
