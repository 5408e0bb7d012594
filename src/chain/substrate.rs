//! `ChainBackend` implementation backed by `subxt`.
//!
//! # Responsibilities
//! - Connect to a Substrate JSON-RPC endpoint (ws, wss, http, https)
//! - Query storage dynamically against live metadata
//! - Compose, sign and submit extrinsics
//! - Translate library errors into `ChainError`

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use subxt::backend::legacy::rpc_methods::{BlockNumber, NumberOrHex};
use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::config::substrate::DigestItem;
use subxt::events::Phase;
use subxt::ext::scale_value::{Value, ValueDef};
use subxt::tx::{TxProgress, TxStatus};
use subxt::utils::H256;
use subxt::{OnlineClient, PolkadotConfig};
use subxt_signer::sr25519::Keypair;

use crate::chain::backend::{ChainBackend, RawBlock, RuntimeCall, StorageEntry};
use crate::chain::decode;
use crate::chain::types::{
    AccountData, ChainError, ChainProperties, ChainResult, InclusionStatus, SubmittedExtrinsic,
    TransferEvent, WaitFor,
};

type Blake2b256 = Blake2b<U32>;

fn map_subxt_error(err: impl Into<subxt::Error>) -> ChainError {
    match err.into() {
        subxt::Error::Rpc(e) => ChainError::Network(e.to_string()),
        subxt::Error::Io(e) => ChainError::Network(e.to_string()),
        subxt::Error::Runtime(e) => ChainError::Transaction(e.to_string()),
        subxt::Error::Transaction(e) => ChainError::Transaction(e.to_string()),
        other => ChainError::Decode(other.to_string()),
    }
}

fn hex_hash(hash: &H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

fn hash_extrinsic(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(Blake2b256::digest(bytes)))
}

/// URLs for which the library requires an explicit insecure opt-in.
fn is_secure_url(url: &str) -> bool {
    url.starts_with("wss://") || url.starts_with("https://")
}

fn first_json_value(value: Option<&serde_json::Value>) -> Option<&serde_json::Value> {
    match value? {
        serde_json::Value::Array(items) => items.first(),
        other => Some(other),
    }
}

/// A connection to one Substrate node.
pub struct SubstrateBackend {
    endpoint: String,
    api: OnlineClient<PolkadotConfig>,
    rpc: LegacyRpcMethods<PolkadotConfig>,
}

impl SubstrateBackend {
    /// Connect and download runtime metadata.
    pub async fn connect(url: &str) -> ChainResult<Self> {
        let rpc_client = if is_secure_url(url) {
            RpcClient::from_url(url).await
        } else {
            RpcClient::from_insecure_url(url).await
        }
        .map_err(|e| ChainError::Network(format!("Failed to connect to '{}': {}", url, e)))?;

        let api = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc_client.clone())
            .await
            .map_err(map_subxt_error)?;
        let rpc = LegacyRpcMethods::<PolkadotConfig>::new(rpc_client);

        tracing::info!(
            endpoint = %url,
            spec_version = api.runtime_version().spec_version,
            "Connected to Creditcoin node"
        );

        Ok(Self {
            endpoint: url.to_string(),
            api,
            rpc,
        })
    }

    async fn block_hash(&self, number: Option<u64>) -> ChainResult<H256> {
        let block_number: Option<BlockNumber> = number.map(|n| NumberOrHex::Number(n).into());
        self.rpc
            .chain_get_block_hash(block_number)
            .await
            .map_err(map_subxt_error)?
            .ok_or_else(|| match number {
                Some(n) => ChainError::NotFound(format!("block {}", n)),
                None => ChainError::NotFound("best block".to_string()),
            })
    }

    async fn block_number_of(&self, hash: H256) -> ChainResult<u64> {
        let header = self
            .rpc
            .chain_get_header(Some(hash))
            .await
            .map_err(map_subxt_error)?
            .ok_or_else(|| ChainError::NotFound(format!("header {}", hex_hash(&hash))))?;
        Ok(u64::from(header.number))
    }

    async fn timestamp_at(&self, hash: H256) -> ChainResult<Option<u64>> {
        let address = subxt::dynamic::storage("Timestamp", "Now", ());
        let thunk = self
            .api
            .storage()
            .at(hash)
            .fetch(&address)
            .await
            .map_err(map_subxt_error)?;

        match thunk {
            Some(thunk) => {
                let value = thunk.to_value().map_err(map_subxt_error)?;
                Ok(decode::as_u64(&value))
            }
            None => Ok(None),
        }
    }

    async fn finish_submission(
        &self,
        mut progress: TxProgress<PolkadotConfig, OnlineClient<PolkadotConfig>>,
        wait: WaitFor,
    ) -> ChainResult<SubmittedExtrinsic> {
        let (in_block, status) = loop {
            let Some(next) = progress.next().await else {
                return Err(ChainError::Transaction(
                    "Transaction status subscription ended".to_string(),
                ));
            };
            match next.map_err(map_subxt_error)? {
                TxStatus::InBestBlock(in_block) if wait == WaitFor::InBlock => {
                    break (in_block, InclusionStatus::InBlock);
                }
                TxStatus::InFinalizedBlock(in_block) => {
                    break (in_block, InclusionStatus::Finalized);
                }
                TxStatus::Error { message }
                | TxStatus::Invalid { message }
                | TxStatus::Dropped { message } => {
                    return Err(ChainError::Transaction(message));
                }
                _ => continue,
            }
        };

        let block_hash = in_block.block_hash();
        let tx_hash = in_block.extrinsic_hash();
        let events = in_block.wait_for_success().await.map_err(map_subxt_error)?;

        let event_names = events
            .iter()
            .filter_map(Result::ok)
            .map(|ev| format!("{}.{}", ev.pallet_name(), ev.variant_name()))
            .collect();

        let block_number = self.block_number_of(block_hash).await.ok();
        let timestamp = self
            .timestamp_at(block_hash)
            .await
            .ok()
            .flatten()
            .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms as i64));

        Ok(SubmittedExtrinsic {
            tx_hash: hex_hash(&tx_hash),
            block_hash: Some(hex_hash(&block_hash)),
            block_number,
            status,
            events: event_names,
            timestamp,
        })
    }
}

#[async_trait]
impl ChainBackend for SubstrateBackend {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn account_data(&self, account: &[u8; 32]) -> ChainResult<Option<AccountData>> {
        let address = subxt::dynamic::storage("System", "Account", vec![Value::from_bytes(account)]);
        let storage = self.api.storage().at_latest().await.map_err(map_subxt_error)?;

        match storage.fetch(&address).await.map_err(map_subxt_error)? {
            Some(thunk) => {
                let value = thunk.to_value().map_err(map_subxt_error)?;
                decode::account_data(&value).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn block(&self, number: Option<u64>) -> ChainResult<RawBlock> {
        let hash = self.block_hash(number).await?;
        let details = self
            .rpc
            .chain_get_block(Some(hash))
            .await
            .map_err(map_subxt_error)?
            .ok_or_else(|| ChainError::NotFound(format!("block {}", hex_hash(&hash))))?;

        let header = &details.block.header;
        let pre_runtime: Vec<([u8; 4], Vec<u8>)> = header
            .digest
            .logs
            .iter()
            .filter_map(|item| match item {
                DigestItem::PreRuntime(engine, data) => Some((*engine, data.clone())),
                _ => None,
            })
            .collect();

        let timestamp_ms = match self.timestamp_at(hash).await {
            Ok(ts) => ts,
            Err(e) => {
                tracing::debug!(error = %e, "Block timestamp unavailable");
                None
            }
        };

        Ok(RawBlock {
            number: u64::from(header.number),
            hash: hex_hash(&hash),
            parent_hash: hex_hash(&header.parent_hash),
            state_root: hex_hash(&header.state_root),
            extrinsics_root: hex_hash(&header.extrinsics_root),
            extrinsic_count: details.block.extrinsics.len(),
            timestamp_ms,
            author: decode::author_hint(&pre_runtime),
        })
    }

    async fn finalized_block_number(&self) -> ChainResult<u64> {
        let hash = self
            .rpc
            .chain_get_finalized_head()
            .await
            .map_err(map_subxt_error)?;
        self.block_number_of(hash).await
    }

    async fn validators(&self, number: Option<u64>) -> ChainResult<Vec<[u8; 32]>> {
        let hash = self.block_hash(number).await?;
        let address = subxt::dynamic::storage("Session", "Validators", ());
        let thunk = self
            .api
            .storage()
            .at(hash)
            .fetch(&address)
            .await
            .map_err(map_subxt_error)?;

        let Some(thunk) = thunk else {
            return Ok(Vec::new());
        };
        let value = thunk.to_value().map_err(map_subxt_error)?;
        match &value.value {
            ValueDef::Composite(list) => Ok(list.values().filter_map(decode::as_account).collect()),
            _ => Err(ChainError::Decode("Session.Validators is not a list".to_string())),
        }
    }

    async fn properties(&self) -> ChainResult<ChainProperties> {
        let props = self.rpc.system_properties().await.map_err(map_subxt_error)?;
        let chain = self.rpc.system_chain().await.map_err(map_subxt_error)?;

        Ok(ChainProperties {
            chain,
            runtime_version: self.api.runtime_version().spec_version,
            token_symbol: first_json_value(props.get("tokenSymbol"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            token_decimals: first_json_value(props.get("tokenDecimals"))
                .and_then(|v| v.as_u64())
                .and_then(|d| u32::try_from(d).ok()),
            ss58_format: props
                .get("ss58Format")
                .and_then(|v| v.as_u64())
                .and_then(|f| u16::try_from(f).ok()),
        })
    }

    async fn storage_entries(&self, pallet: &str, entry: &str) -> ChainResult<Vec<StorageEntry>> {
        let storage = self.api.storage().at_latest().await.map_err(map_subxt_error)?;
        let address = subxt::dynamic::storage(pallet, entry, Vec::<Value>::new());
        let mut stream = storage.iter(address).await.map_err(map_subxt_error)?;

        let mut entries = Vec::new();
        while let Some(next) = stream.next().await {
            let kv = next.map_err(map_subxt_error)?;
            let value = kv.value.to_value().map_err(map_subxt_error)?.remove_context();
            // First 32 bytes are twox128(pallet) ++ twox128(entry).
            let key = kv.key_bytes.get(32..).unwrap_or_default().to_vec();
            entries.push(StorageEntry {
                key,
                keys: kv.keys,
                value,
            });
        }

        tracing::debug!(pallet, entry, count = entries.len(), "Storage map fetched");
        Ok(entries)
    }

    async fn transfers_in_block(&self, number: u64) -> ChainResult<Vec<TransferEvent>> {
        let hash = self.block_hash(Some(number)).await?;
        let details = self
            .rpc
            .chain_get_block(Some(hash))
            .await
            .map_err(map_subxt_error)?
            .ok_or_else(|| ChainError::NotFound(format!("block {}", number)))?;

        let extrinsic_hashes: Vec<String> = details
            .block
            .extrinsics
            .iter()
            .map(|ext| hash_extrinsic(&ext.0))
            .collect();

        let events = self.api.events().at(hash).await.map_err(map_subxt_error)?;

        let mut fees: HashMap<u32, u128> = HashMap::new();
        let mut failed: HashSet<u32> = HashSet::new();
        let mut transfers: Vec<(u32, [u8; 32], [u8; 32], u128)> = Vec::new();

        for event in events.iter() {
            let event = event.map_err(map_subxt_error)?;
            let Phase::ApplyExtrinsic(index) = event.phase() else {
                continue;
            };

            match (event.pallet_name(), event.variant_name()) {
                ("Balances", "Transfer") => {
                    let fields = Value {
                        value: ValueDef::Composite(event.field_values().map_err(map_subxt_error)?),
                        context: 0u32,
                    };
                    let from = decode::require_account(&fields, &["from"])?;
                    let to = decode::require_account(&fields, &["to"])?;
                    let amount = decode::require_u128(&fields, &["amount", "value"])?;
                    transfers.push((index, from, to, amount));
                }
                ("TransactionPayment", "TransactionFeePaid") => {
                    let fields = Value {
                        value: ValueDef::Composite(event.field_values().map_err(map_subxt_error)?),
                        context: 0u32,
                    };
                    fees.insert(index, decode::u128_field_or_zero(&fields, &["actual_fee"]));
                }
                ("System", "ExtrinsicFailed") => {
                    failed.insert(index);
                }
                _ => {}
            }
        }

        Ok(transfers
            .into_iter()
            .map(|(index, from, to, amount)| TransferEvent {
                tx_hash: extrinsic_hashes
                    .get(index as usize)
                    .cloned()
                    .unwrap_or_default(),
                from,
                to,
                amount,
                fee: fees.get(&index).copied().unwrap_or(0),
                success: !failed.contains(&index),
            })
            .collect())
    }

    async fn estimate_fee(&self, call: &RuntimeCall, signer: &Keypair) -> ChainResult<u128> {
        let payload = subxt::dynamic::tx(call.pallet.as_str(), call.function.as_str(), call.to_composite());
        let signed = self
            .api
            .tx()
            .create_signed(&payload, signer, Default::default())
            .await
            .map_err(map_subxt_error)?;
        signed.partial_fee_estimate().await.map_err(map_subxt_error)
    }

    async fn submit(
        &self,
        call: &RuntimeCall,
        signer: &Keypair,
        wait: WaitFor,
    ) -> ChainResult<SubmittedExtrinsic> {
        let payload = subxt::dynamic::tx(call.pallet.as_str(), call.function.as_str(), call.to_composite());

        if wait == WaitFor::Submitted {
            let tx_hash = self
                .api
                .tx()
                .sign_and_submit_default(&payload, signer)
                .await
                .map_err(map_subxt_error)?;
            return Ok(SubmittedExtrinsic {
                tx_hash: hex_hash(&tx_hash),
                block_hash: None,
                block_number: None,
                status: InclusionStatus::Submitted,
                events: Vec::new(),
                timestamp: None,
            });
        }

        let progress = self
            .api
            .tx()
            .sign_and_submit_then_watch_default(&payload, signer)
            .await
            .map_err(map_subxt_error)?;
        self.finish_submission(progress, wait).await
    }
}
