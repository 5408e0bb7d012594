//! Chain client with timeout, retry and failover handling.
//!
//! # Responsibilities
//! - Hold the ordered backend list (primary + failovers)
//! - Bound every read by the configured timeout
//! - Retry transient read failures, then fail over to the next backend
//! - Record per-call metrics and backend health

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use subxt_signer::sr25519::Keypair;

use crate::chain::backend::{ChainBackend, RawBlock, RuntimeCall, StorageEntry};
use crate::chain::substrate::SubstrateBackend;
use crate::chain::types::{
    AccountData, ChainError, ChainProperties, ChainResult, SubmittedExtrinsic, TransferEvent,
    WaitFor,
};
use crate::config::{NetworkConfig, SdkConfig};
use crate::observability::metrics;
use crate::resilience::{retry, with_timeout, RetryPolicy};

/// Chain client wrapper with failover support.
#[derive(Clone)]
pub struct ChainClient {
    /// Backends in priority order; never empty.
    backends: Vec<Arc<dyn ChainBackend>>,
    /// Network configuration.
    network: NetworkConfig,
    /// Retry policy for reads.
    retry_policy: RetryPolicy,
    /// Per-request timeout.
    timeout_duration: Duration,
}

impl ChainClient {
    /// Connect to the primary node and every reachable failover node.
    ///
    /// Unreachable failovers are skipped with a warning. Fails only when no
    /// node could be reached.
    pub async fn connect(config: &SdkConfig) -> ChainResult<Self> {
        let timeout_duration = Duration::from_secs(config.network.timeout_secs);
        let mut backends: Vec<Arc<dyn ChainBackend>> = Vec::new();
        let mut last_error = None;

        let urls = std::iter::once(&config.network.url).chain(config.network.failover_urls.iter());
        for (i, url) in urls.enumerate() {
            match with_timeout(timeout_duration, SubstrateBackend::connect(url)).await {
                Ok(backend) => backends.push(Arc::new(backend)),
                Err(e) => {
                    tracing::warn!(backend_idx = i, url = %url, error = %e, "Skipping unreachable node");
                    last_error = Some(e);
                }
            }
        }

        if backends.is_empty() {
            return Err(last_error
                .unwrap_or_else(|| ChainError::Configuration("No node URL configured".to_string())));
        }

        tracing::info!(
            url = %config.network.url,
            connected = backends.len(),
            "Chain client initialized"
        );

        Self::from_backends(backends, config.network.clone(), RetryPolicy::from(&config.retries))
    }

    /// Build a client over already-connected backends.
    pub fn from_backends(
        backends: Vec<Arc<dyn ChainBackend>>,
        network: NetworkConfig,
        retry_policy: RetryPolicy,
    ) -> ChainResult<Self> {
        if backends.is_empty() {
            return Err(ChainError::Configuration(
                "At least one backend is required".to_string(),
            ));
        }
        Ok(Self {
            backends,
            timeout_duration: Duration::from_secs(network.timeout_secs),
            network,
            retry_policy,
        })
    }

    /// Run a read against each backend in turn until one succeeds.
    ///
    /// Permanent errors are returned immediately; only transient errors move
    /// on to the next backend.
    async fn read<T, F, Fut>(&self, method: &'static str, op: F) -> ChainResult<T>
    where
        F: Fn(Arc<dyn ChainBackend>) -> Fut,
        Fut: Future<Output = ChainResult<T>>,
    {
        let started = Instant::now();
        let mut last_error = None;

        for (i, backend) in self.backends.iter().enumerate() {
            let limit = self.timeout_duration;
            let result = retry(self.retry_policy, method, |_| {
                with_timeout(limit, op(Arc::clone(backend)))
            })
            .await;

            match result {
                Ok(value) => {
                    metrics::record_rpc_call(method, true, started.elapsed());
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        backend_idx = i,
                        endpoint = backend.endpoint(),
                        method,
                        error = %e,
                        "Node call failed, trying next backend"
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    metrics::record_rpc_call(method, false, started.elapsed());
                    return Err(e);
                }
            }
        }

        metrics::record_rpc_call(method, false, started.elapsed());
        Err(last_error.unwrap_or_else(|| ChainError::Network("All backends failed".to_string())))
    }

    pub async fn account_data(&self, account: &[u8; 32]) -> ChainResult<Option<AccountData>> {
        let account = *account;
        self.read("account_data", move |b| async move { b.account_data(&account).await })
            .await
    }

    /// Block by number, or the best block.
    pub async fn block(&self, number: Option<u64>) -> ChainResult<RawBlock> {
        self.read("block", move |b| async move { b.block(number).await })
            .await
    }

    pub async fn finalized_block_number(&self) -> ChainResult<u64> {
        self.read("finalized_block_number", |b| async move {
            b.finalized_block_number().await
        })
        .await
    }

    pub async fn validators(&self, number: Option<u64>) -> ChainResult<Vec<[u8; 32]>> {
        self.read("validators", move |b| async move { b.validators(number).await })
            .await
    }

    pub async fn properties(&self) -> ChainResult<ChainProperties> {
        self.read("properties", |b| async move { b.properties().await })
            .await
    }

    pub async fn storage_entries(&self, pallet: &str, entry: &str) -> ChainResult<Vec<StorageEntry>> {
        self.read("storage_entries", |b| {
            let pallet = pallet.to_string();
            let entry = entry.to_string();
            async move { b.storage_entries(&pallet, &entry).await }
        })
        .await
    }

    pub async fn transfers_in_block(&self, number: u64) -> ChainResult<Vec<TransferEvent>> {
        self.read("transfers_in_block", move |b| async move {
            b.transfers_in_block(number).await
        })
        .await
    }

    pub async fn estimate_fee(&self, call: &RuntimeCall, signer: &Keypair) -> ChainResult<u128> {
        self.read("estimate_fee", |b| {
            let call = call.clone();
            let signer = signer.clone();
            async move { b.estimate_fee(&call, &signer).await }
        })
        .await
    }

    /// Sign and submit through the primary backend.
    ///
    /// Never retried: a failed submission may still have reached the pool.
    /// Only `WaitFor::Submitted` is bounded by the request timeout.
    pub async fn submit(
        &self,
        call: &RuntimeCall,
        signer: &Keypair,
        wait: WaitFor,
    ) -> ChainResult<SubmittedExtrinsic> {
        let backend = &self.backends[0];
        let name = call.name();

        tracing::info!(call = %name, endpoint = backend.endpoint(), ?wait, "Submitting extrinsic");

        let result = match wait {
            WaitFor::Submitted => {
                with_timeout(self.timeout_duration, backend.submit(call, signer, wait)).await
            }
            _ => backend.submit(call, signer, wait).await,
        };

        metrics::record_submission(&name, result.is_ok());
        match &result {
            Ok(submitted) => tracing::info!(
                call = %name,
                tx_hash = %submitted.tx_hash,
                block = ?submitted.block_number,
                "Extrinsic accepted"
            ),
            Err(e) => tracing::warn!(call = %name, error = %e, "Extrinsic failed"),
        }
        result
    }

    /// Check every backend; true if at least one answers.
    pub async fn is_healthy(&self) -> bool {
        let mut any_healthy = false;
        for backend in &self.backends {
            let healthy = with_timeout(self.timeout_duration, backend.block(None))
                .await
                .is_ok();
            metrics::record_backend_health(backend.endpoint(), healthy);
            any_healthy |= healthy;
        }
        any_healthy
    }

    /// Endpoints in priority order.
    pub fn endpoints(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.endpoint()).collect()
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_duration
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("endpoints", &self.endpoints())
            .field("timeout", &self.timeout_duration)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}
