//! Timeout enforcement.
//!
//! Every call to a node has a deadline; an elapsed deadline becomes
//! `ChainError::Timeout`, which is retryable.

use std::future::Future;
use std::time::Duration;

use crate::chain::types::{ChainError, ChainResult};

/// Await `fut` for at most `limit`.
pub async fn with_timeout<T, Fut>(limit: Duration, fut: Fut) -> ChainResult<T>
where
    Fut: Future<Output = ChainResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ChainError::Timeout(limit.as_secs())),
    }
}
