use crate::{BridgeConfig, BridgeError, BridgeResult};
use async_trait::async_trait;
use backoff::future::retry;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// The on-chain box ledger as seen by the reward engine
///
/// Owners are wallet addresses in their canonical lowercase form. Reads may be
/// eventually consistent; the engine's own ledger stays authoritative for
/// reservations.
#[async_trait]
pub trait OnChainBridge: Send + Sync {
    /// Box token ids currently held by `owner`
    async fn owned_box_ids(&self, owner: &str) -> BridgeResult<Vec<u64>>;

    /// Number of NFTs from `collection` held by `owner`
    async fn nft_balance(&self, owner: &str, collection: &str) -> BridgeResult<u64>;

    /// Burn (or transfer to the campaign) a consumed box token, returning the tx hash
    async fn burn_or_transfer(&self, owner: &str, token_id: u64) -> BridgeResult<String>;
}

/// Decorates a bridge with bounded exponential-backoff retries
///
/// Transient failures (timeouts, unavailable nodes) are retried up to
/// `max_retries` times; anything else fails immediately. Exhausted retries are
/// reported as [`BridgeError::RetriesExhausted`] so callers can tell "the chain
/// is down" apart from "the chain said no".
pub struct RetryingBridge<B> {
    inner: B,
    config: BridgeConfig,
}

impl<B: OnChainBridge> RetryingBridge<B> {
    /// Create a new retrying bridge with default configuration
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            config: BridgeConfig::default(),
        }
    }

    /// Create a new retrying bridge with custom configuration
    pub fn with_config(inner: B, config: BridgeConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut call: F) -> BridgeResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BridgeResult<T>>,
    {
        let attempts = AtomicUsize::new(0);
        let max_retries = self.config.max_retries;

        let result = retry(self.config.retry_backoff.clone(), || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed);
            let fut = call();

            async move {
                match fut.await {
                    Ok(value) => {
                        debug!("{} succeeded on attempt {}", operation, attempt + 1);
                        Ok(value)
                    }
                    Err(e) if e.is_transient() && attempt < max_retries => {
                        warn!("{} attempt {} failed: {}", operation, attempt + 1, e);
                        Err(backoff::Error::Transient {
                            err: e,
                            retry_after: None,
                        })
                    }
                    Err(e) => Err(backoff::Error::Permanent(e)),
                }
            }
        })
        .await;

        result.map_err(|e| {
            if e.is_transient() {
                BridgeError::RetriesExhausted {
                    retries: attempts.load(Ordering::Relaxed).saturating_sub(1),
                    last_error: e.to_string(),
                }
            } else {
                e
            }
        })
    }
}

#[async_trait]
impl<B: OnChainBridge> OnChainBridge for RetryingBridge<B> {
    async fn owned_box_ids(&self, owner: &str) -> BridgeResult<Vec<u64>> {
        self.with_retry("owned_box_ids", || self.inner.owned_box_ids(owner))
            .await
    }

    async fn nft_balance(&self, owner: &str, collection: &str) -> BridgeResult<u64> {
        self.with_retry("nft_balance", || self.inner.nft_balance(owner, collection))
            .await
    }

    async fn burn_or_transfer(&self, owner: &str, token_id: u64) -> BridgeResult<String> {
        self.with_retry("burn_or_transfer", || {
            self.inner.burn_or_transfer(owner, token_id)
        })
        .await
    }
}
