//! Block-scan fallback search.
//!
//! Walks back from the chain head over roughly one search window worth of
//! blocks, inspecting every transaction of every in-window block.

use crate::{LocatedTransaction, MatchCriteria, SearchStrategy};
use alloy_primitives::{Address, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::BlockNumberOrTag;
use async_trait::async_trait;
use claim::{with_timeout, PipelineError, Service, UpstreamError, SEARCH_WINDOW_SECS};
use std::{future::Future, time::Duration};
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedTransaction {
    pub hash: B256,
    pub from: Address,
    /// `None` for contract creations
    pub to: Option<Address>,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedBlock {
    pub number: u64,
    pub timestamp: u64,
    pub transactions: Vec<ScannedTransaction>,
}

/// Read access to source chain blocks.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Current head block number.
    async fn head(&self) -> Result<u64, PipelineError>;

    /// Block with full transactions, `None` if the node does not know it.
    async fn block(&self, number: u64) -> Result<Option<ScannedBlock>, PipelineError>;
}

/// [`BlockSource`] over an alloy provider.
#[derive(Debug, Clone)]
pub struct ProviderBlockSource<P> {
    provider: P,
}

impl<P> ProviderBlockSource<P> {
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P> BlockSource for ProviderBlockSource<P>
where
    P: Provider + Clone + 'static,
{
    async fn head(&self) -> Result<u64, PipelineError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| UpstreamError::transport(Service::BlockSource, e).into())
    }

    async fn block(&self, number: u64) -> Result<Option<ScannedBlock>, PipelineError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .full()
            .await
            .map_err(|e| UpstreamError::transport(Service::BlockSource, e))?;

        Ok(block.map(|block| {
            let transactions = block
                .transactions
                .txns()
                .map(|tx| ScannedTransaction {
                    hash: alloy_network::TransactionResponse::tx_hash(tx),
                    from: alloy_network::TransactionResponse::from(tx),
                    to: alloy_consensus::Transaction::to(tx),
                    value: alloy_consensus::Transaction::value(tx),
                })
                .collect();

            ScannedBlock {
                number: block.header.number,
                timestamp: block.header.timestamp,
                transactions,
            }
        }))
    }
}

/// Fallback search strategy scanning recent blocks.
///
/// A scan issues thousands of sequential requests, so the timeout applies to
/// each `head`/`block` call on its own, never to the scan as a whole.
pub struct BlockScanSearch<B> {
    source: B,
    block_time_secs: u64,
    window_secs: u64,
    request_timeout: Option<Duration>,
}

impl<B> BlockScanSearch<B>
where
    B: BlockSource,
{
    pub const fn new(source: B, block_time_secs: u64) -> Self {
        Self {
            source,
            block_time_secs,
            window_secs: SEARCH_WINDOW_SECS,
            request_timeout: None,
        }
    }

    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    async fn timed<T>(
        &self,
        fut: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, PipelineError> {
        match self.request_timeout {
            Some(timeout) => with_timeout(Service::BlockSource, timeout, fut).await,
            None => fut.await,
        }
    }

    /// Number of blocks covering the search window (7200 at 12s blocks).
    pub const fn lookback_blocks(&self) -> u64 {
        let block_time = if self.block_time_secs == 0 {
            1
        } else {
            self.block_time_secs
        };
        self.window_secs.div_ceil(block_time)
    }

    /// Fetch a single block with retry and exponential backoff.
    async fn block_with_retry(&self, number: u64) -> Result<Option<ScannedBlock>, PipelineError> {
        // 100ms, 200ms, 400ms, 800ms, 1.6s (max 5 attempts)
        let retry_strategy = ExponentialBackoff::from_millis(2).factor(50).take(5);

        RetryIf::spawn(
            retry_strategy,
            || async {
                self.timed(self.source.block(number)).await.map_err(|e| {
                    warn!(block = number, error = %e, "Block fetch failed, will retry");
                    e
                })
            },
            |e: &PipelineError| e.is_retryable(),
        )
        .await
    }
}

#[async_trait]
impl<B> SearchStrategy for BlockScanSearch<B>
where
    B: BlockSource,
{
    fn name(&self) -> &'static str {
        "block-scan"
    }

    async fn search(&self, criteria: &MatchCriteria) -> Result<Option<LocatedTransaction>, PipelineError> {
        let head = self.timed(self.source.head()).await?;
        let lowest = head.saturating_sub(self.lookback_blocks().saturating_sub(1));

        debug!(from = head, to = lowest, "Scanning blocks newest to oldest");

        for number in (lowest..=head).rev() {
            let Some(block) = self.block_with_retry(number).await? else {
                continue;
            };

            if block.timestamp >= criteria.deadline {
                continue;
            }
            if block.timestamp < criteria.window_start {
                debug!(block = number, "Reached blocks older than the search window");
                break;
            }

            for tx in &block.transactions {
                if criteria.matches(tx.from, tx.to, tx.value, block.timestamp) {
                    return Ok(Some(LocatedTransaction {
                        hash: tx.hash,
                        block_number: block.number,
                        timestamp: block.timestamp,
                        from: tx.from,
                        to: criteria.to,
                        value: tx.value,
                    }));
                }
            }
        }

        Ok(None)
    }
}
