//! Locate the source chain transaction a claim refers to.
//!
//! Two [`SearchStrategy`] implementations exist:
//! - [`IndexerSearch`]: asks an Etherscan-compatible indexer for the sender's history
//! - [`BlockScanSearch`]: walks the last day of blocks from the head backwards
//!
//! [`TransactionLocator`] runs the primary strategy and only consults the
//! fallback when the primary fails with an error. "Not found" is `Ok(None)`.

pub mod block_scan;
pub mod indexer;
pub mod strategy;

pub use block_scan::{BlockScanSearch, BlockSource, ProviderBlockSource, ScannedBlock, ScannedTransaction};
pub use indexer::{EtherscanIndexer, IndexedTransaction, Indexer, IndexerSearch};
pub use strategy::{LocatedTransaction, MatchCriteria, SearchStrategy};

use claim::{Claim, PipelineError};
use std::sync::Arc;
use tracing::{info, warn};

/// Two-tier transaction search.
#[derive(Clone)]
pub struct TransactionLocator {
    primary: Arc<dyn SearchStrategy>,
    fallback: Option<Arc<dyn SearchStrategy>>,
}

impl TransactionLocator {
    pub fn new(primary: Arc<dyn SearchStrategy>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn SearchStrategy>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Find the transaction matching `claim`'s from/to/amount inside its window.
    pub async fn locate(&self, claim: &Claim) -> Result<Option<LocatedTransaction>, PipelineError> {
        let criteria = MatchCriteria::from_claim(claim);
        let found = self.locate_matching(&criteria).await?;

        match &found {
            Some(tx) => info!(
                claim_id = %claim.id,
                tx_hash = %tx.hash,
                block_number = tx.block_number,
                "Located claimed transaction"
            ),
            None => info!(claim_id = %claim.id, "No matching transaction"),
        }

        Ok(found)
    }

    pub async fn locate_matching(
        &self,
        criteria: &MatchCriteria,
    ) -> Result<Option<LocatedTransaction>, PipelineError> {
        match self.primary.search(criteria).await {
            Ok(found) => Ok(found),
            Err(err) => {
                let Some(fallback) = &self.fallback else {
                    return Err(err);
                };
                warn!(
                    primary = self.primary.name(),
                    fallback = fallback.name(),
                    error = %err,
                    "Primary search failed, falling back"
                );
                fallback.search(criteria).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, U256};
    use async_trait::async_trait;
    use claim::{ClaimStatus, Service, UpstreamError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        result: Option<LocatedTransaction>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn found(hash: u8) -> Arc<Self> {
            Arc::new(Self {
                result: Some(LocatedTransaction {
                    hash: B256::repeat_byte(hash),
                    block_number: 1,
                    timestamp: 10,
                    from: Address::repeat_byte(0xa),
                    to: Address::repeat_byte(0xb),
                    value: U256::from(100),
                }),
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn empty() -> Arc<Self> {
            Arc::new(Self {
                result: None,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                result: None,
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SearchStrategy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn search(
            &self,
            _criteria: &MatchCriteria,
        ) -> Result<Option<LocatedTransaction>, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(UpstreamError::RateLimited {
                    service: Service::Indexer,
                    message: "Max rate limit reached".into(),
                }
                .into());
            }
            Ok(self.result.clone())
        }
    }

    fn claim() -> Claim {
        Claim {
            id: B256::repeat_byte(7),
            poster: Address::repeat_byte(1),
            source_chain_id: 1,
            from: Address::repeat_byte(0xa),
            to: Address::repeat_byte(0xb),
            amount: U256::from(100),
            min_confirmations: 2,
            deadline: 1_000_000,
            bounty: U256::ZERO,
            status: ClaimStatus::Open,
            winner: None,
        }
    }

    #[tokio::test]
    async fn test_primary_not_found_does_not_fall_back() {
        let primary = Fixed::empty();
        let fallback = Fixed::found(1);
        let locator = TransactionLocator::new(primary.clone()).with_fallback(fallback.clone());

        assert_eq!(locator.locate(&claim()).await.unwrap(), None);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_error_falls_back() {
        let primary = Fixed::failing();
        let fallback = Fixed::found(2);
        let locator = TransactionLocator::new(primary.clone()).with_fallback(fallback.clone());

        let found = locator.locate(&claim()).await.unwrap().unwrap();
        assert_eq!(found.hash, B256::repeat_byte(2));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_error_propagates() {
        let locator = TransactionLocator::new(Fixed::failing()).with_fallback(Fixed::failing());
        let err = locator.locate(&claim()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_no_fallback_propagates_primary_error() {
        let locator = TransactionLocator::new(Fixed::failing());
        assert!(locator.locate(&claim()).await.is_err());
    }
}
