//! Indexer-backed search.
//!
//! The indexer returns a sender's history newest-first; the first record that
//! matches the claim wins.

use crate::{LocatedTransaction, MatchCriteria, SearchStrategy};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use claim::{with_timeout, PipelineError, Service, UpstreamError};
use client::ClientError;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// One record of the indexer's transaction list, as returned on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedTransaction {
    pub hash: String,
    pub from: String,
    /// Empty for contract creations
    #[serde(default)]
    pub to: String,
    /// Decimal wei
    pub value: String,
    /// Decimal unix seconds
    pub time_stamp: String,
    pub block_number: String,
}

impl IndexedTransaction {
    /// Parse into typed fields; `None` for records that cannot be a payment.
    fn parse(&self) -> Option<LocatedTransaction> {
        Some(LocatedTransaction {
            hash: self.hash.parse::<B256>().ok()?,
            from: self.from.parse::<Address>().ok()?,
            to: self.to.parse::<Address>().ok()?,
            value: U256::from_str_radix(&self.value, 10).ok()?,
            timestamp: self.time_stamp.parse().ok()?,
            block_number: self.block_number.parse().ok()?,
        })
    }
}

/// Source of per-address transaction history.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Transactions involving `address`, newest first.
    async fn transactions(&self, address: Address) -> Result<Vec<IndexedTransaction>, PipelineError>;
}

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: serde_json::Value,
}

/// Etherscan-compatible `account/txlist` client.
#[derive(Debug, Clone)]
pub struct EtherscanIndexer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl EtherscanIndexer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            client: client::http_client(timeout, &[])?,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn decode(body: EtherscanResponse) -> Result<Vec<IndexedTransaction>, PipelineError> {
        if body.status == "1" {
            return serde_json::from_value(body.result)
                .map_err(|e| UpstreamError::decode(Service::Indexer, e).into());
        }

        // status "0" covers both an empty history and real failures
        if body.message.contains("No transactions found") {
            return Ok(Vec::new());
        }

        let detail = match &body.result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if detail.to_ascii_lowercase().contains("rate limit") {
            return Err(UpstreamError::RateLimited {
                service: Service::Indexer,
                message: detail,
            }
            .into());
        }

        Err(UpstreamError::Status {
            service: Service::Indexer,
            status: 200,
            body: format!("{}: {}", body.message, detail),
        }
        .into())
    }
}

#[async_trait]
impl Indexer for EtherscanIndexer {
    async fn transactions(&self, address: Address) -> Result<Vec<IndexedTransaction>, PipelineError> {
        let address = address.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address.as_str()),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("sort", "desc"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::http(Service::Indexer, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::status(Service::Indexer, status.as_u16(), body).into());
        }

        let body: EtherscanResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::decode(Service::Indexer, e))?;

        Self::decode(body)
    }
}

/// Primary search strategy backed by an [`Indexer`].
pub struct IndexerSearch<I> {
    indexer: I,
    request_timeout: Option<Duration>,
}

impl<I> IndexerSearch<I> {
    pub const fn new(indexer: I) -> Self {
        Self {
            indexer,
            request_timeout: None,
        }
    }

    /// Bound the history request; an elapsed timer is [`UpstreamError::Timeout`].
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl<I> SearchStrategy for IndexerSearch<I>
where
    I: Indexer,
{
    fn name(&self) -> &'static str {
        "indexer"
    }

    async fn search(&self, criteria: &MatchCriteria) -> Result<Option<LocatedTransaction>, PipelineError> {
        let fetch = self.indexer.transactions(criteria.from);
        let records = match self.request_timeout {
            Some(timeout) => with_timeout(Service::Indexer, timeout, fetch).await?,
            None => fetch.await?,
        };
        debug!(count = records.len(), from = %criteria.from, "Fetched indexed transactions");

        for record in &records {
            let Some(tx) = record.parse() else {
                debug!(hash = %record.hash, "Skipping unparsable indexer record");
                continue;
            };
            if criteria.matches(tx.from, Some(tx.to), tx.value, tx.timestamp) {
                return Ok(Some(tx));
            }
        }

        Ok(None)
    }
}
