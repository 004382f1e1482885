//! Verifier service client.
//!
//! A verifier checks the request against its own view of the source chain and
//! returns the ABI-encoded request the FdcHub accepts.

use crate::request::{AttestationRequest, EVM_TRANSACTION};
use alloy_primitives::Bytes;
use async_trait::async_trait;
use claim::{is_retryable_status, PipelineError, Service, UpstreamError};
use client::ClientError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Key the public testnet verifiers accept.
pub const PUBLIC_TESTNET_API_KEY: &str = "00000000-0000-0000-0000-000000000000";

#[async_trait]
pub trait VerifierService: Send + Sync {
    /// Return the ABI-encoded request if the verifier accepts it.
    ///
    /// Any answer other than "valid" is [`PipelineError::RequestRejected`].
    async fn prepare_request(&self, request: &AttestationRequest) -> Result<Bytes, PipelineError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrepareResponse {
    status: String,
    abi_encoded_request: Option<Bytes>,
    reason: Option<String>,
}

/// HTTP verifier for one source chain.
#[derive(Debug, Clone)]
pub struct HttpVerifier {
    client: reqwest::Client,
    url: String,
}

impl HttpVerifier {
    /// `verifier_name` is the chain's path segment, e.g. `eth-sepolia`.
    pub fn new(
        base_url: &str,
        verifier_name: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let url = format!(
            "{}/verifier/{}/{}/prepareRequest",
            base_url.trim_end_matches('/'),
            verifier_name,
            EVM_TRANSACTION
        );
        Ok(Self {
            client: client::http_client(timeout, &[("X-API-KEY", api_key)])?,
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl VerifierService for HttpVerifier {
    async fn prepare_request(&self, request: &AttestationRequest) -> Result<Bytes, PipelineError> {
        debug!(
            url = %self.url,
            tx_hash = %request.request_body.transaction_hash,
            "Preparing attestation request"
        );

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| UpstreamError::http(Service::Verifier, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_retryable_status(status.as_u16()) {
                return Err(UpstreamError::status(Service::Verifier, status.as_u16(), body).into());
            }
            warn!(status = status.as_u16(), body = %body, "Verifier refused request");
            return Err(PipelineError::RequestRejected {
                reason: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        let body: PrepareResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::decode(Service::Verifier, e))?;

        if !body.status.eq_ignore_ascii_case("valid") {
            let reason = body.reason.unwrap_or(body.status);
            warn!(reason = %reason, "Verifier rejected request");
            return Err(PipelineError::RequestRejected { reason });
        }

        body.abi_encoded_request.ok_or_else(|| {
            UpstreamError::decode(Service::Verifier, "valid response without abiEncodedRequest").into()
        })
    }
}
