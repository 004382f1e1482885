//! Proof retrieval from the data availability layer.

use crate::proof::AttestationProof;
use alloy_primitives::Bytes;
use async_trait::async_trait;
use claim::{PipelineError, Service, UpstreamError};
use client::ClientError;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Source of finalized attestation proofs.
#[async_trait]
pub trait ProofSource: Send + Sync {
    /// Proof for `request_bytes` attested in `voting_round`.
    ///
    /// `Ok(None)` means the round has no proof for this request (yet).
    async fn proof(
        &self,
        voting_round: u64,
        request_bytes: &Bytes,
    ) -> Result<Option<AttestationProof>, PipelineError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofRequest<'a> {
    voting_round_id: u64,
    request_bytes: &'a Bytes,
}

/// Client for the DA layer's `proof-by-request-round` endpoint.
#[derive(Debug, Clone)]
pub struct DaLayerClient {
    client: reqwest::Client,
    url: String,
}

impl DaLayerClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: client::http_client(timeout, &[("x-api-key", api_key)])?,
            url: format!(
                "{}/api/v1/fdc/proof-by-request-round",
                base_url.trim_end_matches('/')
            ),
        })
    }
}

#[async_trait]
impl ProofSource for DaLayerClient {
    async fn proof(
        &self,
        voting_round: u64,
        request_bytes: &Bytes,
    ) -> Result<Option<AttestationProof>, PipelineError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ProofRequest {
                voting_round_id: voting_round,
                request_bytes,
            })
            .send()
            .await
            .map_err(|e| UpstreamError::http(Service::DataAvailability, &e))?;

        let status = response.status().as_u16();
        if matches!(status, 400 | 404) {
            debug!(voting_round, status, "Proof not available");
            return Ok(None);
        }
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::status(Service::DataAvailability, status, body).into());
        }

        let proof = response
            .json::<AttestationProof>()
            .await
            .map_err(|e| UpstreamError::decode(Service::DataAvailability, e))?;

        debug!(
            voting_round,
            tx_hash = %proof.transaction_hash(),
            siblings = proof.merkle_proof.len(),
            "Fetched attestation proof"
        );
        Ok(Some(proof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::tests::proof_json;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PATH: &str = "/api/v1/fdc/proof-by-request-round";

    fn client(server: &MockServer) -> DaLayerClient {
        DaLayerClient::new(&server.uri(), "da-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetches_proof() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .and(header("x-api-key", "da-key"))
            .and(body_json(json!({"votingRoundId": 1_043_210, "requestBytes": "0xdeadbeef"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(proof_json()))
            .expect(1)
            .mount(&server)
            .await;

        let proof = client(&server)
            .proof(1_043_210, &Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(proof.voting_round(), 1_043_210);
    }

    #[tokio::test]
    async fn test_missing_proof_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "not found"})))
            .mount(&server)
            .await;

        let proof = client(&server).proof(1, &Bytes::new()).await.unwrap();
        assert!(proof.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).proof(1, &Bytes::new()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_proof_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": null})))
            .mount(&server)
            .await;

        let err = client(&server).proof(1, &Bytes::new()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Upstream(UpstreamError::Decode { .. })
        ));
    }
}
