use crate::{
    request::{AttestationRequest, RequestBody},
    verifier::VerifierService,
};
use alloy_primitives::{Bytes, B256};
use claim::PipelineError;
use std::sync::Arc;
use tracing::info;

/// A verifier-accepted request, ready to be paid for and submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub request: AttestationRequest,
    pub abi_encoded: Bytes,
}

/// Turns located transactions into verifier-accepted attestation requests.
#[derive(Clone)]
pub struct AttestationRequestBuilder {
    verifier: Arc<dyn VerifierService>,
    source_id: String,
    default_confirmations: u32,
}

impl AttestationRequestBuilder {
    pub fn new(verifier: Arc<dyn VerifierService>, source_id: impl Into<String>) -> Self {
        Self {
            verifier,
            source_id: source_id.into(),
            default_confirmations: 2,
        }
    }

    /// Confirmations used when a claim does not ask for any.
    pub const fn with_default_confirmations(mut self, confirmations: u32) -> Self {
        self.default_confirmations = confirmations;
        self
    }

    /// Assemble the request for a payment transaction. No network access.
    pub fn request_for(
        &self,
        transaction_hash: B256,
        min_confirmations: u32,
    ) -> Result<AttestationRequest, PipelineError> {
        let confirmations = if min_confirmations == 0 {
            self.default_confirmations
        } else {
            min_confirmations
        };
        let body = RequestBody::payment(transaction_hash, confirmations)?;
        AttestationRequest::evm_transaction(&self.source_id, body)
    }

    /// Build the request and have the verifier encode it.
    pub async fn prepare(
        &self,
        transaction_hash: B256,
        min_confirmations: u32,
    ) -> Result<PreparedRequest, PipelineError> {
        let request = self.request_for(transaction_hash, min_confirmations)?;
        self.submit_to_verifier(request).await
    }

    /// Validate-then-send for a caller-assembled request.
    pub async fn submit_to_verifier(
        &self,
        request: AttestationRequest,
    ) -> Result<PreparedRequest, PipelineError> {
        request.request_body.validate()?;
        let abi_encoded = self.verifier.prepare_request(&request).await?;
        info!(
            tx_hash = %request.request_body.transaction_hash,
            bytes = abi_encoded.len(),
            "Verifier accepted attestation request"
        );
        Ok(PreparedRequest {
            request,
            abi_encoded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingVerifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VerifierService for CountingVerifier {
        async fn prepare_request(&self, _request: &AttestationRequest) -> Result<Bytes, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"encoded"))
        }
    }

    #[tokio::test]
    async fn test_prepare_uses_claim_confirmations() {
        let verifier = Arc::new(CountingVerifier::default());
        let builder = AttestationRequestBuilder::new(verifier.clone(), "testETH");

        let prepared = builder.prepare(B256::repeat_byte(1), 6).await.unwrap();
        assert_eq!(prepared.request.request_body.required_confirmations, 6);
        assert_eq!(prepared.abi_encoded, Bytes::from_static(b"encoded"));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_confirmations_use_default() {
        let builder = AttestationRequestBuilder::new(Arc::new(CountingVerifier::default()), "testETH")
            .with_default_confirmations(3);
        let request = builder.request_for(B256::repeat_byte(1), 0).unwrap();
        assert_eq!(request.request_body.required_confirmations, 3);
        assert!(!request.request_body.list_events);
        assert!(request.request_body.log_indices.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_verifier() {
        let verifier = Arc::new(CountingVerifier::default());
        let builder = AttestationRequestBuilder::new(verifier.clone(), "testETH");

        let err = builder.prepare(B256::repeat_byte(1), 100_000).await.unwrap_err();
        assert!(matches!(err, PipelineError::InputValidation(_)));

        let long_source = AttestationRequestBuilder::new(verifier.clone(), "x".repeat(33));
        assert!(long_source.prepare(B256::repeat_byte(1), 2).await.is_err());

        let mut request = builder.request_for(B256::repeat_byte(1), 2).unwrap();
        request.request_body.log_indices = vec![0, 4];
        let err = builder.submit_to_verifier(request).await.unwrap_err();
        assert!(matches!(err, PipelineError::InputValidation(_)));

        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }
}
