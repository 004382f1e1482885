//! Error taxonomy shared by every pipeline stage.
//!
//! Only [`PipelineError::Upstream`] is worth retrying as-is. Every other variant
//! is terminal for the current attempt and needs the caller (or an operator) to
//! change something first.

use std::{fmt, future::Future, time::Duration};
use thiserror::Error;

/// Offchain or onchain service a request was made to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Indexer,
    BlockSource,
    Verifier,
    DataAvailability,
    Rpc,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Indexer => "indexer",
            Self::BlockSource => "block source",
            Self::Verifier => "verifier",
            Self::DataAvailability => "data availability layer",
            Self::Rpc => "rpc",
        };
        f.write_str(name)
    }
}

/// Transport-level failure talking to a service. Always retryable.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} request timed out")]
    Timeout { service: Service },

    #[error("{service} rate limited: {message}")]
    RateLimited { service: Service, message: String },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: Service,
        status: u16,
        body: String,
    },

    #[error("{service} transport error: {message}")]
    Transport { service: Service, message: String },

    #[error("{service} returned a malformed response: {message}")]
    Decode { service: Service, message: String },
}

impl UpstreamError {
    pub const fn service(&self) -> Service {
        match self {
            Self::Timeout { service }
            | Self::RateLimited { service, .. }
            | Self::Status { service, .. }
            | Self::Transport { service, .. }
            | Self::Decode { service, .. } => *service,
        }
    }

    pub fn transport(service: Service, err: impl fmt::Display) -> Self {
        Self::Transport {
            service,
            message: err.to_string(),
        }
    }

    pub fn decode(service: Service, err: impl fmt::Display) -> Self {
        Self::Decode {
            service,
            message: err.to_string(),
        }
    }

    /// Map a failed HTTP exchange.
    pub fn http(service: Service, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { service }
        } else if err.is_decode() {
            Self::decode(service, err)
        } else {
            Self::transport(service, err)
        }
    }

    /// Map a non-success HTTP status that is worth retrying.
    pub fn status(service: Service, status: u16, body: String) -> Self {
        if status == 429 {
            Self::RateLimited {
                service,
                message: body,
            }
        } else {
            Self::Status {
                service,
                status,
                body,
            }
        }
    }
}

/// Whether an HTTP status means "try again later" rather than "this request is wrong".
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429) || status >= 500
}

/// Known reasons the ClaimBoard rejects a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofRejection {
    /// Merkle root mismatch
    InvalidProof,
    /// Attested transaction does not match the claim fields
    TransactionMismatch,
    ClaimAlreadyResolved,
    ClaimExpired,
    /// Revert reason not recognized
    Other,
}

impl ProofRejection {
    /// Classify a revert reason without altering it.
    pub fn classify(reason: &str) -> Self {
        let normalized = reason.to_ascii_lowercase().replace([' ', '_'], "");
        if normalized.contains("alreadyresolved") {
            Self::ClaimAlreadyResolved
        } else if normalized.contains("invalidproof") {
            Self::InvalidProof
        } else if normalized.contains("transactionmismatch") {
            Self::TransactionMismatch
        } else if normalized.contains("claimexpired") {
            Self::ClaimExpired
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for ProofRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidProof => "invalid proof",
            Self::TransactionMismatch => "transaction mismatch",
            Self::ClaimAlreadyResolved => "claim already resolved",
            Self::ClaimExpired => "claim expired",
            Self::Other => "rejected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed hash, oversized identifier, inconsistent request fields.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// A referenced object does not exist (unknown claim id, missing block).
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The verifier service answered, but refused to prepare the request.
    #[error("verifier rejected request: {reason}")]
    RequestRejected { reason: String },

    /// Simulation or submission reverted; `reason` is the contract's own message.
    #[error("{call} reverted: {reason}")]
    ChainRevert { call: &'static str, reason: String },

    /// The ClaimBoard refused the final proof.
    #[error("proof rejected ({kind}): {reason}")]
    ProofRejected { kind: ProofRejection, reason: String },
}

impl PipelineError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputValidation(message.into())
    }

    /// Build a [`PipelineError::ProofRejected`], classifying the raw reason.
    pub fn proof_rejected(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::ProofRejected {
            kind: ProofRejection::classify(&reason),
            reason,
        }
    }

    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }

    /// Short label for metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InputValidation(_) => "input_validation",
            Self::NotFound(_) => "not_found",
            Self::Upstream(_) => "upstream",
            Self::RequestRejected { .. } => "request_rejected",
            Self::ChainRevert { .. } => "chain_revert",
            Self::ProofRejected { .. } => "proof_rejected",
        }
    }
}

/// Run `fut` under `timeout`; an elapsed timer becomes [`UpstreamError::Timeout`].
pub async fn with_timeout<T, F>(service: Service, timeout: Duration, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout { service }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_custom_error_names() {
        assert_eq!(
            ProofRejection::classify("ClaimAlreadyResolved()"),
            ProofRejection::ClaimAlreadyResolved
        );
        assert_eq!(ProofRejection::classify("InvalidProof()"), ProofRejection::InvalidProof);
        assert_eq!(
            ProofRejection::classify("TransactionMismatch()"),
            ProofRejection::TransactionMismatch
        );
        assert_eq!(ProofRejection::classify("ClaimExpired()"), ProofRejection::ClaimExpired);
    }

    #[test]
    fn test_classify_revert_strings() {
        assert_eq!(
            ProofRejection::classify("Claim already resolved"),
            ProofRejection::ClaimAlreadyResolved
        );
        assert_eq!(ProofRejection::classify("out of gas"), ProofRejection::Other);
    }

    #[test]
    fn test_proof_rejected_keeps_reason() {
        let err = PipelineError::proof_rejected("ClaimAlreadyResolved()");
        match &err {
            PipelineError::ProofRejected { kind, reason } => {
                assert_eq!(*kind, ProofRejection::ClaimAlreadyResolved);
                assert_eq!(reason, "ClaimAlreadyResolved()");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("claim already resolved"));
    }

    #[test]
    fn test_only_upstream_is_retryable() {
        let upstream: PipelineError = UpstreamError::Timeout {
            service: Service::Indexer,
        }
        .into();
        assert!(upstream.is_retryable());
        assert!(!PipelineError::input("bad").is_retryable());
        assert!(!PipelineError::RequestRejected {
            reason: "x".into()
        }
        .is_retryable());
        assert!(!PipelineError::ChainRevert {
            call: "requestAttestation",
            reason: "x".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            UpstreamError::status(Service::Indexer, 429, "slow down".into()),
            UpstreamError::RateLimited { .. }
        ));
        assert!(matches!(
            UpstreamError::status(Service::Verifier, 503, String::new()),
            UpstreamError::Status { status: 503, .. }
        ));
        assert!(is_retryable_status(502));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_elapses() {
        let result: Result<(), _> = with_timeout(Service::Verifier, Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(
            result,
            Err(PipelineError::Upstream(UpstreamError::Timeout {
                service: Service::Verifier
            }))
        ));
    }
}
