//! `EVMTransaction` attestation request model.

use crate::encoding::encode_bytes32;
use alloy_primitives::B256;
use claim::PipelineError;
use serde::{Deserialize, Serialize};

/// Attestation type name understood by the verifiers.
pub const EVM_TRANSACTION: &str = "EVMTransaction";

/// Verifiers refuse requests listing more events than this.
pub const MAX_LOG_INDICES: usize = 50;

/// Parse a `0x`-prefixed 32-byte transaction hash.
pub fn parse_transaction_hash(hash: &str) -> Result<B256, PipelineError> {
    let hex = hash
        .strip_prefix("0x")
        .ok_or_else(|| PipelineError::input(format!("transaction hash {:?} lacks 0x prefix", hash)))?;
    if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(PipelineError::input(format!(
            "transaction hash {:?} is not 32 hex-encoded bytes",
            hash
        )));
    }
    hash.parse()
        .map_err(|e| PipelineError::input(format!("transaction hash {:?}: {}", hash, e)))
}

/// Request body of an `EVMTransaction` attestation.
///
/// `log_indices` must be empty unless `list_events` is set, and sorted and
/// de-duplicated otherwise. [`RequestBody::new`] normalizes and checks this;
/// [`RequestBody::validate`] re-checks hand-built values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    pub transaction_hash: B256,
    #[serde(with = "crate::serde_helpers::u16_string")]
    pub required_confirmations: u16,
    pub provide_input: bool,
    pub list_events: bool,
    pub log_indices: Vec<u32>,
}

impl RequestBody {
    pub fn new(
        transaction_hash: B256,
        required_confirmations: u32,
        provide_input: bool,
        list_events: bool,
        mut log_indices: Vec<u32>,
    ) -> Result<Self, PipelineError> {
        let required_confirmations = u16::try_from(required_confirmations).map_err(|_| {
            PipelineError::input(format!(
                "required confirmations {} do not fit in uint16",
                required_confirmations
            ))
        })?;

        log_indices.sort_unstable();
        log_indices.dedup();

        let body = Self {
            transaction_hash,
            required_confirmations,
            provide_input,
            list_events,
            log_indices,
        };
        body.validate()?;
        Ok(body)
    }

    /// Check the log index invariants.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.list_events && !self.log_indices.is_empty() {
            return Err(PipelineError::input(
                "log indices must be empty when events are not listed",
            ));
        }
        if self.log_indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PipelineError::input(
                "log indices must be sorted ascending without duplicates",
            ));
        }
        if self.log_indices.len() > MAX_LOG_INDICES {
            return Err(PipelineError::input(format!(
                "at most {} log indices may be requested, got {}",
                MAX_LOG_INDICES,
                self.log_indices.len()
            )));
        }
        Ok(())
    }

    /// Request for a plain payment: input provided, no events.
    pub fn payment(transaction_hash: B256, required_confirmations: u32) -> Result<Self, PipelineError> {
        Self::new(transaction_hash, required_confirmations, true, false, Vec::new())
    }
}

/// Full request as sent to a verifier service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRequest {
    pub attestation_type: B256,
    pub source_id: B256,
    pub request_body: RequestBody,
}

impl AttestationRequest {
    pub fn evm_transaction(source_id: &str, request_body: RequestBody) -> Result<Self, PipelineError> {
        Ok(Self {
            attestation_type: encode_bytes32(EVM_TRANSACTION)?,
            source_id: encode_bytes32(source_id)?,
            request_body,
        })
    }
}
