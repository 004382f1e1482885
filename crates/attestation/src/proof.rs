//! Attestation proofs as served by the data availability layer.
//!
//! The JSON model mirrors the onchain struct one field at a time; conversion to
//! [`EVMTransactionProof`] only changes representation, never values, so the
//! merkle leaf computed onchain matches the one the proof was built for.

use crate::{request::RequestBody, serde_helpers};
use alloy_primitives::{Address, Bytes, B256, U256};
use binding::claimboard::{
    EVMTransactionEvent, EVMTransactionProof, EVMTransactionRequestBody, EVMTransactionResponse,
    EVMTransactionResponseBody,
};
use claim::{Claim, PipelineError, ProofRejection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(with = "serde_helpers::u32_flexible")]
    pub log_index: u32,
    pub emitter_address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub removed: bool,
}

/// Attested facts about the source chain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(with = "serde_helpers::u64_flexible")]
    pub block_number: u64,
    #[serde(with = "serde_helpers::u64_flexible")]
    pub timestamp: u64,
    pub source_address: Address,
    pub is_deployment: bool,
    pub receiving_address: Address,
    #[serde(with = "serde_helpers::u256")]
    pub value: U256,
    pub input: Bytes,
    #[serde(with = "serde_helpers::u8_flexible")]
    pub status: u8,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    pub attestation_type: B256,
    pub source_id: B256,
    #[serde(with = "serde_helpers::u64_flexible")]
    pub voting_round: u64,
    #[serde(with = "serde_helpers::u64_flexible")]
    pub lowest_used_timestamp: u64,
    pub request_body: RequestBody,
    pub response_body: ResponseBody,
}

/// Merkle proof and the response it proves, in the DA layer's envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationProof {
    #[serde(rename = "proof")]
    pub merkle_proof: Vec<B256>,
    #[serde(rename = "response")]
    pub data: AttestationResponse,
}

impl AttestationProof {
    pub const fn transaction_hash(&self) -> B256 {
        self.data.request_body.transaction_hash
    }

    pub const fn voting_round(&self) -> u64 {
        self.data.voting_round
    }

    /// Check the attested payment against the claim without touching the chain.
    ///
    /// Mirrors the ClaimBoard's own field checks so a hopeless proof is caught
    /// before paying gas.
    pub fn check_payment(&self, claim: &Claim) -> Result<(), PipelineError> {
        let body = &self.data.response_body;
        let mismatch = |reason: String| PipelineError::ProofRejected {
            kind: ProofRejection::TransactionMismatch,
            reason,
        };

        if body.source_address != claim.from {
            return Err(mismatch(format!(
                "attested sender {} differs from claimed {}",
                body.source_address, claim.from
            )));
        }
        if body.receiving_address != claim.to {
            return Err(mismatch(format!(
                "attested recipient {} differs from claimed {}",
                body.receiving_address, claim.to
            )));
        }
        if body.value != claim.amount {
            return Err(mismatch(format!(
                "attested value {} differs from claimed {}",
                body.value, claim.amount
            )));
        }
        if !claim.in_window(body.timestamp) {
            return Err(mismatch(format!(
                "attested timestamp {} outside [{}, {})",
                body.timestamp,
                claim.window_start(),
                claim.deadline
            )));
        }
        Ok(())
    }
}

impl From<Event> for EVMTransactionEvent {
    fn from(event: Event) -> Self {
        Self {
            logIndex: event.log_index,
            emitterAddress: event.emitter_address,
            topics: event.topics,
            data: event.data,
            removed: event.removed,
        }
    }
}

impl From<RequestBody> for EVMTransactionRequestBody {
    fn from(body: RequestBody) -> Self {
        Self {
            transactionHash: body.transaction_hash,
            requiredConfirmations: body.required_confirmations,
            provideInput: body.provide_input,
            listEvents: body.list_events,
            logIndices: body.log_indices,
        }
    }
}

impl From<ResponseBody> for EVMTransactionResponseBody {
    fn from(body: ResponseBody) -> Self {
        Self {
            blockNumber: body.block_number,
            timestamp: body.timestamp,
            sourceAddress: body.source_address,
            isDeployment: body.is_deployment,
            receivingAddress: body.receiving_address,
            value: body.value,
            input: body.input,
            status: body.status,
            events: body.events.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<AttestationProof> for EVMTransactionProof {
    fn from(proof: AttestationProof) -> Self {
        let data = proof.data;
        Self {
            merkleProof: proof.merkle_proof,
            data: EVMTransactionResponse {
                attestationType: data.attestation_type,
                sourceId: data.source_id,
                votingRound: data.voting_round,
                lowestUsedTimestamp: data.lowest_used_timestamp,
                requestBody: data.request_body.into(),
                responseBody: data.response_body.into(),
            },
        }
    }
}
