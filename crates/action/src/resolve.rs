//! Present a finalized attestation proof to the ClaimBoard.

use crate::{
    board::{ClaimResolver, Resolution},
    Action, Submitted,
};
use binding::claimboard::EVMTransactionProof;
use claim::{ClaimId, PipelineError};
use std::sync::Arc;
use tracing::{error, info};

/// Resolves a claim with a proof exactly as delivered by the attestation network.
///
/// The call is simulated first. Any revert from either the simulation or the
/// real transaction becomes [`PipelineError::ProofRejected`] with the
/// contract's reason untouched, and leaves this action uncompleted.
pub struct ProofVerifier {
    resolver: Arc<dyn ClaimResolver>,
    claim_id: ClaimId,
    resolution: Resolution,
    proof: EVMTransactionProof,
    outcome: Option<Submitted>,
}

impl ProofVerifier {
    pub fn new(
        resolver: Arc<dyn ClaimResolver>,
        claim_id: ClaimId,
        resolution: Resolution,
        proof: EVMTransactionProof,
    ) -> Self {
        Self {
            resolver,
            claim_id,
            resolution,
            proof,
            outcome: None,
        }
    }

    /// Transaction that resolved the claim, once accepted.
    pub const fn outcome(&self) -> Option<&Submitted> {
        self.outcome.as_ref()
    }

    fn rejected(&self, err: PipelineError) -> PipelineError {
        match err {
            PipelineError::ChainRevert { reason, .. } => {
                let err = PipelineError::proof_rejected(reason);
                error!(
                    claim_id = %self.claim_id,
                    entrypoint = self.resolution.entrypoint(),
                    error = %err,
                    "Proof rejected"
                );
                err
            }
            other => other,
        }
    }
}

impl Action for ProofVerifier {
    async fn is_ready(&self) -> Result<bool, PipelineError> {
        Ok(self.outcome.is_none())
    }

    async fn is_completed(&self) -> Result<bool, PipelineError> {
        Ok(self.outcome.is_some())
    }

    async fn execute(&mut self) -> Result<Submitted, PipelineError> {
        if let Some(outcome) = &self.outcome {
            return Ok(outcome.clone());
        }

        self.resolver
            .simulate_resolution(self.claim_id, self.resolution, &self.proof)
            .await
            .map_err(|e| self.rejected(e))?;

        let submitted = self
            .resolver
            .resolve(self.claim_id, self.resolution, self.proof.clone())
            .await
            .map_err(|e| self.rejected(e))?;

        info!(
            claim_id = %self.claim_id,
            tx_hash = %submitted.tx_hash,
            entrypoint = self.resolution.entrypoint(),
            "Claim resolved"
        );
        self.outcome = Some(submitted.clone());
        Ok(submitted)
    }

    fn description(&self) -> String {
        format!("{} for claim {}", self.resolution.entrypoint(), self.claim_id)
    }
}
