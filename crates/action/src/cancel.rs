use crate::{board::ClaimResolver, Action, Submitted};
use claim::{ClaimId, ClaimStatus, PipelineError};
use std::sync::Arc;
use tracing::info;

/// Cancel an Open claim as its poster.
///
/// Does not touch any attestation attempt in flight for the claim; the board's
/// own status check decides between a racing cancel and resolution.
pub struct CancelClaimAction {
    resolver: Arc<dyn ClaimResolver>,
    claim_id: ClaimId,
}

impl CancelClaimAction {
    pub fn new(resolver: Arc<dyn ClaimResolver>, claim_id: ClaimId) -> Self {
        Self { resolver, claim_id }
    }
}

impl Action for CancelClaimAction {
    async fn is_ready(&self) -> Result<bool, PipelineError> {
        let claim = self.resolver.claim(self.claim_id).await?;
        Ok(claim.status == ClaimStatus::Open && claim.poster == self.resolver.sender())
    }

    async fn is_completed(&self) -> Result<bool, PipelineError> {
        let claim = self.resolver.claim(self.claim_id).await?;
        Ok(claim.status == ClaimStatus::Cancelled)
    }

    async fn execute(&mut self) -> Result<Submitted, PipelineError> {
        if !self.is_ready().await? {
            return Err(PipelineError::input(format!(
                "claim {} is not open or not posted by {}",
                self.claim_id,
                self.resolver.sender()
            )));
        }

        self.resolver.simulate_cancel(self.claim_id).await?;
        let submitted = self.resolver.cancel(self.claim_id).await?;

        info!(claim_id = %self.claim_id, tx_hash = %submitted.tx_hash, "Claim cancelled");
        Ok(submitted)
    }

    fn description(&self) -> String {
        format!("Cancel claim {}", self.claim_id)
    }
}
