//! ClaimBoard seam: reads claims and sends resolution and cancel transactions.

use crate::{
    tx::{call_error, sign_and_send},
    SignerFn, Submitted,
};
use alloy_primitives::Address;
use alloy_provider::Provider;
use async_trait::async_trait;
use binding::claimboard::{ClaimRecord, EVMTransactionProof, IClaimBoard};
use claim::{address_from_bytes, Claim, ClaimId, ClaimStatus, PipelineError};
use tracing::debug;

/// Which resolution entrypoint a proof is presented to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The claimed transaction was found and attested.
    Payment,
    /// The attestation network confirmed absence after the deadline.
    NonExistence,
}

impl Resolution {
    pub const fn entrypoint(self) -> &'static str {
        match self {
            Self::Payment => "verifyPayment",
            Self::NonExistence => "verifyNonExistence",
        }
    }
}

/// Claim storage and resolution entrypoints.
#[async_trait]
pub trait ClaimResolver: Send + Sync {
    /// Read one claim. Unknown ids are [`PipelineError::NotFound`].
    async fn claim(&self, id: ClaimId) -> Result<Claim, PipelineError>;

    /// All claims currently Open.
    async fn open_claims(&self) -> Result<Vec<Claim>, PipelineError>;

    async fn simulate_resolution(
        &self,
        id: ClaimId,
        resolution: Resolution,
        proof: &EVMTransactionProof,
    ) -> Result<(), PipelineError>;

    async fn resolve(
        &self,
        id: ClaimId,
        resolution: Resolution,
        proof: EVMTransactionProof,
    ) -> Result<Submitted, PipelineError>;

    async fn simulate_cancel(&self, id: ClaimId) -> Result<(), PipelineError>;

    async fn cancel(&self, id: ClaimId) -> Result<Submitted, PipelineError>;

    /// Account the writes are sent from.
    fn sender(&self) -> Address;
}

/// [`ClaimResolver`] over a deployed ClaimBoard.
pub struct ClaimBoard<P> {
    provider: P,
    address: Address,
    signer: Option<SignerFn>,
    from: Address,
}

impl<P> ClaimBoard<P>
where
    P: Provider + Clone,
{
    /// Read-only board; writes fail with [`PipelineError::InputValidation`].
    pub const fn new(provider: P, address: Address) -> Self {
        Self {
            provider,
            address,
            signer: None,
            from: Address::ZERO,
        }
    }

    pub fn with_signer(mut self, signer: SignerFn, from: Address) -> Self {
        self.signer = Some(signer);
        self.from = from;
        self
    }

    pub const fn address(&self) -> Address {
        self.address
    }

    fn signer(&self) -> Result<&SignerFn, PipelineError> {
        self.signer
            .as_ref()
            .ok_or_else(|| PipelineError::input("claim board has no signer configured"))
    }
}

/// Convert a stored record. A zero poster means the id was never posted.
pub fn claim_from_record(id: ClaimId, record: ClaimRecord) -> Result<Claim, PipelineError> {
    if record.poster == Address::ZERO {
        return Err(PipelineError::NotFound(format!("claim {}", id)));
    }

    let status = ClaimStatus::try_from(record.status)?;
    Ok(Claim {
        id,
        poster: record.poster,
        source_chain_id: record.sourceChainId,
        from: address_from_bytes(&record.fromAddr)?,
        to: address_from_bytes(&record.toAddr)?,
        amount: record.amount,
        min_confirmations: record.minConfs,
        deadline: record.deadline,
        bounty: record.bounty,
        status,
        winner: (status == ClaimStatus::Resolved && record.winner != Address::ZERO)
            .then_some(record.winner),
    })
}

#[async_trait]
impl<P> ClaimResolver for ClaimBoard<P>
where
    P: Provider + Clone + 'static,
{
    async fn claim(&self, id: ClaimId) -> Result<Claim, PipelineError> {
        let record = IClaimBoard::new(self.address, &self.provider)
            .getClaim(id)
            .call()
            .await
            .map_err(|e| call_error("getClaim", e))?;

        claim_from_record(id, record)
    }

    async fn open_claims(&self) -> Result<Vec<Claim>, PipelineError> {
        let board = IClaimBoard::new(self.address, &self.provider);
        let count = board
            .getClaimsCount()
            .call()
            .await
            .map_err(|e| call_error("getClaimsCount", e))?;
        let count = count.saturating_to::<u64>();

        let mut open = Vec::new();
        for index in 0..count {
            let entry = board
                .getClaimByIndex(alloy_primitives::U256::from(index))
                .call()
                .await
                .map_err(|e| call_error("getClaimByIndex", e))?;

            if entry.status != 0 {
                continue;
            }
            open.push(self.claim(entry.claimId).await?);
        }

        debug!(total = count, open = open.len(), "Enumerated claims");
        Ok(open)
    }

    async fn simulate_resolution(
        &self,
        id: ClaimId,
        resolution: Resolution,
        proof: &EVMTransactionProof,
    ) -> Result<(), PipelineError> {
        let board = IClaimBoard::new(self.address, &self.provider);
        let result = match resolution {
            Resolution::Payment => board
                .verifyPayment(id, proof.clone())
                .from(self.from)
                .call()
                .await
                .map(|_| ()),
            Resolution::NonExistence => board
                .verifyNonExistence(id, proof.clone())
                .from(self.from)
                .call()
                .await
                .map(|_| ()),
        };
        result.map_err(|e| call_error(resolution.entrypoint(), e))
    }

    async fn resolve(
        &self,
        id: ClaimId,
        resolution: Resolution,
        proof: EVMTransactionProof,
    ) -> Result<Submitted, PipelineError> {
        let signer = self.signer()?;
        let board = IClaimBoard::new(self.address, &self.provider);
        let tx = match resolution {
            Resolution::Payment => board.verifyPayment(id, proof).into_transaction_request(),
            Resolution::NonExistence => {
                board.verifyNonExistence(id, proof).into_transaction_request()
            }
        }
        .from(self.from);

        sign_and_send(&self.provider, signer, resolution.entrypoint(), tx).await
    }

    async fn simulate_cancel(&self, id: ClaimId) -> Result<(), PipelineError> {
        IClaimBoard::new(self.address, &self.provider)
            .cancelClaim(id)
            .from(self.from)
            .call()
            .await
            .map(|_| ())
            .map_err(|e| call_error("cancelClaim", e))
    }

    async fn cancel(&self, id: ClaimId) -> Result<Submitted, PipelineError> {
        let signer = self.signer()?;
        let tx = IClaimBoard::new(self.address, &self.provider)
            .cancelClaim(id)
            .into_transaction_request()
            .from(self.from);

        sign_and_send(&self.provider, signer, "cancelClaim", tx).await
    }

    fn sender(&self) -> Address {
        self.from
    }
}
