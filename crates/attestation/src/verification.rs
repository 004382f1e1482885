//! Onchain proof verification.

use crate::proof::AttestationProof;
use alloy_primitives::Address;
use alloy_provider::Provider;
use async_trait::async_trait;
use binding::claimboard::{EVMTransactionProof, IFdcVerification};
use claim::{PipelineError, Service, UpstreamError};

/// Checks a proof against the merkle root relayed for its voting round.
#[async_trait]
pub trait ProofCheck: Send + Sync {
    async fn is_proved(&self, proof: &AttestationProof) -> Result<bool, PipelineError>;
}

/// [`ProofCheck`] backed by the FdcVerification contract.
#[derive(Debug, Clone)]
pub struct FdcVerification<P> {
    provider: P,
    address: Address,
}

impl<P> FdcVerification<P> {
    pub const fn new(provider: P, address: Address) -> Self {
        Self { provider, address }
    }
}

#[async_trait]
impl<P> ProofCheck for FdcVerification<P>
where
    P: Provider + Clone + 'static,
{
    async fn is_proved(&self, proof: &AttestationProof) -> Result<bool, PipelineError> {
        let verification = IFdcVerification::new(self.address, &self.provider);
        let proof: EVMTransactionProof = proof.clone().into();
        verification
            .verifyEVMTransaction(proof)
            .call()
            .await
            .map_err(|e| UpstreamError::transport(Service::Rpc, e).into())
    }
}
