//! Attestation hub seam.

use crate::{
    tx::{call_error, sign_and_broadcast, wait_for_inclusion},
    SignerFn, Submitted,
};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use binding::fdc::{IFdcHub, IFdcRequestFeeConfigurations};
use claim::PipelineError;

/// Chain entrypoints pricing and accepting attestation requests.
#[async_trait]
pub trait AttestationHub: Send + Sync {
    /// Exact fee for `request`. Read-only.
    async fn request_fee(&self, request: &Bytes) -> Result<U256, PipelineError>;

    /// Dry-run the paid submission; a revert comes back as [`PipelineError::ChainRevert`].
    async fn simulate(&self, request: &Bytes, fee: U256) -> Result<(), PipelineError>;

    /// Sign and send the paid submission. Returns once the node accepted it.
    async fn broadcast(&self, request: &Bytes, fee: U256) -> Result<TxHash, PipelineError>;

    /// Wait for a broadcast submission of `request` to be included.
    async fn confirm(
        &self,
        request: &Bytes,
        fee: U256,
        tx_hash: TxHash,
    ) -> Result<Submitted, PipelineError>;
}

/// [`AttestationHub`] over the FdcHub and its fee configuration.
pub struct FdcHub<P> {
    provider: P,
    signer: SignerFn,
    from: Address,
    hub: Address,
    fee_config: Address,
    gas_limit: u64,
}

impl<P> FdcHub<P>
where
    P: Provider + Clone,
{
    pub fn new(
        provider: P,
        signer: SignerFn,
        from: Address,
        hub: Address,
        fee_config: Address,
        gas_limit: u64,
    ) -> Self {
        Self {
            provider,
            signer,
            from,
            hub,
            fee_config,
            gas_limit,
        }
    }

    pub const fn hub_address(&self) -> Address {
        self.hub
    }

    fn submission(&self, request: &Bytes, fee: U256) -> TransactionRequest {
        IFdcHub::new(self.hub, &self.provider)
            .requestAttestation(request.clone())
            .value(fee)
            .gas(self.gas_limit)
            .into_transaction_request()
            .from(self.from)
    }
}

#[async_trait]
impl<P> AttestationHub for FdcHub<P>
where
    P: Provider + Clone + 'static,
{
    async fn request_fee(&self, request: &Bytes) -> Result<U256, PipelineError> {
        IFdcRequestFeeConfigurations::new(self.fee_config, &self.provider)
            .getRequestFee(request.clone())
            .call()
            .await
            .map_err(|e| call_error("getRequestFee", e))
    }

    async fn simulate(&self, request: &Bytes, fee: U256) -> Result<(), PipelineError> {
        IFdcHub::new(self.hub, &self.provider)
            .requestAttestation(request.clone())
            .from(self.from)
            .value(fee)
            .call()
            .await
            .map(|_| ())
            .map_err(|e| call_error("requestAttestation", e))
    }

    async fn broadcast(&self, request: &Bytes, fee: U256) -> Result<TxHash, PipelineError> {
        let tx = self.submission(request, fee);
        sign_and_broadcast(&self.provider, &self.signer, "requestAttestation", tx).await
    }

    async fn confirm(
        &self,
        request: &Bytes,
        fee: U256,
        tx_hash: TxHash,
    ) -> Result<Submitted, PipelineError> {
        let replay = self.submission(request, fee);
        wait_for_inclusion(&self.provider, "requestAttestation", tx_hash, replay).await
    }
}
