//! Voting round finalization.

use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use async_trait::async_trait;
use binding::fdc::IRelay;
use claim::{PipelineError, Service, UpstreamError};

#[async_trait]
pub trait RoundFinality: Send + Sync {
    async fn is_finalized(&self, voting_round: u64) -> Result<bool, PipelineError>;
}

/// Finality as recorded by the Relay contract.
#[derive(Debug, Clone)]
pub struct RelayFinality<P> {
    provider: P,
    relay: Address,
    protocol_id: u8,
}

impl<P> RelayFinality<P> {
    pub const fn new(provider: P, relay: Address, protocol_id: u8) -> Self {
        Self {
            provider,
            relay,
            protocol_id,
        }
    }
}

#[async_trait]
impl<P> RoundFinality for RelayFinality<P>
where
    P: Provider + Clone + 'static,
{
    async fn is_finalized(&self, voting_round: u64) -> Result<bool, PipelineError> {
        let relay = IRelay::new(self.relay, &self.provider);
        relay
            .isFinalized(U256::from(self.protocol_id), U256::from(voting_round))
            .call()
            .await
            .map_err(|e| UpstreamError::transport(Service::Rpc, e).into())
    }
}
