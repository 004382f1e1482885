//! Pay for and submit an attestation request.
//!
//! The fee is read, the paid call is simulated, and only a clean simulation is
//! followed by the real transaction. Broadcasting and waiting for inclusion
//! are separate steps: once a submission is broadcast its hash is kept, and
//! only its inclusion is ever waited on again. Nothing is retried or re-priced here.

use crate::{hub::AttestationHub, Action, Submitted};
use alloy_primitives::{Bytes, TxHash, U256};
use claim::PipelineError;
use std::sync::Arc;
use tracing::{info, warn};

pub struct AttestationSubmitter {
    hub: Arc<dyn AttestationHub>,
    request: Bytes,
    fee: Option<U256>,
    simulated: bool,
    broadcast: Option<TxHash>,
    submitted: Option<Submitted>,
}

impl AttestationSubmitter {
    /// `request` is the ABI-encoded request returned by a verifier.
    pub fn new(hub: Arc<dyn AttestationHub>, request: Bytes) -> Self {
        Self {
            hub,
            request,
            fee: None,
            simulated: false,
            broadcast: None,
            submitted: None,
        }
    }

    /// Pick up a submission broadcast earlier, only to wait for its inclusion.
    pub fn resume(
        hub: Arc<dyn AttestationHub>,
        request: Bytes,
        fee: U256,
        tx_hash: TxHash,
    ) -> Self {
        Self {
            hub,
            request,
            fee: Some(fee),
            simulated: true,
            broadcast: Some(tx_hash),
            submitted: None,
        }
    }

    /// Fee paid (or about to be paid) for the request.
    pub const fn fee(&self) -> Option<U256> {
        self.fee
    }

    /// Hash of the broadcast submission, included or not.
    pub const fn broadcast_tx(&self) -> Option<TxHash> {
        self.broadcast
    }

    /// Read the fee for the request.
    pub async fn quote(&mut self) -> Result<U256, PipelineError> {
        let fee = self.hub.request_fee(&self.request).await?;
        self.fee = Some(fee);
        info!(fee = %fee, "Attestation request priced");
        Ok(fee)
    }

    /// Simulate the paid submission at the quoted fee.
    pub async fn simulate(&mut self) -> Result<(), PipelineError> {
        let fee = self
            .fee
            .ok_or_else(|| PipelineError::input("attestation request has not been priced"))?;

        self.hub
            .simulate(&self.request, fee)
            .await
            .inspect_err(|e| warn!(error = %e, "Attestation request simulation failed"))?;
        self.simulated = true;
        Ok(())
    }

    /// Price and simulate without submitting.
    pub async fn dry_run(&mut self) -> Result<U256, PipelineError> {
        let fee = self.quote().await?;
        self.simulate().await?;
        Ok(fee)
    }

    /// Send the simulated submission. Refused once anything was broadcast.
    pub async fn broadcast(&mut self) -> Result<TxHash, PipelineError> {
        if let Some(tx_hash) = self.broadcast {
            return Err(PipelineError::input(format!(
                "attestation request already broadcast in {}",
                tx_hash
            )));
        }
        let fee = match self.fee {
            Some(fee) if self.simulated => fee,
            _ => {
                return Err(PipelineError::input(
                    "attestation request must be priced and simulated before broadcast",
                ))
            }
        };

        let tx_hash = self.hub.broadcast(&self.request, fee).await?;
        self.broadcast = Some(tx_hash);
        info!(tx_hash = %tx_hash, fee = %fee, "Attestation request broadcast");
        Ok(tx_hash)
    }

    /// Wait for the broadcast submission to be included.
    pub async fn confirm(&mut self) -> Result<Submitted, PipelineError> {
        let (Some(tx_hash), Some(fee)) = (self.broadcast, self.fee) else {
            return Err(PipelineError::input("no attestation request broadcast"));
        };

        let submitted = self.hub.confirm(&self.request, fee, tx_hash).await?;
        info!(
            tx_hash = %submitted.tx_hash,
            fee = %fee,
            block_timestamp = submitted.block_timestamp,
            "Attestation request submitted"
        );
        self.submitted = Some(submitted.clone());
        Ok(submitted)
    }
}

impl Action for AttestationSubmitter {
    async fn is_ready(&self) -> Result<bool, PipelineError> {
        Ok(!self.request.is_empty() && self.broadcast.is_none())
    }

    async fn is_completed(&self) -> Result<bool, PipelineError> {
        Ok(self.submitted.is_some())
    }

    async fn execute(&mut self) -> Result<Submitted, PipelineError> {
        if !self.is_ready().await? {
            return Err(PipelineError::input(
                "attestation request is empty or already submitted",
            ));
        }

        self.dry_run().await?;
        self.broadcast().await?;
        self.confirm().await
    }

    fn description(&self) -> String {
        format!("Submit attestation request ({} bytes)", self.request.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use async_trait::async_trait;
    use claim::{Service, UpstreamError};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHub {
        revert_simulation: Option<String>,
        /// Confirmations failing with a timeout before one succeeds
        confirm_timeouts: Mutex<usize>,
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl AttestationHub for RecordingHub {
        async fn request_fee(&self, _request: &Bytes) -> Result<U256, PipelineError> {
            self.calls.lock().unwrap().push("fee");
            Ok(U256::from(1_000_000))
        }

        async fn simulate(&self, _request: &Bytes, fee: U256) -> Result<(), PipelineError> {
            self.calls.lock().unwrap().push("simulate");
            assert_eq!(fee, U256::from(1_000_000));
            match &self.revert_simulation {
                Some(reason) => Err(PipelineError::ChainRevert {
                    call: "requestAttestation",
                    reason: reason.clone(),
                }),
                None => Ok(()),
            }
        }

        async fn broadcast(&self, _request: &Bytes, fee: U256) -> Result<TxHash, PipelineError> {
            self.calls.lock().unwrap().push("broadcast");
            assert_eq!(fee, U256::from(1_000_000));
            Ok(B256::repeat_byte(9))
        }

        async fn confirm(
            &self,
            _request: &Bytes,
            _fee: U256,
            tx_hash: TxHash,
        ) -> Result<Submitted, PipelineError> {
            self.calls.lock().unwrap().push("confirm");
            let mut timeouts = self.confirm_timeouts.lock().unwrap();
            if *timeouts > 0 {
                *timeouts -= 1;
                return Err(UpstreamError::Timeout {
                    service: Service::Rpc,
                }
                .into());
            }
            Ok(Submitted {
                tx_hash,
                block_number: Some(10),
                block_timestamp: Some(1_752_000_000),
                gas_used: Some(U256::from(21_000)),
            })
        }
    }

    #[tokio::test]
    async fn test_fee_simulate_submit_in_order() {
        let hub = Arc::new(RecordingHub::default());
        let mut submitter = AttestationSubmitter::new(hub.clone(), Bytes::from_static(b"req"));

        let submitted = submitter.execute().await.unwrap();
        assert_eq!(submitted.tx_hash, B256::repeat_byte(9));
        assert_eq!(submitted.block_timestamp, Some(1_752_000_000));
        assert_eq!(submitter.fee(), Some(U256::from(1_000_000)));
        assert!(submitter.is_completed().await.unwrap());
        assert_eq!(
            *hub.calls.lock().unwrap(),
            vec!["fee", "simulate", "broadcast", "confirm"]
        );
    }

    #[tokio::test]
    async fn test_simulation_revert_never_submits() {
        let hub = Arc::new(RecordingHub {
            revert_simulation: Some("Insufficient fee".into()),
            ..Default::default()
        });
        let mut submitter = AttestationSubmitter::new(hub.clone(), Bytes::from_static(b"req"));

        let err = submitter.execute().await.unwrap_err();
        match err {
            PipelineError::ChainRevert { call, reason } => {
                assert_eq!(call, "requestAttestation");
                assert_eq!(reason, "Insufficient fee");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(*hub.calls.lock().unwrap(), vec!["fee", "simulate"]);
        assert!(!submitter.is_completed().await.unwrap());
        assert!(submitter.broadcast().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_request_not_ready() {
        let hub = Arc::new(RecordingHub::default());
        let mut submitter = AttestationSubmitter::new(hub.clone(), Bytes::new());

        assert!(!submitter.is_ready().await.unwrap());
        assert!(submitter.execute().await.is_err());
        assert!(hub.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_second_submission() {
        let hub = Arc::new(RecordingHub::default());
        let mut submitter = AttestationSubmitter::new(hub.clone(), Bytes::from_static(b"req"));
        submitter.execute().await.unwrap();

        assert!(submitter.execute().await.is_err());
        assert!(submitter.broadcast().await.is_err());
        assert_eq!(hub.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unconfirmed_broadcast_is_never_resent() {
        let hub = Arc::new(RecordingHub {
            confirm_timeouts: Mutex::new(1),
            ..Default::default()
        });
        let mut submitter = AttestationSubmitter::new(hub.clone(), Bytes::from_static(b"req"));

        let err = submitter.execute().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(submitter.broadcast_tx(), Some(B256::repeat_byte(9)));
        assert!(!submitter.is_ready().await.unwrap());
        assert!(submitter.execute().await.is_err());

        let submitted = submitter.confirm().await.unwrap();
        assert_eq!(submitted.tx_hash, B256::repeat_byte(9));
        assert_eq!(
            *hub.calls.lock().unwrap(),
            vec!["fee", "simulate", "broadcast", "confirm", "confirm"]
        );
    }

    #[tokio::test]
    async fn test_resume_only_waits_for_inclusion() {
        let hub = Arc::new(RecordingHub::default());
        let mut submitter = AttestationSubmitter::resume(
            hub.clone(),
            Bytes::from_static(b"req"),
            U256::from(1_000_000),
            B256::repeat_byte(7),
        );

        assert!(!submitter.is_ready().await.unwrap());
        let submitted = submitter.confirm().await.unwrap();
        assert_eq!(submitted.tx_hash, B256::repeat_byte(7));
        assert_eq!(*hub.calls.lock().unwrap(), vec!["confirm"]);
    }

    #[tokio::test]
    async fn test_broadcast_needs_simulation() {
        let hub = Arc::new(RecordingHub::default());
        let mut submitter = AttestationSubmitter::new(hub.clone(), Bytes::from_static(b"req"));
        submitter.quote().await.unwrap();

        let err = submitter.broadcast().await.unwrap_err();
        assert!(matches!(err, PipelineError::InputValidation(_)));
        assert_eq!(*hub.calls.lock().unwrap(), vec!["fee"]);
    }
}
