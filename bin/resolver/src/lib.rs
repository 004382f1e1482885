//! Claim resolution pipeline.
//!
//! One [`Pipeline::process_claim`] call advances one claim by at most one
//! stage: locate the payment and submit an attestation request, wait out the
//! finality window, then fetch the proof and resolve the claim with it. A
//! submission whose inclusion could not be confirmed is only ever confirmed
//! later, never sent again. The
//! per-claim [`ClaimStatusTracker`](claim::ClaimStatusTracker) decides which
//! stage is due; [`Pipeline::run_cycle`] fans claims out in parallel.

pub mod config;
pub mod metrics;
pub mod wiring;

use crate::metrics::Metrics;
use action::{
    Action, AttestationHub, AttestationSubmitter, ClaimResolver, ProofVerifier, Resolution,
};
use alloy_primitives::TxHash;
use attestation::{AttestationRequestBuilder, ProofCheck, ProofSource, RoundFinality, VotingEpoch};
use claim::{
    with_timeout, BroadcastSubmission, Claim, ClaimId, ClaimRegistry, ClaimSlot, ExpectedOutcome,
    PendingAttempt, PipelineError, ProofRejection, Service, TrackerState, TrackerWindows,
};
use locator::TransactionLocator;
use std::{
    collections::HashSet,
    future::Future,
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, error, info, warn};

/// Limits applied to every claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_concurrent_claims: usize,
    /// Applied to each network call on its own. Locating a payment is bounded
    /// per call by the search strategies instead, since a block scan makes
    /// thousands of them.
    pub request_timeout: Duration,
    /// Price and simulate, but never send a transaction
    pub dry_run: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrent_claims: 4,
            request_timeout: Duration::from_secs(30),
            dry_run: false,
        }
    }
}

/// Result of one step for one claim.
#[derive(Debug)]
pub enum StepOutcome {
    /// Another task holds the claim.
    Busy,
    Skipped(String),
    /// The tracker's window has not elapsed yet.
    Waiting { remaining: u64 },
    AttestationSubmitted { round: u64 },
    /// Window elapsed but the round has no proof yet.
    AwaitingFinality { round: u64 },
    /// Nothing matched; the claim is retried once the short window elapses.
    NotFoundRetryLater,
    /// Nothing matched and the deadline passed. Resolving needs a
    /// non-existence proof, which is supplied by hand through `step verify`.
    AbsentAfterDeadline,
    Resolved { tx: TxHash },
    Failed(PipelineError),
}

impl StepOutcome {
    /// Short label for logs and metrics.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Skipped(_) => "skipped",
            Self::Waiting { .. } => "waiting",
            Self::AttestationSubmitted { .. } => "attestation_submitted",
            Self::AwaitingFinality { .. } => "awaiting_finality",
            Self::NotFoundRetryLater => "not_found",
            Self::AbsentAfterDeadline => "absent_after_deadline",
            Self::Resolved { .. } => "resolved",
            Self::Failed(_) => "failed",
        }
    }
}

pub struct Pipeline {
    locator: TransactionLocator,
    builder: AttestationRequestBuilder,
    hub: Arc<dyn AttestationHub>,
    resolver: Arc<dyn ClaimResolver>,
    proofs: Arc<dyn ProofSource>,
    finality: Option<Arc<dyn RoundFinality>>,
    proof_check: Option<Arc<dyn ProofCheck>>,
    epoch: VotingEpoch,
    settings: PipelineSettings,
    registry: ClaimRegistry,
    metrics: Metrics,
}

impl Pipeline {
    pub fn new(
        locator: TransactionLocator,
        builder: AttestationRequestBuilder,
        hub: Arc<dyn AttestationHub>,
        resolver: Arc<dyn ClaimResolver>,
        proofs: Arc<dyn ProofSource>,
        epoch: VotingEpoch,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            locator,
            builder,
            hub,
            resolver,
            proofs,
            finality: None,
            proof_check: None,
            epoch,
            settings,
            registry: ClaimRegistry::default(),
            metrics: Metrics::new(),
        }
    }

    /// Gate proof retrieval on an onchain finality check.
    pub fn with_finality(mut self, finality: Arc<dyn RoundFinality>) -> Self {
        self.finality = Some(finality);
        self
    }

    /// Check every proof onchain before handing it to the claim board.
    pub fn with_proof_check(mut self, check: Arc<dyn ProofCheck>) -> Self {
        self.proof_check = Some(check);
        self
    }

    pub fn with_windows(mut self, windows: TrackerWindows) -> Self {
        self.registry = ClaimRegistry::new(windows);
        self
    }

    pub const fn registry(&self) -> &ClaimRegistry {
        &self.registry
    }

    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// List open claims and run one cycle over them.
    pub async fn tick(
        self: &Arc<Self>,
        now: u64,
    ) -> Result<Vec<(ClaimId, StepOutcome)>, PipelineError> {
        let started = Instant::now();
        let claims = match self.timed(Service::Rpc, self.resolver.open_claims()).await {
            Ok(claims) => claims,
            Err(err) => {
                self.metrics.record_cycle(false, started.elapsed());
                return Err(err);
            }
        };

        let outcomes = self.run_cycle(claims, now).await;
        self.metrics.record_cycle(true, started.elapsed());
        Ok(outcomes)
    }

    /// Step every claim once, at most `max_concurrent_claims` at a time.
    ///
    /// Claims missing from `claims` (or settled) are forgotten.
    pub async fn run_cycle(
        self: &Arc<Self>,
        claims: Vec<Claim>,
        now: u64,
    ) -> Vec<(ClaimId, StepOutcome)> {
        let live: HashSet<ClaimId> = claims
            .iter()
            .filter(|claim| !claim.status.is_terminal())
            .map(|claim| claim.id)
            .collect();
        let dropped = self.registry.retain(&live).await;
        if dropped > 0 {
            debug!(dropped, "Forgot settled claims");
        }

        let permits = Arc::new(Semaphore::new(self.settings.max_concurrent_claims.max(1)));
        let mut tasks = JoinSet::new();
        for claim in claims {
            let pipeline = Arc::clone(self);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (claim.id, StepOutcome::Skipped("cycle aborted".to_string()));
                };
                let outcome = pipeline.process_claim(&claim, now).await;
                (claim.id, outcome)
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(error = %e, "Claim task failed"),
            }
        }

        for (state, count) in self.registry.state_counts().await {
            self.metrics.set_tracked_claims(state, count);
        }
        outcomes
    }

    /// Advance one claim by at most one stage.
    ///
    /// A claim already being processed returns [`StepOutcome::Busy`] without
    /// waiting. A rejected proof halts the claim for the lifetime of the process.
    pub async fn process_claim(&self, claim: &Claim, now: u64) -> StepOutcome {
        if claim.status.is_terminal() {
            self.registry.remove(&claim.id).await;
            return StepOutcome::Skipped(format!("claim is {:?}", claim.status));
        }

        let Some(mut slot) = self.registry.try_acquire(claim.id).await else {
            return StepOutcome::Busy;
        };
        if let Some(reason) = &slot.halted {
            return StepOutcome::Skipped(format!("halted: {}", reason));
        }

        let outcome = match self.step(&mut slot, claim, now).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if let PipelineError::ProofRejected { kind, .. } = &err {
                    self.metrics.record_proof_rejected(&kind.to_string());
                    error!(claim_id = %claim.id, error = %err, "Halting claim");
                    slot.halted = Some(err.to_string());
                    slot.attempt = None;
                } else {
                    warn!(
                        claim_id = %claim.id,
                        retryable = err.is_retryable(),
                        error = %err,
                        "Claim step failed"
                    );
                }
                StepOutcome::Failed(err)
            }
        };
        drop(slot);

        if matches!(outcome, StepOutcome::Resolved { .. }) {
            self.registry.remove(&claim.id).await;
        }
        self.metrics.record_outcome(outcome.label());
        outcome
    }

    async fn step(
        &self,
        slot: &mut ClaimSlot,
        claim: &Claim,
        now: u64,
    ) -> Result<StepOutcome, PipelineError> {
        match slot.tracker.poll(now) {
            TrackerState::AttestationPending { .. } => Ok(StepOutcome::Waiting {
                remaining: slot.tracker.remaining(now).unwrap_or_default(),
            }),
            TrackerState::Idle => match slot.broadcast.clone() {
                Some(broadcast) => self.confirm_submission(slot, claim, broadcast, now).await,
                None => self.start_attempt(slot, claim, now).await,
            },
            TrackerState::Succeeded => self.finish_attempt(slot, claim).await,
        }
    }

    async fn start_attempt(
        &self,
        slot: &mut ClaimSlot,
        claim: &Claim,
        now: u64,
    ) -> Result<StepOutcome, PipelineError> {
        let located = self.recorded("locate", self.locator.locate(claim)).await?;

        let Some(tx) = located else {
            if claim.is_expired(now) {
                warn!(
                    claim_id = %claim.id,
                    deadline = claim.deadline,
                    "No payment found before the deadline"
                );
                slot.halted = Some("no payment found before the deadline".to_string());
                return Ok(StepOutcome::AbsentAfterDeadline);
            }
            slot.tracker
                .start_attempt(now, ExpectedOutcome::NotFound)
                .map_err(|e| PipelineError::input(e.to_string()))?;
            return Ok(StepOutcome::NotFoundRetryLater);
        };

        if claim.is_expired(now) {
            let reason = "payment found but the claim deadline has passed".to_string();
            slot.halted = Some(reason.clone());
            return Ok(StepOutcome::Skipped(reason));
        }

        let prepared = self
            .stage(
                "prepare",
                Service::Verifier,
                self.builder.prepare(tx.hash, claim.min_confirmations),
            )
            .await?;

        let mut submitter =
            AttestationSubmitter::new(Arc::clone(&self.hub), prepared.abi_encoded.clone());
        let fee = self
            .stage("submit", Service::Rpc, submitter.quote())
            .await?;
        self.stage("submit", Service::Rpc, submitter.simulate())
            .await?;

        if self.settings.dry_run {
            info!(
                claim_id = %claim.id,
                tx_hash = %tx.hash,
                fee = %fee,
                "Dry run: attestation request not submitted"
            );
            return Ok(StepOutcome::Skipped("dry run".to_string()));
        }

        let submission_tx = self
            .stage("submit", Service::Rpc, submitter.broadcast())
            .await?;
        self.metrics
            .record_attestation_submitted(fee.saturating_to::<u64>());

        let broadcast = BroadcastSubmission {
            transaction_hash: tx.hash,
            request_bytes: prepared.abi_encoded,
            fee,
            submission_tx,
            broadcast_at: now,
        };
        slot.broadcast = Some(broadcast.clone());
        self.confirm_submission(slot, claim, broadcast, now).await
    }

    /// Wait for a broadcast submission and start its finality window.
    ///
    /// A timed out or failed lookup keeps the submission for the next step.
    /// Only a submission that reverted onchain is dropped, so the claim starts over.
    async fn confirm_submission(
        &self,
        slot: &mut ClaimSlot,
        claim: &Claim,
        broadcast: BroadcastSubmission,
        now: u64,
    ) -> Result<StepOutcome, PipelineError> {
        let mut submitter = AttestationSubmitter::resume(
            Arc::clone(&self.hub),
            broadcast.request_bytes.clone(),
            broadcast.fee,
            broadcast.submission_tx,
        );
        let submitted = match self
            .stage("confirm", Service::Rpc, submitter.confirm())
            .await
        {
            Ok(submitted) => submitted,
            Err(err) => {
                if !err.is_retryable() {
                    warn!(
                        claim_id = %claim.id,
                        submission_tx = %broadcast.submission_tx,
                        error = %err,
                        "Attestation request failed onchain, starting over"
                    );
                    slot.broadcast = None;
                }
                return Err(err);
            }
        };
        slot.broadcast = None;

        let started_at = submitted.block_timestamp.unwrap_or(now);
        let round = self.epoch.round_for_timestamp(started_at)?;
        slot.tracker
            .start_attempt(started_at, ExpectedOutcome::Found)
            .map_err(|e| PipelineError::input(e.to_string()))?;
        slot.attempt = Some(PendingAttempt {
            transaction_hash: broadcast.transaction_hash,
            request_bytes: broadcast.request_bytes,
            voting_round: round,
            submission_tx: submitted.tx_hash,
            submitted_at: started_at,
        });

        info!(
            claim_id = %claim.id,
            tx_hash = %broadcast.transaction_hash,
            submission_tx = %submitted.tx_hash,
            voting_round = round,
            "Attestation requested"
        );
        Ok(StepOutcome::AttestationSubmitted { round })
    }

    async fn finish_attempt(
        &self,
        slot: &mut ClaimSlot,
        claim: &Claim,
    ) -> Result<StepOutcome, PipelineError> {
        let Some(attempt) = slot.attempt.clone() else {
            slot.tracker.reset();
            return Ok(StepOutcome::Skipped("no attempt to finish".to_string()));
        };
        let round = attempt.voting_round;

        if let Some(finality) = &self.finality {
            let finalized = self
                .stage("fetch_proof", Service::Rpc, finality.is_finalized(round))
                .await?;
            if !finalized {
                return Ok(StepOutcome::AwaitingFinality { round });
            }
        }

        let proof = self
            .stage(
                "fetch_proof",
                Service::DataAvailability,
                self.proofs.proof(round, &attempt.request_bytes),
            )
            .await?;

        let Some(proof) = proof else {
            if self.finality.is_some() {
                warn!(
                    claim_id = %claim.id,
                    voting_round = round,
                    "Round finalized without a proof for the request, starting over"
                );
                slot.tracker.reset();
                slot.attempt = None;
                return Ok(StepOutcome::Skipped(format!(
                    "round {} finalized without a proof",
                    round
                )));
            }
            return Ok(StepOutcome::AwaitingFinality { round });
        };

        if proof.transaction_hash() != attempt.transaction_hash {
            return Err(PipelineError::ProofRejected {
                kind: ProofRejection::TransactionMismatch,
                reason: format!(
                    "proof attests {} but {} was requested",
                    proof.transaction_hash(),
                    attempt.transaction_hash
                ),
            });
        }
        proof.check_payment(claim)?;

        if let Some(check) = &self.proof_check {
            let proved = self
                .stage("verify", Service::Rpc, check.is_proved(&proof))
                .await?;
            if !proved {
                return Err(PipelineError::ProofRejected {
                    kind: ProofRejection::InvalidProof,
                    reason: "FdcVerification rejected the proof".to_string(),
                });
            }
        }

        let mut verifier = ProofVerifier::new(
            Arc::clone(&self.resolver),
            claim.id,
            Resolution::Payment,
            proof.into(),
        );
        let submitted = self
            .stage("verify", Service::Rpc, verifier.execute())
            .await?;

        self.metrics.record_proof_accepted();
        slot.attempt = None;
        Ok(StepOutcome::Resolved {
            tx: submitted.tx_hash,
        })
    }

    async fn timed<T>(
        &self,
        service: Service,
        fut: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, PipelineError> {
        with_timeout(service, self.settings.request_timeout, fut).await
    }

    /// Run one stage, counting failures.
    async fn recorded<T>(
        &self,
        stage: &'static str,
        fut: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, PipelineError> {
        fut.await
            .inspect_err(|e| self.metrics.record_stage_failure(stage, e.kind()))
    }

    /// Run one stage under the request timeout, counting failures.
    async fn stage<T>(
        &self,
        stage: &'static str,
        service: Service,
        fut: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, PipelineError> {
        self.recorded(stage, self.timed(service, fut)).await
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
