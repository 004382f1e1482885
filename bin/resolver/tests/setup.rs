//! In-memory stand-ins for every external service the pipeline talks to.
#![allow(dead_code)] // not every test uses every fake

use action::{AttestationHub, ClaimResolver, Resolution, Submitted};
use alloy_primitives::{address, Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use attestation::{
    proof::{AttestationResponse, ResponseBody},
    AttestationProof, AttestationRequest, AttestationRequestBuilder, ProofCheck, ProofSource,
    RequestBody, RoundFinality, VerifierService, VotingEpoch,
};
use binding::claimboard::EVMTransactionProof;
use claim::{Claim, ClaimId, ClaimStatus, PipelineError, Service, UpstreamError};
use locator::{
    BlockScanSearch, BlockSource, IndexedTransaction, Indexer, IndexerSearch, ScannedBlock,
    ScannedTransaction, TransactionLocator,
};
use resolver::{Pipeline, PipelineSettings};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

pub const T0: u64 = 1_752_000_000;
/// Block timestamp the fake hub reports for every submission.
pub const SUBMITTED_AT: u64 = T0 + 20;

pub const FROM: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
pub const TO: Address = address!("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

pub fn tx_hash(n: u8) -> B256 {
    B256::repeat_byte(n)
}

pub fn claim(id: u8, amount: u64) -> Claim {
    Claim {
        id: B256::repeat_byte(id),
        poster: Address::repeat_byte(0x01),
        source_chain_id: 1,
        from: FROM,
        to: TO,
        amount: U256::from(amount),
        min_confirmations: 0,
        deadline: T0 + 50,
        bounty: U256::from(1_000),
        status: ClaimStatus::Open,
        winner: None,
    }
}

pub fn indexed(hash: B256, value: u64, timestamp: u64) -> IndexedTransaction {
    IndexedTransaction {
        hash: hash.to_string(),
        from: FROM.to_string(),
        to: TO.to_string(),
        value: value.to_string(),
        time_stamp: timestamp.to_string(),
        block_number: "100".to_string(),
    }
}

/// {tx1(100, T0), tx2(200, T0+10)}, newest first as an indexer returns them.
pub fn two_payments() -> Vec<IndexedTransaction> {
    vec![indexed(tx_hash(2), 200, T0 + 10), indexed(tx_hash(1), 100, T0)]
}

/// A proof attesting `hash` as a payment FROM -> TO of `value` at `timestamp`.
pub fn proof_for(hash: B256, value: u64, timestamp: u64) -> AttestationProof {
    AttestationProof {
        merkle_proof: vec![B256::repeat_byte(0x11)],
        data: AttestationResponse {
            attestation_type: attestation::encode_bytes32("EVMTransaction").unwrap(),
            source_id: attestation::encode_bytes32("testETH").unwrap(),
            voting_round: 1_039_666,
            lowest_used_timestamp: timestamp,
            request_body: RequestBody::payment(hash, 2).unwrap(),
            response_body: ResponseBody {
                block_number: 100,
                timestamp,
                source_address: FROM,
                is_deployment: false,
                receiving_address: TO,
                value: U256::from(value),
                input: Bytes::new(),
                status: 1,
                events: vec![],
            },
        },
    }
}

#[derive(Clone, Default)]
pub struct FakeIndexer {
    pub transactions: Arc<Mutex<Vec<IndexedTransaction>>>,
    pub calls: Arc<AtomicUsize>,
    pub delay: Option<Duration>,
    /// Answer every call with HTTP 503
    pub down: Arc<Mutex<bool>>,
}

#[async_trait]
impl Indexer for FakeIndexer {
    async fn transactions(
        &self,
        _address: Address,
    ) -> Result<Vec<IndexedTransaction>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if *self.down.lock().unwrap() {
            return Err(UpstreamError::Status {
                service: Service::Indexer,
                status: 503,
                body: "maintenance".to_string(),
            }
            .into());
        }
        Ok(self.transactions.lock().unwrap().clone())
    }
}

/// Head of the fake source chain.
pub const HEAD_BLOCK: u64 = 10_000;
/// Source chain block time.
pub const BLOCK_TIME: u64 = 12;

/// 12s source chain whose head block is just before [`claim`]'s deadline.
///
/// Every block is empty apart from `payment`, a transfer FROM -> TO placed
/// in the given block. Each fetch takes `delay`.
#[derive(Clone, Default)]
pub struct FakeBlocks {
    pub payment: Option<(u64, B256, u64)>,
    pub delay: Duration,
    pub fetched: Arc<AtomicUsize>,
}

impl FakeBlocks {
    pub const fn timestamp(number: u64) -> u64 {
        T0 + 49 - (HEAD_BLOCK - number) * BLOCK_TIME
    }
}

#[async_trait]
impl BlockSource for FakeBlocks {
    async fn head(&self) -> Result<u64, PipelineError> {
        Ok(HEAD_BLOCK)
    }

    async fn block(&self, number: u64) -> Result<Option<ScannedBlock>, PipelineError> {
        self.fetched.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let transactions = match self.payment {
            Some((block, hash, value)) if block == number => vec![ScannedTransaction {
                hash,
                from: FROM,
                to: Some(TO),
                value: U256::from(value),
            }],
            _ => vec![],
        };
        Ok(Some(ScannedBlock {
            number,
            timestamp: Self::timestamp(number),
            transactions,
        }))
    }
}

/// Accepts every request and remembers which transactions were asked for.
#[derive(Default)]
pub struct FakeVerifier {
    pub requested: Mutex<Vec<B256>>,
    pub delay: Option<Duration>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

#[async_trait]
impl VerifierService for FakeVerifier {
    async fn prepare_request(&self, request: &AttestationRequest) -> Result<Bytes, PipelineError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let hash = request.request_body.transaction_hash;
        self.requested.lock().unwrap().push(hash);
        Ok(Bytes::copy_from_slice(hash.as_slice()))
    }
}

/// Every broadcast is included at [`SUBMITTED_AT`]; confirming it takes `confirm_delay`.
#[derive(Default)]
pub struct FakeHub {
    pub simulation_revert: Mutex<Option<String>>,
    pub confirm_delay: Mutex<Option<Duration>>,
    pub simulations: AtomicUsize,
    pub submissions: AtomicUsize,
    pub confirmations: AtomicUsize,
}

#[async_trait]
impl AttestationHub for FakeHub {
    async fn request_fee(&self, _request: &Bytes) -> Result<U256, PipelineError> {
        Ok(U256::from(1_000_000))
    }

    async fn simulate(&self, _request: &Bytes, _fee: U256) -> Result<(), PipelineError> {
        self.simulations.fetch_add(1, Ordering::SeqCst);
        match self.simulation_revert.lock().unwrap().clone() {
            Some(reason) => Err(PipelineError::ChainRevert {
                call: "requestAttestation",
                reason,
            }),
            None => Ok(()),
        }
    }

    async fn broadcast(&self, _request: &Bytes, _fee: U256) -> Result<TxHash, PipelineError> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(B256::repeat_byte(0xf0 + n as u8))
    }

    async fn confirm(
        &self,
        _request: &Bytes,
        _fee: U256,
        tx_hash: TxHash,
    ) -> Result<Submitted, PipelineError> {
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        let delay = *self.confirm_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Submitted {
            tx_hash,
            block_number: Some(1_000),
            block_timestamp: Some(SUBMITTED_AT),
            gas_used: Some(U256::from(120_000)),
        })
    }
}

#[derive(Default)]
pub struct FakeBoard {
    pub claims: Mutex<Vec<Claim>>,
    pub revert: Mutex<Option<String>>,
    pub resolutions: Mutex<Vec<(ClaimId, Resolution, EVMTransactionProof)>>,
    pub offline: Mutex<bool>,
}

#[async_trait]
impl ClaimResolver for FakeBoard {
    async fn claim(&self, id: ClaimId) -> Result<Claim, PipelineError> {
        self.claims
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))
    }

    async fn open_claims(&self) -> Result<Vec<Claim>, PipelineError> {
        if *self.offline.lock().unwrap() {
            return Err(UpstreamError::transport(Service::Rpc, "connection refused").into());
        }
        Ok(self
            .claims
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.status == ClaimStatus::Open)
            .cloned()
            .collect())
    }

    async fn simulate_resolution(
        &self,
        _id: ClaimId,
        resolution: Resolution,
        _proof: &EVMTransactionProof,
    ) -> Result<(), PipelineError> {
        match self.revert.lock().unwrap().clone() {
            Some(reason) => Err(PipelineError::ChainRevert {
                call: resolution.entrypoint(),
                reason,
            }),
            None => Ok(()),
        }
    }

    async fn resolve(
        &self,
        id: ClaimId,
        resolution: Resolution,
        proof: EVMTransactionProof,
    ) -> Result<Submitted, PipelineError> {
        self.resolutions.lock().unwrap().push((id, resolution, proof));
        for claim in self.claims.lock().unwrap().iter_mut().filter(|c| c.id == id) {
            claim.status = ClaimStatus::Resolved;
            claim.winner = Some(self.sender());
        }
        Ok(Submitted {
            tx_hash: B256::repeat_byte(0xee),
            block_number: Some(2_000),
            block_timestamp: Some(SUBMITTED_AT + 200),
            gas_used: Some(U256::from(300_000)),
        })
    }

    async fn simulate_cancel(&self, _id: ClaimId) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn cancel(&self, id: ClaimId) -> Result<Submitted, PipelineError> {
        for claim in self.claims.lock().unwrap().iter_mut().filter(|c| c.id == id) {
            claim.status = ClaimStatus::Cancelled;
        }
        Ok(Submitted {
            tx_hash: B256::repeat_byte(0xcc),
            block_number: None,
            block_timestamp: None,
            gas_used: None,
        })
    }

    fn sender(&self) -> Address {
        Address::repeat_byte(0x77)
    }
}

/// Serves one proof for every request once it has been set.
#[derive(Default)]
pub struct FakeProofs {
    pub proof: Mutex<Option<AttestationProof>>,
    pub requests: Mutex<Vec<(u64, Bytes)>>,
}

#[async_trait]
impl ProofSource for FakeProofs {
    async fn proof(
        &self,
        voting_round: u64,
        request_bytes: &Bytes,
    ) -> Result<Option<AttestationProof>, PipelineError> {
        self.requests
            .lock()
            .unwrap()
            .push((voting_round, request_bytes.clone()));
        Ok(self.proof.lock().unwrap().clone())
    }
}

/// Relay stand-in; every round is finalized once `finalized` is set.
#[derive(Default)]
pub struct FakeFinality {
    pub finalized: Mutex<bool>,
    pub checks: Mutex<Vec<u64>>,
}

#[async_trait]
impl RoundFinality for FakeFinality {
    async fn is_finalized(&self, voting_round: u64) -> Result<bool, PipelineError> {
        self.checks.lock().unwrap().push(voting_round);
        Ok(*self.finalized.lock().unwrap())
    }
}

/// FdcVerification stand-in answering `proved` for every proof.
pub struct FakeProofCheck {
    pub proved: bool,
    pub checked: AtomicUsize,
}

impl FakeProofCheck {
    pub const fn new(proved: bool) -> Self {
        Self {
            proved,
            checked: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProofCheck for FakeProofCheck {
    async fn is_proved(&self, _proof: &AttestationProof) -> Result<bool, PipelineError> {
        self.checked.fetch_add(1, Ordering::SeqCst);
        Ok(self.proved)
    }
}

/// All fakes plus the pipeline wired over them.
pub struct Harness {
    pub indexer: FakeIndexer,
    pub verifier: Arc<FakeVerifier>,
    pub hub: Arc<FakeHub>,
    pub board: Arc<FakeBoard>,
    pub proofs: Arc<FakeProofs>,
    /// Block scan behind the indexer
    pub blocks: Option<FakeBlocks>,
    pub finality: Option<Arc<FakeFinality>>,
    pub proof_check: Option<Arc<FakeProofCheck>>,
}

impl Harness {
    pub fn new(transactions: Vec<IndexedTransaction>) -> Self {
        let indexer = FakeIndexer::default();
        *indexer.transactions.lock().unwrap() = transactions;
        Self {
            indexer,
            verifier: Arc::new(FakeVerifier::default()),
            hub: Arc::new(FakeHub::default()),
            board: Arc::new(FakeBoard::default()),
            proofs: Arc::new(FakeProofs::default()),
            blocks: None,
            finality: None,
            proof_check: None,
        }
    }

    pub fn pipeline(&self, settings: PipelineSettings) -> Arc<Pipeline> {
        let primary = IndexerSearch::new(self.indexer.clone())
            .with_request_timeout(settings.request_timeout);
        let mut locator = TransactionLocator::new(Arc::new(primary));
        if let Some(blocks) = &self.blocks {
            let scan = BlockScanSearch::new(blocks.clone(), BLOCK_TIME)
                .with_request_timeout(settings.request_timeout);
            locator = locator.with_fallback(Arc::new(scan));
        }
        let builder = AttestationRequestBuilder::new(self.verifier.clone(), "testETH");

        let mut pipeline = Pipeline::new(
            locator,
            builder,
            self.hub.clone(),
            self.board.clone(),
            self.proofs.clone(),
            VotingEpoch::new(1_658_430_000, 90),
            settings,
        );
        if let Some(finality) = &self.finality {
            pipeline = pipeline.with_finality(finality.clone());
        }
        if let Some(check) = &self.proof_check {
            pipeline = pipeline.with_proof_check(check.clone());
        }
        Arc::new(pipeline)
    }
}
