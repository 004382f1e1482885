//! Chain write actions of the attestation pipeline.
//!
//! - [`AttestationSubmitter`]: pay the fee and submit an attestation request
//! - [`ProofVerifier`]: present a finalized proof to the ClaimBoard
//! - [`CancelClaimAction`]: cancel an open claim as its poster
//!
//! Actions talk to the chain through the [`AttestationHub`] and [`ClaimResolver`]
//! seams, implemented over alloy by [`FdcHub`] and [`ClaimBoard`].

pub mod board;
pub mod cancel;
pub mod hub;
pub mod resolve;
pub mod submit;
mod tx;

pub use board::{ClaimBoard, ClaimResolver, Resolution};
pub use cancel::CancelClaimAction;
pub use client::{fill_transaction, SignerFn};
pub use hub::{AttestationHub, FdcHub};
pub use resolve::ProofVerifier;
pub use submit::AttestationSubmitter;

use alloy_primitives::{TxHash, U256};
use claim::PipelineError;
use std::future::Future;

/// Trait for executable onchain actions.
pub trait Action: Send + Sync {
    /// Check to see if the action is ready to be executed.
    ///
    /// Returns true if all preconditions are met.
    fn is_ready(&self) -> impl Future<Output = Result<bool, PipelineError>> + Send;

    /// Check if the action has already been completed.
    ///
    /// Returns true if the action was already executed successfully.
    fn is_completed(&self) -> impl Future<Output = Result<bool, PipelineError>> + Send;

    /// Execute the action.
    ///
    /// Returns the included transaction.
    fn execute(&mut self) -> impl Future<Output = Result<Submitted, PipelineError>> + Send;

    /// Get a human-readable description of this action.
    fn description(&self) -> String;
}

/// An included transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block number where transaction was included
    pub block_number: Option<u64>,
    /// Timestamp of that block
    pub block_timestamp: Option<u64>,
    /// Gas used
    pub gas_used: Option<U256>,
}
