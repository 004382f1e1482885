//! Claim domain model and per-claim scheduling.
//!
//! This crate provides:
//! - The [`Claim`] record as read from the ClaimBoard
//! - The [`PipelineError`] taxonomy shared by every pipeline stage
//! - [`ClaimStatusTracker`], the timing gate deciding when a claim may be retried
//! - [`ClaimRegistry`], the only state shared between concurrently processed claims

pub mod error;
pub mod registry;
pub mod tracker;
pub mod types;

pub use error::{
    is_retryable_status, with_timeout, PipelineError, ProofRejection, Service, UpstreamError,
};
pub use registry::{BroadcastSubmission, ClaimRegistry, ClaimSlot, PendingAttempt};
pub use tracker::{ClaimStatusTracker, ExpectedOutcome, TrackerError, TrackerState, TrackerWindows};
pub use types::{address_from_bytes, Claim, ClaimId, ClaimStatus, SEARCH_WINDOW_SECS};
