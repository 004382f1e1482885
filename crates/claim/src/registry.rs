//! Shared map from claim id to its scheduling state.
//!
//! Each claim gets its own slot behind its own lock. A slot is only ever taken
//! with `try_lock`, so a second worker reaching a claim that is already being
//! processed backs off instead of queueing a duplicate attempt.

use crate::{ClaimId, ClaimStatusTracker, TrackerWindows};
use alloy_primitives::{Bytes, TxHash, B256, U256};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// An attestation request that has been paid for and submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttempt {
    /// Source chain transaction being attested
    pub transaction_hash: B256,
    /// ABI-encoded request as accepted by the FdcHub
    pub request_bytes: Bytes,
    pub voting_round: u64,
    pub submission_tx: TxHash,
    /// Timestamp of the block including the submission
    pub submitted_at: u64,
}

/// A submission that was broadcast but whose inclusion is not yet known.
///
/// While one is recorded the claim must not be priced or submitted again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastSubmission {
    pub transaction_hash: B256,
    pub request_bytes: Bytes,
    pub fee: U256,
    pub submission_tx: TxHash,
    pub broadcast_at: u64,
}

#[derive(Debug)]
pub struct ClaimSlot {
    pub tracker: ClaimStatusTracker,
    pub attempt: Option<PendingAttempt>,
    pub broadcast: Option<BroadcastSubmission>,
    /// Set when the claim needs an operator; the pipeline skips it from then on.
    pub halted: Option<String>,
}

impl ClaimSlot {
    pub const fn new(windows: TrackerWindows) -> Self {
        Self {
            tracker: ClaimStatusTracker::new(windows),
            attempt: None,
            broadcast: None,
            halted: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ClaimRegistry {
    windows: TrackerWindows,
    slots: Mutex<HashMap<ClaimId, Arc<Mutex<ClaimSlot>>>>,
}

impl ClaimRegistry {
    pub fn new(windows: TrackerWindows) -> Self {
        Self {
            windows,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Take exclusive ownership of a claim's slot, creating it if needed.
    ///
    /// Returns `None` if another worker currently holds the slot.
    pub async fn try_acquire(&self, id: ClaimId) -> Option<OwnedMutexGuard<ClaimSlot>> {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(
                slots
                    .entry(id)
                    .or_insert_with(|| Arc::new(Mutex::new(ClaimSlot::new(self.windows)))),
            )
        };

        match slot.try_lock_owned() {
            Ok(guard) => Some(guard),
            Err(_) => {
                debug!(claim_id = %id, "Claim slot busy");
                None
            }
        }
    }

    /// Forget a claim once it can no longer change.
    pub async fn remove(&self, id: &ClaimId) -> bool {
        self.slots.lock().await.remove(id).is_some()
    }

    /// Forget every claim not in `live`. Returns how many were dropped.
    pub async fn retain(&self, live: &HashSet<ClaimId>) -> usize {
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|id, _| live.contains(id));
        before - slots.len()
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }

    /// Count tracked claims by tracker state label.
    ///
    /// Slots held by a worker are counted as `busy`, halted slots as `halted`
    /// and slots waiting on a broadcast submission as `unconfirmed`.
    pub async fn state_counts(&self) -> HashMap<&'static str, usize> {
        let slots: Vec<_> = self.slots.lock().await.values().cloned().collect();

        let mut counts = HashMap::new();
        for slot in slots {
            let label = match slot.try_lock() {
                Ok(slot) if slot.halted.is_some() => "halted",
                Ok(slot) if slot.broadcast.is_some() => "unconfirmed",
                Ok(slot) => slot.tracker.state().label(),
                Err(_) => "busy",
            };
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}
