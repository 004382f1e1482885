use crate::PipelineError;
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Claim identifier as assigned by the ClaimBoard.
pub type ClaimId = B256;

/// A claimed payment must have happened within this many seconds before the deadline.
pub const SEARCH_WINDOW_SECS: u64 = 86_400;

/// Onchain claim status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStatus {
    Open,
    Resolved,
    Cancelled,
}

impl ClaimStatus {
    /// Resolved and Cancelled claims never change again.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }
}

impl TryFrom<u8> for ClaimStatus {
    type Error = PipelineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Open),
            1 => Ok(Self::Resolved),
            2 => Ok(Self::Cancelled),
            other => Err(PipelineError::input(format!("unknown claim status {}", other))),
        }
    }
}

/// A claim that a payment `from -> to` of `amount` happened on the source chain.
///
/// Owned by the ClaimBoard; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub poster: Address,
    pub source_chain_id: u16,
    pub from: Address,
    pub to: Address,
    /// Amount in the source chain's smallest unit
    pub amount: U256,
    pub min_confirmations: u32,
    /// Unix seconds
    pub deadline: u64,
    pub bounty: U256,
    pub status: ClaimStatus,
    /// Set only when the claim is Resolved
    pub winner: Option<Address>,
}

impl Claim {
    /// First timestamp (inclusive) a matching payment may have.
    pub const fn window_start(&self) -> u64 {
        self.deadline.saturating_sub(SEARCH_WINDOW_SECS)
    }

    /// Whether `timestamp` lies in `[deadline - 86400, deadline)`.
    pub const fn in_window(&self, timestamp: u64) -> bool {
        timestamp >= self.window_start() && timestamp < self.deadline
    }

    pub const fn is_expired(&self, now: u64) -> bool {
        now >= self.deadline
    }
}

/// Decode an address stored as `bytes` on the ClaimBoard.
///
/// Accepts either the raw 20 address bytes or the UTF-8 text of a `0x`-prefixed
/// hex address, which is what browser wallets end up posting.
pub fn address_from_bytes(raw: &[u8]) -> Result<Address, PipelineError> {
    if raw.len() == Address::len_bytes() {
        return Ok(Address::from_slice(raw));
    }

    let text = std::str::from_utf8(raw)
        .map_err(|_| PipelineError::input("address bytes are neither 20 bytes nor UTF-8"))?;
    let text = text.trim_end_matches('\0');
    if text.len() != 42 || !text.starts_with("0x") {
        return Err(PipelineError::input(format!("malformed address text {:?}", text)));
    }

    text.parse::<Address>()
        .map_err(|e| PipelineError::input(format!("malformed address {}: {}", text, e)))
}
