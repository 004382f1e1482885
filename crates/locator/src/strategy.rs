use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use claim::{Claim, PipelineError};

/// What a transaction must look like to satisfy a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCriteria {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    /// Inclusive
    pub window_start: u64,
    /// Exclusive
    pub deadline: u64,
}

impl MatchCriteria {
    pub const fn from_claim(claim: &Claim) -> Self {
        Self {
            from: claim.from,
            to: claim.to,
            amount: claim.amount,
            window_start: claim.window_start(),
            deadline: claim.deadline,
        }
    }

    pub const fn in_window(&self, timestamp: u64) -> bool {
        timestamp >= self.window_start && timestamp < self.deadline
    }

    /// Exact match on sender, recipient and value inside the window.
    ///
    /// Addresses are compared as parsed values, so hex casing never matters.
    pub fn matches(&self, from: Address, to: Option<Address>, value: U256, timestamp: u64) -> bool {
        from == self.from && to == Some(self.to) && value == self.amount && self.in_window(timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedTransaction {
    pub hash: B256,
    pub block_number: u64,
    pub timestamp: u64,
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// A way of finding the transaction matching a claim.
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Return the newest matching transaction, or `None` if there is none.
    ///
    /// Errors are reserved for failing to search at all.
    async fn search(&self, criteria: &MatchCriteria) -> Result<Option<LocatedTransaction>, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> MatchCriteria {
        MatchCriteria {
            from: Address::repeat_byte(0xa),
            to: Address::repeat_byte(0xb),
            amount: U256::from(100),
            window_start: 1_000,
            deadline: 2_000,
        }
    }

    #[test]
    fn test_matches_exact_fields() {
        let c = criteria();
        let (a, b) = (Address::repeat_byte(0xa), Address::repeat_byte(0xb));
        assert!(c.matches(a, Some(b), U256::from(100), 1_500));
        assert!(!c.matches(a, Some(b), U256::from(101), 1_500));
        assert!(!c.matches(b, Some(a), U256::from(100), 1_500));
        assert!(!c.matches(a, None, U256::from(100), 1_500));
    }

    #[test]
    fn test_matches_respects_window() {
        let c = criteria();
        let (a, b) = (Address::repeat_byte(0xa), Address::repeat_byte(0xb));
        assert!(c.matches(a, Some(b), U256::from(100), 1_000));
        assert!(!c.matches(a, Some(b), U256::from(100), 999));
        assert!(!c.matches(a, Some(b), U256::from(100), 2_000));
    }
}
