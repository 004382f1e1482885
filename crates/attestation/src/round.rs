//! Voting epoch arithmetic.

use claim::PipelineError;

/// Fixed-length voting rounds starting at `first_round_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingEpoch {
    pub first_round_start: u64,
    pub duration_secs: u64,
}

impl VotingEpoch {
    pub const fn new(first_round_start: u64, duration_secs: u64) -> Self {
        Self {
            first_round_start,
            duration_secs,
        }
    }

    /// Round whose collection window contains `timestamp`.
    pub fn round_for_timestamp(&self, timestamp: u64) -> Result<u64, PipelineError> {
        if self.duration_secs == 0 {
            return Err(PipelineError::input("voting epoch duration must be positive"));
        }
        let elapsed = timestamp.checked_sub(self.first_round_start).ok_or_else(|| {
            PipelineError::input(format!(
                "timestamp {} precedes the first voting round at {}",
                timestamp, self.first_round_start
            ))
        })?;
        Ok(elapsed / self.duration_secs)
    }

    /// Start of `round`, unix seconds. Saturates at `u64::MAX`.
    pub const fn round_start(&self, round: u64) -> u64 {
        self.first_round_start
            .saturating_add(round.saturating_mul(self.duration_secs))
    }

    /// End of `round`'s collection window (exclusive).
    pub const fn round_end(&self, round: u64) -> u64 {
        self.round_start(round.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COSTON2: VotingEpoch = VotingEpoch::new(1_658_430_000, 90);

    #[test]
    fn test_round_for_timestamp() {
        assert_eq!(COSTON2.round_for_timestamp(1_658_430_000).unwrap(), 0);
        assert_eq!(COSTON2.round_for_timestamp(1_658_430_089).unwrap(), 0);
        assert_eq!(COSTON2.round_for_timestamp(1_658_430_090).unwrap(), 1);
        assert_eq!(COSTON2.round_for_timestamp(1_752_000_000).unwrap(), 1_039_666);
    }

    #[test]
    fn test_round_bounds() {
        let round = COSTON2.round_for_timestamp(1_752_000_000).unwrap();
        assert!(COSTON2.round_start(round) <= 1_752_000_000);
        assert!(COSTON2.round_end(round) > 1_752_000_000);
        assert_eq!(COSTON2.round_end(round) - COSTON2.round_start(round), 90);
    }

    #[test]
    fn test_far_rounds_saturate() {
        assert_eq!(COSTON2.round_start(u64::MAX), u64::MAX);
        assert_eq!(COSTON2.round_end(u64::MAX), u64::MAX);
        assert_eq!(COSTON2.round_start(u64::MAX / 90), u64::MAX);
    }

    #[test]
    fn test_before_first_round() {
        assert!(COSTON2.round_for_timestamp(1_000).is_err());
    }
}
