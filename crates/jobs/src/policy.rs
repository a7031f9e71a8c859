//! Polling policy: intra-invocation check bound plus cross-invocation budget.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Bounds for the polling protocol.
///
/// Two budgets that must not be conflated:
/// - `max_checks` (K): synchronous status checks one invocation may perform,
///   `check_delay` apart, before reporting the job as still running.
/// - `retry_budget` (R): polling rounds a job may consume in total, the
///   submitting invocation included. Round numbers are `0..R`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub max_checks: u32,
    pub check_delay: Duration,
    pub retry_budget: u32,
    /// Lower bound of the delay before a continuation resumes.
    pub jitter_min: Duration,
    /// Upper bound (inclusive) of the delay before a continuation resumes.
    pub jitter_max: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_checks: 20,
            check_delay: Duration::from_secs(3),
            retry_budget: 4,
            jitter_min: Duration::from_secs(60),
            jitter_max: Duration::from_secs(120),
        }
    }
}

impl PollPolicy {
    /// Policy with no delays at all, for tests and local dry runs.
    pub fn immediate(max_checks: u32, retry_budget: u32) -> Self {
        Self {
            max_checks,
            check_delay: Duration::ZERO,
            retry_budget,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
        }
    }

    /// Whether a round numbered `retry_count` may hand off to another round.
    pub fn has_budget_after(&self, retry_count: u32) -> bool {
        retry_count.saturating_add(1) < self.retry_budget
    }

    /// Randomized continuation delay within `[jitter_min, jitter_max]`.
    ///
    /// Spreads resumptions out so jobs submitted together do not poll together.
    pub fn continuation_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.jitter_min.as_millis() as u64;
        let max = self.jitter_max.as_millis() as u64;
        if max <= min {
            return self.jitter_min;
        }
        Duration::from_millis(rng.gen_range(min..=max))
    }

    /// Worst-case wall-clock time from submission to a terminal state.
    ///
    /// `R × (K × check_delay + jitter_max)`, excluding service call latency.
    pub fn max_total_wait(&self) -> Duration {
        let per_round = self.check_delay * self.max_checks + self.jitter_max;
        per_round * self.retry_budget
    }

    /// Total status checks a job may consume before it is timed out.
    pub fn max_total_checks(&self) -> u64 {
        u64::from(self.max_checks) * u64::from(self.retry_budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn budget_counts_the_submitting_round() {
        let policy = PollPolicy {
            retry_budget: 3,
            ..Default::default()
        };

        assert!(policy.has_budget_after(0));
        assert!(policy.has_budget_after(1));
        assert!(!policy.has_budget_after(2));
        assert!(!policy.has_budget_after(3));
    }

    #[test]
    fn zero_budget_never_continues() {
        let policy = PollPolicy::immediate(5, 0);
        assert!(!policy.has_budget_after(0));
    }

    #[test]
    fn continuation_delay_stays_within_jitter_window() {
        let policy = PollPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let delay = policy.continuation_delay(&mut rng);
            assert!(delay >= Duration::from_secs(60));
            assert!(delay <= Duration::from_secs(120));
        }
    }

    #[test]
    fn degenerate_jitter_window_is_fixed() {
        let policy = PollPolicy {
            jitter_min: Duration::from_secs(5),
            jitter_max: Duration::from_secs(5),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(policy.continuation_delay(&mut rng), Duration::from_secs(5));
    }

    #[test]
    fn total_wait_is_bounded_by_both_budgets() {
        let policy = PollPolicy::default();
        // 4 rounds × (20 × 3s + 120s)
        assert_eq!(policy.max_total_wait(), Duration::from_secs(4 * (60 + 120)));
        assert_eq!(policy.max_total_checks(), 80);
    }
}
