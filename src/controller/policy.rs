// file: src/controller/policy.rs
// description: poll/backoff policy for remote execution and long-running operations
// reference: bounded exponential backoff

use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay schedule for repeated remote calls.
///
/// The base delay separates consecutive calls while work is progressing.
/// Consecutive failures double the delay up to `max_delay_ms`; a success
/// resets it. `max_attempts` bounds the total number of calls in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            max_attempts: 500,
        }
    }
}

impl PollPolicy {
    /// Delay to wait before the next call, given how many calls in a row
    /// have failed. Zero failures yields the base delay.
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        // 2^63 already saturates any sane base delay.
        let factor = 1u64.checked_shl(consecutive_failures.min(63)).unwrap_or(u64::MAX);
        let millis = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(HarvestError::Validation(
                "poll policy max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(HarvestError::Validation(format!(
                "poll policy base delay {}ms exceeds max delay {}ms",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}
