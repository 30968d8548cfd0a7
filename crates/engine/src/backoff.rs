// In crates/engine/src/backoff.rs

use std::time::Duration;

/// What the job should do after a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffDecision {
    /// Keep the normal tick cadence.
    Continue,
    /// Pause the session for this long, then reset the counter.
    Cooldown(Duration),
}

/// Circuit breaker for a degraded data source.
///
/// The counter itself lives in `SessionState`; this type only holds the
/// policy, so one instance serves every session.
#[derive(Debug, Clone)]
pub struct FailureBackoff {
    threshold: u32,
    cooldown: Duration,
}

impl FailureBackoff {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self { threshold: threshold.max(1), cooldown }
    }

    pub fn record_failure(&self, consecutive_failures: &mut u32) -> BackoffDecision {
        *consecutive_failures = consecutive_failures.saturating_add(1);
        if *consecutive_failures >= self.threshold {
            BackoffDecision::Cooldown(self.cooldown)
        } else {
            BackoffDecision::Continue
        }
    }

    pub fn record_success(&self, consecutive_failures: &mut u32) {
        *consecutive_failures = 0;
    }

    pub fn finish_cooldown(&self, consecutive_failures: &mut u32) {
        *consecutive_failures = 0;
    }
}
