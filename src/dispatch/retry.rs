use crate::recognize::RecognizeError;
use rand::Rng;
use std::time::Duration;

/// What to do with a failed recognition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    Retry(Duration),
    Terminal,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u8,
    base_delay: Duration,
    jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u8, base_delay: Duration, jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            jitter,
        }
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    /// Classify a failure after `attempt` attempts have been made.
    ///
    /// Only quota exhaustion is worth waiting out; the delay is the base
    /// backoff plus a random spread so parallel segments do not all hammer
    /// the service again at the same instant.
    pub fn decide(&self, attempt: u8, error: &RecognizeError) -> RetryDecision {
        if !error.is_retryable() || attempt >= self.max_attempts {
            return RetryDecision::Terminal;
        }

        let jitter_ms = self.jitter.as_millis() as u64;
        let spread = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };

        RetryDecision::Retry(self.base_delay + spread)
    }
}
