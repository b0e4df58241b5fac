//! Retransmit timer and retry budget.
//!
//! Stop-and-wait needs exactly one timer per role: the wait for the reply to
//! the single in-flight packet.  [`RetryTimer`] tracks:
//! - the per-attempt timeout (fixed, taken from [`Config`]),
//! - the number of consecutive failed attempts for the current packet,
//! - whether that count has exceeded the configured budget.
//!
//! A failed attempt is either a timeout or a rejected reply; the two are
//! indistinguishable here.  Progress (an accepted reply) resets
//! the count.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::Config;

/// Per-packet timeout and consecutive-failure counter.
#[derive(Debug, Clone)]
pub struct RetryTimer {
    timeout: Duration,
    max_retries: u32,
    /// Failed attempts since the last reset.
    failures: u32,
    /// When the current wait expires, if armed.
    deadline: Option<Instant>,
}

impl RetryTimer {
    pub fn new(config: &Config) -> Self {
        Self {
            timeout: config.timeout,
            max_retries: config.max_retries,
            failures: 0,
            deadline: None,
        }
    }

    /// Start a fresh wait window and return its deadline.
    pub fn arm(&mut self) -> Instant {
        let deadline = Instant::now() + self.timeout;
        self.deadline = Some(deadline);
        deadline
    }

    /// Time left before the armed deadline (zero if expired or unarmed).
    pub fn remaining(&self) -> Duration {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Record a failed attempt.
    ///
    /// Returns `true` once the budget is exhausted.
    pub fn on_failure(&mut self) -> bool {
        self.failures += 1;
        self.deadline = None;
        self.failures > self.max_retries
    }

    /// Forget previous failures after progress was made.
    pub fn reset(&mut self) {
        self.failures = 0;
        self.deadline = None;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
