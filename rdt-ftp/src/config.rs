//! Tunable protocol parameters.

use std::time::Duration;

/// How long to wait for a reply before resending.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// Consecutive failed attempts (timeouts or rejected replies) tolerated for a
/// single packet before the transfer is abandoned.
pub const DEFAULT_MAX_RETRIES: u32 = 50;

/// Quiet period the receiver waits after acknowledging FIN, re-answering any
/// retransmitted FIN, before it releases the socket.
pub const DEFAULT_LINGER: Duration = Duration::from_secs(2);

/// Parameters shared by both roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Per-attempt receive timeout.
    pub timeout: Duration,
    /// Retry budget per in-flight packet.
    pub max_retries: u32,
    /// Receiver TIME_WAIT analogue. Zero closes immediately after FIN-ACK.
    pub linger: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            linger: DEFAULT_LINGER,
        }
    }
}

impl Config {
    pub fn new(timeout: Duration, max_retries: u32, linger: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            linger,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }
}
