//! Phase types for the two protocol roles.
//!
//! Transitions are *not* implemented here; they live in [`crate::sender`] and
//! [`crate::receiver`].
//!
//! ```text
//!  sender:    HANDSHAKE ──ACK(name)──▶ TRANSFER ──EOF──▶ TEARDOWN ──ACK(FIN)──▶ DONE
//!                                        │    ▲
//!                                        └────┘ ACK(seq)
//!
//!  receiver:  LISTEN ──first pkt──▶ ESTABLISHED ──SYN──▶ RECEIVING ──FIN──▶ CLOSED
//! ```

use std::fmt;

/// Sender progress through one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderPhase {
    /// SYN carrying the destination name is in flight.
    #[default]
    Handshake,
    /// Data chunks are being delivered one at a time.
    Transfer,
    /// FIN is in flight.
    Teardown,
    /// FIN acknowledged; nothing left to do.
    Done,
}

/// Receiver progress through one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverPhase {
    /// No packet seen yet; the first sender becomes the peer.
    #[default]
    Listen,
    /// Peer known; waiting for an intact SYN.
    Established,
    /// Destination open; accepting in-order data.
    Receiving,
    /// FIN accepted and acknowledged.
    Closed,
}

impl SenderPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handshake => "handshake",
            Self::Transfer => "transfer",
            Self::Teardown => "teardown",
            Self::Done => "done",
        }
    }
}

impl ReceiverPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Listen => "listen",
            Self::Established => "established",
            Self::Receiving => "receiving",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SenderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ReceiverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
