//! Receiver state machine: in-order acceptance and duplicate suppression.
//!
//! The [`Receiver`] is responsible for everything that happens *after* a raw
//! datagram arrives and *before* bytes reach the output stream:
//! - Locking onto the first sender as the peer.
//! - Waiting passively for an intact SYN (garbage is never acknowledged).
//! - Accepting only the packet whose `seq` equals the expected offset.
//! - Re-issuing the last ACK, unchanged, for anything else.
//! - Detecting FIN and answering it with FIN-ACK, also after closing.
//!
//! The [`Receiver`] does **not** send or write anything itself; it returns an
//! [`Action`] that [`crate::session`] carries out.
//!
//! The expected offset only ever moves on an exact match.  A retransmitted
//! packet whose ACK was lost therefore arrives with a `seq` behind the
//! already-advanced expectation, is dropped, and the repeated ACK lets the
//! sender move on.

use std::net::SocketAddr;

use crate::config::Config;
use crate::error::TransferError;
use crate::packet::Packet;
use crate::state::ReceiverPhase;
use crate::stream::safe_file_name;
use crate::timer::RetryTimer;

/// Work the session must perform for one inbound packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Drop the packet silently.
    Ignore,
    /// Valid SYN: create `file_name`, then send `ack`.
    Open { file_name: String, ack: Packet },
    /// Next in-order chunk: append `payload`, then send `ack`.
    Deliver { payload: Vec<u8>, ack: Packet },
    /// Corrupted, duplicate or out-of-order: resend the previous ACK.
    Reack(Packet),
    /// Final packet: append `payload`, send the FIN-ACK in `ack`, close.
    Finish { payload: Vec<u8>, ack: Packet },
}

/// Counters describing one transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    /// Payload bytes handed to the output stream.
    pub bytes: u64,
    /// Data and FIN packets accepted in order.
    pub accepted: u32,
    /// Packets from the peer that were corrupted, duplicated or out of order.
    pub rejected: u32,
}

/// Stop-and-wait receive-side state for one transfer.
#[derive(Debug)]
pub struct Receiver {
    pub phase: ReceiverPhase,
    peer: Option<SocketAddr>,
    /// Offset of the next byte the receiver will accept (`RCV.NXT`).
    expected_seq: i32,
    file_name: Option<String>,
    last_ack: Option<Packet>,
    pub(crate) timer: RetryTimer,
    stats: ReceiveStats,
}

impl Receiver {
    pub fn new(config: &Config) -> Self {
        Self {
            phase: ReceiverPhase::Listen,
            peer: None,
            expected_seq: 0,
            file_name: None,
            last_ack: None,
            timer: RetryTimer::new(config),
            stats: ReceiveStats::default(),
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn expected_seq(&self) -> i32 {
        self.expected_seq
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn last_ack(&self) -> Option<&Packet> {
        self.last_ack.as_ref()
    }

    pub fn stats(&self) -> &ReceiveStats {
        &self.stats
    }

    /// Process one inbound packet from `from`.
    ///
    /// Fails only when an intact SYN names an unusable destination.
    pub fn on_packet(&mut self, packet: &Packet, from: SocketAddr) -> Result<Action, TransferError> {
        if self.phase == ReceiverPhase::Listen {
            self.peer = Some(from);
            self.phase = ReceiverPhase::Established;
        }
        if self.peer != Some(from) {
            return Ok(Action::Ignore);
        }

        let action = match self.phase {
            ReceiverPhase::Listen | ReceiverPhase::Established => self.on_handshake(packet)?,
            ReceiverPhase::Receiving => self.on_data(packet),
            ReceiverPhase::Closed => self.on_closed(packet),
        };
        Ok(action)
    }

    /// A receive wait expired with nothing from the peer.
    ///
    /// Returns the ACK to resend, if any; fails once the budget of silent
    /// waits is spent.
    pub fn on_timeout(&mut self) -> Result<Option<Packet>, TransferError> {
        if self.phase != ReceiverPhase::Receiving {
            return Ok(None);
        }
        if self.timer.on_failure() {
            return Err(TransferError::RetriesExhausted {
                phase: self.phase.as_str(),
                attempts: self.timer.failures(),
            });
        }
        Ok(self.last_ack.clone())
    }

    fn on_handshake(&mut self, packet: &Packet) -> Result<Action, TransferError> {
        if !packet.is_intact() || !packet.is_syn() {
            self.stats.rejected += 1;
            return Ok(Action::Ignore);
        }

        let name = std::str::from_utf8(packet.payload())
            .ok()
            .and_then(safe_file_name)
            .ok_or_else(|| {
                TransferError::InvalidFileName(String::from_utf8_lossy(packet.payload()).into_owned())
            })?
            .to_owned();

        self.expected_seq = packet.seq().wrapping_add(packet.payload().len() as i32);
        let ack = Packet::ack(self.expected_seq);
        self.last_ack = Some(ack.clone());
        self.file_name = Some(name.clone());
        self.phase = ReceiverPhase::Receiving;
        self.timer.reset();

        Ok(Action::Open {
            file_name: name,
            ack,
        })
    }

    fn on_data(&mut self, packet: &Packet) -> Action {
        // Any word from the peer proves it is alive.
        self.timer.reset();

        if packet.is_corrupted_or_duplicate(self.expected_seq) || packet.is_syn() || packet.is_ack()
        {
            self.stats.rejected += 1;
            return self.reack();
        }

        let payload = packet.payload().to_vec();
        self.expected_seq = self.expected_seq.wrapping_add(payload.len() as i32);
        self.stats.bytes += payload.len() as u64;
        self.stats.accepted += 1;

        if packet.is_fin() {
            let ack = Packet::fin_ack(self.expected_seq);
            self.last_ack = Some(ack.clone());
            self.phase = ReceiverPhase::Closed;
            Action::Finish { payload, ack }
        } else {
            let ack = Packet::ack(self.expected_seq);
            self.last_ack = Some(ack.clone());
            Action::Deliver { payload, ack }
        }
    }

    fn on_closed(&mut self, packet: &Packet) -> Action {
        if packet.is_intact() && packet.is_fin() {
            self.reack()
        } else {
            Action::Ignore
        }
    }

    fn reack(&self) -> Action {
        match &self.last_ack {
            Some(ack) => Action::Reack(ack.clone()),
            None => Action::Ignore,
        }
    }
}
