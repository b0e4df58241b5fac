//! Sender state machine for stop-and-wait delivery.
//!
//! [`Sender`] tracks the phase, the sequence counter and the single in-flight
//! packet.  It does **not** touch the socket or the file; the session in
//! [`crate::session`] loads packets into it, transmits them, and feeds back
//! an [`Event`] per wait.  [`Sender::on_event`] is the whole transition
//! function.
//!
//! # Stop-and-Wait contract
//! - At most **one** packet is in flight at any moment.
//! - A new packet may only be loaded once the previous one was acknowledged.
//! - A rejected reply is handled exactly like a timeout: resend unchanged.
//! - Sequence numbers are byte offsets; the SYN consumes the length of the
//!   file name, data packets the length of their chunk, FIN nothing.

use crate::config::Config;
use crate::packet::{Packet, PacketError};
use crate::state::SenderPhase;
use crate::timer::RetryTimer;

/// Outcome of one wait for a reply.
#[derive(Debug, Clone)]
pub enum Event {
    /// Something arrived from the peer.  It may still be garbage.
    Reply(Packet),
    /// Nothing usable arrived within the timeout.
    TimedOut,
}

/// What the session must do after an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The in-flight packet was acknowledged; load the next one.
    Advanced,
    /// Resend the in-flight packet unchanged.
    Retransmit,
    /// The retry budget is spent; abort the transfer.
    Exhausted,
}

/// A packet that has been sent but not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    /// The packet on the wire.
    pub packet: Packet,
    /// The `ack_no` a valid reply must carry.
    pub expected_ack: i32,
    /// How many times this packet has been transmitted (1 = first send).
    pub tx_count: u32,
}

/// Counters describing one transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendStats {
    /// File bytes acknowledged by the receiver.
    pub bytes: u64,
    /// Distinct data packets (excluding SYN and FIN).
    pub data_packets: u32,
    /// Every datagram handed to the transport, retransmissions included.
    pub transmissions: u32,
    /// Transmissions beyond the first for each packet.
    pub retransmissions: u32,
}

/// Stop-and-wait send-side state for one transfer.
#[derive(Debug)]
pub struct Sender {
    pub phase: SenderPhase,
    /// Sequence number of the **next** byte to load.
    ///
    /// Advances as soon as a packet is loaded; the in-flight packet's
    /// `expected_ack` always equals it.
    pub next_seq: i32,
    file_name: String,
    unacked: Option<InFlight>,
    pub(crate) timer: RetryTimer,
    stats: SendStats,
}

impl Sender {
    pub fn new(file_name: impl Into<String>, config: &Config) -> Self {
        Self {
            phase: SenderPhase::Handshake,
            next_seq: 0,
            file_name: file_name.into(),
            unacked: None,
            timer: RetryTimer::new(config),
            stats: SendStats::default(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn in_flight(&self) -> Option<&InFlight> {
        self.unacked.as_ref()
    }

    pub fn stats(&self) -> &SendStats {
        &self.stats
    }

    /// Failed attempts recorded against the current packet.
    pub fn failures(&self) -> u32 {
        self.timer.failures()
    }

    // -----------------------------------------------------------------------
    // Loading packets
    // -----------------------------------------------------------------------

    /// Load the SYN carrying the destination file name.
    pub fn load_syn(&mut self) -> Result<&InFlight, PacketError> {
        debug_assert_eq!(self.phase, SenderPhase::Handshake);
        let packet = Packet::syn(self.next_seq, &self.file_name)?;
        self.next_seq = self.next_seq.wrapping_add(self.file_name.len() as i32);
        Ok(self.load(packet))
    }

    /// Load the next chunk of the file.
    pub fn load_chunk(&mut self, chunk: &[u8]) -> Result<&InFlight, PacketError> {
        debug_assert_eq!(self.phase, SenderPhase::Transfer);
        let packet = Packet::data(self.next_seq, chunk)?;
        self.next_seq = self.next_seq.wrapping_add(chunk.len() as i32);
        self.stats.data_packets += 1;
        Ok(self.load(packet))
    }

    /// The stream is exhausted: enter teardown and load FIN.
    pub fn load_fin(&mut self) -> &InFlight {
        self.phase = SenderPhase::Teardown;
        let packet = Packet::fin(self.next_seq);
        self.load(packet)
    }

    fn load(&mut self, packet: Packet) -> &InFlight {
        debug_assert!(
            self.unacked.is_none(),
            "load called while a packet is already in flight"
        );
        self.timer.reset();
        self.unacked.insert(InFlight {
            packet,
            expected_ack: self.next_seq,
            tx_count: 0,
        })
    }

    /// Record that the in-flight packet was handed to the transport.
    ///
    /// Call only after a send succeeded; failed sends are not counted.
    pub fn on_transmit(&mut self) {
        if let Some(entry) = self.unacked.as_mut() {
            entry.tx_count += 1;
            self.stats.transmissions += 1;
            if entry.tx_count > 1 {
                self.stats.retransmissions += 1;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Transition function
    // -----------------------------------------------------------------------

    /// `true` if `reply` acknowledges the in-flight packet.
    ///
    /// The reply must be intact, carry ACK and match the expected ack
    /// number.  During teardown it must also carry FIN: FIN consumes no
    /// sequence space, so a plain ACK at the final offset is only a late copy
    /// of the last data (or handshake) acknowledgement.
    pub fn accepts(&self, reply: &Packet) -> bool {
        let Some(entry) = &self.unacked else {
            return false;
        };
        if self.phase == SenderPhase::Teardown && !reply.is_fin() {
            return false;
        }
        reply.is_ack() && !reply.is_corrupted_reply(entry.expected_ack)
    }

    /// Advance the machine by one wait outcome.
    pub fn on_event(&mut self, event: Event) -> Transition {
        if self.unacked.is_none() {
            return Transition::Advanced;
        }

        let accepted = match &event {
            Event::Reply(reply) => self.accepts(reply),
            Event::TimedOut => false,
        };

        if accepted {
            if let Some(entry) = self.unacked.take() {
                // The SYN payload is the file name, not file content.
                if self.phase == SenderPhase::Transfer {
                    self.stats.bytes += entry.packet.payload().len() as u64;
                }
            }
            self.timer.reset();
            self.phase = match self.phase {
                SenderPhase::Handshake => SenderPhase::Transfer,
                SenderPhase::Transfer => SenderPhase::Transfer,
                SenderPhase::Teardown | SenderPhase::Done => SenderPhase::Done,
            };
            return Transition::Advanced;
        }

        if self.timer.on_failure() {
            Transition::Exhausted
        } else {
            Transition::Retransmit
        }
    }
}
