//! Wire-format definitions for protocol packets.
//!
//! Every datagram exchanged between peers is a [`Packet`]: a fixed-size
//! [`PACKET_LEN`]-byte buffer.  This module is responsible for:
//! - Laying out header fields at fixed byte offsets.
//! - Computing and verifying the CRC-32 integrity checksum.
//! - Reading fields back out of a received buffer.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   Sequence Number (i32)                       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                Acknowledgment Number (i32)                    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Flags     |        Payload Length         |               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+               +
//! |           Payload (981 bytes, zero padded) ...                |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                 Checksum (u64, CRC-32 in low bits)            |
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The checksum covers bytes `0..OFF_CHECKSUM` of the buffer, padding
//! included, on both encode and verify.

use thiserror::Error;

/// Bit-flag constants for the `flags` header field.
pub mod flags {
    /// Connection open; the payload carries the destination file name.
    pub const SYN: u8 = 0b0000_0001;
    /// Acknowledgement field is valid.
    pub const ACK: u8 = 0b0000_0010;
    /// Final packet of the stream (or its acknowledgement).
    pub const FIN: u8 = 0b0000_0100;
}

/// Total size of every datagram on the wire.
pub const PACKET_LEN: usize = 1000;

/// Byte length of the fixed-size header.
/// seq(4) + ack(4) + flags(1) + payload_len(2)
pub const HEADER_LEN: usize = 11;

/// Byte length of the trailing checksum field.
pub const CHECKSUM_LEN: usize = 8;

/// Largest payload a single packet can carry.
pub const MAX_PAYLOAD: usize = PACKET_LEN - HEADER_LEN - CHECKSUM_LEN;

/// Sequence / acknowledgement value carried by fields that are not in use.
pub const UNUSED: i32 = -1;

const OFF_SEQ: usize = 0;
const OFF_ACK: usize = 4;
const OFF_FLAGS: usize = 8;
const OFF_PAYLOAD_LEN: usize = 9;
const OFF_PAYLOAD: usize = HEADER_LEN;
const OFF_CHECKSUM: usize = PACKET_LEN - CHECKSUM_LEN;

/// Errors that can arise when building or parsing a packet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// The requested payload length exceeds [`MAX_PAYLOAD`].
    #[error("payload of {0} bytes exceeds the {}-byte maximum", MAX_PAYLOAD)]
    PayloadTooLarge(usize),
    /// Fewer payload bytes were supplied than `payload_len` claims.
    #[error("payload_len is {claimed} but only {supplied} bytes were supplied")]
    PayloadShorterThanLength { claimed: usize, supplied: usize },
    /// A datagram was not exactly [`PACKET_LEN`] bytes long.
    #[error("datagram is {0} bytes, expected {}", PACKET_LEN)]
    WrongSize(usize),
}

/// A complete protocol datagram.
///
/// The packet *is* its wire representation; accessors read fields straight
/// out of the buffer and perform no validation.  Call [`Packet::is_intact`]
/// before trusting any of them.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    buf: [u8; PACKET_LEN],
}

impl Packet {
    /// Build a packet carrying the first `payload_len` bytes of `payload`.
    ///
    /// Fails if `payload_len` exceeds [`MAX_PAYLOAD`] or `payload` is too
    /// short to supply that many bytes.
    pub fn encode(
        payload: &[u8],
        payload_len: usize,
        seq: i32,
        ack: i32,
        flags: u8,
    ) -> Result<Self, PacketError> {
        if payload_len > MAX_PAYLOAD {
            return Err(PacketError::PayloadTooLarge(payload_len));
        }
        if payload.len() < payload_len {
            return Err(PacketError::PayloadShorterThanLength {
                claimed: payload_len,
                supplied: payload.len(),
            });
        }

        let mut buf = [0u8; PACKET_LEN];
        buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&seq.to_be_bytes());
        buf[OFF_ACK..OFF_ACK + 4].copy_from_slice(&ack.to_be_bytes());
        buf[OFF_FLAGS] = flags;
        buf[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 2]
            .copy_from_slice(&(payload_len as u16).to_be_bytes());
        buf[OFF_PAYLOAD..OFF_PAYLOAD + payload_len].copy_from_slice(&payload[..payload_len]);

        let csum = checksum(&buf[..OFF_CHECKSUM]);
        buf[OFF_CHECKSUM..].copy_from_slice(&csum.to_be_bytes());

        Ok(Self { buf })
    }

    /// Plain data packet: no flags, `ack` unused.
    pub fn data(seq: i32, chunk: &[u8]) -> Result<Self, PacketError> {
        Self::encode(chunk, chunk.len(), seq, UNUSED, 0)
    }

    /// Connection-open packet carrying the destination file name.
    pub fn syn(seq: i32, file_name: &str) -> Result<Self, PacketError> {
        let name = file_name.as_bytes();
        Self::encode(name, name.len(), seq, UNUSED, flags::SYN)
    }

    /// Pure acknowledgement of every byte before `ack`.
    pub fn ack(ack: i32) -> Self {
        Self::control(UNUSED, ack, flags::ACK)
    }

    /// Final packet of the stream, positioned at `seq`.
    pub fn fin(seq: i32) -> Self {
        Self::control(seq, UNUSED, flags::FIN)
    }

    /// Acknowledgement of the final packet.
    pub fn fin_ack(ack: i32) -> Self {
        Self::control(UNUSED, ack, flags::ACK | flags::FIN)
    }

    fn control(seq: i32, ack: i32, flags: u8) -> Self {
        match Self::encode(&[], 0, seq, ack, flags) {
            Ok(packet) => packet,
            // An empty payload always fits.
            Err(_) => unreachable!(),
        }
    }

    /// Wrap a received datagram.
    ///
    /// Only the length is checked; integrity is left to [`Packet::is_intact`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        let buf: [u8; PACKET_LEN] = bytes
            .try_into()
            .map_err(|_| PacketError::WrongSize(bytes.len()))?;
        Ok(Self { buf })
    }

    /// The raw wire bytes.
    pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
        &self.buf
    }

    /// Mutable access to the raw wire bytes (fault injection).
    pub fn as_bytes_mut(&mut self) -> &mut [u8; PACKET_LEN] {
        &mut self.buf
    }

    // -----------------------------------------------------------------------
    // Field accessors
    // -----------------------------------------------------------------------

    pub fn seq(&self) -> i32 {
        i32::from_be_bytes(read_array(&self.buf, OFF_SEQ))
    }

    pub fn ack_no(&self) -> i32 {
        i32::from_be_bytes(read_array(&self.buf, OFF_ACK))
    }

    pub fn flags(&self) -> u8 {
        self.buf[OFF_FLAGS]
    }

    /// Value of the `payload_len` field as stored (may exceed the maximum
    /// on a corrupted packet).
    pub fn payload_len(&self) -> usize {
        u16::from_be_bytes(read_array(&self.buf, OFF_PAYLOAD_LEN)) as usize
    }

    /// The valid payload bytes.
    ///
    /// A garbage length field is clamped to [`MAX_PAYLOAD`].
    pub fn payload(&self) -> &[u8] {
        let len = self.payload_len().min(MAX_PAYLOAD);
        &self.buf[OFF_PAYLOAD..OFF_PAYLOAD + len]
    }

    pub fn stored_checksum(&self) -> u64 {
        u64::from_be_bytes(read_array(&self.buf, OFF_CHECKSUM))
    }

    pub fn is_syn(&self) -> bool {
        self.flags() & flags::SYN != 0
    }

    pub fn is_ack(&self) -> bool {
        self.flags() & flags::ACK != 0
    }

    pub fn is_fin(&self) -> bool {
        self.flags() & flags::FIN != 0
    }

    // -----------------------------------------------------------------------
    // Validation predicates
    // -----------------------------------------------------------------------

    /// `true` when the stored checksum matches the buffer contents.
    pub fn is_intact(&self) -> bool {
        checksum(&self.buf[..OFF_CHECKSUM]) == self.stored_checksum()
    }

    pub fn is_expected_seq(&self, expected_seq: i32) -> bool {
        self.seq() == expected_seq
    }

    pub fn is_expected_ack(&self, expected_ack: i32) -> bool {
        self.ack_no() == expected_ack
    }

    /// Receiver-side rejection test.
    pub fn is_corrupted_or_duplicate(&self, expected_seq: i32) -> bool {
        !(self.is_intact() && self.is_expected_seq(expected_seq))
    }

    /// Sender-side rejection test.
    pub fn is_corrupted_reply(&self, expected_ack: i32) -> bool {
        !(self.is_intact() && self.is_expected_ack(expected_ack))
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("seq", &self.seq())
            .field("ack", &self.ack_no())
            .field("flags", &format_args!("{:#05b}", self.flags()))
            .field("payload_len", &self.payload_len())
            .field("intact", &self.is_intact())
            .finish()
    }
}

fn read_array<const N: usize>(buf: &[u8; PACKET_LEN], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

/// CRC-32 (IEEE) of `data`, widened to the 64-bit checksum slot.
fn checksum(data: &[u8]) -> u64 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    u64::from(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_constants() {
        assert_eq!(HEADER_LEN, 11);
        assert_eq!(MAX_PAYLOAD, 981);
        assert_eq!(OFF_CHECKSUM, 992);
        assert_eq!(OFF_PAYLOAD + MAX_PAYLOAD, OFF_CHECKSUM);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let pkt = Packet::encode(b"hello world", 5, 1234, -7, flags::SYN | flags::ACK).unwrap();
        assert_eq!(pkt.seq(), 1234);
        assert_eq!(pkt.ack_no(), -7);
        assert_eq!(pkt.flags(), flags::SYN | flags::ACK);
        assert_eq!(pkt.payload(), b"hello");
        assert!(pkt.is_intact());

        let wire = Packet::from_bytes(pkt.as_bytes()).unwrap();
        assert_eq!(wire, pkt);
    }

    #[test]
    fn max_payload_roundtrip() {
        let chunk: Vec<u8> = (0..MAX_PAYLOAD).map(|i| (i % 251) as u8).collect();
        let pkt = Packet::data(i32::MAX - 10, &chunk).unwrap();
        assert_eq!(pkt.payload(), &chunk[..]);
        assert_eq!(pkt.seq(), i32::MAX - 10);
        assert!(pkt.is_intact());
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let chunk = vec![0u8; MAX_PAYLOAD + 1];
        assert_eq!(
            Packet::data(0, &chunk),
            Err(PacketError::PayloadTooLarge(MAX_PAYLOAD + 1))
        );
    }

    #[test]
    fn short_payload_slice_is_rejected() {
        assert_eq!(
            Packet::encode(b"abc", 4, 0, 0, 0),
            Err(PacketError::PayloadShorterThanLength {
                claimed: 4,
                supplied: 3
            })
        );
    }

    #[test]
    fn builders_set_expected_flags() {
        let syn = Packet::syn(0, "out.bin").unwrap();
        assert!(syn.is_syn() && !syn.is_ack() && !syn.is_fin());
        assert_eq!(syn.payload(), b"out.bin");

        let ack = Packet::ack(42);
        assert!(ack.is_ack() && !ack.is_fin());
        assert_eq!(ack.ack_no(), 42);
        assert_eq!(ack.seq(), UNUSED);
        assert!(ack.payload().is_empty());

        let fin = Packet::fin(99);
        assert!(fin.is_fin() && !fin.is_ack());
        assert_eq!(fin.seq(), 99);

        let fin_ack = Packet::fin_ack(99);
        assert!(fin_ack.is_fin() && fin_ack.is_ack());
        assert_eq!(fin_ack.ack_no(), 99);

        let data = Packet::data(5, b"xyz").unwrap();
        assert_eq!(data.flags(), 0);
    }

    #[test]
    fn fields_are_big_endian_on_wire() {
        let pkt = Packet::encode(b"", 0, 0x0102_0304, 0x0506_0708, 0).unwrap();
        let bytes = pkt.as_bytes();
        assert_eq!(&bytes[OFF_SEQ..OFF_SEQ + 4], &[1, 2, 3, 4]);
        assert_eq!(&bytes[OFF_ACK..OFF_ACK + 4], &[5, 6, 7, 8]);
    }

    #[test]
    fn checksum_occupies_low_32_bits() {
        let pkt = Packet::ack(1);
        assert_eq!(pkt.stored_checksum() >> 32, 0);
        assert_eq!(&pkt.as_bytes()[OFF_CHECKSUM..OFF_CHECKSUM + 4], &[0, 0, 0, 0]);
    }

    #[test]
    fn single_bit_flips_are_detected() {
        let pkt = Packet::data(981, b"some file content").unwrap();
        // Every header bit, a spread of payload bits, padding and the checksum itself.
        let positions = (0..HEADER_LEN * 8)
            .chain((OFF_PAYLOAD * 8..OFF_PAYLOAD * 8 + 17 * 8).step_by(3))
            .chain([500 * 8 + 1, 991 * 8 + 7, 995 * 8, 999 * 8 + 7]);
        for bit in positions {
            let mut corrupt = pkt.clone();
            corrupt.as_bytes_mut()[bit / 8] ^= 1 << (bit % 8);
            assert!(!corrupt.is_intact(), "flip of bit {bit} went undetected");
        }
    }

    #[test]
    fn zero_filled_tail_is_detected() {
        let mut pkt = Packet::data(0, &[0xAB; 900]).unwrap();
        pkt.as_bytes_mut()[400..].fill(0);
        assert!(!pkt.is_intact());
    }

    #[test]
    fn garbage_length_is_clamped() {
        let mut pkt = Packet::ack(0);
        pkt.as_bytes_mut()[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 2].copy_from_slice(&[0xFF, 0xFF]);
        assert_eq!(pkt.payload_len(), 0xFFFF);
        assert_eq!(pkt.payload().len(), MAX_PAYLOAD);
        assert!(!pkt.is_intact());
    }

    #[test]
    fn from_bytes_rejects_wrong_size() {
        assert_eq!(Packet::from_bytes(&[]), Err(PacketError::WrongSize(0)));
        assert_eq!(
            Packet::from_bytes(&[0u8; PACKET_LEN + 1]),
            Err(PacketError::WrongSize(PACKET_LEN + 1))
        );
    }

    #[test]
    fn composite_predicates() {
        let pkt = Packet::data(100, b"abc").unwrap();
        assert!(!pkt.is_corrupted_or_duplicate(100));
        assert!(pkt.is_corrupted_or_duplicate(103));

        let ack = Packet::ack(103);
        assert!(!ack.is_corrupted_reply(103));
        assert!(ack.is_corrupted_reply(100));

        let mut bad = ack.clone();
        bad.as_bytes_mut()[OFF_FLAGS] ^= flags::SYN;
        assert!(bad.is_corrupted_reply(103));
    }
}
