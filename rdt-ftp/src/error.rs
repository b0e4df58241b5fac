//! Errors surfaced by the sender and receiver sessions.
//!
//! Corrupted, duplicate and mismatched packets never show up here: they are
//! absorbed by the state machines and only become visible as
//! [`TransferError::RetriesExhausted`] once the retry budget runs out.

use thiserror::Error;

use crate::packet::PacketError;
use crate::socket::SocketError;

#[derive(Debug, Error)]
pub enum TransferError {
    /// The retry budget for one in-flight packet (or one silent wait) ran out.
    #[error("transfer failed: gave up in {phase} phase after {attempts} failed attempts")]
    RetriesExhausted { phase: &'static str, attempts: u32 },
    /// The destination file name is empty, too long, or not a plain file name.
    #[error("invalid destination file name {0:?}")]
    InvalidFileName(String),
    /// Reading the source or writing the destination failed.
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The transport failed in a way retrying cannot fix.
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error(transparent)]
    Packet(#[from] PacketError),
}
