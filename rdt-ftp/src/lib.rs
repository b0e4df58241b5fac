//! `rdt-ftp`: reliable file transfer over UDP using stop-and-wait ARQ.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────┐  SYN / DATA / FIN   ┌────────────────┐
//!  │ SenderSession│────────────────────▶│ReceiverSession │
//!  │  (Sender FSM)│◀────────────────────│ (Receiver FSM) │
//!  └──────┬───────┘   ACK / FIN-ACK     └───────┬────────┘
//!         │ ChunkSource                 ChunkSink │
//!         │                                       │
//!  ┌──────▼───────────────────────────────────────▼──────┐
//!  │   Transport: Socket (UDP) or Simulator (faults)     │
//!  └─────────────────────────────────────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]    fixed 1000-byte wire format and CRC-32 integrity check
//! - [`state`]     phase enums for both roles
//! - [`sender`]    stop-and-wait send-side transition function
//! - [`receiver`]  in-order acceptance and duplicate suppression
//! - [`timer`]     per-packet timeout and retry budget
//! - [`session`]   async drivers tying the machines to I/O
//! - [`stream`]    chunked file reading and in-order writing
//! - [`socket`]    transport trait and async UDP socket
//! - [`simulator`] seeded lossy/corrupting network layer for testing
//! - [`config`]    timeouts and retry limits
//! - [`error`]     transfer-level errors

pub mod config;
pub mod error;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod stream;
pub mod timer;

pub use config::Config;
pub use error::TransferError;
pub use session::{receive_file, send_file, ReceiveReport, SendReport};
