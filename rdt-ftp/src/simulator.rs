//! Fault-injecting transport for exercising the reliability layer.
//!
//! Real networks drop, reorder, duplicate and corrupt packets.  To exercise
//! the retransmission and rejection paths without depending on actual network
//! conditions, [`Simulator`] wraps any [`Transport`] and applies a
//! configurable fault model to every outbound packet:
//!
//! | Fault            | Description                                          |
//! |------------------|------------------------------------------------------|
//! | Packet loss      | Drop a packet with probability `loss_rate`.          |
//! | Periodic loss    | Drop every `drop_every`-th packet.                   |
//! | Corruption       | Flip one random bit anywhere in the packet.          |
//! | Duplication      | Deliver a packet twice.                              |
//! | Reordering       | Hold a packet back until the next one has been sent. |
//!
//! Decisions come from a seeded RNG so failures are reproducible.  Inbound
//! packets pass through untouched; wrap both peers to make both directions
//! lossy.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::packet::{Packet, PACKET_LEN};
use crate::socket::{SocketError, Transport};

/// Configuration for the fault-injection model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Probability that any given packet is silently dropped.
    pub loss_rate: f64,
    /// Drop every n-th packet sent through this simulator.
    pub drop_every: Option<u64>,
    /// Probability that a packet has one bit flipped.
    pub corrupt_rate: f64,
    /// Probability that a packet is delivered twice.
    pub duplicate_rate: f64,
    /// Probability that a packet is overtaken by the next one.
    pub reorder_rate: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults: the simulator is a transparent pass-through.
        Self {
            loss_rate: 0.0,
            drop_every: None,
            corrupt_rate: 0.0,
            duplicate_rate: 0.0,
            reorder_rate: 0.0,
            seed: 0,
        }
    }
}

impl SimulatorConfig {
    /// A network that delivers nothing.
    pub fn black_hole() -> Self {
        Self {
            loss_rate: 1.0,
            ..Self::default()
        }
    }
}

/// Snapshot of what the simulator has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatorStats {
    pub sent: u64,
    pub dropped: u64,
    pub corrupted: u64,
    pub duplicated: u64,
    pub reordered: u64,
}

/// What happens to one outbound packet.
#[derive(Debug, Default)]
struct Fate {
    drop: bool,
    flip_bit: Option<usize>,
    duplicate: bool,
    hold: bool,
}

/// A fault-injecting wrapper around another transport.
#[derive(Debug)]
pub struct Simulator<T> {
    inner: T,
    config: SimulatorConfig,
    rng: Mutex<StdRng>,
    /// A packet waiting to be overtaken.
    held: Mutex<Option<(Packet, SocketAddr)>>,
    sent: AtomicU64,
    dropped: AtomicU64,
    corrupted: AtomicU64,
    duplicated: AtomicU64,
    reordered: AtomicU64,
}

impl<T> Simulator<T> {
    pub fn new(inner: T, config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            inner,
            config,
            rng: Mutex::new(rng),
            held: Mutex::new(None),
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            corrupted: AtomicU64::new(0),
            duplicated: AtomicU64::new(0),
            reordered: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn stats(&self) -> SimulatorStats {
        SimulatorStats {
            sent: self.sent.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            corrupted: self.corrupted.load(Ordering::Relaxed),
            duplicated: self.duplicated.load(Ordering::Relaxed),
            reordered: self.reordered.load(Ordering::Relaxed),
        }
    }

    fn roll(&self, n: u64) -> Fate {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let cfg = &self.config;

        let periodic = cfg.drop_every.is_some_and(|every| every > 0 && n % every == 0);
        if periodic || rng.random_bool(cfg.loss_rate.clamp(0.0, 1.0)) {
            return Fate {
                drop: true,
                ..Fate::default()
            };
        }
        Fate {
            drop: false,
            flip_bit: rng
                .random_bool(cfg.corrupt_rate.clamp(0.0, 1.0))
                .then(|| rng.random_range(0..PACKET_LEN * 8)),
            duplicate: rng.random_bool(cfg.duplicate_rate.clamp(0.0, 1.0)),
            hold: rng.random_bool(cfg.reorder_rate.clamp(0.0, 1.0)),
        }
    }

    fn take_held(&self) -> Option<(Packet, SocketAddr)> {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<T: Transport + Sync> Transport for Simulator<T> {
    async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        let fate = self.roll(n);

        if fate.drop {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log::trace!("[sim] drop #{n} {packet:?}");
            return Ok(());
        }

        let mut packet = packet.clone();
        if let Some(bit) = fate.flip_bit {
            packet.as_bytes_mut()[bit / 8] ^= 1u8 << (bit % 8);
            self.corrupted.fetch_add(1, Ordering::Relaxed);
            log::trace!("[sim] flip bit {bit} of #{n}");
        }

        if fate.hold {
            let previous = self
                .held
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace((packet, dest));
            self.reordered.fetch_add(1, Ordering::Relaxed);
            log::trace!("[sim] hold #{n}");
            if let Some((held, held_dest)) = previous {
                self.inner.send_to(&held, held_dest).await?;
            }
            return Ok(());
        }

        self.inner.send_to(&packet, dest).await?;
        if fate.duplicate {
            self.duplicated.fetch_add(1, Ordering::Relaxed);
            self.inner.send_to(&packet, dest).await?;
        }
        if let Some((held, held_dest)) = self.take_held() {
            self.inner.send_to(&held, held_dest).await?;
        }
        Ok(())
    }

    async fn recv_from(
        &self,
        wait: Option<Duration>,
    ) -> Result<(Packet, SocketAddr), SocketError> {
        self.inner.recv_from(wait).await
    }
}
