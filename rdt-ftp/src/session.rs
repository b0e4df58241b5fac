//! Async sessions: one per role, each driving its state machine over a
//! [`Transport`].
//!
//! ```text
//!  SenderSession                                   ReceiverSession
//!    ChunkSource ─▶ Sender ──SYN/DATA/FIN──▶ Receiver ─▶ ChunkSink
//!                     ▲                          │
//!                     └────────ACK / FIN-ACK─────┘
//! ```
//!
//! The sessions own every `.await`: they load packets, put them on the wire,
//! wait with a timeout and feed the outcome back into the synchronous
//! transition functions in [`crate::sender`] and [`crate::receiver`].

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::Config;
use crate::error::TransferError;
use crate::packet::{Packet, MAX_PAYLOAD};
use crate::receiver::{Action, Receiver};
use crate::sender::{Event, Sender, Transition};
use crate::socket::{Socket, SocketError, Transport};
use crate::state::{ReceiverPhase, SenderPhase};
use crate::stream::{safe_file_name, ChunkSink, ChunkSource, FileSink, ReaderSource};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Summary of a completed send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub file_name: String,
    pub peer: SocketAddr,
    pub bytes: u64,
    pub data_packets: u32,
    pub transmissions: u32,
    pub retransmissions: u32,
    pub elapsed: Duration,
}

/// Summary of a completed receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveReport {
    pub file_name: String,
    pub bytes: u64,
    /// Data and FIN packets accepted in order.
    pub accepted: u32,
    /// Corrupted, duplicated or out-of-order packets from the peer.
    pub rejected: u32,
    pub elapsed: Duration,
}

/// Check a destination name before any packet is sent.
///
/// The receiver would reject anything this refuses, so failing early saves a
/// full retry budget of SYNs.
pub fn validate_file_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() || name.len() > MAX_PAYLOAD || safe_file_name(name).is_none() {
        return Err(TransferError::InvalidFileName(name.to_owned()));
    }
    Ok(())
}

fn kind(packet: &Packet) -> &'static str {
    if packet.is_syn() {
        "SYN"
    } else if packet.is_fin() {
        "FIN"
    } else {
        "DATA"
    }
}

// ---------------------------------------------------------------------------
// SenderSession
// ---------------------------------------------------------------------------

/// Sends one stream to one peer, stop-and-wait.
pub struct SenderSession<T, S> {
    transport: T,
    peer: SocketAddr,
    source: S,
    sender: Sender,
}

impl<T, S> SenderSession<T, S>
where
    T: Transport + Send + Sync,
    S: ChunkSource + Send,
{
    /// Fails with [`TransferError::InvalidFileName`] if `file_name` cannot
    /// be carried by a SYN or would be refused by the receiver.
    pub fn new(
        transport: T,
        peer: SocketAddr,
        file_name: impl Into<String>,
        source: S,
        config: Config,
    ) -> Result<Self, TransferError> {
        let file_name = file_name.into();
        validate_file_name(&file_name)?;
        Ok(Self {
            transport,
            peer,
            source,
            sender: Sender::new(file_name, &config),
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run the transfer to completion.
    pub async fn run(&mut self) -> Result<SendReport, TransferError> {
        let started = Instant::now();
        log::info!(
            "[snd] sending {:?} to {}",
            self.sender.file_name(),
            self.peer
        );

        while self.sender.phase != SenderPhase::Done {
            if self.sender.in_flight().is_none() {
                self.load_next().await?;
            }
            self.transmit().await?;

            let event = self.wait_for_reply().await?;
            match self.sender.on_event(event) {
                Transition::Advanced => {
                    log::debug!("[snd] ← ACK ack={}", self.sender.next_seq);
                }
                Transition::Retransmit => {
                    log::debug!(
                        "[snd] no valid reply in {} phase (failure {})",
                        self.sender.phase,
                        self.sender.failures()
                    );
                }
                Transition::Exhausted => {
                    let phase = self.sender.phase.as_str();
                    let attempts = self.sender.failures();
                    log::warn!("[snd] giving up in {phase} phase after {attempts} failed attempts");
                    return Err(TransferError::RetriesExhausted { phase, attempts });
                }
            }
        }

        let stats = self.sender.stats();
        let report = SendReport {
            file_name: self.sender.file_name().to_owned(),
            peer: self.peer,
            bytes: stats.bytes,
            data_packets: stats.data_packets,
            transmissions: stats.transmissions,
            retransmissions: stats.retransmissions,
            elapsed: started.elapsed(),
        };
        log::info!(
            "[snd] done: {} bytes in {} packets ({} retransmissions)",
            report.bytes,
            report.data_packets,
            report.retransmissions
        );
        Ok(report)
    }

    async fn load_next(&mut self) -> Result<(), TransferError> {
        match self.sender.phase {
            SenderPhase::Handshake => {
                self.sender.load_syn()?;
            }
            SenderPhase::Transfer => match self.source.next_chunk(MAX_PAYLOAD).await? {
                Some(chunk) => {
                    self.sender.load_chunk(&chunk)?;
                }
                None => {
                    self.sender.load_fin();
                }
            },
            SenderPhase::Teardown | SenderPhase::Done => {}
        }
        Ok(())
    }

    async fn transmit(&mut self) -> Result<(), TransferError> {
        let Some(entry) = self.sender.in_flight() else {
            return Ok(());
        };
        log::debug!(
            "[snd] → {} seq={} len={}{}",
            kind(&entry.packet),
            entry.packet.seq(),
            entry.packet.payload_len(),
            if entry.tx_count > 0 { " (retransmit)" } else { "" }
        );
        match self.transport.send_to(&entry.packet, self.peer).await {
            Ok(()) => self.sender.on_transmit(),
            // The wait that follows will time out and count the attempt.
            Err(e) if e.is_transient() => log::debug!("[snd] send failed: {e}"),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Wait until a packet from the peer arrives or the timer expires.
    async fn wait_for_reply(&mut self) -> Result<Event, TransferError> {
        self.sender.timer.arm();
        loop {
            let remaining = self.sender.timer.remaining();
            if remaining.is_zero() {
                return Ok(Event::TimedOut);
            }
            match self.transport.recv_from(Some(remaining)).await {
                Ok((packet, from)) if from == self.peer => return Ok(Event::Reply(packet)),
                Ok((_, from)) => log::trace!("[snd] ignoring packet from {from}"),
                Err(e) if e.is_transient() => {
                    if !matches!(e, SocketError::Timeout) {
                        log::debug!("[snd] receive failed: {e}");
                    }
                    return Ok(Event::TimedOut);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ReceiverSession
// ---------------------------------------------------------------------------

/// Receives one stream from the first peer that talks to it.
pub struct ReceiverSession<T, K> {
    transport: T,
    sink: K,
    receiver: Receiver,
    config: Config,
}

impl<T, K> ReceiverSession<T, K>
where
    T: Transport + Send + Sync,
    K: ChunkSink + Send,
{
    pub fn new(transport: T, sink: K, config: Config) -> Self {
        Self {
            transport,
            sink,
            receiver: Receiver::new(&config),
            config,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run the transfer to completion, then linger for late FINs.
    ///
    /// On failure the sink is aborted, so a partial file never survives.
    pub async fn run(&mut self) -> Result<ReceiveReport, TransferError> {
        let started = Instant::now();

        if let Err(e) = self.drive().await {
            log::warn!("[rcv] transfer aborted: {e}");
            self.sink.abort().await;
            return Err(e);
        }
        let elapsed = started.elapsed();

        let stats = self.receiver.stats();
        let report = ReceiveReport {
            file_name: self.receiver.file_name().unwrap_or_default().to_owned(),
            bytes: stats.bytes,
            accepted: stats.accepted,
            rejected: stats.rejected,
            elapsed,
        };
        log::info!(
            "[rcv] received {:?}: {} bytes ({} rejected packets)",
            report.file_name,
            report.bytes,
            report.rejected
        );

        self.linger().await;
        Ok(report)
    }

    async fn drive(&mut self) -> Result<(), TransferError> {
        while self.receiver.phase != ReceiverPhase::Closed {
            // Until the SYN arrives there is no one to nudge.
            let wait = match self.receiver.phase {
                ReceiverPhase::Receiving => Some(self.config.timeout),
                _ => None,
            };
            match self.transport.recv_from(wait).await {
                Ok((packet, from)) => {
                    let action = self.receiver.on_packet(&packet, from)?;
                    self.apply(action).await?;
                }
                Err(SocketError::Timeout) => {
                    if let Some(ack) = self.receiver.on_timeout()? {
                        log::debug!("[rcv] quiet peer; → ACK ack={} (resend)", ack.ack_no());
                        self.reply(&ack).await?;
                    }
                }
                Err(e) if e.is_transient() => log::debug!("[rcv] dropping datagram: {e}"),
                Err(e) => return Err(e.into()),
            }
        }
        self.sink.finish().await?;
        Ok(())
    }

    async fn apply(&mut self, action: Action) -> Result<(), TransferError> {
        match action {
            Action::Ignore => {
                log::trace!("[rcv] ignoring packet in {} phase", self.receiver.phase);
            }
            Action::Open { file_name, ack } => {
                self.sink.open(&file_name).await?;
                log::info!("[rcv] ← SYN {file_name:?}; → ACK ack={}", ack.ack_no());
                self.reply(&ack).await?;
            }
            Action::Deliver { payload, ack } => {
                self.sink.write_chunk(&payload).await?;
                log::debug!("[rcv] ← DATA len={}; → ACK ack={}", payload.len(), ack.ack_no());
                self.reply(&ack).await?;
            }
            Action::Reack(ack) => {
                log::debug!("[rcv] rejected packet; → ACK ack={} (resend)", ack.ack_no());
                self.reply(&ack).await?;
            }
            Action::Finish { payload, ack } => {
                if !payload.is_empty() {
                    self.sink.write_chunk(&payload).await?;
                }
                log::debug!("[rcv] ← FIN; → FIN-ACK ack={}", ack.ack_no());
                self.reply(&ack).await?;
            }
        }
        Ok(())
    }

    async fn reply(&self, packet: &Packet) -> Result<(), TransferError> {
        let Some(peer) = self.receiver.peer() else {
            return Ok(());
        };
        match self.transport.send_to(packet, peer).await {
            Ok(()) => Ok(()),
            // A lost reply is recovered by the sender's retransmission.
            Err(e) if e.is_transient() => {
                log::debug!("[rcv] reply failed: {e}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Keep answering retransmitted FINs until the peer has been quiet for
    /// the configured linger period.
    async fn linger(&mut self) {
        let linger = self.config.linger;
        if linger.is_zero() {
            return;
        }
        let mut deadline = Instant::now() + linger;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.transport.recv_from(Some(remaining)).await {
                Ok((packet, from)) => {
                    if let Ok(Action::Reack(ack)) = self.receiver.on_packet(&packet, from) {
                        log::debug!("[rcv] ← FIN (late); → FIN-ACK ack={}", ack.ack_no());
                        if let Err(e) = self.reply(&ack).await {
                            log::warn!("[rcv] could not answer late FIN: {e}");
                        }
                        deadline = Instant::now() + linger;
                    }
                }
                Err(SocketError::Timeout) => break,
                Err(e) if e.is_transient() => {}
                Err(e) => {
                    log::warn!("[rcv] linger cut short: {e}");
                    break;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience entry points
// ---------------------------------------------------------------------------

/// Send the file at `source` to `peer`, to be stored there as `dest_name`.
pub async fn send_file(
    source: impl AsRef<Path>,
    peer: SocketAddr,
    dest_name: &str,
    config: Config,
) -> Result<SendReport, TransferError> {
    validate_file_name(dest_name)?;
    let source = ReaderSource::open(source).await?;

    let local: SocketAddr = if peer.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = Socket::bind(local).await?;

    SenderSession::new(socket, peer, dest_name, source, config)?
        .run()
        .await
}

/// Receive one file on `listen`, writing it into `output_dir`.
///
/// Bind `[::]:port` to accept IPv6 senders; whether that also accepts IPv4
/// depends on the host's dual-stack setting.
pub async fn receive_file(
    listen: SocketAddr,
    output_dir: impl Into<PathBuf>,
    config: Config,
) -> Result<ReceiveReport, TransferError> {
    let socket = Socket::bind(listen).await?;
    log::info!("[rcv] listening on {}", socket.local_addr);

    ReceiverSession::new(socket, FileSink::new(output_dir), config)
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{Simulator, SimulatorConfig};
    use crate::stream::MemorySink;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::{mpsc, Mutex};

    type Wire = (Packet, SocketAddr);

    /// One end of an in-memory, lossless datagram link.
    struct Pipe {
        addr: SocketAddr,
        tx: mpsc::UnboundedSender<Wire>,
        rx: Mutex<mpsc::UnboundedReceiver<Wire>>,
    }

    fn pipe_pair() -> (Pipe, Pipe) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        let a = Pipe {
            addr: "10.0.0.1:1000".parse().unwrap(),
            tx: a_tx,
            rx: Mutex::new(a_rx),
        };
        let b = Pipe {
            addr: "10.0.0.2:2000".parse().unwrap(),
            tx: b_tx,
            rx: Mutex::new(b_rx),
        };
        (a, b)
    }

    impl Transport for Pipe {
        async fn send_to(&self, packet: &Packet, _dest: SocketAddr) -> Result<(), SocketError> {
            let _ = self.tx.send((packet.clone(), self.addr));
            Ok(())
        }

        async fn recv_from(&self, wait: Option<Duration>) -> Result<Wire, SocketError> {
            let mut rx = self.rx.lock().await;
            let next = match wait {
                Some(wait) => tokio::time::timeout(wait, rx.recv())
                    .await
                    .map_err(|_| SocketError::Timeout)?,
                None => rx.recv().await,
            };
            next.ok_or_else(|| {
                SocketError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            })
        }
    }

    fn config() -> Config {
        Config::default()
            .with_timeout(Duration::from_millis(50))
            .with_max_retries(20)
            .with_linger(Duration::from_millis(300))
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn destination_names_are_checked_up_front() {
        assert!(validate_file_name("report.pdf").is_ok());
        let long = "n".repeat(MAX_PAYLOAD + 1);
        for bad in ["", "a/b", "..", "/etc/passwd", long.as_str()] {
            assert!(
                matches!(validate_file_name(bad), Err(TransferError::InvalidFileName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn clean_link_uses_minimum_transmissions() {
        let (a, b) = pipe_pair();
        let data = sample(2500);
        let peer = b.addr;

        let mut snd =
            SenderSession::new(a, peer, "out.bin", ReaderSource::new(Cursor::new(data.clone())), config())
                .unwrap();
        let mut rcv = ReceiverSession::new(b, MemorySink::new(), config());

        let (sent, received) = tokio::join!(snd.run(), rcv.run());
        let sent = sent.unwrap();
        let received = received.unwrap();

        assert_eq!(sent.bytes, 2500);
        assert_eq!(sent.data_packets, 3);
        assert_eq!(sent.transmissions, 5);
        assert_eq!(sent.retransmissions, 0);

        assert_eq!(received.file_name, "out.bin");
        assert_eq!(received.bytes, 2500);
        assert_eq!(received.accepted, 4);
        assert_eq!(received.rejected, 0);

        let sink = rcv.into_sink();
        assert!(sink.finished);
        assert_eq!(sink.data, data);
    }

    #[tokio::test]
    async fn lost_fin_ack_is_answered_while_lingering() {
        let (a, b) = pipe_pair();
        let peer = b.addr;
        // Replies: SYN-ACK, 2 data ACKs, FIN-ACK; the 4th is dropped.
        let lossy = Simulator::new(
            b,
            SimulatorConfig {
                drop_every: Some(4),
                ..SimulatorConfig::default()
            },
        );

        let data = sample(1500);
        let mut snd =
            SenderSession::new(a, peer, "f", ReaderSource::new(Cursor::new(data.clone())), config())
                .unwrap();
        let mut rcv = ReceiverSession::new(lossy, MemorySink::new(), config());

        let (sent, received) = tokio::join!(snd.run(), rcv.run());
        let sent = sent.unwrap();
        received.unwrap();

        assert_eq!(sent.retransmissions, 1);
        assert_eq!(rcv.transport().stats().dropped, 1);
        assert_eq!(rcv.sink().data, data);
    }

    /// Loses the first FIN it is asked to send and hands its owner a late
    /// copy of the previous ACK in its place.
    struct StaleAckForFin {
        inner: Pipe,
        peer: SocketAddr,
        stale: std::sync::Mutex<Option<Packet>>,
        lost_fin: AtomicBool,
    }

    impl Transport for StaleAckForFin {
        async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
            if packet.is_fin() && !self.lost_fin.swap(true, Ordering::Relaxed) {
                *self.stale.lock().unwrap() = Some(Packet::ack(packet.seq()));
                return Ok(());
            }
            self.inner.send_to(packet, dest).await
        }

        async fn recv_from(&self, wait: Option<Duration>) -> Result<Wire, SocketError> {
            if let Some(ack) = self.stale.lock().unwrap().take() {
                return Ok((ack, self.peer));
            }
            self.inner.recv_from(wait).await
        }
    }

    #[tokio::test]
    async fn stale_ack_cannot_close_the_transfer() {
        let (a, b) = pipe_pair();
        let peer = b.addr;
        let flaky = StaleAckForFin {
            inner: a,
            peer,
            stale: std::sync::Mutex::new(None),
            lost_fin: AtomicBool::new(false),
        };

        let data = sample(1500);
        let mut snd =
            SenderSession::new(flaky, peer, "f", ReaderSource::new(Cursor::new(data.clone())), config())
                .unwrap();
        let mut rcv = ReceiverSession::new(b, MemorySink::new(), config());

        let (sent, received) = tokio::join!(snd.run(), rcv.run());
        let sent = sent.unwrap();
        let received = received.unwrap();

        // SYN, two chunks, the lost FIN and its resend.
        assert!(snd.transport().lost_fin.load(Ordering::Relaxed));
        assert_eq!(sent.transmissions, 5);
        assert_eq!(sent.retransmissions, 1);
        assert_eq!(received.bytes, 1500);
        let sink = rcv.into_sink();
        assert!(sink.finished);
        assert_eq!(sink.data, data);
    }

    #[tokio::test]
    async fn duplicated_syn_ack_is_not_taken_for_fin_ack() {
        let (a, b) = pipe_pair();
        let peer = b.addr;
        // Every reply is sent twice.  With no data, the second SYN-ACK copy
        // carries the number the FIN-ACK will.
        let echoing = Simulator::new(
            b,
            SimulatorConfig {
                duplicate_rate: 1.0,
                ..SimulatorConfig::default()
            },
        );

        let mut snd = SenderSession::new(
            a,
            peer,
            "f",
            ReaderSource::new(Cursor::new(Vec::new())),
            config(),
        )
        .unwrap();
        let mut rcv = ReceiverSession::new(echoing, MemorySink::new(), config());

        let (sent, received) = tokio::join!(snd.run(), rcv.run());
        let sent = sent.unwrap();
        received.unwrap();

        // The stale copy costs one FIN resend and nothing else.
        assert_eq!(sent.retransmissions, 1);
        assert!(rcv.transport().stats().duplicated >= 2);
        assert!(rcv.sink().finished);
        assert!(rcv.sink().data.is_empty());
    }

    /// Refuses its first send, then behaves like the wrapped pipe.
    struct RefusesFirstSend {
        inner: Pipe,
        refused: AtomicBool,
    }

    impl Transport for RefusesFirstSend {
        async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
            if !self.refused.swap(true, Ordering::Relaxed) {
                return Err(SocketError::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                )));
            }
            self.inner.send_to(packet, dest).await
        }

        async fn recv_from(&self, wait: Option<Duration>) -> Result<Wire, SocketError> {
            self.inner.recv_from(wait).await
        }
    }

    #[tokio::test]
    async fn failed_send_is_not_counted() {
        let (a, b) = pipe_pair();
        let peer = b.addr;
        let refusing = RefusesFirstSend {
            inner: a,
            refused: AtomicBool::new(false),
        };

        let data = sample(2500);
        let mut snd = SenderSession::new(
            refusing,
            peer,
            "out.bin",
            ReaderSource::new(Cursor::new(data.clone())),
            config(),
        )
        .unwrap();
        let mut rcv = ReceiverSession::new(b, MemorySink::new(), config());

        let (sent, received) = tokio::join!(snd.run(), rcv.run());
        let sent = sent.unwrap();
        received.unwrap();

        // The refused SYN never left the host: only five datagrams did.
        assert!(snd.transport().refused.load(Ordering::Relaxed));
        assert_eq!(sent.transmissions, 5);
        assert_eq!(sent.retransmissions, 0);
        assert_eq!(rcv.sink().data, data);
    }

    #[tokio::test]
    async fn sender_gives_up_on_a_black_hole() {
        let (a, _b) = pipe_pair();
        let peer = "10.0.0.2:2000".parse().unwrap();
        let hole = Simulator::new(a, SimulatorConfig::black_hole());
        let cfg = config().with_timeout(Duration::from_millis(10)).with_max_retries(3);

        let mut snd =
            SenderSession::new(hole, peer, "f", ReaderSource::new(Cursor::new(vec![1u8; 10])), cfg)
                .unwrap();
        let err = snd.run().await.unwrap_err();

        assert!(matches!(
            err,
            TransferError::RetriesExhausted {
                phase: "handshake",
                attempts: 4
            }
        ));
        assert_eq!(snd.sender().stats().transmissions, 4);
        assert_eq!(snd.sender().phase, SenderPhase::Handshake);
    }

    #[tokio::test]
    async fn receiver_aborts_when_sender_goes_quiet() {
        let (a, b) = pipe_pair();
        let cfg = config().with_timeout(Duration::from_millis(10)).with_max_retries(2);
        let mut rcv = ReceiverSession::new(b, MemorySink::new(), cfg);

        a.send_to(&Packet::syn(0, "half.bin").unwrap(), rcv.transport().addr)
            .await
            .unwrap();
        a.send_to(&Packet::data(8, b"partial").unwrap(), rcv.transport().addr)
            .await
            .unwrap();

        let err = rcv.run().await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::RetriesExhausted {
                phase: "receiving",
                attempts: 3
            }
        ));
        // Aborted sinks drop what they had.
        assert!(rcv.sink().data.is_empty());
        assert!(!rcv.sink().finished);
    }

    #[tokio::test]
    async fn unsafe_name_in_syn_aborts_receive() {
        let (a, b) = pipe_pair();
        let mut rcv = ReceiverSession::new(b, MemorySink::new(), config());

        a.send_to(&Packet::syn(0, "../escape").unwrap(), rcv.transport().addr)
            .await
            .unwrap();

        let err = rcv.run().await.unwrap_err();
        assert!(matches!(err, TransferError::InvalidFileName(_)));
        assert!(rcv.sink().file_name.is_none());
    }
}
