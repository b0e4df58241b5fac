//! Byte-stream adapters between the protocol sessions and local storage.
//!
//! The sender pulls chunks from a [`ChunkSource`]; the receiver pushes
//! accepted payloads, strictly in order, into a [`ChunkSink`].  The sessions
//! never touch files directly.

use std::future::Future;
use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter};

/// Outbound byte stream: "give me the next chunk to send".
pub trait ChunkSource {
    /// Read up to `max` bytes.  `Ok(None)` means the stream is exhausted.
    fn next_chunk(&mut self, max: usize)
        -> impl Future<Output = io::Result<Option<Vec<u8>>>> + Send;
}

/// Inbound byte stream: "consume this chunk, in order".
pub trait ChunkSink {
    /// Create (or truncate) the destination named by the peer.
    fn open(&mut self, file_name: &str) -> impl Future<Output = io::Result<()>> + Send;

    /// Append one accepted payload.
    fn write_chunk(&mut self, chunk: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Flush and release the destination after a complete transfer.
    fn finish(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Discard the destination after an aborted transfer.
    fn abort(&mut self) -> impl Future<Output = ()> + Send;
}

// ---------------------------------------------------------------------------
// ReaderSource
// ---------------------------------------------------------------------------

/// Adapter that turns any async reader into a chunk source.
///
/// Each chunk is filled completely unless the reader hits end-of-stream, so
/// a file is always cut into maximum-size chunks plus one shorter tail.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl ReaderSource<File> {
    /// Open `path` for reading.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(File::open(path).await?))
    }
}

impl<R: AsyncRead + Unpin + Send> ChunkSource for ReaderSource<R> {
    async fn next_chunk(&mut self, max: usize) -> io::Result<Option<Vec<u8>>> {
        let mut chunk = vec![0u8; max];
        let mut filled = 0;
        while filled < max {
            let n = self.reader.read(&mut chunk[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        chunk.truncate(filled);
        Ok(Some(chunk))
    }
}

// ---------------------------------------------------------------------------
// FileSink
// ---------------------------------------------------------------------------

/// Writes the received stream to a file inside `dir`.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            path: None,
            writer: None,
        }
    }

    /// Path of the destination once opened.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "sink is not open"))
    }
}

impl ChunkSink for FileSink {
    async fn open(&mut self, file_name: &str) -> io::Result<()> {
        let name = safe_file_name(file_name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsafe destination name {file_name:?}"),
            )
        })?;
        let path = self.dir.join(name);
        let file = File::create(&path).await?;
        self.writer = Some(BufWriter::new(file));
        self.path = Some(path);
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.writer()?.write_all(chunk).await
    }

    async fn finish(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            writer.into_inner().sync_all().await?;
        }
        Ok(())
    }

    async fn abort(&mut self) {
        self.writer = None;
        if let Some(path) = self.path.take() {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                log::warn!("could not remove partial file {}: {e}", path.display());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Collects the received stream in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub file_name: Option<String>,
    pub data: Vec<u8>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkSink for MemorySink {
    async fn open(&mut self, file_name: &str) -> io::Result<()> {
        self.file_name = Some(file_name.to_owned());
        self.data.clear();
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }

    async fn abort(&mut self) {
        self.data.clear();
    }
}

/// Accept `name` only if it is a single, plain file-name component.
pub fn safe_file_name(name: &str) -> Option<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Some(name),
        _ => None,
    }
}
