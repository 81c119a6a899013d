//! Blocking byte sources read on a dedicated OS thread.
//!
//! Serial device nodes and stdin have no readiness notification in tokio, so
//! `tokio::fs::File` and `tokio::io::stdin` park each read on the blocking
//! pool. A parked read outlives cancellation, and the runtime waits for it on
//! shutdown: a silent glove would keep the process alive after Ctrl+C.
//!
//! [`ThreadedReader`] instead runs the blocking `read` loop on its own thread
//! and forwards chunks over a bounded channel. Dropping the reader (or the
//! runtime) never waits for that thread; it exits on its next read or with
//! the process.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Bytes per blocking read.
const READ_CHUNK_BYTES: usize = 4_096;

/// Chunks buffered between the reader thread and the ingestion task.
const CHANNEL_CHUNKS: usize = 16;

type Chunk = io::Result<Vec<u8>>;

/// Async buffered reader fed by a blocking reader thread.
#[derive(Debug)]
pub struct ThreadedReader {
    rx: mpsc::Receiver<Chunk>,
    chunk: Vec<u8>,
    pos: usize,
}

impl ThreadedReader {
    /// Read `source` on a new thread named `link-<name>`.
    pub fn spawn<R>(name: &str, source: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CHUNKS);
        std::thread::Builder::new()
            .name(format!("link-{name}"))
            .spawn(move || pump(source, tx))?;
        Ok(Self::from_channel(rx))
    }

    /// Open `path` and read it on a new thread.
    ///
    /// The open itself also happens on that thread, so a device that blocks
    /// in `open` (a FIFO with no writer) cannot stall the runtime either.
    /// Returns the reader and whether the path is a regular file.
    pub async fn open(path: PathBuf) -> io::Result<(Self, bool)> {
        let (tx, rx) = mpsc::channel(CHANNEL_CHUNKS);
        let (opened_tx, opened_rx) = oneshot::channel();
        let thread_name = format!("link-{}", path.display());

        std::thread::Builder::new().name(thread_name).spawn(move || {
            let opened = File::open(&path)
                .and_then(|file| file.metadata().map(|meta| (file, meta.is_file())));
            match opened {
                Ok((file, regular)) => {
                    if opened_tx.send(Ok(regular)).is_ok() {
                        pump(file, tx);
                    }
                }
                Err(e) => {
                    let _ = opened_tx.send(Err(e));
                }
            }
        })?;

        let regular = opened_rx
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "link reader thread exited during open"))??;
        Ok((Self::from_channel(rx), regular))
    }

    fn from_channel(rx: mpsc::Receiver<Chunk>) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
        }
    }
}

/// Blocking read loop. Ends on EOF, on a read error (forwarded), or once the
/// async side has gone away.
fn pump<R: Read>(mut source: R, tx: mpsc::Sender<Chunk>) {
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.blocking_send(Ok(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
    debug!("Link reader thread finished");
}

impl AsyncBufRead for ThreadedReader {
    fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        let this = self.get_mut();
        while this.pos >= this.chunk.len() {
            match ready!(this.rx.poll_recv(cx)) {
                Some(Ok(chunk)) => {
                    this.chunk = chunk;
                    this.pos = 0;
                }
                Some(Err(e)) => return Poll::Ready(Err(e)),
                // Sender dropped: EOF
                None => return Poll::Ready(Ok(&[])),
            }
        }
        Poll::Ready(Ok(&this.chunk[this.pos..]))
    }

    fn consume(self: Pin<&mut Self>, amt: usize) {
        let this = self.get_mut();
        this.pos = (this.pos + amt).min(this.chunk.len());
    }
}

impl AsyncRead for ThreadedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let n = {
            let available = ready!(Pin::new(&mut *this).poll_fill_buf(cx))?;
            let n = available.len().min(buf.remaining());
            buf.put_slice(&available[..n]);
            n
        };
        Pin::new(this).consume(n);
        Poll::Ready(Ok(()))
    }
}
