//! Sensor Link
//!
//! Line-oriented reader over whatever byte stream carries the glove frames:
//! a serial character device, a TCP serial bridge, or stdin for replays.
//!
//! Reads are bounded by a timeout so the ingestion loop can observe shutdown
//! between lines. Bytes received before a timeout are kept, and the line is
//! completed on the next call.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::frame_parser::decode_line;
use super::threaded::ThreadedReader;
use crate::config::defaults::{LINK_CONNECT_TIMEOUT_SECS, MAX_LINE_BYTES};
use crate::config::LinkConfig;

/// Sensor link errors
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Invalid link address: {0}")]
    InvalidAddress(String),

    #[error("Failed to open {endpoint}: {source}")]
    Open {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("Link read error: {0}")]
    Read(#[from] std::io::Error),
}

/// Outcome of one bounded read.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// A complete line (terminator stripped, invalid UTF-8 replaced).
    Line(String),
    /// The read timeout elapsed without a complete line.
    Idle,
    /// The stream ended.
    Closed,
}

/// Anything that yields glove lines one at a time.
///
/// The ingestion loop races [`next_line`](LineSource::next_line) against the
/// shutdown token, so implementations must tolerate being dropped mid-read.
#[async_trait]
pub trait LineSource: Send {
    /// Read the next line, waiting at most the configured read timeout.
    async fn next_line(&mut self) -> Result<LinkEvent, LinkError>;

    /// Human-readable name for logging (e.g. "stdin", "tcp://bridge:4000").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Endpoint
// ============================================================================

/// Where the glove stream comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEndpoint {
    Stdin,
    Tcp { host: String, port: u16 },
    Device(PathBuf),
}

impl LinkEndpoint {
    /// Parse a link address: `-`/`stdin`, `tcp://HOST:PORT`, or a path.
    pub fn parse(address: &str) -> Result<Self, LinkError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(LinkError::InvalidAddress("empty address".to_string()));
        }
        if address == "-" || address.eq_ignore_ascii_case("stdin") {
            return Ok(Self::Stdin);
        }
        if let Some(rest) = address.strip_prefix("tcp://") {
            let (host, port) = rest.rsplit_once(':').ok_or_else(|| {
                LinkError::InvalidAddress(format!("{address} (expected tcp://HOST:PORT)"))
            })?;
            if host.is_empty() {
                return Err(LinkError::InvalidAddress(format!("{address} (missing host)")));
            }
            let port = port
                .parse::<u16>()
                .map_err(|_| LinkError::InvalidAddress(format!("{address} (invalid port)")))?;
            return Ok(Self::Tcp {
                host: host.to_string(),
                port,
            });
        }
        Ok(Self::Device(PathBuf::from(address)))
    }
}

impl std::fmt::Display for LinkEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdin => write!(f, "stdin"),
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Self::Device(path) => write!(f, "{}", path.display()),
        }
    }
}

// ============================================================================
// Line Reader
// ============================================================================

/// Boxed byte stream behind an opened link.
pub type LinkStream = Box<dyn AsyncBufRead + Unpin + Send>;

/// Bounded-wait line reader over any buffered byte stream.
pub struct LineReader<R> {
    reader: R,
    name: String,
    read_timeout: Duration,
    /// Bytes of the line currently being assembled
    pending: Vec<u8>,
    /// Set while skipping the remainder of an oversized or partial line
    discarding: bool,
    /// Lines dropped for exceeding the length guard
    oversized_lines: u64,
}

impl<R: AsyncBufRead + Unpin + Send> LineReader<R> {
    pub fn new(reader: R, name: impl Into<String>, read_timeout: Duration) -> Self {
        Self {
            reader,
            name: name.into(),
            read_timeout,
            pending: Vec::with_capacity(128),
            discarding: false,
            oversized_lines: 0,
        }
    }

    /// Number of lines dropped by the length guard.
    pub fn oversized_lines(&self) -> u64 {
        self.oversized_lines
    }

    /// Discard everything that arrives within `period`.
    ///
    /// The glove resets when the port opens and prints a boot banner and
    /// half-written frames. If the settle window ends mid-line, the rest of
    /// that line is dropped as well.
    pub async fn settle(&mut self, period: Duration) -> Result<(), LinkError> {
        if period.is_zero() {
            return Ok(());
        }
        let deadline = Instant::now() + period;
        let mut discarded = 0usize;
        let mut ended_on_newline = true;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let used = match tokio::time::timeout(remaining, self.reader.fill_buf()).await {
                Err(_) => break,
                Ok(Err(e)) => return Err(LinkError::Read(e)),
                Ok(Ok(available)) => {
                    if available.is_empty() {
                        break;
                    }
                    ended_on_newline = available.last() == Some(&b'\n');
                    available.len()
                }
            };
            discarded += used;
            self.reader.consume(used);
        }

        self.pending.clear();
        self.discarding = discarded > 0 && !ended_on_newline;
        debug!(link = %self.name, discarded_bytes = discarded, "Link settled");
        Ok(())
    }

    fn take_line(&mut self) -> String {
        let line = decode_line(&self.pending).trim_end_matches('\r').to_string();
        self.pending.clear();
        line
    }

    async fn read_line_bounded(&mut self) -> Result<LinkEvent, LinkError> {
        loop {
            let (line_complete, used) =
                match tokio::time::timeout(self.read_timeout, self.reader.fill_buf()).await {
                    Err(_) => return Ok(LinkEvent::Idle),
                    Ok(Err(e)) => return Err(LinkError::Read(e)),
                    Ok(Ok(available)) => {
                        if available.is_empty() {
                            // EOF: flush a final unterminated line, then report closure.
                            if self.pending.is_empty() || self.discarding {
                                self.pending.clear();
                                self.discarding = false;
                                return Ok(LinkEvent::Closed);
                            }
                            return Ok(LinkEvent::Line(self.take_line()));
                        }
                        let (chunk, complete) = match available.iter().position(|b| *b == b'\n') {
                            Some(i) => (&available[..i], true),
                            None => (available, false),
                        };
                        let used = if complete { chunk.len() + 1 } else { chunk.len() };

                        if !self.discarding {
                            if self.pending.len() + chunk.len() > MAX_LINE_BYTES {
                                self.pending.clear();
                                self.discarding = true;
                                self.oversized_lines += 1;
                                warn!(link = %self.name, limit = MAX_LINE_BYTES, "Oversized line dropped");
                            } else {
                                self.pending.extend_from_slice(chunk);
                            }
                        }
                        (complete, used)
                    }
                };
            self.reader.consume(used);

            if line_complete {
                if self.discarding {
                    self.discarding = false;
                    self.pending.clear();
                    continue;
                }
                return Ok(LinkEvent::Line(self.take_line()));
            }
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LineSource for LineReader<R> {
    async fn next_line(&mut self) -> Result<LinkEvent, LinkError> {
        self.read_line_bounded().await
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Opening
// ============================================================================

/// Open the configured link and let it settle.
pub async fn open_link(config: &LinkConfig) -> Result<LineReader<LinkStream>, LinkError> {
    let endpoint = LinkEndpoint::parse(&config.address)?;
    let read_timeout = Duration::from_millis(config.read_timeout_ms);
    let name = endpoint.to_string();

    info!(link = %name, baud_rate = config.baud_rate, "Opening sensor link");

    // Replays (stdin, recorded captures) have no boot noise to skip.
    // Stdin and device nodes are read on their own thread so a silent glove
    // never holds up runtime shutdown.
    let open_err = |source: std::io::Error| LinkError::Open {
        endpoint: name.clone(),
        source,
    };
    let (stream, live): (LinkStream, bool) = match &endpoint {
        LinkEndpoint::Stdin => {
            let reader = ThreadedReader::spawn("stdin", std::io::stdin()).map_err(open_err)?;
            (Box::new(reader), false)
        }
        LinkEndpoint::Tcp { host, port } => {
            (Box::new(BufReader::new(connect_tcp(host, *port).await?)), true)
        }
        LinkEndpoint::Device(path) => {
            let (reader, regular) = ThreadedReader::open(path.clone()).await.map_err(open_err)?;
            if regular {
                debug!(path = %path.display(), "Link is a regular file, skipping settle");
            }
            (Box::new(reader), !regular)
        }
    };

    let mut reader = LineReader::new(stream, name, read_timeout);
    if live {
        reader.settle(Duration::from_millis(config.settle_ms)).await?;
    }
    info!(link = %reader.source_name(), "Sensor link ready");
    Ok(reader)
}

async fn connect_tcp(host: &str, port: u16) -> Result<TcpStream, LinkError> {
    let addr = format!("{host}:{port}");
    let connect_timeout = Duration::from_secs(LINK_CONNECT_TIMEOUT_SECS);
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| LinkError::ConnectTimeout(addr.clone()))?
        .map_err(|source| LinkError::Open {
            endpoint: format!("tcp://{addr}"),
            source,
        })?;

    // Keepalive so a dead bridge surfaces as a read error instead of silence
    let sock_ref = socket2::SockRef::from(&stream);
    let keepalive = socket2::TcpKeepalive::new()
        .with_time(Duration::from_secs(30))
        .with_interval(Duration::from_secs(10));
    if let Err(e) = sock_ref.set_tcp_keepalive(&keepalive) {
        warn!(address = %addr, error = %e, "Failed to enable TCP keepalive");
    }
    if let Err(e) = stream.set_nodelay(true) {
        warn!(address = %addr, error = %e, "Failed to disable Nagle on link socket");
    }
    Ok(stream)
}
