//! Dispatch Queue - hands gesture events to the slow output side
//!
//! Speech synthesis takes hundreds of milliseconds per word, far longer than
//! the gap between glove frames. The ingestion loop therefore never calls the
//! sink itself: it enqueues labels on a bounded channel and a single worker
//! task feeds them to the sink one at a time, in order.
//!
//! ## Shutdown
//!
//! - [`DispatchHandle::close`] (explicit close signal): the worker finishes
//!   the item in flight and abandons whatever is still queued.
//! - Dropping every [`DispatchHandle`]: the worker drains the queue, then exits.

pub mod sinks;

pub use sinks::{build_sink, CommandSink, LogSink};

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::types::Label;

// ============================================================================
// Errors
// ============================================================================

/// Output sink failures. Always recoverable: the worker logs and moves on.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink failed: {0}")]
    Failed(String),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Dispatch queue errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatch queue is closed")]
    Closed,

    #[error("Dispatch worker panicked: {0}")]
    WorkerPanicked(String),
}

// ============================================================================
// Output Sink
// ============================================================================

/// Something that turns a gesture label into an external effect.
///
/// Calls may be slow; the dispatch worker awaits each one before taking the
/// next label.
#[async_trait]
pub trait OutputSink: Send {
    async fn emit(&mut self, label: &Label) -> Result<(), SinkError>;

    /// Sink name for logging
    fn name(&self) -> &str;
}

#[async_trait]
impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    async fn emit(&mut self, label: &Label) -> Result<(), SinkError> {
        (**self).emit(label).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ============================================================================
// Queue
// ============================================================================

/// Worker counters, returned when the worker is joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Sink calls that succeeded
    pub delivered: u64,
    /// Sink calls that returned an error
    pub failed: u64,
    /// Sink calls cut off by the sink timeout
    pub timed_out: u64,
    /// Labels still queued when the close signal arrived
    pub abandoned: u64,
}

/// Producer side of the dispatch queue.
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<Label>,
    close: CancellationToken,
}

impl DispatchHandle {
    /// Hand a label to the worker.
    ///
    /// Returns immediately while the buffer has room. A full buffer means
    /// the sink has fallen far behind; the producer then waits for space
    /// rather than losing the event.
    pub async fn enqueue(&self, label: Label) -> Result<(), DispatchError> {
        if self.close.is_cancelled() {
            return Err(DispatchError::Closed);
        }
        match self.tx.try_send(label) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DispatchError::Closed),
            Err(mpsc::error::TrySendError::Full(label)) => {
                warn!(
                    capacity = self.tx.max_capacity(),
                    label = %label,
                    "Dispatch queue full - waiting for the output sink"
                );
                self.tx.send(label).await.map_err(|_| DispatchError::Closed)
            }
        }
    }

    /// Signal the worker to stop after the item in flight.
    pub fn close(&self) {
        self.close.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_cancelled() || self.tx.is_closed()
    }

    /// Labels waiting to be delivered.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Running dispatch worker.
pub struct DispatchWorker {
    handle: JoinHandle<DispatchStats>,
    close: CancellationToken,
}

impl DispatchWorker {
    /// Send the close signal without waiting.
    pub fn close(&self) {
        self.close.cancel();
    }

    /// Wait for the worker to exit.
    pub async fn join(self) -> Result<DispatchStats, DispatchError> {
        self.handle
            .await
            .map_err(|e| DispatchError::WorkerPanicked(e.to_string()))
    }

    /// Close and wait: finish the item in flight, abandon the rest.
    pub async fn shutdown(self) -> Result<DispatchStats, DispatchError> {
        self.close();
        self.join().await
    }

    /// Wait for the worker to drain the queue, switching to a close if
    /// `interrupt` fires first.
    ///
    /// Every [`DispatchHandle`] must be dropped beforehand, otherwise the
    /// worker keeps waiting for labels until interrupted.
    pub async fn drain(self, interrupt: &CancellationToken) -> Result<DispatchStats, DispatchError> {
        let mut handle = self.handle;
        let joined = tokio::select! {
            joined = &mut handle => joined,
            _ = interrupt.cancelled() => {
                info!("Interrupted while draining the dispatch queue");
                self.close.cancel();
                handle.await
            }
        };
        joined.map_err(|e| DispatchError::WorkerPanicked(e.to_string()))
    }
}

/// Spawn the dispatch worker on the current runtime.
///
/// `capacity` is clamped to at least 1. `sink_timeout` of `None` lets sink
/// calls run as long as they need.
pub fn spawn_dispatch<S>(
    sink: S,
    capacity: usize,
    sink_timeout: Option<Duration>,
) -> (DispatchHandle, DispatchWorker)
where
    S: OutputSink + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let close = CancellationToken::new();

    let handle = tokio::spawn(run_worker(sink, rx, close.clone(), sink_timeout));

    (
        DispatchHandle {
            tx,
            close: close.clone(),
        },
        DispatchWorker { handle, close },
    )
}

async fn run_worker<S: OutputSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Label>,
    close: CancellationToken,
    sink_timeout: Option<Duration>,
) -> DispatchStats {
    let mut stats = DispatchStats::default();
    info!(sink = %sink.name(), "Dispatch worker started");

    loop {
        let label = tokio::select! {
            biased;
            _ = close.cancelled() => break,
            next = rx.recv() => match next {
                Some(label) => label,
                None => break,
            },
        };

        // The close signal is not observed here: the item in flight always completes.
        let outcome = match sink_timeout {
            Some(limit) => tokio::time::timeout(limit, sink.emit(&label)).await,
            None => Ok(sink.emit(&label).await),
        };
        match outcome {
            Ok(Ok(())) => {
                stats.delivered += 1;
                debug!(label = %label, sink = %sink.name(), "Gesture delivered");
            }
            Ok(Err(e)) => {
                stats.failed += 1;
                warn!(label = %label, sink = %sink.name(), error = %e, "Output sink failed");
            }
            Err(_) => {
                stats.timed_out += 1;
                warn!(label = %label, sink = %sink.name(), "Output sink timed out");
            }
        }
    }

    rx.close();
    while rx.try_recv().is_ok() {
        stats.abandoned += 1;
    }

    info!(
        delivered = stats.delivered,
        failed = stats.failed,
        timed_out = stats.timed_out,
        abandoned = stats.abandoned,
        "Dispatch worker stopped"
    );
    stats
}
