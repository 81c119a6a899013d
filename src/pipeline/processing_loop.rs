//! Ingestion loop: line -> frame -> label -> smoothed label -> trigger.
//!
//! One [`Interpreter`] owns the vote window and trigger state and runs every
//! stage synchronously in arrival order. Its only contact with the slow
//! output side is [`DispatchHandle::enqueue`].

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{TriggerGate, VoteSmoother};
use crate::acquisition::{parse_frame, FrameError, LineSource, LinkError, LinkEvent};
use crate::classifier::{Classifier, ClassifierAdapter};
use crate::config::defaults::STATS_LOG_INTERVAL_LINES;
use crate::config::SmoothingConfig;
use crate::dispatch::{DispatchError, DispatchHandle};
use crate::types::Detection;

// ============================================================================
// Errors & Statistics
// ============================================================================

/// Conditions that end ingestion early.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("Sensor link {0} closed")]
    LinkClosed(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Per-run ingestion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Complete lines read from the link
    pub lines: u64,
    /// Lines that parsed into a feature vector
    pub frames: u64,
    pub empty: u64,
    pub schema_mismatches: u64,
    pub malformed_values: u64,
    pub classifier_failures: u64,
    /// Labels that cleared the trigger gate
    pub detections: u64,
    /// Reads that timed out without a complete line
    pub idle_reads: u64,
}

impl IngestStats {
    fn record_rejection(&mut self, err: &FrameError) {
        match err {
            FrameError::Empty => self.empty += 1,
            FrameError::SchemaMismatch { .. } => self.schema_mismatches += 1,
            FrameError::MalformedValue { .. } => self.malformed_values += 1,
        }
    }

    /// Lines rejected by the frame parser.
    pub fn rejected(&self) -> u64 {
        self.empty + self.schema_mismatches + self.malformed_values
    }
}

// ============================================================================
// Interpreter
// ============================================================================

/// Owns the per-frame state of the gesture pipeline.
///
/// Built with [`new()`](Interpreter::new) or
/// [`from_config()`](Interpreter::from_config), driven line by line with
/// [`process_line()`](Interpreter::process_line), or consumed by
/// [`run()`](Interpreter::run) against a live link.
pub struct Interpreter<C> {
    adapter: ClassifierAdapter<C>,
    smoother: VoteSmoother,
    gate: TriggerGate,
    cancel_token: CancellationToken,
    stats: IngestStats,
    sequence: u64,
}

impl<C: Classifier> Interpreter<C> {
    pub fn new(
        adapter: ClassifierAdapter<C>,
        smoother: VoteSmoother,
        gate: TriggerGate,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            adapter,
            smoother,
            gate,
            cancel_token,
            stats: IngestStats::default(),
            sequence: 0,
        }
    }

    pub fn from_config(
        adapter: ClassifierAdapter<C>,
        smoothing: &SmoothingConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Self::new(
            adapter,
            VoteSmoother::new(smoothing.vote_window),
            TriggerGate::new(smoothing.cooldown(), smoothing.gate_mode),
            cancel_token,
        )
    }

    /// Run one line through parse, classify, smooth and gate.
    ///
    /// Rejected frames and classifier failures leave the vote window and the
    /// trigger state untouched. Returns the detection when the gate fires.
    pub fn process_line(&mut self, line: &str, now: Instant) -> Option<Detection> {
        self.stats.lines += 1;

        let vector = match parse_frame(line) {
            Ok(v) => v,
            Err(FrameError::Empty) => {
                self.stats.empty += 1;
                trace!("Skipping empty line");
                return None;
            }
            Err(e) => {
                self.stats.record_rejection(&e);
                debug!(error = %e, line = %line, "Frame rejected");
                return None;
            }
        };
        self.stats.frames += 1;

        let raw = match self.adapter.classify(&vector) {
            Ok(label) => label,
            Err(e) => {
                self.stats.classifier_failures += 1;
                warn!(error = %e, "Classifier failed, frame dropped");
                return None;
            }
        };

        let smoothed = self.smoother.observe(raw.clone());
        trace!(raw = %raw, smoothed = %smoothed, "Frame classified");

        if !self.gate.observe(&smoothed, now) {
            return None;
        }

        self.sequence += 1;
        self.stats.detections += 1;
        Some(Detection {
            label: smoothed,
            sequence: self.sequence,
            at: Utc::now(),
        })
    }

    /// Read lines until the link fails, closes, or the cancel token fires.
    ///
    /// Cancellation is a clean stop and returns the final statistics. The
    /// caller still owns the dispatch worker and is responsible for closing
    /// and joining it in every case.
    pub async fn run<S>(
        mut self,
        source: &mut S,
        dispatch: &DispatchHandle,
    ) -> Result<IngestStats, IngestError>
    where
        S: LineSource + ?Sized,
    {
        info!(
            source = %source.source_name(),
            model = %self.adapter.model_name(),
            vote_window = self.smoother.capacity(),
            cooldown_ms = self.gate.cooldown().as_millis() as u64,
            gate_mode = %self.gate.mode(),
            "🧤 Interpreting glove frames"
        );

        let outcome: Result<(), IngestError> = loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!("[Interpreter] Shutdown signal received");
                    break Ok(());
                }
                result = source.next_line() => result,
            };

            let line = match event {
                Ok(LinkEvent::Line(line)) => line,
                Ok(LinkEvent::Idle) => {
                    self.stats.idle_reads += 1;
                    continue;
                }
                Ok(LinkEvent::Closed) => {
                    break Err(IngestError::LinkClosed(source.source_name().to_string()));
                }
                Err(e) => break Err(IngestError::Link(e)),
            };

            if let Some(detection) = self.process_line(&line, Instant::now()) {
                info!(
                    gesture = %detection.label,
                    sequence = detection.sequence,
                    "✋ Gesture detected"
                );
                let queued = tokio::select! {
                    biased;
                    _ = self.cancel_token.cancelled() => {
                        info!("[Interpreter] Shutdown signal received while queueing");
                        break Ok(());
                    }
                    result = dispatch.enqueue(detection.label) => result,
                };
                if let Err(e) = queued {
                    break Err(IngestError::Dispatch(e));
                }
            }

            if self.stats.lines % STATS_LOG_INTERVAL_LINES == 0 {
                debug!(
                    lines = self.stats.lines,
                    frames = self.stats.frames,
                    rejected = self.stats.rejected(),
                    detections = self.stats.detections,
                    pending = dispatch.pending(),
                    "Ingestion progress"
                );
            }
        };

        let s = &self.stats;
        info!(
            lines = s.lines,
            frames = s.frames,
            empty = s.empty,
            schema_mismatches = s.schema_mismatches,
            malformed_values = s.malformed_values,
            classifier_failures = s.classifier_failures,
            detections = s.detections,
            idle_reads = s.idle_reads,
            "Ingestion stopped"
        );

        outcome.map(|()| self.stats)
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn smoother(&self) -> &VoteSmoother {
        &self.smoother
    }

    pub fn gate(&self) -> &TriggerGate {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierError;
    use crate::dispatch::{spawn_dispatch, LogSink};
    use crate::pipeline::{GateMode, GateState};
    use crate::types::{Label, CHANNEL_NAMES};
    use async_trait::async_trait;
    use std::time::Duration;

    /// flex1 < 1.5 is "A", otherwise "B"; a negative flex1 fails inference.
    struct ThresholdModel {
        names: Vec<String>,
    }

    impl ThresholdModel {
        fn new() -> Self {
            Self {
                names: CHANNEL_NAMES.iter().map(|n| n.to_string()).collect(),
            }
        }
    }

    impl Classifier for ThresholdModel {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, features: &[f64]) -> Result<Label, ClassifierError> {
            match features[0] {
                v if v < 0.0 => Err(ClassifierError::Inference("negative flex".to_string())),
                v if v < 1.5 => Ok(Label::new("A")),
                _ => Ok(Label::new("B")),
            }
        }

        fn name(&self) -> &str {
            "threshold"
        }
    }

    const A: &str = "1,0,0,0,0,0,0,0,0,0,0";
    const B: &str = "2,0,0,0,0,0,0,0,0,0,0";

    fn interpreter(window: usize, cooldown_ms: u64) -> Interpreter<ThresholdModel> {
        let adapter = ClassifierAdapter::new(ThresholdModel::new()).unwrap();
        Interpreter::new(
            adapter,
            VoteSmoother::new(window),
            TriggerGate::new(Duration::from_millis(cooldown_ms), GateMode::Retrigger),
            CancellationToken::new(),
        )
    }

    fn emitted(d: Option<Detection>) -> Option<String> {
        d.map(|d| d.label.to_string())
    }

    #[test]
    fn test_vote_and_cooldown_timeline() {
        let mut interp = interpreter(3, 500);
        let t0 = Instant::now();
        let at = |ms: u64| t0 + Duration::from_millis(ms);

        // Raw A,A,B smooths to A,A,A: one emission at t=0.0
        assert_eq!(emitted(interp.process_line(A, at(0))), Some("A".into()));
        assert_eq!(emitted(interp.process_line(A, at(100))), None);
        assert_eq!(emitted(interp.process_line(B, at(200))), None);

        // B takes the majority at t=0.3
        assert_eq!(emitted(interp.process_line(B, at(300))), Some("B".into()));
        // Held B inside the cooldown
        assert_eq!(emitted(interp.process_line(B, at(600))), None);
        // Cooldown elapsed since the B emission
        assert_eq!(emitted(interp.process_line(B, at(800))), Some("B".into()));

        assert_eq!(interp.stats().detections, 3);
        assert_eq!(interp.stats().frames, 6);
    }

    #[test]
    fn test_malformed_line_changes_nothing() {
        let mut interp = interpreter(3, 500);
        let now = Instant::now();
        assert!(interp.process_line(A, now).is_some());
        let window_before: Vec<Label> = interp.smoother().window().cloned().collect();
        let state_before = interp.gate().state().clone();

        assert!(interp
            .process_line("1.0,2.0,x,4,5,6,7,8,9,10,11", now + Duration::from_secs(5))
            .is_none());

        let window_after: Vec<Label> = interp.smoother().window().cloned().collect();
        assert_eq!(window_before, window_after);
        assert_eq!(&state_before, interp.gate().state());
        assert_eq!(interp.stats().malformed_values, 1);
        assert_eq!(interp.stats().frames, 1);
    }

    #[test]
    fn test_rejections_are_counted_by_kind() {
        let mut interp = interpreter(1, 0);
        let now = Instant::now();
        interp.process_line("", now);
        interp.process_line("1,2,3", now);
        interp.process_line("-1,0,0,0,0,0,0,0,0,0,0", now);
        let stats = interp.stats();
        assert_eq!(stats.lines, 3);
        assert_eq!(stats.empty, 1);
        assert_eq!(stats.schema_mismatches, 1);
        assert_eq!(stats.classifier_failures, 1);
        assert_eq!(stats.rejected(), 2);
        assert!(matches!(interp.gate().state(), GateState::Idle));
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let mut interp = interpreter(1, 0);
        let now = Instant::now();
        let first = interp.process_line(A, now).unwrap();
        let second = interp.process_line(B, now).unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
    }

    /// Never yields a line.
    struct SilentSource;

    #[async_trait]
    impl LineSource for SilentSource {
        async fn next_line(&mut self) -> Result<LinkEvent, LinkError> {
            std::future::pending().await
        }

        fn source_name(&self) -> &str {
            "silent"
        }
    }

    #[tokio::test]
    async fn test_cancel_stops_blocked_read() {
        let interp = interpreter(3, 500);
        let cancel = interp.cancel_token.clone();
        let (handle, worker) = spawn_dispatch(LogSink, 4, None);

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let stats = tokio::time::timeout(
            Duration::from_secs(2),
            interp.run(&mut SilentSource, &handle),
        )
        .await
        .expect("run must observe cancellation")
        .unwrap();
        assert_eq!(stats.lines, 0);

        stopper.await.unwrap();
        worker.shutdown().await.unwrap();
    }
}
