//! Pipeline Regression Tests
//!
//! Drives the whole interpreter (link reader, parser, classifier adapter,
//! smoother, gate, dispatch) over in-memory links with a real centroid model
//! and a recording sink.

use async_trait::async_trait;
use glove_interpreter::acquisition::{LineReader, LinkEvent, LineSource};
use glove_interpreter::classifier::{CentroidClass, CentroidModel, ClassifierAdapter};
use glove_interpreter::config::SmoothingConfig;
use glove_interpreter::dispatch::{spawn_dispatch, OutputSink, SinkError};
use glove_interpreter::pipeline::{GateMode, IngestError, Interpreter};
use glove_interpreter::types::{Label, CHANNEL_NAMES};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

const HELLO: &str = "0,0,0,0,0,0,0,0,0,0,0";
const THANKS: &str = "10,0,0,0,0,0,0,0,0,0,0";

/// Two-class model declared in reverse channel order, so every frame goes
/// through the adapter's reordering.
fn reversed_model() -> ClassifierAdapter<CentroidModel> {
    let features: Vec<String> = CHANNEL_NAMES.iter().rev().map(|n| n.to_string()).collect();
    let mut thanks = vec![0.0; CHANNEL_NAMES.len()];
    // Last model input is flex1
    thanks[CHANNEL_NAMES.len() - 1] = 10.0;
    let model = CentroidModel::new(
        "reversed",
        features,
        None,
        vec![
            CentroidClass {
                label: "hello".to_string(),
                centroid: vec![0.0; CHANNEL_NAMES.len()],
            },
            CentroidClass {
                label: "thanks".to_string(),
                centroid: thanks,
            },
        ],
    )
    .unwrap();
    let adapter = ClassifierAdapter::new(model).unwrap();
    assert!(adapter.is_reordering());
    adapter
}

#[derive(Clone, Default)]
struct RecordingSink {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl OutputSink for RecordingSink {
    async fn emit(&mut self, label: &Label) -> Result<(), SinkError> {
        self.seen.lock().unwrap().push(label.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn smoothing(vote_window: usize, cooldown_secs: f64) -> SmoothingConfig {
    SmoothingConfig {
        vote_window,
        cooldown_secs,
        gate_mode: GateMode::Retrigger,
    }
}

#[tokio::test]
async fn replay_delivers_debounced_gestures_in_order() {
    let mut capture = String::new();
    capture.push_str("Glove ready\n");
    for line in [HELLO, HELLO, HELLO, "", "1,2,3", THANKS, THANKS, THANKS] {
        capture.push_str(line);
        capture.push('\n');
    }
    capture.push_str("1.0,2.0,x,4,5,6,7,8,9,10,11\r\n");
    for _ in 0..3 {
        capture.push_str(HELLO);
        capture.push_str("\r\n");
    }

    let mut link = LineReader::new(
        Cursor::new(capture.into_bytes()),
        "capture",
        Duration::from_millis(200),
    );
    let sink = RecordingSink::default();
    let seen = Arc::clone(&sink.seen);
    let (handle, worker) = spawn_dispatch(sink, 8, None);

    let interpreter =
        Interpreter::from_config(reversed_model(), &smoothing(3, 0.5), CancellationToken::new());
    let result = interpreter.run(&mut link, &handle).await;
    assert!(matches!(result, Err(IngestError::LinkClosed(ref name)) if name == "capture"));

    drop(handle);
    let stats = worker.join().await.unwrap();

    // Held gestures inside the cooldown are announced once; each change of
    // majority fires immediately.
    assert_eq!(*seen.lock().unwrap(), vec!["hello", "thanks", "hello"]);
    assert_eq!(stats.delivered, 3);
    assert_eq!(stats.abandoned, 0);
}

#[tokio::test]
async fn unsmoothed_run_counts_every_line() {
    let capture = format!("{HELLO}\n\nbad\n{THANKS}\n{HELLO}\n");
    let mut link = LineReader::new(
        Cursor::new(capture.into_bytes()),
        "capture",
        Duration::from_millis(200),
    );
    let sink = RecordingSink::default();
    let seen = Arc::clone(&sink.seen);
    let (handle, worker) = spawn_dispatch(sink, 8, None);

    // K = 1 with no cooldown: every change of label fires
    let cancel = CancellationToken::new();
    let mut interpreter = Interpreter::from_config(reversed_model(), &smoothing(1, 0.0), cancel);
    while let LinkEvent::Line(line) = link.next_line().await.unwrap() {
        if let Some(detection) = interpreter.process_line(&line, tokio::time::Instant::now()) {
            handle.enqueue(detection.label).await.unwrap();
        }
    }
    let stats = *interpreter.stats();
    drop(handle);
    worker.join().await.unwrap();

    assert_eq!(stats.lines, 5);
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.empty, 1);
    assert_eq!(stats.schema_mismatches, 1);
    assert_eq!(stats.detections, 3);
    assert_eq!(*seen.lock().unwrap(), vec!["hello", "thanks", "hello"]);
}

#[tokio::test]
async fn cancellation_stops_a_quiet_live_link() {
    let (mut glove, host) = tokio::io::duplex(1024);
    let mut link = LineReader::new(BufReader::new(host), "duplex", Duration::from_millis(20));

    let sink = RecordingSink::default();
    let seen = Arc::clone(&sink.seen);
    let (handle, worker) = spawn_dispatch(sink, 8, None);

    let cancel = CancellationToken::new();
    let interpreter = Interpreter::from_config(reversed_model(), &smoothing(1, 0.5), cancel.clone());

    let writer = tokio::spawn(async move {
        glove.write_all(format!("{THANKS}\n").as_bytes()).await.unwrap();
        // Half a frame, then silence: the reader must stay responsive
        glove.write_all(b"0,0,0").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
        // Keep the stream open until after cancellation
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(glove);
    });

    let stats = tokio::time::timeout(Duration::from_secs(2), interpreter.run(&mut link, &handle))
        .await
        .expect("interpreter must stop on cancellation")
        .unwrap();
    writer.await.unwrap();

    assert_eq!(stats.lines, 1);
    assert_eq!(stats.detections, 1);
    assert!(stats.idle_reads > 0);

    let dispatch = worker.shutdown().await.unwrap();
    assert_eq!(dispatch.delivered + dispatch.abandoned, 1);
    assert!(seen.lock().unwrap().len() <= 1);
}
