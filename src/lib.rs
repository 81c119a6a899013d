//! Glove Interpreter: sensor glove frames to spoken gestures
//!
//! Turns a stream of text frames from an instrumented glove into discrete,
//! debounced gesture events and hands them to a slow output sink.
//!
//! ## Architecture
//!
//! - **Acquisition**: sensor link reader and frame parser
//! - **Classifier**: adapter in front of a pre-trained gesture model
//! - **Pipeline**: majority-vote smoother, trigger gate, ingestion loop
//! - **Dispatch**: bounded queue and worker feeding the output sink

pub mod acquisition;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod pipeline;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, InterpreterConfig};

// Re-export commonly used types
pub use types::{Detection, FeatureVector, Label, CHANNEL_NAMES, FEATURE_COUNT};

// Re-export stages
pub use acquisition::{open_link, parse_frame, FrameError, LineReader, LineSource, LinkError, LinkEvent};
pub use classifier::{CentroidModel, Classifier, ClassifierAdapter, ClassifierError};
pub use dispatch::{spawn_dispatch, DispatchHandle, DispatchStats, DispatchWorker, OutputSink, SinkError};
pub use pipeline::{GateMode, IngestError, IngestStats, Interpreter, TriggerGate, VoteSmoother};
