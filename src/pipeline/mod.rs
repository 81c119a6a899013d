//! Gesture Pipeline Module
//!
//! ## Stages
//!
//! ```text
//! STAGE 1: Frame Parser       (line -> 11-channel feature vector)
//! STAGE 2: Classifier Adapter (feature vector -> raw label)
//! STAGE 3: Vote Smoother      (last K raw labels -> smoothed label)
//! STAGE 4: Trigger Gate       (smoothed label -> fire / suppress)
//! STAGE 5: Dispatch Queue     (fired labels -> output sink, own task)
//! ```
//!
//! Stages 1-4 run synchronously on the ingestion task in arrival order.
//! Stage 5 is the only cross-task boundary.

mod gate;
mod vote;
pub mod processing_loop;

pub use gate::{GateMode, GateState, TriggerGate};
pub use processing_loop::{IngestError, IngestStats, Interpreter};
pub use vote::VoteSmoother;
