//! Core data types shared across the interpreter pipeline.
//!
//! - [`FeatureVector`]: one validated glove reading (11 channels, fixed order)
//! - [`Label`]: opaque gesture identifier produced by the classifier
//! - [`Detection`]: a label that passed the trigger gate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Channel Layout
// ============================================================================

/// Number of numeric channels in one glove frame.
pub const FEATURE_COUNT: usize = 11;

/// Canonical channel order of a glove frame.
///
/// This is the order the firmware prints and the order models are trained in.
pub const CHANNEL_NAMES: [&str; FEATURE_COUNT] = [
    "flex1", "flex2", "flex3", "flex4", "flex5",
    "accelX", "accelY", "accelZ",
    "gyroX", "gyroY", "gyroZ",
];

// ============================================================================
// Feature Vector
// ============================================================================

/// One validated reading: exactly [`FEATURE_COUNT`] finite values in
/// [`CHANNEL_NAMES`] order.
///
/// Only the frame parser constructs these, so holding one is proof the
/// arity and finiteness checks already passed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub(crate) fn from_validated(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Channel values in canonical order.
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Look up a channel by its canonical name.
    pub fn channel(&self, name: &str) -> Option<f64> {
        CHANNEL_NAMES
            .iter()
            .position(|c| *c == name)
            .map(|idx| self.0[idx])
    }
}

// ============================================================================
// Label
// ============================================================================

/// Gesture label returned by the classifier.
///
/// Cheap to clone (shared string); the pipeline only ever compares labels
/// for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(Arc<str>);

impl Label {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

// ============================================================================
// Detection
// ============================================================================

/// A gesture event that cleared the trigger gate and was handed to dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Emitted label
    pub label: Label,
    /// 1-based emission counter since startup
    pub sequence: u64,
    /// Wall-clock time of the emission
    pub at: DateTime<Utc>,
}
