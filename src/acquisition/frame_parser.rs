//! Glove Frame Parser
//!
//! The glove firmware prints one reading per line as comma-separated ASCII:
//!
//! ```text
//! flex1,flex2,flex3,flex4,flex5,accelX,accelY,accelZ,gyroX,gyroY,gyroZ
//! 512,498,530,601,477,0.02,-0.98,0.11,1.5,-0.3,0.0
//! ```
//!
//! Lines arrive over a noisy transport, so truncated frames, boot banners and
//! corrupted bytes are routine. Every rejection is recoverable; the caller
//! counts it and moves on to the next line.

use crate::types::{FeatureVector, FEATURE_COUNT};
use thiserror::Error;

/// Reasons a line does not produce a feature vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("Empty frame")]
    Empty,

    #[error("Schema mismatch: expected {expected} fields, found {found}")]
    SchemaMismatch { expected: usize, found: usize },

    #[error("Malformed value in field {index}: {value:?}")]
    MalformedValue { index: usize, value: String },
}

/// Parse one raw line into a feature vector.
///
/// Total over all inputs: returns either a vector of exactly
/// [`FEATURE_COUNT`] finite values or a [`FrameError`].
pub fn parse_frame(raw_line: &str) -> Result<FeatureVector, FrameError> {
    let line = raw_line.trim();
    if line.is_empty() {
        return Err(FrameError::Empty);
    }

    let found = line.split(',').count();
    if found != FEATURE_COUNT {
        return Err(FrameError::SchemaMismatch {
            expected: FEATURE_COUNT,
            found,
        });
    }

    let mut values = [0.0_f64; FEATURE_COUNT];
    for (index, (slot, field)) in values.iter_mut().zip(line.split(',')).enumerate() {
        let field = field.trim();
        // f64::from_str accepts "nan" and "inf"; neither is a usable reading.
        match field.parse::<f64>() {
            Ok(v) if v.is_finite() => *slot = v,
            _ => {
                return Err(FrameError::MalformedValue {
                    index,
                    value: field.to_string(),
                })
            }
        }
    }

    Ok(FeatureVector::from_validated(values))
}

/// Decode raw link bytes into text, replacing invalid UTF-8.
///
/// Replacement characters then fail numeric conversion, so a corrupted byte
/// surfaces as [`FrameError::MalformedValue`] instead of a decode error.
pub fn decode_line(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}
