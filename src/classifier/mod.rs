//! Classifier Module
//!
//! The gesture model is an external collaborator: something that maps one
//! feature vector to one label. This module defines that seam and the
//! adapter the pipeline talks to.
//!
//! ## Channel Order Contract
//!
//! Models are trained on a specific column order. [`ClassifierAdapter`] is
//! the only place that knows about it: at construction it checks the model's
//! declared feature names against [`CHANNEL_NAMES`] and, when the model uses
//! the same channels in a different order, reorders every vector before
//! calling it.

mod centroid;

pub use centroid::{CentroidClass, CentroidModel, Scaler};

use crate::types::{FeatureVector, Label, CHANNEL_NAMES, FEATURE_COUNT};
use thiserror::Error;

/// Classifier errors
#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    /// The model cannot be invoked at all (missing, unreadable, incompatible).
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    /// A single prediction failed; the frame is dropped.
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Trait for gesture models
///
/// `predict` receives values in the order given by `feature_names`.
pub trait Classifier: Send {
    /// Feature names in the order the model expects them.
    fn feature_names(&self) -> &[String];

    /// Predict the label for one vector.
    fn predict(&self, features: &[f64]) -> Result<Label, ClassifierError>;

    /// Model name for logging
    fn name(&self) -> &str;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn feature_names(&self) -> &[String] {
        (**self).feature_names()
    }

    fn predict(&self, features: &[f64]) -> Result<Label, ClassifierError> {
        (**self).predict(features)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Stable call contract in front of a [`Classifier`].
pub struct ClassifierAdapter<C> {
    model: C,
    /// `order[i]` is the canonical channel index fed to model input `i`
    order: [usize; FEATURE_COUNT],
    reordered: bool,
}

impl<C: Classifier> ClassifierAdapter<C> {
    /// Wrap a model, resolving its feature order against the canonical one.
    ///
    /// Fails with [`ClassifierError::Unavailable`] if the model's channel set
    /// differs from the glove's.
    pub fn new(model: C) -> Result<Self, ClassifierError> {
        let names = model.feature_names();
        if names.len() != FEATURE_COUNT {
            return Err(ClassifierError::Unavailable(format!(
                "model '{}' expects {} features, glove provides {}",
                model.name(),
                names.len(),
                FEATURE_COUNT
            )));
        }

        let mut order = [0usize; FEATURE_COUNT];
        let mut seen = [false; FEATURE_COUNT];
        for (slot, name) in order.iter_mut().zip(names) {
            let idx = CHANNEL_NAMES
                .iter()
                .position(|c| *c == name.as_str())
                .ok_or_else(|| {
                    ClassifierError::Unavailable(format!(
                        "model '{}' expects unknown feature '{}'",
                        model.name(),
                        name
                    ))
                })?;
            if seen[idx] {
                return Err(ClassifierError::Unavailable(format!(
                    "model '{}' lists feature '{}' twice",
                    model.name(),
                    name
                )));
            }
            seen[idx] = true;
            *slot = idx;
        }

        let reordered = order.iter().enumerate().any(|(i, idx)| i != *idx);
        if reordered {
            tracing::warn!(
                model = %model.name(),
                "Model feature order differs from glove channel order - reordering inputs"
            );
        }

        Ok(Self {
            model,
            order,
            reordered,
        })
    }

    /// Classify one vector.
    pub fn classify(&self, vector: &FeatureVector) -> Result<Label, ClassifierError> {
        let values = vector.values();
        if !self.reordered {
            return self.model.predict(values);
        }
        let mut ordered = [0.0_f64; FEATURE_COUNT];
        for (dst, idx) in ordered.iter_mut().zip(self.order.iter()) {
            *dst = values[*idx];
        }
        self.model.predict(&ordered)
    }

    /// Whether inputs are permuted before reaching the model.
    pub fn is_reordering(&self) -> bool {
        self.reordered
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::parse_frame;

    /// Labels a frame by whichever of its first model inputs is larger.
    struct FirstVsSecond {
        names: Vec<String>,
    }

    impl FirstVsSecond {
        fn with_order(names: &[&str]) -> Self {
            Self {
                names: names.iter().map(|n| n.to_string()).collect(),
            }
        }
    }

    impl Classifier for FirstVsSecond {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, features: &[f64]) -> Result<Label, ClassifierError> {
            if features[0] > features[1] {
                Ok(Label::new("first"))
            } else {
                Ok(Label::new("second"))
            }
        }

        fn name(&self) -> &str {
            "first-vs-second"
        }
    }

    #[test]
    fn test_canonical_order_passes_through() {
        let adapter = ClassifierAdapter::new(FirstVsSecond::with_order(&CHANNEL_NAMES)).unwrap();
        assert!(!adapter.is_reordering());
        let v = parse_frame("9,1,0,0,0,0,0,0,0,0,0").unwrap();
        assert_eq!(adapter.classify(&v).unwrap(), Label::new("first"));
    }

    #[test]
    fn test_swapped_order_is_reordered() {
        let mut names = CHANNEL_NAMES;
        names.swap(0, 1);
        let adapter = ClassifierAdapter::new(FirstVsSecond::with_order(&names)).unwrap();
        assert!(adapter.is_reordering());
        // Model input 0 is now flex2 (1.0), input 1 is flex1 (9.0)
        let v = parse_frame("9,1,0,0,0,0,0,0,0,0,0").unwrap();
        assert_eq!(adapter.classify(&v).unwrap(), Label::new("second"));
    }

    #[test]
    fn test_unknown_feature_is_unavailable() {
        let mut names = CHANNEL_NAMES;
        names[4] = "pinky";
        let err = ClassifierAdapter::new(FirstVsSecond::with_order(&names)).err().unwrap();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }

    #[test]
    fn test_wrong_arity_is_unavailable() {
        let err = ClassifierAdapter::new(FirstVsSecond::with_order(&CHANNEL_NAMES[..5]))
            .err()
            .unwrap();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }

    #[test]
    fn test_duplicate_feature_is_unavailable() {
        let mut names = CHANNEL_NAMES;
        names[1] = "flex1";
        let err = ClassifierAdapter::new(FirstVsSecond::with_order(&names)).err().unwrap();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }
}
