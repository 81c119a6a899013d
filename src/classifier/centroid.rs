//! Nearest-centroid gesture model loaded from JSON.
//!
//! ```json
//! {
//!   "features": ["flex1", "flex2", "...", "gyroZ"],
//!   "scaler": { "mean": [...], "scale": [...] },
//!   "classes": [
//!     { "label": "hello", "centroid": [...] },
//!     { "label": "thanks", "centroid": [...] }
//!   ]
//! }
//! ```
//!
//! Centroids live in scaled space when a scaler is present. Prediction picks
//! the class with the smallest squared Euclidean distance; the first class
//! in file order wins an exact tie.

use super::{Classifier, ClassifierError};
use crate::types::Label;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Per-feature standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// One gesture class and its centroid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidClass {
    pub label: String,
    pub centroid: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelFile {
    features: Vec<String>,
    #[serde(default)]
    scaler: Option<Scaler>,
    classes: Vec<CentroidClass>,
}

/// Nearest-centroid classifier.
#[derive(Debug, Clone)]
pub struct CentroidModel {
    name: String,
    features: Vec<String>,
    scaler: Option<Scaler>,
    classes: Vec<(Label, Vec<f64>)>,
}

impl CentroidModel {
    /// Build a model, checking every vector has one entry per feature.
    pub fn new(
        name: impl Into<String>,
        features: Vec<String>,
        scaler: Option<Scaler>,
        classes: Vec<CentroidClass>,
    ) -> Result<Self, ClassifierError> {
        let name = name.into();
        let n = features.len();
        let unavailable = |msg: String| ClassifierError::Unavailable(format!("{name}: {msg}"));

        if n == 0 {
            return Err(unavailable("model declares no features".to_string()));
        }
        if classes.is_empty() {
            return Err(unavailable("model declares no classes".to_string()));
        }
        if let Some(ref s) = scaler {
            if s.mean.len() != n || s.scale.len() != n {
                return Err(unavailable(format!(
                    "scaler has {}/{} entries, expected {n}",
                    s.mean.len(),
                    s.scale.len()
                )));
            }
            if s.scale.iter().any(|v| *v == 0.0 || !v.is_finite()) || s.mean.iter().any(|v| !v.is_finite()) {
                return Err(unavailable("scaler contains zero or non-finite values".to_string()));
            }
        }
        for class in &classes {
            if class.centroid.len() != n {
                return Err(unavailable(format!(
                    "class '{}' centroid has {} entries, expected {n}",
                    class.label,
                    class.centroid.len()
                )));
            }
            if class.centroid.iter().any(|v| !v.is_finite()) {
                return Err(unavailable(format!(
                    "class '{}' centroid contains non-finite values",
                    class.label
                )));
            }
        }

        Ok(Self {
            name,
            features,
            scaler,
            classes: classes
                .into_iter()
                .map(|c| (Label::from(c.label), c.centroid))
                .collect(),
        })
    }

    /// Load a model from a JSON file.
    ///
    /// Every failure maps to [`ClassifierError::Unavailable`]: without a
    /// model the interpreter cannot start.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::Unavailable(format!("cannot read model {}: {e}", path.display()))
        })?;
        let file: ModelFile = serde_json::from_str(&contents).map_err(|e| {
            ClassifierError::Unavailable(format!("cannot parse model {}: {e}", path.display()))
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        let model = Self::new(name, file.features, file.scaler, file.classes)?;

        info!(
            path = %path.display(),
            classes = model.classes.len(),
            scaled = model.scaler.is_some(),
            "Loaded gesture model"
        );
        Ok(model)
    }

    /// Labels this model can produce, in file order.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.classes.iter().map(|(label, _)| label)
    }
}

impl Classifier for CentroidModel {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, features: &[f64]) -> Result<Label, ClassifierError> {
        if features.len() != self.features.len() {
            return Err(ClassifierError::Inference(format!(
                "got {} features, expected {}",
                features.len(),
                self.features.len()
            )));
        }

        let mut best: Option<(&Label, f64)> = None;
        for (label, centroid) in &self.classes {
            let mut distance = 0.0;
            for (i, (x, c)) in features.iter().zip(centroid).enumerate() {
                let x = match self.scaler {
                    Some(ref s) => (x - s.mean[i]) / s.scale[i],
                    None => *x,
                };
                distance += (x - c) * (x - c);
            }
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((label, distance)),
            }
        }

        match best {
            Some((label, distance)) if distance.is_finite() => Ok(label.clone()),
            _ => Err(ClassifierError::Inference(
                "no finite distance to any class".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
