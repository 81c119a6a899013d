//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Unknown keys never break a config.

use std::collections::HashSet;
use std::time::Duration;

use super::defaults::{COOLDOWN_WARN_ABOVE_SECS, STANDARD_BAUD_RATES, VOTE_WINDOW_WARN_ABOVE};
use super::{InterpreterConfig, SinkKind};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " - did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for InterpreterConfig.
///
/// Any new field added to InterpreterConfig must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [link]
        "link",
        "link.address",
        "link.baud_rate",
        "link.read_timeout_ms",
        "link.settle_ms",
        // [classifier]
        "classifier",
        "classifier.model_path",
        // [smoothing]
        "smoothing",
        "smoothing.vote_window",
        "smoothing.cooldown_secs",
        "smoothing.gate_mode",
        // [output]
        "output",
        "output.sink",
        "output.command",
        "output.queue_capacity",
        "output.sink_timeout_ms",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve alphabetically so suggestions are stable across runs.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist > 3 {
            continue;
        }
        best = match best {
            Some((best_key, best_dist)) if dist > best_dist || (dist == best_dist && k > best_key) => {
                Some((best_key, best_dist))
            }
            _ => Some((k, dist)),
        };
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys - it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate value ranges on a parsed InterpreterConfig.
///
/// Returns (errors, warnings) - errors are values the pipeline cannot run
/// with; warnings are usable but probably not intended.
pub fn validate_ranges(config: &InterpreterConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let link = &config.link;
    if link.address.trim().is_empty() {
        errors.push("link.address must not be empty".to_string());
    }
    if link.baud_rate == 0 {
        errors.push("link.baud_rate must be > 0".to_string());
    } else if !STANDARD_BAUD_RATES.contains(&link.baud_rate) {
        warnings.push(ValidationWarning {
            field: "link.baud_rate".to_string(),
            message: format!("link.baud_rate = {} is not a standard UART speed", link.baud_rate),
            suggestion: None,
        });
    }
    if link.read_timeout_ms == 0 {
        errors.push("link.read_timeout_ms must be > 0 (reads must be bounded)".to_string());
    }

    let s = &config.smoothing;
    if s.vote_window == 0 {
        errors.push("smoothing.vote_window must be >= 1 (1 disables smoothing)".to_string());
    } else if s.vote_window > VOTE_WINDOW_WARN_ABOVE {
        warnings.push(ValidationWarning {
            field: "smoothing.vote_window".to_string(),
            message: format!(
                "smoothing.vote_window = {} delays every gesture by that many frames",
                s.vote_window
            ),
            suggestion: None,
        });
    }
    if !s.cooldown_secs.is_finite() || s.cooldown_secs < 0.0 {
        errors.push(format!(
            "smoothing.cooldown_secs = {} must be a finite value >= 0",
            s.cooldown_secs
        ));
    } else if Duration::try_from_secs_f64(s.cooldown_secs).is_err() {
        errors.push(format!(
            "smoothing.cooldown_secs = {} is too large to represent as a duration",
            s.cooldown_secs
        ));
    } else if s.cooldown_secs > COOLDOWN_WARN_ABOVE_SECS {
        warnings.push(ValidationWarning {
            field: "smoothing.cooldown_secs".to_string(),
            message: format!(
                "smoothing.cooldown_secs = {:.1} is unusually long",
                s.cooldown_secs
            ),
            suggestion: None,
        });
    }

    let o = &config.output;
    if o.queue_capacity == 0 {
        errors.push("output.queue_capacity must be >= 1".to_string());
    }
    if o.sink == SinkKind::Command && o.command.first().map_or(true, |p| p.trim().is_empty()) {
        errors.push("output.command must name a program when output.sink = \"command\"".to_string());
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("cooldown_sec", "cooldown_secs"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [smoothing]
            vote_window = 3
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"smoothing".to_string()));
        assert!(keys.contains(&"smoothing.vote_window".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let warnings = validate_unknown_keys("[smoothing]\nvote_windw = 3\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "smoothing.vote_windw");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("smoothing.vote_window"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_defaults_are_clean() {
        let (errors, warnings) = validate_ranges(&InterpreterConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_zero_read_timeout_is_error() {
        let mut config = InterpreterConfig::default();
        config.link.read_timeout_ms = 0;
        let (errors, _) = validate_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("read_timeout_ms")));
    }

    #[test]
    fn test_nan_cooldown_is_error() {
        let mut config = InterpreterConfig::default();
        config.smoothing.cooldown_secs = f64::NAN;
        let (errors, _) = validate_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("cooldown_secs")));
    }

    #[test]
    fn test_unrepresentable_cooldown_is_error() {
        let mut config = InterpreterConfig::default();
        config.smoothing.cooldown_secs = 1e20;
        let (errors, warnings) = validate_ranges(&config);
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("cooldown_secs"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_odd_baud_rate_warns() {
        let mut config = InterpreterConfig::default();
        config.link.baud_rate = 115_000;
        let (errors, warnings) = validate_ranges(&config);
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.field == "link.baud_rate"));
    }

    #[test]
    fn test_command_sink_requires_program() {
        let mut config = InterpreterConfig::default();
        config.output.sink = SinkKind::Command;
        config.output.command.clear();
        let (errors, _) = validate_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("output.command")));
    }
}
