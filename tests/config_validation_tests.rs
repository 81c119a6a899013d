//! Config Validation Tests
//!
//! Typo detection and range validation for the interpreter config, plus
//! file loading through the public API.

use glove_interpreter::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use glove_interpreter::config::{ConfigError, ConfigSource, InterpreterConfig, SinkKind};
use glove_interpreter::pipeline::GateMode;
use std::io::Write;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_cooldown_warns_with_suggestion() {
    let toml_str = r#"
[smoothing]
cooldown_sec = 0.8
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(warnings[0].field, "smoothing.cooldown_sec");
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("smoothing.cooldown_secs")
    );
    assert!(warnings[0].to_string().contains("did you mean"));
}

#[test]
fn misspelled_section_warns() {
    let warnings = validate_unknown_keys("[lnik]\naddress = \"/dev/ttyUSB1\"\n");
    assert!(warnings.iter().any(|w| w.field == "lnik"));
    assert!(warnings
        .iter()
        .any(|w| w.suggestion.as_deref() == Some("link")));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[link]
address = "tcp://bridge.local:4000"
baud_rate = 115200
read_timeout_ms = 500
settle_ms = 0

[classifier]
model_path = "models/asl.json"

[smoothing]
vote_window = 5
cooldown_secs = 0.75
gate_mode = "strict"

[output]
sink = "command"
command = ["espeak", "-s", "150"]
queue_capacity = 16
sink_timeout_ms = 3000
"#;
    assert!(validate_unknown_keys(toml_str).is_empty());

    let config = InterpreterConfig::from_toml_str(toml_str).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.link.address, "tcp://bridge.local:4000");
    assert_eq!(config.smoothing.vote_window, 5);
    assert_eq!(config.smoothing.gate_mode, GateMode::Strict);
    assert_eq!(config.output.sink, SinkKind::Command);
    assert_eq!(config.output.sink_timeout().map(|d| d.as_millis()), Some(3000));
}

#[test]
fn every_known_key_suggests_itself() {
    let known = known_config_keys();
    for key in &known {
        assert_eq!(suggest_correction(key, &known).as_deref(), Some(*key));
    }
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn zero_window_and_negative_cooldown_are_both_reported() {
    let mut config = InterpreterConfig::default();
    config.smoothing.vote_window = 0;
    config.smoothing.cooldown_secs = -1.0;
    let (errors, _) = validate_ranges(&config);
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(errors.iter().any(|e| e.contains("vote_window")));
    assert!(errors.iter().any(|e| e.contains("cooldown_secs")));
}

#[test]
fn window_of_one_is_valid() {
    let mut config = InterpreterConfig::default();
    config.smoothing.vote_window = 1;
    config.smoothing.cooldown_secs = 0.0;
    assert!(config.validate().is_ok());
}

#[test]
fn large_window_warns_but_is_accepted() {
    let mut config = InterpreterConfig::default();
    config.smoothing.vote_window = 100;
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "smoothing.vote_window"));
}

#[test]
fn invalid_toml_values_fail_validation() {
    let config = InterpreterConfig::from_toml_str("[output]\nqueue_capacity = 0\n").unwrap();
    let err = config.validate().unwrap_err();
    match err {
        ConfigError::Validation(errors) => {
            assert!(errors.iter().any(|e| e.contains("queue_capacity")))
        }
        other => panic!("expected validation error, got {other}"),
    }
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn explicit_path_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[smoothing]\nvote_window = 7").unwrap();

    let (config, source) = InterpreterConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.smoothing.vote_window, 7);
    // Unspecified sections keep their defaults
    assert_eq!(config.link.baud_rate, 115_200);
    assert!(matches!(source, ConfigSource::CliFlag(_)));
}

#[test]
fn explicit_path_errors_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(matches!(
        InterpreterConfig::load(Some(&missing)),
        Err(ConfigError::Io(..))
    ));

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "[smoothing\nvote_window = ").unwrap();
    assert!(matches!(
        InterpreterConfig::load(Some(&bad)),
        Err(ConfigError::Parse(..))
    ));
}
