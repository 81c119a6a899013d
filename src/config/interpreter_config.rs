//! Interpreter Configuration - link, model, smoothing and output settings
//!
//! Every tunable is a field here. Each struct implements `Default` with the
//! values the glove firmware is tuned for, so the interpreter runs
//! unchanged when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::defaults::*;
use crate::pipeline::GateMode;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with [`InterpreterConfig::load`], which searches:
/// 1. an explicit `--config` path
/// 2. `$GLOVE_CONFIG`
/// 3. `./glove_config.toml`
/// 4. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Sensor link
    #[serde(default)]
    pub link: LinkConfig,

    /// Gesture model
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Vote smoother and trigger gate
    #[serde(default)]
    pub smoothing: SmoothingConfig,

    /// Output sink and dispatch queue
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where a loaded config came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    CliFlag(PathBuf),
    Env(PathBuf),
    LocalFile(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliFlag(p) => write!(f, "--config {}", p.display()),
            ConfigSource::Env(p) => write!(f, "{CONFIG_ENV_VAR}={}", p.display()),
            ConfigSource::LocalFile(p) => write!(f, "{}", p.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

impl InterpreterConfig {
    /// Load configuration using the standard search order.
    ///
    /// An explicit path must load cleanly. The environment variable and the
    /// local file fall back to the next source with a warning.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        // 1. Explicit path
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded config from --config");
            return Ok((config, ConfigSource::CliFlag(path.to_path_buf())));
        }

        // 2. Env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV_VAR);
                        return Ok((config, ConfigSource::Env(p)));
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 3. ./glove_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return Ok((config, ConfigSource::LocalFile(local)));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 4. Defaults
        info!("No {} found - using built-in defaults", LOCAL_CONFIG_FILE);
        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse a TOML document.
    ///
    /// Unknown keys are reported as warnings (with suggestions). Ranges are
    /// not checked here: command-line overrides still apply on top, so call
    /// [`validate`](Self::validate) on the final config.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check ranges. Suspicious-but-usable values are logged as warnings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!(field = %w.field, "{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Sensor Link
// ============================================================================

/// Sensor link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// `-`/`stdin`, `tcp://HOST:PORT`, or a device/file path.
    #[serde(default = "default_link_address")]
    pub address: String,

    /// Serial line speed. Device nodes are configured outside the process
    /// (e.g. `stty -F /dev/ttyUSB0 115200 raw`); the value is reported at
    /// startup and checked for sanity.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Bounded wait per read (ms).
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Input discarded after opening while the glove resets (ms).
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_link_address() -> String { DEFAULT_LINK_ADDRESS.to_string() }
fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }
fn default_read_timeout_ms() -> u64 { DEFAULT_READ_TIMEOUT_MS }
fn default_settle_ms() -> u64 { DEFAULT_SETTLE_MS }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: default_link_address(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Gesture model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Path to the JSON gesture model.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
}

fn default_model_path() -> PathBuf { PathBuf::from(DEFAULT_MODEL_PATH) }

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
        }
    }
}

// ============================================================================
// Smoothing & Trigger
// ============================================================================

/// Vote smoother and trigger gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Majority-vote window size (K >= 1; 1 disables smoothing).
    #[serde(default = "default_vote_window")]
    pub vote_window: usize,

    /// Minimum time since the last emission before the same label fires
    /// again (seconds, >= 0).
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: f64,

    /// `retrigger` or `strict`.
    #[serde(default)]
    pub gate_mode: GateMode,
}

fn default_vote_window() -> usize { DEFAULT_VOTE_WINDOW }
fn default_cooldown_secs() -> f64 { DEFAULT_COOLDOWN_SECS }

impl SmoothingConfig {
    /// Cooldown as a `Duration`. Call after validation; an unrepresentable
    /// value saturates so the gate never loses its cooldown.
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.cooldown_secs).unwrap_or(Duration::MAX)
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            vote_window: default_vote_window(),
            cooldown_secs: default_cooldown_secs(),
            gate_mode: GateMode::default(),
        }
    }
}

// ============================================================================
// Output
// ============================================================================

/// Which output sink to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Log each gesture
    #[default]
    Log,
    /// Run `output.command` per gesture
    Command,
}

/// Output sink and dispatch queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub sink: SinkKind,

    /// Program and arguments for the command sink.
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Dispatch queue capacity (labels).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Per-call sink timeout (ms, 0 = unlimited).
    #[serde(default)]
    pub sink_timeout_ms: u64,
}

fn default_command() -> Vec<String> {
    DEFAULT_SPEECH_COMMAND.iter().map(|s| s.to_string()).collect()
}
fn default_queue_capacity() -> usize { DEFAULT_QUEUE_CAPACITY }

impl OutputConfig {
    pub fn sink_timeout(&self) -> Option<Duration> {
        (self.sink_timeout_ms > 0).then(|| Duration::from_millis(self.sink_timeout_ms))
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            command: default_command(),
            queue_capacity: default_queue_capacity(),
            sink_timeout_ms: 0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
