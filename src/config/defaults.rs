//! System-wide default constants.
//!
//! Centralises the numbers the interpreter would otherwise scatter across
//! modules. Grouped by subsystem for easy discovery.

// ============================================================================
// Config Loading
// ============================================================================

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "GLOVE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "glove_config.toml";

// ============================================================================
// Sensor Link
// ============================================================================

/// Default glove port (USB serial adapter on Linux).
pub const DEFAULT_LINK_ADDRESS: &str = "/dev/ttyUSB0";

/// Glove firmware serial speed.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Standard UART speeds; anything else draws a config warning.
pub const STANDARD_BAUD_RATES: &[u32] = &[
    1_200, 2_400, 4_800, 9_600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800, 921_600,
];

/// Bounded wait per link read (ms).
///
/// Also the worst-case delay before the ingestion loop notices a read-side
/// stall. Shutdown itself does not wait for it.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1_000;

/// Input discarded after opening the link while the glove resets (ms).
pub const DEFAULT_SETTLE_MS: u64 = 2_000;

/// TCP connect timeout for serial bridges (seconds).
pub const LINK_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Longest accepted line. A glove frame is well under 100 bytes; anything
/// this long is a stuck transmitter or line noise.
pub const MAX_LINE_BYTES: usize = 1_024;

// ============================================================================
// Classifier
// ============================================================================

/// Default gesture model location.
pub const DEFAULT_MODEL_PATH: &str = "models/gesture_model.json";

// ============================================================================
// Smoothing & Trigger
// ============================================================================

/// Majority-vote window (labels).
pub const DEFAULT_VOTE_WINDOW: usize = 3;

/// Minimum time before the last label may fire again (seconds).
pub const DEFAULT_COOLDOWN_SECS: f64 = 0.5;

/// Vote windows above this add noticeable latency at ~50 Hz.
pub const VOTE_WINDOW_WARN_ABOVE: usize = 25;

/// Cooldowns above this make repeated gestures feel unresponsive (seconds).
pub const COOLDOWN_WARN_ABOVE_SECS: f64 = 10.0;

// ============================================================================
// Dispatch
// ============================================================================

/// Dispatch queue capacity (labels).
///
/// Emissions are already rate limited by the gate, so this only fills when
/// the sink stalls for a long time.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default speech command; the label is appended as the last argument.
pub const DEFAULT_SPEECH_COMMAND: &[&str] = &["espeak", "-s", "150"];

// ============================================================================
// Diagnostics
// ============================================================================

/// Lines between periodic statistics log entries.
pub const STATS_LOG_INTERVAL_LINES: u64 = 500;
