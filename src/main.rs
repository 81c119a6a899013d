//! Glove Interpreter - sensor glove gestures to speech
//!
//! Reads comma-separated frames from the glove, classifies each one with a
//! pre-trained gesture model, debounces the labels and speaks (or logs) each
//! gesture once.
//!
//! # Usage
//!
//! ```bash
//! # Serial glove on the default port, gestures written to the log
//! ./glove-interpreter --model models/gesture_model.json
//!
//! # Speak gestures through espeak
//! ./glove-interpreter --link /dev/ttyACM0 --sink command
//!
//! # Replay a capture
//! cat capture.csv | ./glove-interpreter --link -
//! ```
//!
//! # Environment Variables
//!
//! - `GLOVE_CONFIG`: Path to a TOML config file
//! - `GLOVE_LINK`: Sensor link address (device path, `tcp://HOST:PORT`, or `-`)
//! - `GLOVE_MODEL`: Path to the gesture model
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use glove_interpreter::acquisition::open_link;
use glove_interpreter::classifier::{CentroidModel, ClassifierAdapter};
use glove_interpreter::config::{InterpreterConfig, SinkKind};
use glove_interpreter::dispatch::{build_sink, spawn_dispatch};
use glove_interpreter::pipeline::{GateMode, IngestError, Interpreter};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "glove-interpreter")]
#[command(about = "Real-time sensor glove gesture interpreter")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides GLOVE_CONFIG and ./glove_config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Sensor link: device path, tcp://HOST:PORT, or "-" for stdin
    #[arg(long, env = "GLOVE_LINK", value_name = "ADDRESS")]
    link: Option<String>,

    /// Serial speed (informational; configure the device with stty)
    #[arg(long)]
    baud: Option<u32>,

    /// Path to the gesture model (JSON)
    #[arg(long, env = "GLOVE_MODEL", value_name = "PATH")]
    model: Option<PathBuf>,

    /// Majority-vote window in frames (1 disables smoothing)
    #[arg(long, value_name = "K")]
    vote_window: Option<usize>,

    /// Minimum seconds before the last gesture may fire again
    #[arg(long, value_name = "SECS")]
    cooldown: Option<f64>,

    /// Trigger rule applied after the first gesture
    #[arg(long, value_enum)]
    gate_mode: Option<GateModeArg>,

    /// Where gestures go
    #[arg(long, value_enum)]
    sink: Option<SinkArg>,

    /// Command for the command sink, e.g. "espeak -s 150"
    #[arg(long, value_name = "COMMAND")]
    speech_command: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum GateModeArg {
    Retrigger,
    Strict,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum SinkArg {
    Log,
    Command,
}

impl CliArgs {
    /// Apply command-line overrides on top of the loaded config.
    fn apply_overrides(&self, config: &mut InterpreterConfig) {
        if let Some(ref link) = self.link {
            config.link.address = link.clone();
        }
        if let Some(baud) = self.baud {
            config.link.baud_rate = baud;
        }
        if let Some(ref model) = self.model {
            config.classifier.model_path = model.clone();
        }
        if let Some(k) = self.vote_window {
            config.smoothing.vote_window = k;
        }
        if let Some(secs) = self.cooldown {
            config.smoothing.cooldown_secs = secs;
        }
        if let Some(mode) = self.gate_mode {
            config.smoothing.gate_mode = match mode {
                GateModeArg::Retrigger => GateMode::Retrigger,
                GateModeArg::Strict => GateMode::Strict,
            };
        }
        if let Some(sink) = self.sink {
            config.output.sink = match sink {
                SinkArg::Log => SinkKind::Log,
                SinkArg::Command => SinkKind::Command,
            };
        }
        if let Some(ref command) = self.speech_command {
            config.output.command = command.split_whitespace().map(str::to_string).collect();
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    // Load configuration
    let (mut config, config_source) =
        InterpreterConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Glove Interpreter");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "⚙️  Config: {} | Link: {} @ {} baud | Window: {} | Cooldown: {:.2}s ({})",
        config_source,
        config.link.address,
        config.link.baud_rate,
        config.smoothing.vote_window,
        config.smoothing.cooldown_secs,
        config.smoothing.gate_mode
    );

    // Classifier - an unusable model is fatal
    let model_path = &config.classifier.model_path;
    let model = CentroidModel::load(model_path)
        .with_context(|| format!("Failed to load gesture model {}", model_path.display()))?;
    let adapter = ClassifierAdapter::new(model)
        .context("Gesture model does not match the glove channels")?;
    info!(
        model = %adapter.model_name(),
        reordering = adapter.is_reordering(),
        "🧠 Gesture model ready"
    );

    // Output side
    let sink = build_sink(&config.output).context("Failed to build output sink")?;
    info!(sink = %sink.name(), "🗣️  Output sink ready");
    let (dispatch, worker) = spawn_dispatch(
        sink,
        config.output.queue_capacity,
        config.output.sink_timeout(),
    );

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let interpreter = Interpreter::from_config(adapter, &config.smoothing, cancel_token.clone());
    let ingest = tokio::select! {
        opened = open_link(&config.link) => match opened {
            Ok(mut link) => interpreter.run(&mut link, &dispatch).await,
            Err(e) => Err(IngestError::Link(e)),
        },
        _ = cancel_token.cancelled() => {
            info!("Shutdown requested before the sensor link opened");
            Ok(Default::default())
        }
    };

    // Ctrl+C abandons queued gestures; a link that ended lets them play out.
    drop(dispatch);
    let dispatch_stats = if cancel_token.is_cancelled() {
        worker.shutdown().await
    } else {
        worker.drain(&cancel_token).await
    };
    match dispatch_stats {
        Ok(stats) => info!(
            delivered = stats.delivered,
            failed = stats.failed,
            timed_out = stats.timed_out,
            abandoned = stats.abandoned,
            "📤 Dispatch finished"
        ),
        Err(e) => warn!(error = %e, "Dispatch worker did not stop cleanly"),
    }

    match ingest {
        Ok(stats) => {
            info!(
                "✓ Glove Interpreter shutdown complete ({} lines, {} gestures)",
                stats.lines, stats.detections
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Ingestion stopped");
            Err(e).context("Sensor link failed")
        }
    }
}
