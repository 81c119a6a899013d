//! Bundled output sinks.
//!
//! - [`LogSink`]: writes each gesture to the log (dry runs, replays)
//! - [`CommandSink`]: runs an external program per gesture, typically a
//!   text-to-speech engine such as `espeak -s 150`

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

use super::{OutputSink, SinkError};
use crate::config::{OutputConfig, SinkKind};
use crate::types::Label;

/// Placeholder replaced by the label in command arguments.
pub const LABEL_PLACEHOLDER: &str = "{label}";

/// Logs each gesture at info level.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl OutputSink for LogSink {
    async fn emit(&mut self, label: &Label) -> Result<(), SinkError> {
        info!(gesture = %label, "🗣️  {}", label);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Runs `program args...` once per gesture.
///
/// Any argument containing `{label}` has it substituted; if none does, the
/// label is appended as the final argument. A non-zero exit status is a sink
/// failure. The child is killed if the call is abandoned (sink timeout).
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    name: String,
}

impl CommandSink {
    /// Build from a command line split into words (`["espeak", "-s", "150"]`).
    pub fn new(command: &[String]) -> Result<Self, SinkError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| SinkError::Failed("command sink requires a program".to_string()))?;
        if program.trim().is_empty() {
            return Err(SinkError::Failed("command sink requires a program".to_string()));
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            name: format!("command:{program}"),
        })
    }

    /// Arguments for one invocation.
    pub fn args_for(&self, label: &Label) -> Vec<String> {
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(LABEL_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(LABEL_PLACEHOLDER, label.as_str())
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(label.to_string());
        }
        args
    }
}

#[async_trait]
impl OutputSink for CommandSink {
    async fn emit(&mut self, label: &Label) -> Result<(), SinkError> {
        let output = Command::new(&self.program)
            .args(self.args_for(label))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| SinkError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(SinkError::Exit {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build the sink selected in the output config.
pub fn build_sink(config: &OutputConfig) -> Result<Box<dyn OutputSink>, SinkError> {
    match config.sink {
        SinkKind::Log => Ok(Box::new(LogSink)),
        SinkKind::Command => Ok(Box::new(CommandSink::new(&config.command)?)),
    }
}
