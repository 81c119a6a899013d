//! Interpreter Configuration Module
//!
//! Provides the interpreter configuration loaded from TOML files. Every
//! tunable the pipeline uses (link address, vote window, cooldown, output
//! command) lives here; nothing is read from globals.
//!
//! ## Loading Order
//!
//! 1. `--config <path>` on the command line (errors are fatal)
//! 2. `GLOVE_CONFIG` environment variable (path to TOML file)
//! 3. `glove_config.toml` in the current working directory
//! 4. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! let (config, source) = InterpreterConfig::load(cli.config.as_deref())?;
//! config.validate()?;
//! let gate = TriggerGate::new(config.smoothing.cooldown(), config.smoothing.gate_mode);
//! ```

mod interpreter_config;
pub mod defaults;
pub mod validation;

pub use interpreter_config::*;
