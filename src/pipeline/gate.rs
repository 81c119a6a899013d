//! Trigger Gate - decides when a smoothed label becomes a gesture event
//!
//! ```text
//!   Idle ──(any label)──▶ Armed { last_label, last_emit }
//!   Armed ──(label, now)──▶ Armed   (updated only on emission)
//! ```
//!
//! The cooldown is measured from the last emission, whatever its label.
//! There is no per-label timer.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::types::Label;

/// Emission rule applied while armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// A different label fires immediately; the same label fires again once
    /// the cooldown has elapsed since the last emission.
    #[default]
    Retrigger,
    /// A label fires only if it differs from the last one *and* the cooldown
    /// has elapsed. A held gesture is announced exactly once.
    Strict,
}

impl std::fmt::Display for GateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateMode::Retrigger => write!(f, "retrigger"),
            GateMode::Strict => write!(f, "strict"),
        }
    }
}

/// Gate memory.
#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    /// Nothing emitted yet
    Idle,
    /// Last emission
    Armed { last_label: Label, last_emit: Instant },
}

/// Debounce state machine in front of the dispatch queue.
#[derive(Debug, Clone)]
pub struct TriggerGate {
    cooldown: Duration,
    mode: GateMode,
    state: GateState,
}

impl TriggerGate {
    pub fn new(cooldown: Duration, mode: GateMode) -> Self {
        Self {
            cooldown,
            mode,
            state: GateState::Idle,
        }
    }

    /// Feed one smoothed label observed at `now`. Returns `true` if it fires.
    ///
    /// State changes only when the label fires.
    pub fn observe(&mut self, label: &Label, now: Instant) -> bool {
        let fire = match &self.state {
            GateState::Idle => true,
            GateState::Armed {
                last_label,
                last_emit,
            } => {
                let cooled = now.saturating_duration_since(*last_emit) >= self.cooldown;
                let changed = label != last_label;
                match self.mode {
                    GateMode::Retrigger => changed || cooled,
                    GateMode::Strict => changed && cooled,
                }
            }
        };

        if fire {
            self.state = GateState::Armed {
                last_label: label.clone(),
                last_emit: now,
            };
        }
        fire
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn last_emitted(&self) -> Option<&Label> {
        match &self.state {
            GateState::Idle => None,
            GateState::Armed { last_label, .. } => Some(last_label),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }
}
