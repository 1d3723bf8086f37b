//! # Drift phase sequencing
//!
//! ```text
//! HANDSHAKE --(warm-up elapsed)--> LAUNCH --(v_x > trigger)--> TRIGGERED --(dwell)--> DRIFTING
//! ```
//!
//! `DRIFTING` is terminal.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Phase of the drift manoeuvre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerPhase {
    /// Sending neutral datagrams so the simulator can register the client.
    Handshake,

    /// Accelerating in a straight line.
    Launch,

    /// Speed reached, waiting out the dwell before steering.
    Triggered,

    /// Drift steering law active.
    Drifting
}

/// Tracks the current phase and decides the transitions.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: ControllerPhase,

    /// Ticks spent in `Triggered`
    dwell_count: u32,

    warmup_s: f64,
    trigger_v_x_ms: f64,
    dwell_ticks: u32
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ControllerPhase {
    fn default() -> Self {
        ControllerPhase::Handshake
    }
}

impl std::fmt::Display for ControllerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControllerPhase::Handshake => "HANDSHAKE",
            ControllerPhase::Launch => "LAUNCH",
            ControllerPhase::Triggered => "TRIGGERED",
            ControllerPhase::Drifting => "DRIFTING"
        };

        write!(f, "{}", name)
    }
}

impl PhaseMachine {
    pub fn new(params: &Params) -> Self {
        Self {
            phase: ControllerPhase::Handshake,
            dwell_count: 0,
            warmup_s: params.handshake_warmup_s,
            trigger_v_x_ms: params.trigger_v_x_ms,
            dwell_ticks: params.dwell_ticks
        }
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    pub fn dwell_count(&self) -> u32 {
        self.dwell_count
    }

    /// Update during the handshake with the time since the run started.
    ///
    /// Returns the new phase if a transition occured.
    pub fn update_handshake(&mut self, elapsed_s: f64) -> Option<ControllerPhase> {
        if self.phase == ControllerPhase::Handshake && elapsed_s >= self.warmup_s {
            self.phase = ControllerPhase::Launch;
            Some(self.phase)
        }
        else {
            None
        }
    }

    /// Update on a driving tick with the measured longitudinal speed.
    ///
    /// Returns the new phase if a transition occured.
    pub fn update_tick(&mut self, v_x_ms: f64) -> Option<ControllerPhase> {
        match self.phase {
            ControllerPhase::Handshake | ControllerPhase::Drifting => None,
            ControllerPhase::Launch => {
                if v_x_ms > self.trigger_v_x_ms {
                    self.phase = ControllerPhase::Triggered;
                    self.dwell_count = 0;
                    Some(self.phase)
                }
                else {
                    None
                }
            },
            ControllerPhase::Triggered => {
                self.dwell_count += 1;

                if self.dwell_count >= self.dwell_ticks {
                    self.phase = ControllerPhase::Drifting;
                    Some(self.phase)
                }
                else {
                    None
                }
            }
        }
    }
}
