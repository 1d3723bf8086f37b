//! # Drift control module
//!
//! Drift control takes the car from a standing start into a steady-state drift and holds it there.
//! It runs through four phases (see [`ControllerPhase`]): a handshake so the simulator registers
//! the client, a straight-line launch, a short dwell once the trigger speed is crossed, and then
//! the drift itself.
//!
//! While drifting the steering angle is a linear feedback on lateral speed and yaw rate around an
//! equilibrium found offline from the identified tyre model, and throttle holds the longitudinal
//! speed with a proportional law. Commands computed from one telemetry frame are sent on the next
//! tick.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod laws;
pub mod params;
pub mod phase;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use laws::*;
pub use params::Params;
pub use phase::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during DriftCtrl operation.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum DriftCtrlError {
    #[error("DriftCtrl has not been initialised")]
    NotInit,

    #[error("A vehicle state is required in the {0} phase but none was provided")]
    NoVehicleState(ControllerPhase)
}
