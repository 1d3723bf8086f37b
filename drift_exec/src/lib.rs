//! # Drift library.
//!
//! This library allows other crates in the workspace, the integration tests and the benchmarks to
//! access items defined inside the drift crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Drift control module - sequences the manoeuvre and computes steering and throttle demands
pub mod drift_ctrl;

/// State estimator - converts world frame telemetry into body frame vehicle state
pub mod est;

/// Parameters for the drift executable
pub mod params;

/// Run loop - owns the simulator link and drives the controller tick by tick
pub mod run;

/// Simulation client - UDP link to the simulator
pub mod sim_client;

/// Tyre model - Magic Formula lateral forces and measured axle forces
pub mod tyre;
