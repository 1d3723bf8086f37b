//! # Communications interface crate.
//!
//! Provides the wire interfaces between the drift controller and the driving simulator.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Datagram layouts exchanged with the simulator
pub mod sim;

/// Network module
pub mod net;
