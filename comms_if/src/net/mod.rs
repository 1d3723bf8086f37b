//! # Network Module
//!
//! Endpoint parameters for the two simulator datagram channels. The simulator listens for
//! commands on one port and publishes telemetry to another, both on localhost.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{net::SocketAddr, time::Duration};
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default endpoint the simulator receives commands on.
pub const DEFAULT_COMMAND_ENDPOINT: &str = "127.0.0.1:3001";

/// Default local address telemetry is received on.
pub const DEFAULT_TELEMETRY_BIND: &str = "0.0.0.0:4001";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters, normally loaded from `net.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetParams {
    /// Address of the simulator's command socket.
    pub command_endpoint: SocketAddr,

    /// Local address the telemetry socket binds to.
    pub telemetry_bind: SocketAddr,

    /// Maximum time a telemetry receive may block before the tick is considered failed.
    ///
    /// Units: milliseconds
    pub recv_timeout_ms: u64
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum NetParamsError {
    #[error("The telemetry receive timeout must be greater than zero")]
    ZeroRecvTimeout,

    #[error("The command endpoint must name a port, found {0}")]
    NoCommandPort(SocketAddr)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NetParams {
    /// The receive timeout as a `Duration`.
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    /// Check the parameters describe usable channels.
    pub fn validate(&self) -> Result<(), NetParamsError> {
        if self.recv_timeout_ms == 0 {
            return Err(NetParamsError::ZeroRecvTimeout)
        }
        if self.command_endpoint.port() == 0 {
            return Err(NetParamsError::NoCommandPort(self.command_endpoint))
        }

        Ok(())
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            command_endpoint: SocketAddr::from(([127, 0, 0, 1], 3001)),
            telemetry_bind: SocketAddr::from(([0, 0, 0, 0], 4001)),
            recv_timeout_ms: 100
        }
    }
}
