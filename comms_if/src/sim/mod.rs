//! # Simulator Datagrams
//!
//! Fixed layout records exchanged with the driving simulator over UDP. Both directions use
//! little-endian byte order with no padding.
//!
//! - [`telemetry`]: the large inbound record published by the simulator every step.
//! - [`command`]: the short outbound steering/throttle record.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod command;
pub mod telemetry;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised while decoding a datagram.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Expected a {expected} byte {kind} datagram, found {found} bytes")]
    WrongLength {
        kind: &'static str,
        expected: usize,
        found: usize
    },

    #[error("Unknown command packet type {0}")]
    UnknownPacketType(i32)
}

/// The primitive types found in the datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    F32,
    I32,
    U8
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WireType {
    /// Number of bytes one value of this type occupies on the wire.
    pub const fn width(self) -> usize {
        match self {
            WireType::F32 | WireType::I32 => 4,
            WireType::U8 => 1
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Check that a datagram has exactly the expected length.
pub(crate) fn check_len(kind: &'static str, bytes: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if bytes.len() != expected {
        return Err(ProtocolError::WrongLength {
            kind,
            expected,
            found: bytes.len()
        })
    }

    Ok(())
}
