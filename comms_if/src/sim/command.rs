//! # Command Datagram
//!
//! Outbound record sent to the simulator every tick:
//!
//! | Field          | Offset | Type |
//! |----------------|--------|------|
//! | `steer_deg`    | 0      | f32  |
//! | `throttle`     | 4      | f32  |
//! | `brake`        | 8      | f32  |
//! | `packet_type`  | 12     | i32  |
//! | `subsystem_id` | 16     | u8   |
//! | `sequence`     | 17     | u8   |

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use super::{check_len, ProtocolError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Length of a command datagram in bytes.
pub const COMMAND_LEN: usize = 18;

/// Identifier byte the simulator expects in every command.
pub const SUBSYSTEM_ID: u8 = 11;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Kind of command packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum PacketType {
    /// Synchronisation packet, all motion fields are zero.
    Handshake = 0,

    /// Driving command.
    Drive = 1
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One command to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Command {
    /// Steering angle.
    ///
    /// Units: degrees
    pub steer_deg: f32,

    /// Throttle demand, nominally between 0 and 1.
    pub throttle: f32,

    /// Brake demand. Always sent as zero by the controller.
    pub brake: f32,

    pub packet_type: PacketType,

    pub subsystem_id: u8,

    /// Diagnostic sequence number, wraps at 256.
    pub sequence: u8
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PacketType {
    /// Get the packet type from its wire value.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(PacketType::Handshake),
            1 => Some(PacketType::Drive),
            _ => None
        }
    }
}

impl Command {
    /// A neutral handshake command.
    pub fn neutral(sequence: u8) -> Self {
        Self {
            steer_deg: 0.0,
            throttle: 0.0,
            brake: 0.0,
            packet_type: PacketType::Handshake,
            subsystem_id: SUBSYSTEM_ID,
            sequence
        }
    }

    /// A driving command with zero brake.
    pub fn drive(steer_deg: f32, throttle: f32, sequence: u8) -> Self {
        Self {
            steer_deg,
            throttle,
            brake: 0.0,
            packet_type: PacketType::Drive,
            subsystem_id: SUBSYSTEM_ID,
            sequence
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode a command into its datagram.
pub fn encode(cmd: &Command) -> [u8; COMMAND_LEN] {
    let mut bytes = [0u8; COMMAND_LEN];

    LittleEndian::write_f32(&mut bytes[0..4], cmd.steer_deg);
    LittleEndian::write_f32(&mut bytes[4..8], cmd.throttle);
    LittleEndian::write_f32(&mut bytes[8..12], cmd.brake);
    LittleEndian::write_i32(&mut bytes[12..16], cmd.packet_type as i32);
    bytes[16] = cmd.subsystem_id;
    bytes[17] = cmd.sequence;

    bytes
}

/// Decode a command datagram.
pub fn decode(bytes: &[u8]) -> Result<Command, ProtocolError> {
    check_len("command", bytes, COMMAND_LEN)?;

    let packet_type_raw = LittleEndian::read_i32(&bytes[12..16]);

    Ok(Command {
        steer_deg: LittleEndian::read_f32(&bytes[0..4]),
        throttle: LittleEndian::read_f32(&bytes[4..8]),
        brake: LittleEndian::read_f32(&bytes[8..12]),
        packet_type: PacketType::from_i32(packet_type_raw)
            .ok_or(ProtocolError::UnknownPacketType(packet_type_raw))?,
        subsystem_id: bytes[16],
        sequence: bytes[17]
    })
}
