//! # Telemetry Datagram
//!
//! The simulator publishes one 794 byte record per step. Only a handful of its fields are used
//! by the controller, the rest is opaque payload which must still be skipped.
//!
//! ## Layout
//!
//! | Block           | Offset | Count | Type               |
//! |-----------------|--------|-------|--------------------|
//! | `head`          | 0      | 32    | 4 byte f32/i32 mix |
//! | `head_flag`     | 128    | 1     | u8                 |
//! | `opaque_bytes`  | 129    | 39    | u8                 |
//! | `opaque_floats` | 168    | 156   | f32                |
//! | `trailer`       | 792    | 2     | u8                 |
//!
//! The fields extracted from the record are listed in [`TELEMETRY_FIELDS`], which is the only
//! place their offsets are defined.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use super::{check_len, ProtocolError, WireType};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Length of a telemetry datagram in bytes.
pub const TELEMETRY_LEN: usize = 794;

/// Contiguous blocks making up the telemetry record, in wire order.
pub const TELEMETRY_BLOCKS: [Block; 5] = [
    Block { name: "head", offset: 0, count: 32, ty: WireType::F32 },
    Block { name: "head_flag", offset: 128, count: 1, ty: WireType::U8 },
    Block { name: "opaque_bytes", offset: 129, count: 39, ty: WireType::U8 },
    Block { name: "opaque_floats", offset: 168, count: 156, ty: WireType::F32 },
    Block { name: "trailer", offset: 792, count: 2, ty: WireType::U8 },
];

/// Named telemetry fields consumed by the controller.
pub mod field {
    use super::{Field, WireType};

    /// Packet type tag of the record.
    pub const PACKET_TYPE: Field = Field { name: "packet_type", offset: 12, ty: WireType::I32 };

    /// Rear left wheel angular velocity, rad/s.
    pub const WHEEL_SPIN_RL: Field = Field { name: "wheel_spin_rl", offset: 36, ty: WireType::F32 };

    /// Rear right wheel angular velocity, rad/s.
    pub const WHEEL_SPIN_RR: Field = Field { name: "wheel_spin_rr", offset: 40, ty: WireType::F32 };

    /// Heading of the car in the world frame, rad.
    pub const YAW: Field = Field { name: "yaw", offset: 64, ty: WireType::F32 };

    /// Yaw rate of the body, rad/s.
    pub const YAW_RATE: Field = Field { name: "yaw_rate", offset: 76, ty: WireType::F32 };

    /// World frame X velocity, m/s.
    pub const VEL_X_WORLD: Field = Field { name: "vel_x_world", offset: 80, ty: WireType::F32 };

    /// World frame Y velocity, m/s.
    pub const VEL_Y_WORLD: Field = Field { name: "vel_y_world", offset: 84, ty: WireType::F32 };

    /// Sequence byte, the last byte of the record.
    pub const SEQUENCE: Field = Field { name: "sequence", offset: 793, ty: WireType::U8 };
}

/// Every field extracted from the telemetry record.
pub const TELEMETRY_FIELDS: [Field; 8] = [
    field::PACKET_TYPE,
    field::WHEEL_SPIN_RL,
    field::WHEEL_SPIN_RR,
    field::YAW,
    field::YAW_RATE,
    field::VEL_X_WORLD,
    field::VEL_Y_WORLD,
    field::SEQUENCE,
];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A contiguous run of same-width values in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub name: &'static str,
    pub offset: usize,
    pub count: usize,
    pub ty: WireType
}

/// A named value at a fixed offset in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub ty: WireType
}

/// The subset of one telemetry record used by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TelemetryFrame {
    pub packet_type: i32,
    pub sequence: u8,

    /// Units: meters/second, Frame: world
    pub vel_x_world_ms: f32,

    /// Units: meters/second, Frame: world
    pub vel_y_world_ms: f32,

    /// Units: radians
    pub yaw_rad: f32,

    /// Units: radians/second
    pub yaw_rate_rads: f32,

    /// Units: radians/second
    pub wheel_spin_rl_rads: f32,

    /// Units: radians/second
    pub wheel_spin_rr_rads: f32
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Block {
    /// Offset of the first byte after this block.
    pub const fn end(&self) -> usize {
        self.offset + self.count * self.ty.width()
    }
}

impl Field {
    /// Byte range of the field within the record.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.ty.width()
    }
}

impl TelemetryFrame {
    /// Mean angular velocity of the two rear wheels.
    ///
    /// Units: radians/second
    pub fn rear_wheel_spin_rads(&self) -> f64 {
        (self.wheel_spin_rl_rads as f64 + self.wheel_spin_rr_rads as f64) / 2.0
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decode a telemetry datagram.
///
/// The datagram must be exactly [`TELEMETRY_LEN`] bytes long.
pub fn decode(bytes: &[u8]) -> Result<TelemetryFrame, ProtocolError> {
    check_len("telemetry", bytes, TELEMETRY_LEN)?;

    Ok(TelemetryFrame {
        packet_type: LittleEndian::read_i32(&bytes[field::PACKET_TYPE.range()]),
        sequence: bytes[field::SEQUENCE.offset],
        vel_x_world_ms: read_f32(bytes, field::VEL_X_WORLD),
        vel_y_world_ms: read_f32(bytes, field::VEL_Y_WORLD),
        yaw_rad: read_f32(bytes, field::YAW),
        yaw_rate_rads: read_f32(bytes, field::YAW_RATE),
        wheel_spin_rl_rads: read_f32(bytes, field::WHEEL_SPIN_RL),
        wheel_spin_rr_rads: read_f32(bytes, field::WHEEL_SPIN_RR)
    })
}

/// Encode a frame into a full telemetry record.
///
/// Fields not held by the frame are zeroed. Used for loopback testing and replaying archived
/// frames towards a controller.
pub fn encode(frame: &TelemetryFrame) -> [u8; TELEMETRY_LEN] {
    let mut bytes = [0u8; TELEMETRY_LEN];

    LittleEndian::write_i32(&mut bytes[field::PACKET_TYPE.range()], frame.packet_type);
    bytes[field::SEQUENCE.offset] = frame.sequence;
    write_f32(&mut bytes, field::VEL_X_WORLD, frame.vel_x_world_ms);
    write_f32(&mut bytes, field::VEL_Y_WORLD, frame.vel_y_world_ms);
    write_f32(&mut bytes, field::YAW, frame.yaw_rad);
    write_f32(&mut bytes, field::YAW_RATE, frame.yaw_rate_rads);
    write_f32(&mut bytes, field::WHEEL_SPIN_RL, frame.wheel_spin_rl_rads);
    write_f32(&mut bytes, field::WHEEL_SPIN_RR, frame.wheel_spin_rr_rads);

    bytes
}

fn read_f32(bytes: &[u8], field: Field) -> f32 {
    debug_assert_eq!(field.ty, WireType::F32);
    LittleEndian::read_f32(&bytes[field.range()])
}

fn write_f32(bytes: &mut [u8], field: Field, value: f32) {
    debug_assert_eq!(field.ty, WireType::F32);
    LittleEndian::write_f32(&mut bytes[field.range()], value)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_blocks_cover_record() {
        let mut offset = 0;
        for block in TELEMETRY_BLOCKS.iter() {
            assert_eq!(block.offset, offset, "gap before block {}", block.name);
            offset = block.end();
        }
        assert_eq!(offset, TELEMETRY_LEN);
    }

    #[test]
    fn test_fields_inside_blocks() {
        for f in TELEMETRY_FIELDS.iter() {
            let block = TELEMETRY_BLOCKS
                .iter()
                .find(|b| f.offset >= b.offset && f.range().end <= b.end())
                .unwrap_or_else(|| panic!("field {} is not inside any block", f.name));

            // Fields must sit on a value boundary of the block they're in
            assert_eq!(block.ty.width(), f.ty.width(), "field {} width", f.name);
            assert_eq!((f.offset - block.offset) % block.ty.width(), 0, "field {} alignment", f.name);
        }
    }

    #[test]
    fn test_decode_known_offsets() {
        let mut bytes = vec![0u8; TELEMETRY_LEN];
        bytes[36..40].copy_from_slice(&30.0f32.to_le_bytes());
        bytes[40..44].copy_from_slice(&32.0f32.to_le_bytes());
        bytes[64..68].copy_from_slice(&1.25f32.to_le_bytes());
        bytes[76..80].copy_from_slice(&0.5f32.to_le_bytes());
        bytes[80..84].copy_from_slice(&13.5f32.to_le_bytes());
        bytes[84..88].copy_from_slice(&(-2.0f32).to_le_bytes());
        bytes[12..16].copy_from_slice(&7i32.to_le_bytes());
        bytes[793] = 42;

        // Noise in the opaque payload must not leak into the frame
        for b in bytes[129..168].iter_mut() {
            *b = 0xAA;
        }

        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.packet_type, 7);
        assert_eq!(frame.sequence, 42);
        assert_eq!(frame.wheel_spin_rl_rads, 30.0);
        assert_eq!(frame.wheel_spin_rr_rads, 32.0);
        assert_eq!(frame.yaw_rad, 1.25);
        assert_eq!(frame.yaw_rate_rads, 0.5);
        assert_eq!(frame.vel_x_world_ms, 13.5);
        assert_eq!(frame.vel_y_world_ms, -2.0);
        assert_eq!(frame.rear_wheel_spin_rads(), 31.0);
    }

    #[test]
    fn test_decode_wrong_length() {
        assert_eq!(
            decode(&[0u8; TELEMETRY_LEN - 1]),
            Err(ProtocolError::WrongLength {
                kind: "telemetry",
                expected: TELEMETRY_LEN,
                found: TELEMETRY_LEN - 1
            })
        );
        assert!(decode(&[0u8; TELEMETRY_LEN + 1]).is_err());
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_encode_decode() {
        let frame = TelemetryFrame {
            packet_type: 1,
            sequence: 255,
            vel_x_world_ms: 12.0,
            vel_y_world_ms: -7.5,
            yaw_rad: -3.0,
            yaw_rate_rads: 0.505,
            wheel_spin_rl_rads: 40.0,
            wheel_spin_rr_rads: 41.0
        };

        assert_eq!(decode(&encode(&frame)).unwrap(), frame);
    }
}
