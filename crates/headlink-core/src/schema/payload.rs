//! Payload shapes
//!
//! Typed views of every fixed-length payload the head exchanges, with their
//! wire codecs. All multi-byte fields are little-endian; decode and encode
//! are bit-exact inverses for conformant inputs.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Payload value of a single message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// No payload
    Empty,

    /// Single raw byte (angle, stream rate, LED state)
    Byte(u8),

    /// Signed microstep count (jog)
    Steps(i32),

    /// Unsigned 32-bit word (target force, error status)
    Word(u32),

    /// Protocol version (handshake acknowledgement)
    Version(u16),

    /// Force sample
    Force(ForceSample),

    /// Orientation sample
    Orientation(OrientationSample),

    /// Configuration block
    Config(ConfigBlock),

    /// Handshake announcement
    Handshake(HandshakeInfo),

    /// Raw bytes retained from a partial or corrupted frame
    Diagnostic {
        /// Type byte of the offending frame
        type_byte: u8,
        /// Payload and checksum bytes exactly as received
        bytes: Vec<u8>,
    },
}

/// One force measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceSample {
    /// Firmware status bits at sample time
    pub device_status: u16,
    /// Milliseconds since the head booted (wraps)
    pub millis_since_start: u16,
    /// Normal force in millinewtons
    pub normal_mn: i32,
    /// Tangential force in millinewtons
    pub tangential_mn: i32,
}

impl ForceSample {
    /// Wire size in bytes
    pub const WIRE_LEN: usize = 12;

    /// Decode from exactly [`Self::WIRE_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            device_status: LittleEndian::read_u16(&bytes[0..2]),
            millis_since_start: LittleEndian::read_u16(&bytes[2..4]),
            normal_mn: LittleEndian::read_i32(&bytes[4..8]),
            tangential_mn: LittleEndian::read_i32(&bytes[8..12]),
        }
    }

    /// Encode to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::WIRE_LEN];
        LittleEndian::write_u16(&mut out[0..2], self.device_status);
        LittleEndian::write_u16(&mut out[2..4], self.millis_since_start);
        LittleEndian::write_i32(&mut out[4..8], self.normal_mn);
        LittleEndian::write_i32(&mut out[8..12], self.tangential_mn);
        out
    }
}

/// One orientation measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    /// Incline angle in radians
    pub incline: f32,
    /// Roll angle in radians
    pub roll: f32,
    /// Creep angle in milliradians
    pub creep_angle: u8,
}

impl OrientationSample {
    /// Wire size in bytes
    pub const WIRE_LEN: usize = 9;

    /// Decode from exactly [`Self::WIRE_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            incline: LittleEndian::read_f32(&bytes[0..4]),
            roll: LittleEndian::read_f32(&bytes[4..8]),
            creep_angle: bytes[8],
        }
    }

    /// Encode to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::WIRE_LEN];
        LittleEndian::write_f32(&mut out[0..4], self.incline);
        LittleEndian::write_f32(&mut out[4..8], self.roll);
        out[8] = self.creep_angle;
        out
    }
}

/// The head's configuration block (20 four-byte fields)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigBlock {
    /// Stepper driver microsteps per full step
    pub microsteps_per_step: u32,
    /// Force controller proportional gain
    pub pid_p: f32,
    /// Force controller integral gain
    pub pid_i: f32,
    /// Force controller derivative gain
    pub pid_d: f32,
    /// Normal channel load limit in millinewtons
    pub normal_max_load: f32,
    /// Tangential channel load limit in millinewtons
    pub tangential_max_load: f32,
    /// Belt drive reduction ratio
    pub belt_ratio: f32,
    /// Spindle thread pitch in millimetres
    pub thread_pitch: f32,
    /// Approach speed in millimetres per second
    pub approach_speed: f32,
    /// Homing speed in millimetres per second
    pub home_speed: f32,
    /// Travel after touch in the normal direction, millimetres
    pub normal_travel: f32,
    /// Travel when unloading, millimetres
    pub unload_travel: f32,
    /// Homing timeout in milliseconds
    pub homing_timeout: u32,
    /// Touch detection threshold in millinewtons
    pub touch_force_mn: u32,
    /// Derivative control output clamp
    pub max_deriv_control: f32,
    /// Integral error accumulator clamp
    pub max_integral_error: f32,
    /// Motion acceleration limit
    pub max_acceleration: f32,
    /// Motion speed limit
    pub max_speed: f32,
    /// Normal channel ADC-to-millinewton scale
    pub n_force_scale: f32,
    /// Tangential channel ADC-to-millinewton scale
    pub t_force_scale: f32,
}

impl ConfigBlock {
    /// Wire size in bytes
    pub const WIRE_LEN: usize = 80;

    /// Decode from exactly [`Self::WIRE_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let f = |i: usize| LittleEndian::read_f32(&bytes[i * 4..i * 4 + 4]);
        let u = |i: usize| LittleEndian::read_u32(&bytes[i * 4..i * 4 + 4]);
        Self {
            microsteps_per_step: u(0),
            pid_p: f(1),
            pid_i: f(2),
            pid_d: f(3),
            normal_max_load: f(4),
            tangential_max_load: f(5),
            belt_ratio: f(6),
            thread_pitch: f(7),
            approach_speed: f(8),
            home_speed: f(9),
            normal_travel: f(10),
            unload_travel: f(11),
            homing_timeout: u(12),
            touch_force_mn: u(13),
            max_deriv_control: f(14),
            max_integral_error: f(15),
            max_acceleration: f(16),
            max_speed: f(17),
            n_force_scale: f(18),
            t_force_scale: f(19),
        }
    }

    /// Encode to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::WIRE_LEN];
        LittleEndian::write_u32(&mut out[0..4], self.microsteps_per_step);
        LittleEndian::write_f32(&mut out[4..8], self.pid_p);
        LittleEndian::write_f32(&mut out[8..12], self.pid_i);
        LittleEndian::write_f32(&mut out[12..16], self.pid_d);
        LittleEndian::write_f32(&mut out[16..20], self.normal_max_load);
        LittleEndian::write_f32(&mut out[20..24], self.tangential_max_load);
        LittleEndian::write_f32(&mut out[24..28], self.belt_ratio);
        LittleEndian::write_f32(&mut out[28..32], self.thread_pitch);
        LittleEndian::write_f32(&mut out[32..36], self.approach_speed);
        LittleEndian::write_f32(&mut out[36..40], self.home_speed);
        LittleEndian::write_f32(&mut out[40..44], self.normal_travel);
        LittleEndian::write_f32(&mut out[44..48], self.unload_travel);
        LittleEndian::write_u32(&mut out[48..52], self.homing_timeout);
        LittleEndian::write_u32(&mut out[52..56], self.touch_force_mn);
        LittleEndian::write_f32(&mut out[56..60], self.max_deriv_control);
        LittleEndian::write_f32(&mut out[60..64], self.max_integral_error);
        LittleEndian::write_f32(&mut out[64..68], self.max_acceleration);
        LittleEndian::write_f32(&mut out[68..72], self.max_speed);
        LittleEndian::write_f32(&mut out[72..76], self.n_force_scale);
        LittleEndian::write_f32(&mut out[76..80], self.t_force_scale);
        out
    }
}

impl Default for ConfigBlock {
    fn default() -> Self {
        // Bench defaults for a stock head; real values come from the device.
        Self {
            microsteps_per_step: 16,
            pid_p: 0.8,
            pid_i: 0.05,
            pid_d: 0.01,
            normal_max_load: 20_000.0,
            tangential_max_load: 10_000.0,
            belt_ratio: 3.0,
            thread_pitch: 2.0,
            approach_speed: 1.5,
            home_speed: 4.0,
            normal_travel: 12.0,
            unload_travel: 2.0,
            homing_timeout: 30_000,
            touch_force_mn: 150,
            max_deriv_control: 500.0,
            max_integral_error: 1_000.0,
            max_acceleration: 80.0,
            max_speed: 10.0,
            n_force_scale: 0.061,
            t_force_scale: 0.094,
        }
    }
}

/// Handshake announcement sent by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandshakeInfo {
    /// Host protocol version
    pub protocol_version: u16,
    /// Host wall clock, seconds since the Unix epoch
    pub unix_seconds: u32,
    /// Sub-second milliseconds of the host wall clock
    pub millis: u16,
}

impl HandshakeInfo {
    /// Wire size in bytes
    pub const WIRE_LEN: usize = 8;

    /// Decode from exactly [`Self::WIRE_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            protocol_version: LittleEndian::read_u16(&bytes[0..2]),
            unix_seconds: LittleEndian::read_u32(&bytes[2..6]),
            millis: LittleEndian::read_u16(&bytes[6..8]),
        }
    }

    /// Encode to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::WIRE_LEN];
        LittleEndian::write_u16(&mut out[0..2], self.protocol_version);
        LittleEndian::write_u32(&mut out[2..6], self.unix_seconds);
        LittleEndian::write_u16(&mut out[6..8], self.millis);
        out
    }
}

// Table entry points. Decoders are handed exactly the declared number of
// bytes; encoders return None when the value is not of the declared shape.

pub(crate) fn decode_empty(_bytes: &[u8]) -> Payload {
    Payload::Empty
}

pub(crate) fn encode_empty(value: &Payload) -> Option<Vec<u8>> {
    matches!(value, Payload::Empty).then(Vec::new)
}

pub(crate) fn decode_byte(bytes: &[u8]) -> Payload {
    Payload::Byte(bytes[0])
}

pub(crate) fn encode_byte(value: &Payload) -> Option<Vec<u8>> {
    match value {
        Payload::Byte(b) => Some(vec![*b]),
        _ => None,
    }
}

pub(crate) fn decode_steps(bytes: &[u8]) -> Payload {
    Payload::Steps(LittleEndian::read_i32(bytes))
}

pub(crate) fn encode_steps(value: &Payload) -> Option<Vec<u8>> {
    match value {
        Payload::Steps(v) => {
            let mut out = vec![0u8; 4];
            LittleEndian::write_i32(&mut out, *v);
            Some(out)
        }
        _ => None,
    }
}

pub(crate) fn decode_word(bytes: &[u8]) -> Payload {
    Payload::Word(LittleEndian::read_u32(bytes))
}

pub(crate) fn encode_word(value: &Payload) -> Option<Vec<u8>> {
    match value {
        Payload::Word(v) => {
            let mut out = vec![0u8; 4];
            LittleEndian::write_u32(&mut out, *v);
            Some(out)
        }
        _ => None,
    }
}

pub(crate) fn decode_version(bytes: &[u8]) -> Payload {
    Payload::Version(LittleEndian::read_u16(bytes))
}

pub(crate) fn encode_version(value: &Payload) -> Option<Vec<u8>> {
    match value {
        Payload::Version(v) => {
            let mut out = vec![0u8; 2];
            LittleEndian::write_u16(&mut out, *v);
            Some(out)
        }
        _ => None,
    }
}

pub(crate) fn decode_force(bytes: &[u8]) -> Payload {
    Payload::Force(ForceSample::from_bytes(bytes))
}

pub(crate) fn encode_force(value: &Payload) -> Option<Vec<u8>> {
    match value {
        Payload::Force(sample) => Some(sample.to_bytes()),
        _ => None,
    }
}

pub(crate) fn decode_orientation(bytes: &[u8]) -> Payload {
    Payload::Orientation(OrientationSample::from_bytes(bytes))
}

pub(crate) fn encode_orientation(value: &Payload) -> Option<Vec<u8>> {
    match value {
        Payload::Orientation(sample) => Some(sample.to_bytes()),
        _ => None,
    }
}

pub(crate) fn decode_config(bytes: &[u8]) -> Payload {
    Payload::Config(ConfigBlock::from_bytes(bytes))
}

pub(crate) fn encode_config(value: &Payload) -> Option<Vec<u8>> {
    match value {
        Payload::Config(block) => Some(block.to_bytes()),
        _ => None,
    }
}

pub(crate) fn decode_handshake(bytes: &[u8]) -> Payload {
    Payload::Handshake(HandshakeInfo::from_bytes(bytes))
}

pub(crate) fn encode_handshake(value: &Payload) -> Option<Vec<u8>> {
    match value {
        Payload::Handshake(info) => Some(info.to_bytes()),
        _ => None,
    }
}
