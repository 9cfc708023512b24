//! Protocol message types
//!
//! Defines the two one-byte type namespaces of the head protocol: commands
//! the host sends to the head, and replies the head sends back. Four reply
//! codes are host-side synthetic diagnostics that never appear on the wire.

use serde::{Deserialize, Serialize};

use super::DEFAULT_TIMEOUT_MS;

/// Commands the host sends to the head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    /// Set the head tilt angle in milliradians ('A', one byte)
    SetAngle = b'A',

    /// Request the current configuration block ('C')
    ReadConfig = b'C',

    /// Write a new configuration block ('c')
    WriteConfig = b'c',

    /// Start streaming force samples at N samples/second ('D', one byte)
    StartStream = b'D',

    /// Stop streaming force samples ('d')
    StopStream = b'd',

    /// Request the error status bit field ('E')
    ReadErrorStatus = b'E',

    /// Clear the error status bit field ('e')
    ClearErrorStatus = b'e',

    /// Set the target force in millinewtons ('F', u32)
    SetTargetForce = b'F',

    /// Run the homing sequence ('H')
    Home = b'H',

    /// Jog the spindle by a signed number of microsteps ('J', i32)
    Jog = b'J',

    /// Switch the indicator LED on or off ('L', one byte)
    ToggleLed = b'L',

    /// Stop all motion immediately ('N')
    StopAll = b'N',

    /// Request an orientation sample ('O')
    ReadOrientation = b'O',

    /// Request a single force sample ('P')
    ReadForce = b'P',

    /// Restart the head firmware ('R')
    Restart = b'R',

    /// Hold the previously set target force ('S')
    MaintainForce = b'S',

    /// Handshake: announce host protocol version and wall clock ('V')
    Hello = b'V',

    /// Zero both force channels ('Z')
    ZeroForces = b'Z',
}

/// Every command, in code order. Drives the schema consistency check.
pub(crate) const ALL_COMMANDS: [Command; 18] = [
    Command::SetAngle,
    Command::ReadConfig,
    Command::WriteConfig,
    Command::StartStream,
    Command::StopStream,
    Command::ReadErrorStatus,
    Command::ClearErrorStatus,
    Command::SetTargetForce,
    Command::Home,
    Command::Jog,
    Command::ToggleLed,
    Command::StopAll,
    Command::ReadOrientation,
    Command::ReadForce,
    Command::Restart,
    Command::MaintainForce,
    Command::Hello,
    Command::ZeroForces,
];

impl Command {
    /// The wire type byte
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look a command up by its wire code
    pub fn from_code(code: u8) -> Option<Self> {
        ALL_COMMANDS.iter().copied().find(|c| c.code() == code)
    }

    /// Whether the head acknowledges this command with an `Ack` frame
    pub fn expects_ack(&self) -> bool {
        !matches!(
            self,
            Command::ReadConfig
                | Command::StartStream
                | Command::StopStream
                | Command::ReadErrorStatus
                | Command::ReadOrientation
                | Command::ReadForce
                | Command::Hello
        )
    }

    /// Expected response timeout in milliseconds
    pub fn timeout_ms(&self) -> u64 {
        match self {
            Command::Home => 5000,    // homing runs until the touch probe trips
            Command::Restart => 2000, // firmware reboot
            Command::Hello => 500,
            _ => DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Replies the head sends to the host, plus the synthetic diagnostics
///
/// Codes `0x00`–`0x03` are produced by the decoder on this side of the
/// link; the head never transmits them. They sit below every printable
/// command code and are checked against collisions when the schema table
/// is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Reply {
    /// Nothing arrived before the timeout; routine on an idle link
    NoMessage = 0x00,

    /// A type byte with no schema entry; protocol-version skew or noise
    UnknownType = 0x01,

    /// Fewer bytes arrived than the type's payload requires
    FramingError = 0x02,

    /// Checksum mismatch; the frame was corrupted in transit
    CrcError = 0x03,

    /// Command accepted (ASCII ACK)
    Ack = 0x06,

    /// Command rejected (ASCII NAK)
    Nak = 0x15,

    /// Configuration block ('C')
    Config = b'C',

    /// Error status bit field ('E')
    ErrorStatus = b'E',

    /// Orientation sample ('O')
    Orientation = b'O',

    /// Force sample ('P')
    ForceSample = b'P',

    /// Handshake acknowledgement carrying the head's protocol version ('v')
    HandshakeAck = b'v',
}

/// Every reply, in code order. Drives the schema consistency check.
pub(crate) const ALL_REPLIES: [Reply; 11] = [
    Reply::NoMessage,
    Reply::UnknownType,
    Reply::FramingError,
    Reply::CrcError,
    Reply::Ack,
    Reply::Nak,
    Reply::Config,
    Reply::ErrorStatus,
    Reply::Orientation,
    Reply::ForceSample,
    Reply::HandshakeAck,
];

impl Reply {
    /// The wire type byte (synthetic for the diagnostics)
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look a reply up by its code
    pub fn from_code(code: u8) -> Option<Self> {
        ALL_REPLIES.iter().copied().find(|r| r.code() == code)
    }

    /// Whether this is a host-side diagnostic rather than a device message
    pub fn is_synthetic(&self) -> bool {
        matches!(
            self,
            Reply::NoMessage | Reply::UnknownType | Reply::FramingError | Reply::CrcError
        )
    }
}
