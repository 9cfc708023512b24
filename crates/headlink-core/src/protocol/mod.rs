//! Serial Protocol Communication
//!
//! Implements the framed binary protocol spoken by the measurement head:
//! a two-byte sync preamble, one type byte, a fixed-length payload whose
//! size is determined by the type, and a big-endian CRC16 trailer.
//!
//! The link has no escaping and no reliable start-of-frame guarantee, so
//! the decoder resynchronizes on every call and reports garbled input as
//! data rather than failing.

pub mod commands;
mod crc;
mod decoder;
mod error;
mod frame;
pub mod serial;
mod session;
mod stream;

pub use commands::{Command, Reply};
pub use crc::crc16_ccitt;
pub use decoder::{read_message, read_messages, Message};
pub use error::ProtocolError;
pub use frame::encode_frame;
pub use serial::{list_ports, open_port, PortInfo};
pub use session::{Session, SessionConfig};
pub use stream::{Channel, SerialChannel};

/// Sync byte opening every frame ('<').
pub const SYNC_BYTE: u8 = 0x3C;

/// Number of consecutive sync bytes in the preamble.
pub const PREAMBLE_LEN: usize = 2;

/// Size of the trailing checksum in bytes.
pub const CHECKSUM_LEN: usize = 2;

/// Baud rate of the head's UART.
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// Default read timeout in milliseconds.
///
/// The head answers most commands well inside this; homing and restart get
/// longer per-command timeouts (see [`Command::timeout_ms`]).
pub const DEFAULT_TIMEOUT_MS: u64 = 300;

/// Protocol version reported in the handshake.
pub const PROTOCOL_VERSION: u16 = 1;
