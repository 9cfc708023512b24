//! Message Schema Table
//!
//! Maps every message type code to its fixed payload shape: the exact byte
//! length plus the decode and encode operations for that shape. The table
//! is the single source of truth the encoder and decoder dispatch through;
//! neither hardcodes payload layouts.
//!
//! The table is built once at startup, consistency-checked, and shared
//! process-wide as an immutable value. Lookup failure is reported to the
//! caller as a diagnostic, never a panic.

mod payload;

pub use payload::{ConfigBlock, ForceSample, HandshakeInfo, OrientationSample, Payload};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

use crate::protocol::commands::{Command, Reply, ALL_COMMANDS, ALL_REPLIES};

/// Errors detected while building the schema table
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Duplicate schema entry for code {code:#04x} ({direction:?})")]
    DuplicateEntry {
        /// The doubly-defined type code
        code: u8,
        /// Which namespace the duplicate appeared in
        direction: Direction,
    },

    #[error("No schema entry for code {code:#04x} ({direction:?})")]
    MissingEntry {
        /// The unmapped type code
        code: u8,
        /// Which namespace is missing it
        direction: Direction,
    },

    #[error("Synthetic diagnostic code {code:#04x} collides with a device reply")]
    DiagnosticCollision {
        /// The colliding code
        code: u8,
    },

    #[error("Synthetic diagnostic code {code:#04x} must map to the empty shape")]
    DiagnosticPayload {
        /// The offending code
        code: u8,
    },
}

/// Which side of the link a type code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Host → head commands
    ToDevice,
    /// Head → host replies (and host-side synthetic diagnostics)
    ToHost,
}

/// Fixed payload shape for one message type
#[derive(Debug, Clone, Copy)]
pub struct MessageSpec {
    /// Shape name, used in mismatch diagnostics
    pub shape: &'static str,
    /// Exact payload length in bytes
    pub payload_len: usize,
    /// Decode a payload of exactly `payload_len` bytes
    pub decode: fn(&[u8]) -> Payload,
    /// Encode a payload value; `None` when the value is not of this shape
    pub encode: fn(&Payload) -> Option<Vec<u8>>,
}

const EMPTY: MessageSpec = MessageSpec {
    shape: "empty",
    payload_len: 0,
    decode: payload::decode_empty,
    encode: payload::encode_empty,
};

const BYTE: MessageSpec = MessageSpec {
    shape: "byte",
    payload_len: 1,
    decode: payload::decode_byte,
    encode: payload::encode_byte,
};

const STEPS: MessageSpec = MessageSpec {
    shape: "signed step count",
    payload_len: 4,
    decode: payload::decode_steps,
    encode: payload::encode_steps,
};

const WORD: MessageSpec = MessageSpec {
    shape: "32-bit word",
    payload_len: 4,
    decode: payload::decode_word,
    encode: payload::encode_word,
};

const VERSION: MessageSpec = MessageSpec {
    shape: "protocol version",
    payload_len: 2,
    decode: payload::decode_version,
    encode: payload::encode_version,
};

const FORCE: MessageSpec = MessageSpec {
    shape: "force sample",
    payload_len: ForceSample::WIRE_LEN,
    decode: payload::decode_force,
    encode: payload::encode_force,
};

const ORIENTATION: MessageSpec = MessageSpec {
    shape: "orientation sample",
    payload_len: OrientationSample::WIRE_LEN,
    decode: payload::decode_orientation,
    encode: payload::encode_orientation,
};

const CONFIG: MessageSpec = MessageSpec {
    shape: "config block",
    payload_len: ConfigBlock::WIRE_LEN,
    decode: payload::decode_config,
    encode: payload::encode_config,
};

const HANDSHAKE: MessageSpec = MessageSpec {
    shape: "handshake info",
    payload_len: HandshakeInfo::WIRE_LEN,
    decode: payload::decode_handshake,
    encode: payload::encode_handshake,
};

/// Dispatch table for both directions of the link
pub struct SchemaTable {
    to_device: HashMap<u8, MessageSpec>,
    to_host: HashMap<u8, MessageSpec>,
}

static GLOBAL: OnceLock<SchemaTable> = OnceLock::new();

impl SchemaTable {
    /// The process-wide table, built and checked on first use.
    pub fn global() -> Result<&'static SchemaTable, SchemaError> {
        if let Some(table) = GLOBAL.get() {
            return Ok(table);
        }
        let built = SchemaTable::builtin()?;
        Ok(GLOBAL.get_or_init(|| built))
    }

    /// Build the table for the head's current firmware and run the
    /// startup consistency checks.
    pub fn builtin() -> Result<Self, SchemaError> {
        let mut table = Self {
            to_device: HashMap::new(),
            to_host: HashMap::new(),
        };

        for cmd in ALL_COMMANDS {
            let spec = match cmd {
                Command::SetAngle | Command::StartStream | Command::ToggleLed => BYTE,
                Command::Jog => STEPS,
                Command::SetTargetForce => WORD,
                Command::WriteConfig => CONFIG,
                Command::Hello => HANDSHAKE,
                _ => EMPTY,
            };
            table.insert(Direction::ToDevice, cmd.code(), spec)?;
        }

        for reply in ALL_REPLIES {
            let spec = match reply {
                Reply::Config => CONFIG,
                Reply::ErrorStatus => WORD,
                Reply::Orientation => ORIENTATION,
                Reply::ForceSample => FORCE,
                Reply::HandshakeAck => VERSION,
                _ => EMPTY,
            };
            table.insert(Direction::ToHost, reply.code(), spec)?;
        }

        table.check_diagnostics()?;
        Ok(table)
    }

    /// Look up the shape for a type code in the given direction.
    pub fn lookup(&self, direction: Direction, code: u8) -> Option<&MessageSpec> {
        match direction {
            Direction::ToDevice => self.to_device.get(&code),
            Direction::ToHost => self.to_host.get(&code),
        }
    }

    fn insert(
        &mut self,
        direction: Direction,
        code: u8,
        spec: MessageSpec,
    ) -> Result<(), SchemaError> {
        let map = match direction {
            Direction::ToDevice => &mut self.to_device,
            Direction::ToHost => &mut self.to_host,
        };
        if map.insert(code, spec).is_some() {
            return Err(SchemaError::DuplicateEntry { code, direction });
        }
        Ok(())
    }

    /// The synthetic diagnostic codes are host-side only: they must be
    /// mapped, carry no payload, and share a code with no device reply.
    fn check_diagnostics(&self) -> Result<(), SchemaError> {
        for reply in ALL_REPLIES.iter().filter(|r| r.is_synthetic()) {
            let code = reply.code();
            if ALL_REPLIES
                .iter()
                .any(|other| !other.is_synthetic() && other.code() == code)
            {
                return Err(SchemaError::DiagnosticCollision { code });
            }
            match self.to_host.get(&code) {
                Some(spec) if spec.payload_len == 0 => {}
                Some(_) => return Err(SchemaError::DiagnosticPayload { code }),
                None => {
                    return Err(SchemaError::MissingEntry {
                        code,
                        direction: Direction::ToHost,
                    })
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_consistent() {
        assert!(SchemaTable::builtin().is_ok());
    }

    #[test]
    fn test_every_command_is_mapped() {
        let table = SchemaTable::builtin().unwrap();
        for cmd in ALL_COMMANDS {
            assert!(
                table.lookup(Direction::ToDevice, cmd.code()).is_some(),
                "{cmd:?} has no schema entry"
            );
        }
    }

    #[test]
    fn test_every_reply_is_mapped() {
        let table = SchemaTable::builtin().unwrap();
        for reply in ALL_REPLIES {
            assert!(table.lookup(Direction::ToHost, reply.code()).is_some());
        }
    }

    #[test]
    fn test_unmapped_code_is_none() {
        let table = SchemaTable::builtin().unwrap();
        assert!(table.lookup(Direction::ToHost, b'Q').is_none());
        assert!(table.lookup(Direction::ToDevice, 0xFE).is_none());
    }

    #[test]
    fn test_payload_lengths_match_wire_layouts() {
        let table = SchemaTable::builtin().unwrap();
        let force = table
            .lookup(Direction::ToHost, Reply::ForceSample.code())
            .unwrap();
        assert_eq!(force.payload_len, 12);

        let config = table
            .lookup(Direction::ToHost, Reply::Config.code())
            .unwrap();
        assert_eq!(config.payload_len, 80);

        let hello = table
            .lookup(Direction::ToDevice, Command::Hello.code())
            .unwrap();
        assert_eq!(hello.payload_len, 8);
    }

    #[test]
    fn test_global_table_is_shared() {
        let a = SchemaTable::global().unwrap() as *const SchemaTable;
        let b = SchemaTable::global().unwrap() as *const SchemaTable;
        assert_eq!(a, b);
    }
}
