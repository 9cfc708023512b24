//! Frame decoder / synchronizer
//!
//! Turns the raw byte stream into typed messages. The link carries no
//! escaping and gives no reliable start-of-frame guarantee, so every call
//! hunts for the sync preamble one byte at a time, validates the checksum,
//! and reports anything partial or garbled as a synthetic diagnostic
//! message instead of an error — a live link produces those routinely.
//!
//! Each call starts fresh and returns exactly one outcome; no decoder
//! state survives between calls.

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::commands::{Command, Reply};
use super::crc::frame_checksum;
use super::stream::Channel;
use super::{ProtocolError, CHECKSUM_LEN, PREAMBLE_LEN, SYNC_BYTE};
use crate::schema::{Direction, Payload, SchemaTable};

/// A decoded inbound message or a synthetic diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Wire type code; one of the synthetic codes for diagnostics
    pub code: u8,
    /// Decoded payload value, or the retained raw bytes for diagnostics
    pub payload: Payload,
}

impl Message {
    pub(crate) fn synthetic(kind: Reply) -> Self {
        Self {
            code: kind.code(),
            payload: Payload::Empty,
        }
    }

    /// The reply this message's code names, if any
    pub fn reply(&self) -> Option<Reply> {
        Reply::from_code(self.code)
    }

    /// The command this message's code names, if any
    pub fn command(&self) -> Option<Command> {
        Command::from_code(self.code)
    }

    /// Whether this is the "nothing arrived before the timeout" outcome
    pub fn is_no_message(&self) -> bool {
        self.code == Reply::NoMessage.code()
    }

    /// Whether this is one of the synthetic diagnostics
    pub fn is_diagnostic(&self) -> bool {
        Reply::from_code(self.code).is_some_and(|r| r.is_synthetic())
    }
}

/// Read exactly one message from the link.
///
/// Blocks up to the channel's configured timeout and always produces one
/// outcome: a decoded message, or one of `NoMessage` / `UnknownType` /
/// `FramingError` / `CrcError`. Only transport-fatal I/O (port gone,
/// permission lost) is returned as `Err`.
pub fn read_message(
    chan: &mut dyn Channel,
    schema: &SchemaTable,
    direction: Direction,
) -> Result<Message, ProtocolError> {
    // Hunt for the preamble one byte at a time. `run` counts consecutive
    // sync bytes; extra sync bytes beyond the preamble keep the hunt open
    // so that a run of syncs frames the first non-sync byte as the type.
    let mut run = 0usize;
    let type_byte = loop {
        let mut byte = [0u8; 1];
        if chan.read_upto(&mut byte)? == 0 {
            return Ok(Message::synthetic(Reply::NoMessage));
        }
        if byte[0] == SYNC_BYTE {
            if run < PREAMBLE_LEN {
                run += 1;
            }
            continue;
        }
        if run >= PREAMBLE_LEN {
            break byte[0];
        }
        // Noise while hunting; a partial preamble is void, but this byte
        // was examined above as a sync candidate, never skipped blind.
        run = 0;
    };

    let recognized = match direction {
        Direction::ToDevice => Command::from_code(type_byte).is_some(),
        // Synthetic codes are host-side only; seeing one on the wire means
        // noise or version skew, same as an unmapped code.
        Direction::ToHost => Reply::from_code(type_byte).is_some_and(|r| !r.is_synthetic()),
    };
    let spec = match schema.lookup(direction, type_byte) {
        Some(spec) if recognized => spec,
        _ => {
            debug!(code = type_byte, "unknown message type");
            return Ok(Message::synthetic(Reply::UnknownType));
        }
    };

    // Payload and checksum arrive as one read; anything short of the full
    // length before the timeout is a framing error, kept for diagnostics.
    let want = spec.payload_len + CHECKSUM_LEN;
    let mut buf = vec![0u8; want];
    let got = chan.read_upto(&mut buf)?;
    if got < want {
        debug!(code = type_byte, expected = want, got, "short frame");
        buf.truncate(got);
        return Ok(Message {
            code: Reply::FramingError.code(),
            payload: Payload::Diagnostic {
                type_byte,
                bytes: buf,
            },
        });
    }

    let received = BigEndian::read_u16(&buf[spec.payload_len..]);
    let expected = frame_checksum(type_byte, &buf[..spec.payload_len]);
    if received != expected {
        warn!(
            code = type_byte,
            expected, received, "frame checksum mismatch"
        );
        return Ok(Message {
            code: Reply::CrcError.code(),
            payload: Payload::Diagnostic {
                type_byte,
                bytes: buf,
            },
        });
    }

    let payload = (spec.decode)(&buf[..spec.payload_len]);
    Ok(Message {
        code: type_byte,
        payload,
    })
}

/// Drain repeated reads into an ordered batch.
///
/// Stops when `until` is observed (passing [`Reply::NoMessage`] stops at
/// the first empty poll, i.e. "drain until idle"), or when `timeout`
/// elapses. Sleeps `poll_interval` between empty polls so an idle link
/// does not busy-loop. Every non-empty outcome, diagnostics included, is
/// accumulated in receipt order.
pub fn read_messages(
    chan: &mut dyn Channel,
    schema: &SchemaTable,
    until: Reply,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Vec<Message>, ProtocolError> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::new();

    loop {
        let msg = read_message(chan, schema, Direction::ToHost)?;

        if msg.is_no_message() {
            if until == Reply::NoMessage || Instant::now() >= deadline {
                break;
            }
            thread::sleep(poll_interval);
            continue;
        }

        let done = msg.code == until.code();
        out.push(msg);
        if done || Instant::now() >= deadline {
            break;
        }
    }

    Ok(out)
}
