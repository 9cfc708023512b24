//! Session driver
//!
//! Owns one transport handle and exposes the operations applications use:
//! `send`, `read`, `read_all` and the startup `handshake`. One session, one
//! link, one thread — callers needing concurrent access must serialize it
//! themselves, since a write followed by a response read is not atomic.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::commands::{Command, Reply};
use super::decoder::{read_message, read_messages, Message};
use super::frame::encode_frame;
use super::serial::open_port;
use super::stream::{Channel, SerialChannel};
use super::{ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS, PROTOCOL_VERSION};
use crate::schema::{Direction, HandshakeInfo, Payload, SchemaTable};

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Default read timeout in milliseconds
    pub timeout_ms: u64,
    /// Sleep between empty polls in batch reads, milliseconds
    pub poll_interval_ms: u64,
    /// How many times `handshake` retries before giving up
    pub handshake_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: 10,
            handshake_attempts: 3,
        }
    }
}

/// A connection to one measurement head
pub struct Session {
    /// Transport handle
    link: Box<dyn Channel>,
    /// Shared schema table
    schema: &'static SchemaTable,
    /// Session configuration
    config: SessionConfig,
    /// Protocol version the head reported in its handshake ack
    device_version: Option<u16>,
    /// Metrics: cumulative bytes and frames
    tx_bytes: u64,
    tx_frames: u64,
    rx_frames: u64,
}

impl Session {
    /// Open the configured serial port and wrap it in a session.
    ///
    /// Does not handshake; call [`Session::handshake`] once after opening.
    pub fn open(config: SessionConfig) -> Result<Self, ProtocolError> {
        let port = open_port(&config.port_name, Some(config.baud_rate))?;
        let link = SerialChannel::new(port, Duration::from_millis(config.timeout_ms));
        Self::with_channel(Box::new(link), config)
    }

    /// Build a session over an existing channel (tests, simulated head).
    pub fn with_channel(
        link: Box<dyn Channel>,
        config: SessionConfig,
    ) -> Result<Self, ProtocolError> {
        let schema = SchemaTable::global()?;
        Ok(Self {
            link,
            schema,
            config,
            device_version: None,
            tx_bytes: 0,
            tx_frames: 0,
            rx_frames: 0,
        })
    }

    /// Protocol version the head reported, once the handshake succeeded
    pub fn device_version(&self) -> Option<u16> {
        self.device_version
    }

    /// Cumulative (tx bytes, tx frames, rx frames)
    pub fn counters(&self) -> (u64, u64, u64) {
        (self.tx_bytes, self.tx_frames, self.rx_frames)
    }

    /// Encode and transmit one command frame.
    ///
    /// The payload is checked against the command's declared shape before
    /// any byte touches the transport; on a mismatch nothing is written.
    pub fn send(&mut self, command: Command, payload: Option<&Payload>) -> Result<(), ProtocolError> {
        let spec = self
            .schema
            .lookup(Direction::ToDevice, command.code())
            .ok_or(ProtocolError::UnknownCommand(command))?;

        let value = payload.unwrap_or(&Payload::Empty);
        let bytes = (spec.encode)(value).ok_or(ProtocolError::TypeMismatch {
            command,
            expected: spec.shape,
        })?;

        let frame = encode_frame(command.code(), &bytes);
        self.link.write_all(&frame)?;
        self.tx_bytes = self.tx_bytes.saturating_add(frame.len() as u64);
        self.tx_frames = self.tx_frames.saturating_add(1);
        debug!(?command, len = frame.len(), "frame sent");
        Ok(())
    }

    /// Read one message, blocking up to `timeout` (default: the session's
    /// configured timeout). Always returns a definite outcome; an idle
    /// link yields a `NoMessage` diagnostic, not an error.
    pub fn read(&mut self, timeout: Option<Duration>) -> Result<Message, ProtocolError> {
        let timeout = timeout.unwrap_or(Duration::from_millis(self.config.timeout_ms));
        self.link.set_timeout(timeout)?;
        let msg = read_message(self.link.as_mut(), self.schema, Direction::ToHost)?;
        if !msg.is_no_message() {
            self.rx_frames = self.rx_frames.saturating_add(1);
        }
        Ok(msg)
    }

    /// Drain messages until `until` is observed or `timeout` elapses.
    ///
    /// Passing [`Reply::NoMessage`] as `until` drains until the link goes
    /// idle. Diagnostics are accumulated along with real replies, in
    /// receipt order.
    pub fn read_all(
        &mut self,
        until: Reply,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Vec<Message>, ProtocolError> {
        self.link
            .set_timeout(Duration::from_millis(self.config.timeout_ms))?;
        let msgs = read_messages(self.link.as_mut(), self.schema, until, timeout, poll_interval)?;
        self.rx_frames = self.rx_frames.saturating_add(msgs.len() as u64);
        Ok(msgs)
    }

    /// Announce ourselves to the head and wait for its acknowledgement.
    ///
    /// Stale bytes buffered on the link are discarded first so pre-restart
    /// noise is never mistaken for a response. Non-acknowledgement within
    /// the configured attempts is a warning, not a failure: the head may
    /// still answer later commands, and the session stays usable.
    pub fn handshake(&mut self) -> Result<bool, ProtocolError> {
        let window = Duration::from_millis(Command::Hello.timeout_ms());
        let poll = Duration::from_millis(self.config.poll_interval_ms);

        for attempt in 1..=self.config.handshake_attempts {
            // Stale bytes from before the handshake must not be read back
            // as a response.
            self.link.discard_input()?;

            let now = Utc::now();
            let hello = HandshakeInfo {
                protocol_version: PROTOCOL_VERSION,
                unix_seconds: now.timestamp() as u32,
                millis: now.timestamp_subsec_millis() as u16,
            };
            self.send(Command::Hello, Some(&Payload::Handshake(hello)))?;

            for msg in self.read_all(Reply::HandshakeAck, window, poll)? {
                match (msg.reply(), &msg.payload) {
                    (Some(Reply::HandshakeAck), Payload::Version(version)) => {
                        info!(version = *version, "head acknowledged handshake");
                        self.device_version = Some(*version);
                        return Ok(true);
                    }
                    (Some(Reply::ErrorStatus), Payload::Word(status)) => {
                        warn!(status = *status, "head reported a fault during handshake");
                    }
                    (Some(Reply::Nak), _) => {
                        warn!("head rejected the handshake");
                    }
                    _ => {}
                }
            }
            debug!(attempt, "no handshake acknowledgement");
        }

        warn!(
            attempts = self.config.handshake_attempts,
            "handshake not acknowledged; the head may still answer later commands"
        );
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(config.handshake_attempts > 0);
    }
}
