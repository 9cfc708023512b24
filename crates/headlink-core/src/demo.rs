//! Simulated head - firmware stand-in for testing
//!
//! An in-memory [`Channel`] that behaves like head firmware: it decodes
//! command frames from the bytes written to it, acknowledges them, serves
//! the read commands and streams jittered force samples at the requested
//! rate. Tests and the example run against it instead of hardware.

use byteorder::{ByteOrder, LittleEndian};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::protocol::commands::{Command, Reply};
use crate::protocol::{encode_frame, read_message, Channel, PROTOCOL_VERSION};
use crate::schema::{ConfigBlock, Direction, ForceSample, OrientationSample, Payload, SchemaTable};

/// In-memory measurement head
pub struct SimulatedHead {
    inbox: VecDeque<u8>,
    outbox: VecDeque<u8>,
    config: ConfigBlock,
    error_status: u32,
    target_force_mn: u32,
    stream_rate: Option<u8>,
    sample_index: u16,
    angle_mrad: u8,
    led_on: bool,
    rng: StdRng,
}

impl SimulatedHead {
    /// Create a head with entropy-seeded jitter.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a head with deterministic jitter for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            inbox: VecDeque::new(),
            outbox: VecDeque::new(),
            config: ConfigBlock::default(),
            error_status: 0,
            target_force_mn: 0,
            stream_rate: None,
            sample_index: 0,
            angle_mrad: 0,
            led_on: false,
            rng,
        }
    }

    /// Current tilt angle in milliradians
    pub fn angle_mrad(&self) -> u8 {
        self.angle_mrad
    }

    /// Whether the indicator LED is on
    pub fn led_on(&self) -> bool {
        self.led_on
    }

    /// Current stream rate in samples/second, if streaming
    pub fn stream_rate(&self) -> Option<u8> {
        self.stream_rate
    }

    /// Raise fault bits, as a wobbly load cell would.
    pub fn inject_fault(&mut self, bits: u32) {
        self.error_status |= bits;
    }

    fn push_reply(&mut self, reply: Reply, payload: &[u8]) {
        self.outbox.extend(encode_frame(reply.code(), payload));
    }

    fn next_force_sample(&mut self) -> ForceSample {
        let rate = u32::from(self.stream_rate.unwrap_or(1).max(1));
        let period_ms = (1000 / rate) as u16;
        self.sample_index = self.sample_index.wrapping_add(1);

        let target = self.target_force_mn as i32;
        ForceSample {
            device_status: u16::from(self.stream_rate.is_some()),
            millis_since_start: self.sample_index.wrapping_mul(period_ms),
            normal_mn: target + self.rng.gen_range(-25..=25),
            tangential_mn: target / 10 + self.rng.gen_range(-5..=5),
        }
    }

    fn handle_command(&mut self, cmd: Command, payload: Payload) {
        match (cmd, payload) {
            (Command::SetAngle, Payload::Byte(angle)) => self.angle_mrad = angle,
            (Command::WriteConfig, Payload::Config(block)) => self.config = block,
            (Command::StartStream, Payload::Byte(rate)) => self.stream_rate = Some(rate.max(1)),
            (Command::StopStream, _) => self.stream_rate = None,
            (Command::SetTargetForce, Payload::Word(force)) => self.target_force_mn = force,
            (Command::Jog, Payload::Steps(_)) => {}
            (Command::ToggleLed, Payload::Byte(on)) => self.led_on = on != 0,
            (Command::ClearErrorStatus, _) => self.error_status = 0,
            (Command::ReadConfig, _) => {
                let bytes = self.config.to_bytes();
                self.push_reply(Reply::Config, &bytes);
            }
            (Command::ReadErrorStatus, _) => {
                let mut bytes = [0u8; 4];
                LittleEndian::write_u32(&mut bytes, self.error_status);
                self.push_reply(Reply::ErrorStatus, &bytes);
            }
            (Command::ReadOrientation, _) => {
                let sample = OrientationSample {
                    incline: 0.12 + self.rng.gen_range(-0.01f32..0.01),
                    roll: -0.03 + self.rng.gen_range(-0.01f32..0.01),
                    creep_angle: self.angle_mrad,
                };
                let bytes = sample.to_bytes();
                self.push_reply(Reply::Orientation, &bytes);
            }
            (Command::ReadForce, _) => {
                let sample = self.next_force_sample();
                let bytes = sample.to_bytes();
                self.push_reply(Reply::ForceSample, &bytes);
            }
            (Command::Hello, Payload::Handshake(_)) => {
                let mut bytes = [0u8; 2];
                LittleEndian::write_u16(&mut bytes, PROTOCOL_VERSION);
                self.push_reply(Reply::HandshakeAck, &bytes);
            }
            (Command::Home, _)
            | (Command::StopAll, _)
            | (Command::Restart, _)
            | (Command::MaintainForce, _)
            | (Command::ZeroForces, _) => {}
            // The decoder only hands over payloads of the declared shape,
            // so this arm is unreachable in practice; answer like firmware
            // anyway.
            _ => {
                self.push_reply(Reply::Nak, &[]);
                return;
            }
        }

        if cmd.expects_ack() {
            self.push_reply(Reply::Ack, &[]);
        }
    }

    /// Parse every complete frame sitting in the inbox and react to it.
    fn process_inbox(&mut self) -> io::Result<()> {
        let schema = SchemaTable::global()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut pending = Drained {
            bytes: std::mem::take(&mut self.inbox),
        };
        loop {
            let msg = read_message(&mut pending, schema, Direction::ToDevice)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if msg.is_no_message() {
                break;
            }
            match msg.command() {
                Some(cmd) => self.handle_command(cmd, msg.payload),
                // Garbled or unknown command frames are rejected.
                None => self.push_reply(Reply::Nak, &[]),
            }
        }
        self.inbox = pending.bytes;
        Ok(())
    }
}

impl Default for SimulatedHead {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for SimulatedHead {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inbox.extend(buf);
        self.process_inbox()
    }

    fn read_upto(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // While streaming, an empty outbox refills with the next sample, so
        // each poll observes a fresh measurement.
        if self.outbox.is_empty() && self.stream_rate.is_some() {
            let sample = self.next_force_sample();
            let bytes = sample.to_bytes();
            self.outbox
                .extend(encode_frame(Reply::ForceSample.code(), &bytes));
        }

        let n = buf.len().min(self.outbox.len());
        for (slot, byte) in buf.iter_mut().zip(self.outbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        // The host's input buffer is our outbox.
        self.outbox.clear();
        Ok(())
    }
}

/// Adapter so the head side can run the same frame decoder over its inbox
/// that the host runs over the serial stream.
struct Drained {
    bytes: VecDeque<u8>,
}

impl Channel for Drained {
    fn write_all(&mut self, _buf: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn read_upto(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.bytes.len());
        for (slot, byte) in buf.iter_mut().zip(self.bytes.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.bytes.clear();
        Ok(())
    }
}
