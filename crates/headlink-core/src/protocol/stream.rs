//! Byte-stream transport
//!
//! Abstracts the link the protocol engine reads and writes. The decoder
//! only ever needs four operations, so tests and the simulated head can
//! stand in for a real port.

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

/// A blocking byte-stream link with a settable read timeout
pub trait Channel: Send {
    /// Write the whole buffer to the link.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Read up to `buf.len()` bytes, blocking until the buffer fills or the
    /// configured timeout lapses. Returns the number of bytes read; zero
    /// means nothing arrived in time. Never returns a timeout as an error.
    fn read_upto(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Set the read timeout for subsequent reads.
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Drop any bytes already buffered on the receive side.
    fn discard_input(&mut self) -> io::Result<()>;
}

/// Serial port implementation of [`Channel`]
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl SerialChannel {
    /// Wrap an open serial port with the given read timeout.
    pub fn new(port: Box<dyn SerialPort>, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

impl Channel for SerialChannel {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()
    }

    fn read_upto(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // serialport returns as soon as at least one byte is available, so
        // keep reading until the buffer is full or the deadline passes.
        let deadline = Instant::now() + self.timeout;
        let mut offset = 0;

        while offset < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.port
                .set_timeout(remaining)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

            match self.port.read(&mut buf[offset..]) {
                Ok(0) => break,
                Ok(n) => offset += n,
                Err(ref e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock =>
                {
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(offset)
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
