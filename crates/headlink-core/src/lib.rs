//! # HeadLink Core Library
//!
//! Host-side driver for the motorized force measurement head.
//!
//! This library provides:
//! - The framed binary protocol spoken over the head's UART (sync preamble,
//!   one type byte, fixed-length payload, CRC16 trailer)
//! - A resynchronizing decoder that turns an unreliable byte stream into
//!   typed messages and never blocks forever
//! - The message schema table mapping every type code to its payload shape
//! - A session driver with handshake, send/read and batch-drain operations
//! - A simulated head for tests and development without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use headlink_core::prelude::*;
//!
//! let config = SessionConfig {
//!     port_name: "/dev/ttyUSB0".to_string(),
//!     ..SessionConfig::default()
//! };
//! let mut session = Session::open(config)?;
//! session.handshake()?;
//!
//! session.send(Command::StartStream, Some(&Payload::Byte(50)))?;
//! for msg in session.read_all(Reply::NoMessage, Duration::from_secs(2), Duration::from_millis(5))? {
//!     println!("{:?}", msg);
//! }
//! ```

#![warn(missing_docs)]

pub mod demo;
pub mod protocol;
pub mod schema;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::demo::SimulatedHead;
    pub use crate::protocol::{
        Command, Message, ProtocolError, Reply, Session, SessionConfig,
    };
    pub use crate::schema::{Payload, SchemaTable};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
