//! Measurement Head Monitor
//!
//! A standalone tool to exercise the head link: handshake, stream force
//! samples for a few seconds and print them.
//!
//! Usage:
//!   cargo run --example head_monitor -- [OPTIONS]
//!
//! Options:
//!   --port PORT       Serial port (default: /dev/ttyUSB0)
//!   --baud RATE       Baud rate (default: 1000000)
//!   --rate N          Stream rate in samples/second (default: 50)
//!   --seconds N       How long to stream (default: 5)
//!   --demo            Run against the simulated head instead of hardware
//!   --list            List available serial ports and exit

use std::time::Duration;

use headlink_core::demo::SimulatedHead;
use headlink_core::protocol::{list_ports, Command, Reply, Session, SessionConfig};
use headlink_core::schema::Payload;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut port_name = "/dev/ttyUSB0".to_string();
    let mut baud_rate = 1_000_000u32;
    let mut rate = 50u8;
    let mut seconds = 5u64;
    let mut demo_mode = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                if i < args.len() {
                    port_name = args[i].clone();
                }
            }
            "--baud" | "-b" => {
                i += 1;
                if i < args.len() {
                    baud_rate = args[i].parse().unwrap_or(1_000_000);
                }
            }
            "--rate" | "-r" => {
                i += 1;
                if i < args.len() {
                    rate = args[i].parse().unwrap_or(50);
                }
            }
            "--seconds" | "-s" => {
                i += 1;
                if i < args.len() {
                    seconds = args[i].parse().unwrap_or(5);
                }
            }
            "--demo" => {
                demo_mode = true;
            }
            "--list" => {
                for port in list_ports() {
                    println!(
                        "{}  {}",
                        port.name,
                        port.product.as_deref().unwrap_or("(unknown)")
                    );
                }
                return;
            }
            other => {
                eprintln!("Unknown option: {other}");
                std::process::exit(2);
            }
        }
        i += 1;
    }

    let config = SessionConfig {
        port_name: port_name.clone(),
        baud_rate,
        ..SessionConfig::default()
    };

    let session = if demo_mode {
        Session::with_channel(Box::new(SimulatedHead::new()), config)
    } else {
        Session::open(config)
    };
    let mut session = match session {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to open {port_name}: {e}");
            std::process::exit(1);
        }
    };

    match session.handshake() {
        Ok(true) => println!(
            "Head ready (protocol v{})",
            session.device_version().unwrap_or(0)
        ),
        Ok(false) => println!("No handshake ack; trying to stream anyway"),
        Err(e) => {
            eprintln!("Link failure during handshake: {e}");
            std::process::exit(1);
        }
    }

    if let Err(e) = session.send(Command::StartStream, Some(&Payload::Byte(rate))) {
        eprintln!("Failed to start streaming: {e}");
        std::process::exit(1);
    }

    let result = session.read_all(
        Reply::Nak,
        Duration::from_secs(seconds),
        Duration::from_millis(5),
    );
    let _ = session.send(Command::StopStream, None);

    match result {
        Ok(msgs) => {
            let mut samples = 0u64;
            let mut errors = 0u64;
            for msg in &msgs {
                match (&msg.reply(), &msg.payload) {
                    (Some(Reply::ForceSample), Payload::Force(sample)) => {
                        samples += 1;
                        println!(
                            "t={:5} ms  Fn={:7} mN  Ft={:7} mN  status={:#06x}",
                            sample.millis_since_start,
                            sample.normal_mn,
                            sample.tangential_mn,
                            sample.device_status
                        );
                    }
                    _ => errors += 1,
                }
            }
            let (tx_bytes, tx_frames, rx_frames) = session.counters();
            println!(
                "\n{samples} samples, {errors} other messages; \
                 {tx_frames} frames sent ({tx_bytes} bytes), {rx_frames} frames received"
            );
        }
        Err(e) => {
            eprintln!("Link failure while streaming: {e}");
            std::process::exit(1);
        }
    }
}
