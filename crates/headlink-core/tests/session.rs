//! Session driver tests against the simulated head and a scripted link.

use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use headlink_core::demo::SimulatedHead;
use headlink_core::protocol::{
    Channel, Command, ProtocolError, Reply, Session, SessionConfig, PROTOCOL_VERSION,
};
use headlink_core::schema::{ConfigBlock, Payload};

/// Scripted link whose state stays visible to the test after the session
/// takes ownership of the channel.
#[derive(Default)]
struct MockState {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

#[derive(Clone, Default)]
struct SharedChannel(Arc<Mutex<MockState>>);

impl Channel for SharedChannel {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.0.lock().unwrap().tx.extend_from_slice(buf);
        Ok(())
    }

    fn read_upto(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.0.lock().unwrap();
        let n = buf.len().min(state.rx.len());
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().rx.clear();
        Ok(())
    }
}

fn test_config() -> SessionConfig {
    SessionConfig {
        poll_interval_ms: 1,
        handshake_attempts: 1,
        ..SessionConfig::default()
    }
}

fn head_session() -> Session {
    Session::with_channel(Box::new(SimulatedHead::with_seed(42)), test_config()).unwrap()
}

#[test]
fn test_handshake_against_simulated_head() {
    let mut session = head_session();
    assert!(session.handshake().unwrap());
    assert_eq!(session.device_version(), Some(PROTOCOL_VERSION));
}

#[test]
fn test_handshake_on_dead_link_is_nonfatal() {
    let shared = SharedChannel::default();
    let mut session = Session::with_channel(Box::new(shared.clone()), test_config()).unwrap();

    assert!(!session.handshake().unwrap());
    assert_eq!(session.device_version(), None);

    // The session stays usable: a later command still goes out.
    session.send(Command::Home, None).unwrap();
    let (tx_bytes, tx_frames, _) = session.counters();
    assert_eq!(tx_frames, 2); // hello + home
    assert_eq!(shared.0.lock().unwrap().tx.len() as u64, tx_bytes);
}

#[test]
fn test_send_type_mismatch_fails_closed() {
    let shared = SharedChannel::default();
    let mut session = Session::with_channel(Box::new(shared.clone()), test_config()).unwrap();

    let err = session
        .send(Command::SetAngle, Some(&Payload::Word(100)))
        .unwrap_err();
    assert!(matches!(err, ProtocolError::TypeMismatch { .. }));

    // Fail closed: nothing may have touched the transport.
    assert!(shared.0.lock().unwrap().tx.is_empty());
    assert_eq!(session.counters().1, 0);
}

#[test]
fn test_empty_payload_for_payload_command_fails_closed() {
    let shared = SharedChannel::default();
    let mut session = Session::with_channel(Box::new(shared.clone()), test_config()).unwrap();

    let err = session.send(Command::Jog, None).unwrap_err();
    assert!(matches!(err, ProtocolError::TypeMismatch { .. }));
    assert!(shared.0.lock().unwrap().tx.is_empty());
}

#[test]
fn test_command_is_acknowledged() {
    let mut session = head_session();
    session
        .send(Command::SetAngle, Some(&Payload::Byte(100)))
        .unwrap();
    let msg = session.read(None).unwrap();
    assert_eq!(msg.reply(), Some(Reply::Ack));
}

#[test]
fn test_read_on_idle_link_is_no_message() {
    let mut session = head_session();
    for _ in 0..3 {
        assert!(session.read(Some(Duration::from_millis(5))).unwrap().is_no_message());
    }
}

#[test]
fn test_config_roundtrip_over_the_wire() {
    let mut session = head_session();

    let block = ConfigBlock {
        microsteps_per_step: 64,
        touch_force_mn: 321,
        home_speed: 2.5,
        ..ConfigBlock::default()
    };
    session
        .send(Command::WriteConfig, Some(&Payload::Config(block)))
        .unwrap();
    assert_eq!(session.read(None).unwrap().reply(), Some(Reply::Ack));

    session.send(Command::ReadConfig, None).unwrap();
    let msg = session.read(None).unwrap();
    assert_eq!(msg.reply(), Some(Reply::Config));
    assert_eq!(msg.payload, Payload::Config(block));
}

#[test]
fn test_orientation_reflects_set_angle() {
    let mut session = head_session();

    session
        .send(Command::SetAngle, Some(&Payload::Byte(25)))
        .unwrap();
    assert_eq!(session.read(None).unwrap().reply(), Some(Reply::Ack));

    session.send(Command::ReadOrientation, None).unwrap();
    let msg = session.read(None).unwrap();
    match msg.payload {
        Payload::Orientation(sample) => assert_eq!(sample.creep_angle, 25),
        other => panic!("expected orientation, got {other:?}"),
    }
}

#[test]
fn test_read_all_drains_until_idle() {
    let mut session = head_session();

    session.send(Command::ReadForce, None).unwrap();
    session.send(Command::ReadForce, None).unwrap();

    let msgs = session
        .read_all(
            Reply::NoMessage,
            Duration::from_millis(100),
            Duration::from_millis(1),
        )
        .unwrap();
    assert_eq!(msgs.len(), 2);
    for msg in &msgs {
        assert_eq!(msg.reply(), Some(Reply::ForceSample));
    }
}

#[test]
fn test_streaming_until_deadline() {
    let mut session = head_session();
    session
        .send(Command::SetTargetForce, Some(&Payload::Word(5_000)))
        .unwrap();
    assert_eq!(session.read(None).unwrap().reply(), Some(Reply::Ack));

    session
        .send(Command::StartStream, Some(&Payload::Byte(50)))
        .unwrap();

    // Nak never arrives; the deadline ends the batch.
    let msgs = session
        .read_all(
            Reply::Nak,
            Duration::from_millis(20),
            Duration::from_millis(1),
        )
        .unwrap();
    assert!(!msgs.is_empty());
    for msg in &msgs {
        assert_eq!(msg.reply(), Some(Reply::ForceSample));
        match &msg.payload {
            Payload::Force(sample) => {
                // Jitter stays within firmware bounds around the target.
                assert!((sample.normal_mn - 5_000).abs() <= 25);
            }
            other => panic!("expected force sample, got {other:?}"),
        }
    }

    session.send(Command::StopStream, None).unwrap();
    let trailing = session
        .read_all(
            Reply::NoMessage,
            Duration::from_millis(50),
            Duration::from_millis(1),
        )
        .unwrap();
    for msg in &trailing {
        assert_eq!(msg.reply(), Some(Reply::ForceSample));
    }
    assert!(session.read(Some(Duration::from_millis(5))).unwrap().is_no_message());
}

#[test]
fn test_read_all_terminates_on_ack() {
    let mut session = head_session();

    // Queue a sample, then an acked command: the ack is the terminal type.
    session.send(Command::ReadForce, None).unwrap();
    session.send(Command::ZeroForces, None).unwrap();

    let msgs = session
        .read_all(
            Reply::Ack,
            Duration::from_millis(100),
            Duration::from_millis(1),
        )
        .unwrap();
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].reply(), Some(Reply::ForceSample));
    assert_eq!(msgs[1].reply(), Some(Reply::Ack));
}
