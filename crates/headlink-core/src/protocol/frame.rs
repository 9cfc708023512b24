//! Frame encoding
//!
//! Builds the wire form of an outbound message:
//!
//! ```text
//! ┌────────────┬───────────┬──────────────────┬─────────────────┐
//! │ Sync × 2   │ Type (1B) │ Payload          │ CRC16 (2B BE)   │
//! │ 0x3C 0x3C  │           │ (length by type) │ over type+data  │
//! └────────────┴───────────┴──────────────────┴─────────────────┘
//! ```
//!
//! The checksum never covers the preamble. Payload length is not carried
//! on the wire; both ends derive it from the type byte via the schema.

use byteorder::{BigEndian, ByteOrder};

use super::crc::frame_checksum;
use super::{CHECKSUM_LEN, PREAMBLE_LEN, SYNC_BYTE};

/// Encode a frame for the given type code and already-packed payload bytes.
///
/// Payload shape checking happens before this point (see
/// [`Session::send`](super::Session::send)); this function assembles bytes
/// only and cannot fail.
pub fn encode_frame(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PREAMBLE_LEN + 1 + payload.len() + CHECKSUM_LEN);
    out.extend_from_slice(&[SYNC_BYTE; PREAMBLE_LEN]);
    out.push(code);
    out.extend_from_slice(payload);

    let crc = frame_checksum(code, payload);
    let mut crc_bytes = [0u8; CHECKSUM_LEN];
    BigEndian::write_u16(&mut crc_bytes, crc);
    out.extend_from_slice(&crc_bytes);

    out
}

#[cfg(test)]
mod tests {
    use super::super::crc::crc16_ccitt;
    use super::*;

    #[test]
    fn test_frame_layout() {
        let frame = encode_frame(b'A', &[100]);
        assert_eq!(frame.len(), 6);
        assert_eq!(&frame[..2], &[SYNC_BYTE, SYNC_BYTE]);
        assert_eq!(frame[2], b'A');
        assert_eq!(frame[3], 100);

        let crc = crc16_ccitt(&[b'A', 100]);
        assert_eq!(frame[4], (crc >> 8) as u8);
        assert_eq!(frame[5], (crc & 0xFF) as u8);
    }

    #[test]
    fn test_empty_payload_frame() {
        // Checksum covers the single type byte.
        let frame = encode_frame(b'H', &[]);
        assert_eq!(frame.len(), 5);
        let crc = crc16_ccitt(&[b'H']);
        assert_eq!(&frame[3..], &crc.to_be_bytes());
    }

    #[test]
    fn test_checksum_excludes_preamble() {
        let with_payload = encode_frame(b'F', &[0x10, 0x27, 0, 0]);
        let crc = crc16_ccitt(&[b'F', 0x10, 0x27, 0, 0]);
        assert_eq!(&with_payload[7..], &crc.to_be_bytes());
    }
}
