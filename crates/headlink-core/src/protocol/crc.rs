//! Frame checksum
//!
//! The head firmware checksums every frame with CRC16 CCITT-FALSE
//! (polynomial 0x1021, initial value 0xFFFF, no reflection, no xor-out).
//! The checksum covers the type byte and the payload, never the preamble.

use crc::{Crc, CRC_16_IBM_3740};

// CRC_16_IBM_3740 is the CCITT-FALSE variant the firmware uses.
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Compute the CRC16 of an arbitrary byte span.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Checksum of a frame body (type byte followed by the payload bytes).
pub(crate) fn frame_checksum(code: u8, payload: &[u8]) -> u16 {
    let mut digest = CRC16.digest();
    digest.update(&[code]);
    digest.update(payload);
    digest.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // Standard CCITT-FALSE check value.
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input() {
        // Empty input yields the initial value (no xor-out).
        assert_eq!(crc16_ccitt(b""), 0xFFFF);
    }

    #[test]
    fn test_deterministic() {
        let data = [0x41, 100];
        assert_eq!(crc16_ccitt(&data), crc16_ccitt(&data));
    }

    #[test]
    fn test_frame_checksum_matches_concatenation() {
        let payload = [100u8, 0, 7, 42];
        let mut joined = vec![0x41];
        joined.extend_from_slice(&payload);
        assert_eq!(frame_checksum(0x41, &payload), crc16_ccitt(&joined));
    }
}
