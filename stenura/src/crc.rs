//! The wire checksum.
//!
//! CRC-16 with the reflected 0x8005 polynomial, zero init and zero xor-out,
//! which is what the Stentura line has always used.

use crc::{Crc, CRC_16_ARC};

pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);

/// Checksum a byte slice.
pub fn checksum(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

#[cfg(test)]
mod tests {
    use super::checksum;

    #[test]
    fn check_value() {
        // The standard check value for this polynomial.
        assert_eq!(checksum(b"123456789"), 0xbb3d);
    }

    #[test]
    fn deterministic_and_order_sensitive() {
        assert_eq!(checksum(b"REALTIME.000"), checksum(b"REALTIME.000"));
        assert_ne!(checksum(b"ab"), checksum(b"ba"));
        assert_eq!(checksum(b""), 0);
    }
}
