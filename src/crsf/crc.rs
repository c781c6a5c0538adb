//! # CRC8-DVB-S2 Implementation
//!
//! CRC-8-DVB-S2 checksum as used by CRSF frames.
//!
//! **Polynomial**: 0xD5 (x^8 + x^7 + x^6 + x^4 + x^2 + 1)
//! **Initial Value**: 0x00

/// CRC-8-DVB-S2 polynomial
const CRC8_POLY: u8 = 0xD5;

/// Precomputed CRC8 lookup table for fast per-byte updates
const CRC8_TABLE: [u8; 256] = generate_crc8_table();

/// Generate CRC8 lookup table at compile time
const fn generate_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the CRC8-DVB-S2 checksum of a byte slice.
///
/// For an inbound CRSF frame the checksum covers the type byte through the
/// end of the payload (the sync and length bytes are excluded, as is the
/// trailing CRC byte itself).
pub fn crc8_dvb_s2(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in data {
        crc = CRC8_TABLE[(crc ^ byte) as usize];
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bit-by-bit reference implementation used to validate the table.
    fn crc8_reference(data: &[u8]) -> u8 {
        let mut crc: u8 = 0;

        for &byte in data {
            crc ^= byte;

            for _ in 0..8 {
                if (crc & 0x80) != 0 {
                    crc = (crc << 1) ^ CRC8_POLY;
                } else {
                    crc <<= 1;
                }
            }
        }

        crc
    }

    #[test]
    fn test_crc8_empty_is_zero() {
        assert_eq!(crc8_dvb_s2(&[]), 0x00);
    }

    #[test]
    fn test_crc8_zero_bytes_stay_zero() {
        // All-zero input never leaves the zero state with init = 0
        assert_eq!(crc8_dvb_s2(&[0x00; 8]), 0x00);
    }

    #[test]
    fn test_crc8_table_matches_reference() {
        let vectors: &[&[u8]] = &[
            &[0xFF],
            &[0x16, 0x00, 0x04],
            &[0x08, 0x04, 0x19, 0x00, 0x7D, 0x00, 0x03, 0xE8, 0x4B],
            &[0x32, b'b', b'l'],
            &[0xAA; 63],
        ];

        for data in vectors {
            assert_eq!(
                crc8_dvb_s2(data),
                crc8_reference(data),
                "table/reference mismatch for {:?}",
                data
            );
        }
    }

    #[test]
    fn test_crc8_sensitive_to_single_bit() {
        let a = [0x32, b'b', b'l'];
        let b = [0x32, b'b', b'm'];
        assert_ne!(crc8_dvb_s2(&a), crc8_dvb_s2(&b));
    }
}
