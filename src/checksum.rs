// Fallback Sim - Sensor telemetry simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! CRC-32 integrity check for event log rows.
//!
//! Each row carries the CRC-32 (IEEE polynomial, zlib-compatible) of its
//! canonical string `"{timestamp}:{reasons}:{fallback_flag}"`, rendered as
//! 8 lowercase hex digits. This detects accidental corruption only.

use crate::classifier::ReasonCode;
use crc::{Crc, CRC_32_ISO_HDLC};

/// CRC-32 as used by zlib, PNG and Ethernet.
pub const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Separator between reason codes in a stored row.
pub const REASON_SEPARATOR: &str = ", ";

/// Join reason codes in evaluation order.
pub fn join_reasons(reasons: &[ReasonCode]) -> String {
    reasons
        .iter()
        .map(ReasonCode::as_str)
        .collect::<Vec<_>>()
        .join(REASON_SEPARATOR)
}

/// Canonical string a row's checksum covers.
pub fn canonical_string(timestamp: &str, reasons: &str, fallback_flag: i64) -> String {
    format!("{}:{}:{}", timestamp, reasons, fallback_flag)
}

/// CRC-32 of `data` as 8 lowercase hex digits.
pub fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", CRC32.checksum(data))
}

/// Checksum of a row's fields.
pub fn row_crc(timestamp: &str, reasons: &str, fallback_flag: i64) -> String {
    crc32_hex(canonical_string(timestamp, reasons, fallback_flag).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_check_value() {
        assert_eq!(crc32_hex(b"123456789"), "cbf43926");
        assert_eq!(crc32_hex(b""), "00000000");
    }

    #[test]
    fn test_join_reasons() {
        assert_eq!(
            join_reasons(&[ReasonCode::HighTemp, ReasonCode::LowMoisture]),
            "high_temp, low_moisture"
        );
        assert_eq!(join_reasons(&[ReasonCode::Co2Noise]), "co2_noise");
        assert_eq!(join_reasons(&[]), "");
    }

    #[test]
    fn test_canonical_string() {
        assert_eq!(
            canonical_string("2024-01-01 21:50:00", "high_temp, low_moisture", 1),
            "2024-01-01 21:50:00:high_temp, low_moisture:1"
        );
    }

    #[test]
    fn test_row_crc_matches_zlib() {
        assert_eq!(
            row_crc("2024-01-01 21:50:00", "high_temp, low_moisture", 1),
            "c3670546"
        );
        // Leading zeros are kept
        assert_eq!(
            row_crc("2024-01-01 00:10:00", "moisture_dropout", 1),
            "08072875"
        );
    }

    #[test]
    fn test_crc_sensitive_to_each_field() {
        let base = row_crc("2024-01-01 21:50:00", "high_temp", 1);
        assert_ne!(base, row_crc("2024-01-01 21:50:01", "high_temp", 1));
        assert_ne!(base, row_crc("2024-01-01 21:50:00", "co2_noise", 1));
        assert_ne!(base, row_crc("2024-01-01 21:50:00", "high_temp", 0));
    }
}
