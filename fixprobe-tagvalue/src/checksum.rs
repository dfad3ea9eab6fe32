/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX checksum calculation.
//!
//! Two formulas live here:
//!
//! - [`calculate_checksum`]: the standard FIX checksum, the sum of every byte
//!   up to and including the delimiter that precedes `10=`, modulo 256. The
//!   validating decoder uses it.
//! - [`compute_checksum`]: the formula used when refreshing raw messages
//!   before sending. It sums the bytes *before* the delimiter that precedes
//!   `10=`, takes the result modulo 256 and then adds one. For almost every
//!   message this equals the standard value, since the skipped delimiter
//!   (SOH, 0x01) is worth exactly one. When the partial sum is 255 modulo 256
//!   it yields `"256"` where the standard checksum yields `"000"`. Raw sends
//!   keep this behaviour.

use crate::encoding::to_wire_bytes;
use memchr::memmem;

/// SOH (Start of Header) delimiter used in FIX messages.
pub const SOH: u8 = 0x01;

/// Calculates the standard FIX checksum for the given data.
///
/// # Arguments
/// * `data` - The message bytes to checksum (excluding the 10=XXX field)
///
/// # Returns
/// The checksum value as a u8 (0-255).
#[inline]
#[must_use]
pub fn calculate_checksum(data: &[u8]) -> u8 {
    let sum: u32 = data.iter().map(|&b| u32::from(b)).sum();
    (sum % 256) as u8
}

/// Formats a checksum value as a 3-digit zero-padded string.
#[inline]
#[must_use]
pub fn format_checksum(checksum: u8) -> [u8; 3] {
    let d0 = b'0' + (checksum / 100);
    let d1 = b'0' + ((checksum / 10) % 10);
    let d2 = b'0' + (checksum % 10);
    [d0, d1, d2]
}

/// Parses a 3-digit checksum string to a u8 value.
#[inline]
#[must_use]
pub fn parse_checksum(bytes: &[u8]) -> Option<u8> {
    if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value =
        u16::from(bytes[0] - b'0') * 100 + u16::from(bytes[1] - b'0') * 10 + u16::from(bytes[2] - b'0');
    u8::try_from(value).ok()
}

/// Computes the CheckSum (10) value written by raw sends.
///
/// `binary` must already use SOH as its delimiter. The sum covers every byte
/// before the first `SOH10=` sequence, or the whole message when there is no
/// trailer.
///
/// # Returns
/// The value zero-padded to three digits. The result is in `"001"..="256"`.
#[must_use]
pub fn compute_checksum(binary: &str) -> String {
    let bytes = to_wire_bytes(binary);
    let end = memmem::find(&bytes, b"\x0110=").unwrap_or(bytes.len());
    let sum: u64 = bytes[..end].iter().map(|&b| u64::from(b)).sum();
    format!("{:03}", (sum % 256) + 1)
}

/// Computes the standard CheckSum (10) value for a SOH-delimited message.
///
/// The sum covers every byte up to and including the SOH that precedes the
/// first `10=` field.
#[must_use]
pub fn standard_checksum(binary: &str) -> String {
    let bytes = to_wire_bytes(binary);
    let end = memmem::find(&bytes, b"\x0110=").map_or(bytes.len(), |pos| pos + 1);
    let formatted = format_checksum(calculate_checksum(&bytes[..end]));
    formatted.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_checksum_simple() {
        let data = b"ABC";
        let expected = (u32::from(b'A') + u32::from(b'B') + u32::from(b'C')) % 256;
        assert_eq!(calculate_checksum(data), expected as u8);
        assert_eq!(calculate_checksum(b""), 0);
    }

    #[test]
    fn test_format_and_parse_checksum() {
        assert_eq!(format_checksum(42), *b"042");
        assert_eq!(parse_checksum(b"042"), Some(42));
        assert_eq!(parse_checksum(b"255"), Some(255));
        assert_eq!(parse_checksum(b"256"), None);
        assert_eq!(parse_checksum(b"12X"), None);
        assert_eq!(parse_checksum(b"00"), None);
    }

    #[test]
    fn test_compute_checksum_matches_standard_for_typical_message() {
        let msg = "8=FIX.4.2\u{1}9=5\u{1}35=0\u{1}10=000\u{1}";
        assert_eq!(compute_checksum(msg), standard_checksum(msg));
    }

    #[test]
    fn test_compute_checksum_adds_one_after_modulo() {
        // "\u{ff}" sums to 255 before the trailer: (255 % 256) + 1 = 256,
        // while the standard checksum wraps to 000.
        let msg = "\u{ff}\u{1}10=000\u{1}";
        assert_eq!(compute_checksum(msg), "256");
        assert_eq!(standard_checksum(msg), "000");
    }

    #[test]
    fn test_compute_checksum_ignores_bytes_after_trailer() {
        let a = "35=A\u{1}10=000\u{1}58=x\u{1}44=1\u{1}";
        let b = "35=A\u{1}10=000\u{1}44=1\u{1}58=x\u{1}";
        assert_eq!(compute_checksum(a), compute_checksum(b));
    }

    #[test]
    fn test_compute_checksum_changes_with_body() {
        let a = "35=A\u{1}10=000\u{1}";
        let b = "35=B\u{1}10=000\u{1}";
        assert_ne!(compute_checksum(a), compute_checksum(b));
    }

    #[test]
    fn test_compute_checksum_without_trailer() {
        assert_eq!(compute_checksum(""), "001");
        assert_eq!(compute_checksum("A"), "066");
    }
}
