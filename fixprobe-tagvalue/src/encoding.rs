/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Byte/character conversion for raw messages.
//!
//! Raw messages are held as `String`s in which every `char` up to U+00FF
//! stands for exactly one wire byte (latin-1). This lets arbitrary bytes,
//! including control characters and invalid UTF-8 sequences, survive field
//! editing and be written back to the wire unchanged. Characters above
//! U+00FF are written as their UTF-8 encoding.

use bytes::{BufMut, Bytes, BytesMut};

/// Converts wire bytes to the latin-1 string form.
#[must_use]
pub fn bytes_to_ascii(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Converts a raw message string back to wire bytes.
#[must_use]
pub fn to_wire_bytes(raw: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(raw.len());
    for c in raw.chars() {
        match u8::try_from(c) {
            Ok(b) => buf.put_u8(b),
            Err(_) => {
                let mut utf8 = [0u8; 4];
                buf.put_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    buf.freeze()
}

/// Returns the number of wire bytes `raw` occupies.
#[must_use]
pub fn wire_len(raw: &str) -> usize {
    raw.chars()
        .map(|c| if u32::from(c) <= 0xFF { 1 } else { c.len_utf8() })
        .sum()
}

/// Returns the sum of the wire byte values of `raw`.
#[must_use]
pub fn wire_sum(raw: &str) -> u64 {
    to_wire_bytes(raw).iter().map(|&b| u64::from(b)).sum()
}

/// Decodes backslash escapes in a byte line into the latin-1 string form.
///
/// Recognised escapes are `\xNN`, `\n`, `\r`, `\t`, `\0` and `\\`. Any other
/// backslash sequence is kept literally.
#[must_use]
pub fn unescape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'\\' || i + 1 >= bytes.len() {
            out.push(char::from(b));
            i += 1;
            continue;
        }
        match bytes[i + 1] {
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'0' => out.push('\0'),
            b'\\' => out.push('\\'),
            b'x' => match bytes.get(i + 2..i + 4).and_then(parse_hex_pair) {
                Some(value) => {
                    out.push(char::from(value));
                    i += 4;
                    continue;
                }
                None => {
                    out.push('\\');
                    i += 1;
                    continue;
                }
            },
            _ => {
                out.push('\\');
                i += 1;
                continue;
            }
        }
        i += 2;
    }
    out
}

fn parse_hex_pair(pair: &[u8]) -> Option<u8> {
    let text = std::str::from_utf8(pair).ok()?;
    u8::from_str_radix(text, 16).ok()
}

/// Renders non-printable characters as `\0xNN` for display.
///
/// `keep` is left untouched so that a printable delimiter stays readable.
#[must_use]
pub fn escape_binary(raw: &str, keep: char) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == keep || (c.is_ascii() && !c.is_ascii_control()) {
            out.push(c);
        } else {
            out.push_str(&format!("\\0x{:02x}", u32::from(c)));
        }
    }
    out
}
