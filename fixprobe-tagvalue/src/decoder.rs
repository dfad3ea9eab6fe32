/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Validating FIX message decoder.
//!
//! Messages entering the store or the structured send path must carry
//! BeginString, BodyLength and MsgType as their first three fields and end
//! with CheckSum. [`Decoder`] checks that shape over SOH-delimited bytes,
//! locating fields with `memchr`. [`validate`] wraps it with the self-repair
//! used for operator input: a wrong BodyLength or CheckSum is re-derived and
//! the parse retried, at most once per field.

use crate::checksum::{calculate_checksum, format_checksum, parse_checksum};
use crate::codec::WireCodec;
use crate::encoding::{bytes_to_ascii, to_wire_bytes};
use fixprobe_core::error::DecodeError;
use fixprobe_core::message::MsgType;
use fixprobe_core::tags;
use memchr::memchr;
use smallvec::SmallVec;

/// SOH (Start of Header) delimiter used in FIX messages.
pub const SOH: u8 = 0x01;

/// Equals sign delimiter between tag and value.
pub const EQUALS: u8 = b'=';

/// Borrowed view of one field in a message buffer.
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    /// The field tag number.
    pub tag: u32,
    /// The value bytes, without delimiters.
    pub value: &'a [u8],
    /// Offset of the first tag byte in the buffer.
    pub start: usize,
    /// Offset one past the terminating delimiter.
    pub end: usize,
}

impl FieldRef<'_> {
    /// Returns the value as latin-1 text.
    #[must_use]
    pub fn text(&self) -> String {
        bytes_to_ascii(self.value)
    }
}

/// Summary of a structurally valid message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// BeginString (tag 8) value.
    pub begin_string: String,
    /// MsgType (tag 35) value.
    pub msg_type: MsgType,
    /// Declared BodyLength.
    pub body_length: usize,
    /// Declared CheckSum.
    pub checksum: u8,
    /// Number of fields including header and trailer.
    pub field_count: usize,
}

/// FIX message decoder over SOH-delimited bytes.
#[derive(Debug)]
pub struct Decoder<'a> {
    input: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a new decoder for the given input buffer.
    #[inline]
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, offset: 0 }
    }

    /// Decodes and checks a complete message.
    ///
    /// # Errors
    /// Returns `DecodeError` if a required field is missing or misplaced, a
    /// field is malformed, or the BodyLength or CheckSum do not match.
    pub fn decode(&mut self) -> Result<DecodedMessage, DecodeError> {
        if self.input.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut fields: SmallVec<[FieldRef<'a>; 32]> = SmallVec::new();
        while self.offset < self.input.len() {
            let field = self.next_field()?;
            let is_trailer = field.tag == tags::CHECKSUM;
            fields.push(field);
            if is_trailer {
                break;
            }
        }

        let begin_string = expect_at(&fields, 0, tags::BEGIN_STRING)?;
        if !begin_string.value.starts_with(b"FIX") {
            return Err(DecodeError::InvalidBeginString);
        }
        let body_length_field = expect_at(&fields, 1, tags::BODY_LENGTH)?;
        let msg_type = expect_at(&fields, 2, tags::MSG_TYPE)?;
        let checksum_field = fields
            .last()
            .filter(|field| field.tag == tags::CHECKSUM)
            .copied()
            .ok_or(DecodeError::MissingRequiredField {
                tag: tags::CHECKSUM,
            })?;

        let declared_length: usize = std::str::from_utf8(body_length_field.value)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(DecodeError::InvalidBodyLength)?;
        let calculated_length = checksum_field.start - body_length_field.end;
        if declared_length != calculated_length {
            return Err(DecodeError::BodyLengthMismatch {
                calculated: calculated_length,
                declared: declared_length,
            });
        }

        let calculated = calculate_checksum(&self.input[..checksum_field.start]);
        let declared = parse_checksum(checksum_field.value);
        if declared != Some(calculated) {
            return Err(DecodeError::ChecksumMismatch {
                calculated: bytes_to_ascii(&format_checksum(calculated)),
                declared: checksum_field.text(),
            });
        }

        Ok(DecodedMessage {
            begin_string: begin_string.text(),
            msg_type: MsgType::new(msg_type.text()),
            body_length: declared_length,
            checksum: calculated,
            field_count: fields.len(),
        })
    }

    /// Parses the next field from the buffer.
    ///
    /// # Errors
    /// Returns `DecodeError::MalformedField` for a segment without `=` and
    /// `DecodeError::InvalidTag` for a non-numeric tag.
    pub fn next_field(&mut self) -> Result<FieldRef<'a>, DecodeError> {
        let start = self.offset;
        let remaining = &self.input[start..];
        let end = memchr(SOH, remaining).unwrap_or(remaining.len());
        let segment = &remaining[..end];
        self.offset = (start + end + 1).min(self.input.len());

        let eq_pos = memchr(EQUALS, segment)
            .ok_or_else(|| DecodeError::MalformedField(bytes_to_ascii(segment)))?;
        let tag = parse_tag(&segment[..eq_pos])
            .ok_or_else(|| DecodeError::InvalidTag(bytes_to_ascii(&segment[..eq_pos])))?;

        Ok(FieldRef {
            tag,
            value: &segment[eq_pos + 1..],
            start,
            end: self.offset,
        })
    }
}

fn expect_at<'a>(
    fields: &[FieldRef<'a>],
    position: usize,
    tag: u32,
) -> Result<FieldRef<'a>, DecodeError> {
    match fields.get(position) {
        Some(field) if field.tag == tag => Ok(*field),
        Some(_) if fields.iter().any(|f| f.tag == tag) => {
            Err(DecodeError::FieldOutOfOrder { tag, position })
        }
        _ => Err(DecodeError::MissingRequiredField { tag }),
    }
}

/// Parses a tag number from ASCII digits.
#[inline]
#[must_use]
pub fn parse_tag(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    bytes.iter().try_fold(0u32, |acc, &b| {
        if b.is_ascii_digit() {
            acc.checked_mul(10)?.checked_add(u32::from(b - b'0'))
        } else {
            None
        }
    })
}

/// A message that passed validation, possibly after repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMessage {
    /// The message in SOH-delimited form.
    pub raw: String,
    /// Decoded header summary.
    pub decoded: DecodedMessage,
    /// True if BodyLength was re-derived.
    pub repaired_body_length: bool,
    /// True if CheckSum was re-derived.
    pub repaired_checksum: bool,
}

impl ValidatedMessage {
    /// Returns the message type.
    #[inline]
    #[must_use]
    pub fn msg_type(&self) -> &MsgType {
        &self.decoded.msg_type
    }
}

/// Validates `raw`, repairing BodyLength and CheckSum at most once each.
///
/// # Errors
/// Returns the first `DecodeError` that cannot be repaired.
pub fn validate(codec: &WireCodec, raw: &str) -> Result<ValidatedMessage, DecodeError> {
    let mut binary = codec.to_binary(raw.trim_end_matches(['\r', '\n']));
    let mut repaired_body_length = false;
    let mut repaired_checksum = false;

    loop {
        let bytes = to_wire_bytes(&binary);
        match Decoder::new(&bytes).decode() {
            Ok(decoded) => {
                return Ok(ValidatedMessage {
                    raw: binary,
                    decoded,
                    repaired_body_length,
                    repaired_checksum,
                });
            }
            Err(DecodeError::BodyLengthMismatch { calculated, .. }) if !repaired_body_length => {
                binary = codec.set_field(&binary, tags::BODY_LENGTH, &calculated.to_string());
                repaired_body_length = true;
            }
            Err(DecodeError::ChecksumMismatch { calculated, .. }) if !repaired_checksum => {
                binary = codec.set_field(&binary, tags::CHECKSUM, &calculated);
                repaired_checksum = true;
            }
            Err(err) => return Err(err),
        }
    }
}
