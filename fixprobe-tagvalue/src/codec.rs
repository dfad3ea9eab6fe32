/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Raw tag=value message editing.
//!
//! [`WireCodec`] operates directly on delimited message strings and never
//! validates them: missing or corrupt header and trailer fields, non-numeric
//! tags and stray delimiters are all preserved. The delimiter is detected per
//! message, either SOH or the configured printable substitute.

use crate::checksum::compute_checksum;
use crate::encoding::wire_len;
use fixprobe_core::error::DecodeError;
use fixprobe_core::tags;
use fixprobe_core::types::SeqNum;
use std::fmt;

/// SOH as a `char`.
pub const SOH_CHAR: char = '\u{1}';

/// Default printable delimiter.
pub const DEFAULT_PRINTABLE_DELIMITER: char = '|';

/// One `tag=value` segment of a raw message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    /// Text before the first `=`, or the whole segment if there is none.
    pub tag: String,
    /// Text after the first `=`.
    pub value: Option<String>,
}

impl RawField {
    /// Creates a field from a tag number and value.
    #[must_use]
    pub fn new(tag: u32, value: impl Into<String>) -> Self {
        Self {
            tag: tag.to_string(),
            value: Some(value.into()),
        }
    }

    fn parse(segment: &str) -> Self {
        match segment.split_once('=') {
            Some((tag, value)) => Self {
                tag: tag.to_string(),
                value: Some(value.to_string()),
            },
            None => Self {
                tag: segment.to_string(),
                value: None,
            },
        }
    }

    /// Returns the numeric tag, if the tag text is a plain number.
    #[must_use]
    pub fn tag_number(&self) -> Option<u32> {
        if self.tag.is_empty() || !self.tag.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.tag.parse().ok()
    }

    /// Returns true if this field carries `tag`.
    #[inline]
    #[must_use]
    pub fn is(&self, tag: u32) -> bool {
        self.value.is_some() && self.tag_number() == Some(tag) && !self.tag.starts_with('0')
    }

    /// Returns the value, or an empty string for segments without `=`.
    #[must_use]
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for RawField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.tag, value),
            None => f.write_str(&self.tag),
        }
    }
}

/// A raw message split into its fields.
///
/// Joining the fields with the recorded delimiter reproduces the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    fields: Vec<RawField>,
    delimiter: char,
    trailing: bool,
}

impl RawMessage {
    /// Returns the fields in wire order.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[RawField] {
        &self.fields
    }

    /// Returns the delimiter the message was split on.
    #[inline]
    #[must_use]
    pub const fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Returns the first field carrying `tag`.
    #[must_use]
    pub fn find(&self, tag: u32) -> Option<&RawField> {
        self.fields.iter().find(|field| field.is(tag))
    }

    fn position(&self, tag: u32) -> Option<usize> {
        self.fields.iter().position(|field| field.is(tag))
    }
}

impl fmt::Display for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.delimiter)?;
            }
            write!(f, "{field}")?;
        }
        if self.trailing {
            write!(f, "{}", self.delimiter)?;
        }
        Ok(())
    }
}

/// Field-level editor for raw messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireCodec {
    printable: char,
}

impl WireCodec {
    /// Creates a codec with the given printable delimiter.
    #[must_use]
    pub const fn new(printable: char) -> Self {
        Self { printable }
    }

    /// Returns the printable delimiter.
    #[inline]
    #[must_use]
    pub const fn printable_delimiter(&self) -> char {
        self.printable
    }

    /// Detects the delimiter used by `raw`.
    ///
    /// A message ending in the printable delimiter uses it; one ending in SOH
    /// uses SOH. Without a trailing delimiter, whichever appears in the text
    /// wins, SOH first.
    #[must_use]
    pub fn delimiter_of(&self, raw: &str) -> char {
        if raw.ends_with(self.printable) {
            self.printable
        } else if raw.ends_with(SOH_CHAR) || raw.contains(SOH_CHAR) {
            SOH_CHAR
        } else if raw.contains(self.printable) {
            self.printable
        } else {
            SOH_CHAR
        }
    }

    /// Splits `raw` into fields.
    #[must_use]
    pub fn parse(&self, raw: &str) -> RawMessage {
        let delimiter = self.delimiter_of(raw);
        let trailing = raw.ends_with(delimiter);
        let body = if trailing {
            &raw[..raw.len() - delimiter.len_utf8()]
        } else {
            raw
        };
        let fields = if raw.is_empty() {
            Vec::new()
        } else {
            body.split(delimiter).map(RawField::parse).collect()
        };
        RawMessage {
            fields,
            delimiter,
            trailing,
        }
    }

    /// Returns the ordered `(tag, value)` pairs of `raw`.
    #[must_use]
    pub fn to_list(&self, raw: &str) -> Vec<RawField> {
        self.parse(raw).fields
    }

    /// Returns the value of the first field carrying `tag`.
    ///
    /// # Errors
    /// Returns `DecodeError::FieldNotFound` if no field carries `tag`.
    pub fn get_field(&self, raw: &str, tag: u32) -> Result<String, DecodeError> {
        self.parse(raw)
            .find(tag)
            .map(|field| field.value_str().to_string())
            .ok_or(DecodeError::FieldNotFound { tag })
    }

    /// Replaces the value of the first field carrying `tag`.
    ///
    /// All other fields keep their order and content. If `tag` is absent the
    /// message is returned unchanged; see [`Self::insert_field`].
    #[must_use]
    pub fn set_field(&self, raw: &str, tag: u32, value: &str) -> String {
        let mut message = self.parse(raw);
        match message.position(tag) {
            Some(pos) => {
                message.fields[pos].value = Some(value.to_string());
                message.to_string()
            }
            None => raw.to_string(),
        }
    }

    /// Inserts `tag=value` at zero-based field index `position`.
    ///
    /// Positions past the end append the field.
    #[must_use]
    pub fn insert_field(&self, raw: &str, position: usize, tag: u32, value: &str) -> String {
        let mut message = self.parse(raw);
        if raw.is_empty() {
            message.delimiter = self.printable;
        }
        let position = position.min(message.fields.len());
        message.fields.insert(position, RawField::new(tag, value));
        message.to_string()
    }

    /// Sets `tag` if present, otherwise inserts it just before the CheckSum
    /// field (or at the end when there is none).
    #[must_use]
    pub fn upsert_field(&self, raw: &str, tag: u32, value: &str) -> String {
        let message = self.parse(raw);
        if message.position(tag).is_some() {
            return self.set_field(raw, tag, value);
        }
        let position = message
            .position(tags::CHECKSUM)
            .unwrap_or(message.fields.len());
        self.insert_field(raw, position, tag, value)
    }

    /// Removes every field carrying `tag`.
    #[must_use]
    pub fn remove_field(&self, raw: &str, tag: u32) -> String {
        let mut message = self.parse(raw);
        message.fields.retain(|field| !field.is(tag));
        message.to_string()
    }

    /// Computes the BodyLength (9) value of `raw`.
    ///
    /// Counts the wire bytes of every field after the leading BeginString and
    /// BodyLength fields up to the first CheckSum field, one delimiter each.
    #[must_use]
    pub fn body_length(&self, raw: &str) -> usize {
        let message = self.parse(raw);
        message
            .fields
            .iter()
            .enumerate()
            .skip_while(|(i, field)| {
                (*i == 0 && field.is(tags::BEGIN_STRING)) || (*i <= 1 && field.is(tags::BODY_LENGTH))
            })
            .map(|(_, field)| field)
            .take_while(|field| !field.is(tags::CHECKSUM))
            .map(|field| wire_len(&field.to_string()) + 1)
            .sum()
    }

    /// Computes the CheckSum (10) value of `raw` as written by raw sends.
    ///
    /// See [`compute_checksum`] for the exact formula.
    #[must_use]
    pub fn checksum(&self, raw: &str) -> String {
        compute_checksum(&self.to_binary(raw))
    }

    /// Rewrites MsgSeqNum (34), BodyLength (9) and CheckSum (10).
    ///
    /// MsgSeqNum is inserted after MsgType when absent. BodyLength and
    /// CheckSum are only updated when present.
    #[must_use]
    pub fn refresh(&self, raw: &str, next_seq: SeqNum) -> String {
        let seq = next_seq.to_string();
        let message = self.parse(raw);
        let mut out = if message.position(tags::MSG_SEQ_NUM).is_some() {
            self.set_field(raw, tags::MSG_SEQ_NUM, &seq)
        } else {
            let position = message
                .position(tags::MSG_TYPE)
                .map_or(message.fields.len(), |pos| pos + 1);
            self.insert_field(raw, position, tags::MSG_SEQ_NUM, &seq)
        };
        out = self.set_field(&out, tags::BODY_LENGTH, &self.body_length(&out).to_string());
        self.set_field(&out, tags::CHECKSUM, &self.checksum(&out))
    }

    /// Converts `raw` to SOH-delimited form.
    #[must_use]
    pub fn to_binary(&self, raw: &str) -> String {
        raw.replace(self.printable, &SOH_CHAR.to_string())
    }

    /// Converts `raw` to printable-delimited form.
    #[must_use]
    pub fn to_printable(&self, raw: &str) -> String {
        raw.replace(SOH_CHAR, &self.printable.to_string())
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new(DEFAULT_PRINTABLE_DELIMITER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGON: &str = "8=FIX.4.2|9=5|35=A|10=000|";

    fn codec() -> WireCodec {
        WireCodec::default()
    }

    #[test]
    fn test_set_field_keeps_header_and_trailer() {
        assert_eq!(
            codec().set_field(LOGON, 35, "1"),
            "8=FIX.4.2|9=5|35=1|10=000|"
        );
    }

    #[test]
    fn test_set_then_get_returns_value_and_preserves_order() {
        let raw = "8=FIX.4.4|9=20|35=D|55=ABC|44=1.5|10=123|";
        let codec = codec();
        let updated = codec.set_field(raw, 55, "XYZ");
        assert_eq!(codec.get_field(&updated, 55).unwrap(), "XYZ");

        let others = |msg: &str| -> Vec<RawField> {
            codec.to_list(msg).into_iter().filter(|f| !f.is(55)).collect()
        };
        assert_eq!(others(raw), others(&updated));
    }

    #[test]
    fn test_set_field_absent_is_unchanged() {
        assert_eq!(codec().set_field(LOGON, 58, "x"), LOGON);
    }

    #[test]
    fn test_set_field_replaces_first_only() {
        let raw = "35=D|58=a|58=b|";
        assert_eq!(codec().set_field(raw, 58, "z"), "35=D|58=z|58=b|");
    }

    #[test]
    fn test_get_field_not_found() {
        let err = codec().get_field(LOGON, 58).unwrap_err();
        assert_eq!(err, DecodeError::FieldNotFound { tag: 58 });
    }

    #[test]
    fn test_get_field_does_not_match_prefix_tags() {
        let raw = "8=FIX.4.2|135=X|35=A|";
        assert_eq!(codec().get_field(raw, 35).unwrap(), "A");
    }

    #[test]
    fn test_insert_field_at_position() {
        let raw = "8=FIX.4.2|9=5|35=A|10=000|";
        assert_eq!(
            codec().insert_field(raw, 3, 58, "hi"),
            "8=FIX.4.2|9=5|35=A|58=hi|10=000|"
        );
        assert_eq!(
            codec().insert_field(raw, 99, 58, "hi"),
            "8=FIX.4.2|9=5|35=A|10=000|58=hi|"
        );
    }

    #[test]
    fn test_upsert_inserts_before_trailer() {
        assert_eq!(
            codec().upsert_field(LOGON, 58, "hi"),
            "8=FIX.4.2|9=5|35=A|58=hi|10=000|"
        );
        assert_eq!(
            codec().upsert_field(LOGON, 35, "0"),
            "8=FIX.4.2|9=5|35=0|10=000|"
        );
    }

    #[test]
    fn test_remove_field_removes_all() {
        let raw = "35=D|58=a|44=1|58=b|";
        assert_eq!(codec().remove_field(raw, 58), "35=D|44=1|");
    }

    #[test]
    fn test_body_length() {
        assert_eq!(codec().body_length(LOGON), 5);
        let binary = "8=FIX.4.4\u{1}9=0\u{1}35=0\u{1}34=2\u{1}10=000\u{1}";
        assert_eq!(codec().body_length(binary), 10);
    }

    #[test]
    fn test_body_length_tolerates_missing_header() {
        assert_eq!(codec().body_length("35=A|10=000|"), 5);
        assert_eq!(codec().body_length("35=A|58=x"), 10);
    }

    #[test]
    fn test_delimiter_detection() {
        let codec = codec();
        assert_eq!(codec.delimiter_of(LOGON), '|');
        assert_eq!(codec.delimiter_of("8=FIX.4.2\u{1}35=A\u{1}"), SOH_CHAR);
        assert_eq!(codec.delimiter_of("8=FIX.4.2\u{1}35=A"), SOH_CHAR);
        assert_eq!(codec.delimiter_of("8=FIX.4.2|35=A"), '|');
    }

    #[test]
    fn test_to_list_roundtrip() {
        let codec = codec();
        for raw in [
            LOGON,
            "8=FIX.4.4\u{1}9=12\u{1}35=D\u{1}58=a=b\u{1}10=001\u{1}",
            "8=FIX.4.2|junk||35=A",
        ] {
            let message = codec.parse(raw);
            assert_eq!(message.to_string(), raw);
        }
        let fields = codec.to_list(LOGON);
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[2], RawField::new(35, "A"));
    }

    #[test]
    fn test_custom_printable_delimiter() {
        let codec = WireCodec::new('^');
        assert_eq!(codec.set_field("35=A^58=x^", 58, "y"), "35=A^58=y^");
        assert_eq!(codec.to_binary("35=A^"), "35=A\u{1}");
    }

    #[test]
    fn test_refresh_sets_seq_length_and_checksum() {
        let codec = codec();
        let refreshed = codec.refresh("8=FIX.4.2|9=1|35=0|34=9|10=999|", SeqNum::new(7));
        assert_eq!(codec.get_field(&refreshed, 34).unwrap(), "7");
        assert_eq!(codec.get_field(&refreshed, 9).unwrap(), "10");
        assert_eq!(
            codec.get_field(&refreshed, 10).unwrap(),
            codec.checksum(&refreshed)
        );
    }

    #[test]
    fn test_refresh_inserts_missing_seq_after_msg_type() {
        let refreshed = codec().refresh(LOGON, SeqNum::new(3));
        assert!(refreshed.starts_with("8=FIX.4.2|9=10|35=A|34=3|10="));
    }

    #[test]
    fn test_printable_binary_conversion() {
        let codec = codec();
        let binary = codec.to_binary(LOGON);
        assert!(!binary.contains('|'));
        assert_eq!(codec.to_printable(&binary), LOGON);
    }
}
