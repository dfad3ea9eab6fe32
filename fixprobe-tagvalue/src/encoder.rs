/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX message encoder.
//!
//! Builds well-formed messages field by field, prepending BeginString and
//! BodyLength and appending CheckSum on [`Encoder::finish`]. Used to build
//! message templates that the operator then edits.

use crate::checksum::{SOH, calculate_checksum, format_checksum};
use crate::encoding::bytes_to_ascii;
use bytes::{BufMut, BytesMut};

/// FIX message encoder.
#[derive(Debug)]
pub struct Encoder {
    /// Message body (between BodyLength and CheckSum), SOH-delimited.
    body: BytesMut,
    /// The BeginString value (e.g., "FIX.4.4").
    begin_string: String,
}

impl Encoder {
    /// Creates a new encoder with the specified BeginString.
    #[must_use]
    pub fn new(begin_string: impl Into<String>) -> Self {
        Self {
            body: BytesMut::with_capacity(256),
            begin_string: begin_string.into(),
        }
    }

    /// Appends a field with a string value.
    #[inline]
    pub fn put_str(&mut self, tag: u32, value: &str) -> &mut Self {
        self.put_raw(tag, value.as_bytes())
    }

    /// Appends a field with an unsigned integer value.
    #[inline]
    pub fn put_uint(&mut self, tag: u32, value: u64) -> &mut Self {
        let mut buf = itoa::Buffer::new();
        let s = buf.format(value);
        self.put_raw(tag, s.as_bytes())
    }

    /// Appends a field with a boolean value (Y/N).
    #[inline]
    pub fn put_bool(&mut self, tag: u32, value: bool) -> &mut Self {
        self.put_raw(tag, if value { b"Y" } else { b"N" })
    }

    /// Appends a field with a single character value.
    #[inline]
    pub fn put_char(&mut self, tag: u32, value: char) -> &mut Self {
        let mut buf = [0u8; 4];
        let s = value.encode_utf8(&mut buf);
        self.put_raw(tag, s.as_bytes())
    }

    /// Appends a field with raw bytes.
    #[inline]
    pub fn put_raw(&mut self, tag: u32, value: &[u8]) -> &mut Self {
        let mut tag_buf = itoa::Buffer::new();
        self.body.put_slice(tag_buf.format(tag).as_bytes());
        self.body.put_u8(b'=');
        self.body.put_slice(value);
        self.body.put_u8(SOH);
        self
    }

    /// Finalizes the message as SOH-delimited bytes.
    #[must_use]
    pub fn finish(&self) -> BytesMut {
        let mut len_buf = itoa::Buffer::new();
        let len_str = len_buf.format(self.body.len());

        let mut message = BytesMut::with_capacity(self.body.len() + self.begin_string.len() + 24);
        message.put_slice(b"8=");
        message.put_slice(self.begin_string.as_bytes());
        message.put_u8(SOH);
        message.put_slice(b"9=");
        message.put_slice(len_str.as_bytes());
        message.put_u8(SOH);
        message.put_slice(&self.body);

        let checksum = format_checksum(calculate_checksum(&message));
        message.put_slice(b"10=");
        message.put_slice(&checksum);
        message.put_u8(SOH);
        message
    }

    /// Finalizes the message as a raw string using `delimiter`.
    #[must_use]
    pub fn finish_with(&self, delimiter: char) -> String {
        let soh = char::from(SOH);
        bytes_to_ascii(&self.finish())
            .chars()
            .map(|c| if c == soh { delimiter } else { c })
            .collect()
    }

    /// Returns the current body length.
    #[inline]
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new("FIX.4.4")
    }
}
