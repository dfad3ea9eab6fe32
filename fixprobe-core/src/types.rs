/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Core types shared across the toolkit.
//!
//! - [`SeqNum`]: Sequence number wrapper
//! - [`Timestamp`]: FIX-formatted UTC timestamp
//! - [`SessionId`]: Identifier of a logical FIX session
//! - [`Direction`], [`Route`], [`EntryState`]: History entry classification
//! - [`Side`]: Order side used by message templates

use arrayvec::ArrayString;
use chrono::{DateTime, Utc};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// FIX message sequence number.
///
/// Sequence numbers start at 1 and increment for each message sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct SeqNum(u64);

impl SeqNum {
    /// Creates a new sequence number.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw sequence number value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the next sequence number.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns this sequence number advanced by `n`.
    #[inline]
    #[must_use]
    pub const fn advance(self, n: u64) -> Self {
        Self(self.0 + n)
    }
}

impl Default for SeqNum {
    fn default() -> Self {
        Self(1)
    }
}

impl From<u64> for SeqNum {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UTC timestamp with millisecond resolution.
///
/// Formatted as `YYYYMMDD-HH:MM:SS.sss` for SendingTime and history entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    millis_since_epoch: i64,
}

impl Timestamp {
    /// Creates a timestamp from milliseconds since Unix epoch.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self {
            millis_since_epoch: millis,
        }
    }

    /// Returns the current UTC timestamp.
    #[inline]
    #[must_use]
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// Returns milliseconds since Unix epoch.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.millis_since_epoch
    }

    /// Converts to a chrono `DateTime<Utc>`.
    #[must_use]
    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis_since_epoch).unwrap_or_default()
    }

    /// Formats the timestamp in FIX format with millisecond precision.
    ///
    /// Format: `YYYYMMDD-HH:MM:SS.sss`
    #[must_use]
    pub fn format_millis(self) -> ArrayString<21> {
        let dt = self.to_datetime();
        let mut buf = ArrayString::new();
        let _ = std::fmt::write(
            &mut buf,
            format_args!("{}", dt.format("%Y%m%d-%H:%M:%S%.3f")),
        );
        buf
    }

    /// Formats the timestamp for use in file names.
    ///
    /// Format: `YYYYMMDD-HHMMSS`
    #[must_use]
    pub fn format_file_stamp(self) -> ArrayString<15> {
        let dt = self.to_datetime();
        let mut buf = ArrayString::new();
        let _ = std::fmt::write(&mut buf, format_args!("{}", dt.format("%Y%m%d-%H%M%S")));
        buf
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            millis_since_epoch: dt.timestamp_millis(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_millis())
    }
}

/// Unique identifier for a FIX session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId {
    /// FIX version string (e.g., "FIX.4.4").
    pub begin_string: String,
    /// Our CompID.
    pub sender_comp_id: String,
    /// Counterparty CompID.
    pub target_comp_id: String,
}

impl SessionId {
    /// Creates a new session ID.
    ///
    /// # Arguments
    /// * `begin_string` - FIX version string
    /// * `sender_comp_id` - Our CompID
    /// * `target_comp_id` - Counterparty CompID
    #[must_use]
    pub fn new(
        begin_string: impl Into<String>,
        sender_comp_id: impl Into<String>,
        target_comp_id: impl Into<String>,
    ) -> Self {
        Self {
            begin_string: begin_string.into(),
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
        }
    }

    /// Returns a form of the identifier that is safe inside file names.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!(
            "{}-{}-{}",
            self.begin_string, self.sender_comp_id, self.target_comp_id
        )
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}",
            self.begin_string, self.sender_comp_id, self.target_comp_id
        )
    }
}

/// Whether a message left or reached this side of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Outbound.
    Sent,
    /// Inbound.
    Received,
}

impl Direction {
    /// Short label used in the history log route column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "OUT",
            Self::Received => "IN",
        }
    }
}

/// Which hook family handled a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Route {
    /// Session-level traffic.
    Admin,
    /// Application traffic.
    App,
}

impl Route {
    /// Short label used in the history log route column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADM",
            Self::App => "APP",
        }
    }
}

/// What happened to a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryState {
    /// Transmitted or received as recorded.
    Sent,
    /// Replaced by a queued substitution before transmission.
    Intercepted,
}

impl EntryState {
    /// Returns the upper-case label written to log files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Intercepted => "INTERCEPTED",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order side (tag 54) used by the order templates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order.
    Buy = b'1',
    /// Sell order.
    Sell = b'2',
}

impl Side {
    /// Creates a Side from its wire character.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        u8::try_from(c).ok().and_then(Self::from_u8)
    }

    /// Returns the wire character.
    #[must_use]
    pub const fn as_char(self) -> char {
        self as u8 as char
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
