/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Store seams.
//!
//! - [`MessageClassifier`]: resolves the MsgType and BeginString used to name
//!   saved messages. A session engine adapter can provide its own.
//! - [`OverwritePrompt`]: asks the operator whether an existing id may be
//!   overwritten.

use fixprobe_core::error::DecodeError;
use fixprobe_core::message::MsgType;
use fixprobe_core::tags;
use fixprobe_tagvalue::WireCodec;
use std::fmt;
use std::str::FromStr;

/// BeginString used in ids when the message has none.
pub const UNKNOWN_BEGIN_STRING: &str = "UNKNOWN";

/// Classifies raw messages for id generation.
pub trait MessageClassifier: Send + Sync {
    /// Returns the message type of `raw`.
    fn msg_type(&self, raw: &str) -> MsgType;

    /// Returns the BeginString of `raw`.
    fn begin_string(&self, raw: &str) -> String;
}

/// Classifier that reads tags 35 and 8 straight from the raw text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecClassifier {
    codec: WireCodec,
}

impl CodecClassifier {
    /// Creates a classifier using `codec` for field lookup.
    #[must_use]
    pub const fn new(codec: WireCodec) -> Self {
        Self { codec }
    }
}

impl MessageClassifier for CodecClassifier {
    fn msg_type(&self, raw: &str) -> MsgType {
        self.codec
            .get_field(raw, tags::MSG_TYPE)
            .map_or_else(|_| MsgType::new(""), MsgType::new)
    }

    fn begin_string(&self, raw: &str) -> String {
        self.codec
            .get_field(raw, tags::BEGIN_STRING)
            .unwrap_or_else(|_| UNKNOWN_BEGIN_STRING.to_string())
    }
}

/// Operator answer to an overwrite prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteResponse {
    /// Overwrite this id.
    Yes,
    /// Keep the existing message and save under a new qualifier.
    No,
    /// Overwrite this and every later collision in the batch.
    YesAll,
    /// Never overwrite for the rest of the batch.
    NoAll,
}

impl OverwriteResponse {
    /// Returns true for the answers that persist across a batch.
    #[must_use]
    pub const fn is_sticky(self) -> bool {
        matches!(self, Self::YesAll | Self::NoAll)
    }

    /// Returns true if the answer allows overwriting.
    #[must_use]
    pub const fn overwrites(self) -> bool {
        matches!(self, Self::Yes | Self::YesAll)
    }
}

impl FromStr for OverwriteResponse {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let answer = s.trim().to_ascii_uppercase();
        let all = answer.contains("ALL");
        if answer.starts_with("YES") || answer == "Y" {
            Ok(if all { Self::YesAll } else { Self::Yes })
        } else if answer.starts_with("NO") || answer == "N" {
            Ok(if all { Self::NoAll } else { Self::No })
        } else {
            Err(DecodeError::InvalidFieldValue {
                tag: 0,
                reason: format!("unrecognised overwrite response '{}'", s.trim()),
            })
        }
    }
}

impl fmt::Display for OverwriteResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::YesAll => "YES_ALL",
            Self::NoAll => "NO_ALL",
        })
    }
}

/// Asks whether an existing store id may be overwritten.
pub trait OverwritePrompt {
    /// Returns the operator's answer for `id`.
    fn confirm(&mut self, id: &str) -> OverwriteResponse;
}

impl OverwritePrompt for OverwriteResponse {
    fn confirm(&mut self, _id: &str) -> OverwriteResponse {
        *self
    }
}

impl<F> OverwritePrompt for F
where
    F: FnMut(&str) -> OverwriteResponse,
{
    fn confirm(&mut self, id: &str) -> OverwriteResponse {
        self(id)
    }
}
