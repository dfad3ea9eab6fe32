/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the fixprobe toolkit.
//!
//! This module provides a unified error hierarchy using `thiserror` for typed,
//! domain-specific errors across codec, store, session and fuzzing operations.
//! Codec and store errors are local and recoverable; session errors surface
//! timeouts and connectivity exhaustion to the operator without halting the
//! process.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`FixError`] as the error type.
pub type Result<T> = std::result::Result<T, FixError>;

/// Top-level error type for all fixprobe operations.
#[derive(Debug, Error)]
pub enum FixError {
    /// Error while reading or validating a raw message.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error while building a message.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error in session layer operations.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Error in message store or history operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error raised by a fuzz run.
    #[error("fuzz error: {0}")]
    Fuzz(#[from] FuzzError),

    /// Operator action could not be dispatched.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// I/O error from the filesystem.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while reading, editing or validating raw messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Message is empty.
    #[error("empty message")]
    Empty,

    /// A field does not have the `tag=value` shape.
    #[error("malformed field: {0}")]
    MalformedField(String),

    /// Invalid BeginString field (tag 8).
    #[error("invalid begin string: expected 8=FIX.x.y")]
    InvalidBeginString,

    /// Invalid BodyLength value.
    #[error("invalid body length value")]
    InvalidBodyLength,

    /// Declared BodyLength does not match the message body.
    #[error("body length mismatch: calculated {calculated}, declared {declared}")]
    BodyLengthMismatch {
        /// Calculated body length.
        calculated: usize,
        /// Declared body length in message.
        declared: usize,
    },

    /// Checksum mismatch between calculated and declared values.
    #[error("checksum mismatch: calculated {calculated}, declared {declared}")]
    ChecksumMismatch {
        /// Calculated checksum value.
        calculated: String,
        /// Declared checksum value in message.
        declared: String,
    },

    /// Invalid tag format (not a valid integer).
    #[error("invalid tag format: {0}")]
    InvalidTag(String),

    /// Missing required field.
    #[error("missing required field: tag {tag}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
    },

    /// Field lookup found nothing.
    #[error("field not found: tag {tag}")]
    FieldNotFound {
        /// The tag that was looked up.
        tag: u32,
    },

    /// A required header or trailer field is out of place.
    #[error("field out of order: tag {tag} expected at position {position}")]
    FieldOutOfOrder {
        /// The misplaced tag.
        tag: u32,
        /// Expected zero-based field index.
        position: usize,
    },

    /// Invalid field value for the expected type.
    #[error("invalid field value for tag {tag}: {reason}")]
    InvalidFieldValue {
        /// The tag number of the field.
        tag: u32,
        /// Description of why the value is invalid.
        reason: String,
    },

    /// Operator edit expression could not be parsed.
    #[error("invalid edit expression: {0}")]
    InvalidEdit(String),
}

/// Errors that occur while building messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Missing required field during encoding.
    #[error("missing required field: tag {tag}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
    },

    /// Field value contains the active delimiter.
    #[error("field value for tag {tag} contains the delimiter")]
    DelimiterInValue {
        /// The tag number of the field.
        tag: u32,
    },
}

/// Errors in session layer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Logon did not complete before the deadline.
    #[error("logon timed out after {elapsed:?}")]
    LogonTimeout {
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// Logout did not complete before the deadline.
    #[error("logout timed out after {elapsed:?}")]
    LogoutTimeout {
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// Too many consecutive logon attempts without success.
    #[error("connection lost after {attempts} logon attempts")]
    ConnectivityExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// No session with this identifier is known.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Session is not logged on.
    #[error("session not logged on: {0}")]
    NotLoggedOn(String),

    /// Session configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The external session engine reported a failure.
    #[error("engine error: {0}")]
    Engine(String),
}

/// Errors in message store and history operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No message is stored under this id.
    #[error("message not found: {id}")]
    NotFound {
        /// The missing store id or history id.
        id: String,
    },

    /// The message could not be accepted by the store.
    #[error("invalid message: {reason}")]
    InvalidMessage {
        /// Description of the problem.
        reason: String,
    },

    /// I/O error while reading or writing message files.
    #[error("store i/o error: {0}")]
    Io(String),
}

/// Errors that abort a fuzz run before any payload is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FuzzError {
    /// No fields survived validation.
    #[error("no fuzzable fields in {fields:?}")]
    NoFields {
        /// The requested fields.
        fields: Vec<String>,
    },

    /// No payloads are available.
    #[error("no payloads to send")]
    NoPayloads,

    /// The result CSV could not be written.
    #[error("fuzz output error: {0}")]
    Output(String),
}

/// Errors resolving an operator action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The verb does not name a known action.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// The action is known but has no registered handler.
    #[error("no handler registered for action: {0}")]
    Unhandled(String),

    /// The arguments do not fit the action.
    #[error("invalid arguments for {action}: {reason}")]
    InvalidArguments {
        /// The action name.
        action: String,
        /// What was wrong.
        reason: String,
    },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::ChecksumMismatch {
            calculated: "100".to_string(),
            declared: "200".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: calculated 100, declared 200"
        );
    }

    #[test]
    fn test_fix_error_from_decode() {
        let decode_err = DecodeError::Empty;
        let fix_err: FixError = decode_err.into();
        assert!(matches!(fix_err, FixError::Decode(DecodeError::Empty)));
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::ConnectivityExhausted { attempts: 5 };
        assert_eq!(err.to_string(), "connection lost after 5 logon attempts");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound {
            id: "FIX.4.2:Logon-A:1".to_string(),
        };
        assert_eq!(err.to_string(), "message not found: FIX.4.2:Logon-A:1");
    }

    #[test]
    fn test_store_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::UnknownAction("frobnicate".to_string());
        assert_eq!(err.to_string(), "unknown action: frobnicate");
    }
}
