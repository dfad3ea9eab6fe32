/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixprobe Core
//!
//! Core types and error definitions for the fixprobe FIX testing toolkit.
//!
//! This crate provides the building blocks used across all fixprobe crates:
//! - **Error types**: Unified error handling with `thiserror`
//! - **Message types**: [`MsgType`] classification with name lookup
//! - **Core types**: `SeqNum`, `Timestamp`, `SessionId`, history labels
//! - **Tags**: numbers of the fields the toolkit reads or rewrites

pub mod error;
pub mod message;
pub mod tags;
pub mod types;

pub use error::{
    DecodeError, DispatchError, EncodeError, FixError, FuzzError, Result, SessionError, StoreError,
};
pub use message::{MsgType, UNKNOWN_MSG_TYPE_NAME};
pub use types::{Direction, EntryState, Route, SeqNum, SessionId, Side, Timestamp};
