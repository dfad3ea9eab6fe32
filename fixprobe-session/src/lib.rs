/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixprobe Session
//!
//! Session-level tooling layered over an external FIX engine.
//!
//! ## Features
//!
//! - **Registry**: per-session state behind one lock per session
//! - **Sequence tracking**: bounded logon/logout, attempt ceiling, repair of
//!   sequence numbers from counterparty rejections
//! - **Interception**: substitution of the next outbound message
//! - **Engine boundary**: the [`SessionEngine`] trait

pub mod adapter;
pub mod config;
pub mod intercept;
pub mod registry;
pub mod sequence;
pub mod state;
pub mod tracker;

pub use adapter::SessionEngine;
pub use config::{Credentials, SessionConfig, keys};
pub use intercept::{InterceptQueue, InterceptStatus};
pub use registry::{RegistryOptions, SessionRegistry, SharedSessionState};
pub use sequence::{SequenceHint, SequenceOverrides, parse_sequence_hints};
pub use state::{InFlightSubstitution, MAX_LOGON_ATTEMPTS, SessionState, SessionStatus};
pub use tracker::{POLL_INTERVAL, SequenceTracker};
