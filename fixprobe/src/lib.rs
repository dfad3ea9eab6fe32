/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixprobe
//!
//! A toolkit for testing FIX counterparties: edit, replay, intercept and fuzz
//! messages on live sessions driven by an external FIX engine.
//!
//! ## Features
//!
//! - **Byte-faithful editing**: messages are latin-1 text, so any byte survives
//!   field edits, checksum and BodyLength recomputation
//! - **Message store**: saved messages with collision-safe ids, file import and
//!   export
//! - **History**: every message per session, mirrored to a CSV log
//! - **Sequence repair**: bounded logon/logout and sequence overrides learned
//!   from counterparty rejections
//! - **Interception**: replace the next outbound message
//! - **Fuzzing**: per-field payload runs recorded to CSV
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fixprobe::prelude::*;
//!
//! fixprobe::logging::init_logging("info");
//! let probe = ProbeBuilder::from_config(ProbeConfig::from_env()?)
//!     .build(|application| MyEngine::connect(application));
//!
//! let session = SessionId::new("FIX.4.4", "ME", "THEM");
//! probe.logon(&session).await?;
//! let order = probe.new_message(&session, Template::OrderBuy)?;
//! probe.fuzz(&session, &order, &["55".to_string()], None).await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: errors, message types and identifiers
//! - [`tagvalue`]: the wire codec
//! - [`store`]: message store and history log
//! - [`session`]: session registry, sequence tracking and interception
//! - [`engine`]: engine hooks, fuzzing and the operator facade
//! - [`logging`]: subscriber setup

pub mod logging;

pub mod core {
    //! Errors, message types and identifiers.
    pub use fixprobe_core::*;
}

pub mod tagvalue {
    //! Raw tag=value codec.
    pub use fixprobe_tagvalue::*;
}

pub mod store {
    //! Message store and history log.
    pub use fixprobe_store::*;
}

pub mod session {
    //! Session registry, sequence tracking and interception.
    pub use fixprobe_session::*;
}

pub mod engine {
    //! Engine hooks, fuzzing and the operator facade.
    pub use fixprobe_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use fixprobe_core::{
        DecodeError, Direction, DispatchError, EntryState, FixError, FuzzError, MsgType, Result,
        Route, SeqNum, SessionError, SessionId, StoreError, Timestamp,
    };

    // Codec
    pub use fixprobe_tagvalue::{EditOp, Encoder, ValidatedMessage, WireCodec, validate};

    // Store
    pub use fixprobe_store::{ExportFormat, HistoryLog, LogEntry, MessageStore, OverwriteResponse};

    // Session
    pub use fixprobe_session::{
        Credentials, InterceptQueue, SequenceTracker, SessionConfig, SessionEngine,
        SessionRegistry,
    };

    // Engine
    pub use fixprobe_engine::{
        Action, Application, Dispatcher, FuzzReport, Probe, ProbeApplication, ProbeBuilder,
        ProbeConfig, Template,
    };
}
