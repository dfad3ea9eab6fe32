/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixprobe Store
//!
//! Message retention for the fixprobe toolkit.
//!
//! ## Components
//!
//! - [`MessageStore`]: saved messages keyed by collision-safe ids
//! - [`HistoryLog`]: per-session record of every message seen, mirrored to CSV
//! - [`files`]: message import from captures and export to raw, binary or XML

pub mod files;
pub mod history;
pub mod memory;
pub mod pattern;
pub mod traits;

pub use files::{ExportFormat, ImportOptions, extract_messages, write_message};
pub use history::{EntryDraft, HISTORY_HEADER, HistoryLog, LogEntry};
pub use memory::{MessageStore, StoredMessage};
pub use pattern::Filter;
pub use traits::{CodecClassifier, MessageClassifier, OverwritePrompt, OverwriteResponse};
