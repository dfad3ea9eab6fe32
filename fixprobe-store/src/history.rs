/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Per-session message history.
//!
//! Every inbound and outbound message is appended to a CSV file on disk.
//! The in-memory log, which queries and response correlation read, skips
//! plain heartbeats unless heartbeat logging is on. Ids are assigned only to
//! entries kept in memory, so the in-memory sequence has no gaps.

use crate::files::{ExportFormat, write_message};
use crate::pattern::Filter;
use csv::{QuoteStyle, Writer, WriterBuilder};
use fixprobe_core::error::StoreError;
use fixprobe_core::message::MsgType;
use fixprobe_core::tags;
use fixprobe_core::types::{Direction, EntryState, Route, SessionId, Timestamp};
use fixprobe_tagvalue::WireCodec;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// Column names of the on-disk history log.
pub const HISTORY_HEADER: [&str; 7] = [
    "Timestamp",
    "UUID",
    "State",
    "Route",
    "Message Type",
    "Message",
    "Notes",
];

/// Suffix of history log file names.
pub const HISTORY_FILE_SUFFIX: &str = "fixprobe.log";

/// A message about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    /// Time the message was seen.
    pub timestamp: Timestamp,
    /// Unique reference for this record.
    pub uuid: Uuid,
    /// Inbound or outbound.
    pub direction: Direction,
    /// Admin or application hook.
    pub route: Route,
    /// Sent as recorded, or replaced by a substitution.
    pub state: EntryState,
    /// MsgType of the message.
    pub msg_type: MsgType,
    /// The message in printable-delimited form.
    pub raw: String,
    /// Free-form annotation.
    pub notes: String,
}

impl EntryDraft {
    /// Creates a draft stamped with the current time and a fresh uuid.
    #[must_use]
    pub fn new(direction: Direction, route: Route, msg_type: MsgType, raw: impl Into<String>) -> Self {
        Self {
            timestamp: Timestamp::now(),
            uuid: Uuid::new_v4(),
            direction,
            route,
            state: EntryState::Sent,
            msg_type,
            raw: raw.into(),
            notes: String::new(),
        }
    }

    /// Sets the entry state.
    #[must_use]
    pub fn with_state(mut self, state: EntryState) -> Self {
        self.state = state;
        self
    }

    /// Sets the notes column.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Returns the route column, e.g. `OUT(ADM)`.
    #[must_use]
    pub fn route_label(&self) -> String {
        format!("{}({})", self.direction.as_str(), self.route.as_str())
    }
}

/// A recorded history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Monotonic per-session id, starting at 0.
    pub sequence_id: u64,
    /// Time the message was seen.
    pub timestamp: Timestamp,
    /// Unique reference for this record.
    pub uuid: Uuid,
    /// Inbound or outbound.
    pub direction: Direction,
    /// Admin or application hook.
    pub route: Route,
    /// Sent as recorded, or replaced by a substitution.
    pub state: EntryState,
    /// MsgType of the message.
    pub msg_type: MsgType,
    /// The message in printable-delimited form.
    pub raw: String,
    /// Free-form annotation.
    pub notes: String,
}

/// Append-only history of one session.
pub struct HistoryLog {
    entries: Vec<LogEntry>,
    next_id: u64,
    log_heartbeat: bool,
    path: Option<PathBuf>,
    writer: Option<Writer<File>>,
    codec: WireCodec,
}

impl HistoryLog {
    /// Creates a history that is kept in memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            log_heartbeat: false,
            path: None,
            writer: None,
            codec: WireCodec::default(),
        }
    }

    /// Sets the codec used to inspect and export entries.
    #[must_use]
    pub fn with_codec(mut self, codec: WireCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Creates a history that also appends to a CSV file in `dir`.
    ///
    /// The file is named `<timestamp>-<session>.fixprobe.log`.
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the directory or file cannot be created.
    pub fn with_file(session_id: &SessionId, dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "{}-{}.{HISTORY_FILE_SUFFIX}",
            Timestamp::now().format_file_stamp(),
            session_id.file_stem()
        ));
        let is_new = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .double_quote(false)
            .escape(b'\\')
            .from_writer(file);
        if is_new {
            writer
                .write_record(HISTORY_HEADER)
                .and_then(|()| writer.flush().map_err(csv::Error::from))
                .map_err(|err| StoreError::Io(err.to_string()))?;
        }
        Ok(Self {
            path: Some(path),
            writer: Some(writer),
            ..Self::in_memory()
        })
    }

    /// Enables or disables in-memory recording of plain heartbeats.
    pub fn set_log_heartbeat(&mut self, enabled: bool) {
        self.log_heartbeat = enabled;
    }

    /// Returns whether plain heartbeats are kept in memory.
    #[must_use]
    pub const fn log_heartbeat(&self) -> bool {
        self.log_heartbeat
    }

    /// Returns the on-disk log path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records `draft`.
    ///
    /// The CSV row is always written. Returns the in-memory entry, or `None`
    /// if the message is a suppressed heartbeat.
    pub fn append(&mut self, draft: EntryDraft) -> Option<&LogEntry> {
        self.write_row(&draft);

        let plain_heartbeat = draft.msg_type.is_heartbeat()
            && self.codec.get_field(&draft.raw, tags::TEST_REQ_ID).is_err();
        if plain_heartbeat && !self.log_heartbeat {
            return None;
        }

        let entry = LogEntry {
            sequence_id: self.next_id,
            timestamp: draft.timestamp,
            uuid: draft.uuid,
            direction: draft.direction,
            route: draft.route,
            state: draft.state,
            msg_type: draft.msg_type,
            raw: draft.raw,
            notes: draft.notes,
        };
        self.next_id += 1;
        self.entries.push(entry);
        self.entries.last()
    }

    fn write_row(&mut self, draft: &EntryDraft) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let timestamp = draft.timestamp.format_millis();
        let uuid = draft.uuid.to_string();
        let route = draft.route_label();
        let msg_type = draft.msg_type.label();
        let row = [
            timestamp.as_str(),
            uuid.as_str(),
            draft.state.as_str(),
            route.as_str(),
            msg_type.as_str(),
            draft.raw.as_str(),
            draft.notes.as_str(),
        ];
        let result = writer
            .write_record(row)
            .and_then(|()| writer.flush().map_err(csv::Error::from));
        if let Err(err) = result {
            warn!(%err, path = ?self.path, "failed to write history row");
        }
    }

    /// Returns the last `depth` entries (all if `depth` is 0) whose raw text
    /// or message type name matches `filter`.
    #[must_use]
    pub fn query(&self, filter: &str, depth: usize) -> Vec<LogEntry> {
        let filter = Filter::new(filter);
        let matching: Vec<&LogEntry> = self
            .entries
            .iter()
            .filter(|entry| filter.is_match(&entry.raw) || filter.is_match(entry.msg_type.name()))
            .collect();
        let skip = if depth == 0 {
            0
        } else {
            matching.len().saturating_sub(depth)
        };
        matching.into_iter().skip(skip).cloned().collect()
    }

    /// Returns the entry with `sequence_id`.
    #[must_use]
    pub fn get(&self, sequence_id: u64) -> Option<&LogEntry> {
        usize::try_from(sequence_id)
            .ok()
            .and_then(|index| self.entries.get(index))
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Returns the number of in-memory entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is in memory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends the message of entry `sequence_id` to `path`.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` for an unknown id or `StoreError::Io`
    /// if the file cannot be written.
    pub fn export(
        &self,
        sequence_id: u64,
        path: &Path,
        format: ExportFormat,
    ) -> Result<(), StoreError> {
        let entry = self.get(sequence_id).ok_or_else(|| StoreError::NotFound {
            id: sequence_id.to_string(),
        })?;
        write_message(path, &self.codec, &entry.raw, format)
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for HistoryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryLog")
            .field("entries", &self.entries.len())
            .field("log_heartbeat", &self.log_heartbeat)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(msg_type: &str, raw: &str) -> EntryDraft {
        EntryDraft::new(Direction::Sent, Route::Admin, MsgType::new(msg_type), raw)
    }

    #[test]
    fn test_ids_are_monotonic_without_gaps() {
        let mut log = HistoryLog::in_memory();
        log.append(draft("A", "35=A|"));
        assert!(log.append(draft("0", "35=0|")).is_none());
        let entry = log.append(draft("D", "35=D|")).unwrap();
        assert_eq!(entry.sequence_id, 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_heartbeat_with_test_req_id_is_kept() {
        let mut log = HistoryLog::in_memory();
        assert!(log.append(draft("0", "35=0|112=PING|")).is_some());
    }

    #[test]
    fn test_custom_delimiter_heartbeat_detection() {
        let mut log = HistoryLog::in_memory().with_codec(WireCodec::new('^'));
        assert!(log.append(draft("0", "35=0^112=PING^")).is_some());
        assert!(log.append(draft("0", "35=0^")).is_none());
    }

    #[test]
    fn test_heartbeat_logging_enabled() {
        let mut log = HistoryLog::in_memory();
        log.set_log_heartbeat(true);
        assert!(log.append(draft("0", "35=0|")).is_some());
    }

    #[test]
    fn test_query_depth_and_filter() {
        let mut log = HistoryLog::in_memory();
        for raw in ["35=A|", "35=D|55=A|", "35=D|55=B|", "35=8|"] {
            let msg_type = raw[3..4].to_string();
            log.append(draft(&msg_type, raw));
        }
        assert_eq!(log.query("", 0).len(), 4);
        let last_two = log.query("", 2);
        assert_eq!(last_two[0].sequence_id, 2);
        assert_eq!(last_two[1].sequence_id, 3);
        let orders = log.query("newordersingle", 0);
        assert_eq!(orders.len(), 2);
        assert_eq!(log.query("55=b", 1)[0].raw, "35=D|55=B|");
        assert!(log.query("nothing", 0).is_empty());
    }

    #[test]
    fn test_file_log_records_suppressed_heartbeats() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionId::new("FIX.4.4", "ME", "THEM");
        let mut log = HistoryLog::with_file(&session, dir.path()).unwrap();
        log.append(draft("0", "35=0|"));
        log.append(
            draft("D", "35=D|58=say \"hi\"|")
                .with_state(EntryState::Intercepted)
                .with_notes("note"),
        );

        let path = log.path().unwrap().to_path_buf();
        assert!(path.to_string_lossy().ends_with("-FIX.4.4-ME-THEM.fixprobe.log"));
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "\"Timestamp\",\"UUID\",\"State\",\"Route\",\"Message Type\",\"Message\",\"Notes\""
        );
        assert!(lines[1].contains("\"SENT\",\"OUT(ADM)\",\"0 (Heartbeat)\",\"35=0|\""));
        assert!(lines[2].contains("\"INTERCEPTED\""));
        assert!(lines[2].contains("\"35=D|58=say \\\"hi\\\"|\",\"note\""));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_export_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = HistoryLog::in_memory();
        log.append(draft("A", "8=FIX.4.2|35=A|"));
        let path = dir.path().join("entry.txt");
        log.export(0, &path, ExportFormat::Raw).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "8=FIX.4.2|35=A|\n");
        assert!(matches!(
            log.export(5, &path, ExportFormat::Raw),
            Err(StoreError::NotFound { .. })
        ));
    }
}
