/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Field fuzzing.
//!
//! Every payload is applied to a fresh copy of the target message, sent on
//! the raw path and paired with the first reply seen in the session history.
//! Results go to a CSV file, one row per payload.

use bytes::Bytes;
use csv::{QuoteStyle, Writer, WriterBuilder};
use fixprobe_core::error::FuzzError;
use fixprobe_core::tags;
use fixprobe_core::types::{SessionId, Timestamp};
use fixprobe_session::SequenceTracker;
use fixprobe_tagvalue::{
    SOH_CHAR, WireCodec, bytes_to_ascii, escape_binary, to_wire_bytes, unescape,
};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Marks the field under test while the message is rebuilt.
pub const FUZZ_PLACEHOLDER: &str = "\u{ac}\u{ac}REPLACE_ME\u{ac}\u{ac}";

/// Fields that are never fuzzed: BeginString, SenderCompID, TargetCompID
/// and SendingTime.
pub const PROTECTED_TAGS: [u32; 4] = [
    tags::BEGIN_STRING,
    tags::SENDER_COMP_ID,
    tags::TARGET_COMP_ID,
    tags::SENDING_TIME,
];

/// Header of the result CSV.
pub const FUZZ_HEADER: [&str; 4] = ["ID", "Payload", "Message", "Response"];

/// Number of single-byte values the generator starts from.
pub const GENERATED_PAYLOAD_RANGE: u8 = 100;

/// Pacing and output settings for a fuzz run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzOptions {
    /// Pause after each payload.
    pub payload_delay: Duration,
    /// Pause between history polls while awaiting a reply.
    pub poll_interval: Duration,
    /// History polls before giving up on a reply.
    pub poll_attempts: u32,
    /// Directory for result files.
    pub output_dir: PathBuf,
}

impl Default for FuzzOptions {
    fn default() -> Self {
        Self {
            payload_delay: Duration::from_millis(50),
            poll_interval: Duration::from_millis(50),
            poll_attempts: 10,
            output_dir: PathBuf::from("./output/"),
        }
    }
}

/// Outcome of a fuzz run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzReport {
    /// The result CSV.
    pub output: PathBuf,
    /// Rows written.
    pub rows: usize,
    /// Tags that were fuzzed.
    pub fields: Vec<u32>,
    /// Requested fields that were rejected.
    pub skipped: Vec<String>,
    /// Payloads whose send failed.
    pub failures: usize,
}

/// Parses a requested field and checks it against [`PROTECTED_TAGS`].
///
/// # Errors
/// Returns a reason when the field is not a tag number or is protected.
pub fn check_field(field: &str) -> Result<u32, String> {
    let tag: u32 = field
        .trim()
        .parse()
        .map_err(|_| format!("'{field}' is not a tag number"))?;
    if PROTECTED_TAGS.contains(&tag) {
        return Err(format!("tag {tag} is protected"));
    }
    Ok(tag)
}

/// Returns every single byte below [`GENERATED_PAYLOAD_RANGE`] except the
/// delimiters.
#[must_use]
pub fn generated_payloads(codec: &WireCodec) -> Vec<Bytes> {
    let excluded = [SOH_CHAR, codec.printable_delimiter(), '='];
    (0..GENERATED_PAYLOAD_RANGE)
        .filter(|b| !excluded.contains(&char::from(*b)))
        .map(|b| Bytes::copy_from_slice(&[b]))
        .collect()
}

/// Loads one payload per line from `path`.
///
/// Line terminators are stripped and `\xNN`-style escapes decoded.
///
/// # Errors
/// Returns `FuzzError::Output` if the file cannot be read.
pub fn load_dictionary(path: &Path) -> Result<Vec<Bytes>, FuzzError> {
    let content = fs::read(path)
        .map_err(|err| FuzzError::Output(format!("cannot read {}: {err}", path.display())))?;
    Ok(content
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(|line| to_wire_bytes(&unescape(line)))
        .collect())
}

/// Renders a CSV cell: non-printables escaped, newlines as `\n`.
fn cell(codec: &WireCodec, text: &str) -> String {
    escape_binary(
        &codec.to_printable(text).replace('\n', "\\n"),
        codec.printable_delimiter(),
    )
}

/// Drives fuzz runs through a [`SequenceTracker`].
#[derive(Debug)]
pub struct FuzzEngine {
    tracker: Arc<SequenceTracker>,
    codec: WireCodec,
    options: FuzzOptions,
}

impl FuzzEngine {
    /// Creates a fuzz engine.
    #[must_use]
    pub fn new(tracker: Arc<SequenceTracker>, options: FuzzOptions) -> Self {
        let codec = *tracker.registry().codec();
        Self {
            tracker,
            codec,
            options,
        }
    }

    /// Returns the run options.
    #[must_use]
    pub const fn options(&self) -> &FuzzOptions {
        &self.options
    }

    fn payloads(&self, dictionary: Option<&Path>) -> Result<Vec<Bytes>, FuzzError> {
        let payloads = match dictionary {
            Some(path) => load_dictionary(path).unwrap_or_else(|err| {
                error!(%err, "dictionary unavailable, using generated payloads");
                generated_payloads(&self.codec)
            }),
            None => generated_payloads(&self.codec),
        };
        if payloads.is_empty() {
            return Err(FuzzError::NoPayloads);
        }
        Ok(payloads)
    }

    fn open_output(&self, session_id: &SessionId) -> Result<(PathBuf, Writer<File>), FuzzError> {
        let output_err = |err: std::io::Error| FuzzError::Output(err.to_string());
        fs::create_dir_all(&self.options.output_dir).map_err(output_err)?;
        let path = self.options.output_dir.join(format!(
            "fuzz-{}-{}.csv",
            session_id.file_stem(),
            Timestamp::now().format_file_stamp()
        ));
        let file = File::create(&path).map_err(output_err)?;
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .double_quote(false)
            .escape(b'\\')
            .from_writer(file);
        writer
            .write_record(FUZZ_HEADER)
            .and_then(|()| writer.flush().map_err(csv::Error::from))
            .map_err(|err| FuzzError::Output(err.to_string()))?;
        Ok((path, writer))
    }

    /// Fuzzes `fields` of `target` on `session_id`.
    ///
    /// Protected or malformed fields are skipped with a warning. Payloads come
    /// from `dictionary` when it can be read, otherwise from
    /// [`generated_payloads`]. A failed send is recorded with an empty
    /// response and the run continues.
    ///
    /// # Errors
    /// Returns `FuzzError::NoFields` if no requested field may be fuzzed,
    /// `FuzzError::NoPayloads` for an empty dictionary, or
    /// `FuzzError::Output` if the result file cannot be written.
    pub async fn run(
        &self,
        session_id: &SessionId,
        target: &str,
        fields: &[String],
        dictionary: Option<&Path>,
    ) -> Result<FuzzReport, FuzzError> {
        let mut accepted = Vec::new();
        let mut skipped = Vec::new();
        for field in fields {
            match check_field(field) {
                Ok(tag) => accepted.push(tag),
                Err(reason) => {
                    warn!(field = %field, %reason, "invalid field, skipping");
                    skipped.push(field.clone());
                }
            }
        }
        if accepted.is_empty() {
            return Err(FuzzError::NoFields {
                fields: fields.to_vec(),
            });
        }

        let payloads = self.payloads(dictionary)?;
        let (output, mut writer) = self.open_output(session_id)?;
        info!(session = %session_id, fields = ?accepted, payloads = payloads.len(), "fuzzing message");

        let mut rows = 0usize;
        let mut failures = 0usize;
        for &tag in &accepted {
            for payload in &payloads {
                let payload_text = bytes_to_ascii(payload);
                let sending_time = Timestamp::now().format_millis().to_string();

                let mut message = self.codec.upsert_field(target, tag, FUZZ_PLACEHOLDER);
                message = self
                    .codec
                    .upsert_field(&message, tags::SENDING_TIME, &sending_time);
                message = message.replace(FUZZ_PLACEHOLDER, &payload_text);

                let response = match self.tracker.send_raw(session_id, &message, true).await {
                    Ok(sent) => {
                        message = sent;
                        self.await_response(session_id, &sending_time).await
                    }
                    Err(err) => {
                        warn!(session = %session_id, tag, %err, "fuzz payload send failed");
                        failures += 1;
                        String::new()
                    }
                };

                let record = [
                    rows.to_string(),
                    cell(&self.codec, &payload_text),
                    cell(&self.codec, &message),
                    cell(&self.codec, &response),
                ];
                writer
                    .write_record(&record)
                    .and_then(|()| writer.flush().map_err(csv::Error::from))
                    .map_err(|err| FuzzError::Output(err.to_string()))?;
                rows += 1;
                sleep(self.options.payload_delay).await;
            }
        }

        info!(session = %session_id, path = %output.display(), rows, "fuzz output saved");
        Ok(FuzzReport {
            output,
            rows,
            fields: accepted,
            skipped,
            failures,
        })
    }

    /// Polls the session history for the first entry that is not the message
    /// just sent, identified by its SendingTime.
    async fn await_response(&self, session_id: &SessionId, sending_time: &str) -> String {
        for _ in 0..self.options.poll_attempts {
            let last = self
                .tracker
                .registry()
                .with_session(session_id, |state| state.history().last().map(|e| e.raw.clone()));
            if let Some(raw) = last.filter(|raw| !raw.contains(sending_time)) {
                return raw;
            }
            sleep(self.options.poll_interval).await;
        }
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_fields_rejected() {
        for tag in ["8", "49", "56", "52"] {
            assert!(check_field(tag).is_err());
        }
        assert!(check_field("abc").is_err());
        assert_eq!(check_field(" 55 "), Ok(55));
    }

    #[test]
    fn test_generated_payloads_exclude_delimiters() {
        let payloads = generated_payloads(&WireCodec::default());
        assert_eq!(payloads.len(), 98);
        for excluded in [b"\x01", b"|", b"="] {
            assert!(!payloads.iter().any(|p| p.as_ref() == excluded));
        }
        assert!(payloads.iter().any(|p| p.as_ref() == b"\x00"));
        assert!(payloads.iter().all(|p| p.len() == 1 && p[0] < 100));
    }

    #[test]
    fn test_load_dictionary_unescapes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.txt");
        fs::write(&path, b"' OR 1=1--\r\n\\x00\\xff\n\nplain\n").unwrap();
        let payloads = load_dictionary(&path).unwrap();
        assert_eq!(payloads.len(), 3);
        assert_eq!(payloads[0].as_ref(), b"' OR 1=1--");
        assert_eq!(payloads[1].as_ref(), b"\x00\xff");
        assert_eq!(payloads[2].as_ref(), b"plain");
    }

    #[test]
    fn test_load_dictionary_missing_file() {
        let err = load_dictionary(Path::new("/nonexistent/dict.txt")).unwrap_err();
        assert!(matches!(err, FuzzError::Output(_)));
    }

    #[test]
    fn test_cell_escapes_binary_and_newlines() {
        let codec = WireCodec::default();
        assert_eq!(cell(&codec, "a\nb"), "a\\nb");
        assert_eq!(cell(&codec, "35=D\u{1}58=\u{7f}|"), "35=D|58=\\0x7f|");
    }

    mod runs {
        use super::*;
        use crate::application::ProbeApplication;
        use crate::testing::LoopbackEngine;
        use csv::StringRecord;
        use fixprobe_session::{
            Credentials, InterceptQueue, RegistryOptions, SessionConfig, SessionRegistry,
        };

        const TARGET: &str =
            "8=FIX.4.2|9=49|35=D|34=1|49=ME|56=THEM|11=ORD1|55=EUR/USD|38=100|10=000|";

        fn session() -> SessionId {
            SessionId::new("FIX.4.2", "ME", "THEM")
        }

        fn fuzz_engine(output_dir: &Path) -> (FuzzEngine, Arc<LoopbackEngine>) {
            let registry = Arc::new(SessionRegistry::new(RegistryOptions::default()));
            let intercept = Arc::new(InterceptQueue::new());
            let application = Arc::new(ProbeApplication::new(registry.clone(), intercept.clone()));
            let engine = Arc::new(LoopbackEngine::new(
                application.clone(),
                [SessionConfig::new("FIX.4.2", "ME", "THEM")],
            ));
            let tracker = Arc::new(
                SequenceTracker::new(registry, engine.clone(), Credentials::default())
                    .with_intercept(intercept),
            );
            application.attach(&tracker);
            let options = FuzzOptions {
                payload_delay: Duration::ZERO,
                poll_interval: Duration::ZERO,
                poll_attempts: 1,
                output_dir: output_dir.to_path_buf(),
            };
            (FuzzEngine::new(tracker, options), engine)
        }

        fn read_rows(path: &Path) -> Vec<StringRecord> {
            csv::ReaderBuilder::new()
                .double_quote(false)
                .escape(Some(b'\\'))
                .from_path(path)
                .unwrap()
                .records()
                .map(Result::unwrap)
                .collect()
        }

        #[tokio::test]
        async fn test_unreadable_dictionary_uses_generated_payloads() {
            let dir = tempfile::tempdir().unwrap();
            let (fuzz, engine) = fuzz_engine(dir.path());
            let fields = vec!["55".to_string(), "38".to_string()];

            let report = fuzz
                .run(&session(), TARGET, &fields, Some(Path::new("/nonexistent/dict.txt")))
                .await
                .unwrap();

            assert_eq!(report.rows, 2 * 98);
            assert_eq!(report.failures, 0);
            assert_eq!(engine.sent(&session()).len(), 2 * 98);
            let lines = fs::read_to_string(&report.output).unwrap().lines().count();
            assert_eq!(lines, 1 + 2 * 98);
        }

        #[tokio::test]
        async fn test_failed_payload_is_recorded_and_run_continues() {
            let dir = tempfile::tempdir().unwrap();
            let dictionary = dir.path().join("dict.txt");
            fs::write(&dictionary, "first\nBAD\nlast\n").unwrap();
            let (fuzz, engine) = fuzz_engine(dir.path());
            engine.refuse_transmit(&session(), "55=BAD");

            let report = fuzz
                .run(&session(), TARGET, &["55".to_string()], Some(&dictionary))
                .await
                .unwrap();

            assert_eq!(report.rows, 3);
            assert_eq!(report.failures, 1);
            let sent = engine.sent(&session());
            assert_eq!(sent.len(), 2);
            assert!(sent[1].contains("\u{1}55=last\u{1}"));

            let rows = read_rows(&report.output);
            assert_eq!(rows.len(), 3);
            assert_eq!(&rows[1][1], "BAD");
            assert!(rows[1][2].contains("55=BAD"));
            assert_eq!(&rows[1][3], "");
            assert!(!rows[2][3].is_empty());
        }
    }
}

