/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message file import and export.
//!
//! Exported files hold one message per line in raw (printable-delimited),
//! binary (SOH-delimited) or XML form. Import scans arbitrary text such as
//! engine logs or capture dumps for anything shaped like a FIX message.

use crate::memory::MessageStore;
use crate::traits::OverwritePrompt;
use fixprobe_core::error::StoreError;
use fixprobe_core::tags;
use fixprobe_tagvalue::{SOH_CHAR, WireCodec, bytes_to_ascii, to_wire_bytes, validate};
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// On-disk form of an exported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Printable delimiter.
    Raw,
    /// SOH delimiter.
    #[default]
    Binary,
    /// One `<field>` element per field.
    Xml,
}

impl ExportFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Raw => "txt",
            Self::Binary => "bin",
            Self::Xml => "xml",
        }
    }

    /// Picks the format from a file extension, defaulting to binary.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .unwrap_or_default()
    }

    /// Renders `raw` in this format.
    #[must_use]
    pub fn render(self, codec: &WireCodec, raw: &str) -> String {
        match self {
            Self::Raw => codec.to_printable(raw),
            Self::Binary => codec.to_binary(raw),
            Self::Xml => to_xml(codec, raw),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "raw" | "text" => Ok(Self::Raw),
            "bin" | "binary" => Ok(Self::Binary),
            "xml" => Ok(Self::Xml),
            other => Err(StoreError::InvalidMessage {
                reason: format!("unknown export format '{other}'"),
            }),
        }
    }
}

fn to_xml(codec: &WireCodec, raw: &str) -> String {
    let mut xml = String::from("<message>\n");
    for field in codec.to_list(raw) {
        let value = field.value_str().replace("]]>", "]]]]><![CDATA[>");
        xml.push_str(&format!(
            "  <field number=\"{}\"><![CDATA[{}]]></field>\n",
            field.tag, value
        ));
    }
    xml.push_str("</message>");
    xml
}

/// Appends `raw` to `path` in `format`, followed by a newline.
///
/// Parent directories are created as needed.
///
/// # Errors
/// Returns `StoreError::Io` if the file cannot be written.
pub fn write_message(
    path: &Path,
    codec: &WireCodec,
    raw: &str,
    format: ExportFormat,
) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&to_wire_bytes(&format.render(codec, raw)))?;
    file.write_all(b"\n")?;
    Ok(())
}

/// CompIDs substituted into imported messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Replaces SenderCompID (49).
    pub sender_comp_id: Option<String>,
    /// Replaces TargetCompID (56).
    pub target_comp_id: Option<String>,
}

/// Extracts FIX messages from text, one candidate per line.
///
/// Lines starting with `#` are skipped. Literal `\x01` escapes count as SOH.
/// Messages with the same tag layout are de-duplicated, the last one winning.
/// Results use the printable delimiter.
#[must_use]
pub fn extract_messages(content: &[u8], codec: &WireCodec, options: &ImportOptions) -> Vec<String> {
    let printable = regex::escape(&codec.printable_delimiter().to_string());
    let pattern = format!(r"(8=FIX.*(?:\x01|{printable})10=[0-9]{{3}}(?:\x01|{printable}))");
    let Ok(message_regex) = Regex::new(&pattern) else {
        return Vec::new();
    };

    let mut messages: Vec<(String, String)> = Vec::new();
    for line in content.split(|&b| b == b'\n') {
        if line.starts_with(b"#") {
            continue;
        }
        let text = bytes_to_ascii(line).replace("\\x01", &SOH_CHAR.to_string());
        let Some(found) = message_regex.captures(&text).and_then(|c| c.get(1)) else {
            continue;
        };

        let mut fields = Vec::new();
        let mut signature = String::new();
        for field in codec.to_list(&codec.to_printable(found.as_str())) {
            let Some(value) = field.value.as_deref() else {
                continue;
            };
            let tag = field.tag.trim().to_string();
            let value = match field.tag_number() {
                Some(tags::SENDER_COMP_ID) => options.sender_comp_id.as_deref().unwrap_or(value),
                Some(tags::TARGET_COMP_ID) => options.target_comp_id.as_deref().unwrap_or(value),
                _ => value,
            };
            signature.push_str(&tag);
            signature.push(',');
            fields.push(format!("{tag}={value}"));
        }

        let delimiter = codec.printable_delimiter().to_string();
        let message = format!("{}{delimiter}", fields.join(&delimiter));
        match messages.iter_mut().find(|(key, _)| *key == signature) {
            Some(existing) => existing.1 = message,
            None => messages.push((signature, message)),
        }
    }
    messages.into_iter().map(|(_, message)| message).collect()
}

impl MessageStore {
    /// Imports every FIX message found in the file at `path` as one batch.
    ///
    /// Each message is validated, with BodyLength and CheckSum repair, before
    /// saving; messages that still fail are skipped with a warning.
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the file cannot be read.
    pub fn import_file(
        &self,
        path: &Path,
        options: &ImportOptions,
        prompt: Option<&mut dyn OverwritePrompt>,
    ) -> Result<Vec<String>, StoreError> {
        let content = fs::read(path)?;
        let codec = *self.codec();
        let candidates = extract_messages(&content, &codec, options);
        info!(path = %path.display(), found = candidates.len(), "importing messages");

        let valid: Vec<String> = candidates
            .into_iter()
            .filter_map(|raw| match validate(&codec, &raw) {
                Ok(validated) => Some(codec.to_printable(&validated.raw)),
                Err(err) => {
                    warn!(%err, message = %raw, "skipping invalid message");
                    None
                }
            })
            .collect();

        Ok(self
            .save_batch(valid.iter().map(String::as_str), prompt)
            .into_iter()
            .filter_map(Result::ok)
            .collect())
    }

    /// Appends the message stored under `id` to `path`.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` for an unknown id or `StoreError::Io`
    /// if the file cannot be written.
    pub fn export(&self, id: &str, path: &Path, format: ExportFormat) -> Result<(), StoreError> {
        let message = self.get(id)?;
        write_message(path, self.codec(), &message.raw, format)
    }
}
