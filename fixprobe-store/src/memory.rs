/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! In-memory message store.
//!
//! Saved messages are keyed by an id of the form
//! `<BeginString>:<MsgTypeName>-<MsgType>:<qualifier>`. Colliding ids are
//! either overwritten, when the operator confirms it, or bumped to the next
//! free qualifier. `YES_ALL`/`NO_ALL` answers stick until the current batch
//! ends.

use crate::pattern::Filter;
use crate::traits::{CodecClassifier, MessageClassifier, OverwritePrompt, OverwriteResponse};
use fixprobe_core::error::StoreError;
use fixprobe_core::message::MsgType;
use fixprobe_tagvalue::WireCodec;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A message saved in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredMessage {
    /// Unique store id.
    pub id: String,
    /// Message type at save time.
    pub msg_type: MsgType,
    /// The message in printable-delimited form.
    pub raw: String,
}

impl StoredMessage {
    /// Returns the type as shown in listings, e.g. `D (NewOrderSingle)`.
    #[must_use]
    pub fn type_label(&self) -> String {
        self.msg_type.label()
    }
}

/// Keyed collection of saved messages.
pub struct MessageStore {
    /// Saved messages by id.
    messages: RwLock<BTreeMap<String, StoredMessage>>,
    /// Sticky overwrite answer for the current batch.
    auto_response: Mutex<Option<OverwriteResponse>>,
    /// Resolves MsgType and BeginString for id generation.
    classifier: Arc<dyn MessageClassifier>,
    codec: WireCodec,
}

impl MessageStore {
    /// Creates an empty store that classifies messages by reading their tags.
    #[must_use]
    pub fn new(codec: WireCodec) -> Self {
        Self::with_classifier(codec, Arc::new(CodecClassifier::new(codec)))
    }

    /// Creates an empty store with a custom classifier.
    #[must_use]
    pub fn with_classifier(codec: WireCodec, classifier: Arc<dyn MessageClassifier>) -> Self {
        Self {
            messages: RwLock::new(BTreeMap::new()),
            auto_response: Mutex::new(None),
            classifier,
            codec,
        }
    }

    /// Returns the codec used to normalise saved messages.
    #[inline]
    #[must_use]
    pub fn codec(&self) -> &WireCodec {
        &self.codec
    }

    /// Derives the default id for `raw`, qualifier 1.
    #[must_use]
    pub fn generate_id(&self, raw: &str) -> String {
        let msg_type = self.classifier.msg_type(raw);
        format!(
            "{}:{}-{}:1",
            self.classifier.begin_string(raw),
            msg_type.name(),
            msg_type.as_str()
        )
    }

    /// Saves `raw` and returns the id it was stored under.
    ///
    /// Without an `explicit_id` the id is derived from the message. When the
    /// id is taken, the sticky batch answer or `prompt` decides between
    /// overwriting and moving to the next free qualifier. Without either the
    /// qualifier is incremented.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidMessage` for an empty message.
    pub fn save(
        &self,
        raw: &str,
        explicit_id: Option<&str>,
        prompt: Option<&mut dyn OverwritePrompt>,
    ) -> Result<String, StoreError> {
        let raw = raw.trim_end_matches(['\r', '\n']);
        if raw.is_empty() {
            return Err(StoreError::InvalidMessage {
                reason: "empty message".to_string(),
            });
        }

        let candidate = match explicit_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self.generate_id(raw),
        };

        let msg_type = self.classifier.msg_type(raw);
        let printable = self.codec.to_printable(raw);

        // The free qualifier is chosen and claimed under one write guard. The
        // guard is released only while the operator is asked.
        let mut messages = self.messages.write();
        let mut overwrite = false;
        if messages.contains_key(&candidate) {
            let sticky = *self.auto_response.lock();
            overwrite = match (sticky, prompt) {
                (Some(sticky), _) => sticky.overwrites(),
                (None, Some(prompt)) => {
                    drop(messages);
                    let answer = self.ask(&candidate, prompt);
                    messages = self.messages.write();
                    answer
                }
                (None, None) => false,
            };
        }
        let id = if overwrite {
            candidate
        } else {
            Self::next_free_id(&messages, candidate)
        };

        let message = StoredMessage {
            id: id.clone(),
            msg_type,
            raw: printable,
        };
        info!(id = %id, msg_type = %message.type_label(), overwrite, "storing message");
        messages.insert(id.clone(), message);
        Ok(id)
    }

    fn ask(&self, id: &str, prompt: &mut dyn OverwritePrompt) -> bool {
        let answer = prompt.confirm(id);
        debug!(id, %answer, "overwrite prompt answered");
        if answer.is_sticky() {
            *self.auto_response.lock() = Some(answer);
        }
        answer.overwrites()
    }

    /// Returns `candidate` with a numeric qualifier, bumped until unused.
    fn next_free_id(messages: &BTreeMap<String, StoredMessage>, candidate: String) -> String {
        let (prefix, mut qualifier) = match candidate.rsplit_once(':') {
            Some((prefix, last)) if !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) => {
                (prefix.to_string(), last.parse::<u64>().unwrap_or(1))
            }
            _ => (candidate, 1),
        };
        loop {
            let id = format!("{prefix}:{qualifier}");
            if !messages.contains_key(&id) {
                return id;
            }
            qualifier += 1;
        }
    }

    /// Saves every message in `raws` as one batch.
    ///
    /// The sticky overwrite answer is cleared afterwards.
    pub fn save_batch<'a>(
        &self,
        raws: impl IntoIterator<Item = &'a str>,
        mut prompt: Option<&mut dyn OverwritePrompt>,
    ) -> Vec<Result<String, StoreError>> {
        let mut results = Vec::new();
        for raw in raws {
            let prompt = prompt
                .as_mut()
                .map(|prompt| &mut **prompt as &mut dyn OverwritePrompt);
            results.push(self.save(raw, None, prompt));
        }
        self.end_batch();
        results
    }

    /// Clears the sticky overwrite answer.
    pub fn end_batch(&self) {
        *self.auto_response.lock() = None;
    }

    /// Removes a message. Missing ids are ignored.
    pub fn delete(&self, id: &str) -> Option<StoredMessage> {
        let removed = self.messages.write().remove(id);
        if removed.is_none() {
            debug!(id, "delete of unknown store id ignored");
        }
        removed
    }

    /// Returns the message stored under `id`.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no message has this id.
    pub fn get(&self, id: &str) -> Result<StoredMessage, StoreError> {
        self.messages
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// Returns the messages whose id or raw text matches `filter`, by id.
    #[must_use]
    pub fn list(&self, filter: &str) -> Vec<StoredMessage> {
        let filter = Filter::new(filter);
        self.messages
            .read()
            .values()
            .filter(|message| filter.is_match(&message.id) || filter.is_match(&message.raw))
            .cloned()
            .collect()
    }

    /// Returns true if `id` is in use.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.messages.read().contains_key(id)
    }

    /// Returns the number of stored messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new(WireCodec::default())
    }
}

impl std::fmt::Debug for MessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStore")
            .field("messages", &self.len())
            .field("auto_response", &*self.auto_response.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: &str = "8=FIX.4.2|9=5|35=D|55=ABC|10=000|";

    #[test]
    fn test_same_type_saves_get_consecutive_qualifiers() {
        let store = MessageStore::default();
        let first = store.save(ORDER, None, None).unwrap();
        let second = store.save(ORDER, None, None).unwrap();
        assert_eq!(first, "FIX.4.2:NewOrderSingle-D:1");
        assert_eq!(second, "FIX.4.2:NewOrderSingle-D:2");
    }

    #[test]
    fn test_unknown_type_id() {
        let store = MessageStore::default();
        let id = store.save("8=FIX.4.4|35=ZZ|", None, None).unwrap();
        assert_eq!(id, "FIX.4.4:UNKNOWN-ZZ:1");
    }

    #[test]
    fn test_explicit_id_gets_qualifier() {
        let store = MessageStore::default();
        assert_eq!(store.save(ORDER, Some("probe"), None).unwrap(), "probe:1");
        assert_eq!(store.save(ORDER, Some("probe"), None).unwrap(), "probe:2");
        assert_eq!(store.save(ORDER, Some("probe:1"), None).unwrap(), "probe:3");
    }

    #[test]
    fn test_collision_skips_taken_qualifiers() {
        let store = MessageStore::default();
        store.save(ORDER, Some("x:1"), None).unwrap();
        store.save(ORDER, Some("x:2"), None).unwrap();
        store.save(ORDER, Some("x:4"), None).unwrap();
        assert_eq!(store.save(ORDER, Some("x:1"), None).unwrap(), "x:3");
    }

    #[test]
    fn test_prompt_yes_overwrites() {
        let store = MessageStore::default();
        let id = store.save(ORDER, None, None).unwrap();
        let mut answer = OverwriteResponse::Yes;
        let updated = "8=FIX.4.2|9=5|35=D|55=XYZ|10=000|";
        assert_eq!(store.save(updated, None, Some(&mut answer)).unwrap(), id);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().raw, updated);
    }

    #[test]
    fn test_prompt_no_increments() {
        let store = MessageStore::default();
        store.save(ORDER, None, None).unwrap();
        let mut answer = OverwriteResponse::No;
        assert_eq!(
            store.save(ORDER, None, Some(&mut answer)).unwrap(),
            "FIX.4.2:NewOrderSingle-D:2"
        );
    }

    #[test]
    fn test_sticky_answer_lasts_until_batch_end() {
        let store = MessageStore::default();
        store.save(ORDER, None, None).unwrap();

        let mut asked = 0;
        let mut prompt = |_: &str| {
            asked += 1;
            OverwriteResponse::NoAll
        };
        let results = store.save_batch([ORDER, ORDER], Some(&mut prompt));
        assert_eq!(asked, 1);
        let ids: Vec<String> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(ids, ["FIX.4.2:NewOrderSingle-D:2", "FIX.4.2:NewOrderSingle-D:3"]);

        let mut yes = OverwriteResponse::Yes;
        assert_eq!(
            store.save(ORDER, None, Some(&mut yes)).unwrap(),
            "FIX.4.2:NewOrderSingle-D:1"
        );
    }

    #[test]
    fn test_yes_all_overwrites_without_asking_again() {
        let store = MessageStore::default();
        store.save(ORDER, Some("a"), None).unwrap();
        store.save(ORDER, Some("b"), None).unwrap();
        let mut asked = 0;
        let mut prompt = |_: &str| {
            asked += 1;
            OverwriteResponse::YesAll
        };
        assert_eq!(store.save(ORDER, Some("a:1"), Some(&mut prompt)).unwrap(), "a:1");
        assert_eq!(store.save(ORDER, Some("b:1"), None).unwrap(), "b:1");
        assert_eq!(asked, 1);
        store.end_batch();
        assert_eq!(store.save(ORDER, Some("b:1"), None).unwrap(), "b:2");
    }

    #[test]
    fn test_concurrent_saves_never_share_an_id() {
        let store = Arc::new(MessageStore::default());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        store.save(ORDER, None, None).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(store.len(), 1600);
        assert!(store.contains("FIX.4.2:NewOrderSingle-D:1600"));
    }

    #[test]
    fn test_batch_prompt_is_reused_per_message() {
        let store = MessageStore::default();
        let mut asked = Vec::new();
        let mut prompt = |id: &str| {
            asked.push(id.to_string());
            OverwriteResponse::No
        };
        let first = store.save_batch([ORDER], Some(&mut prompt));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].as_deref(), Ok("FIX.4.2:NewOrderSingle-D:1"));
        let second = store.save_batch([ORDER, ORDER], Some(&mut prompt));
        let ids: Vec<String> = second.into_iter().map(Result::unwrap).collect();
        assert_eq!(ids, ["FIX.4.2:NewOrderSingle-D:2", "FIX.4.2:NewOrderSingle-D:3"]);
        assert_eq!(asked, ["FIX.4.2:NewOrderSingle-D:1", "FIX.4.2:NewOrderSingle-D:1"]);
    }

    #[test]
    fn test_delete_missing_is_silent() {
        let store = MessageStore::default();
        let id = store.save(ORDER, None, None).unwrap();
        assert!(store.delete("nope").is_none());
        assert!(store.delete(&id).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_missing() {
        let store = MessageStore::default();
        assert_eq!(
            store.get("missing").unwrap_err(),
            StoreError::NotFound {
                id: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_list_filters_on_id_and_raw() {
        let store = MessageStore::default();
        store.save(ORDER, None, None).unwrap();
        store.save("8=FIX.4.2|9=5|35=A|98=0|10=000|", None, None).unwrap();
        assert_eq!(store.list("logon").len(), 1);
        assert_eq!(store.list("55=abc").len(), 1);
        assert_eq!(store.list("").len(), 2);
        assert!(store.list("nothing-here").is_empty());
    }

    #[test]
    fn test_binary_input_is_stored_printable() {
        let store = MessageStore::default();
        let id = store
            .save("8=FIX.4.2\u{1}9=5\u{1}35=0\u{1}10=000\u{1}", None, None)
            .unwrap();
        assert_eq!(store.get(&id).unwrap().raw, "8=FIX.4.2|9=5|35=0|10=000|");
    }

    #[test]
    fn test_empty_message_rejected() {
        let store = MessageStore::default();
        assert!(matches!(
            store.save("", None, None),
            Err(StoreError::InvalidMessage { .. })
        ));
    }
}
