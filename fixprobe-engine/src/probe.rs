/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Operator facade.
//!
//! [`Probe`] ties the message store, session registry, sequence tracker,
//! interception queue and fuzz engine together behind the operations a
//! command layer needs. Wherever a message is expected, a store id may be
//! given instead of raw text.

use crate::application::ProbeApplication;
use crate::builder::ProbeConfig;
use crate::fuzz::{FuzzEngine, FuzzReport};
use crate::templates::{Template, TemplateFactory};
use fixprobe_core::error::{FixError, FuzzError, SessionError, StoreError};
use fixprobe_core::types::{SeqNum, SessionId};
use fixprobe_session::{
    InterceptQueue, InterceptStatus, RegistryOptions, SequenceTracker, SessionConfig,
    SessionEngine, SessionRegistry, keys,
};
use fixprobe_store::{
    ExportFormat, ImportOptions, LogEntry, MessageStore, OverwritePrompt, OverwriteResponse,
    StoredMessage,
};
use fixprobe_tagvalue::{ValidatedMessage, WireCodec, apply_edits, to_wire_bytes};
use std::path::Path;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info};

/// The operator-facing surface of the toolkit.
pub struct Probe {
    config: ProbeConfig,
    codec: WireCodec,
    registry: Arc<SessionRegistry>,
    intercept: Arc<InterceptQueue>,
    store: MessageStore,
    tracker: Arc<SequenceTracker>,
    fuzz: FuzzEngine,
    templates: TemplateFactory,
    application: Arc<ProbeApplication>,
}

impl Probe {
    /// Creates a probe; `connect` receives the hooks and returns the engine.
    pub(crate) fn new(
        config: ProbeConfig,
        connect: impl FnOnce(Arc<ProbeApplication>) -> Arc<dyn SessionEngine>,
    ) -> Self {
        let codec = WireCodec::new(config.printable_delimiter);
        let mut options = RegistryOptions::default()
            .with_codec(codec)
            .with_log_heartbeat(config.log_heartbeat)
            .with_seeds(config.sender_seed, config.expected_seed);
        if let Some(dir) = &config.log_dir {
            options = options.with_log_dir(dir.clone());
        }

        let registry = Arc::new(SessionRegistry::new(options));
        let intercept = Arc::new(InterceptQueue::new());
        let application = Arc::new(ProbeApplication::new(registry.clone(), intercept.clone()));
        let engine = connect(application.clone());
        let tracker = Arc::new(
            SequenceTracker::new(registry.clone(), engine, config.credentials.clone())
                .with_intercept(intercept.clone()),
        );
        application.attach(&tracker);

        Self {
            store: MessageStore::new(codec),
            fuzz: FuzzEngine::new(tracker.clone(), config.fuzz.clone()),
            templates: TemplateFactory::new(codec),
            config,
            codec,
            registry,
            intercept,
            tracker,
            application,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Returns the codec.
    #[must_use]
    pub const fn codec(&self) -> &WireCodec {
        &self.codec
    }

    /// Returns the message store.
    #[must_use]
    pub const fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Returns the session registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Returns the sequence tracker.
    #[must_use]
    pub fn tracker(&self) -> &Arc<SequenceTracker> {
        &self.tracker
    }

    /// Returns the hooks handed to the engine.
    #[must_use]
    pub fn application(&self) -> &Arc<ProbeApplication> {
        &self.application
    }

    /// Returns the stored message for `target` if it names one, otherwise
    /// `target` itself.
    #[must_use]
    pub fn resolve(&self, target: &str) -> String {
        match self.store.get(target) {
            Ok(stored) => stored.raw,
            Err(_) => target.to_string(),
        }
    }

    // Message store

    /// Saves a message; see [`MessageStore::save`].
    ///
    /// # Errors
    /// Returns `StoreError::InvalidMessage` for an empty message.
    pub fn save(
        &self,
        raw: &str,
        id: Option<&str>,
        prompt: Option<&mut dyn OverwritePrompt>,
    ) -> Result<String, StoreError> {
        let id = self.store.save(raw, id, prompt);
        self.store.end_batch();
        id
    }

    /// Deletes a stored message. Unknown ids are ignored.
    pub fn delete(&self, id: &str) -> Option<StoredMessage> {
        self.store.delete(id)
    }

    /// Returns a stored message.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` for an unknown id.
    pub fn view(&self, id: &str) -> Result<StoredMessage, StoreError> {
        self.store.get(id)
    }

    /// Lists stored messages matching `filter`.
    #[must_use]
    pub fn list(&self, filter: &str) -> Vec<StoredMessage> {
        self.store.list(filter)
    }

    /// Imports messages from `path`, rewriting their CompIDs to match
    /// `session_id`. Returns the ids saved.
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the file cannot be read.
    pub fn import(
        &self,
        session_id: &SessionId,
        path: &Path,
        prompt: Option<&mut dyn OverwritePrompt>,
    ) -> Result<Vec<String>, StoreError> {
        let options = ImportOptions {
            sender_comp_id: Some(session_id.sender_comp_id.clone()),
            target_comp_id: Some(session_id.target_comp_id.clone()),
        };
        self.store.import_file(path, &options, prompt)
    }

    /// Appends a stored message to `path`. Without `format` it is taken
    /// from the file extension.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` or `StoreError::Io`.
    pub fn export(
        &self,
        id: &str,
        path: &Path,
        format: Option<ExportFormat>,
    ) -> Result<(), StoreError> {
        let format = format.unwrap_or_else(|| ExportFormat::from_path(path));
        self.store.export(id, path, format)?;
        info!(id, path = %path.display(), ?format, "message exported");
        Ok(())
    }

    /// Applies edit expressions to `target`.
    ///
    /// When `target` is a store id the stored message is replaced in place.
    ///
    /// # Errors
    /// Returns `FixError::Decode` for an unparsable expression.
    pub fn edit<'e>(
        &self,
        target: &str,
        exprs: impl IntoIterator<Item = &'e str>,
    ) -> Result<String, FixError> {
        let stored = self.store.contains(target);
        let edited = apply_edits(&self.codec, &self.resolve(target), exprs)?;
        let edited = self.codec.to_printable(&edited);
        if stored {
            let mut overwrite = OverwriteResponse::Yes;
            self.store.save(&edited, Some(target), Some(&mut overwrite))?;
        }
        Ok(edited)
    }

    /// Builds `template` for `session_id` using its session settings.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if a stored setting is invalid.
    pub fn new_message(
        &self,
        session_id: &SessionId,
        template: Template,
    ) -> Result<String, SessionError> {
        let config = self.session_settings(session_id)?;
        Ok(self
            .templates
            .build(template, &config, self.tracker.credentials()))
    }

    fn session_settings(&self, session_id: &SessionId) -> Result<SessionConfig, SessionError> {
        let mut config = SessionConfig::new(
            session_id.begin_string.clone(),
            session_id.sender_comp_id.clone(),
            session_id.target_comp_id.clone(),
        );
        for key in [
            keys::DEFAULT_APPL_EXT_ID,
            keys::TARGET_SUB_ID,
            keys::SENDER_LOCATION_ID,
        ] {
            if let Some(value) = self.session_config(key, session_id) {
                config.set(key, &value)?;
            }
        }
        Ok(config)
    }

    // History

    /// Returns the last `depth` history entries matching `filter`; 0 means all.
    #[must_use]
    pub fn history(&self, session_id: &SessionId, filter: &str, depth: usize) -> Vec<LogEntry> {
        self.registry
            .with_session(session_id, |state| state.history().query(filter, depth))
    }

    /// Appends history entry `sequence_id` to `path`.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` or `StoreError::Io`.
    pub fn export_history(
        &self,
        session_id: &SessionId,
        sequence_id: u64,
        path: &Path,
        format: Option<ExportFormat>,
    ) -> Result<(), StoreError> {
        let format = format.unwrap_or_else(|| ExportFormat::from_path(path));
        self.registry.with_session(session_id, |state| {
            state.history().export(sequence_id, path, format)
        })
    }

    /// Keeps or suppresses plain heartbeats in every session's history.
    pub fn set_log_heartbeat(&self, enabled: bool) {
        self.registry.set_log_heartbeat(enabled);
        info!(enabled, "heartbeat logging changed");
    }

    // Sessions

    /// Logs on and waits for the outcome.
    ///
    /// # Errors
    /// See [`SequenceTracker::logon`].
    pub async fn logon(&self, session_id: &SessionId) -> Result<(), SessionError> {
        self.tracker.logon(session_id).await
    }

    /// Logs out and waits for the outcome.
    ///
    /// # Errors
    /// See [`SequenceTracker::logout`].
    pub async fn logout(&self, session_id: &SessionId) -> Result<(), SessionError> {
        self.tracker.logout(session_id).await
    }

    /// Uses `seq` as MsgSeqNum of the next Logon.
    pub fn set_next_sender_seq(&self, session_id: &SessionId, seq: SeqNum) {
        self.tracker.set_next_sender_override(session_id, seq);
    }

    /// Uses `seq` as NextExpectedMsgSeqNum of the next Logon.
    pub fn set_next_expected_seq(&self, session_id: &SessionId, seq: SeqNum) {
        self.tracker.set_next_expected_override(session_id, seq);
    }

    /// Returns the sessions known to the engine.
    #[must_use]
    pub fn sessions(&self) -> Vec<SessionId> {
        self.tracker.engine().sessions()
    }

    /// Reads a session setting from the engine.
    #[must_use]
    pub fn session_config(&self, key: &str, session_id: &SessionId) -> Option<String> {
        self.tracker.engine().session_config(key, session_id)
    }

    /// Writes a session setting to the engine.
    ///
    /// # Errors
    /// Returns the engine's error.
    pub fn set_session_config(
        &self,
        key: &str,
        value: &str,
        session_id: &SessionId,
    ) -> Result<(), SessionError> {
        self.tracker
            .engine()
            .set_session_config(key, value, session_id)
    }

    /// Validates and sends `target`, then waits for replies to arrive.
    ///
    /// # Errors
    /// Returns `FixError::Decode` for a malformed message or
    /// `FixError::Session` if the engine fails.
    pub async fn send(
        &self,
        session_id: &SessionId,
        target: &str,
    ) -> Result<ValidatedMessage, FixError> {
        let validated = self.tracker.send(session_id, &self.resolve(target)).await?;
        sleep(self.config.response_delay).await;
        Ok(validated)
    }

    /// Sends `target` unvalidated, then waits for replies to arrive.
    ///
    /// # Errors
    /// Returns the engine's error.
    pub async fn send_raw(
        &self,
        session_id: &SessionId,
        target: &str,
        clean_up: bool,
    ) -> Result<String, SessionError> {
        let sent = self
            .tracker
            .send_raw(session_id, &self.resolve(target), clean_up)
            .await?;
        sleep(self.config.response_delay).await;
        Ok(sent)
    }

    // Interception

    /// Queues `target` to replace the next outbound message.
    pub fn intercept(&self, target: &str) {
        let payload = self.resolve(target);
        debug!(payload = %payload, "queueing substitution");
        self.intercept.enqueue(to_wire_bytes(&payload));
    }

    /// Returns the queue state.
    #[must_use]
    pub fn intercept_status(&self) -> InterceptStatus {
        self.intercept.status()
    }

    /// Drops every queued substitution, returning how many there were.
    pub fn intercept_clear(&self) -> usize {
        self.intercept.clear()
    }

    // Fuzzing

    /// Fuzzes `fields` of `target` on `session_id`.
    ///
    /// # Errors
    /// See [`FuzzEngine::run`].
    pub async fn fuzz(
        &self,
        session_id: &SessionId,
        target: &str,
        fields: &[String],
        dictionary: Option<&Path>,
    ) -> Result<FuzzReport, FuzzError> {
        self.fuzz
            .run(session_id, &self.resolve(target), fields, dictionary)
            .await
    }
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe")
            .field("codec", &self.codec)
            .field("sessions", &self.registry.len())
            .field("stored", &self.store.len())
            .field("pending_substitutions", &self.intercept.len())
            .finish_non_exhaustive()
    }
}
