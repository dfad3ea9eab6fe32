/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Application callback interface.
//!
//! This module defines the callbacks a FIX engine invokes around every
//! message, following the QuickFIX pattern with async support, and the
//! [`ProbeApplication`] that records history and applies interception there.
//!
//! Messages cross the hooks as latin-1 strings in either delimiter form.

use async_trait::async_trait;
use fixprobe_core::message::MsgType;
use fixprobe_core::types::{Direction, EntryState, Route, SessionId};
use fixprobe_session::{InFlightSubstitution, InterceptQueue, SequenceTracker, SessionRegistry};
use fixprobe_store::{CodecClassifier, EntryDraft, MessageClassifier};
use fixprobe_tagvalue::{WireCodec, bytes_to_ascii};
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, error, info, warn};

/// Note attached to a substitute's history entry.
pub const SUBSTITUTE_NOTE_PREFIX: &str = "Modified version of";

/// Note attached to operator-edited messages.
pub const EDITED_NOTE: &str = "Edited by operator";

/// Application callback interface for handling FIX messages.
///
/// Implement this trait to receive callbacks for session events
/// and message processing.
#[async_trait]
pub trait Application: Send + Sync {
    /// Called when a session is created.
    ///
    /// # Arguments
    /// * `session_id` - The session identifier
    async fn on_create(&self, session_id: &SessionId);

    /// Called on successful logon.
    ///
    /// # Arguments
    /// * `session_id` - The session identifier
    async fn on_logon(&self, session_id: &SessionId);

    /// Called on logout or failed logon.
    ///
    /// # Arguments
    /// * `session_id` - The session identifier
    async fn on_logout(&self, session_id: &SessionId);

    /// Called before sending an admin message.
    ///
    /// The message may be modified or replaced outright.
    ///
    /// # Arguments
    /// * `message` - The message to be sent (mutable)
    /// * `session_id` - The session identifier
    async fn to_admin(&self, message: &mut String, session_id: &SessionId);

    /// Called when an admin message is received.
    ///
    /// # Arguments
    /// * `message` - The received message
    /// * `session_id` - The session identifier
    #[allow(clippy::wrong_self_convention)]
    async fn from_admin(&self, message: &str, session_id: &SessionId);

    /// Called before sending an application message.
    ///
    /// The message may be modified or replaced outright.
    ///
    /// # Arguments
    /// * `message` - The message to be sent (mutable)
    /// * `session_id` - The session identifier
    async fn to_app(&self, message: &mut String, session_id: &SessionId);

    /// Called when an application message is received.
    ///
    /// # Arguments
    /// * `message` - The received message
    /// * `session_id` - The session identifier
    #[allow(clippy::wrong_self_convention)]
    async fn from_app(&self, message: &str, session_id: &SessionId);
}

/// Default no-op application implementation.
#[derive(Debug, Default)]
pub struct NoOpApplication;

#[async_trait]
impl Application for NoOpApplication {
    async fn on_create(&self, _session_id: &SessionId) {}

    async fn on_logon(&self, _session_id: &SessionId) {}

    async fn on_logout(&self, _session_id: &SessionId) {}

    async fn to_admin(&self, _message: &mut String, _session_id: &SessionId) {}

    async fn from_admin(&self, _message: &str, _session_id: &SessionId) {}

    async fn to_app(&self, _message: &mut String, _session_id: &SessionId) {}

    async fn from_app(&self, _message: &str, _session_id: &SessionId) {}
}

/// Hooks that record every message and apply queued substitutions.
pub struct ProbeApplication {
    registry: Arc<SessionRegistry>,
    intercept: Arc<InterceptQueue>,
    codec: WireCodec,
    classifier: CodecClassifier,
    tracker: OnceLock<Weak<SequenceTracker>>,
}

impl ProbeApplication {
    /// Creates the hooks.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, intercept: Arc<InterceptQueue>) -> Self {
        let codec = *registry.codec();
        Self {
            registry,
            intercept,
            codec,
            classifier: CodecClassifier::new(codec),
            tracker: OnceLock::new(),
        }
    }

    /// Connects the tracker that prepares Logon messages and reads sequence
    /// hints. Only the first call has an effect.
    pub fn attach(&self, tracker: &Arc<SequenceTracker>) {
        if self.tracker.set(Arc::downgrade(tracker)).is_err() {
            debug!("sequence tracker already attached");
        }
    }

    fn tracker(&self) -> Option<Arc<SequenceTracker>> {
        self.tracker.get().and_then(Weak::upgrade)
    }

    fn route_of(msg_type: &MsgType) -> Route {
        if msg_type.is_admin() {
            Route::Admin
        } else {
            Route::App
        }
    }

    fn record_inbound(&self, message: &str, session_id: &SessionId, route: Route) {
        let msg_type = self.classifier.msg_type(message);
        let draft = EntryDraft::new(
            Direction::Received,
            route,
            msg_type,
            self.codec.to_printable(message),
        );
        self.registry.with_session(session_id, |state| {
            state.commit_substitution();
            state.history_mut().append(draft);
        });
    }

    /// Logs an outbound message, swapping in the queued substitute if any.
    ///
    /// A substitute's entries are parked until the transmission is settled.
    fn record_outbound(&self, message: &mut String, session_id: &SessionId, route: Route) {
        let msg_type = self.classifier.msg_type(message);
        let printable = self.codec.to_printable(message);

        let substitute = self.intercept.take_with(|payload| {
            let text = bytes_to_ascii(payload);
            if text.trim().is_empty() {
                Err(())
            } else {
                Ok((text, payload.clone()))
            }
        });

        match substitute {
            Some(Ok((replacement, payload))) => {
                let original = EntryDraft::new(Direction::Sent, route, msg_type, printable)
                    .with_state(EntryState::Intercepted);
                let original_uuid = original.uuid;

                let replacement_type = self.classifier.msg_type(&replacement);
                let sent = EntryDraft::new(
                    Direction::Sent,
                    Self::route_of(&replacement_type),
                    replacement_type,
                    self.codec.to_printable(&replacement),
                )
                .with_notes(format!("{SUBSTITUTE_NOTE_PREFIX} {original_uuid}"));

                self.registry.with_session(session_id, |state| {
                    state.begin_substitution(InFlightSubstitution {
                        payload,
                        entries: vec![original, sent],
                    });
                });
                info!(session = %session_id, intercepted = %original_uuid, "message substituted");
                *message = self.codec.to_binary(&replacement);
            }
            Some(Err(())) => {
                warn!(session = %session_id, "empty substitution left queued");
                self.record_sent(session_id, route, msg_type, printable);
            }
            None => self.record_sent(session_id, route, msg_type, printable),
        }
    }

    fn record_sent(&self, session_id: &SessionId, route: Route, msg_type: MsgType, printable: String) {
        let codec = self.codec;
        self.registry.with_session(session_id, |state| {
            state.commit_substitution();
            let edited = state
                .edited()
                .is_some_and(|edited| codec.to_printable(edited) == printable);
            let mut draft = EntryDraft::new(Direction::Sent, route, msg_type, printable);
            if edited {
                state.take_edited();
                draft = draft.with_notes(EDITED_NOTE);
            }
            state.history_mut().append(draft);
        });
    }
}

#[async_trait]
impl Application for ProbeApplication {
    async fn on_create(&self, session_id: &SessionId) {
        self.registry.get_or_create(session_id);
        info!(session = %session_id, "session created");
    }

    async fn on_logon(&self, session_id: &SessionId) {
        self.registry
            .with_session(session_id, |state| state.on_logged_on());
        info!(session = %session_id, "successful logon");
    }

    async fn on_logout(&self, session_id: &SessionId) {
        self.registry
            .with_session(session_id, |state| state.on_logged_out());
        info!(session = %session_id, "logged out");
    }

    async fn to_admin(&self, message: &mut String, session_id: &SessionId) {
        let msg_type = self.classifier.msg_type(message);
        if msg_type.is_logon() {
            if let Some(tracker) = self.tracker() {
                if let Err(err) = tracker.prepare_outbound_logon(session_id, message).await {
                    error!(session = %session_id, %err, "logon preparation failed");
                }
            }
        }
        self.record_outbound(message, session_id, Route::Admin);
    }

    async fn from_admin(&self, message: &str, session_id: &SessionId) {
        self.record_inbound(message, session_id, Route::Admin);
        if let Some(tracker) = self.tracker() {
            tracker.on_inbound_admin(session_id, message);
        }
    }

    async fn to_app(&self, message: &mut String, session_id: &SessionId) {
        self.record_outbound(message, session_id, Route::App);
    }

    async fn from_app(&self, message: &str, session_id: &SessionId) {
        self.record_inbound(message, session_id, Route::App);
    }
}

impl std::fmt::Debug for ProbeApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeApplication")
            .field("codec", &self.codec)
            .field("attached", &self.tracker().is_some())
            .finish_non_exhaustive()
    }
}
