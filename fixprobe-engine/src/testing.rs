/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! In-process session engine for tests.
//!
//! [`LoopbackEngine`] drives the application hooks the way a real engine
//! does and plays the counterparty: Logon is acknowledged and every other
//! message is answered with a session-level Reject.

use crate::application::Application;
use async_trait::async_trait;
use bytes::Bytes;
use fixprobe_core::error::SessionError;
use fixprobe_core::message::MsgType;
use fixprobe_core::tags;
use fixprobe_core::types::{SeqNum, SessionId};
use fixprobe_session::{SessionConfig, SessionEngine};
use fixprobe_tagvalue::{Encoder, SOH_CHAR, ValidatedMessage, WireCodec, bytes_to_ascii};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Text of the Reject the counterparty answers with.
pub(crate) const REJECT_TEXT: &str = "Value is incorrect (out of range) for this tag";

struct Loopback {
    config: SessionConfig,
    logged_on: bool,
    accept_logon: bool,
    refused: Option<String>,
    next_sender: SeqNum,
    next_target: SeqNum,
    sent: Vec<String>,
}

pub(crate) struct LoopbackEngine {
    application: Arc<dyn Application>,
    codec: WireCodec,
    sessions: Mutex<HashMap<SessionId, Loopback>>,
}

impl LoopbackEngine {
    pub(crate) fn new(
        application: Arc<dyn Application>,
        configs: impl IntoIterator<Item = SessionConfig>,
    ) -> Self {
        let sessions = configs
            .into_iter()
            .map(|config| {
                let session = Loopback {
                    config: config.clone(),
                    logged_on: false,
                    accept_logon: true,
                    refused: None,
                    next_sender: SeqNum::default(),
                    next_target: SeqNum::default(),
                    sent: Vec::new(),
                };
                (config.session_id(), session)
            })
            .collect();
        Self {
            application,
            codec: WireCodec::default(),
            sessions: Mutex::new(sessions),
        }
    }

    /// Makes the counterparty ignore Logon.
    pub(crate) fn refuse_logon(&self, session_id: &SessionId) {
        if let Some(session) = self.sessions.lock().get_mut(session_id) {
            session.accept_logon = false;
        }
    }

    /// Makes transmission fail for messages containing `pattern`.
    pub(crate) fn refuse_transmit(&self, session_id: &SessionId, pattern: &str) {
        if let Some(session) = self.sessions.lock().get_mut(session_id) {
            session.refused = Some(pattern.to_string());
        }
    }

    /// Returns what was transmitted, SOH-delimited.
    pub(crate) fn sent(&self, session_id: &SessionId) -> Vec<String> {
        self.sessions
            .lock()
            .get(session_id)
            .map(|session| session.sent.clone())
            .unwrap_or_default()
    }

    fn with_session<R>(
        &self,
        session_id: &SessionId,
        f: impl FnOnce(&mut Loopback) -> R,
    ) -> Result<R, SessionError> {
        self.sessions
            .lock()
            .get_mut(session_id)
            .map(f)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))
    }

    fn outbound(&self, session_id: &SessionId, msg_type: &str) -> Result<String, SessionError> {
        self.with_session(session_id, |session| {
            let mut encoder = Encoder::new(session.config.begin_string.as_str());
            encoder
                .put_str(tags::MSG_TYPE, msg_type)
                .put_uint(tags::MSG_SEQ_NUM, session.next_sender.value())
                .put_str(tags::SENDER_COMP_ID, &session.config.sender_comp_id)
                .put_str(tags::TARGET_COMP_ID, &session.config.target_comp_id);
            if msg_type == MsgType::LOGON {
                encoder
                    .put_uint(tags::ENCRYPT_METHOD, 0)
                    .put_uint(tags::HEART_BT_INT, 30);
            }
            encoder.finish_with(SOH_CHAR)
        })
    }

    fn inbound(&self, session_id: &SessionId, msg_type: &str, text: Option<&str>) -> Result<String, SessionError> {
        self.with_session(session_id, |session| {
            let mut encoder = Encoder::new(session.config.begin_string.as_str());
            encoder
                .put_str(tags::MSG_TYPE, msg_type)
                .put_uint(tags::MSG_SEQ_NUM, session.next_target.value())
                .put_str(tags::SENDER_COMP_ID, &session.config.target_comp_id)
                .put_str(tags::TARGET_COMP_ID, &session.config.sender_comp_id);
            if let Some(text) = text {
                encoder.put_str(tags::TEXT, text);
            }
            session.next_target = session.next_target.next();
            encoder.finish_with(SOH_CHAR)
        })
    }

    fn transmit(&self, session_id: &SessionId, message: String) -> Result<(), SessionError> {
        self.with_session(session_id, |session| {
            if session
                .refused
                .as_deref()
                .is_some_and(|pattern| message.contains(pattern))
            {
                return Err(SessionError::Engine("transmission refused".to_string()));
            }
            session.next_sender = session.next_sender.next();
            session.sent.push(message);
            Ok(())
        })?
    }

    /// Runs the outbound hooks for `message`, transmits it and answers with
    /// a Reject.
    async fn deliver(&self, session_id: &SessionId, mut message: String) -> Result<(), SessionError> {
        let msg_type = self
            .codec
            .get_field(&message, tags::MSG_TYPE)
            .map(MsgType::new)
            .unwrap_or_else(|_| MsgType::new(""));
        if msg_type.is_admin() {
            self.application.to_admin(&mut message, session_id).await;
        } else {
            self.application.to_app(&mut message, session_id).await;
        }
        self.transmit(session_id, message)?;

        let reject = self.inbound(session_id, "3", Some(REJECT_TEXT))?;
        self.application.from_admin(&reject, session_id).await;
        Ok(())
    }
}

#[async_trait]
impl SessionEngine for LoopbackEngine {
    async fn logon(&self, session_id: &SessionId) -> Result<(), SessionError> {
        let mut message = self.outbound(session_id, MsgType::LOGON)?;
        self.application.to_admin(&mut message, session_id).await;
        self.transmit(session_id, message)?;

        if self.with_session(session_id, |session| session.accept_logon)? {
            let ack = self.inbound(session_id, MsgType::LOGON, None)?;
            self.application.from_admin(&ack, session_id).await;
            self.with_session(session_id, |session| session.logged_on = true)?;
            self.application.on_logon(session_id).await;
        }
        Ok(())
    }

    async fn logout(&self, session_id: &SessionId) -> Result<(), SessionError> {
        let mut message = self.outbound(session_id, MsgType::LOGOUT)?;
        self.application.to_admin(&mut message, session_id).await;
        self.transmit(session_id, message)?;
        self.with_session(session_id, |session| session.logged_on = false)?;
        self.application.on_logout(session_id).await;
        Ok(())
    }

    fn is_logged_on(&self, session_id: &SessionId) -> bool {
        self.with_session(session_id, |session| session.logged_on)
            .unwrap_or(false)
    }

    async fn send_raw(&self, session_id: &SessionId, payload: Bytes) -> Result<(), SessionError> {
        self.deliver(session_id, bytes_to_ascii(&payload)).await
    }

    async fn send(
        &self,
        session_id: &SessionId,
        message: ValidatedMessage,
    ) -> Result<(), SessionError> {
        self.deliver(session_id, message.raw).await
    }

    fn next_sender_seq(&self, session_id: &SessionId) -> Result<SeqNum, SessionError> {
        self.with_session(session_id, |session| session.next_sender)
    }

    fn set_next_sender_seq(&self, session_id: &SessionId, seq: SeqNum) -> Result<(), SessionError> {
        self.with_session(session_id, |session| session.next_sender = seq)
    }

    fn session_config(&self, key: &str, session_id: &SessionId) -> Option<String> {
        self.with_session(session_id, |session| session.config.get(key))
            .ok()
            .flatten()
    }

    fn set_session_config(
        &self,
        key: &str,
        value: &str,
        session_id: &SessionId,
    ) -> Result<(), SessionError> {
        self.with_session(session_id, |session| session.config.set(key, value))?
    }

    fn sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}
