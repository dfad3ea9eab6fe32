/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session sequence tracker.
//!
//! Drives logon and logout through the engine with bounded polling, prepares
//! outbound Logon messages (credentials, sequence overrides, optional header
//! fields) and turns counterparty sequence complaints into overrides.

use crate::adapter::SessionEngine;
use crate::intercept::InterceptQueue;
use crate::config::{
    Credentials, DEFAULT_LOGON_TIMEOUT, DEFAULT_LOGOUT_TIMEOUT, DEFAULT_RECONNECT_INTERVAL, keys,
    parse_secs,
};
use crate::registry::{SessionRegistry, SharedSessionState};
use crate::sequence::{SequenceHint, parse_sequence_hints};
use crate::state::MAX_LOGON_ATTEMPTS;
use fixprobe_core::error::{FixError, SessionError};
use fixprobe_core::tags;
use fixprobe_core::types::{SeqNum, SessionId};
use fixprobe_tagvalue::{ValidatedMessage, WireCodec, to_wire_bytes, validate};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

/// Interval between status polls during logon and logout.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Reconnect interval used while an explicit logout is in progress.
pub const MANUAL_RECONNECT_INTERVAL: &str = "0";

/// Tracks logon state and sequence repair for every session.
pub struct SequenceTracker {
    registry: Arc<SessionRegistry>,
    engine: Arc<dyn SessionEngine>,
    credentials: Credentials,
    codec: WireCodec,
    poll_interval: Duration,
    intercept: Option<Arc<InterceptQueue>>,
}

impl SequenceTracker {
    /// Creates a tracker.
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        engine: Arc<dyn SessionEngine>,
        credentials: Credentials,
    ) -> Self {
        let codec = *registry.codec();
        Self {
            registry,
            engine,
            credentials,
            codec,
            poll_interval: POLL_INTERVAL,
            intercept: None,
        }
    }

    /// Sets the queue that substitutes are returned to when their
    /// transmission fails.
    #[must_use]
    pub fn with_intercept(mut self, intercept: Arc<InterceptQueue>) -> Self {
        self.intercept = Some(intercept);
        self
    }

    /// Sets the status polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns the session registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Returns the engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn SessionEngine> {
        &self.engine
    }

    /// Returns the logon credentials.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn config_duration(&self, key: &str, session_id: &SessionId, default: Duration) -> Duration {
        parse_secs(self.engine.session_config(key, session_id).as_deref(), default)
    }

    fn restore_config(&self, key: &str, value: Option<String>, session_id: &SessionId) {
        let Some(value) = value else {
            return;
        };
        if let Err(err) = self.engine.set_session_config(key, &value, session_id) {
            warn!(session = %session_id, key, %err, "failed to restore session setting");
        }
    }

    /// Settles the substitute the hooks parked during an engine call.
    ///
    /// Delivered substitutes are recorded in history; failed ones go back to
    /// the head of the interception queue unrecorded.
    fn settle_substitution(&self, session_id: &SessionId, delivered: bool) {
        let Some(state) = self.registry.get(session_id) else {
            return;
        };
        if delivered {
            state.lock().commit_substitution();
            return;
        }
        let Some(in_flight) = state.lock().take_substitution() else {
            return;
        };
        match &self.intercept {
            Some(queue) => {
                warn!(session = %session_id, "transmission failed, substitution requeued");
                queue.restore_front(in_flight.payload);
            }
            None => warn!(session = %session_id, "transmission failed, substitution dropped"),
        }
    }

    /// Logs on and waits until the engine reports success.
    ///
    /// Waits at most `ReconnectInterval + LogonTimeout`. On timeout the engine
    /// is told to log out so that it stops retrying.
    ///
    /// # Errors
    /// Returns `SessionError::LogonTimeout` when the deadline passes,
    /// `SessionError::ConnectivityExhausted` when the logon-attempt ceiling is
    /// hit while waiting, or the engine's own error.
    pub async fn logon(&self, session_id: &SessionId) -> Result<(), SessionError> {
        if self.engine.is_logged_on(session_id) {
            debug!(session = %session_id, "already logged on");
            return Ok(());
        }

        let state = self.registry.get_or_create(session_id);
        state.lock().begin_logon();

        let deadline = self.config_duration(
            keys::RECONNECT_INTERVAL,
            session_id,
            DEFAULT_RECONNECT_INTERVAL,
        ) + self.config_duration(keys::LOGON_TIMEOUT, session_id, DEFAULT_LOGON_TIMEOUT);
        let with_credentials = if self.credentials.is_set() {
            " with credentials"
        } else {
            ""
        };
        info!(session = %session_id, ?deadline, "logging on{with_credentials}");

        let sent = self.engine.logon(session_id).await;
        self.settle_substitution(session_id, sent.is_ok());
        let result = match sent {
            Ok(()) => self.await_logon(session_id, &state, deadline).await,
            Err(err) => Err(err),
        };

        if result.is_err() {
            state.lock().abort_logon();
        }
        result
    }

    async fn await_logon(
        &self,
        session_id: &SessionId,
        state: &SharedSessionState,
        deadline: Duration,
    ) -> Result<(), SessionError> {
        let started = Instant::now();
        loop {
            if self.engine.is_logged_on(session_id) {
                state.lock().on_logged_on();
                info!(session = %session_id, "logged on");
                return Ok(());
            }

            let (exhausted, attempts) = {
                let guard = state.lock();
                (guard.is_exhausted(), guard.logon_attempts())
            };
            if exhausted {
                return Err(SessionError::ConnectivityExhausted { attempts });
            }

            let elapsed = started.elapsed();
            if elapsed > deadline {
                error!(session = %session_id, ?elapsed, "logon failed");
                let forced = self.engine.logout(session_id).await;
                self.settle_substitution(session_id, forced.is_ok());
                if let Err(err) = forced {
                    warn!(session = %session_id, %err, "forced logout failed");
                }
                return Err(SessionError::LogonTimeout { elapsed });
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Logs out and waits until the engine reports it.
    ///
    /// The reconnect interval is zeroed for the duration so the engine does
    /// not log straight back on, and restored afterwards whatever the outcome.
    ///
    /// # Errors
    /// Returns `SessionError::LogoutTimeout` when `LogoutTimeout` passes, or
    /// the engine's own error.
    pub async fn logout(&self, session_id: &SessionId) -> Result<(), SessionError> {
        let state = self.registry.get_or_create(session_id);
        let original_interval = self.engine.session_config(keys::RECONNECT_INTERVAL, session_id);
        self.engine
            .set_session_config(keys::RECONNECT_INTERVAL, MANUAL_RECONNECT_INTERVAL, session_id)?;
        state.lock().begin_logout();
        info!(session = %session_id, "logging out");

        let result = self.drive_logout(session_id).await;
        self.restore_config(keys::RECONNECT_INTERVAL, original_interval, session_id);
        result
    }

    async fn drive_logout(&self, session_id: &SessionId) -> Result<(), SessionError> {
        let sent = self.engine.logout(session_id).await;
        self.settle_substitution(session_id, sent.is_ok());
        sent?;
        let timeout = self.config_duration(keys::LOGOUT_TIMEOUT, session_id, DEFAULT_LOGOUT_TIMEOUT);
        let started = Instant::now();
        while self.engine.is_logged_on(session_id) {
            let elapsed = started.elapsed();
            if elapsed > timeout {
                error!(session = %session_id, ?elapsed, "logout failed");
                return Err(SessionError::LogoutTimeout { elapsed });
            }
            sleep(self.poll_interval).await;
        }
        Ok(())
    }

    /// Queues a sender sequence override for the next Logon.
    pub fn set_next_sender_override(&self, session_id: &SessionId, seq: SeqNum) {
        self.registry
            .with_session(session_id, |state| state.overrides_mut().set_next_sender(seq));
    }

    /// Queues a NextExpectedMsgSeqNum override for the next Logon.
    pub fn set_next_expected_override(&self, session_id: &SessionId, seq: SeqNum) {
        self.registry
            .with_session(session_id, |state| state.overrides_mut().set_next_expected(seq));
    }

    /// Prepares an outbound Logon in place.
    ///
    /// Counts the attempt, injects credentials, applies and clears pending
    /// sequence overrides and copies optional header fields from the session
    /// settings. BodyLength and CheckSum are left for the engine to finalise.
    ///
    /// # Errors
    /// Returns `SessionError::ConnectivityExhausted` once the attempt ceiling
    /// is reached; the engine has then been told to log out.
    pub async fn prepare_outbound_logon(
        &self,
        session_id: &SessionId,
        message: &mut String,
    ) -> Result<(), SessionError> {
        let state = self.registry.get_or_create(session_id);
        let (attempts, next_sender, next_expected) = {
            let mut guard = state.lock();
            let attempts = guard.record_logon_attempt();
            if attempts >= MAX_LOGON_ATTEMPTS {
                guard.mark_exhausted();
                (attempts, None, None)
            } else {
                let overrides = guard.overrides_mut();
                (attempts, overrides.take_next_sender(), overrides.take_next_expected())
            }
        };

        if attempts >= MAX_LOGON_ATTEMPTS {
            error!(session = %session_id, attempts, "connection lost");
            self.engine.logout(session_id).await?;
            return Err(SessionError::ConnectivityExhausted { attempts });
        }
        debug!(session = %session_id, attempts, "preparing logon");

        let codec = self.codec;
        let credentials = [
            (tags::USERNAME, &self.credentials.username),
            (tags::PASSWORD, &self.credentials.password),
            (tags::NEW_PASSWORD, &self.credentials.new_password),
        ];
        for (tag, value) in credentials {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                *message = codec.upsert_field(message, tag, value);
            }
        }

        if let Some(seq) = next_sender {
            self.engine.set_next_sender_seq(session_id, seq)?;
            *message = codec.upsert_field(message, tags::MSG_SEQ_NUM, &seq.to_string());
            info!(session = %session_id, %seq, "applied sender sequence override");
        }
        if let Some(seq) = next_expected {
            *message =
                codec.upsert_field(message, tags::NEXT_EXPECTED_MSG_SEQ_NUM, &seq.to_string());
            info!(session = %session_id, %seq, "applied next expected sequence override");
        }

        let optional = [
            (keys::DEFAULT_APPL_EXT_ID, tags::DEFAULT_APPL_EXT_ID),
            (keys::TARGET_SUB_ID, tags::TARGET_SUB_ID),
            (keys::SENDER_LOCATION_ID, tags::SENDER_LOCATION_ID),
        ];
        for (key, tag) in optional {
            if let Some(value) = self.engine.session_config(key, session_id) {
                *message = codec.upsert_field(message, tag, &value);
            }
        }
        Ok(())
    }

    /// Inspects an inbound admin message for sequence complaints.
    ///
    /// Returns the hints that were recorded as overrides.
    pub fn on_inbound_admin(&self, session_id: &SessionId, raw: &str) -> Vec<SequenceHint> {
        let Ok(text) = self.codec.get_field(raw, tags::TEXT) else {
            return Vec::new();
        };
        warn!(session = %session_id, text = %text, "admin message text");

        let hints = parse_sequence_hints(&text);
        if !hints.is_empty() {
            self.registry.with_session(session_id, |state| {
                for hint in &hints {
                    state.overrides_mut().apply(*hint);
                }
            });
            for hint in &hints {
                info!(session = %session_id, ?hint, "sequence override recorded");
            }
        }
        hints
    }

    /// Sends `raw` without validation.
    ///
    /// With `clean_up`, MsgSeqNum is set to the engine's next sender number
    /// and BodyLength and CheckSum are recomputed first. The session's
    /// edited-message flag is set. Returns the message as sent.
    ///
    /// # Errors
    /// Returns the engine's error.
    pub async fn send_raw(
        &self,
        session_id: &SessionId,
        raw: &str,
        clean_up: bool,
    ) -> Result<String, SessionError> {
        let message = if clean_up {
            let next = self.engine.next_sender_seq(session_id)?;
            self.codec.refresh(raw, next)
        } else {
            raw.to_string()
        };
        let binary = self.codec.to_binary(&message);
        self.registry
            .with_session(session_id, |state| state.mark_edited(message.as_str()));
        debug!(session = %session_id, clean_up, "sending raw message");
        let sent = self.engine.send_raw(session_id, to_wire_bytes(&binary)).await;
        self.settle_substitution(session_id, sent.is_ok());
        sent?;
        Ok(message)
    }

    /// Validates `raw`, repairing BodyLength and CheckSum once each, and
    /// sends it.
    ///
    /// # Errors
    /// Returns `FixError::Decode` for a malformed message or
    /// `FixError::Session` if the engine fails.
    pub async fn send(
        &self,
        session_id: &SessionId,
        raw: &str,
    ) -> Result<ValidatedMessage, FixError> {
        let validated = validate(&self.codec, raw)?;
        if validated.repaired_body_length || validated.repaired_checksum {
            info!(
                session = %session_id,
                body_length = validated.repaired_body_length,
                checksum = validated.repaired_checksum,
                "repaired message before sending"
            );
        }
        let sent = self.engine.send(session_id, validated.clone()).await;
        self.settle_substitution(session_id, sent.is_ok());
        sent?;
        Ok(validated)
    }
}

impl std::fmt::Debug for SequenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceTracker")
            .field("sessions", &self.registry.len())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::registry::RegistryOptions;
    use crate::state::{InFlightSubstitution, SessionStatus};
    use fixprobe_core::message::MsgType;
    use fixprobe_core::types::{Direction, Route};
    use fixprobe_store::EntryDraft;
    use async_trait::async_trait;
    use bytes::Bytes;
    use fixprobe_tagvalue::bytes_to_ascii;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockEngine {
        accept_logon: bool,
        complete_logout: bool,
        logged_on: AtomicBool,
        fail_sends: AtomicBool,
        config_writes: AtomicUsize,
        config: Mutex<SessionConfig>,
        next_seq: Mutex<SeqNum>,
        calls: Mutex<Vec<String>>,
        sent: Mutex<Vec<Bytes>>,
    }

    impl MockEngine {
        fn new(accept_logon: bool, complete_logout: bool) -> Self {
            Self {
                accept_logon,
                complete_logout,
                logged_on: AtomicBool::new(false),
                fail_sends: AtomicBool::new(false),
                config_writes: AtomicUsize::new(0),
                config: Mutex::new(SessionConfig::new("FIX.4.4", "ME", "THEM")),
                next_seq: Mutex::new(SeqNum::new(1)),
                calls: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl SessionEngine for MockEngine {
        async fn logon(&self, _session_id: &SessionId) -> Result<(), SessionError> {
            self.calls.lock().push("logon".to_string());
            if self.accept_logon {
                self.logged_on.store(true, Ordering::SeqCst);
            }
            Ok(())
        }

        async fn logout(&self, _session_id: &SessionId) -> Result<(), SessionError> {
            let interval = self.config.lock().reconnect_interval.as_secs();
            self.calls.lock().push(format!("logout ri={interval}"));
            if self.complete_logout {
                self.logged_on.store(false, Ordering::SeqCst);
            }
            Ok(())
        }

        fn is_logged_on(&self, _session_id: &SessionId) -> bool {
            self.logged_on.load(Ordering::SeqCst)
        }

        async fn send_raw(&self, _session_id: &SessionId, payload: Bytes) -> Result<(), SessionError> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(SessionError::Engine("link down".to_string()));
            }
            self.sent.lock().push(payload);
            Ok(())
        }

        async fn send(
            &self,
            _session_id: &SessionId,
            message: ValidatedMessage,
        ) -> Result<(), SessionError> {
            self.sent.lock().push(to_wire_bytes(&message.raw));
            Ok(())
        }

        fn next_sender_seq(&self, _session_id: &SessionId) -> Result<SeqNum, SessionError> {
            Ok(*self.next_seq.lock())
        }

        fn set_next_sender_seq(&self, _session_id: &SessionId, seq: SeqNum) -> Result<(), SessionError> {
            *self.next_seq.lock() = seq;
            Ok(())
        }

        fn session_config(&self, key: &str, _session_id: &SessionId) -> Option<String> {
            self.config.lock().get(key)
        }

        fn set_session_config(
            &self,
            key: &str,
            value: &str,
            _session_id: &SessionId,
        ) -> Result<(), SessionError> {
            self.config_writes.fetch_add(1, Ordering::SeqCst);
            self.config.lock().set(key, value)
        }

        fn sessions(&self) -> Vec<SessionId> {
            vec![self.config.lock().session_id()]
        }
    }

    fn session() -> SessionId {
        SessionId::new("FIX.4.4", "ME", "THEM")
    }

    fn tracker(engine: Arc<MockEngine>, credentials: Credentials) -> SequenceTracker {
        let registry = Arc::new(SessionRegistry::new(RegistryOptions::default()));
        SequenceTracker::new(registry, engine, credentials)
    }

    #[tokio::test]
    async fn test_logon_succeeds() {
        let engine = Arc::new(MockEngine::new(true, true));
        let tracker = tracker(engine.clone(), Credentials::default());
        tracker.logon(&session()).await.unwrap();
        assert_eq!(engine.calls(), ["logon"]);
        assert_eq!(engine.config_writes.load(Ordering::SeqCst), 0);
        let status = tracker.registry().with_session(&session(), |s| s.status());
        assert_eq!(status, SessionStatus::LoggedOn);

        tracker.logon(&session()).await.unwrap();
        assert_eq!(engine.calls(), ["logon"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logon_deadline_is_reconnect_plus_timeout() {
        let engine = Arc::new(MockEngine::new(false, true));
        let tracker = tracker(engine.clone(), Credentials::default());

        let started = Instant::now();
        let err = tracker.logon(&session()).await.unwrap_err();
        let waited = started.elapsed();

        let SessionError::LogonTimeout { elapsed } = err else {
            panic!("expected logon timeout, got {err:?}");
        };
        assert!(elapsed > Duration::from_secs(40));
        assert!(waited >= Duration::from_secs(40) && waited < Duration::from_secs(41));
        assert_eq!(engine.calls(), ["logon", "logout ri=30"]);
        let status = tracker.registry().with_session(&session(), |s| s.status());
        assert_eq!(status, SessionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logon_deadline_follows_session_config() {
        let engine = Arc::new(MockEngine::new(false, true));
        engine.config.lock().reconnect_interval = Duration::from_secs(1);
        engine.config.lock().logon_timeout = Duration::from_secs(2);
        let tracker = tracker(engine.clone(), Credentials::default());

        let started = Instant::now();
        assert!(tracker.logon(&session()).await.is_err());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logon_stops_when_attempts_exhausted() {
        let engine = Arc::new(MockEngine::new(false, true));
        let tracker = Arc::new(tracker(engine.clone(), Credentials::default()));

        let background = tracker.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            background
                .registry()
                .with_session(&session(), |state| state.mark_exhausted());
        });

        let started = Instant::now();
        let err = tracker.logon(&session()).await.unwrap_err();
        assert!(matches!(err, SessionError::ConnectivityExhausted { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_logout_zeroes_and_restores_reconnect_interval() {
        let engine = Arc::new(MockEngine::new(true, true));
        let tracker = tracker(engine.clone(), Credentials::default());
        tracker.logon(&session()).await.unwrap();

        tracker.logout(&session()).await.unwrap();
        assert_eq!(engine.calls(), ["logon", "logout ri=0"]);
        assert_eq!(engine.config.lock().reconnect_interval, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_timeout_still_restores() {
        let engine = Arc::new(MockEngine::new(true, false));
        let tracker = tracker(engine.clone(), Credentials::default());
        tracker.logon(&session()).await.unwrap();

        let err = tracker.logout(&session()).await.unwrap_err();
        assert!(matches!(err, SessionError::LogoutTimeout { .. }));
        assert_eq!(engine.config.lock().reconnect_interval, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_prepare_logon_injects_fields_and_consumes_overrides() {
        let engine = Arc::new(MockEngine::new(true, true));
        {
            let mut config = engine.config.lock();
            config.target_sub_id = Some("DESK".to_string());
            config.default_appl_ext_id = Some("3".to_string());
        }
        let credentials = Credentials::default()
            .with_username("user")
            .with_password("secret");
        let tracker = tracker(engine.clone(), credentials);
        tracker.set_next_sender_override(&session(), SeqNum::new(77));
        tracker.set_next_expected_override(&session(), SeqNum::new(12));

        let mut logon = "8=FIX.4.4|9=40|35=A|34=1|49=ME|56=THEM|98=0|108=30|10=000|".to_string();
        tracker
            .prepare_outbound_logon(&session(), &mut logon)
            .await
            .unwrap();

        let codec = WireCodec::default();
        assert_eq!(codec.get_field(&logon, tags::MSG_SEQ_NUM).unwrap(), "77");
        assert_eq!(codec.get_field(&logon, tags::USERNAME).unwrap(), "user");
        assert_eq!(codec.get_field(&logon, tags::PASSWORD).unwrap(), "secret");
        assert!(codec.get_field(&logon, tags::NEW_PASSWORD).is_err());
        assert_eq!(codec.get_field(&logon, tags::NEXT_EXPECTED_MSG_SEQ_NUM).unwrap(), "12");
        assert_eq!(codec.get_field(&logon, tags::TARGET_SUB_ID).unwrap(), "DESK");
        assert_eq!(codec.get_field(&logon, tags::DEFAULT_APPL_EXT_ID).unwrap(), "3");
        assert!(codec.get_field(&logon, tags::SENDER_LOCATION_ID).is_err());
        assert!(logon.ends_with("|10=000|"));
        assert_eq!(*engine.next_seq.lock(), SeqNum::new(77));

        let mut second = "8=FIX.4.4|9=40|35=A|34=78|10=000|".to_string();
        tracker
            .prepare_outbound_logon(&session(), &mut second)
            .await
            .unwrap();
        assert_eq!(codec.get_field(&second, tags::MSG_SEQ_NUM).unwrap(), "78");
        assert!(codec.get_field(&second, tags::NEXT_EXPECTED_MSG_SEQ_NUM).is_err());
    }

    #[tokio::test]
    async fn test_fifth_logon_attempt_exhausts_connectivity() {
        let engine = Arc::new(MockEngine::new(false, true));
        let tracker = tracker(engine.clone(), Credentials::default());
        for _ in 1..MAX_LOGON_ATTEMPTS {
            let mut logon = "8=FIX.4.4|35=A|10=000|".to_string();
            tracker
                .prepare_outbound_logon(&session(), &mut logon)
                .await
                .unwrap();
        }
        let mut logon = "8=FIX.4.4|35=A|10=000|".to_string();
        let err = tracker
            .prepare_outbound_logon(&session(), &mut logon)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ConnectivityExhausted { attempts: 5 }));
        assert_eq!(engine.calls(), ["logout ri=30"]);
        assert!(tracker.registry().with_session(&session(), |s| s.is_exhausted()));
    }

    #[test]
    fn test_inbound_admin_text_records_override() {
        let engine = Arc::new(MockEngine::new(true, true));
        let tracker = tracker(engine, Credentials::default());
        let hints = tracker.on_inbound_admin(
            &session(),
            "8=FIX.4.4|9=50|35=5|58=MsgSeqNum too low, expecting 20 but received 3|10=000|",
        );
        assert_eq!(hints, [SequenceHint::NextSender(SeqNum::new(22))]);
        let overrides = tracker.registry().with_session(&session(), |s| *s.overrides());
        assert_eq!(overrides.next_sender(), Some(SeqNum::new(22)));

        assert!(tracker.on_inbound_admin(&session(), "8=FIX.4.4|35=0|10=000|").is_empty());
    }

    #[tokio::test]
    async fn test_send_raw_clean_up_refreshes_and_flags_edit() {
        let engine = Arc::new(MockEngine::new(true, true));
        *engine.next_seq.lock() = SeqNum::new(9);
        let tracker = tracker(engine.clone(), Credentials::default());

        let sent = tracker
            .send_raw(&session(), "8=FIX.4.4|9=0|35=1|112=ping|10=000|", true)
            .await
            .unwrap();
        let codec = WireCodec::default();
        assert_eq!(codec.get_field(&sent, tags::MSG_SEQ_NUM).unwrap(), "9");
        assert_eq!(
            codec.get_field(&sent, tags::BODY_LENGTH).unwrap(),
            codec.body_length(&sent).to_string()
        );

        let wire = bytes_to_ascii(&engine.sent.lock()[0]);
        assert_eq!(wire, codec.to_binary(&sent));
        let edited = tracker
            .registry()
            .with_session(&session(), |s| s.edited().map(str::to_string));
        assert_eq!(edited, Some(sent));
    }

    #[tokio::test]
    async fn test_send_raw_without_clean_up_is_verbatim() {
        let engine = Arc::new(MockEngine::new(true, true));
        let tracker = tracker(engine.clone(), Credentials::default());
        let raw = "8=FIX.4.4|9=999|35=1|10=abc|";
        assert_eq!(tracker.send_raw(&session(), raw, false).await.unwrap(), raw);
        assert_eq!(
            bytes_to_ascii(&engine.sent.lock()[0]),
            "8=FIX.4.4\u{1}9=999\u{1}35=1\u{1}10=abc\u{1}"
        );
    }

    #[tokio::test]
    async fn test_send_validates_and_repairs() {
        let engine = Arc::new(MockEngine::new(true, true));
        let tracker = tracker(engine.clone(), Credentials::default());

        let err = tracker.send(&session(), "35=D|55=X|").await.unwrap_err();
        assert!(matches!(err, FixError::Decode(_)));
        assert!(engine.sent.lock().is_empty());

        let validated = tracker
            .send(&session(), "8=FIX.4.4|9=1|35=0|10=000|")
            .await
            .unwrap();
        assert!(validated.repaired_body_length);
        assert_eq!(engine.sent.lock().len(), 1);
    }

    fn park_substitution(tracker: &SequenceTracker, payload: &'static [u8]) {
        let entry = EntryDraft::new(Direction::Sent, Route::App, MsgType::new("0"), "35=0|112=SUB|");
        tracker.registry().with_session(&session(), |state| {
            state.begin_substitution(InFlightSubstitution {
                payload: Bytes::from_static(payload),
                entries: vec![entry],
            });
        });
    }

    #[tokio::test]
    async fn test_failed_send_requeues_substitution_unrecorded() {
        let engine = Arc::new(MockEngine::new(true, true));
        engine.fail_sends.store(true, Ordering::SeqCst);
        let intercept = Arc::new(InterceptQueue::new());
        intercept.enqueue(Bytes::from_static(b"later"));
        let tracker = tracker(engine.clone(), Credentials::default()).with_intercept(intercept.clone());

        park_substitution(&tracker, b"8=FIX.4.4|35=0|112=SUB|10=000|");
        let err = tracker
            .send_raw(&session(), "8=FIX.4.4|35=D|10=000|", false)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Engine(_)));

        assert_eq!(intercept.len(), 2);
        assert_eq!(
            intercept.peek(),
            Some(Bytes::from_static(b"8=FIX.4.4|35=0|112=SUB|10=000|"))
        );
        let (parked, recorded) = tracker
            .registry()
            .with_session(&session(), |s| (s.has_substitution_in_flight(), s.history().len()));
        assert!(!parked);
        assert_eq!(recorded, 0);
    }

    #[tokio::test]
    async fn test_delivered_substitution_is_recorded() {
        let engine = Arc::new(MockEngine::new(true, true));
        let intercept = Arc::new(InterceptQueue::new());
        let tracker = tracker(engine.clone(), Credentials::default()).with_intercept(intercept.clone());

        park_substitution(&tracker, b"8=FIX.4.4|35=0|112=SUB|10=000|");
        tracker
            .send_raw(&session(), "8=FIX.4.4|35=D|10=000|", false)
            .await
            .unwrap();

        assert!(intercept.is_empty());
        let recorded = tracker.registry().with_session(&session(), |s| s.history().len());
        assert_eq!(recorded, 1);
    }
}

