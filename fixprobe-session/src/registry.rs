/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Registry of session state.

use crate::sequence::SequenceOverrides;
use crate::state::SessionState;
use fixprobe_core::types::{SeqNum, SessionId};
use fixprobe_store::HistoryLog;
use fixprobe_tagvalue::WireCodec;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Shared handle to one session's state.
pub type SharedSessionState = Arc<Mutex<SessionState>>;

/// Settings applied to every session the registry creates.
#[derive(Debug, Clone, Default)]
pub struct RegistryOptions {
    /// Directory for per-session CSV history logs; `None` keeps history in
    /// memory only.
    pub log_dir: Option<PathBuf>,
    /// Keep plain heartbeats in the queryable history.
    pub log_heartbeat: bool,
    /// Codec used for history inspection.
    pub codec: WireCodec,
    /// Initial sender sequence override.
    pub sender_seed: Option<SeqNum>,
    /// Initial next-expected sequence override.
    pub expected_seed: Option<SeqNum>,
}

impl RegistryOptions {
    /// Sets the history log directory.
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Sets heartbeat logging.
    #[must_use]
    pub const fn with_log_heartbeat(mut self, enabled: bool) -> Self {
        self.log_heartbeat = enabled;
        self
    }

    /// Sets the codec.
    #[must_use]
    pub const fn with_codec(mut self, codec: WireCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the sequence seeds.
    #[must_use]
    pub const fn with_seeds(mut self, sender: Option<SeqNum>, expected: Option<SeqNum>) -> Self {
        self.sender_seed = sender;
        self.expected_seed = expected;
        self
    }
}

/// Owns the state of every known session.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SharedSessionState>>,
    options: RegistryOptions,
    log_heartbeat: AtomicBool,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(options: RegistryOptions) -> Self {
        let log_heartbeat = AtomicBool::new(options.log_heartbeat);
        Self {
            sessions: RwLock::new(HashMap::new()),
            options,
            log_heartbeat,
        }
    }

    /// Returns the codec sessions are created with.
    #[must_use]
    pub const fn codec(&self) -> &WireCodec {
        &self.options.codec
    }

    /// Returns the state of `session_id`, if known.
    #[must_use]
    pub fn get(&self, session_id: &SessionId) -> Option<SharedSessionState> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Returns the state of `session_id`, creating it on first use.
    pub fn get_or_create(&self, session_id: &SessionId) -> SharedSessionState {
        if let Some(state) = self.get(session_id) {
            return state;
        }
        let mut sessions = self.sessions.write();
        sessions
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(self.create(session_id))))
            .clone()
    }

    fn create(&self, session_id: &SessionId) -> SessionState {
        let history = match &self.options.log_dir {
            Some(dir) => HistoryLog::with_file(session_id, dir).unwrap_or_else(|err| {
                warn!(session = %session_id, %err, "history log file unavailable, keeping history in memory");
                HistoryLog::in_memory()
            }),
            None => HistoryLog::in_memory(),
        };
        let mut history = history.with_codec(self.options.codec);
        history.set_log_heartbeat(self.log_heartbeat());
        if let Some(path) = history.path() {
            info!(session = %session_id, path = %path.display(), "session history log created");
        }
        let overrides =
            SequenceOverrides::seeded(self.options.sender_seed, self.options.expected_seed);
        SessionState::new(session_id.clone(), history, overrides)
    }

    /// Runs `f` with the locked state of `session_id`.
    pub fn with_session<R>(
        &self,
        session_id: &SessionId,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> R {
        let state = self.get_or_create(session_id);
        let mut guard = state.lock();
        f(&mut guard)
    }

    /// Returns the identifiers of all known sessions in sorted order.
    #[must_use]
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns true if `session_id` is known.
    #[must_use]
    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Returns whether plain heartbeats are kept in history.
    #[must_use]
    pub fn log_heartbeat(&self) -> bool {
        self.log_heartbeat.load(Ordering::SeqCst)
    }

    /// Enables or disables heartbeat history for all sessions.
    pub fn set_log_heartbeat(&self, enabled: bool) {
        self.log_heartbeat.store(enabled, Ordering::SeqCst);
        for state in self.sessions.read().values() {
            state.lock().history_mut().set_log_heartbeat(enabled);
        }
    }

    /// Returns the number of known sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no session is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(RegistryOptions::default())
    }
}
