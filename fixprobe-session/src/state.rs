/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Per-session state.
//!
//! Status follows `Disconnected → LoggingOn → LoggedOn → LoggingOff →
//! Disconnected`. Unlike a conformant engine this tool must tolerate any
//! observed event, so illegal transitions are logged rather than refused.

use crate::sequence::SequenceOverrides;
use bytes::Bytes;
use fixprobe_core::types::SessionId;
use fixprobe_store::{EntryDraft, HistoryLog};
use std::fmt;
use tracing::debug;

/// Logon-attempt ceiling.
pub const MAX_LOGON_ATTEMPTS: u32 = 5;

/// Observed session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    /// No session established.
    #[default]
    Disconnected,
    /// Logon requested, awaiting confirmation.
    LoggingOn,
    /// Logon confirmed.
    LoggedOn,
    /// Logout requested, awaiting confirmation.
    LoggingOff,
}

impl SessionStatus {
    /// Returns the status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::LoggingOn => "LOGGING_ON",
            Self::LoggedOn => "LOGGED_ON",
            Self::LoggingOff => "LOGGING_OFF",
        }
    }

    /// Returns true if `next` follows `self` in the normal lifecycle.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::LoggingOn)
                | (Self::LoggingOn, Self::LoggedOn)
                | (Self::LoggingOn, Self::Disconnected)
                | (Self::LoggedOn, Self::LoggingOff)
                | (Self::LoggedOn, Self::Disconnected)
                | (Self::LoggingOff, Self::Disconnected)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A substitute handed to the engine whose transmission is not yet known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightSubstitution {
    /// The queued payload that replaced the outbound message.
    pub payload: Bytes,
    /// History entries recorded once the transmission is confirmed.
    pub entries: Vec<EntryDraft>,
}

/// Mutable state of one session.
///
/// Guarded by a per-session lock in the registry; hold it only for short,
/// synchronous sections.
#[derive(Debug)]
pub struct SessionState {
    session_id: SessionId,
    status: SessionStatus,
    overrides: SequenceOverrides,
    logon_attempts: u32,
    exhausted: bool,
    edited: Option<String>,
    in_flight: Option<InFlightSubstitution>,
    history: HistoryLog,
}

impl SessionState {
    /// Creates the state of a fresh session.
    #[must_use]
    pub fn new(session_id: SessionId, history: HistoryLog, overrides: SequenceOverrides) -> Self {
        Self {
            session_id,
            status: SessionStatus::Disconnected,
            overrides,
            logon_attempts: 0,
            exhausted: false,
            edited: None,
            in_flight: None,
            history,
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns the current status.
    #[inline]
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    fn transition(&mut self, next: SessionStatus) {
        if self.status != next && !self.status.can_transition_to(next) {
            debug!(session = %self.session_id, from = %self.status, to = %next, "unexpected status change");
        }
        self.status = next;
    }

    /// An explicit logon was requested.
    ///
    /// Clears the attempt counter and the exhausted flag.
    pub fn begin_logon(&mut self) {
        self.logon_attempts = 0;
        self.exhausted = false;
        self.transition(SessionStatus::LoggingOn);
    }

    /// The engine confirmed logon.
    pub fn on_logged_on(&mut self) {
        self.logon_attempts = 0;
        self.exhausted = false;
        self.transition(SessionStatus::LoggedOn);
    }

    /// An explicit logout was requested.
    pub fn begin_logout(&mut self) {
        self.transition(SessionStatus::LoggingOff);
    }

    /// The engine reported logout or logon failure.
    ///
    /// A session still retrying logon stays `LoggingOn`.
    pub fn on_logged_out(&mut self) {
        if self.status != SessionStatus::LoggingOn {
            self.transition(SessionStatus::Disconnected);
        }
    }

    /// Gives up on a pending logon.
    pub fn abort_logon(&mut self) {
        if self.status == SessionStatus::LoggingOn {
            self.transition(SessionStatus::Disconnected);
        }
    }

    /// Counts an outbound Logon and returns the new total.
    pub fn record_logon_attempt(&mut self) -> u32 {
        self.logon_attempts = self.logon_attempts.saturating_add(1);
        self.logon_attempts
    }

    /// Returns consecutive logon attempts since the last success.
    #[must_use]
    pub const fn logon_attempts(&self) -> u32 {
        self.logon_attempts
    }

    /// Marks the session as having hit the logon-attempt ceiling.
    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    /// Returns true after the logon-attempt ceiling was hit.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Returns the sequence overrides.
    #[must_use]
    pub const fn overrides(&self) -> &SequenceOverrides {
        &self.overrides
    }

    /// Returns the sequence overrides for update.
    pub fn overrides_mut(&mut self) -> &mut SequenceOverrides {
        &mut self.overrides
    }

    /// Flags that an operator-edited message is being sent.
    pub fn mark_edited(&mut self, raw: impl Into<String>) {
        self.edited = Some(raw.into());
    }

    /// Returns the last edited message, if flagged.
    #[must_use]
    pub fn edited(&self) -> Option<&str> {
        self.edited.as_deref()
    }

    /// Clears the edited-message flag, returning the message.
    pub fn take_edited(&mut self) -> Option<String> {
        self.edited.take()
    }

    /// Parks a substitute until its transmission is settled.
    ///
    /// A substitute still parked from an earlier transmission is committed
    /// first: the engine has moved on, so it went out.
    pub fn begin_substitution(&mut self, in_flight: InFlightSubstitution) {
        self.commit_substitution();
        self.in_flight = Some(in_flight);
    }

    /// Records the parked substitute's history entries. Returns false if
    /// nothing was parked.
    pub fn commit_substitution(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };
        for entry in in_flight.entries {
            self.history.append(entry);
        }
        true
    }

    /// Removes the parked substitute without recording it.
    pub fn take_substitution(&mut self) -> Option<InFlightSubstitution> {
        self.in_flight.take()
    }

    /// Returns true while a substitute awaits confirmation.
    #[must_use]
    pub const fn has_substitution_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns the session history.
    #[must_use]
    pub const fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Returns the session history for update.
    pub fn history_mut(&mut self) -> &mut HistoryLog {
        &mut self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SessionState {
        SessionState::new(
            SessionId::new("FIX.4.4", "ME", "THEM"),
            HistoryLog::in_memory(),
            SequenceOverrides::default(),
        )
    }

    #[test]
    fn test_lifecycle() {
        let mut state = state();
        assert_eq!(state.status(), SessionStatus::Disconnected);
        state.begin_logon();
        assert_eq!(state.status(), SessionStatus::LoggingOn);
        state.on_logged_out();
        assert_eq!(state.status(), SessionStatus::LoggingOn);
        state.on_logged_on();
        assert_eq!(state.status(), SessionStatus::LoggedOn);
        state.begin_logout();
        assert_eq!(state.status(), SessionStatus::LoggingOff);
        state.on_logged_out();
        assert_eq!(state.status(), SessionStatus::Disconnected);
    }

    #[test]
    fn test_abort_logon() {
        let mut state = state();
        state.begin_logon();
        state.abort_logon();
        assert_eq!(state.status(), SessionStatus::Disconnected);
    }

    #[test]
    fn test_transition_table() {
        assert!(SessionStatus::Disconnected.can_transition_to(SessionStatus::LoggingOn));
        assert!(!SessionStatus::Disconnected.can_transition_to(SessionStatus::LoggedOn));
        assert!(!SessionStatus::LoggingOff.can_transition_to(SessionStatus::LoggedOn));
        assert_eq!(SessionStatus::LoggedOn.to_string(), "LOGGED_ON");
    }

    #[test]
    fn test_attempts_reset_on_logon() {
        let mut state = state();
        for _ in 0..MAX_LOGON_ATTEMPTS {
            state.record_logon_attempt();
        }
        state.mark_exhausted();
        assert_eq!(state.logon_attempts(), MAX_LOGON_ATTEMPTS);
        assert!(state.is_exhausted());

        state.on_logged_on();
        assert_eq!(state.logon_attempts(), 0);
        assert!(!state.is_exhausted());
    }

    #[test]
    fn test_edited_flag() {
        let mut state = state();
        assert_eq!(state.edited(), None);
        state.mark_edited("8=FIX.4.4|35=D|");
        assert_eq!(state.edited(), Some("8=FIX.4.4|35=D|"));
        assert_eq!(state.take_edited().as_deref(), Some("8=FIX.4.4|35=D|"));
        assert_eq!(state.edited(), None);
    }

    #[test]
    fn test_substitution_recorded_only_when_committed() {
        use fixprobe_core::message::MsgType;
        use fixprobe_core::types::{Direction, Route};

        let mut state = state();
        let draft = EntryDraft::new(Direction::Sent, Route::App, MsgType::new("D"), "35=D|");
        state.begin_substitution(InFlightSubstitution {
            payload: Bytes::from_static(b"35=D|"),
            entries: vec![draft.clone()],
        });
        assert!(state.has_substitution_in_flight());
        assert!(state.history().is_empty());

        let taken = state.take_substitution().map(|in_flight| in_flight.payload);
        assert_eq!(taken, Some(Bytes::from_static(b"35=D|")));
        assert!(!state.commit_substitution());
        assert!(state.history().is_empty());

        state.begin_substitution(InFlightSubstitution {
            payload: Bytes::from_static(b"35=D|"),
            entries: vec![draft.clone()],
        });
        state.begin_substitution(InFlightSubstitution {
            payload: Bytes::from_static(b"35=D|"),
            entries: vec![draft],
        });
        assert_eq!(state.history().len(), 1);
        assert!(state.commit_substitution());
        assert_eq!(state.history().len(), 2);
    }
}
