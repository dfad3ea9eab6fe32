/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Boundary with the protocol engine.
//!
//! The engine owns sockets, heartbeats and resend handling. fixprobe drives
//! it through this trait and observes it through the application hooks.

use async_trait::async_trait;
use bytes::Bytes;
use fixprobe_core::error::SessionError;
use fixprobe_core::types::{SeqNum, SessionId};
use fixprobe_tagvalue::ValidatedMessage;

/// Operations fixprobe needs from a FIX engine.
///
/// Implementations must not hold internal locks while invoking application
/// hooks, since hooks call back into the engine.
#[async_trait]
pub trait SessionEngine: Send + Sync {
    /// Starts logging on. Completion is observed via [`Self::is_logged_on`].
    async fn logon(&self, session_id: &SessionId) -> Result<(), SessionError>;

    /// Starts logging out.
    async fn logout(&self, session_id: &SessionId) -> Result<(), SessionError>;

    /// Returns true if the session is logged on.
    fn is_logged_on(&self, session_id: &SessionId) -> bool;

    /// Transmits `payload` as-is.
    async fn send_raw(&self, session_id: &SessionId, payload: Bytes) -> Result<(), SessionError>;

    /// Transmits a validated message.
    async fn send(
        &self,
        session_id: &SessionId,
        message: ValidatedMessage,
    ) -> Result<(), SessionError>;

    /// Returns the next outgoing MsgSeqNum.
    fn next_sender_seq(&self, session_id: &SessionId) -> Result<SeqNum, SessionError>;

    /// Sets the next outgoing MsgSeqNum.
    fn set_next_sender_seq(&self, session_id: &SessionId, seq: SeqNum) -> Result<(), SessionError>;

    /// Reads a session setting.
    fn session_config(&self, key: &str, session_id: &SessionId) -> Option<String>;

    /// Writes a session setting.
    fn set_session_config(
        &self,
        key: &str,
        value: &str,
        session_id: &SessionId,
    ) -> Result<(), SessionError>;

    /// Lists the sessions the engine knows.
    fn sessions(&self) -> Vec<SessionId>;
}
