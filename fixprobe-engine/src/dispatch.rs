/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Operator action dispatch.
//!
//! Verbs are parsed into [`Action`] and resolved through a handler table
//! built once by [`Dispatcher::standard`]. Every handler returns a short
//! operator-facing summary.

use crate::probe::Probe;
use crate::templates::Template;
use fixprobe_core::error::{DispatchError, FixError};
use fixprobe_core::types::{SeqNum, SessionId};
use fixprobe_store::ExportFormat;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::str::FromStr;
use tracing::debug;

/// Future returned by a [`Handler`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<String, FixError>> + Send + 'a>>;

/// An action implementation: probe, target session, arguments after the verb.
pub type Handler = for<'a> fn(&'a Probe, &'a SessionId, &'a [String]) -> HandlerFuture<'a>;

/// Operator actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Log the session on.
    Logon,
    /// Log the session out.
    Logout,
    /// Validate and send a message.
    Send,
    /// Send a message without validation.
    SendRaw,
    /// Save a message to the store.
    Save,
    /// Delete a stored message.
    Delete,
    /// List stored messages.
    List,
    /// Show a stored message.
    View,
    /// Import messages from a file.
    Import,
    /// Export a stored message to a file.
    Export,
    /// Query the session history.
    History,
    /// Export a history entry to a file.
    HistoryExport,
    /// Queue a substitution for the next outbound message.
    Intercept,
    /// Show the substitution queue.
    InterceptStatus,
    /// Empty the substitution queue.
    InterceptClear,
    /// Fuzz fields of a message.
    Fuzz,
    /// Build a message from a template.
    New,
    /// Apply edit expressions to a message.
    Edit,
    /// Override the next Logon's sequence numbers.
    SetSeq,
    /// Toggle heartbeat history.
    LogHeartbeat,
}

impl Action {
    /// Every action, in help order.
    pub const ALL: [Self; 20] = [
        Self::Logon,
        Self::Logout,
        Self::Send,
        Self::SendRaw,
        Self::Save,
        Self::Delete,
        Self::List,
        Self::View,
        Self::Import,
        Self::Export,
        Self::History,
        Self::HistoryExport,
        Self::Intercept,
        Self::InterceptStatus,
        Self::InterceptClear,
        Self::Fuzz,
        Self::New,
        Self::Edit,
        Self::SetSeq,
        Self::LogHeartbeat,
    ];

    /// Returns the operator verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Logon => "logon",
            Self::Logout => "logout",
            Self::Send => "send",
            Self::SendRaw => "send-raw",
            Self::Save => "save",
            Self::Delete => "delete",
            Self::List => "list",
            Self::View => "view",
            Self::Import => "import",
            Self::Export => "export",
            Self::History => "history",
            Self::HistoryExport => "history-export",
            Self::Intercept => "intercept",
            Self::InterceptStatus => "intercept-status",
            Self::InterceptClear => "intercept-clear",
            Self::Fuzz => "fuzz",
            Self::New => "new",
            Self::Edit => "edit",
            Self::SetSeq => "set-seq",
            Self::LogHeartbeat => "log-heartbeat",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let verb = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == verb)
            .ok_or_else(|| DispatchError::UnknownAction(s.trim().to_string()))
    }
}

/// Maps actions to handlers.
pub struct Dispatcher {
    handlers: HashMap<Action, Handler>,
}

impl Dispatcher {
    /// Creates a dispatcher with no handlers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Creates a dispatcher with a handler for every [`Action`].
    #[must_use]
    pub fn standard() -> Self {
        let table: [(Action, Handler); 20] = [
            (Action::Logon, handlers::logon),
            (Action::Logout, handlers::logout),
            (Action::Send, handlers::send),
            (Action::SendRaw, handlers::send_raw),
            (Action::Save, handlers::save),
            (Action::Delete, handlers::delete),
            (Action::List, handlers::list),
            (Action::View, handlers::view),
            (Action::Import, handlers::import),
            (Action::Export, handlers::export),
            (Action::History, handlers::history),
            (Action::HistoryExport, handlers::history_export),
            (Action::Intercept, handlers::intercept),
            (Action::InterceptStatus, handlers::intercept_status),
            (Action::InterceptClear, handlers::intercept_clear),
            (Action::Fuzz, handlers::fuzz),
            (Action::New, handlers::new_message),
            (Action::Edit, handlers::edit),
            (Action::SetSeq, handlers::set_seq),
            (Action::LogHeartbeat, handlers::log_heartbeat),
        ];
        Self {
            handlers: table.into_iter().collect(),
        }
    }

    /// Registers or replaces the handler for `action`.
    pub fn register(&mut self, action: Action, handler: Handler) {
        self.handlers.insert(action, handler);
    }

    /// Returns true if `action` has a handler.
    #[must_use]
    pub fn handles(&self, action: Action) -> bool {
        self.handlers.contains_key(&action)
    }

    /// Runs `verb` with `args` against `session_id`.
    ///
    /// # Errors
    /// Returns `DispatchError::UnknownAction` for an unknown verb,
    /// `DispatchError::Unhandled` if no handler is registered, or the
    /// handler's own error.
    pub async fn dispatch(
        &self,
        probe: &Probe,
        session_id: &SessionId,
        verb: &str,
        args: &[String],
    ) -> Result<String, FixError> {
        let action: Action = verb.parse()?;
        let handler = self
            .handlers
            .get(&action)
            .ok_or_else(|| DispatchError::Unhandled(action.to_string()))?;
        debug!(%action, session = %session_id, ?args, "dispatching");
        handler(probe, session_id, args).await
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<&str> = self.handlers.keys().map(|a| a.as_str()).collect();
        actions.sort_unstable();
        f.debug_struct("Dispatcher").field("actions", &actions).finish()
    }
}

mod handlers {
    use super::*;

    fn boxed<'a>(
        future: impl Future<Output = Result<String, FixError>> + Send + 'a,
    ) -> HandlerFuture<'a> {
        Box::pin(future)
    }

    fn invalid(action: Action, reason: impl Into<String>) -> DispatchError {
        DispatchError::InvalidArguments {
            action: action.to_string(),
            reason: reason.into(),
        }
    }

    fn required<'a>(
        action: Action,
        args: &'a [String],
        index: usize,
        name: &str,
    ) -> Result<&'a str, DispatchError> {
        args.get(index)
            .map(String::as_str)
            .ok_or_else(|| invalid(action, format!("missing {name}")))
    }

    fn optional(args: &[String], index: usize) -> Option<&str> {
        args.get(index).map(String::as_str).filter(|a| !a.is_empty())
    }

    fn format_arg(action: Action, args: &[String], index: usize) -> Result<Option<ExportFormat>, DispatchError> {
        optional(args, index)
            .map(|f| f.parse().map_err(|_| invalid(action, format!("unknown format '{f}'"))))
            .transpose()
    }

    fn flag(action: Action, value: &str) -> Result<bool, DispatchError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" | "1" | "clean" => Ok(true),
            "off" | "false" | "no" | "0" => Ok(false),
            other => Err(invalid(action, format!("expected on/off, got '{other}'"))),
        }
    }

    pub(super) fn logon<'a>(probe: &'a Probe, session: &'a SessionId, _args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            probe.logon(session).await?;
            Ok(format!("{session} logged on"))
        })
    }

    pub(super) fn logout<'a>(probe: &'a Probe, session: &'a SessionId, _args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            probe.logout(session).await?;
            Ok(format!("{session} logged out"))
        })
    }

    pub(super) fn send<'a>(probe: &'a Probe, session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let target = required(Action::Send, args, 0, "message")?;
            let sent = probe.send(session, target).await?;
            Ok(probe.codec().to_printable(&sent.raw))
        })
    }

    pub(super) fn send_raw<'a>(probe: &'a Probe, session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let target = required(Action::SendRaw, args, 0, "message")?;
            let clean_up = optional(args, 1)
                .map(|v| flag(Action::SendRaw, v))
                .transpose()?
                .unwrap_or(false);
            let sent = probe.send_raw(session, target, clean_up).await?;
            Ok(probe.codec().to_printable(&sent))
        })
    }

    pub(super) fn save<'a>(probe: &'a Probe, _session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let raw = required(Action::Save, args, 0, "message")?;
            Ok(probe.save(raw, optional(args, 1), None)?)
        })
    }

    pub(super) fn delete<'a>(probe: &'a Probe, _session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let id = required(Action::Delete, args, 0, "id")?;
            Ok(match probe.delete(id) {
                Some(removed) => format!("deleted {}", removed.id),
                None => format!("{id} not stored"),
            })
        })
    }

    pub(super) fn list<'a>(probe: &'a Probe, _session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let lines: Vec<String> = probe
                .list(optional(args, 0).unwrap_or(""))
                .into_iter()
                .map(|message| format!("{}  {}", message.id, message.raw))
                .collect();
            Ok(lines.join("\n"))
        })
    }

    pub(super) fn view<'a>(probe: &'a Probe, _session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let id = required(Action::View, args, 0, "id")?;
            Ok(probe.view(id)?.raw)
        })
    }

    pub(super) fn import<'a>(probe: &'a Probe, session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let path = required(Action::Import, args, 0, "path")?;
            let ids = probe.import(session, Path::new(path), None)?;
            Ok(format!("imported {} message(s): {}", ids.len(), ids.join(", ")))
        })
    }

    pub(super) fn export<'a>(probe: &'a Probe, _session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let id = required(Action::Export, args, 0, "id")?;
            let path = required(Action::Export, args, 1, "path")?;
            let format = format_arg(Action::Export, args, 2)?;
            probe.export(id, Path::new(path), format)?;
            Ok(format!("exported {id} to {path}"))
        })
    }

    pub(super) fn history<'a>(probe: &'a Probe, session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let depth = optional(args, 1)
                .map(|d| {
                    d.parse::<usize>()
                        .map_err(|_| invalid(Action::History, format!("invalid depth '{d}'")))
                })
                .transpose()?
                .unwrap_or(0);
            let lines: Vec<String> = probe
                .history(session, optional(args, 0).unwrap_or(""), depth)
                .into_iter()
                .map(|entry| {
                    format!(
                        "{} {} {} {} {}",
                        entry.sequence_id,
                        entry.timestamp.format_millis(),
                        entry.state.as_str(),
                        entry.msg_type.label(),
                        entry.raw
                    )
                })
                .collect();
            Ok(lines.join("\n"))
        })
    }

    pub(super) fn history_export<'a>(probe: &'a Probe, session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let action = Action::HistoryExport;
            let id = required(action, args, 0, "history id")?;
            let sequence_id = id
                .parse::<u64>()
                .map_err(|_| invalid(action, format!("invalid history id '{id}'")))?;
            let path = required(action, args, 1, "path")?;
            let format = format_arg(action, args, 2)?;
            probe.export_history(session, sequence_id, Path::new(path), format)?;
            Ok(format!("exported history entry {sequence_id} to {path}"))
        })
    }

    pub(super) fn intercept<'a>(probe: &'a Probe, _session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let target = required(Action::Intercept, args, 0, "message")?;
            probe.intercept(target);
            Ok(format!("{} substitution(s) pending", probe.intercept_status().pending))
        })
    }

    pub(super) fn intercept_status<'a>(probe: &'a Probe, _session: &'a SessionId, _args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let status = probe.intercept_status();
            Ok(match status.head {
                Some(head) => format!(
                    "{} pending, next: {}",
                    status.pending,
                    probe.codec().to_printable(&fixprobe_tagvalue::bytes_to_ascii(&head))
                ),
                None => "no substitution pending".to_string(),
            })
        })
    }

    pub(super) fn intercept_clear<'a>(probe: &'a Probe, _session: &'a SessionId, _args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move { Ok(format!("cleared {} substitution(s)", probe.intercept_clear())) })
    }

    pub(super) fn fuzz<'a>(probe: &'a Probe, session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let target = required(Action::Fuzz, args, 0, "message")?;
            let fields: Vec<String> = required(Action::Fuzz, args, 1, "fields")?
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
            let dictionary = optional(args, 2).map(Path::new);
            let report = probe.fuzz(session, target, &fields, dictionary).await?;
            Ok(format!(
                "{} row(s) written to {} ({} failed)",
                report.rows,
                report.output.display(),
                report.failures
            ))
        })
    }

    pub(super) fn new_message<'a>(probe: &'a Probe, session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let template: Template = required(Action::New, args, 0, "template")?.parse()?;
            Ok(probe.new_message(session, template)?)
        })
    }

    pub(super) fn edit<'a>(probe: &'a Probe, _session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let target = required(Action::Edit, args, 0, "message")?;
            if args.len() < 2 {
                return Err(invalid(Action::Edit, "missing edit expression").into());
            }
            probe.edit(target, args[1..].iter().map(String::as_str))
        })
    }

    pub(super) fn set_seq<'a>(probe: &'a Probe, session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let action = Action::SetSeq;
            let which = required(action, args, 0, "sender|expected")?;
            let value = required(action, args, 1, "sequence number")?;
            let seq = value
                .parse::<u64>()
                .map(SeqNum::new)
                .map_err(|_| invalid(action, format!("invalid sequence number '{value}'")))?;
            match which.to_ascii_lowercase().as_str() {
                "sender" | "next" => probe.set_next_sender_seq(session, seq),
                "expected" | "target" => probe.set_next_expected_seq(session, seq),
                other => return Err(invalid(action, format!("unknown sequence '{other}'")).into()),
            }
            Ok(format!("{which} sequence for next logon set to {seq}"))
        })
    }

    pub(super) fn log_heartbeat<'a>(probe: &'a Probe, _session: &'a SessionId, args: &'a [String]) -> HandlerFuture<'a> {
        boxed(async move {
            let enabled = flag(Action::LogHeartbeat, required(Action::LogHeartbeat, args, 0, "on|off")?)?;
            probe.set_log_heartbeat(enabled);
            Ok(format!("heartbeat logging {}", if enabled { "on" } else { "off" }))
        })
    }
}
