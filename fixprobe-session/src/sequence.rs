/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Sequence number overrides.
//!
//! Counterparties that reject a Logon because of a sequence gap usually say
//! which number they expected in Text (58). The hint is turned into a
//! one-shot override consumed by the next outbound Logon.

use fixprobe_core::types::SeqNum;
use regex::Regex;
use std::sync::LazyLock;

/// Added to a reported sequence number before it is used.
///
/// The rejected Logon and the counterparty's Logout each consume one number
/// before the override reaches the wire.
pub const SEQUENCE_REPAIR_OFFSET: u64 = 2;

static SENDER_HINT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\bMsgSeqNum\b.*expecting ([0-9]+)").ok());

static EXPECTED_HINT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"NextExpectedMsgSeqNum.*expecting ([0-9]+)").ok());

/// A corrected sequence number reported by the counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceHint {
    /// Our next outgoing MsgSeqNum.
    NextSender(SeqNum),
    /// The NextExpectedMsgSeqNum (789) to announce.
    NextExpected(SeqNum),
}

fn capture(regex: &LazyLock<Option<Regex>>, text: &str) -> Option<SeqNum> {
    let regex = regex.as_ref()?;
    let value: u64 = regex.captures(text)?.get(1)?.as_str().parse().ok()?;
    Some(SeqNum::new(value.saturating_add(SEQUENCE_REPAIR_OFFSET)))
}

/// Extracts every sequence hint from an admin Text (58) value.
#[must_use]
pub fn parse_sequence_hints(text: &str) -> Vec<SequenceHint> {
    let mut hints = Vec::with_capacity(2);
    if let Some(seq) = capture(&SENDER_HINT, text) {
        hints.push(SequenceHint::NextSender(seq));
    }
    if let Some(seq) = capture(&EXPECTED_HINT, text) {
        hints.push(SequenceHint::NextExpected(seq));
    }
    hints
}

/// One-shot sequence overrides for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceOverrides {
    next_sender: Option<SeqNum>,
    next_expected: Option<SeqNum>,
}

impl SequenceOverrides {
    /// Creates overrides seeded with initial values.
    #[must_use]
    pub const fn seeded(next_sender: Option<SeqNum>, next_expected: Option<SeqNum>) -> Self {
        Self {
            next_sender,
            next_expected,
        }
    }

    /// Returns the pending sender override.
    #[inline]
    #[must_use]
    pub const fn next_sender(&self) -> Option<SeqNum> {
        self.next_sender
    }

    /// Returns the pending next-expected override.
    #[inline]
    #[must_use]
    pub const fn next_expected(&self) -> Option<SeqNum> {
        self.next_expected
    }

    /// Sets the sender override.
    pub fn set_next_sender(&mut self, seq: SeqNum) {
        self.next_sender = Some(seq);
    }

    /// Sets the next-expected override.
    pub fn set_next_expected(&mut self, seq: SeqNum) {
        self.next_expected = Some(seq);
    }

    /// Consumes the sender override.
    pub fn take_next_sender(&mut self) -> Option<SeqNum> {
        self.next_sender.take()
    }

    /// Consumes the next-expected override.
    pub fn take_next_expected(&mut self) -> Option<SeqNum> {
        self.next_expected.take()
    }

    /// Records `hint`, replacing any pending value of the same kind.
    pub fn apply(&mut self, hint: SequenceHint) {
        match hint {
            SequenceHint::NextSender(seq) => self.set_next_sender(seq),
            SequenceHint::NextExpected(seq) => self.set_next_expected(seq),
        }
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.next_sender.is_none() && self.next_expected.is_none()
    }
}
