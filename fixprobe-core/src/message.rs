/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message type classification.
//!
//! Raw messages handled by the toolkit may carry any MsgType value, including
//! ones no dictionary knows about. [`MsgType`] therefore keeps the wire code
//! as-is and resolves a human-readable name from a static table, falling back
//! to [`UNKNOWN_MSG_TYPE_NAME`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name reported for MsgType codes absent from the table.
pub const UNKNOWN_MSG_TYPE_NAME: &str = "UNKNOWN";

/// Wire code and name of every message type the toolkit can name.
const MSG_TYPE_NAMES: &[(&str, &str)] = &[
    ("0", "Heartbeat"),
    ("1", "TestRequest"),
    ("2", "ResendRequest"),
    ("3", "Reject"),
    ("4", "SequenceReset"),
    ("5", "Logout"),
    ("6", "IOI"),
    ("7", "Advertisement"),
    ("8", "ExecutionReport"),
    ("9", "OrderCancelReject"),
    ("A", "Logon"),
    ("B", "News"),
    ("C", "Email"),
    ("D", "NewOrderSingle"),
    ("E", "NewOrderList"),
    ("F", "OrderCancelRequest"),
    ("G", "OrderCancelReplaceRequest"),
    ("H", "OrderStatusRequest"),
    ("J", "AllocationInstruction"),
    ("K", "ListCancelRequest"),
    ("L", "ListExecute"),
    ("M", "ListStatusRequest"),
    ("N", "ListStatus"),
    ("P", "AllocationInstructionAck"),
    ("Q", "DontKnowTrade"),
    ("R", "QuoteRequest"),
    ("S", "Quote"),
    ("T", "SettlementInstructions"),
    ("V", "MarketDataRequest"),
    ("W", "MarketDataSnapshotFullRefresh"),
    ("X", "MarketDataIncrementalRefresh"),
    ("Y", "MarketDataRequestReject"),
    ("Z", "QuoteCancel"),
    ("a", "QuoteStatusRequest"),
    ("b", "MassQuoteAcknowledgement"),
    ("c", "SecurityDefinitionRequest"),
    ("d", "SecurityDefinition"),
    ("e", "SecurityStatusRequest"),
    ("f", "SecurityStatus"),
    ("g", "TradingSessionStatusRequest"),
    ("h", "TradingSessionStatus"),
    ("i", "MassQuote"),
    ("j", "BusinessMessageReject"),
    ("k", "BidRequest"),
    ("l", "BidResponse"),
    ("m", "ListStrikePrice"),
    ("n", "XMLnonFIX"),
    ("o", "RegistrationInstructions"),
    ("p", "RegistrationInstructionsResponse"),
    ("q", "OrderMassCancelRequest"),
    ("r", "OrderMassCancelReport"),
    ("s", "NewOrderCross"),
    ("t", "CrossOrderCancelReplaceRequest"),
    ("u", "CrossOrderCancelRequest"),
    ("v", "SecurityTypeRequest"),
    ("w", "SecurityTypes"),
    ("x", "SecurityListRequest"),
    ("y", "SecurityList"),
    ("z", "DerivativeSecurityListRequest"),
    ("AE", "TradeCaptureReport"),
    ("AR", "TradeCaptureReportAck"),
    ("BE", "UserRequest"),
    ("BF", "UserResponse"),
];

/// Session-level message codes.
const ADMIN_CODES: &[&str] = &["0", "1", "2", "3", "4", "5", "A"];

/// A FIX MsgType (tag 35) value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MsgType(String);

impl MsgType {
    /// Heartbeat wire code.
    pub const HEARTBEAT: &'static str = "0";
    /// TestRequest wire code.
    pub const TEST_REQUEST: &'static str = "1";
    /// Logout wire code.
    pub const LOGOUT: &'static str = "5";
    /// Logon wire code.
    pub const LOGON: &'static str = "A";
    /// NewOrderSingle wire code.
    pub const NEW_ORDER_SINGLE: &'static str = "D";

    /// Creates a message type from its wire code.
    ///
    /// # Arguments
    /// * `code` - The tag 35 value (e.g. "D")
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the wire code.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the message type name, or [`UNKNOWN_MSG_TYPE_NAME`].
    #[must_use]
    pub fn name(&self) -> &'static str {
        MSG_TYPE_NAMES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map_or(UNKNOWN_MSG_TYPE_NAME, |(_, name)| name)
    }

    /// Returns true if the code is absent from the name table.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.name() == UNKNOWN_MSG_TYPE_NAME
    }

    /// Returns true if this is a session-level message.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        ADMIN_CODES.contains(&self.0.as_str())
    }

    /// Returns true if this is an application message.
    #[must_use]
    pub fn is_app(&self) -> bool {
        !self.is_admin()
    }

    /// Returns true for Heartbeat.
    #[inline]
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.0 == Self::HEARTBEAT
    }

    /// Returns true for Logon.
    #[inline]
    #[must_use]
    pub fn is_logon(&self) -> bool {
        self.0 == Self::LOGON
    }

    /// Formats the type as shown in logs, e.g. `D (NewOrderSingle)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.0, self.name())
    }
}

impl std::str::FromStr for MsgType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for MsgType {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
