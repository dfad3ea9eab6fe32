/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message templates.
//!
//! Starting points for the operator: each template carries the session's
//! header fields and a plausible body, ready to be edited and sent.

use fixprobe_core::error::DispatchError;
use fixprobe_core::message::MsgType;
use fixprobe_core::tags;
use fixprobe_core::types::{Side, Timestamp};
use fixprobe_session::{Credentials, SessionConfig};
use fixprobe_tagvalue::{Encoder, WireCodec};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Instrument used by the order templates.
pub const DEFAULT_SYMBOL: &str = "EUR/USD";
/// Quantity used by the order templates.
pub const DEFAULT_ORDER_QTY: u64 = 1;
/// Limit price used by the order templates.
pub const DEFAULT_PRICE: u64 = 10;
/// HeartBtInt used by the Logon template.
pub const DEFAULT_HEART_BT_INT: u64 = 30;

/// Available templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// Header only.
    Free,
    /// TestRequest (1).
    TestRequest,
    /// NewOrderSingle (D), buy side.
    OrderBuy,
    /// NewOrderSingle (D), sell side.
    OrderSell,
    /// Logon (A).
    Logon,
}

impl Template {
    /// Returns the operator name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::TestRequest => "TEST",
            Self::OrderBuy => "ORD-BUY",
            Self::OrderSell => "ORD-SELL",
            Self::Logon => "LOGON",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Template {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FREE" => Ok(Self::Free),
            "TEST" => Ok(Self::TestRequest),
            "ORD-BUY" => Ok(Self::OrderBuy),
            "ORD-SELL" => Ok(Self::OrderSell),
            "LOGON" => Ok(Self::Logon),
            other => Err(DispatchError::InvalidArguments {
                action: "new".to_string(),
                reason: format!("unknown template '{other}'"),
            }),
        }
    }
}

/// Builds template messages with unique ClOrdID and TestReqID values.
#[derive(Debug)]
pub struct TemplateFactory {
    codec: WireCodec,
    next_id: AtomicU64,
}

impl TemplateFactory {
    /// Creates a factory producing messages in `codec`'s printable form.
    #[must_use]
    pub fn new(codec: WireCodec) -> Self {
        Self {
            codec,
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{}-{n}", Timestamp::now().as_millis())
    }

    fn header(config: &SessionConfig, msg_type: &str) -> Encoder {
        let mut encoder = Encoder::new(config.begin_string.as_str());
        encoder
            .put_str(tags::MSG_TYPE, msg_type)
            .put_uint(tags::MSG_SEQ_NUM, 1)
            .put_str(tags::SENDER_COMP_ID, &config.sender_comp_id)
            .put_str(tags::TARGET_COMP_ID, &config.target_comp_id);
        if let Some(sub_id) = &config.target_sub_id {
            encoder.put_str(tags::TARGET_SUB_ID, sub_id);
        }
        if let Some(location) = &config.sender_location_id {
            encoder.put_str(tags::SENDER_LOCATION_ID, location);
        }
        encoder.put_str(tags::SENDING_TIME, &Timestamp::now().format_millis());
        encoder
    }

    /// Builds `template` for the session described by `config`.
    #[must_use]
    pub fn build(&self, template: Template, config: &SessionConfig, credentials: &Credentials) -> String {
        let encoder = match template {
            Template::Free => Self::header(config, MsgType::LOGON),
            Template::TestRequest => {
                let mut encoder = Self::header(config, MsgType::TEST_REQUEST);
                encoder.put_str(tags::TEST_REQ_ID, &self.next_id("TEST"));
                encoder
            }
            Template::OrderBuy => self.order(config, Side::Buy),
            Template::OrderSell => self.order(config, Side::Sell),
            Template::Logon => {
                let mut encoder = Self::header(config, MsgType::LOGON);
                encoder
                    .put_uint(tags::ENCRYPT_METHOD, 0)
                    .put_uint(tags::HEART_BT_INT, DEFAULT_HEART_BT_INT)
                    .put_bool(tags::RESET_SEQ_NUM_FLAG, true);
                let fields = [
                    (tags::USERNAME, &credentials.username),
                    (tags::PASSWORD, &credentials.password),
                    (tags::NEW_PASSWORD, &credentials.new_password),
                ];
                for (tag, value) in fields {
                    if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                        encoder.put_str(tag, value);
                    }
                }
                encoder
            }
        };
        encoder.finish_with(self.codec.printable_delimiter())
    }

    fn order(&self, config: &SessionConfig, side: Side) -> Encoder {
        let mut encoder = Self::header(config, MsgType::NEW_ORDER_SINGLE);
        encoder
            .put_str(tags::CL_ORD_ID, &self.next_id("ORD"))
            .put_char(tags::HANDL_INST, '1')
            .put_uint(tags::ORDER_QTY, DEFAULT_ORDER_QTY)
            .put_char(tags::ORD_TYPE, '2')
            .put_uint(tags::PRICE, DEFAULT_PRICE)
            .put_char(tags::SIDE, side.as_char())
            .put_str(tags::SYMBOL, DEFAULT_SYMBOL)
            .put_char(tags::TIME_IN_FORCE, '1')
            .put_str(tags::TRANSACT_TIME, &Timestamp::now().format_millis());
        encoder
    }
}
